//! Routes module - HTTP API endpoints

pub mod dashboards;
pub mod distribution_lists;
pub mod documents;
pub mod imports;
pub mod reviews;
pub mod transmittals;

use std::sync::Arc;

use axum::Router;
use sqlx::SqlitePool;

use crate::config::EdmsConfig;
use crate::search::SharedIndex;

pub use crate::AuthenticatedUser;

/// Shared state of every EDMS route
#[derive(Clone)]
pub struct EdmsState {
    pub pool: Arc<SqlitePool>,
    pub config: Arc<EdmsConfig>,
    pub index: SharedIndex,
}

impl EdmsState {
    pub fn new(pool: Arc<SqlitePool>, config: EdmsConfig, index: SharedIndex) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            index,
        }
    }
}

/// Configure all EDMS routes
///
/// Every handler expects an `AuthenticatedUser` extension, inserted by the
/// server's auth middleware.
pub fn configure_routes(state: EdmsState) -> Router {
    api_routes(state)
}

fn api_routes(state: EdmsState) -> Router {
    Router::new()
        .merge(documents::routes(state.clone()))
        .merge(reviews::routes(state.clone()))
        .merge(distribution_lists::routes(state.clone()))
        .merge(transmittals::routes(state.clone()))
        .merge(imports::routes(state.clone()))
        .merge(dashboards::routes(state))
}
