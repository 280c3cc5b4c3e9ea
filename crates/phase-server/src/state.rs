//! Application state

use phase_edms::routes::EdmsState;
use phase_edms::search::{build_index, SharedIndex};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::config::Config;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection pool
    pub pool: Arc<SqlitePool>,

    /// Server configuration
    pub config: Config,

    /// Search index documents are mirrored to
    pub index: SharedIndex,
}

impl AppState {
    pub fn new(pool: Arc<SqlitePool>, config: Config) -> anyhow::Result<Self> {
        let index = build_index(&config.edms.search)?;
        Ok(Self {
            pool,
            config,
            index,
        })
    }

    /// State handed to the document management routes
    pub fn edms_state(&self) -> EdmsState {
        EdmsState::new(self.pool.clone(), self.config.edms.clone(), self.index.clone())
    }
}
