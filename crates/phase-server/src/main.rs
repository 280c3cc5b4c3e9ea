//! Phase Server - engineering document management server
//!
//! Serves the document, review, transmittal and import API.
//! Users connect via API Key authentication.

mod auth;
mod config;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::Json,
    routing::get,
    Router,
};
use clap::{Parser, Subcommand};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::auth::middleware::auth_middleware;
use crate::auth::service::AuthService;
use crate::config::Config;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "phase-server", version, about = "Phase document management server")]
struct Cli {
    /// TOML configuration file; environment variables are used when absent
    #[arg(long, env = "PHASE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Create or update the database schema
    Migrate,
    /// Import a CSV file of documents into a category
    Import { category_id: i64, file: PathBuf },
    /// Push every document to the search index
    Reindex,
    /// Create a user and print their API key
    CreateUser { email: String, name: String },
    /// Create a document category
    CreateCategory { organisation: String, name: String },
    /// Give a user access to a category
    AddMember { category_id: i64, email: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Force the ring crypto backend for rustls
    let _ = rustls::crypto::ring::default_provider().install_default();

    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::from_file(&path.to_string_lossy())?,
        None => Config::from_env()?,
    };

    let pool = connect(&config).await?;
    phase_edms::migrations::run_migration(&pool)
        .await
        .context("Database migration failed")?;
    let state = Arc::new(AppState::new(Arc::new(pool), config)?);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(state).await,
        Command::Migrate => {
            info!("Database migrations completed");
            Ok(())
        }
        Command::Import { category_id, file } => {
            let service =
                phase_edms::services::ImportService::new(&state.config.edms, state.index.clone());
            let batch = service.import_file(&state.pool, category_id, &file).await?;
            let failed = batch.imports.iter().filter(|i| i.errors.is_some()).count();
            println!(
                "Batch {}: {} ({} lines, {} failed)",
                batch.uid,
                batch.status,
                batch.imports.len(),
                failed
            );
            for import in batch.imports.iter().filter(|i| i.errors.is_some()) {
                println!(
                    "  line {}: {}",
                    import.line,
                    import.errors.as_deref().unwrap_or_default()
                );
            }
            Ok(())
        }
        Command::Reindex => {
            let count = phase_edms::search::reindex_all(
                &state.pool,
                state.index.as_ref(),
                state.config.edms.search.bulk_size,
            )
            .await?;
            println!("Indexed {} documents", count);
            Ok(())
        }
        Command::CreateUser { email, name } => {
            let (user, api_key) = AuthService::new(state.pool.clone())
                .create_user(&email, &name)
                .await?;
            println!("User {} ({})", user.id, user.email);
            println!("API key: {}", api_key);
            Ok(())
        }
        Command::CreateCategory { organisation, name } => {
            let category = AuthService::new(state.pool.clone())
                .create_category(&organisation, &name)
                .await?;
            println!("Category {}: {}", category.id, category);
            Ok(())
        }
        Command::AddMember { category_id, email } => {
            AuthService::new(state.pool.clone())
                .add_member(category_id, &email)
                .await
        }
    }
}

/// Install the tracing subscriber, JSON output when `LOG_FORMAT=json`
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "phase_server=info,phase_edms=info,tower_http=debug".into());
    let json = std::env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn connect(config: &Config) -> Result<SqlitePool> {
    let database_url = config.database_url.clone();
    info!("Connecting to database: {}", database_url);

    // Ensure parent directory exists for SQLite
    if database_url.starts_with("sqlite:") {
        let path = database_url.trim_start_matches("sqlite:");
        let path = path.trim_start_matches("//");
        // Remove query string for path extraction
        let path = path.split('?').next().unwrap_or(path);
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&database_url)
        .await?;
    Ok(pool)
}

async fn serve(state: Arc<AppState>) -> Result<()> {
    let addr: SocketAddr = state
        .config
        .bind_addr()
        .parse()
        .with_context(|| format!("Invalid bind address {}", state.config.bind_addr()))?;
    info!("Starting Phase Server on {}", addr);

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::list(origins)
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

fn build_router(state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .with_state(state.clone());

    let protected_routes = phase_edms::routes::configure_routes(state.edms_state()).layer(
        axum::middleware::from_fn_with_state(state.clone(), auth_middleware),
    );

    Router::new()
        .merge(public_routes)
        .nest("/api", protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config))
}

async fn root() -> &'static str {
    "Phase Server"
}

async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    // Check database connection
    match sqlx::query("SELECT 1").fetch_one(state.pool.as_ref()).await {
        Ok(_) => Ok(Json(serde_json::json!({
            "status": "healthy",
            "database": "connected",
            "version": env!("CARGO_PKG_VERSION")
        }))),
        Err(_) => Err(StatusCode::SERVICE_UNAVAILABLE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn state() -> Arc<AppState> {
        let config = Config::from_toml("database_url = \"sqlite::memory:\"\nmax_connections = 1").unwrap();
        let pool = connect(&config).await.unwrap();
        phase_edms::migrations::run_migration(&pool).await.unwrap();
        Arc::new(AppState::new(Arc::new(pool), config).unwrap())
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let app = build_router(state().await);
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_api_requires_key() {
        let state = state().await;
        let (_, api_key) = AuthService::new(state.pool.clone())
            .create_user("user@phase.fr", "User")
            .await
            .unwrap();
        let app = build_router(state);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/reviews/counts")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/reviews/counts")
                    .header("X-API-Key", api_key)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["phase-server", "import", "3", "batch.csv"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Import { category_id: 3, .. })));

        let cli = Cli::try_parse_from(["phase-server", "--config", "phase.toml"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, Some(PathBuf::from("phase.toml")));
    }
}
