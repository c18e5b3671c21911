//! # Server Module
//!
//! HTTP server setup and route configuration for the league worker.

use axum::http::{HeaderValue, Method, header};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::analysis::OpenAiGenerator;
use crate::config::Config;
use crate::cron::TradeDiscoveryJob;
use crate::database::{AnalysisStore, DatabaseConfig, DatabaseConnection, migrations};
use crate::routes::{analysis, health};
use crate::sleeper::SleeperClient;

/// Application state shared across all route handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AnalysisStore>,
    pub service: String,
    pub version: String,
}

/// Build the router: analysis read endpoints, health checks, JSON error
/// fallbacks and a CORS layer restricted to the configured origin with
/// GET/OPTIONS only.
pub fn app(state: AppState, allowed_origin: &str) -> Router {
    let origin = allowed_origin
        .parse::<HeaderValue>()
        .expect("CORS_ALLOWED_ORIGIN must be a valid header value");

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health::health))
        .route("/health", get(health::health))
        .route("/api/trade-analysis", get(analysis::get_analysis))
        .route("/api/trade-analyses", get(analysis::get_batch_analyses))
        .fallback(analysis::not_found)
        .method_not_allowed_fallback(analysis::method_not_allowed)
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state)
}

/// Starts the league worker: database, discovery scheduler and HTTP server.
///
/// Runs until the process is terminated.
pub async fn start() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Initialize database connection and schema
    let db = DatabaseConnection::new(DatabaseConfig::from_url(&config.database_url)?).await?;
    migrations::run_migrations(db.pool()).await?;
    let store: Arc<dyn AnalysisStore> = Arc::new(db);

    // Trade discovery job, driven by an in-process scheduler
    let source = Arc::new(SleeperClient::new(config.sleeper_league_id.clone()));
    let generator =
        Arc::new(OpenAiGenerator::new(config.openai_api_key.clone()).with_model(config.openai_model.clone()));
    let job = Arc::new(TradeDiscoveryJob::new(
        source,
        generator,
        store.clone(),
        config.sleeper_league_id.clone(),
        config.analysis_version.clone(),
    ));
    tokio::spawn(job.start(Duration::from_secs(config.cron_interval_secs)));

    let state = AppState {
        store,
        service: env!("CARGO_PKG_NAME").to_string(),
        version: config.analysis_version.clone(),
    };
    let app = app(state, &config.cors_allowed_origin);

    let addr = std::net::SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("🚀 League worker listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
