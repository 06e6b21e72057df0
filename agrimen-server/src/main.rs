//! AGRIMEN Serving Server
//!
//! HTTP front for the AGRIMEN crop models: single predictions from forms or
//! JSON, CSV batch scoring, model and locale introspection.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    AGRIMEN SERVER                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────────┐  ┌─────────────────────┐ │
//! │  │  API      │  │  Predict      │  │  Batch Scoring      │ │
//! │  │  Gateway  │  │  (form/JSON)  │  │  (CSV, blocking)    │ │
//! │  │  (Axum)   │  │               │  │                     │ │
//! │  └─────┬─────┘  └───────┬───────┘  └──────────┬──────────┘ │
//! │        └────────────────┼─────────────────────┘            │
//! │                         ▼                                   │
//! │               ┌──────────────────┐                         │
//! │               │ ServingContext   │  (Arc, read-only)       │
//! │               └──────────────────┘                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod handlers;
mod models;


use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agrimen_core::ServingContext;

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    // Initialize logging (core `log` records are bridged into tracing)
    let json_logs = config.is_production();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "agrimen_server=debug,agrimen_core=info,tower_http=debug".into()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .init();

    tracing::info!("AGRIMEN server starting ({})...", config.environment);
    tracing::info!("Artifacts: {}", config.artifacts_dir.display());

    // Load every model once; a broken artifact refuses to start
    let context = ServingContext::load_dir(&config.artifacts_dir, &config.default_locale)
        .with_context(|| format!("failed to load models from {}", config.artifacts_dir.display()))?;

    // Build application state
    let state = AppState {
        context: Arc::new(context),
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub context: Arc<ServingContext>,
    pub config: config::Config,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;

    let model_routes = Router::new()
        .route("/api/v1/models", get(handlers::models::list))
        .route("/api/v1/models/:name", get(handlers::models::get))
        .route("/api/v1/models/:name/predict", post(handlers::predict::predict_json))
        .route("/api/v1/models/:name/predict/form", post(handlers::predict::predict_form))
        .route("/api/v1/models/:name/batch", post(handlers::batch::score));

    let locale_routes = Router::new()
        .route("/api/v1/locales", get(handlers::locales::list))
        .route("/api/v1/locales/:locale", get(handlers::locales::get));

    // Combine all routes
    Router::new()
        .route("/health", get(handlers::health::check))
        .merge(model_routes)
        .merge(locale_routes)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
