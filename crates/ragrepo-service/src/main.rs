//! ragrepo-service -- the HTTP surface over `ragrepo_core::Facade` (spec §6).
//!
//! Exposes `GET /`, `POST /build_embeddings`, `POST /query`, and
//! `POST /summarize` as JSON-over-HTTPS. CORS is a custom origin policy
//! (`cors` module) rather than a blanket `tower_http::cors::CorsLayer`,
//! since an unmatched origin must 403 before the handler runs rather than
//! simply omitting CORS headers. Request logging goes through
//! `tower_http`'s `TraceLayer`.

mod cors;
mod error;
mod routes;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use ragrepo_core::{Config, Facade};
use tower_http::trace::TraceLayer;

fn default_port() -> u16 {
    std::env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8080)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();

    tracing_subscriber::fmt().with_env_filter(config.logging.level.clone()).init();

    let allowed_origins = Arc::new(config.cors.allowed_origins.clone());
    let facade = Arc::new(Facade::new(config).context("failed to initialize engine")?);

    let app = Router::new()
        .route("/", get(routes::root))
        .route("/build_embeddings", post(routes::build_embeddings))
        .route("/query", post(routes::query))
        .route("/summarize", post(routes::summarize))
        .layer(axum::middleware::from_fn_with_state(allowed_origins, cors::cors_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(facade);

    let port = default_port();
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await.context("failed to bind listener")?;
    tracing::info!(port, "ragrepo-service listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
