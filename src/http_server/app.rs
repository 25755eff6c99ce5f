use std::sync::Arc;

use axum::{Router, routing::get};
use color_eyre::eyre::{Context, eyre};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::http_server::{http_routes, state::AppState};

pub struct HttpServerConfig {
    pub port: u16,
    pub app_state: AppState,
}

async fn health() -> &'static str {
    "ok"
}

pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ard/show/{id}", get(http_routes::feed::get_ard_feed))
        .route("/show/id/{id}", get(http_routes::feed::get_ard_feed))
        .route("/zdf/show/{*path}", get(http_routes::feed::get_zdf_feed))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(app_state)
}

pub async fn start(config: HttpServerConfig) -> color_eyre::Result<()> {
    let app = router(Arc::new(config.app_state));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .wrap_err_with(|| eyre!("Failed to bind to port {}", config.port))?;
    tracing::info!(port = config.port, "Starting HTTP server");
    axum::serve(listener, app)
        .await
        .wrap_err("Failed to start HTTP server")?;

    Ok(())
}
