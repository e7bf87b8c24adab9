use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;

use dsaas_backend::state::AppState;
use dsaas_backend::{api, config, metrics, observability};

const API_PREFIX: &str = "/services/dataplatform/dsaas";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg_path = std::env::var("DSAAS_CONFIG").unwrap_or_else(|_| "config/dsaas.toml".into());
    let config = config::load_from_toml(&cfg_path).await?;
    tracing::info!(environment = %config.environment, "configuration loaded");

    let app_state = AppState::new(config)?;
    app_state.initialize().await;

    let app = Router::new()
        .route(&format!("{API_PREFIX}/"), get(api::root))
        .route(&format!("{API_PREFIX}/health"), get(api::health))
        .route(
            &format!("{API_PREFIX}/pipelines/:pipeline_id/trigger"),
            post(api::trigger_pipeline),
        )
        // Root level health endpoint for the load balancer
        .route("/health", get(api::health))
        .route("/metrics", get(metrics::metrics_handler))
        .with_state(app_state.clone())
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("DSaaS backend listening on {addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    app_state.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install shutdown signal handler");
        // Keep serving; without a handler there is no signal to wait for.
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
