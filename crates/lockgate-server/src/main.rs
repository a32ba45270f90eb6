//! Binary entrypoint for the lock gate HTTP server.
//!
//! Configuration comes from `LOCKGATE_*` environment variables; see
//! [`lockgate_server::config`].

use lockgate_server::config::ServerConfig;
use lockgate_server::router::build_router;
use lockgate_server::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env().expect("invalid lockgate configuration");
    let state = AppState::from_config(&config);
    let app = build_router(state.clone());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(
        %addr,
        ttl_secs = config.lease.ttl().as_secs(),
        max_attempts = config.lease.max_attempts(),
        "lockgate server starting"
    );

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .unwrap();
}

/// Waits for Ctrl+C or SIGTERM, then stops pending lock acquisitions so the
/// server only waits on requests that already hold their lease.
async fn shutdown_signal(state: AppState) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }

    state.shutdown();
}
