use common::{TelemetryGuard, setup_logging};
use gateway::{config::GatewayConfig, state::AppState};
use inference::Detector;
use std::net::SocketAddr;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::from_env();

    let _telemetry = match config.otel_endpoint.as_deref() {
        Some(endpoint) => Some(TelemetryGuard::init("gateway", endpoint, config.environment)?),
        None => {
            setup_logging(config.environment);
            None
        }
    };

    tracing::info!(config = ?config, "Loaded configuration");

    let state = AppState::new();
    let app = gateway::router(state.clone(), &config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        health_route = %config.health_route,
        predict_route = %config.predict_route,
        "Server listening"
    );

    // Health reports 503 until this finishes
    let loader_state = state.clone();
    let detector_config = config.detector.clone();
    tokio::task::spawn_blocking(move || {
        tracing::info!("Loading detection model");
        let detector = Detector::load(&detector_config);
        match detector.class_names() {
            Some(classes) => tracing::info!(
                path = detector.model_path(),
                classes = classes.len(),
                "Model ready to serve"
            ),
            None => {
                tracing::error!("Model failed to load, health checks will report unavailable")
            }
        }
        loader_state.install(detector);
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    drop(state);
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
