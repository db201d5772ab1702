pub mod config;
pub mod error;
pub mod extract;
pub mod metrics;
pub mod routes;
pub mod schema;
pub mod state;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use config::{GatewayConfig, MAX_REQUEST_SIZE};
use state::AppState;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Build the prediction-contract router on the configured health and predict routes.
pub fn router(state: AppState, config: &GatewayConfig) -> Router {
    Router::new()
        .route(&config.health_route, get(routes::health::health_check))
        .route(&config.predict_route, post(routes::predict::predict))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_SIZE))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
