use crate::{error::ApiError, state::AppState};
use axum::{Json, extract::State};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// 200 once the model is loaded, 503 while loading or after a failed load.
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    if !state.is_model_ready() {
        return Err(ApiError::ModelNotReady);
    }
    Ok(Json(HealthResponse { status: "healthy" }))
}
