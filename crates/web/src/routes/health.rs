//! Health check endpoint: GET /api/health

use axum::{extract::State, response::Json};

use crate::dto::{DataResponse, HealthResponse};
use crate::state::AppState;

fn build_health_response(state: &AppState) -> HealthResponse {
    HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        tracked: state.service.tracked(),
        capacity: state.service.capacity(),
    }
}

/// GET /api/health - Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<DataResponse<HealthResponse>> {
    Json(DataResponse::new(build_health_response(&state)))
}
