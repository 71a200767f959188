//! REST API routes
//!
//! ## Route Structure
//!
//! - `GET /api/health` - Health check with watch capacity
//! - `POST /api/v1/aiccfinetune` - Create and watch a finetune job
//! - `DELETE /api/v1/aiccfinetune/{id}` - Delete a job
//! - `PUT /api/v1/aiccfinetune/{id}` - Terminate a job
//! - `GET /api/v1/aiccfinetune/{id}/log` - Log download URL
//! - `GET /api/v1/aiccfinetune/{id}/result/{file}` - Result file download URL

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

pub mod finetune;
pub mod health;

/// Create the API router. State is supplied by the caller.
pub fn create_router() -> Router<AppState> {
    let api_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/v1/aiccfinetune", post(finetune::create_finetune))
        .route(
            "/v1/aiccfinetune/{id}",
            put(finetune::terminate_finetune).delete(finetune::delete_finetune),
        )
        .route("/v1/aiccfinetune/{id}/log", get(finetune::get_log))
        .route(
            "/v1/aiccfinetune/{id}/result/{file}",
            get(finetune::get_download_url),
        );

    Router::new().nest("/api", api_routes)
}
