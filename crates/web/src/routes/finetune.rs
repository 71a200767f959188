//! Finetune endpoints under `/api/v1/aiccfinetune`.

use axum::{
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
};
use tunewatch_core::JobHandle;

use crate::dto::{CreateFinetuneRequest, DataResponse, UrlResponse};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// POST /api/v1/aiccfinetune - Create a job and start watching it
pub async fn create_finetune(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateFinetuneRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DataResponse<JobHandle>>)> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let spec = request.into_spec()?;

    let handle = state.service.create(spec).await?;

    Ok((StatusCode::CREATED, Json(DataResponse::new(handle))))
}

/// DELETE /api/v1/aiccfinetune/{id} - Delete a job
pub async fn delete_finetune(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode> {
    state.service.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/aiccfinetune/{id} - Terminate a job
pub async fn terminate_finetune(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<DataResponse<&'static str>>)> {
    state.service.terminate(&id).await?;
    Ok((StatusCode::ACCEPTED, Json(DataResponse::new("success"))))
}

/// GET /api/v1/aiccfinetune/{id}/log - Log download URL
pub async fn get_log(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<DataResponse<UrlResponse>>> {
    let url = state.service.log_download_url(&id).await?;
    Ok(Json(DataResponse::new(UrlResponse { url })))
}

/// GET /api/v1/aiccfinetune/{id}/result/{file} - Download URL for a result object
pub async fn get_download_url(
    Path((_id, file)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<DataResponse<UrlResponse>>> {
    let url = state.service.file_download_url(&file).await?;
    Ok(Json(DataResponse::new(UrlResponse { url })))
}
