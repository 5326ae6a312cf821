use axum::{
    extract::{Multipart, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use darkroom_core::models::{ImageSource, SourceImageResponse};
use std::sync::Arc;

use crate::auth::BearerToken;
use crate::constants::HEADER_AUTH_REASON;
use crate::error::{ErrorResponse, HttpAppError};
use crate::services::orchestrator::TransformService;
use crate::state::AppState;

/// Upload image handler
///
/// Validates the file (JPEG/PNG/GIF, size limit), stores the original blob
/// under its content hash, and records the source in the version ledger.
/// Intake is idempotent: re-uploading identical bytes returns the existing
/// record.
#[utoipa::path(
    post,
    path = "/images/upload",
    tag = "images",
    responses(
        (status = 201, description = "Image accepted", body = SourceImageResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart, bearer), fields(operation = "upload_image"))]
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    bearer: BearerToken,
    mut multipart: Multipart,
) -> Result<Response, HttpAppError> {
    let service = TransformService::new(&state);
    let decision = service
        .authorize(bearer.token())
        .await
        .map_err(HttpAppError::from)?;

    let parts = super::read_multipart(&mut multipart)
        .await
        .map_err(HttpAppError::from)?;

    let source = service
        .intake(
            parts.image.data,
            parts.image.filename.as_deref(),
            ImageSource::Upload,
        )
        .await
        .map_err(HttpAppError::from)?;

    tracing::info!(
        content_hash = %source.content_hash,
        file_size = source.file_size,
        "Image uploaded"
    );

    let mut response = (
        StatusCode::CREATED,
        Json(SourceImageResponse::from(source)),
    )
        .into_response();
    response.headers_mut().insert(
        HEADER_AUTH_REASON,
        HeaderValue::from_static(decision.reason.as_str()),
    );
    Ok(response)
}
