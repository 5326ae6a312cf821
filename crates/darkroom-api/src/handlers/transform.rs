use axum::{
    body::Body,
    extract::{Multipart, State},
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use darkroom_auth::AuthDecision;
use darkroom_core::models::ImageSource;
use darkroom_core::AppError;
use std::sync::Arc;

use crate::auth::BearerToken;
use crate::constants::{HEADER_AUTH_REASON, HEADER_CACHE, HEADER_FINGERPRINT};
use crate::error::{ErrorResponse, HttpAppError};
use crate::services::orchestrator::{TransformOutcome, TransformService};
use crate::state::AppState;

/// Transform an uploaded image in one request.
///
/// Multipart fields: `image` (the file) and `transformations` (a JSON
/// document selecting operations). The response body is the processed image;
/// `x-darkroom-cache` reports whether it was recomputed or served from the
/// result cache. `remove_background` is markedly slower than the other
/// operations - budget request timeouts accordingly.
#[utoipa::path(
    post,
    path = "/images/transform",
    tag = "images",
    responses(
        (status = 200, description = "Processed image bytes", content_type = "image/*"),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 422, description = "Transform failed on this input", body = ErrorResponse),
        (status = 503, description = "Authorization service unavailable", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart, bearer), fields(operation = "transform_image"))]
pub async fn transform_image(
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

    let document = parts.transformations.ok_or_else(|| {
        HttpAppError(AppError::InvalidInput(
            "Missing 'transformations' part".to_string(),
        ))
    })?;
    let ops = document.into_operation_set().map_err(HttpAppError::from)?;

    let outcome = service
        .process(
            parts.image.data,
            parts.image.filename.as_deref(),
            ImageSource::Upload,
            ops,
        )
        .await
        .map_err(HttpAppError::from)?;

    blob_response(outcome, &decision)
}

/// Binary response for a processed image, with fingerprint/cache/auth
/// headers for observability.
pub fn blob_response(
    outcome: TransformOutcome,
    decision: &AuthDecision,
) -> Result<Response, HttpAppError> {
    tracing::info!(
        fingerprint = %outcome.fingerprint,
        cache = outcome.cache_status.as_str(),
        content_type = %outcome.content_type,
        "Returning processed image"
    );

    let fingerprint_header = HeaderValue::from_str(outcome.fingerprint.as_str())
        .map_err(|e| AppError::Internal(format!("Invalid fingerprint header: {}", e)))?;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, outcome.content_type)
        .header(header::CONTENT_LENGTH, outcome.bytes.len())
        .header(HEADER_FINGERPRINT, fingerprint_header)
        .header(
            HEADER_CACHE,
            HeaderValue::from_static(outcome.cache_status.as_str()),
        )
        .header(
            HEADER_AUTH_REASON,
            HeaderValue::from_static(decision.reason.as_str()),
        )
        .body(Body::from(outcome.bytes))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}
