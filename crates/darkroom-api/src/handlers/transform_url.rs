use axum::{extract::State, response::Response};
use darkroom_core::models::ImageSource;
use darkroom_core::transform_request::TransformDocument;
use darkroom_core::AppError;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;

use crate::auth::BearerToken;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::handlers::transform::blob_response;
use crate::services::orchestrator::TransformService;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransformUrlRequest {
    pub url: String,
    #[serde(flatten)]
    pub transformations: TransformDocument,
}

/// Transform an image fetched from a URL.
///
/// JSON body: `{url, ...transformation fields at top level}`. The image is
/// fetched server-side (http/https only, optional host allowlist, size and
/// type limits as for uploads) before the operation set is applied.
#[utoipa::path(
    post,
    path = "/images/transform-url",
    tag = "images",
    request_body = TransformUrlRequest,
    responses(
        (status = 200, description = "Processed image bytes", content_type = "image/*"),
        (status = 400, description = "Invalid input or unfetchable URL", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 422, description = "Transform failed on this input", body = ErrorResponse),
        (status = 503, description = "Authorization service unavailable", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, bearer, request), fields(operation = "transform_image_from_url"))]
pub async fn transform_image_from_url(
    State(state): State<Arc<AppState>>,
    bearer: BearerToken,
    ValidatedJson(request): ValidatedJson<TransformUrlRequest>,
) -> Result<Response, HttpAppError> {
    let service = TransformService::new(&state);
    let decision = service
        .authorize(bearer.token())
        .await
        .map_err(HttpAppError::from)?;

    let ops = request
        .transformations
        .into_operation_set()
        .map_err(HttpAppError::from)?;

    let url = request.url.trim().to_string();
    let (data, filename) = fetch_image(&state, &url).await.map_err(HttpAppError::from)?;

    let outcome = service
        .process(
            data,
            filename.as_deref(),
            ImageSource::Url { url },
            ops,
        )
        .await
        .map_err(HttpAppError::from)?;

    blob_response(outcome, &decision)
}

/// Fetch image bytes from a caller-supplied URL with the same limits as a
/// direct upload.
async fn fetch_image(
    state: &AppState,
    url: &str,
) -> Result<(bytes::Bytes, Option<String>), AppError> {
    if url.is_empty() {
        return Err(AppError::InvalidInput("URL is required".to_string()));
    }

    let parsed = reqwest::Url::parse(url)
        .map_err(|_| AppError::InvalidInput(format!("Invalid URL format: {}", url)))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(AppError::InvalidInput(
            "Only HTTP and HTTPS URLs are allowed".to_string(),
        ));
    }

    if let Some(allowlist) = &state.config.url_fetch_allowlist {
        let host = parsed.host_str().unwrap_or_default().to_lowercase();
        if !allowlist.iter().any(|allowed| allowed == &host) {
            return Err(AppError::InvalidInput(format!(
                "URL host '{}' is not in the fetch allowlist",
                host
            )));
        }
    }

    tracing::info!(url = %url, "Fetching image from URL");

    let response = state
        .http
        .get(parsed.clone())
        .timeout(Duration::from_secs(state.config.url_fetch_timeout_seconds))
        .send()
        .await
        .map_err(|e| AppError::UpstreamFetch(format!("Failed to fetch URL: {}", e)))?;

    if !response.status().is_success() {
        return Err(AppError::UpstreamFetch(format!(
            "URL returned status {}",
            response.status()
        )));
    }

    // Size guard before buffering when the server declares a length; the
    // validator re-checks the actual byte count afterwards.
    if let Some(length) = response.content_length() {
        if length as usize > state.config.max_file_size_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "{} bytes exceeds max {} bytes",
                length, state.config.max_file_size_bytes
            )));
        }
    }

    let data = response
        .bytes()
        .await
        .map_err(|e| AppError::UpstreamFetch(format!("Failed to read response body: {}", e)))?;

    let filename = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty() && name.contains('.'))
        .map(|name| name.to_string());

    Ok((data, filename))
}
