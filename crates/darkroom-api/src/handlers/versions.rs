use axum::{
    extract::{Path, Query, State},
    Json,
};
use darkroom_core::models::ProcessedVersionResponse;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::BearerToken;
use crate::error::{ErrorResponse, HttpAppError};
use crate::services::orchestrator::TransformService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct VersionsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VersionsResponse {
    pub content_hash: String,
    pub total: i64,
    pub versions: Vec<ProcessedVersionResponse>,
}

/// List the processed versions of a source image, ordered by creation time
/// ascending. Restartable via `offset`.
#[utoipa::path(
    get,
    path = "/images/{content_hash}/versions",
    tag = "images",
    params(
        ("content_hash" = String, Path, description = "Content hash of the source image"),
        ("limit" = Option<i64>, Query, description = "Page size (default 50)"),
        ("offset" = Option<i64>, Query, description = "Start position (default 0)")
    ),
    responses(
        (status = 200, description = "Version history", body = VersionsResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Unknown source image", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, bearer), fields(operation = "list_versions"))]
pub async fn list_versions(
    State(state): State<Arc<AppState>>,
    bearer: BearerToken,
    Path(content_hash): Path<String>,
    Query(query): Query<VersionsQuery>,
) -> Result<Json<VersionsResponse>, HttpAppError> {
    let service = TransformService::new(&state);
    service
        .authorize(bearer.token())
        .await
        .map_err(HttpAppError::from)?;

    let limit = query.limit.clamp(1, 500);
    let offset = query.offset.max(0);

    let (source, versions, total) = service
        .list_versions(&content_hash, limit, offset)
        .await
        .map_err(HttpAppError::from)?;

    Ok(Json(VersionsResponse {
        content_hash: source.content_hash,
        total,
        versions: versions
            .into_iter()
            .map(ProcessedVersionResponse::from)
            .collect(),
    }))
}
