//! OpenAPI documentation

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "darkroom",
        description = "Image transformation service with content-addressed result caching and per-source version history"
    ),
    paths(
        crate::handlers::upload::upload_image,
        crate::handlers::transform::transform_image,
        crate::handlers::transform_url::transform_image_from_url,
        crate::handlers::versions::list_versions,
        crate::handlers::health::health_check,
    ),
    components(schemas(
        crate::error::ErrorResponse,
        crate::handlers::transform_url::TransformUrlRequest,
        crate::handlers::versions::VersionsResponse,
        crate::handlers::health::HealthResponse,
        darkroom_core::models::SourceImageResponse,
        darkroom_core::models::ProcessedVersionResponse,
        darkroom_core::transform_request::TransformDocument,
        darkroom_core::transform_request::BlurRequest,
        darkroom_core::transform_request::RotateRequest,
        darkroom_core::transform_request::ResizeRequest,
    )),
    tags(
        (name = "images", description = "Image intake and transformation"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
