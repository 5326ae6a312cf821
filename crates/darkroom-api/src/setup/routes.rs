//! Route configuration and setup

use crate::api_doc::ApiDoc;
use crate::constants::MULTIPART_OVERHEAD_BYTES;
use crate::handlers;
use crate::middleware::request_id_middleware;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use darkroom_core::Config;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router, anyhow::Error> {
    let cors = setup_cors(config)?;

    // Multipart framing adds overhead on top of the file itself.
    let max_body = config.max_file_size_bytes + MULTIPART_OVERHEAD_BYTES;

    let api_routes = Router::new()
        .route("/images/upload", post(handlers::upload::upload_image))
        .route("/images/transform", post(handlers::transform::transform_image))
        .route(
            "/images/transform-url",
            post(handlers::transform_url::transform_image_from_url),
        )
        .route(
            "/images/{content_hash}/versions",
            get(handlers::versions::list_versions),
        )
        .route("/health", get(handlers::health::health_check))
        .route(
            "/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .with_state(state);

    let app = api_routes
        .merge(utoipa_rapidoc::RapiDoc::new("/openapi.json").path("/docs"))
        .layer(ConcurrencyLimitLayer::new(config.http_concurrency_limit))
        .layer(DefaultBodyLimit::max(max_body))
        .layer(RequestBodyLimitLayer::new(max_body))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware));

    Ok(app)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins.contains(&"*".to_string()) {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let origins: Result<Vec<HeaderValue>, _> =
            config.cors_origins.iter().map(|origin| origin.parse()).collect();

        CorsLayer::new()
            .allow_origin(origins?)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    };

    Ok(cors)
}
