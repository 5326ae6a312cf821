//! End-to-end API tests against the in-process router.
//!
//! The full stack is real except for externals: blob storage on a temp dir,
//! the in-memory ledger and cache, and a stub authorization service bound to
//! an ephemeral port.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use darkroom_api::{setup, AppState};
use darkroom_auth::{AuthClient, AuthClientConfig};
use darkroom_cache::{InMemoryResultCache, ResultCache};
use darkroom_core::config::{AuthFallbackMode, Config};
use darkroom_core::content_hash;
use darkroom_ledger::{InMemoryVersionLedger, VersionLedger};
use darkroom_storage::{LocalStorage, Storage};
use http_body_util::BodyExt;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const BOUNDARY: &str = "darkroomtestboundary";

fn test_config(storage_path: &std::path::Path, auth_url: &str, fallback: AuthFallbackMode) -> Config {
    Config {
        server_port: 0,
        environment: "test".to_string(),
        cors_origins: vec!["*".to_string()],
        database_url: None,
        db_max_connections: 5,
        db_timeout_seconds: 5,
        storage_path: storage_path.display().to_string(),
        storage_base_url: "http://localhost:8080/blobs".to_string(),
        max_file_size_bytes: 10 * 1024 * 1024,
        allowed_extensions: vec![
            "jpg".to_string(),
            "jpeg".to_string(),
            "png".to_string(),
            "gif".to_string(),
        ],
        allowed_content_types: vec![
            "image/jpeg".to_string(),
            "image/png".to_string(),
            "image/gif".to_string(),
        ],
        cache_ttl_seconds: 3600,
        cache_sweep_interval_seconds: 60,
        auth_service_url: auth_url.to_string(),
        auth_timeout_seconds: 1,
        auth_max_retries: 1,
        auth_fallback_mode: fallback,
        url_fetch_timeout_seconds: 5,
        url_fetch_allowlist: None,
        http_concurrency_limit: 64,
    }
}

struct TestApp {
    router: Router,
    state: Arc<AppState>,
    _storage_dir: tempfile::TempDir,
}

async fn build_app(auth_url: &str, fallback: AuthFallbackMode) -> TestApp {
    build_app_with(auth_url, fallback, |config| config).await
}

async fn build_app_with(
    auth_url: &str,
    fallback: AuthFallbackMode,
    adjust: impl FnOnce(Config) -> Config,
) -> TestApp {
    let storage_dir = tempfile::tempdir().unwrap();
    let config = adjust(test_config(storage_dir.path(), auth_url, fallback));

    let storage: Arc<dyn Storage> = Arc::new(
        LocalStorage::new(storage_dir.path(), config.storage_base_url.clone())
            .await
            .unwrap(),
    );
    let cache: Arc<dyn ResultCache> = Arc::new(InMemoryResultCache::new());
    let ledger: Arc<dyn VersionLedger> = Arc::new(InMemoryVersionLedger::new());
    let auth = AuthClient::new(AuthClientConfig {
        base_url: config.auth_service_url.clone(),
        timeout: Duration::from_secs(config.auth_timeout_seconds),
        max_retries: config.auth_max_retries,
        fallback_mode: config.auth_fallback_mode,
    })
    .unwrap();
    let http = reqwest::Client::new();

    let state = Arc::new(AppState::new(
        config.clone(),
        storage,
        cache,
        ledger,
        auth,
        http,
    ));
    let router = setup::routes::setup_routes(&config, state.clone()).unwrap();

    TestApp {
        router,
        state,
        _storage_dir: storage_dir,
    }
}

/// Stub server bound to an ephemeral port; returns its base URL.
async fn spawn_stub(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Auth service stub that accepts every token.
async fn spawn_auth_ok() -> String {
    let router = Router::new().route(
        "/auth/me",
        get(|| async { Json(serde_json::json!({"user_id": "u-1", "roles": ["user"]})) }),
    );
    spawn_stub(router).await
}

/// Auth service stub that rejects every token.
async fn spawn_auth_denied() -> String {
    let router = Router::new().route("/auth/me", get(|| async { StatusCode::UNAUTHORIZED }));
    spawn_stub(router).await
}

fn png_fixture(width: u32, height: u32) -> Vec<u8> {
    use image::{DynamicImage, Rgba, RgbaImage};
    let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 120, 255])
    }));
    let mut buf = Vec::new();
    img.write_to(
        &mut std::io::Cursor::new(&mut buf),
        image::ImageFormat::Png,
    )
    .unwrap();
    buf
}

fn multipart_body(image: &[u8], filename: &str, transformations: Option<&str>) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            BOUNDARY, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(image);
    body.extend_from_slice(b"\r\n");
    if let Some(doc) = transformations {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"transformations\"\r\n\r\n{}\r\n",
                BOUNDARY, doc
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_request(uri: &str, body: Vec<u8>, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body)).unwrap()
}

async fn send(
    app: &TestApp,
    request: Request<Body>,
) -> (StatusCode, axum::http::HeaderMap, bytes::Bytes) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body)
}

async fn transform(
    app: &TestApp,
    image: &[u8],
    transformations: &str,
) -> (StatusCode, axum::http::HeaderMap, bytes::Bytes) {
    let body = multipart_body(image, "test.png", Some(transformations));
    send(
        app,
        multipart_request("/images/transform", body, Some("token")),
    )
    .await
}

#[tokio::test]
async fn test_health() {
    let auth = spawn_auth_ok().await;
    let app = build_app(&auth, AuthFallbackMode::Restrictive).await;

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["ledger"], "ok");
}

#[tokio::test]
async fn test_upload_returns_metadata() {
    let auth = spawn_auth_ok().await;
    let app = build_app(&auth, AuthFallbackMode::Restrictive).await;

    let png = png_fixture(40, 30);
    let body = multipart_body(&png, "photo.png", None);
    let (status, headers, response_body) = send(
        &app,
        multipart_request("/images/upload", body, Some("token")),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(headers["x-darkroom-auth"], "validated");

    let json: serde_json::Value = serde_json::from_slice(&response_body).unwrap();
    assert_eq!(json["content_hash"].as_str().unwrap(), content_hash(&png));
    assert_eq!(json["width"], 40);
    assert_eq!(json["height"], 30);
    assert_eq!(json["content_type"], "image/png");
    assert_eq!(json["perceptual_hash"].as_str().unwrap().len(), 16);
}

#[tokio::test]
async fn test_upload_is_idempotent_on_content() {
    let auth = spawn_auth_ok().await;
    let app = build_app(&auth, AuthFallbackMode::Restrictive).await;

    let png = png_fixture(16, 16);
    let first = send(
        &app,
        multipart_request(
            "/images/upload",
            multipart_body(&png, "a.png", None),
            Some("token"),
        ),
    )
    .await;
    let second = send(
        &app,
        multipart_request(
            "/images/upload",
            multipart_body(&png, "b.png", None),
            Some("token"),
        ),
    )
    .await;

    let a: serde_json::Value = serde_json::from_slice(&first.2).unwrap();
    let b: serde_json::Value = serde_json::from_slice(&second.2).unwrap();
    assert_eq!(a["metadata_id"], b["metadata_id"]);
}

#[tokio::test]
async fn test_upload_rejects_non_image() {
    let auth = spawn_auth_ok().await;
    let app = build_app(&auth, AuthFallbackMode::Restrictive).await;

    let body = multipart_body(b"definitely not an image", "note.png", None);
    let (status, _, response_body) = send(
        &app,
        multipart_request("/images/upload", body, Some("token")),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: serde_json::Value = serde_json::from_slice(&response_body).unwrap();
    assert!(json["message"].as_str().is_some());
    assert_eq!(json["recoverable"], false);
}

#[tokio::test]
async fn test_upload_rejects_disallowed_extension() {
    let auth = spawn_auth_ok().await;
    let app = build_app(&auth, AuthFallbackMode::Restrictive).await;

    let png = png_fixture(8, 8);
    let body = multipart_body(&png, "image.bmp", None);
    let (status, _, _) = send(
        &app,
        multipart_request("/images/upload", body, Some("token")),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_rejects_oversized_file() {
    let auth = spawn_auth_ok().await;
    // Tiny limit so the fixture exceeds it without a 10 MiB body.
    let app = build_app_with(&auth, AuthFallbackMode::Restrictive, |mut config| {
        config.max_file_size_bytes = 64;
        config
    })
    .await;

    let png = png_fixture(64, 64);
    let body = multipart_body(&png, "big.png", None);
    let (status, _, _) = send(
        &app,
        multipart_request("/images/upload", body, Some("token")),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let auth = spawn_auth_ok().await;
    let app = build_app(&auth, AuthFallbackMode::Restrictive).await;

    let png = png_fixture(8, 8);
    let body = multipart_body(&png, "a.png", None);
    let (status, _, _) = send(&app, multipart_request("/images/upload", body, None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_transform_grayscale_miss_then_hit() {
    let auth = spawn_auth_ok().await;
    let app = build_app(&auth, AuthFallbackMode::Restrictive).await;

    let png = png_fixture(32, 32);
    let doc = r#"{"grayscale": true}"#;

    let (status, headers, body) = transform(&app, &png, doc).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "image/png");
    assert_eq!(headers["x-darkroom-cache"], "miss");
    let fingerprint = headers["x-darkroom-fingerprint"].to_str().unwrap().to_string();
    assert_eq!(fingerprint.len(), 64);

    // Output really is grayscale
    let decoded = image::load_from_memory(&body).unwrap().to_rgba8();
    let pixel = decoded.get_pixel(5, 9);
    assert_eq!(pixel[0], pixel[1]);
    assert_eq!(pixel[1], pixel[2]);

    // Identical request: served from cache, byte-identical, no new version
    let (status2, headers2, body2) = transform(&app, &png, doc).await;
    assert_eq!(status2, StatusCode::OK);
    assert_eq!(headers2["x-darkroom-cache"], "hit");
    assert_eq!(headers2["x-darkroom-fingerprint"].to_str().unwrap(), fingerprint);
    assert_eq!(body, body2);

    let source_hash = content_hash(&png);
    assert_eq!(app.state.ledger.count_versions(&source_hash).await.unwrap(), 1);
}

#[tokio::test]
async fn test_transform_resize_maintains_aspect_ratio() {
    let auth = spawn_auth_ok().await;
    let app = build_app(&auth, AuthFallbackMode::Restrictive).await;

    // 300x200 source, width 150 requested, mismatched height ignored.
    let png = png_fixture(300, 200);
    let doc = r#"{"resize": {"apply": true, "width": 150, "height": 0, "type": "maintain_aspect_ratio"}}"#;

    let (status, _, body) = transform(&app, &png, doc).await;
    assert_eq!(status, StatusCode::OK);

    let decoded = image::load_from_memory(&body).unwrap();
    assert_eq!(image::GenericImageView::dimensions(&decoded), (150, 100));
}

#[tokio::test]
async fn test_transform_rotate_swaps_dimensions() {
    let auth = spawn_auth_ok().await;
    let app = build_app(&auth, AuthFallbackMode::Restrictive).await;

    let png = png_fixture(80, 60);
    let doc = r#"{"rotate": {"apply": true, "angle": 90}}"#;

    let (status, _, body) = transform(&app, &png, doc).await;
    assert_eq!(status, StatusCode::OK);

    let decoded = image::load_from_memory(&body).unwrap();
    assert_eq!(image::GenericImageView::dimensions(&decoded), (60, 80));
}

#[tokio::test]
async fn test_remove_background_outputs_png_with_alpha() {
    let auth = spawn_auth_ok().await;
    let app = build_app(&auth, AuthFallbackMode::Restrictive).await;

    // Solid-bordered image: background removal must produce transparency.
    use image::{DynamicImage, Rgba, RgbaImage};
    let mut raw = RgbaImage::from_pixel(24, 24, Rgba([255, 255, 255, 255]));
    for y in 8..16 {
        for x in 8..16 {
            raw.put_pixel(x, y, Rgba([200, 30, 30, 255]));
        }
    }
    let mut png = Vec::new();
    DynamicImage::ImageRgba8(raw)
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();

    let doc = r#"{"remove_background": true}"#;
    let (status, headers, body) = transform(&app, &png, doc).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "image/png");

    let decoded = image::load_from_memory(&body).unwrap().to_rgba8();
    assert_eq!(decoded.get_pixel(0, 0)[3], 0, "border should be transparent");
    assert_eq!(decoded.get_pixel(12, 12)[3], 255, "subject should be opaque");
}

#[tokio::test]
async fn test_validation_boundaries() {
    let auth = spawn_auth_ok().await;
    let app = build_app(&auth, AuthFallbackMode::Restrictive).await;
    let png = png_fixture(24, 24);

    // Blur radius 0 and 51 rejected, 1 and 50 accepted.
    let (status, _, _) = transform(&app, &png, r#"{"blur": {"apply": true, "radius": 0}}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _, _) = transform(&app, &png, r#"{"blur": {"apply": true, "radius": 51}}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _, _) = transform(&app, &png, r#"{"blur": {"apply": true, "radius": 1}}"#).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = transform(&app, &png, r#"{"blur": {"apply": true, "radius": 50}}"#).await;
    assert_eq!(status, StatusCode::OK);

    // Resize width 5001 rejected, 5000 accepted.
    let (status, _, _) = transform(
        &app,
        &png,
        r#"{"resize": {"apply": true, "width": 5001, "height": 10, "type": "free"}}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _, _) = transform(
        &app,
        &png,
        r#"{"resize": {"apply": true, "width": 5000, "height": 10, "type": "free"}}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Invalid rotation angle rejected.
    let (status, _, _) = transform(&app, &png, r#"{"rotate": {"apply": true, "angle": 45}}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // A document that selects nothing is rejected.
    let (status, _, _) = transform(&app, &png, r#"{}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_version_ledger_accumulates_distinct_variants() {
    let auth = spawn_auth_ok().await;
    let app = build_app(&auth, AuthFallbackMode::Restrictive).await;

    let png = png_fixture(48, 48);
    let source_hash = content_hash(&png);

    let (status, _, _) = transform(&app, &png, r#"{"grayscale": true}"#).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = transform(
        &app,
        &png,
        r#"{"grayscale": true, "blur": {"apply": true, "radius": 5}}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let uri = format!("/images/{}/versions", source_hash);
    let request = Request::builder()
        .uri(&uri)
        .header(header::AUTHORIZATION, "Bearer token")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["total"], 2);
    let versions = json["versions"].as_array().unwrap();
    assert_eq!(versions.len(), 2);
    // Creation order ascending: grayscale-only first
    assert_eq!(
        versions[0]["operations"],
        serde_json::json!([{"op": "grayscale"}])
    );
    assert!(versions[0]["created_at"].as_str().unwrap() <= versions[1]["created_at"].as_str().unwrap());
}

#[tokio::test]
async fn test_versions_unknown_source_is_404() {
    let auth = spawn_auth_ok().await;
    let app = build_app(&auth, AuthFallbackMode::Restrictive).await;

    let request = Request::builder()
        .uri("/images/deadbeef/versions")
        .header(header::AUTHORIZATION, "Bearer token")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cache_expiry_recomputes_without_duplicating_versions() {
    let auth = spawn_auth_ok().await;
    let app = build_app_with(&auth, AuthFallbackMode::Restrictive, |mut config| {
        config.cache_ttl_seconds = 0;
        config
    })
    .await;

    let png = png_fixture(20, 20);
    let doc = r#"{"grayscale": true}"#;

    let (_, headers, _) = transform(&app, &png, doc).await;
    assert_eq!(headers["x-darkroom-cache"], "miss");

    // TTL zero: the entry is already expired, so this recomputes...
    let (_, headers, _) = transform(&app, &png, doc).await;
    assert_eq!(headers["x-darkroom-cache"], "miss");

    // ...but the ledger still holds exactly one version.
    let source_hash = content_hash(&png);
    assert_eq!(app.state.ledger.count_versions(&source_hash).await.unwrap(), 1);
}

#[tokio::test]
async fn test_auth_denied_is_401() {
    let auth = spawn_auth_denied().await;
    let app = build_app(&auth, AuthFallbackMode::Permissive).await;

    let png = png_fixture(8, 8);
    let (status, _, _) = transform(&app, &png, r#"{"grayscale": true}"#).await;
    // Denial is authoritative even under a permissive fallback policy.
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_unreachable_restrictive_rejects() {
    let app = build_app("http://127.0.0.1:9", AuthFallbackMode::Restrictive).await;

    let png = png_fixture(8, 8);
    let (status, _, body) = transform(&app, &png, r#"{"grayscale": true}"#).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["recoverable"], true);
}

#[tokio::test]
async fn test_auth_unreachable_permissive_proceeds() {
    let app = build_app("http://127.0.0.1:9", AuthFallbackMode::Permissive).await;

    let png = png_fixture(8, 8);
    let (status, headers, _) = transform(&app, &png, r#"{"grayscale": true}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["x-darkroom-auth"], "fallback-permissive");
}

#[tokio::test]
async fn test_transform_url_fetches_and_processes() {
    let auth = spawn_auth_ok().await;
    let app = build_app(&auth, AuthFallbackMode::Restrictive).await;

    let png = png_fixture(50, 40);
    let served = png.clone();
    let image_server = Router::new().route(
        "/img.png",
        get(move || {
            let data = served.clone();
            async move { ([(header::CONTENT_TYPE, "image/png")], data) }
        }),
    );
    let image_base = spawn_stub(image_server).await;

    let request_body = serde_json::json!({
        "url": format!("{}/img.png", image_base),
        "grayscale": true,
        "rotate": {"apply": true, "angle": 90}
    });
    let request = Request::builder()
        .method("POST")
        .uri("/images/transform-url")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, "Bearer token")
        .body(Body::from(request_body.to_string()))
        .unwrap();

    let (status, headers, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["x-darkroom-cache"], "miss");

    let decoded = image::load_from_memory(&body).unwrap();
    assert_eq!(image::GenericImageView::dimensions(&decoded), (40, 50));
}

#[tokio::test]
async fn test_transform_url_rejects_non_http_schemes() {
    let auth = spawn_auth_ok().await;
    let app = build_app(&auth, AuthFallbackMode::Restrictive).await;

    let request_body = serde_json::json!({
        "url": "ftp://example.com/img.png",
        "grayscale": true
    });
    let request = Request::builder()
        .method("POST")
        .uri("/images/transform-url")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, "Bearer token")
        .body(Body::from(request_body.to_string()))
        .unwrap();

    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_transform_url_respects_allowlist() {
    let auth = spawn_auth_ok().await;
    let app = build_app_with(&auth, AuthFallbackMode::Restrictive, |mut config| {
        config.url_fetch_allowlist = Some(vec!["images.example.com".to_string()]);
        config
    })
    .await;

    let request_body = serde_json::json!({
        "url": "http://evil.example.net/img.png",
        "grayscale": true
    });
    let request = Request::builder()
        .method("POST")
        .uri("/images/transform-url")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, "Bearer token")
        .body(Body::from(request_body.to_string()))
        .unwrap();

    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_transformations_part_is_rejected() {
    let auth = spawn_auth_ok().await;
    let app = build_app(&auth, AuthFallbackMode::Restrictive).await;

    let png = png_fixture(8, 8);
    let body = multipart_body(&png, "a.png", None);
    let (status, _, _) = send(
        &app,
        multipart_request("/images/transform", body, Some("token")),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}
