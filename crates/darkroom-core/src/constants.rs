//! Shared constants

/// Maximum accepted upload size in bytes (10 MiB).
pub const MAX_IMAGE_SIZE_BYTES: usize = 10 * 1024 * 1024;

/// Content types accepted for intake.
pub const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif"];

/// File extensions accepted for intake.
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];

/// Blur radius bounds (inclusive).
pub const BLUR_RADIUS_MIN: u32 = 1;
pub const BLUR_RADIUS_MAX: u32 = 50;

/// Resize dimension bounds (inclusive).
pub const RESIZE_DIM_MIN: u32 = 1;
pub const RESIZE_DIM_MAX: u32 = 5000;

/// Default TTL for result cache entries, in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Default per-attempt timeout for the auth gateway, in seconds.
pub const DEFAULT_AUTH_TIMEOUT_SECS: u64 = 3;

/// Default retry budget for the auth gateway (attempts = 1 + retries).
pub const DEFAULT_AUTH_MAX_RETRIES: u32 = 3;
