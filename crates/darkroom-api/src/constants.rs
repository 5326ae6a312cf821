//! Shared constants for the API layer

/// Response header carrying the computed fingerprint.
pub const HEADER_FINGERPRINT: &str = "x-darkroom-fingerprint";

/// Response header indicating whether the result came from the cache.
pub const HEADER_CACHE: &str = "x-darkroom-cache";

/// Response header carrying the auth decision reason.
pub const HEADER_AUTH_REASON: &str = "x-darkroom-auth";

/// Request/response correlation header.
pub const HEADER_REQUEST_ID: &str = "x-request-id";

/// Slack added on top of the max file size for multipart framing overhead.
pub const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;
