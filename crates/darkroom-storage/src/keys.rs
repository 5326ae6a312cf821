//! Deterministic storage key layout.
//!
//! Locators are derived from content hashes, never from request-scoped
//! state, so re-computing the same output always lands on the same key.

/// Key for an original blob: `originals/{content_hash}.{ext}`.
pub fn original_key(content_hash: &str, extension: &str) -> String {
    format!("originals/{}.{}", content_hash, extension)
}

/// Key for a processed blob: `processed/{fingerprint}.{ext}`.
pub fn processed_key(fingerprint: &str, extension: &str) -> String {
    format!("processed/{}.{}", fingerprint, extension)
}

/// File extension for a content type produced by the pipeline.
pub fn extension_for_content_type(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        _ => "bin",
    }
}
