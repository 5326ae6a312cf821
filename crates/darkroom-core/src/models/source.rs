use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// How a source image entered the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ImageSource {
    Upload,
    Url { url: String },
}

impl ImageSource {
    pub fn kind(&self) -> &'static str {
        match self {
            ImageSource::Upload => "upload",
            ImageSource::Url { .. } => "url",
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            ImageSource::Upload => None,
            ImageSource::Url { url } => Some(url),
        }
    }
}

/// A logical source image, identified by the content hash of its original
/// bytes. Created once on first successful intake and immutable thereafter;
/// re-uploading identical bytes resolves to the same record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SourceImage {
    pub id: Uuid,
    /// sha256 of the original bytes, lowercase hex. Primary identity.
    pub content_hash: String,
    /// 64-bit difference hash of the decoded pixels, hex. Used to spot
    /// near-duplicate uploads in tooling; not part of the cache key.
    pub perceptual_hash: String,
    pub content_type: String,
    pub file_size: i64,
    pub width: i32,
    pub height: i32,
    pub source: ImageSource,
    /// Locator of the original blob in storage.
    pub storage_key: String,
    pub created_at: DateTime<Utc>,
}

/// Fields required to record a new source image at intake.
#[derive(Debug, Clone)]
pub struct NewSourceImage {
    pub content_hash: String,
    pub perceptual_hash: String,
    pub content_type: String,
    pub file_size: i64,
    pub width: i32,
    pub height: i32,
    pub source: ImageSource,
    pub storage_key: String,
}

/// API response for a successful intake.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SourceImageResponse {
    pub metadata_id: Uuid,
    pub content_hash: String,
    pub perceptual_hash: String,
    pub content_type: String,
    pub file_size: i64,
    pub width: i32,
    pub height: i32,
    pub created_at: DateTime<Utc>,
}

impl From<SourceImage> for SourceImageResponse {
    fn from(image: SourceImage) -> Self {
        SourceImageResponse {
            metadata_id: image.id,
            content_hash: image.content_hash,
            perceptual_hash: image.perceptual_hash,
            content_type: image.content_type,
            file_size: image.file_size,
            width: image.width,
            height: image.height,
            created_at: image.created_at,
        }
    }
}
