use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;

/// One distinct processed variant of a source image.
///
/// Owned by the version ledger; created exactly once per fingerprint.
/// Metadata only - the output blob lives in storage under `storage_key`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProcessedVersion {
    /// Cache/ledger key: sha256 over (source content hash, canonical operation set).
    pub fingerprint: String,
    /// Content hash of the source this variant was derived from.
    pub source_hash: String,
    /// The operation set that produced this variant, in execution order.
    pub operations: JsonValue,
    /// Locator of the output blob in storage.
    pub storage_key: String,
    /// sha256 of the output bytes.
    pub output_hash: String,
    pub content_type: String,
    pub file_size: i64,
    pub created_at: DateTime<Utc>,
}

/// Fields required to record a new processed version.
#[derive(Debug, Clone)]
pub struct NewProcessedVersion {
    pub fingerprint: String,
    pub source_hash: String,
    pub operations: JsonValue,
    pub storage_key: String,
    pub output_hash: String,
    pub content_type: String,
    pub file_size: i64,
}

/// API response shape for version listings.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProcessedVersionResponse {
    pub fingerprint: String,
    pub operations: JsonValue,
    pub content_type: String,
    pub file_size: i64,
    pub output_hash: String,
    pub created_at: DateTime<Utc>,
}

impl From<ProcessedVersion> for ProcessedVersionResponse {
    fn from(version: ProcessedVersion) -> Self {
        ProcessedVersionResponse {
            fingerprint: version.fingerprint,
            operations: version.operations,
            content_type: version.content_type,
            file_size: version.file_size,
            output_hash: version.output_hash,
            created_at: version.created_at,
        }
    }
}
