//! Version ledger for the darkroom service.
//!
//! The ledger is the durable record of every distinct processed variant of a
//! source image. It is authoritative where the result cache is transient:
//! cache expiry never loses history, and a crash between the two writes
//! leaves the ledger correct with the cache simply unpopulated.
//!
//! Both writes are idempotent - sources on `content_hash`, versions on
//! `fingerprint` - so concurrent duplicate requests cannot create duplicate
//! rows.

pub mod memory;
pub mod pg;

pub use memory::InMemoryVersionLedger;
pub use pg::PgVersionLedger;

use async_trait::async_trait;
use darkroom_core::models::{NewProcessedVersion, NewSourceImage, ProcessedVersion, SourceImage};
use darkroom_core::AppError;

/// Persistence boundary for source images and their processed versions.
///
/// The trait keeps the orchestrator independent of the backing store and
/// allows the in-memory implementation to stand in for Postgres in tests.
#[async_trait]
pub trait VersionLedger: Send + Sync {
    /// Record a source image at intake. Idempotent on `content_hash`: if the
    /// source already exists the stored record is returned unchanged.
    async fn record_source(&self, source: NewSourceImage) -> Result<SourceImage, AppError>;

    /// Fetch a source image by content hash.
    async fn get_source(&self, content_hash: &str) -> Result<Option<SourceImage>, AppError>;

    /// Record a processed version. Idempotent on `fingerprint`: if a version
    /// already exists for that fingerprint, the existing record is returned
    /// unchanged and no duplicate is created.
    async fn record_version(
        &self,
        version: NewProcessedVersion,
    ) -> Result<ProcessedVersion, AppError>;

    /// Fetch a processed version by fingerprint.
    async fn get_version(&self, fingerprint: &str) -> Result<Option<ProcessedVersion>, AppError>;

    /// List processed versions of a source, ordered by creation time
    /// ascending. Restartable via `offset`.
    async fn list_versions(
        &self,
        source_hash: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ProcessedVersion>, AppError>;

    /// Total number of processed versions for a source.
    async fn count_versions(&self, source_hash: &str) -> Result<i64, AppError>;

    /// Reachability probe for health reporting.
    async fn health_check(&self) -> Result<(), AppError>;
}
