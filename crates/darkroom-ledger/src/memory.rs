//! In-memory version ledger.
//!
//! Mirrors the Postgres implementation's idempotency contracts without a
//! database. Used by the API integration tests and by storage-less demo
//! deployments; history does not survive a restart.

use async_trait::async_trait;
use chrono::Utc;
use darkroom_core::models::{
    NewProcessedVersion, NewSourceImage, ProcessedVersion, SourceImage,
};
use darkroom_core::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::VersionLedger;

#[derive(Default)]
struct LedgerState {
    sources: HashMap<String, SourceImage>,
    /// Insertion-ordered; fingerprint uniqueness enforced on write.
    versions: Vec<ProcessedVersion>,
}

#[derive(Clone, Default)]
pub struct InMemoryVersionLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryVersionLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VersionLedger for InMemoryVersionLedger {
    async fn record_source(&self, source: NewSourceImage) -> Result<SourceImage, AppError> {
        let mut state = self.state.write().await;
        if let Some(existing) = state.sources.get(&source.content_hash) {
            return Ok(existing.clone());
        }

        let image = SourceImage {
            id: Uuid::new_v4(),
            content_hash: source.content_hash.clone(),
            perceptual_hash: source.perceptual_hash,
            content_type: source.content_type,
            file_size: source.file_size,
            width: source.width,
            height: source.height,
            source: source.source,
            storage_key: source.storage_key,
            created_at: Utc::now(),
        };
        state.sources.insert(source.content_hash, image.clone());
        Ok(image)
    }

    async fn get_source(&self, content_hash: &str) -> Result<Option<SourceImage>, AppError> {
        let state = self.state.read().await;
        Ok(state.sources.get(content_hash).cloned())
    }

    async fn record_version(
        &self,
        version: NewProcessedVersion,
    ) -> Result<ProcessedVersion, AppError> {
        let mut state = self.state.write().await;
        if let Some(existing) = state
            .versions
            .iter()
            .find(|v| v.fingerprint == version.fingerprint)
        {
            return Ok(existing.clone());
        }

        let recorded = ProcessedVersion {
            fingerprint: version.fingerprint,
            source_hash: version.source_hash,
            operations: version.operations,
            storage_key: version.storage_key,
            output_hash: version.output_hash,
            content_type: version.content_type,
            file_size: version.file_size,
            created_at: Utc::now(),
        };
        state.versions.push(recorded.clone());
        Ok(recorded)
    }

    async fn get_version(&self, fingerprint: &str) -> Result<Option<ProcessedVersion>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .versions
            .iter()
            .find(|v| v.fingerprint == fingerprint)
            .cloned())
    }

    async fn list_versions(
        &self,
        source_hash: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ProcessedVersion>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .versions
            .iter()
            .filter(|v| v.source_hash == source_hash)
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn count_versions(&self, source_hash: &str) -> Result<i64, AppError> {
        let state = self.state.read().await;
        Ok(state
            .versions
            .iter()
            .filter(|v| v.source_hash == source_hash)
            .count() as i64)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}
