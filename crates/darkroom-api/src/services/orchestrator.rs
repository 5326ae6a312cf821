//! Request orchestrator.
//!
//! Ties the components together for one request: boundary validation, auth
//! resolution, fingerprinting, cache lookup, transform execution, and the
//! write-through to storage, cache, and ledger.
//!
//! Write-ordering contract: the ledger is the durable record and storage
//! holds the blobs; the cache is a pure accelerator. Cache errors degrade to
//! a recompute, ledger errors degrade to returning the freshly computed image
//! without durable history, and a crash between writes self-heals on the
//! next request because every write is an idempotent upsert keyed by content.

use bytes::Bytes;
use darkroom_auth::{AuthDecision, AuthReason};
use darkroom_cache::{CacheEntry, ResultCache};
use darkroom_core::models::{ImageSource, NewProcessedVersion, NewSourceImage, SourceImage};
use darkroom_core::operations::OperationSet;
use darkroom_core::{content_hash, AppError, Fingerprint};
use darkroom_ledger::VersionLedger;
use darkroom_processing::{ImageProbe, TransformPipeline};
use darkroom_storage::{extension_for_content_type, original_key, processed_key, Storage};
use std::sync::Arc;
use std::time::Duration;

use crate::error::validation_to_app_error;
use crate::state::AppState;

/// Whether a transform result came from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
        }
    }
}

/// Result of one orchestrated transform request.
#[derive(Debug)]
pub struct TransformOutcome {
    pub bytes: Bytes,
    pub content_type: String,
    pub fingerprint: Fingerprint,
    pub cache_status: CacheStatus,
    pub source_hash: String,
}

/// Per-request orchestration facade over the shared state.
pub struct TransformService<'a> {
    state: &'a AppState,
}

impl<'a> TransformService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        TransformService { state }
    }

    /// Resolve the caller's bearer token into an auth decision, failing the
    /// request when the decision disallows it. The decision reason is kept so
    /// handlers can surface it (validated vs fallback-permissive).
    pub async fn authorize(&self, token: Option<&str>) -> Result<AuthDecision, AppError> {
        let token = token.ok_or_else(|| {
            AppError::Unauthorized("Missing bearer token".to_string())
        })?;

        let decision = self.state.auth.validate_token(token).await;
        tracing::debug!(
            allowed = decision.allowed,
            reason = decision.reason.as_str(),
            "Auth decision"
        );

        if decision.allowed {
            return Ok(decision);
        }

        match decision.reason {
            AuthReason::FallbackRestrictive => Err(AppError::AuthUnavailable(
                "Authorization service unreachable and fallback policy is restrictive"
                    .to_string(),
            )),
            _ => Err(AppError::Unauthorized(
                "Token rejected by authorization service".to_string(),
            )),
        }
    }

    /// Validate raw bytes and stage the original blob: size and format
    /// checks, content + perceptual hashing, storage write under the
    /// content-addressed key. Returns the source record ready for the ledger.
    pub async fn prepare_source(
        &self,
        data: Bytes,
        filename: Option<&str>,
        source: ImageSource,
    ) -> Result<NewSourceImage, AppError> {
        let validator = &self.state.validator;

        validator
            .validate_file_size(data.len())
            .map_err(validation_to_app_error)?;
        if let Some(name) = filename {
            validator
                .validate_extension(name)
                .map_err(validation_to_app_error)?;
        }
        // Magic bytes are the authority on the content type, not the
        // caller's declaration.
        let content_type = validator
            .validate_sniffed_format(&data)
            .map_err(validation_to_app_error)?;

        // Hashing and the decode check are CPU work; keep them off the
        // async runtime.
        let probe_data = data.clone();
        let (hash, perceptual_hash, (width, height)) =
            tokio::task::spawn_blocking(move || -> Result<_, AppError> {
                let hash = content_hash(&probe_data);
                let ((width, height), perceptual_hash) =
                    ImageProbe::probe(&probe_data).map_err(validation_to_app_error)?;
                Ok((hash, perceptual_hash, (width, height)))
            })
            .await
            .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))??;

        let extension = extension_for_content_type(&content_type);
        let storage_key = original_key(&hash, extension);

        // Content-addressed key: re-uploading identical bytes is a no-op.
        let already_stored = self
            .state
            .storage
            .exists(&storage_key)
            .await
            .unwrap_or(false);
        if !already_stored {
            self.state
                .storage
                .upload(&storage_key, &content_type, data.to_vec())
                .await
                .map_err(|e| AppError::Storage(e.to_string()))?;
        }

        Ok(NewSourceImage {
            content_hash: hash,
            perceptual_hash,
            content_type,
            file_size: data.len() as i64,
            width: width as i32,
            height: height as i32,
            source,
            storage_key,
        })
    }

    /// Intake for the upload endpoint: stage the blob, then durably record
    /// the source. Idempotent on content hash.
    pub async fn intake(
        &self,
        data: Bytes,
        filename: Option<&str>,
        source: ImageSource,
    ) -> Result<SourceImage, AppError> {
        let new_source = self.prepare_source(data, filename, source).await?;
        self.state.ledger.record_source(new_source).await
    }

    /// Full transform path: stage the source, fingerprint, consult the
    /// cache, compute on a miss, write through.
    pub async fn process(
        &self,
        data: Bytes,
        filename: Option<&str>,
        source: ImageSource,
        ops: OperationSet,
    ) -> Result<TransformOutcome, AppError> {
        let new_source = self.prepare_source(data.clone(), filename, source).await?;
        let source_hash = new_source.content_hash.clone();

        // Best-effort durability: a down ledger must not block processing.
        if let Err(e) = self.state.ledger.record_source(new_source).await {
            tracing::warn!(error = %e, "Failed to record source image, continuing");
        }

        let fingerprint = Fingerprint::compute(&source_hash, &ops);

        if let Some(outcome) = self.cache_lookup(&fingerprint, &source_hash).await {
            return Ok(outcome);
        }

        // Cache miss: compute and persist in a detached task. A caller
        // disconnect drops this request future, but the spawned task still
        // completes and populates cache and ledger (safe: all writes are
        // idempotent). We just never write a response to the closed socket.
        let storage = Arc::clone(&self.state.storage);
        let cache = Arc::clone(&self.state.cache);
        let ledger = Arc::clone(&self.state.ledger);
        let ttl = Duration::from_secs(self.state.config.cache_ttl_seconds);
        let fp = fingerprint.clone();
        let hash = source_hash.clone();

        let task = tokio::spawn(async move {
            compute_and_persist(storage, cache, ledger, ttl, data, ops, hash, fp).await
        });

        task.await
            .map_err(|e| AppError::Internal(format!("Transform task failed: {}", e)))?
    }

    /// Cache lookup with self-healing: a hit whose blob has been evicted
    /// from storage degrades to a miss, and a cache backend error degrades
    /// to "always miss, always recompute".
    async fn cache_lookup(
        &self,
        fingerprint: &Fingerprint,
        source_hash: &str,
    ) -> Option<TransformOutcome> {
        match self.state.cache.get(fingerprint.as_str()).await {
            Ok(Some(entry)) => match self.state.storage.download(&entry.locator).await {
                Ok(bytes) => {
                    tracing::info!(fingerprint = %fingerprint, "Result cache hit");
                    Some(TransformOutcome {
                        bytes: Bytes::from(bytes),
                        content_type: entry.content_type,
                        fingerprint: fingerprint.clone(),
                        cache_status: CacheStatus::Hit,
                        source_hash: source_hash.to_string(),
                    })
                }
                Err(e) => {
                    tracing::warn!(
                        fingerprint = %fingerprint,
                        locator = %entry.locator,
                        error = %e,
                        "Cached locator is dangling, recomputing"
                    );
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Result cache unavailable, treating as miss");
                None
            }
        }
    }

    /// Versions listing for a source image.
    pub async fn list_versions(
        &self,
        source_hash: &str,
        limit: i64,
        offset: i64,
    ) -> Result<(SourceImage, Vec<darkroom_core::models::ProcessedVersion>, i64), AppError> {
        let source = self
            .state
            .ledger
            .get_source(source_hash)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Unknown source image: {}", source_hash)))?;

        let versions = self
            .state
            .ledger
            .list_versions(source_hash, limit, offset)
            .await?;
        let total = self.state.ledger.count_versions(source_hash).await?;

        Ok((source, versions, total))
    }
}

/// Runs detached from the request: transform, then write through to storage,
/// ledger, and cache. Only the transform itself is fatal; persistence is
/// best-effort so the caller still gets the computed image.
#[allow(clippy::too_many_arguments)]
async fn compute_and_persist(
    storage: Arc<dyn Storage>,
    cache: Arc<dyn ResultCache>,
    ledger: Arc<dyn VersionLedger>,
    ttl: Duration,
    data: Bytes,
    ops: OperationSet,
    source_hash: String,
    fingerprint: Fingerprint,
) -> Result<TransformOutcome, AppError> {
    let ops_json = ops.to_json();

    // The pipeline is pure CPU; run it on the blocking pool so the only
    // blocked party is this worker.
    let output = tokio::task::spawn_blocking(move || TransformPipeline::apply(&data, &ops))
        .await
        .map_err(|e| AppError::Internal(format!("Transform task failed: {}", e)))?
        .map_err(AppError::from)?;

    let output_hash = content_hash(&output.bytes);
    let extension = extension_for_content_type(&output.content_type);
    let storage_key = processed_key(fingerprint.as_str(), extension);

    tracing::info!(
        fingerprint = %fingerprint,
        operations = output.applied.len(),
        output_bytes = output.bytes.len(),
        width = output.width,
        height = output.height,
        "Transform complete"
    );

    let stored = match storage
        .upload(&storage_key, &output.content_type, output.bytes.to_vec())
        .await
    {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(error = %e, key = %storage_key, "Failed to store processed blob");
            false
        }
    };

    if stored {
        if let Err(e) = ledger
            .record_version(NewProcessedVersion {
                fingerprint: fingerprint.as_str().to_string(),
                source_hash: source_hash.clone(),
                operations: ops_json,
                storage_key: storage_key.clone(),
                output_hash,
                content_type: output.content_type.clone(),
                file_size: output.bytes.len() as i64,
            })
            .await
        {
            tracing::warn!(error = %e, fingerprint = %fingerprint, "Failed to record version");
        }

        if let Err(e) = cache
            .put(
                fingerprint.as_str(),
                CacheEntry {
                    locator: storage_key,
                    content_type: output.content_type.clone(),
                },
                ttl,
            )
            .await
        {
            tracing::warn!(error = %e, fingerprint = %fingerprint, "Failed to populate cache");
        }
    }

    Ok(TransformOutcome {
        bytes: output.bytes,
        content_type: output.content_type,
        fingerprint,
        cache_status: CacheStatus::Miss,
        source_hash,
    })
}
