//! Postgres-backed version ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use darkroom_core::models::{
    ImageSource, NewProcessedVersion, NewSourceImage, ProcessedVersion, SourceImage,
};
use darkroom_core::AppError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

use crate::VersionLedger;

fn ledger_error(err: sqlx::Error) -> AppError {
    AppError::Ledger(err.to_string())
}

#[derive(Debug, sqlx::FromRow)]
struct SourceImageRow {
    content_hash: String,
    id: Uuid,
    perceptual_hash: String,
    content_type: String,
    file_size: i64,
    width: i32,
    height: i32,
    source_type: String,
    source_url: Option<String>,
    storage_key: String,
    created_at: DateTime<Utc>,
}

impl From<SourceImageRow> for SourceImage {
    fn from(row: SourceImageRow) -> Self {
        let source = match (row.source_type.as_str(), row.source_url) {
            ("url", Some(url)) => ImageSource::Url { url },
            _ => ImageSource::Upload,
        };
        SourceImage {
            id: row.id,
            content_hash: row.content_hash,
            perceptual_hash: row.perceptual_hash,
            content_type: row.content_type,
            file_size: row.file_size,
            width: row.width,
            height: row.height,
            source,
            storage_key: row.storage_key,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProcessedVersionRow {
    fingerprint: String,
    source_hash: String,
    operations: serde_json::Value,
    storage_key: String,
    output_hash: String,
    content_type: String,
    file_size: i64,
    created_at: DateTime<Utc>,
}

impl From<ProcessedVersionRow> for ProcessedVersion {
    fn from(row: ProcessedVersionRow) -> Self {
        ProcessedVersion {
            fingerprint: row.fingerprint,
            source_hash: row.source_hash,
            operations: row.operations,
            storage_key: row.storage_key,
            output_hash: row.output_hash,
            content_type: row.content_type,
            file_size: row.file_size,
            created_at: row.created_at,
        }
    }
}

/// Version ledger backed by Postgres.
#[derive(Clone)]
pub struct PgVersionLedger {
    pool: PgPool,
}

impl PgVersionLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and run pending migrations.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        timeout_seconds: u64,
    ) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(timeout_seconds))
            .connect(database_url)
            .await
            .map_err(ledger_error)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::Ledger(format!("migration failed: {}", e)))?;

        tracing::info!(max_connections, "Version ledger connected");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl VersionLedger for PgVersionLedger {
    async fn record_source(&self, source: NewSourceImage) -> Result<SourceImage, AppError> {
        // Idempotent insert: a concurrent intake of the same bytes loses the
        // race harmlessly and reads back the winner's row.
        sqlx::query(
            r#"
            INSERT INTO source_images
                (content_hash, id, perceptual_hash, content_type, file_size,
                 width, height, source_type, source_url, storage_key, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (content_hash) DO NOTHING
            "#,
        )
        .bind(&source.content_hash)
        .bind(Uuid::new_v4())
        .bind(&source.perceptual_hash)
        .bind(&source.content_type)
        .bind(source.file_size)
        .bind(source.width)
        .bind(source.height)
        .bind(source.source.kind())
        .bind(source.source.url())
        .bind(&source.storage_key)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(ledger_error)?;

        let row: SourceImageRow = sqlx::query_as(
            "SELECT * FROM source_images WHERE content_hash = $1",
        )
        .bind(&source.content_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(ledger_error)?;

        Ok(row.into())
    }

    async fn get_source(&self, content_hash: &str) -> Result<Option<SourceImage>, AppError> {
        let row: Option<SourceImageRow> = sqlx::query_as(
            "SELECT * FROM source_images WHERE content_hash = $1",
        )
        .bind(content_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(ledger_error)?;

        Ok(row.map(Into::into))
    }

    async fn record_version(
        &self,
        version: NewProcessedVersion,
    ) -> Result<ProcessedVersion, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO processed_versions
                (fingerprint, source_hash, operations, storage_key,
                 output_hash, content_type, file_size, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (fingerprint) DO NOTHING
            "#,
        )
        .bind(&version.fingerprint)
        .bind(&version.source_hash)
        .bind(&version.operations)
        .bind(&version.storage_key)
        .bind(&version.output_hash)
        .bind(&version.content_type)
        .bind(version.file_size)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(ledger_error)?;

        if result.rows_affected() == 0 {
            tracing::debug!(
                fingerprint = %version.fingerprint,
                "Version already recorded, returning existing entry"
            );
        }

        let row: ProcessedVersionRow = sqlx::query_as(
            "SELECT * FROM processed_versions WHERE fingerprint = $1",
        )
        .bind(&version.fingerprint)
        .fetch_one(&self.pool)
        .await
        .map_err(ledger_error)?;

        Ok(row.into())
    }

    async fn get_version(&self, fingerprint: &str) -> Result<Option<ProcessedVersion>, AppError> {
        let row: Option<ProcessedVersionRow> = sqlx::query_as(
            "SELECT * FROM processed_versions WHERE fingerprint = $1",
        )
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await
        .map_err(ledger_error)?;

        Ok(row.map(Into::into))
    }

    async fn list_versions(
        &self,
        source_hash: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ProcessedVersion>, AppError> {
        let rows: Vec<ProcessedVersionRow> = sqlx::query_as(
            r#"
            SELECT * FROM processed_versions
            WHERE source_hash = $1
            ORDER BY created_at ASC, fingerprint ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(source_hash)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(ledger_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count_versions(&self, source_hash: &str) -> Result<i64, AppError> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM processed_versions WHERE source_hash = $1")
                .bind(source_hash)
                .fetch_one(&self.pool)
                .await
                .map_err(ledger_error)?;

        Ok(count.0)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(ledger_error)?;
        Ok(())
    }
}
