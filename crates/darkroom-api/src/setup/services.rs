//! Service construction from configuration.

use crate::state::AppState;
use darkroom_auth::{AuthClient, AuthClientConfig};
use darkroom_cache::{InMemoryResultCache, ResultCache};
use darkroom_core::Config;
use darkroom_ledger::{InMemoryVersionLedger, PgVersionLedger, VersionLedger};
use darkroom_storage::{LocalStorage, Storage};
use std::sync::Arc;
use std::time::Duration;

/// Wire up storage, cache, ledger, and the auth client.
pub async fn build_state(config: Config) -> Result<Arc<AppState>, anyhow::Error> {
    let storage: Arc<dyn Storage> = Arc::new(
        LocalStorage::new(&config.storage_path, config.storage_base_url.clone()).await?,
    );
    tracing::info!(path = %config.storage_path, "Blob storage ready");

    let cache = InMemoryResultCache::new();
    // Expired entries are also dropped lazily on read; the sweeper catches
    // the ones nobody asks for again.
    cache.spawn_sweeper(Duration::from_secs(config.cache_sweep_interval_seconds));
    let cache: Arc<dyn ResultCache> = Arc::new(cache);

    let ledger: Arc<dyn VersionLedger> = match &config.database_url {
        Some(url) => {
            let ledger = PgVersionLedger::connect(
                url,
                config.db_max_connections,
                config.db_timeout_seconds,
            )
            .await?;
            Arc::new(ledger)
        }
        None => {
            tracing::warn!(
                "DATABASE_URL not set; using in-memory version ledger (history is not durable)"
            );
            Arc::new(InMemoryVersionLedger::new())
        }
    };

    let auth = AuthClient::new(AuthClientConfig::from_config(&config))?;
    tracing::info!(
        auth_service = %config.auth_service_url,
        timeout_seconds = config.auth_timeout_seconds,
        max_retries = config.auth_max_retries,
        fallback = config.auth_fallback_mode.as_str(),
        "Auth gateway client ready"
    );

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.url_fetch_timeout_seconds))
        .build()?;

    Ok(Arc::new(AppState::new(
        config, storage, cache, ledger, auth, http,
    )))
}
