//! Application state shared across handlers.
//!
//! All shared stores are held behind trait objects so the Postgres ledger,
//! the in-memory ledger, and any future cache backend are interchangeable
//! without touching the handlers.

use darkroom_auth::AuthClient;
use darkroom_cache::ResultCache;
use darkroom_core::Config;
use darkroom_ledger::VersionLedger;
use darkroom_processing::MediaValidator;
use darkroom_storage::Storage;
use std::sync::Arc;

pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    pub cache: Arc<dyn ResultCache>,
    pub ledger: Arc<dyn VersionLedger>,
    pub auth: AuthClient,
    /// Client for server-side URL fetches (transform-url).
    pub http: reqwest::Client,
    pub validator: MediaValidator,
}

impl AppState {
    pub fn new(
        config: Config,
        storage: Arc<dyn Storage>,
        cache: Arc<dyn ResultCache>,
        ledger: Arc<dyn VersionLedger>,
        auth: AuthClient,
        http: reqwest::Client,
    ) -> Self {
        let validator = MediaValidator::new(
            config.max_file_size_bytes,
            config.allowed_extensions.clone(),
            config.allowed_content_types.clone(),
        );
        AppState {
            config,
            storage,
            cache,
            ledger,
            auth,
            http,
            validator,
        }
    }
}
