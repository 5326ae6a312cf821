//! Configuration module
//!
//! All runtime configuration is read from the environment (a `.env` file is
//! honored via dotenvy). Every knob has a default suitable for local
//! development except `AUTH_SERVICE_URL`, which must be set explicitly.

use std::env;

use crate::constants::{
    ALLOWED_CONTENT_TYPES, ALLOWED_EXTENSIONS, DEFAULT_AUTH_MAX_RETRIES,
    DEFAULT_AUTH_TIMEOUT_SECS, DEFAULT_CACHE_TTL_SECS, MAX_IMAGE_SIZE_BYTES,
};

/// Behavior when the authorization service is unreachable after all retries.
///
/// This is the one place where failure handling is operator policy rather
/// than fixed: `permissive` lets requests through, `restrictive` rejects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFallbackMode {
    Permissive,
    Restrictive,
}

impl AuthFallbackMode {
    pub fn parse(value: &str) -> Result<Self, anyhow::Error> {
        match value.trim().to_lowercase().as_str() {
            "permissive" => Ok(AuthFallbackMode::Permissive),
            "restrictive" => Ok(AuthFallbackMode::Restrictive),
            other => Err(anyhow::anyhow!(
                "Invalid AUTH_FALLBACK_MODE '{}': expected 'permissive' or 'restrictive'",
                other
            )),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AuthFallbackMode::Permissive => "permissive",
            AuthFallbackMode::Restrictive => "restrictive",
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,

    // Version ledger (Postgres). When unset the service runs with the
    // in-memory ledger, which is only suitable for tests and demos.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,

    // Blob storage
    pub storage_path: String,
    pub storage_base_url: String,

    // Intake limits
    pub max_file_size_bytes: usize,
    pub allowed_extensions: Vec<String>,
    pub allowed_content_types: Vec<String>,

    // Result cache
    pub cache_ttl_seconds: u64,
    pub cache_sweep_interval_seconds: u64,

    // Auth gateway
    pub auth_service_url: String,
    pub auth_timeout_seconds: u64,
    pub auth_max_retries: u32,
    pub auth_fallback_mode: AuthFallbackMode,

    // Server-side URL fetch for transform-url
    pub url_fetch_timeout_seconds: u64,
    /// If set, only these hosts are allowed for URL-sourced transforms.
    pub url_fetch_allowlist: Option<Vec<String>>,

    pub http_concurrency_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        // Load .env if present; ignore if missing
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let cors_origins = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let allowed_extensions = env::var("ALLOWED_EXTENSIONS")
            .map(|s| s.split(',').map(|e| e.trim().to_lowercase()).collect())
            .unwrap_or_else(|_| ALLOWED_EXTENSIONS.iter().map(|e| e.to_string()).collect());

        let allowed_content_types = env::var("ALLOWED_CONTENT_TYPES")
            .map(|s| s.split(',').map(|e| e.trim().to_lowercase()).collect())
            .unwrap_or_else(|_| {
                ALLOWED_CONTENT_TYPES
                    .iter()
                    .map(|e| e.to_string())
                    .collect()
            });

        let url_fetch_allowlist = env::var("URL_FETCH_ALLOWLIST").ok().map(|s| {
            s.split(',')
                .map(|d| d.trim().to_lowercase())
                .filter(|d| !d.is_empty())
                .collect()
        });

        let auth_fallback_mode = AuthFallbackMode::parse(
            &env::var("AUTH_FALLBACK_MODE").unwrap_or_else(|_| "restrictive".to_string()),
        )?;

        let config = Config {
            server_port: env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8080),
            environment,
            cors_origins,
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(20),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            storage_path: env::var("STORAGE_PATH").unwrap_or_else(|_| "./data/blobs".to_string()),
            storage_base_url: env::var("STORAGE_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080/blobs".to_string()),
            max_file_size_bytes: env::var("MAX_FILE_SIZE_MB")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .map(|mb| mb * 1024 * 1024)
                .unwrap_or(MAX_IMAGE_SIZE_BYTES),
            allowed_extensions,
            allowed_content_types,
            cache_ttl_seconds: env::var("CACHE_TTL_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_CACHE_TTL_SECS),
            cache_sweep_interval_seconds: env::var("CACHE_SWEEP_INTERVAL_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            auth_service_url: env::var("AUTH_SERVICE_URL")
                .unwrap_or_else(|_| "http://auth-service:5002".to_string()),
            auth_timeout_seconds: env::var("AUTH_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_AUTH_TIMEOUT_SECS),
            auth_max_retries: env::var("AUTH_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_AUTH_MAX_RETRIES),
            auth_fallback_mode,
            url_fetch_timeout_seconds: env::var("URL_FETCH_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            url_fetch_allowlist,
            http_concurrency_limit: env::var("HTTP_CONCURRENCY_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_file_size_bytes == 0 {
            anyhow::bail!("MAX_FILE_SIZE_MB must be greater than zero");
        }
        if self.allowed_content_types.is_empty() {
            anyhow::bail!("ALLOWED_CONTENT_TYPES must not be empty");
        }
        if self.auth_service_url.is_empty() {
            anyhow::bail!("AUTH_SERVICE_URL must not be empty");
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    /// Maximum wall-clock wait for an auth resolution:
    /// timeout x (1 + retries). The auth client never blocks longer.
    pub fn auth_max_wait_seconds(&self) -> u64 {
        self.auth_timeout_seconds * (1 + self.auth_max_retries as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_mode_parse() {
        assert_eq!(
            AuthFallbackMode::parse("permissive").unwrap(),
            AuthFallbackMode::Permissive
        );
        assert_eq!(
            AuthFallbackMode::parse("RESTRICTIVE").unwrap(),
            AuthFallbackMode::Restrictive
        );
        assert!(AuthFallbackMode::parse("open").is_err());
    }

    fn base_config() -> Config {
        Config {
            server_port: 8080,
            environment: "test".to_string(),
            cors_origins: vec!["*".to_string()],
            database_url: None,
            db_max_connections: 5,
            db_timeout_seconds: 5,
            storage_path: "/tmp/darkroom".to_string(),
            storage_base_url: "http://localhost:8080/blobs".to_string(),
            max_file_size_bytes: 10 * 1024 * 1024,
            allowed_extensions: vec!["jpg".to_string()],
            allowed_content_types: vec!["image/jpeg".to_string()],
            cache_ttl_seconds: 60,
            cache_sweep_interval_seconds: 10,
            auth_service_url: "http://localhost:5002".to_string(),
            auth_timeout_seconds: 3,
            auth_max_retries: 3,
            auth_fallback_mode: AuthFallbackMode::Restrictive,
            url_fetch_timeout_seconds: 30,
            url_fetch_allowlist: None,
            http_concurrency_limit: 1024,
        }
    }

    #[test]
    fn test_auth_max_wait_bound() {
        let config = base_config();
        assert_eq!(config.auth_max_wait_seconds(), 3 * (1 + 3));
    }

    #[test]
    fn test_validate_rejects_empty_content_types() {
        let mut config = base_config();
        config.allowed_content_types.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_is_production() {
        let mut config = base_config();
        assert!(!config.is_production());
        config.environment = "Production".to_string();
        assert!(config.is_production());
    }
}
