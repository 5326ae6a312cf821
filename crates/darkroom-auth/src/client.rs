use darkroom_core::{AppError, AuthFallbackMode, Config};
use serde_json::json;
use std::time::Duration;

use crate::models::{AuthDecision, AuthUser, TokenResponse};

/// Errors from the pass-through auth endpoints (login/refresh/logout).
/// Token validation itself never errors - it always resolves to a decision.
#[derive(Debug, thiserror::Error)]
pub enum AuthGatewayError {
    #[error("Authorization service rejected the request: {0}")]
    Rejected(String),

    #[error("Authorization service unreachable: {0}")]
    Unreachable(String),

    #[error("Unexpected response from authorization service: {0}")]
    InvalidResponse(String),
}

impl From<AuthGatewayError> for AppError {
    fn from(err: AuthGatewayError) -> Self {
        match err {
            AuthGatewayError::Rejected(msg) => AppError::Unauthorized(msg),
            AuthGatewayError::Unreachable(msg) => AppError::AuthUnavailable(msg),
            AuthGatewayError::InvalidResponse(msg) => AppError::Internal(msg),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthClientConfig {
    pub base_url: String,
    /// Fixed per-attempt timeout. Every retry uses the same value; there is
    /// no backoff growth, so total wait is bounded by
    /// `timeout * (1 + max_retries)`.
    pub timeout: Duration,
    pub max_retries: u32,
    pub fallback_mode: AuthFallbackMode,
}

impl AuthClientConfig {
    pub fn from_config(config: &Config) -> Self {
        AuthClientConfig {
            base_url: config.auth_service_url.clone(),
            timeout: Duration::from_secs(config.auth_timeout_seconds),
            max_retries: config.auth_max_retries,
            fallback_mode: config.auth_fallback_mode,
        }
    }
}

/// HTTP client for the external authorization service.
#[derive(Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    config: AuthClientConfig,
}

impl AuthClient {
    pub fn new(config: AuthClientConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build auth HTTP client: {}", e)))?;
        Ok(AuthClient { http, config })
    }

    pub fn fallback_mode(&self) -> AuthFallbackMode {
        self.config.fallback_mode
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Validate a bearer token with `GET /auth/me`.
    ///
    /// State machine per request: Attempt -> Retry (bounded, fixed timeout)
    /// -> Resolve. A 2xx resolves to Validated, a 401/403 resolves to Denied
    /// immediately, and anything else (timeout, connect error, 5xx) is
    /// transient. Exhausting the retry budget resolves through the fallback
    /// policy - this method never returns an error and never blocks longer
    /// than `timeout * (1 + max_retries)`.
    pub async fn validate_token(&self, token: &str) -> AuthDecision {
        let url = self.url("/auth/me");
        let attempts = 1 + self.config.max_retries;

        for attempt in 1..=attempts {
            match self
                .http
                .get(&url)
                .bearer_auth(token)
                .timeout(self.config.timeout)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    let user = match response.json::<AuthUser>().await {
                        Ok(user) => Some(user),
                        Err(e) => {
                            tracing::warn!(error = %e, "Auth service returned unparseable user payload");
                            None
                        }
                    };
                    tracing::debug!(attempt, "Token validated");
                    return AuthDecision::validated(user);
                }
                Ok(response)
                    if response.status() == reqwest::StatusCode::UNAUTHORIZED
                        || response.status() == reqwest::StatusCode::FORBIDDEN =>
                {
                    // Authoritative rejection: not retried, not subject to fallback.
                    tracing::debug!(attempt, status = %response.status(), "Token denied");
                    return AuthDecision::denied();
                }
                Ok(response) => {
                    tracing::warn!(
                        attempt,
                        status = %response.status(),
                        "Transient auth service response"
                    );
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Auth service unreachable");
                }
            }
        }

        tracing::warn!(
            attempts,
            fallback = self.config.fallback_mode.as_str(),
            "Auth retries exhausted, resolving via fallback policy"
        );
        match self.config.fallback_mode {
            AuthFallbackMode::Permissive => AuthDecision::fallback_permissive(),
            AuthFallbackMode::Restrictive => AuthDecision::fallback_restrictive(),
        }
    }

    /// `POST /auth/login` pass-through.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, AuthGatewayError> {
        let response = self
            .http
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| AuthGatewayError::Unreachable(e.to_string()))?;

        Self::token_response(response).await
    }

    /// `POST /auth/refresh` pass-through.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AuthGatewayError> {
        let response = self
            .http
            .post(self.url("/auth/refresh"))
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(|e| AuthGatewayError::Unreachable(e.to_string()))?;

        Self::token_response(response).await
    }

    /// `POST /auth/logout` pass-through.
    pub async fn logout(&self, token: &str, refresh_token: &str) -> Result<(), AuthGatewayError> {
        let response = self
            .http
            .post(self.url("/auth/logout"))
            .bearer_auth(token)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(|e| AuthGatewayError::Unreachable(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AuthGatewayError::Rejected(format!(
                "logout failed with status {}",
                response.status()
            )))
        }
    }

    async fn token_response(response: reqwest::Response) -> Result<TokenResponse, AuthGatewayError> {
        let status = response.status();
        if status.is_success() {
            response
                .json::<TokenResponse>()
                .await
                .map_err(|e| AuthGatewayError::InvalidResponse(e.to_string()))
        } else if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            Err(AuthGatewayError::Rejected(format!("{}: {}", status, body)))
        } else {
            Err(AuthGatewayError::Unreachable(format!(
                "auth service returned {}",
                status
            )))
        }
    }
}
