//! Bearer token extraction.
//!
//! The token is carried as an explicit per-request value into the
//! orchestrator, which resolves it against the auth gateway. Nothing about
//! the session lives in process-wide state, and decisions are never cached
//! across requests.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::convert::Infallible;

/// The bearer token from the `Authorization` header, if present and
/// well-formed. Presence is not enforced here - the orchestrator decides,
/// so every endpoint reports missing credentials with the same error shape.
#[derive(Debug, Clone)]
pub struct BearerToken(Option<String>);

impl BearerToken {
    pub fn token(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());

        Ok(BearerToken(token))
    }
}
