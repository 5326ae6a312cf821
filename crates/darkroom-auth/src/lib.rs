//! Client for the external authorization service.
//!
//! Every transform request is authorized through this client before any
//! processing happens. The service being down must never hang the request
//! path: each attempt runs under a fixed timeout, retries are bounded with no
//! backoff growth, and exhaustion resolves through the operator-configured
//! fallback policy instead of an error. A definitive denial from the service
//! is authoritative and is never retried or overridden by fallback.

pub mod client;
pub mod models;

pub use client::{AuthClient, AuthClientConfig, AuthGatewayError};
pub use models::{AuthDecision, AuthReason, AuthUser, TokenResponse};
