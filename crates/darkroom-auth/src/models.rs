use serde::{Deserialize, Serialize};

/// User identity as reported by the authorization service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// How an authorization decision was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthReason {
    /// The service affirmed the token.
    Validated,
    /// The service rejected the token. Authoritative; never subject to fallback.
    Denied,
    /// Service unreachable, permissive fallback let the request through.
    FallbackPermissive,
    /// Service unreachable, restrictive fallback rejected the request.
    FallbackRestrictive,
}

impl AuthReason {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthReason::Validated => "validated",
            AuthReason::Denied => "denied",
            AuthReason::FallbackPermissive => "fallback-permissive",
            AuthReason::FallbackRestrictive => "fallback-restrictive",
        }
    }
}

/// Per-request authorization outcome. Computed fresh for every request and
/// never cached: token state may change between requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthDecision {
    pub allowed: bool,
    pub reason: AuthReason,
    pub user: Option<AuthUser>,
}

impl AuthDecision {
    pub fn validated(user: Option<AuthUser>) -> Self {
        AuthDecision {
            allowed: true,
            reason: AuthReason::Validated,
            user,
        }
    }

    pub fn denied() -> Self {
        AuthDecision {
            allowed: false,
            reason: AuthReason::Denied,
            user: None,
        }
    }

    pub fn fallback_permissive() -> Self {
        AuthDecision {
            allowed: true,
            reason: AuthReason::FallbackPermissive,
            user: None,
        }
    }

    pub fn fallback_restrictive() -> Self {
        AuthDecision {
            allowed: false,
            reason: AuthReason::FallbackRestrictive,
            user: None,
        }
    }
}

/// Token pair returned by login/refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}
