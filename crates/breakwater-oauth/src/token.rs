//! The bearer token record returned by the token service.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A short-lived bearer token exchanged for a long-lived API key.
///
/// Immutable once parsed; ownership passes to the caller. The provider does
/// no caching or refresh — a caller wanting a fresh token asks again.
#[derive(Clone, Deserialize)]
pub struct Token {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    token_type: String,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    expiration: Option<i64>,
}

impl Token {
    /// The bearer token value used to authenticate requests.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Refresh token, if the service issued one.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// Token type, typically `Bearer`.
    #[must_use]
    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// Lifetime in seconds from issuance, if reported.
    #[must_use]
    pub const fn expires_in(&self) -> Option<u64> {
        self.expires_in
    }

    /// Absolute expiry as a Unix timestamp, if reported.
    #[must_use]
    pub const fn expiration(&self) -> Option<i64> {
        self.expiration
    }

    /// Absolute expiry as a UTC timestamp, if reported.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expiration.and_then(|ts| DateTime::from_timestamp(ts, 0))
    }
}

// Manual impl so token material never lands in logs.
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("expiration", &self.expiration)
            .finish()
    }
}
