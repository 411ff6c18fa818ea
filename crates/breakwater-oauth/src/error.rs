//! Error types for token acquisition.

use thiserror::Error;

/// Errors raised while exchanging an API key for a bearer token.
///
/// Every failure mode is a distinct variant; nothing is caught, logged and
/// collapsed into an empty result. Callers deciding whether to re-prompt for
/// credentials, back off, or alert need to tell rejection, unreachability
/// and malformed responses apart.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OAuthError {
    /// Invalid construction input, such as an empty API key or a malformed
    /// endpoint. Fatal, never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The token service answered with a non-200 status: it rejected the
    /// exchange.
    #[error("token service returned {status_code}: {status_message}")]
    Service {
        /// HTTP status code of the rejection.
        status_code: u16,
        /// The canonical reason phrase for the status code, such as
        /// `Forbidden` for 403. The underlying transport does not surface
        /// the reason phrase as it appeared on the wire, so a non-standard
        /// phrase from the service yields an empty string here.
        status_message: String,
    },

    /// The token service could not be reached, or the connection failed at
    /// the socket or TLS layer.
    #[error("token exchange transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service returned 200 but the body was not a well-formed token
    /// record.
    #[error("malformed token response: {0}")]
    Parse(#[from] serde_json::Error),
}

impl OAuthError {
    /// Whether the service itself rejected the exchange (as opposed to being
    /// unreachable or returning garbage).
    #[must_use]
    pub const fn is_service_rejection(&self) -> bool {
        matches!(self, Self::Service { .. })
    }

    /// Check if this error is potentially retryable.
    ///
    /// Transport failures may be transient; rejections and parse failures
    /// will not improve by retrying with the same key.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;

    #[test]
    fn classification_helpers_distinguish_variants() {
        let rejected = OAuthError::Service {
            status_code: 403,
            status_message: "Forbidden".to_string(),
        };
        assert!(rejected.is_service_rejection());
        assert!(!rejected.is_retryable());

        let config = OAuthError::Configuration("api key must not be empty".to_string());
        assert!(!config.is_service_rejection());
        assert!(!config.is_retryable());
    }
}
