//! Error types for client construction and the connection lifecycle.

use thiserror::Error;

/// Errors raised while constructing a client or executing a request through
/// one.
///
/// Construction-time failures are fatal and synchronous; request-time
/// failures propagate to the immediate caller. Nothing in this crate catches
/// an error and returns an empty result in its place.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// Invalid construction input: malformed proxy settings, a zero pool
    /// size, and the like. Raised immediately, never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Socket, TLS, or protocol failure from the underlying transport.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failure inside the response-interception middleware stack.
    #[error("middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    /// The connection pool behind this client has been shut down.
    #[error("connection pool has been shut down")]
    PoolShutDown,
}

impl TransportError {
    /// Check if this error is potentially retryable.
    ///
    /// Returns `true` only for network-level failures; configuration errors
    /// and shut-down pools never become valid by retrying.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Middleware(_))
    }
}

/// Failure while closing idle connections for one pool during a reaper sweep.
///
/// Sweep errors are logged by the reaper and isolated to the handle that
/// produced them; they never abort the sweep of other pools and never
/// surface on a request path.
#[derive(Debug, Error)]
#[error("idle connection sweep failed: {source}")]
pub struct SweepError {
    #[from]
    source: TransportError,
}
