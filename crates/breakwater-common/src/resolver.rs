use std::net::{IpAddr, ToSocketAddrs};

use thiserror::Error;

/// Hostname resolution failed.
#[derive(Debug, Clone, Error)]
#[error("unknown host {host}: {message}")]
pub struct ResolveError {
    /// The host name that could not be resolved.
    pub host: String,
    /// Description of the underlying failure.
    pub message: String,
}

impl ResolveError {
    /// Build an error for a host that resolved to no addresses.
    #[must_use]
    pub fn unknown_host(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            message: "no addresses returned".to_string(),
        }
    }
}

/// Resolves host names into network addresses.
///
/// This is the seam for callers that need custom resolution — split-horizon
/// DNS, static endpoint pinning, test fixtures. Implementations must be cheap
/// and prompt; the transport calls [`resolve`](Self::resolve) on the request
/// path.
pub trait DnsResolver: Send + Sync {
    /// Resolve `host` into one or more IP addresses.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the host is unknown or resolution fails.
    fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError>;
}

/// Default resolver backed by the operating system's resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDnsResolver;

impl DnsResolver for SystemDnsResolver {
    fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError> {
        let addrs = (host, 0).to_socket_addrs().map_err(|e| ResolveError {
            host: host.to_string(),
            message: e.to_string(),
        })?;

        let ips: Vec<IpAddr> = addrs.map(|addr| addr.ip()).collect();
        if ips.is_empty() {
            return Err(ResolveError::unknown_host(host));
        }
        Ok(ips)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;

    #[test]
    fn system_resolver_resolves_localhost() {
        let ips = SystemDnsResolver.resolve("localhost").unwrap();
        assert!(!ips.is_empty());
        assert!(ips.iter().all(IpAddr::is_loopback));
    }

    #[test]
    fn system_resolver_rejects_unknown_host() {
        // RFC 6761 reserves .invalid; it never resolves.
        let err = SystemDnsResolver
            .resolve("does-not-exist.invalid")
            .unwrap_err();
        assert_eq!(err.host, "does-not-exist.invalid");
    }
}
