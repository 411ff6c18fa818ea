//! Adapts an externally supplied [`DnsResolver`] to the transport library's
//! resolver interface.
//!
//! Pure pass-through: every lookup forwards verbatim to the wrapped
//! delegate, including errors. No retry, no caching, no transformation.

use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::dns::{Addrs, Name, Resolve, Resolving};

use breakwater_common::DnsResolver;

/// Bridges an [`Arc<dyn DnsResolver>`] into [`reqwest::dns::Resolve`] so the
/// transport library can use it without knowing the SDK's own abstraction.
pub struct DelegatingDnsResolver {
    delegate: Arc<dyn DnsResolver>,
}

impl DelegatingDnsResolver {
    /// Wrap a delegate resolver.
    #[must_use]
    pub fn new(delegate: Arc<dyn DnsResolver>) -> Self {
        Self { delegate }
    }
}

impl Resolve for DelegatingDnsResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let delegate = Arc::clone(&self.delegate);
        Box::pin(async move {
            let ips = delegate.resolve(name.as_str())?;
            // Port 0 is a placeholder; the connector substitutes the real
            // destination port.
            let addrs: Addrs = Box::new(ips.into_iter().map(|ip| SocketAddr::new(ip, 0)));
            Ok(addrs)
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;

    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Mutex;

    use breakwater_common::{HttpClientSettings, ResolveError};

    use crate::manager::PooledConnectionManager;

    struct PinnedResolver {
        requested: Mutex<Vec<String>>,
    }

    impl DnsResolver for PinnedResolver {
        fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError> {
            self.requested.lock().unwrap().push(host.to_string());
            if host == "storage.internal" {
                Ok(vec![IpAddr::V4(Ipv4Addr::new(10, 0, 0, 42))])
            } else {
                Err(ResolveError::unknown_host(host))
            }
        }
    }

    #[test]
    fn delegate_results_and_errors_forward_verbatim() {
        let resolver = PinnedResolver {
            requested: Mutex::new(Vec::new()),
        };

        let ips = resolver.resolve("storage.internal").unwrap();
        assert_eq!(ips, vec![IpAddr::V4(Ipv4Addr::new(10, 0, 0, 42))]);

        let err = resolver.resolve("elsewhere.example").unwrap_err();
        assert_eq!(err.host, "elsewhere.example");
        assert_eq!(
            *resolver.requested.lock().unwrap(),
            vec!["storage.internal".to_string(), "elsewhere.example".to_string()]
        );
    }

    #[test]
    fn client_construction_accepts_a_custom_resolver() {
        let settings = HttpClientSettings::builder()
            .dns_resolver(Arc::new(PinnedResolver {
                requested: Mutex::new(Vec::new()),
            }) as Arc<dyn DnsResolver>)
            .build();

        assert!(PooledConnectionManager::new(&settings).is_ok());
    }
}
