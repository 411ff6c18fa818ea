//! Pooled connection management.
//!
//! A [`PooledConnectionManager`] owns one connection pool and everything
//! needed to rebuild it; the [`ConnectionManager`] trait is the narrow seam
//! the [idle-connection reaper](crate::reaper) sweeps through. Both the
//! client executing requests and the reaper closing idle connections hold
//! the *same* `Arc`, so lifecycle stays consistent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use log::{debug, info};
use reqwest::header::{ACCEPT_ENCODING, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;

use breakwater_common::HttpClientSettings;

use crate::error::{SweepError, TransportError};
use crate::resolve::DelegatingDnsResolver;
use crate::trust::TrustDecision;

/// A handle to a pool of reusable connections.
///
/// Object-safe so the reaper can sweep heterogeneous pools. Implementations
/// must be thread-safe, and both operations must return promptly — the
/// reaper calls them from its single background worker, and one slow handle
/// must not stall the sweep of the others.
pub trait ConnectionManager: Send + Sync {
    /// Close pooled connections that have been idle longer than the
    /// threshold.
    ///
    /// Returns `true` when idle state was actually released.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError`] when releasing idle connections fails; the
    /// reaper logs it and moves on to the next pool.
    fn close_idle_connections(&self, idle_longer_than: Duration) -> Result<bool, SweepError>;

    /// Shut the pool down. Subsequent leases fail; in-flight requests drain.
    fn shutdown(&self);
}

/// Connection manager backed by a pooled `reqwest` client.
///
/// The pool's idle state lives inside the wrapped client, so "close idle
/// connections" is implemented by swapping in a freshly built client once
/// the pool has sat unused past the threshold: clones leased before the swap
/// finish their in-flight work, and the old pool's TCP/TLS state drops with
/// the last clone.
#[derive(Debug)]
pub struct PooledConnectionManager {
    settings: HttpClientSettings,
    client: RwLock<reqwest::Client>,
    /// Completion time of the most recent lease; `None` while the pool is
    /// cold (fresh or just swapped).
    last_use: Mutex<Option<Instant>>,
    shut_down: AtomicBool,
}

impl PooledConnectionManager {
    /// Build a pooled connection manager from a settings snapshot.
    ///
    /// This is the factory role: it validates the settings and constructs
    /// the underlying pooled transport (pool size, timeouts, keep-alive,
    /// trust decision, proxy route, compression policy, custom resolver).
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Configuration`] for invalid settings and
    /// [`TransportError::Network`] when transport construction fails. Both
    /// are fatal to construction and never retried here.
    pub fn new(settings: &HttpClientSettings) -> Result<Arc<Self>, TransportError> {
        validate(settings)?;
        let client = build_transport(settings)?;

        Ok(Arc::new(Self {
            settings: settings.clone(),
            client: RwLock::new(client),
            last_use: Mutex::new(None),
            shut_down: AtomicBool::new(false),
        }))
    }

    /// Lease the pool's current client and stamp the last-use time.
    ///
    /// The returned client is a cheap clone sharing the pool; it must be
    /// leased per request rather than cached, so that idle-reaping swaps
    /// take effect.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::PoolShutDown`] once [`shutdown`] has been
    /// called.
    ///
    /// [`shutdown`]: ConnectionManager::shutdown
    pub fn client(&self) -> Result<reqwest::Client, TransportError> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(TransportError::PoolShutDown);
        }

        *self
            .last_use
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());

        Ok(self
            .client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    /// The settings snapshot this pool was built from.
    #[must_use]
    pub const fn settings(&self) -> &HttpClientSettings {
        &self.settings
    }
}

impl ConnectionManager for PooledConnectionManager {
    fn close_idle_connections(&self, idle_longer_than: Duration) -> Result<bool, SweepError> {
        if self.shut_down.load(Ordering::Acquire) {
            return Ok(false);
        }

        let mut last_use = self
            .last_use
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let expired = last_use.is_some_and(|at| at.elapsed() >= idle_longer_than);
        if !expired {
            return Ok(false);
        }

        let fresh = build_transport(&self.settings).map_err(SweepError::from)?;
        *self
            .client
            .write()
            .unwrap_or_else(PoisonError::into_inner) = fresh;
        *last_use = None;

        debug!("released idle connection pool (idle longer than {idle_longer_than:?})");
        Ok(true)
    }

    fn shutdown(&self) {
        self.shut_down.store(true, Ordering::Release);
    }
}

fn validate(settings: &HttpClientSettings) -> Result<(), TransportError> {
    if settings.max_connections == 0 {
        return Err(TransportError::Configuration(
            "max_connections must be greater than zero".to_string(),
        ));
    }
    if let Some(proxy) = &settings.proxy {
        if proxy.host.trim().is_empty() {
            return Err(TransportError::Configuration(
                "proxy host must not be empty".to_string(),
            ));
        }
        if proxy.port == 0 {
            return Err(TransportError::Configuration(
                "proxy port must not be zero".to_string(),
            ));
        }
    }
    Ok(())
}

/// Build the pooled transport a manager wraps.
///
/// Called at construction and again on every idle swap, so policy lives in
/// exactly one place.
pub(crate) fn build_transport(
    settings: &HttpClientSettings,
) -> Result<reqwest::Client, TransportError> {
    let mut builder = reqwest::Client::builder()
        .pool_max_idle_per_host(settings.max_connections)
        .connect_timeout(settings.connect_timeout)
        .read_timeout(settings.socket_timeout);

    // Keep-alive policy: only override transport defaults when a positive
    // idle bound is configured.
    if !settings.max_idle_time.is_zero() {
        builder = builder.pool_idle_timeout(settings.max_idle_time);
    }

    // Compression policy. Disabling gzip must also disable automatic
    // decoding so callers read raw wire bytes; computing the CRC32 from
    // compressed data still negotiates gzip but keeps decoding off so the
    // checksum interceptor observes exactly what came off the wire.
    if settings.use_gzip && !settings.calculate_crc32_from_compressed_data {
        builder = builder.gzip(true);
    } else {
        builder = builder.gzip(false);
        if settings.use_gzip {
            let mut headers = HeaderMap::new();
            headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
            builder = builder.default_headers(headers);
        }
    }

    builder = TrustDecision::from_cert_check_disabled(settings.cert_check_disabled).apply(builder);

    if let Some(proxy_settings) = &settings.proxy {
        info!(
            "configuring proxy, host: {} port: {}",
            proxy_settings.host, proxy_settings.port
        );
        let mut proxy =
            reqwest::Proxy::all(format!("http://{}:{}", proxy_settings.host, proxy_settings.port))
                .map_err(|e| {
                    TransportError::Configuration(format!(
                        "invalid proxy address {}:{}: {e}",
                        proxy_settings.host, proxy_settings.port
                    ))
                })?;
        // Proxy credentials authenticate against the proxy only, never the
        // origin server.
        if let (Some(username), Some(password)) =
            (&proxy_settings.username, &proxy_settings.password)
        {
            proxy = proxy.basic_auth(username, password.expose_secret());
        }
        if !proxy_settings.non_proxy_hosts.is_empty() {
            proxy = proxy.no_proxy(reqwest::NoProxy::from_string(
                &proxy_settings.non_proxy_hosts.join(","),
            ));
        }
        builder = builder.proxy(proxy);
    }

    if let Some(resolver) = &settings.dns_resolver {
        builder = builder.dns_resolver(Arc::new(DelegatingDnsResolver::new(Arc::clone(resolver))));
    }

    builder.build().map_err(TransportError::Network)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;

    use breakwater_common::ProxySettings;

    #[test]
    fn cold_pool_has_nothing_to_reap() {
        let manager = PooledConnectionManager::new(&HttpClientSettings::default()).unwrap();
        assert!(!manager.close_idle_connections(Duration::ZERO).unwrap());
    }

    #[test]
    fn idle_pool_is_swapped_once() {
        let manager = PooledConnectionManager::new(&HttpClientSettings::default()).unwrap();
        manager.client().unwrap();
        std::thread::sleep(Duration::from_millis(20));

        assert!(
            manager
                .close_idle_connections(Duration::from_millis(10))
                .unwrap()
        );
        // Pool is cold again until the next lease.
        assert!(
            !manager
                .close_idle_connections(Duration::from_millis(10))
                .unwrap()
        );
    }

    #[test]
    fn recently_used_pool_is_left_alone() {
        let manager = PooledConnectionManager::new(&HttpClientSettings::default()).unwrap();
        manager.client().unwrap();

        assert!(
            !manager
                .close_idle_connections(Duration::from_secs(60))
                .unwrap()
        );
    }

    #[test]
    fn shutdown_invalidates_leases() {
        let manager = PooledConnectionManager::new(&HttpClientSettings::default()).unwrap();
        manager.shutdown();

        assert!(matches!(
            manager.client(),
            Err(TransportError::PoolShutDown)
        ));
        assert!(!manager.close_idle_connections(Duration::ZERO).unwrap());
    }

    #[test]
    fn empty_proxy_host_is_a_configuration_error() {
        let settings = HttpClientSettings::builder()
            .proxy(ProxySettings::builder().host(String::new()).port(3128).build())
            .build();

        assert!(matches!(
            PooledConnectionManager::new(&settings),
            Err(TransportError::Configuration(_))
        ));
    }

    #[test]
    fn zero_pool_size_is_a_configuration_error() {
        let settings = HttpClientSettings::builder().max_connections(0).build();

        assert!(matches!(
            PooledConnectionManager::new(&settings),
            Err(TransportError::Configuration(_))
        ));
    }
}
