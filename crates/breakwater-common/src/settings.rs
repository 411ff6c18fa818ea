use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use typed_builder::TypedBuilder;

use crate::resolver::DnsResolver;

/// Default maximum number of idle pooled connections kept per host.
pub const DEFAULT_MAX_CONNECTIONS: usize = 50;

/// Default time a pooled connection may sit idle before it is eligible for
/// reaping.
pub const DEFAULT_MAX_IDLE_TIME: Duration = Duration::from_secs(60);

/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default socket read timeout.
pub const DEFAULT_SOCKET_TIMEOUT: Duration = Duration::from_secs(50);

/// Proxy routing configuration.
///
/// Traffic for hosts not listed in `non_proxy_hosts` is routed through
/// `host:port`. When both `username` and `password` are present the proxy is
/// considered authenticated; the credentials apply to proxy authentication
/// only, never to the origin server.
///
/// # Examples
///
/// ```
/// use breakwater_common::ProxySettings;
///
/// let proxy = ProxySettings::builder()
///     .host("proxy.internal".to_string())
///     .port(3128)
///     .non_proxy_hosts(vec!["localhost".to_string()])
///     .build();
///
/// assert!(!proxy.is_authenticated());
/// ```
#[derive(Debug, Clone, TypedBuilder)]
pub struct ProxySettings {
    /// Proxy host name or address.
    pub host: String,
    /// Proxy port.
    pub port: u16,
    /// Proxy user name, if the proxy requires authentication.
    #[builder(default, setter(strip_option))]
    pub username: Option<String>,
    /// Proxy password, if the proxy requires authentication.
    ///
    /// Stored as a [`SecretString`] so it is redacted from debug output and
    /// zeroed on drop.
    #[builder(default, setter(strip_option))]
    pub password: Option<SecretString>,
    /// Hosts that bypass the proxy and are dialed directly.
    #[builder(default)]
    pub non_proxy_hosts: Vec<String>,
}

impl ProxySettings {
    /// Whether both a user name and a password are configured.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }
}

/// Immutable configuration snapshot a pooled HTTP client is built from.
///
/// A settings value is read-only once handed to the client factory; changing
/// policy means building a new client. Defaults match what a data-plane
/// object-storage client wants: gzip negotiation on, idle reaping on, strict
/// certificate validation.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use breakwater_common::HttpClientSettings;
///
/// let settings = HttpClientSettings::builder()
///     .use_gzip(false)
///     .max_idle_time(Duration::from_secs(15))
///     .build();
///
/// assert!(!settings.use_gzip);
/// assert!(settings.use_reaper);
/// ```
#[derive(Clone, TypedBuilder)]
pub struct HttpClientSettings {
    /// Negotiate gzip content encoding for responses.
    ///
    /// Disabling this also disables automatic content decoding, so callers
    /// read raw wire bytes.
    #[builder(default = true)]
    pub use_gzip: bool,
    /// Compute the response CRC32 over the compressed wire bytes rather than
    /// the decoded content.
    ///
    /// When set, gzip is still negotiated but automatic decoding is turned
    /// off so the checksum interceptor observes exactly what came off the
    /// wire.
    #[builder(default = false)]
    pub calculate_crc32_from_compressed_data: bool,
    /// How long a pooled connection may remain idle before the keep-alive
    /// policy and the idle-connection reaper close it.
    ///
    /// A zero duration leaves the transport's own keep-alive defaults in
    /// place.
    #[builder(default = DEFAULT_MAX_IDLE_TIME)]
    pub max_idle_time: Duration,
    /// Register the client's connection manager with the idle-connection
    /// reaper.
    #[builder(default = true)]
    pub use_reaper: bool,
    /// Skip TLS certificate chain validation.
    ///
    /// A deliberately insecure development mode; never the default.
    #[builder(default = false)]
    pub cert_check_disabled: bool,
    /// Maximum number of idle pooled connections kept per host.
    #[builder(default = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: usize,
    /// TCP connect timeout.
    #[builder(default = DEFAULT_CONNECT_TIMEOUT)]
    pub connect_timeout: Duration,
    /// Socket read timeout.
    #[builder(default = DEFAULT_SOCKET_TIMEOUT)]
    pub socket_timeout: Duration,
    /// Proxy configuration; `None` dials origins directly.
    #[builder(default, setter(strip_option))]
    pub proxy: Option<ProxySettings>,
    /// Custom hostname resolver; `None` uses the transport's default.
    #[builder(default, setter(strip_option))]
    pub dns_resolver: Option<Arc<dyn DnsResolver>>,
}

impl HttpClientSettings {
    /// Whether requests are routed through a proxy.
    #[must_use]
    pub const fn is_proxy_enabled(&self) -> bool {
        self.proxy.is_some()
    }
}

impl Default for HttpClientSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

// Manual impl because `Arc<dyn DnsResolver>` has no Debug.
impl fmt::Debug for HttpClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClientSettings")
            .field("use_gzip", &self.use_gzip)
            .field(
                "calculate_crc32_from_compressed_data",
                &self.calculate_crc32_from_compressed_data,
            )
            .field("max_idle_time", &self.max_idle_time)
            .field("use_reaper", &self.use_reaper)
            .field("cert_check_disabled", &self.cert_check_disabled)
            .field("max_connections", &self.max_connections)
            .field("connect_timeout", &self.connect_timeout)
            .field("socket_timeout", &self.socket_timeout)
            .field("proxy", &self.proxy)
            .field("dns_resolver", &self.dns_resolver.as_ref().map(|_| ".."))
            .finish()
    }
}
