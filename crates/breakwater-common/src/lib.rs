//! # breakwater-common
//!
//! Configuration types and shared abstractions for the breakwater transport
//! layer.
//!
//! This crate holds the pieces that both the transport core and its callers
//! need to agree on:
//! - [`HttpClientSettings`] — the immutable configuration snapshot a client
//!   is built from (pooling, timeouts, compression, proxy, trust)
//! - [`ProxySettings`] — proxy host/port, exclusion list, and credentials
//! - [`DnsResolver`] — a pluggable hostname-resolution seam, with
//!   [`SystemDnsResolver`] as the default
//!
//! ## Example
//!
//! ```
//! use std::time::Duration;
//!
//! use breakwater_common::{HttpClientSettings, ProxySettings};
//!
//! let settings = HttpClientSettings::builder()
//!     .max_idle_time(Duration::from_secs(30))
//!     .proxy(
//!         ProxySettings::builder()
//!             .host("proxy.internal".to_string())
//!             .port(3128)
//!             .build(),
//!     )
//!     .build();
//!
//! assert!(settings.is_proxy_enabled());
//! assert!(settings.use_gzip);
//! ```

/// Hostname resolution abstraction.
///
/// Provides the [`DnsResolver`] trait and a system default implementation.
pub mod resolver;
/// Client configuration snapshots.
///
/// Contains [`HttpClientSettings`] and [`ProxySettings`].
pub mod settings;

pub use resolver::{DnsResolver, ResolveError, SystemDnsResolver};
pub use settings::{HttpClientSettings, ProxySettings};
