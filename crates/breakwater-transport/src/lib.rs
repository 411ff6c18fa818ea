//! # breakwater-transport
//!
//! Pooled HTTP client construction and connection lifecycle for
//! object-storage SDKs.
//!
//! This crate owns three things the data plane depends on:
//! - building configured clients from an [`HttpClientSettings`] snapshot
//!   (pooling, keep-alive, proxy routing, compression policy, TLS trust,
//!   response integrity)
//! - the [`IdleConnectionReaper`], one background worker per process that
//!   closes pooled connections left idle past their threshold
//! - the [`ConnectionManager`] seam that ties the two together, so the
//!   client using a pool and the reaper sweeping it always refer to the
//!   same handle
//!
//! ## Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use breakwater_common::HttpClientSettings;
//! use breakwater_transport::HttpClientFactory;
//!
//! # async fn example() -> Result<(), breakwater_transport::TransportError> {
//! let settings = HttpClientSettings::builder()
//!     .max_idle_time(Duration::from_secs(30))
//!     .build();
//!
//! let client = HttpClientFactory::with_shared_reaper().create(&settings)?;
//! let response = client.get("https://s3.example.com/bucket/key")?.send().await?;
//! println!("{}", response.status());
//!
//! // Deregisters from the reaper and shuts the pool down.
//! client.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod checksum;
pub mod client;
pub mod error;
pub mod manager;
pub mod reaper;
pub mod resolve;
pub mod trust;

pub use breakwater_common::{HttpClientSettings, ProxySettings};
pub use checksum::{Crc32ChecksumMiddleware, ResponseChecksum};
pub use client::{HttpClientFactory, PooledHttpClient};
pub use error::{SweepError, TransportError};
pub use manager::{ConnectionManager, PooledConnectionManager};
pub use reaper::IdleConnectionReaper;
pub use resolve::DelegatingDnsResolver;
pub use trust::TrustDecision;
