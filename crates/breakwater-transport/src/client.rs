//! Client assembly: pooled connection manager, middleware stack, reaper
//! registration.

use std::fmt;
use std::sync::Arc;

use reqwest::{IntoUrl, Method};
use reqwest_middleware::{ClientWithMiddleware, RequestBuilder};

use breakwater_common::HttpClientSettings;

use crate::checksum::Crc32ChecksumMiddleware;
use crate::error::TransportError;
use crate::manager::{ConnectionManager, PooledConnectionManager};
use crate::reaper::IdleConnectionReaper;

/// Builds ready-to-use HTTP clients from settings snapshots.
///
/// Every client created by one factory shares the factory's
/// [`IdleConnectionReaper`]; its connection manager is registered there when
/// the settings ask for reaping.
pub struct HttpClientFactory {
    reaper: Arc<IdleConnectionReaper>,
}

impl HttpClientFactory {
    /// Create a factory registering its clients with the given reaper.
    #[must_use]
    pub const fn new(reaper: Arc<IdleConnectionReaper>) -> Self {
        Self { reaper }
    }

    /// Create a factory registering its clients with the process-wide
    /// [shared reaper](IdleConnectionReaper::shared).
    #[must_use]
    pub fn with_shared_reaper() -> Self {
        Self::new(Arc::clone(IdleConnectionReaper::shared()))
    }

    /// Assemble one client bound to one freshly built connection manager.
    ///
    /// The manager registered with the reaper is the *same* handle wrapped
    /// into the client, so reaping and the client's own lifecycle always
    /// refer to one pool.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Configuration`] for invalid settings and
    /// [`TransportError::Network`] when transport construction fails;
    /// construction failures are fatal and never retried here.
    pub fn create(&self, settings: &HttpClientSettings) -> Result<PooledHttpClient, TransportError> {
        let manager = PooledConnectionManager::new(settings)?;

        let reaper = if settings.use_reaper {
            let handle = Arc::clone(&manager) as Arc<dyn ConnectionManager>;
            self.reaper.register(&handle, settings.max_idle_time);
            Some(Arc::clone(&self.reaper))
        } else {
            None
        };

        Ok(PooledHttpClient {
            manager,
            middleware: vec![Arc::new(Crc32ChecksumMiddleware)],
            reaper,
        })
    }
}

impl fmt::Debug for HttpClientFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClientFactory").finish_non_exhaustive()
    }
}

/// An HTTP client that knows the connection manager it runs on.
///
/// Requests lease the manager's current pool per call, so a pool swapped out
/// by the idle reaper takes effect on the next request rather than pinning
/// stale connections. The underlying manager is exposed so callers can force
/// shutdown or deregistration explicitly.
pub struct PooledHttpClient {
    manager: Arc<PooledConnectionManager>,
    middleware: Vec<Arc<dyn reqwest_middleware::Middleware>>,
    /// The reaper this client's manager was registered with, if any.
    reaper: Option<Arc<IdleConnectionReaper>>,
}

impl PooledHttpClient {
    /// Begin a request with the given method and URL.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::PoolShutDown`] once [`shutdown`] has been
    /// called.
    ///
    /// [`shutdown`]: Self::shutdown
    pub fn request(&self, method: Method, url: impl IntoUrl) -> Result<RequestBuilder, TransportError> {
        Ok(self.stack()?.request(method, url))
    }

    /// Begin a GET request.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::PoolShutDown`] once the client has been
    /// shut down.
    pub fn get(&self, url: impl IntoUrl) -> Result<RequestBuilder, TransportError> {
        self.request(Method::GET, url)
    }

    /// Execute an already-built request through the middleware stack.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::PoolShutDown`] after shutdown,
    /// [`TransportError::Middleware`] or [`TransportError::Network`] for
    /// request failures — propagated to the caller, never swallowed.
    pub async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response, TransportError> {
        let response = self.stack()?.execute(request).await?;
        Ok(response)
    }

    /// The connection manager this client runs on.
    #[must_use]
    pub fn connection_manager(&self) -> Arc<PooledConnectionManager> {
        Arc::clone(&self.manager)
    }

    /// Deregister from the reaper and shut the pool down.
    ///
    /// In-flight requests drain; new ones fail with
    /// [`TransportError::PoolShutDown`].
    pub fn shutdown(&self) {
        if let Some(reaper) = &self.reaper {
            let handle = Arc::clone(&self.manager) as Arc<dyn ConnectionManager>;
            reaper.deregister(&handle);
        }
        self.manager.shutdown();
    }

    /// Lease the pool's current client and wrap it in the middleware stack.
    fn stack(&self) -> Result<ClientWithMiddleware, TransportError> {
        let leased = self.manager.client()?;
        let mut builder = reqwest_middleware::ClientBuilder::new(leased);
        for middleware in &self.middleware {
            builder = builder.with_arc(Arc::clone(middleware));
        }
        Ok(builder.build())
    }
}

impl fmt::Debug for PooledHttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledHttpClient")
            .field("manager", &self.manager)
            .field("reaper_registered", &self.reaper.is_some())
            .finish_non_exhaustive()
    }
}
