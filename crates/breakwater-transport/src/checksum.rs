//! Response-integrity interception.
//!
//! [`Crc32ChecksumMiddleware`] buffers each response body, computes a CRC32
//! over it, and republishes the response with a [`ResponseChecksum`] in its
//! extensions for the outer SDK's integrity validation to compare against
//! the service's trailer/header.
//!
//! Whether the checksum covers compressed wire bytes or decoded content is
//! decided by the client's compression policy (see
//! [`HttpClientSettings::calculate_crc32_from_compressed_data`]): with
//! automatic decoding off, this middleware observes exactly what came off
//! the wire. That ordering is a configuration choice, not incidental.
//!
//! [`HttpClientSettings::calculate_crc32_from_compressed_data`]:
//! breakwater_common::HttpClientSettings::calculate_crc32_from_compressed_data

use anyhow::anyhow;
use async_trait::async_trait;
use flate2::Crc;
use http::Extensions;
use log::trace;
use reqwest::{Request, Response, ResponseBuilderExt};
use reqwest_middleware::{Middleware, Next};

/// CRC32 of a response body, stored in the response extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseChecksum(pub u32);

impl ResponseChecksum {
    /// Read the checksum recorded on a response, if the interceptor ran.
    #[must_use]
    pub fn of(response: &Response) -> Option<u32> {
        response.extensions().get::<Self>().map(|c| c.0)
    }
}

/// Middleware computing a CRC32 over every response body it sees.
#[derive(Debug, Clone, Copy, Default)]
pub struct Crc32ChecksumMiddleware;

#[async_trait]
impl Middleware for Crc32ChecksumMiddleware {
    async fn handle(
        &self,
        request: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let mut response = next.run(request, extensions).await?;

        let status = response.status();
        let version = response.version();
        let headers = response.headers().clone();
        let url = response.url().clone();
        // Carry the original extensions across the rebuild; interceptors
        // further down the stack may have recorded state there.
        let preserved = std::mem::take(response.extensions_mut());
        let body = response
            .bytes()
            .await
            .map_err(reqwest_middleware::Error::Reqwest)?;

        let mut crc = Crc::new();
        crc.update(&body);
        let checksum = crc.sum();
        trace!("computed response body crc32 {checksum:#010x} over {} bytes", body.len());

        // `url` re-attaches the request URL, which does not survive a plain
        // builder round-trip.
        let mut rebuilt = http::Response::builder()
            .status(status)
            .version(version)
            .url(url)
            .body(body)
            .map_err(|e| {
                reqwest_middleware::Error::Middleware(anyhow!(
                    "failed to reassemble checksummed response: {e}"
                ))
            })?;
        *rebuilt.headers_mut() = headers;
        rebuilt.extensions_mut().extend(preserved);
        rebuilt.extensions_mut().insert(ResponseChecksum(checksum));

        Ok(Response::from(rebuilt))
    }
}
