//! HTTP client abstraction for testability.
//!
//! Tile transfers need more than a body-in-one-call interface: the fetch
//! layer validates the declared Content-Length and reassembles the body
//! chunk by chunk, and it must be able to reject a response by status
//! without ever touching the body stream. The traits here expose exactly
//! that surface, and use `Pin<Box<dyn Future>>` so the channel can hold
//! any client as a trait object.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, trace, warn};

use super::error::TransportError;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// User-Agent sent with every tile request. Public tile servers reject
/// anonymous clients.
const USER_AGENT: &str = concat!("tilepane/", env!("CARGO_PKG_VERSION"));

/// Default per-request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Asynchronous HTTP client interface.
///
/// Implementations hand back a response object as soon as headers arrive,
/// leaving the body unread. The caller decides whether to drain it.
pub trait HttpClient: Send + Sync {
    /// Performs an HTTP GET request.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to request
    ///
    /// # Returns
    ///
    /// The response (headers received, body not yet read), or a transport
    /// error if no response arrived at all.
    fn get(&self, url: &str) -> BoxFuture<'_, Result<Box<dyn HttpResponse>, TransportError>>;
}

/// A streaming HTTP response.
pub trait HttpResponse: Send {
    /// The HTTP status code.
    fn status(&self) -> u16;

    /// The declared Content-Length, if the server sent one.
    fn content_length(&self) -> Option<u64>;

    /// Reads the next body chunk.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(bytes))` while body data remains
    /// - `Ok(None)` once the stream is exhausted
    /// - `Err(_)` if the stream fails mid-transfer
    fn chunk(&mut self) -> BoxFuture<'_, Result<Option<Bytes>, TransportError>>;
}

/// Real HTTP client implementation using reqwest.
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a client with the default timeout.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a client with a custom per-request timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            // Connection pooling - a pan burst requests a screenful of tiles
            // from one host at once
            .pool_max_idle_per_host(32)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| {
                TransportError::Connect(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> BoxFuture<'_, Result<Box<dyn HttpResponse>, TransportError>> {
        let request = self.client.get(url);
        let url = url.to_string();

        Box::pin(async move {
            trace!(url = %url, "HTTP GET request starting");

            match request.send().await {
                Ok(response) => {
                    debug!(
                        url = %url,
                        status = response.status().as_u16(),
                        "HTTP response headers received"
                    );
                    Ok(Box::new(ReqwestResponse { inner: response }) as Box<dyn HttpResponse>)
                }
                Err(e) => {
                    warn!(
                        url = %url,
                        error = %e,
                        is_connect = e.is_connect(),
                        is_timeout = e.is_timeout(),
                        "HTTP request failed"
                    );
                    Err(TransportError::Connect(format!("Request failed: {}", e)))
                }
            }
        })
    }
}

struct ReqwestResponse {
    inner: reqwest::Response,
}

impl HttpResponse for ReqwestResponse {
    fn status(&self) -> u16 {
        self.inner.status().as_u16()
    }

    fn content_length(&self) -> Option<u64> {
        self.inner.content_length()
    }

    fn chunk(&mut self) -> BoxFuture<'_, Result<Option<Bytes>, TransportError>> {
        Box::pin(async move {
            self.inner
                .chunk()
                .await
                .map_err(|e| TransportError::Read(format!("Failed to read response: {}", e)))
        })
    }
}
