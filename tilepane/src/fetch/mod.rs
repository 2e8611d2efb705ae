//! Asynchronous tile fetching.
//!
//! [`FetchChannel`] turns a URL into a background transfer and reports the
//! outcome through a completion callback. The contract is strict:
//!
//! - Every `get()` invokes its callback at most once, on a worker task,
//!   never on the caller's thread.
//! - A cancelled request never invokes its callback at all, no matter how
//!   far the transfer had progressed.
//! - A callback only fires with a complete body: the transfer validates the
//!   declared Content-Length and reassembles partial reads up to it, so
//!   callers never see a truncated tile.
//!
//! Requests are cancelled through their [`FetchHandle`], which also cancels
//! on drop. The cache relies on that to abandon transfers for evicted tiles
//! without any extra bookkeeping.

pub mod error;
pub mod http;

pub use bytes::Bytes;
pub use error::{FetchError, TransportError};
pub use http::{BoxFuture, HttpClient, HttpResponse, ReqwestClient};

#[cfg(test)]
pub use http::tests::{MockExchange, MockHttpClient, MockResponse};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::BytesMut;
use dashmap::DashMap;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Unique identifier for one fetch request.
///
/// Allocated from a process-wide counter, so two requests for the same URL
/// are still distinguishable. Completion callbacks receive their request's
/// id, which is what lets a caller tell a live completion from a stale one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

impl RequestId {
    /// Allocates the next id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Completion callback invoked with the outcome of a fetch.
pub type FetchCallback = Box<dyn FnOnce(RequestId, Result<Bytes, FetchError>) + Send + 'static>;

/// Handle to an in-flight fetch.
///
/// Dropping the handle cancels the request. Cancellation is fire-and-forget:
/// the transfer is torn down in the background and the completion callback
/// is suppressed.
#[derive(Debug)]
pub struct FetchHandle {
    id: RequestId,
    token: CancellationToken,
}

impl FetchHandle {
    pub(crate) fn new(id: RequestId, token: CancellationToken) -> Self {
        Self { id, token }
    }

    /// The id of the request this handle controls.
    pub fn request_id(&self) -> RequestId {
        self.id
    }

    /// Cancels the request.
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

impl Drop for FetchHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Issues tile fetches as background tasks on a Tokio runtime.
pub struct FetchChannel {
    client: Arc<dyn HttpClient>,
    runtime: Handle,
    in_flight: Arc<DashMap<RequestId, CancellationToken>>,
}

impl FetchChannel {
    /// Creates a channel that fetches through `client` on `runtime`.
    pub fn new(client: Arc<dyn HttpClient>, runtime: Handle) -> Self {
        Self {
            client,
            runtime,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Creates a channel backed by a default-configured [`ReqwestClient`].
    pub fn with_default_client(runtime: Handle) -> Result<Self, TransportError> {
        Ok(Self::new(Arc::new(ReqwestClient::new()?), runtime))
    }

    /// Number of requests currently outstanding.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Starts fetching `url` in the background.
    ///
    /// `on_complete` runs on a worker task with the request's id and the
    /// transfer outcome. It is called at most once, and not at all if the
    /// request is cancelled first.
    pub fn get(&self, url: &str, on_complete: FetchCallback) -> FetchHandle {
        let id = RequestId::next();
        let token = CancellationToken::new();
        self.in_flight.insert(id, token.clone());

        let client = Arc::clone(&self.client);
        let in_flight = Arc::clone(&self.in_flight);
        let task_token = token.clone();
        let url = url.to_string();

        self.runtime.spawn(async move {
            let outcome = tokio::select! {
                _ = task_token.cancelled() => None,
                result = transfer(client.as_ref(), &url) => Some(result),
            };

            in_flight.remove(&id);

            match outcome {
                None => {
                    trace!(request = %id, url = %url, "Fetch cancelled");
                }
                Some(result) => {
                    // The token can trip between the transfer resolving and
                    // this point; a cancelled request must never call back.
                    if task_token.is_cancelled() {
                        trace!(request = %id, url = %url, "Fetch cancelled at completion");
                        return;
                    }
                    on_complete(id, result);
                }
            }
        });

        FetchHandle::new(id, token)
    }

    /// Cancels every outstanding request.
    ///
    /// Their callbacks are suppressed, not invoked with an error.
    pub fn cancel_all(&self) {
        for entry in self.in_flight.iter() {
            entry.value().cancel();
        }
    }
}

/// Runs one complete transfer: status check, length validation, chunk
/// reassembly.
async fn transfer(client: &dyn HttpClient, url: &str) -> Result<Bytes, FetchError> {
    let mut response = client.get(url).await.map_err(FetchError::from)?;

    let status = response.status();
    if !(200..=299).contains(&status) {
        // Fail on status alone; the body stream stays untouched.
        return Err(FetchError::Server { status });
    }

    let expected = response
        .content_length()
        .ok_or(TransportError::MissingContentLength)?;

    let mut body = BytesMut::with_capacity(expected as usize);
    while let Some(chunk) = response.chunk().await.map_err(FetchError::from)? {
        let received = body.len() as u64 + chunk.len() as u64;
        if received > expected {
            return Err(TransportError::LengthMismatch { expected, received }.into());
        }
        body.extend_from_slice(&chunk);
    }

    let received = body.len() as u64;
    if received != expected {
        return Err(TransportError::LengthMismatch { expected, received }.into());
    }

    Ok(body.freeze())
}
