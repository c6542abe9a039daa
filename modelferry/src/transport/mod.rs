//! HTTP transport abstraction.
//!
//! The download orchestrator talks to the network only through
//! [`HttpTransport`], so tests and embedding applications can supply their
//! own implementation. [`ReqwestTransport`] is the production one.
//!
//! The trait returns boxed futures so it can be used as a trait object
//! (`Arc<dyn HttpTransport>`).

mod http;
#[cfg(test)]
pub(crate) mod mock;

pub use self::http::ReqwestTransport;

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures::stream::BoxStream;
use reqwest::header::{HeaderMap, ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE};
use thiserror::Error;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Response body as a stream of chunks.
pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// Errors raised by a transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The client could not be constructed.
    #[error("failed to create HTTP client: {0}")]
    Client(String),

    /// The request could not be sent or no response arrived.
    #[error("request failed: {0}")]
    Request(String),

    /// Connecting or waiting for the server timed out.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The connection failed while reading the body.
    #[error("failed to read response body: {0}")]
    Body(String),
}

/// Status, headers and body of a GET response.
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Body stream; dropping it aborts the transfer.
    pub body: ByteStream,
}

impl TransportResponse {
    /// Declared body length from `Content-Length`.
    pub fn content_length(&self) -> Option<u64> {
        self.header_str(CONTENT_LENGTH.as_str())
            .and_then(|v| v.trim().parse().ok())
    }

    /// Raw `Content-Range` value, if present.
    pub fn content_range(&self) -> Option<&str> {
        self.header_str(CONTENT_RANGE.as_str())
    }

    /// Raw `Accept-Ranges` value, if present.
    pub fn accept_ranges(&self) -> Option<&str> {
        self.header_str(ACCEPT_RANGES.as_str())
    }

    fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Issues GET requests with custom headers.
///
/// Implementations must be `Send + Sync`; one transport is shared by every
/// concurrent acquisition.
pub trait HttpTransport: Send + Sync {
    /// Send a GET request for `url` with the given extra headers.
    ///
    /// Non-2xx statuses are returned as responses, not errors; status
    /// handling belongs to the caller.
    fn get<'a>(
        &'a self,
        url: &'a str,
        headers: HeaderMap,
    ) -> BoxFuture<'a, Result<TransportResponse, TransportError>>;
}
