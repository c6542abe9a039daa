//! reqwest-backed transport.

use std::time::Duration;

use futures::StreamExt;
use reqwest::header::HeaderMap;
use reqwest::Client;

use super::{BoxFuture, HttpTransport, TransportError, TransportResponse};

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// [`HttpTransport`] built on an async `reqwest::Client`.
///
/// Only connection establishment is time-limited. Multi-gigabyte bodies may
/// legitimately stream for hours, so callers bound a whole download through
/// its cancellation token instead.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    connect_timeout: Duration,
}

impl ReqwestTransport {
    /// Create a transport with the default connect timeout.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
    }

    /// Create a transport with a custom connect timeout.
    pub fn with_connect_timeout(connect_timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(concat!("modelferry/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self {
            client,
            connect_timeout,
        })
    }

    /// Wrap an existing client, e.g. one with proxy settings.
    pub fn from_client(client: Client) -> Self {
        Self {
            client,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    /// Configured connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

fn request_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else {
        TransportError::Request(e.to_string())
    }
}

impl HttpTransport for ReqwestTransport {
    fn get<'a>(
        &'a self,
        url: &'a str,
        headers: HeaderMap,
    ) -> BoxFuture<'a, Result<TransportResponse, TransportError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(url)
                .headers(headers)
                .send()
                .await
                .map_err(request_error)?;

            let status = response.status().as_u16();
            let headers = response.headers().clone();
            let body = response
                .bytes_stream()
                .map(|chunk| chunk.map_err(|e| TransportError::Body(e.to_string())))
                .boxed();

            Ok(TransportResponse {
                status,
                headers,
                body,
            })
        })
    }
}
