//! Scripted in-memory transport for unit tests.

use std::collections::VecDeque;

use bytes::Bytes;
use futures::{stream, StreamExt};
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_LENGTH, CONTENT_RANGE, RANGE};
use tokio::time::Instant;

use super::{BoxFuture, HttpTransport, TransportError, TransportResponse};

const CHUNK_SIZE: usize = 16 * 1024;

/// What the mock does for the next request.
#[derive(Debug, Clone)]
pub(crate) enum MockReply {
    /// Serve the resource, honouring `Range` if enabled.
    Serve,
    /// Reply with this status and an empty body.
    Status(u16),
    /// Fail before any response.
    TransportError,
    /// Serve only the first `n` bytes of the body, then fail mid-stream.
    Truncated(usize),
    /// Serve only the first `n` bytes of the body, then end cleanly.
    Short(usize),
    /// Reply verbatim.
    Raw {
        status: u16,
        headers: Vec<(&'static str, String)>,
        body: Vec<u8>,
    },
}

/// A request the mock received.
#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub url: String,
    pub range: Option<String>,
    pub at: Instant,
}

/// Transport serving a single in-memory resource.
///
/// Replies follow the script; once it is exhausted every request is served.
pub(crate) struct MockTransport {
    resource: Vec<u8>,
    honor_ranges: bool,
    script: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub fn new(resource: impl Into<Vec<u8>>) -> Self {
        Self {
            resource: resource.into(),
            honor_ranges: true,
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always reply 200 with the full body, ignoring `Range`.
    pub fn ignoring_ranges(mut self) -> Self {
        self.honor_ranges = false;
        self
    }

    pub fn with_script(self, replies: impl IntoIterator<Item = MockReply>) -> Self {
        self.script.lock().extend(replies);
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    fn respond(&self, headers: &HeaderMap) -> Result<TransportResponse, TransportError> {
        let reply = self.script.lock().pop_front().unwrap_or(MockReply::Serve);
        match reply {
            MockReply::Serve => Ok(self.serve(headers, None)),
            MockReply::Truncated(n) => Ok(self.serve(headers, Some((n, true)))),
            MockReply::Short(n) => Ok(self.serve(headers, Some((n, false)))),
            MockReply::Raw {
                status,
                headers,
                body,
            } => {
                let mut map = HeaderMap::new();
                for (name, value) in headers {
                    map.insert(name, header_value(&value));
                }
                Ok(TransportResponse {
                    status,
                    headers: map,
                    body: stream::iter(vec![Ok(Bytes::from(body))]).boxed(),
                })
            }
            MockReply::Status(status) => Ok(TransportResponse {
                status,
                headers: HeaderMap::new(),
                body: stream::empty().boxed(),
            }),
            MockReply::TransportError => {
                Err(TransportError::Request("connection refused".to_string()))
            }
        }
    }

    fn serve(&self, headers: &HeaderMap, cut_after: Option<(usize, bool)>) -> TransportResponse {
        let len = self.resource.len();
        let offset = headers
            .get(RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("bytes="))
            .and_then(|v| v.strip_suffix('-'))
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|_| self.honor_ranges);

        let mut response_headers = HeaderMap::new();
        let (status, body) = match offset {
            Some(offset) if offset >= len => {
                response_headers.insert(
                    CONTENT_RANGE,
                    header_value(&format!("bytes */{len}")),
                );
                (416, Vec::new())
            }
            Some(offset) => {
                response_headers.insert(
                    CONTENT_RANGE,
                    header_value(&format!("bytes {}-{}/{}", offset, len - 1, len)),
                );
                (206, self.resource[offset..].to_vec())
            }
            None => (200, self.resource.clone()),
        };
        response_headers.insert(CONTENT_LENGTH, header_value(&body.len().to_string()));

        let mut chunks: Vec<Result<Bytes, TransportError>> = body
            .chunks(CHUNK_SIZE)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        if let Some((n, fail)) = cut_after {
            let kept = body.get(..n.min(body.len())).unwrap_or_default();
            chunks = vec![Ok(Bytes::copy_from_slice(kept))];
            if fail {
                chunks.push(Err(TransportError::Body("connection reset".to_string())));
            }
        }

        TransportResponse {
            status,
            headers: response_headers,
            body: stream::iter(chunks).boxed(),
        }
    }
}

fn header_value(s: &str) -> HeaderValue {
    HeaderValue::from_str(s).unwrap()
}

impl HttpTransport for MockTransport {
    fn get<'a>(
        &'a self,
        url: &'a str,
        headers: HeaderMap,
    ) -> BoxFuture<'a, Result<TransportResponse, TransportError>> {
        self.requests.lock().push(RecordedRequest {
            url: url.to_string(),
            range: headers
                .get(RANGE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            at: Instant::now(),
        });
        let result = self.respond(&headers);
        Box::pin(async move { result })
    }
}

/// Transport whose requests never complete.
pub(crate) struct StalledTransport;

impl HttpTransport for StalledTransport {
    fn get<'a>(
        &'a self,
        _url: &'a str,
        _headers: HeaderMap,
    ) -> BoxFuture<'a, Result<TransportResponse, TransportError>> {
        Box::pin(futures::future::pending())
    }
}
