//! HTTP transport seam.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use http::header::CONTENT_LENGTH;
use http::{HeaderMap, Request, Response};
use hyper::Body;
use hyper::body::HttpBody;
use tokio::time::timeout;

use crate::error::{ExecutionError, ExecutionResult};
use crate::http_client::{HyperClient, build_https_client};

/// Sends one fully-built request and returns the buffered response.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Performs the request.
    ///
    /// Implementations must return [`ExecutionError::Transport`] for
    /// connection, TLS, or timeout failures and hand back every HTTP status,
    /// success or not, as a response.
    async fn send(&self, request: Request<Bytes>) -> ExecutionResult<Response<Bytes>>;
}

/// Default cap on a buffered response body.
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Production transport backed by `hyper` with rustls.
pub struct HyperTransport {
    client: HyperClient,
    timeout: Duration,
    max_body_bytes: usize,
}

impl fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HyperTransport")
            .field("timeout", &self.timeout)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Builds a transport whose calls are bounded by `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: build_https_client(),
            timeout,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Caps how many response body bytes are buffered. Larger bodies fail the
    /// call as a transport error.
    #[must_use]
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl HttpTransport for HyperTransport {
    async fn send(&self, request: Request<Bytes>) -> ExecutionResult<Response<Bytes>> {
        let request = request.map(Body::from);

        let response = timeout(self.timeout, self.client.request(request))
            .await
            .map_err(|_| ExecutionError::transport("request timed out"))?
            .map_err(|err| ExecutionError::transport(format!("request failed: {err}")))?;

        let (parts, body) = response.into_parts();
        if declared_length(&parts.headers).is_some_and(|len| len > as_u64(self.max_body_bytes)) {
            return Err(too_large(self.max_body_bytes));
        }
        let bytes = timeout(self.timeout, read_limited(body, self.max_body_bytes))
            .await
            .map_err(|_| ExecutionError::transport("timed out reading response body"))??;

        Ok(Response::from_parts(parts, bytes))
    }
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn as_u64(bytes: usize) -> u64 {
    u64::try_from(bytes).unwrap_or(u64::MAX)
}

fn too_large(limit: usize) -> ExecutionError {
    ExecutionError::transport(format!("response body exceeds {limit} bytes"))
}

/// Buffers `body`, failing as soon as it grows past `limit` bytes.
async fn read_limited<B>(mut body: B, limit: usize) -> ExecutionResult<Bytes>
where
    B: HttpBody<Data = Bytes> + Unpin,
    B::Error: fmt::Display,
{
    let mut buf = BytesMut::new();
    while let Some(chunk) = body.data().await {
        let chunk =
            chunk.map_err(|err| ExecutionError::transport(format!("failed to read response: {err}")))?;
        if buf.len() + chunk.len() > limit {
            return Err(too_large(limit));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;

    use super::*;

    #[tokio::test]
    async fn bodies_within_the_cap_are_buffered() {
        let bytes = read_limited(Body::from(vec![7_u8; 10]), 16).await.unwrap();
        assert_eq!(bytes.len(), 10);
        let exact = read_limited(Body::from(vec![7_u8; 16]), 16).await.unwrap();
        assert_eq!(exact.len(), 16);
    }

    #[tokio::test]
    async fn oversized_bodies_are_transport_errors() {
        let err = read_limited(Body::from(vec![7_u8; 10]), 4).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Transport { .. }));
        assert!(err.to_string().contains("exceeds 4 bytes"));
    }

    #[tokio::test]
    async fn streamed_chunks_count_toward_the_cap() {
        let (mut sender, body) = Body::channel();
        let feed = tokio::spawn(async move {
            for _ in 0..4 {
                if sender.send_data(Bytes::from_static(b"abcd")).await.is_err() {
                    break;
                }
            }
        });
        let err = read_limited(body, 10).await.unwrap_err();
        assert!(err.to_string().contains("exceeds 10 bytes"));
        feed.await.unwrap();
    }

    #[test]
    fn content_length_is_read_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(declared_length(&headers), None);
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("2048"));
        assert_eq!(declared_length(&headers), Some(2048));
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("lots"));
        assert_eq!(declared_length(&headers), None);
    }

    #[test]
    fn cap_is_configurable() {
        let transport = HyperTransport::default().with_max_body_bytes(1024);
        assert!(format!("{transport:?}").contains("max_body_bytes: 1024"));
    }
}
