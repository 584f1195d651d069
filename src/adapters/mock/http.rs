//! Mock HTTP client for testing.
//!
//! Provides a configurable mock HTTP client that can return predefined
//! responses, errors or event streams, and records every request made.

use std::collections::{HashMap, VecDeque};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::config::ConnectionConfig;
use crate::traits::{ByteStream, Headers, HttpClient, HttpError, Response, SessionFactory};

/// A recorded HTTP request for verification in tests.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method (GET, POST, PUT or DELETE)
    pub method: String,
    /// Request URL
    pub url: String,
    /// Request headers
    pub headers: Headers,
    /// Request body (for POST and PUT requests)
    pub body: Option<String>,
}

/// Configuration for a mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return a successful response
    Success(Response),
    /// Return an error
    Error(HttpError),
    /// Return a stream of bytes that ends after the last chunk
    Stream(Vec<Bytes>),
    /// Return the chunks and then keep the stream open
    OpenStream(Vec<Bytes>),
}

impl MockResponse {
    /// Shorthand for a response with a status and text body.
    pub fn status(status: u16, body: &str) -> Self {
        MockResponse::Success(Response::new(status, Bytes::from(body.to_string())))
    }

    /// Held-open event stream made of SSE `data:` frames.
    pub fn events<I, S>(frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        MockResponse::OpenStream(
            frames
                .into_iter()
                .map(|data| Bytes::from(format!("event: message\ndata: {}\n\n", data.as_ref())))
                .collect(),
        )
    }
}

/// Decrements the active stream count when the stream is dropped.
struct TrackedStream {
    inner: ByteStream,
    active: Arc<AtomicUsize>,
}

impl Stream for TrackedStream {
    type Item = Result<Bytes, HttpError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl Drop for TrackedStream {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock HTTP client for testing.
///
/// Responses are looked up by URL: queued one-shot responses first, then
/// sticky responses, exact match before the longest matching prefix, then
/// the default response.
///
/// # Example
///
/// ```ignore
/// use rulebridge::adapters::mock::{MockHttpClient, MockResponse};
/// use rulebridge::traits::{HttpClient, Headers};
///
/// let client = MockHttpClient::new();
/// client.set_response("http://oh:8080/rest/uuid", MockResponse::status(200, "abc"));
/// client.push_response("http://oh:8080/rest/uuid", MockResponse::status(503, ""));
///
/// // first call gets the queued 503, later calls the sticky 200
/// let response = client.get("http://oh:8080/rest/uuid", &Headers::new()).await?;
/// assert_eq!(response.status, 503);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockHttpClient {
    /// Sticky responses by URL pattern
    responses: Arc<Mutex<HashMap<String, MockResponse>>>,
    /// One-shot responses by URL pattern, consumed in order
    queued: Arc<Mutex<HashMap<String, VecDeque<MockResponse>>>>,
    /// Default response when no specific match
    default_response: Arc<Mutex<Option<MockResponse>>>,
    /// Recorded requests for verification
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    /// Streams handed out and not yet dropped
    active_streams: Arc<AtomicUsize>,
}

impl MockHttpClient {
    /// Create a new mock HTTP client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a response for URLs starting with `url`.
    pub fn set_response(&self, url: &str, response: MockResponse) {
        lock(&self.responses).insert(url.to_string(), response);
    }

    /// Queue a response used once before the sticky one.
    pub fn push_response(&self, url: &str, response: MockResponse) {
        lock(&self.queued)
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    /// Set a default response for URLs without specific matches.
    pub fn set_default_response(&self, response: MockResponse) {
        *lock(&self.default_response) = Some(response);
    }

    /// Get all recorded requests.
    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }

    /// Recorded requests with the given method.
    pub fn requests_with_method(&self, method: &str) -> Vec<RecordedRequest> {
        lock(&self.requests)
            .iter()
            .filter(|r| r.method == method)
            .cloned()
            .collect()
    }

    /// Clear all recorded requests.
    pub fn clear_requests(&self) {
        lock(&self.requests).clear();
    }

    /// Clear all configured responses.
    pub fn clear_responses(&self) {
        lock(&self.responses).clear();
        lock(&self.queued).clear();
    }

    /// Streams returned by `get_stream` that are still alive.
    pub fn active_streams(&self) -> usize {
        self.active_streams.load(Ordering::SeqCst)
    }

    /// Record a request.
    fn record_request(&self, method: &str, url: &str, headers: &Headers, body: Option<String>) {
        lock(&self.requests).push(RecordedRequest {
            method: method.to_string(),
            url: url.to_string(),
            headers: headers.clone(),
            body,
        });
    }

    /// Best key for `url`: exact match, else the longest prefix.
    fn best_key<'a>(keys: impl Iterator<Item = &'a String>, url: &str) -> Option<String> {
        keys.filter(|pattern| url.starts_with(pattern.as_str()))
            .max_by_key(|pattern| pattern.len())
            .cloned()
    }

    /// Get the response for a URL.
    fn get_response(&self, url: &str) -> Option<MockResponse> {
        {
            let mut queued = lock(&self.queued);
            let nonempty = queued.iter().filter(|(_, q)| !q.is_empty()).map(|(k, _)| k);
            if let Some(key) = Self::best_key(nonempty, url) {
                if let Some(response) = queued.get_mut(&key).and_then(VecDeque::pop_front) {
                    return Some(response);
                }
            }
        }

        let responses = lock(&self.responses);
        if let Some(key) = Self::best_key(responses.keys(), url) {
            return responses.get(&key).cloned();
        }
        drop(responses);

        lock(&self.default_response).clone()
    }

    fn respond(&self, url: &str) -> Result<Response, HttpError> {
        match self.get_response(url) {
            Some(MockResponse::Success(response)) => Ok(response),
            Some(MockResponse::Error(err)) => Err(err),
            Some(MockResponse::Stream(_)) | Some(MockResponse::OpenStream(_)) => Err(HttpError::Other(
                "Stream response on non-stream request".to_string(),
            )),
            None => Err(HttpError::Other(format!("No mock response for URL: {}", url))),
        }
    }

    fn track(&self, inner: ByteStream) -> ByteStream {
        self.active_streams.fetch_add(1, Ordering::SeqCst);
        Box::pin(TrackedStream {
            inner,
            active: self.active_streams.clone(),
        })
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.record_request("GET", url, headers, None);
        self.respond(url)
    }

    async fn post(&self, url: &str, body: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.record_request("POST", url, headers, Some(body.to_string()));
        self.respond(url)
    }

    async fn put(&self, url: &str, body: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.record_request("PUT", url, headers, Some(body.to_string()));
        self.respond(url)
    }

    async fn delete(&self, url: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.record_request("DELETE", url, headers, None);
        self.respond(url)
    }

    async fn get_stream(&self, url: &str, headers: &Headers) -> Result<ByteStream, HttpError> {
        self.record_request("GET", url, headers, None);

        match self.get_response(url) {
            Some(MockResponse::Stream(chunks)) => {
                let stream = futures::stream::iter(chunks.into_iter().map(Ok));
                Ok(self.track(Box::pin(stream)))
            }
            Some(MockResponse::OpenStream(chunks)) => {
                use futures::StreamExt;
                let stream = futures::stream::iter(chunks.into_iter().map(Ok))
                    .chain(futures::stream::pending());
                Ok(self.track(Box::pin(stream)))
            }
            Some(MockResponse::Success(response)) if !response.is_success() => {
                Err(HttpError::ServerError {
                    status: response.status,
                    message: response.text().unwrap_or_default(),
                })
            }
            Some(MockResponse::Success(_)) => Err(HttpError::Other(
                "Non-stream response on stream request".to_string(),
            )),
            Some(MockResponse::Error(err)) => Err(err),
            None => Err(HttpError::Other(format!("No mock response for URL: {}", url))),
        }
    }
}

/// Session factory handing out one shared [`MockHttpClient`].
#[derive(Debug, Clone, Default)]
pub struct MockSessionFactory {
    client: MockHttpClient,
    opened: Arc<AtomicUsize>,
}

impl MockSessionFactory {
    pub fn new(client: MockHttpClient) -> Self {
        Self {
            client,
            opened: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn client(&self) -> &MockHttpClient {
        &self.client
    }

    /// Number of sessions opened so far.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl SessionFactory for MockSessionFactory {
    fn open(&self, _config: &ConnectionConfig) -> Result<Arc<dyn HttpClient>, HttpError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(self.client.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn test_get_with_response() {
        let client = MockHttpClient::new();
        client.set_response(
            "https://example.com/test",
            MockResponse::Success(Response::new(200, Bytes::from("Hello"))),
        );

        let response = client
            .get("https://example.com/test", &Headers::new())
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, Bytes::from("Hello"));

        let requests = client.get_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].url, "https://example.com/test");
    }

    #[tokio::test]
    async fn test_queued_response_used_once() {
        let client = MockHttpClient::new();
        client.set_response("http://oh/rest/uuid", MockResponse::status(200, "abc"));
        client.push_response("http://oh/rest/uuid", MockResponse::status(503, ""));

        let first = client.get("http://oh/rest/uuid", &Headers::new()).await.unwrap();
        let second = client.get("http://oh/rest/uuid", &Headers::new()).await.unwrap();
        assert_eq!(first.status, 503);
        assert_eq!(second.status, 200);
    }

    #[tokio::test]
    async fn test_longest_prefix_wins() {
        let client = MockHttpClient::new();
        client.set_response("http://oh/rest/", MockResponse::status(200, "root"));
        client.set_response("http://oh/rest/uuid", MockResponse::status(200, "uuid"));

        let response = client.get("http://oh/rest/uuid", &Headers::new()).await.unwrap();
        assert_eq!(response.text().unwrap(), "uuid");
        let response = client.get("http://oh/rest/", &Headers::new()).await.unwrap();
        assert_eq!(response.text().unwrap(), "root");
    }

    #[tokio::test]
    async fn test_put_and_delete_recorded() {
        let client = MockHttpClient::new();
        client.set_default_response(MockResponse::status(202, ""));

        client
            .put("http://oh/rest/items/A/state", "ON", &Headers::new())
            .await
            .unwrap();
        client.delete("http://oh/rest/items/A", &Headers::new()).await.unwrap();

        let puts = client.requests_with_method("PUT");
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].body.as_deref(), Some("ON"));
        assert_eq!(client.requests_with_method("DELETE").len(), 1);
    }

    #[tokio::test]
    async fn test_stream_ends_after_chunks() {
        let client = MockHttpClient::new();
        client.set_response(
            "http://oh/rest/events",
            MockResponse::Stream(vec![Bytes::from("chunk1"), Bytes::from("chunk2")]),
        );

        let stream = client
            .get_stream("http://oh/rest/events?topics=x", &Headers::new())
            .await
            .unwrap();
        assert_eq!(client.active_streams(), 1);
        let chunks: Vec<_> = stream.collect().await;
        assert_eq!(chunks.len(), 2);
        assert_eq!(client.active_streams(), 0);
    }

    #[tokio::test]
    async fn test_open_stream_stays_open_until_dropped() {
        let client = MockHttpClient::new();
        client.set_response("http://oh/rest/events", MockResponse::events(["{}"]));

        let mut stream = client
            .get_stream("http://oh/rest/events", &Headers::new())
            .await
            .unwrap();
        assert!(stream.next().await.is_some());
        let next = tokio::time::timeout(std::time::Duration::from_millis(20), stream.next()).await;
        assert!(next.is_err());

        drop(stream);
        assert_eq!(client.active_streams(), 0);
    }

    #[tokio::test]
    async fn test_stream_error_status() {
        let client = MockHttpClient::new();
        client.set_response("http://oh/rest/events", MockResponse::status(503, "busy"));
        let result = client.get_stream("http://oh/rest/events", &Headers::new()).await;
        assert!(matches!(result, Err(HttpError::ServerError { status: 503, .. })));
    }

    #[tokio::test]
    async fn test_no_response_configured() {
        let client = MockHttpClient::new();
        let result = client
            .get("https://example.com/missing", &Headers::new())
            .await;
        assert!(matches!(result, Err(HttpError::Other(_))));
    }

    #[test]
    fn test_session_factory_counts_opens() {
        let factory = MockSessionFactory::new(MockHttpClient::new());
        factory
            .open(&ConnectionConfig::with_url("http://oh"))
            .unwrap();
        assert_eq!(factory.opened(), 1);
    }
}
