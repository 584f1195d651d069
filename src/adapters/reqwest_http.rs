//! Reqwest-based HTTP client adapter.
//!
//! This module provides the production transport, implementing the
//! [`HttpClient`] trait from `crate::traits`, and the [`SessionFactory`] that
//! builds it from a [`ConnectionConfig`].

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use tracing::info;

use crate::config::ConnectionConfig;
use crate::traits::{ByteStream, Headers, HttpClient, HttpError, Response, SessionFactory};

/// HTTP client implementation using reqwest.
///
/// No overall request timeout is set: the event stream is a request that is
/// meant to stay open indefinitely.
///
/// # Example
///
/// ```ignore
/// use rulebridge::adapters::ReqwestHttpClient;
/// use rulebridge::config::ConnectionConfig;
/// use rulebridge::traits::{Headers, HttpClient};
///
/// let client = ReqwestHttpClient::from_config(&ConnectionConfig::with_url("http://openhab:8080"))?;
/// let response = client.get("http://openhab:8080/rest/uuid", &Headers::new()).await?;
/// println!("Status: {}", response.status);
/// ```
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
    auth: Option<(String, String)>,
}

impl ReqwestHttpClient {
    /// Create a new ReqwestHttpClient with default settings.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            auth: None,
        }
    }

    /// Create a new ReqwestHttpClient with a custom reqwest::Client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client, auth: None }
    }

    /// Build a client for a peer connection.
    ///
    /// Credentials become basic auth on every request. With `verify_ssl`
    /// off, certificate validation is disabled.
    pub fn from_config(config: &ConnectionConfig) -> Result<Self, HttpError> {
        let mut builder = reqwest::Client::builder();
        if !config.verify_ssl {
            info!("Verification of SSL certificates is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder.build().map_err(Self::convert_error)?;

        let auth = config
            .has_credentials()
            .then(|| (config.user.clone(), config.password.clone()));
        Ok(Self { client, auth })
    }

    /// Get a reference to the underlying reqwest::Client.
    pub fn inner(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn has_auth(&self) -> bool {
        self.auth.is_some()
    }

    /// Convert reqwest error to HttpError.
    fn convert_error(err: reqwest::Error) -> HttpError {
        if err.is_timeout() {
            HttpError::Timeout(err.to_string())
        } else if err.is_builder() {
            HttpError::InvalidUrl(err.to_string())
        } else if err.is_connect() || err.is_request() {
            HttpError::ConnectionFailed(err.to_string())
        } else if err.is_body() || err.is_decode() {
            HttpError::Io(err.to_string())
        } else {
            HttpError::Other(err.to_string())
        }
    }

    /// Convert reqwest headers to our Headers type.
    fn convert_headers(headers: &reqwest::header::HeaderMap) -> Headers {
        headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect()
    }

    /// Apply auth and headers to a request builder.
    fn prepare(&self, builder: reqwest::RequestBuilder, headers: &Headers) -> reqwest::RequestBuilder {
        let mut builder = builder;
        if let Some((user, password)) = &self.auth {
            builder = builder.basic_auth(user, Some(password));
        }
        for (key, value) in headers {
            builder = builder.header(key, value);
        }
        builder
    }

    async fn execute(&self, builder: reqwest::RequestBuilder) -> Result<Response, HttpError> {
        let response = builder.send().await.map_err(Self::convert_error)?;

        let status = response.status().as_u16();
        let response_headers = Self::convert_headers(response.headers());
        let body = response.bytes().await.map_err(Self::convert_error)?;

        Ok(Response::with_headers(status, response_headers, body))
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.execute(self.prepare(self.client.get(url), headers)).await
    }

    async fn post(&self, url: &str, body: &str, headers: &Headers) -> Result<Response, HttpError> {
        let builder = self.client.post(url).body(body.to_string());
        self.execute(self.prepare(builder, headers)).await
    }

    async fn put(&self, url: &str, body: &str, headers: &Headers) -> Result<Response, HttpError> {
        let builder = self.client.put(url).body(body.to_string());
        self.execute(self.prepare(builder, headers)).await
    }

    async fn delete(&self, url: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.execute(self.prepare(self.client.delete(url), headers)).await
    }

    async fn get_stream(&self, url: &str, headers: &Headers) -> Result<ByteStream, HttpError> {
        let builder = self.prepare(self.client.get(url), headers);
        let response = builder.send().await.map_err(Self::convert_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(HttpError::ServerError { status, message });
        }

        let stream = response.bytes_stream().map(|result| {
            result.map_err(|e| {
                if e.is_timeout() {
                    HttpError::Timeout(e.to_string())
                } else {
                    HttpError::Io(e.to_string())
                }
            })
        });

        Ok(Box::pin(stream))
    }
}

/// Opens a [`ReqwestHttpClient`] per configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReqwestSessionFactory;

impl SessionFactory for ReqwestSessionFactory {
    fn open(&self, config: &ConnectionConfig) -> Result<Arc<dyn HttpClient>, HttpError> {
        Ok(Arc::new(ReqwestHttpClient::from_config(config)?))
    }
}
