//! Outward request interface to the peer.
//!
//! [`PeerClient`] is what rules, plugins and the handshake use to talk to the
//! peer. It never changes connection state itself: when a result shows the
//! peer is gone it asks the supervisor to go offline and reports the error to
//! its own caller.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use super::outcome::{classify_http_error, classify_status, TransportOutcome};
use super::state::ConnectionStatus;
use super::supervisor::Command;
use crate::error::{ConnectionError, ConnectionResult};
use crate::traits::{Headers, HttpClient, HttpError, Response};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    /// Mutating requests are suppressed while read-only or offline.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Method::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Text(String),
    Json(Value),
}

impl RequestBody {
    fn content_type(&self) -> &'static str {
        match self {
            RequestBody::Text(_) => "text/plain",
            RequestBody::Json(_) => "application/json",
        }
    }

    fn render(&self) -> String {
        match self {
            RequestBody::Text(text) => text.clone(),
            RequestBody::Json(value) => value.to_string(),
        }
    }
}

/// Per-request options.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    /// Log a warning for a 404 response. Other statuses >= 300 are always
    /// logged.
    pub log_missing: bool,
    /// Treat any status >= 400 as a sign the peer is not usable and take the
    /// connection offline.
    pub expect_success: bool,
    pub query: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            log_missing: true,
            expect_success: false,
            query: Vec::new(),
            body: None,
        }
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quiet_missing(mut self) -> Self {
        self.log_missing = false;
        self
    }

    pub fn expect_success(mut self, expect_success: bool) -> Self {
        self.expect_success = expect_success;
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Text(body.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }
}

/// Transport plus base URL of the current connection.
#[derive(Clone)]
pub(crate) struct Session {
    pub(crate) client: Arc<dyn HttpClient>,
    pub(crate) base_url: String,
}

impl Session {
    pub(crate) fn url(&self, path: &str, query: &[(String, String)]) -> String {
        let mut url = format!("{}{}", self.base_url, path);
        if !query.is_empty() {
            let pairs: Vec<String> = query
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect();
            url.push(if path.contains('?') { '&' } else { '?' });
            url.push_str(&pairs.join("&"));
        }
        url
    }
}

/// State shared between the supervisor and every client handle.
///
/// Only the supervisor writes the session slot.
pub(crate) struct Shared {
    session: RwLock<Option<Session>>,
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<ConnectionStatus>,
    handle: Handle,
    closed: AtomicBool,
}

impl Shared {
    pub(crate) fn new(
        commands: mpsc::UnboundedSender<Command>,
        status: watch::Receiver<ConnectionStatus>,
        handle: Handle,
    ) -> Self {
        Self {
            session: RwLock::new(None),
            commands,
            status,
            handle,
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn session(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_session(&self, session: Option<Session>) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session;
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub(crate) fn send(&self, command: Command) -> bool {
        self.commands.send(command).is_ok()
    }

    pub(crate) fn status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }
}

/// Handle for outward requests. Cheap to clone and usable from any task.
#[derive(Clone)]
pub struct PeerClient {
    shared: Arc<Shared>,
}

impl PeerClient {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.shared.status()
    }

    pub fn status_receiver(&self) -> watch::Receiver<ConnectionStatus> {
        self.shared.status.clone()
    }

    pub fn is_online(&self) -> bool {
        self.shared.status.borrow().is_online()
    }

    pub async fn get(&self, path: &str, options: RequestOptions) -> ConnectionResult<Response> {
        let (session, status) = self.prepare()?;
        self.send(&session, &status, Method::Get, path, options).await
    }

    /// `Ok(None)` when suppressed by read-only mode or while offline.
    pub async fn post(&self, path: &str, options: RequestOptions) -> ConnectionResult<Option<Response>> {
        self.mutate(Method::Post, path, options).await
    }

    pub async fn put(&self, path: &str, options: RequestOptions) -> ConnectionResult<Option<Response>> {
        self.mutate(Method::Put, path, options).await
    }

    pub async fn delete(&self, path: &str, options: RequestOptions) -> ConnectionResult<Option<Response>> {
        self.mutate(Method::Delete, path, options).await
    }

    /// Set the state of `item` without sending a command to its binding.
    pub async fn post_update(&self, item: &str, state: &str) -> ConnectionResult<Option<Response>> {
        let path = format!("/rest/items/{}/state", urlencoding::encode(item));
        self.put(&path, RequestOptions::new().text(state)).await
    }

    /// Send `command` to `item`.
    pub async fn send_command(&self, item: &str, command: &str) -> ConnectionResult<Option<Response>> {
        let path = format!("/rest/items/{}", urlencoding::encode(item));
        self.post(&path, RequestOptions::new().text(command)).await
    }

    /// Blocking view for use inside sync callbacks.
    pub fn blocking(&self) -> BlockingPeerClient {
        BlockingPeerClient {
            client: self.clone(),
        }
    }

    /// Ask the supervisor to go offline if `epoch` is still current.
    fn go_offline(&self, epoch: u64, reason: String) {
        self.shared.send(Command::SetOffline {
            epoch: Some(epoch),
            reason,
        });
    }

    fn prepare(&self) -> ConnectionResult<(Session, ConnectionStatus)> {
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(ConnectionError::Shutdown);
        }
        let session = self.shared.session().ok_or(ConnectionError::NotConfigured)?;
        Ok((session, self.status()))
    }

    async fn mutate(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> ConnectionResult<Option<Response>> {
        let (session, status) = self.prepare()?;
        if !status.accepts_writes() {
            debug!(
                "Suppressed {} {} ({})",
                method,
                path,
                if status.read_only { "read only" } else { "offline" }
            );
            return Ok(None);
        }
        self.send(&session, &status, method, path, options)
            .await
            .map(Some)
    }

    async fn send(
        &self,
        session: &Session,
        status: &ConnectionStatus,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> ConnectionResult<Response> {
        let url = session.url(path, &options.query);
        let mut headers = Headers::new();
        let body = match &options.body {
            Some(body) => {
                headers.insert("Content-Type".to_string(), body.content_type().to_string());
                body.render()
            }
            None => String::new(),
        };

        let result = match method {
            Method::Get => session.client.get(&url, &headers).await,
            Method::Post => session.client.post(&url, &body, &headers).await,
            Method::Put => session.client.put(&url, &body, &headers).await,
            Method::Delete => session.client.delete(&url, &headers).await,
        };

        let response = match result {
            Ok(response) => response,
            Err(err) => return Err(self.transport_failure(method, path, status.epoch, err)),
        };

        match classify_status(response.status, options.expect_success) {
            TransportOutcome::ServerNotReady => {
                self.go_offline(
                    status.epoch,
                    format!("status {} for {} {}", response.status, method, path),
                );
                Err(ConnectionError::NotReady {
                    method: method.as_str(),
                    path: path.to_string(),
                    status: response.status,
                })
            }
            TransportOutcome::ExpectedSuccessViolation => {
                self.go_offline(
                    status.epoch,
                    format!("status {} for {} {}", response.status, method, path),
                );
                Err(ConnectionError::ExpectedSuccess {
                    method: method.as_str(),
                    path: path.to_string(),
                    status: response.status,
                })
            }
            TransportOutcome::Disconnect | TransportOutcome::Other => {
                if response.status >= 300 && (response.status != 404 || options.log_missing) {
                    warn!("Status {} for {} {}", response.status, method, path);
                    if let Ok(text) = response.text() {
                        if !text.is_empty() {
                            debug!("{}", text);
                        }
                    }
                }
                Ok(response)
            }
        }
    }

    fn transport_failure(&self, method: Method, path: &str, epoch: u64, err: HttpError) -> ConnectionError {
        match classify_http_error(&err) {
            TransportOutcome::Disconnect => {
                self.go_offline(epoch, err.to_string());
                ConnectionError::Disconnected(err.to_string())
            }
            TransportOutcome::ServerNotReady => {
                self.go_offline(epoch, err.to_string());
                let status = match err {
                    HttpError::ServerError { status, .. } => status,
                    _ => 500,
                };
                ConnectionError::NotReady {
                    method: method.as_str(),
                    path: path.to_string(),
                    status,
                }
            }
            TransportOutcome::ExpectedSuccessViolation | TransportOutcome::Other => {
                ConnectionError::Transport(err)
            }
        }
    }
}

/// Blocking wrapper around [`PeerClient`].
///
/// Must not be used from inside an async task; sync callbacks run on
/// blocking workers where it is safe.
#[derive(Clone)]
pub struct BlockingPeerClient {
    client: PeerClient,
}

impl BlockingPeerClient {
    fn block_on<F: Future>(&self, fut: F) -> F::Output {
        self.client.shared.handle.block_on(fut)
    }

    pub fn get(&self, path: &str, options: RequestOptions) -> ConnectionResult<Response> {
        self.block_on(self.client.get(path, options))
    }

    pub fn post(&self, path: &str, options: RequestOptions) -> ConnectionResult<Option<Response>> {
        self.block_on(self.client.post(path, options))
    }

    pub fn put(&self, path: &str, options: RequestOptions) -> ConnectionResult<Option<Response>> {
        self.block_on(self.client.put(path, options))
    }

    pub fn delete(&self, path: &str, options: RequestOptions) -> ConnectionResult<Option<Response>> {
        self.block_on(self.client.delete(path, options))
    }

    pub fn post_update(&self, item: &str, state: &str) -> ConnectionResult<Option<Response>> {
        self.block_on(self.client.post_update(item, state))
    }

    pub fn send_command(&self, item: &str, command: &str) -> ConnectionResult<Option<Response>> {
        self.block_on(self.client.send_command(item, command))
    }

    pub fn status(&self) -> ConnectionStatus {
        self.client.status()
    }
}
