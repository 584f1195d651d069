//! Mock implementations for test fixtures.
//!
//! This module re-exports the mock implementations from
//! `rulebridge::adapters::mock` and adds a scripted peer and a plugin that
//! counts its notifications.

pub use rulebridge::adapters::mock::{MockHttpClient, MockResponse, MockSessionFactory};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;

use rulebridge::traits::{ConnectionPlugin, PluginContext};

use super::BASE_URL;

/// A peer scripted on a [`MockHttpClient`].
pub struct MockPeer {
    pub client: MockHttpClient,
}

impl MockPeer {
    /// Peer that passes the handshake and streams `frames`, then keeps the
    /// stream open.
    pub fn online(frames: &[String]) -> Self {
        let client = MockHttpClient::new();
        client.set_response(&url("/rest/uuid"), MockResponse::status(200, "0d3c5a8e"));
        client.set_response(
            &url("/rest/"),
            MockResponse::status(
                200,
                &json!({
                    "version": "8",
                    "runtimeInfo": {"version": "4.1.0", "buildString": "Release Build"},
                })
                .to_string(),
            ),
        );
        client.set_response(&url("/rest/items"), MockResponse::status(202, ""));
        client.set_response(&url("/rest/events"), MockResponse::events(frames));
        Self { client }
    }

    /// Peer without a root document.
    pub fn legacy(frames: &[String]) -> Self {
        let peer = Self::online(frames);
        peer.client
            .set_response(&url("/rest/"), MockResponse::status(404, ""));
        peer
    }

    pub fn factory(&self) -> MockSessionFactory {
        MockSessionFactory::new(self.client.clone())
    }

    /// Number of GET requests to `path`.
    pub fn gets(&self, path: &str) -> usize {
        let target = url(path);
        self.client
            .requests_with_method("GET")
            .iter()
            .filter(|r| r.url == target)
            .count()
    }

    /// Number of times the event stream was requested.
    pub fn stream_opens(&self) -> usize {
        let target = url("/rest/events?");
        self.client
            .requests_with_method("GET")
            .iter()
            .filter(|r| r.url.starts_with(&target))
            .count()
    }
}

/// Absolute URL of `path` on the test peer.
pub fn url(path: &str) -> String {
    format!("{}{}", BASE_URL, path)
}

/// Plugin that counts its hook calls.
#[derive(Clone, Default)]
pub struct CountingPlugin {
    pub setups: Arc<AtomicUsize>,
    pub connects: Arc<AtomicUsize>,
    pub disconnects: Arc<AtomicUsize>,
}

impl CountingPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

impl ConnectionPlugin for CountingPlugin {
    fn name(&self) -> &str {
        "counting"
    }

    fn setup(&self, _ctx: &PluginContext) -> color_eyre::Result<()> {
        self.setups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_connect(&self, _ctx: &PluginContext) -> color_eyre::Result<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_disconnect(&self) -> color_eyre::Result<()> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
