//! Common test utilities for integration tests.
//!
//! Fixtures for a scripted peer, fast-retry configuration and helpers that
//! wait on connection state or on events reaching a listener.
//!
//! # Example
//!
//! ```ignore
//! let peer = MockPeer::online(&[item_state_frame("Light", "ON")]);
//! let runtime = Runtime::builder(test_config(BASE_URL))
//!     .session_factory(peer.factory())
//!     .start();
//! wait_for_state(&mut runtime.status(), ConnectionState::Online).await;
//! ```

#![allow(dead_code)]

pub mod mocks;

pub use mocks::*;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tokio::sync::watch;

use rulebridge::config::Config;
use rulebridge::connection::{ConnectionState, ConnectionStatus};
use rulebridge::events::Event;
use rulebridge::executor::WrappedCallback;

pub const BASE_URL: &str = "http://openhab.test:8080";

/// Upper bound for anything a test waits on.
pub const WAIT: Duration = Duration::from_secs(5);

/// Config pointing at `url` with fast retries and the ping plugin off.
pub fn test_config(url: &str) -> Config {
    let mut config = Config::default();
    config.connection.url = url.to_string();
    config.connection.min_backoff_ms = 10;
    config.connection.max_backoff_ms = 80;
    config.executor.worker_threads = 4;
    config.ping.enabled = false;
    config
}

/// SSE data of an item state event on the current topic layout.
pub fn item_state_frame(name: &str, value: &str) -> String {
    json!({
        "topic": format!("openhab/items/{}/state", name),
        "payload": json!({"type": "String", "value": value}).to_string(),
        "type": "ItemStateEvent",
    })
    .to_string()
}

/// SSE data of an item state changed event on the current topic layout.
pub fn item_state_changed_frame(name: &str, value: &str, old_value: &str) -> String {
    json!({
        "topic": format!("openhab/items/{}/statechanged", name),
        "payload": json!({
            "type": "String",
            "value": value,
            "oldType": "String",
            "oldValue": old_value,
        })
        .to_string(),
        "type": "ItemStateChangedEvent",
    })
    .to_string()
}

/// Wait until the status reaches `state`.
pub async fn wait_for_state(
    rx: &mut watch::Receiver<ConnectionStatus>,
    state: ConnectionState,
) -> ConnectionStatus {
    let outcome = tokio::time::timeout(WAIT, rx.wait_for(|status| status.state == state))
        .await
        .map(|result| result.map(|status| status.clone()));
    match outcome {
        Ok(Ok(status)) => status,
        Ok(Err(_)) => panic!("status channel closed while waiting for {}", state),
        Err(_) => panic!(
            "timed out waiting for {}, last status {:?}",
            state,
            *rx.borrow()
        ),
    }
}

/// Poll `condition` until it holds or [`WAIT`] runs out.
pub async fn eventually<F>(what: &str, mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + WAIT;
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Collects the events delivered to its callbacks.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sync callback that records every event it sees.
    pub fn callback(&self, name: &str) -> WrappedCallback {
        let events = self.events.clone();
        WrappedCallback::sync(name, move |event: &Event| {
            events.lock().unwrap().push(event.clone());
            Ok(())
        })
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    /// Wait until at least `count` events were recorded.
    pub async fn wait_for(&self, count: usize) -> Vec<Event> {
        eventually(&format!("{} events", count), || self.len() >= count).await;
        self.events()
    }
}
