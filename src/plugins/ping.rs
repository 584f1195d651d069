//! Periodic round-trip measurement through a peer item.
//!
//! While connected, the plugin writes the last measured round trip to the
//! ping item and listens for the state event that echoes it back. The time
//! between the write and the echo is the next measurement.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::PingConfig;
use crate::connection::PeerClient;
use crate::error::ConnectionError;
use crate::events::{Event, EventKind};
use crate::executor::WrappedCallback;
use crate::traits::{ConnectionPlugin, PluginContext};

const START_DELAY: Duration = Duration::from_secs(3);

#[derive(Default)]
struct PingState {
    sent_at: Option<Instant>,
    sent_value: Option<String>,
    last_rtt_ms: Option<f64>,
    task: Option<JoinHandle<()>>,
}

impl PingState {
    fn sent(&mut self, value: String) {
        self.sent_at = Some(Instant::now());
        self.sent_value = Some(value);
    }

    /// Take a state update of the ping item as the echo of the last ping.
    ///
    /// Only the value that was posted counts; a missing value stands for
    /// `NULL`. Returns whether a round trip was measured.
    fn echo(&mut self, value: Option<&str>) -> bool {
        if self.sent_value.as_deref() != Some(value.unwrap_or("NULL")) {
            return false;
        }
        self.sent_value = None;
        match self.sent_at.take() {
            Some(sent_at) => {
                self.last_rtt_ms = Some(sent_at.elapsed().as_secs_f64() * 1000.0);
                true
            }
            None => false,
        }
    }
}

pub struct PingPlugin {
    config: PingConfig,
    start_delay: Duration,
    state: Arc<Mutex<PingState>>,
}

impl PingPlugin {
    pub fn new(config: PingConfig) -> Self {
        Self {
            config,
            start_delay: START_DELAY,
            state: Arc::new(Mutex::new(PingState::default())),
        }
    }

    /// Delay between connecting and the first ping.
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    /// Last measured round trip in milliseconds.
    pub fn last_rtt_ms(&self) -> Option<f64> {
        lock(&self.state).last_rtt_ms
    }

    pub fn is_running(&self) -> bool {
        lock(&self.state)
            .task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    fn stop(&self) {
        let mut state = lock(&self.state);
        if let Some(task) = state.task.take() {
            task.abort();
        }
        state.sent_at = None;
        state.sent_value = None;
    }
}

fn lock(state: &Mutex<PingState>) -> std::sync::MutexGuard<'_, PingState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Wire value of a measurement: milliseconds with one decimal.
fn format_rtt(rtt_ms: Option<f64>) -> String {
    match rtt_ms {
        Some(ms) => format!("{:.1}", ms),
        None => "NULL".to_string(),
    }
}

async fn ping_loop(
    client: PeerClient,
    item: String,
    interval: Duration,
    start_delay: Duration,
    state: Arc<Mutex<PingState>>,
) {
    tokio::time::sleep(start_delay).await;
    loop {
        let value = {
            let mut state = lock(&state);
            let value = format_rtt(state.last_rtt_ms);
            state.sent(value.clone());
            value
        };
        match client.post_update(&item, &value).await {
            Ok(_) => {}
            Err(e @ ConnectionError::Disconnected(_)) | Err(e @ ConnectionError::Shutdown) => {
                debug!("Ping stopped: {}", e);
                return;
            }
            Err(e) => error!("Ping to {} failed: {}", item, e),
        }
        tokio::time::sleep(interval).await;
    }
}

impl ConnectionPlugin for PingPlugin {
    fn name(&self) -> &str {
        "ping"
    }

    fn setup(&self, ctx: &PluginContext) -> color_eyre::Result<()> {
        if !self.config.enabled {
            return Ok(());
        }
        let state = self.state.clone();
        let callback = WrappedCallback::from_async("PingPlugin.ping_received", move |event: Event| {
            let state = state.clone();
            async move {
                if let Event::ItemState { value, .. } = event {
                    if !lock(&state).echo(value.as_deref()) {
                        debug!("Ignoring ping item update {:?}", value);
                    }
                }
                Ok(())
            }
        });
        ctx.bus.add_listener(
            format!("items/{}", self.config.item),
            callback,
            EventKind::ItemState,
        );
        Ok(())
    }

    fn on_connect(&self, ctx: &PluginContext) -> color_eyre::Result<()> {
        if !self.config.enabled {
            return Ok(());
        }
        self.stop();
        info!(
            "Pinging {} every {}s",
            self.config.item, self.config.interval_secs
        );
        let task = tokio::spawn(ping_loop(
            ctx.client.clone(),
            self.config.item.clone(),
            Duration::from_secs(self.config.interval_secs.max(1)),
            self.start_delay,
            self.state.clone(),
        ));
        lock(&self.state).task = Some(task);
        Ok(())
    }

    fn on_disconnect(&self) -> color_eyre::Result<()> {
        self.stop();
        Ok(())
    }
}
