//! Connection supervisor.
//!
//! The supervisor is a single task that owns the connection state, the
//! backoff timer and the handles of the pending handshake and the running
//! event stream. Everything else talks to it through [`Command`]s: client
//! handles report failures, the handshake and stream tasks report their
//! results. Results that arrive for an abandoned attempt or session are
//! recognised by their epoch and dropped.
//!
//! ```text
//! Unconfigured --configure--> Connecting --handshake ok--> Online
//!                                 ^  |                       |
//!                                 |  +--retry after backoff  | disconnect, 5xx,
//!                                 |                          | stream ended
//!                                 +------- Offline <---------+
//! ```

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::backoff::BackoffTimer;
use super::client::{PeerClient, Session, Shared};
use super::handshake;
use super::state::{ConnectionState, ConnectionStatus, PeerInfo};
use super::stream::{self, StreamContext, StreamEnd};
use crate::bus::EventBus;
use crate::config::ConnectionConfig;
use crate::error::{cause_chain, ConnectionResult};
use crate::items::ItemRegistry;
use crate::traits::{ConnectionPlugin, EventParser, PluginContext, SessionFactory};

pub(crate) enum Command {
    Configure(ConnectionConfig),
    SetOffline {
        /// Epoch the reporter observed; `None` always applies.
        epoch: Option<u64>,
        reason: String,
    },
    Attempting {
        epoch: u64,
    },
    HandshakeDone {
        epoch: u64,
        result: ConnectionResult<PeerInfo>,
    },
    StreamEnded {
        epoch: u64,
        end: StreamEnd,
    },
    Shutdown(oneshot::Sender<()>),
}

/// Inputs for [`start`].
pub(crate) struct SupervisorParts {
    pub config: ConnectionConfig,
    pub read_only: bool,
    pub factory: Arc<dyn SessionFactory>,
    pub parser: Arc<dyn EventParser>,
    pub plugins: Vec<Arc<dyn ConnectionPlugin>>,
    pub bus: EventBus,
    pub items: ItemRegistry,
}

/// Control handle for the supervisor task.
#[derive(Clone)]
pub struct SupervisorHandle {
    shared: Arc<Shared>,
}

impl SupervisorHandle {
    /// Point the supervisor at a (new) endpoint. An empty URL unconfigures.
    pub fn configure(&self, config: ConnectionConfig) -> bool {
        self.shared.send(Command::Configure(config))
    }

    /// Take the connection offline and schedule a reconnect.
    ///
    /// Does nothing unless currently online.
    pub fn set_offline(&self, reason: impl Into<String>) -> bool {
        self.shared.send(Command::SetOffline {
            epoch: None,
            reason: reason.into(),
        })
    }

    pub fn status(&self) -> ConnectionStatus {
        self.shared.status()
    }

    /// Stop the supervisor. Resolves once it has cancelled its tasks and
    /// notified plugins.
    pub async fn shutdown(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.shared.send(Command::Shutdown(done_tx)) {
            let _ = done_rx.await;
        }
    }
}

struct Supervisor {
    config: ConnectionConfig,
    shared: Arc<Shared>,
    status: watch::Sender<ConnectionStatus>,
    commands: mpsc::UnboundedSender<Command>,
    factory: Arc<dyn SessionFactory>,
    parser: Arc<dyn EventParser>,
    plugins: Vec<Arc<dyn ConnectionPlugin>>,
    ctx: PluginContext,
    backoff: BackoffTimer,
    epoch: u64,
    handshake: Option<JoinHandle<()>>,
    stream: Option<JoinHandle<()>>,
}

/// Spawn the supervisor task.
///
/// Plugins are set up before the task starts; a plugin whose setup fails is
/// logged and left out.
pub(crate) fn start(parts: SupervisorParts) -> (SupervisorHandle, PluginContext, JoinHandle<()>) {
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let backoff = BackoffTimer::from_config(&parts.config);
    let (status_tx, status_rx) = watch::channel(ConnectionStatus {
        read_only: parts.read_only,
        backoff: backoff.current(),
        ..ConnectionStatus::default()
    });
    let shared = Arc::new(Shared::new(
        commands_tx.clone(),
        status_rx,
        tokio::runtime::Handle::current(),
    ));
    let ctx = PluginContext {
        bus: parts.bus,
        client: PeerClient::new(shared.clone()),
        items: parts.items,
    };

    let plugins: Vec<Arc<dyn ConnectionPlugin>> = parts
        .plugins
        .into_iter()
        .filter(|plugin| match plugin.setup(&ctx) {
            Ok(()) => {
                debug!("Plugin {} set up", plugin.name());
                true
            }
            Err(e) => {
                error!("Setup of plugin {} failed: {}", plugin.name(), e);
                false
            }
        })
        .collect();

    let initial = parts.config.clone();
    let supervisor = Supervisor {
        config: parts.config,
        shared: shared.clone(),
        status: status_tx,
        commands: commands_tx,
        factory: parts.factory,
        parser: parts.parser,
        plugins,
        ctx: ctx.clone(),
        backoff,
        epoch: 0,
        handshake: None,
        stream: None,
    };
    let join = tokio::spawn(supervisor.run(commands_rx));

    let handle = SupervisorHandle { shared };
    if initial.is_configured() {
        handle.configure(initial);
    } else {
        info!("No peer configured");
    }
    (handle, ctx, join)
}

impl Supervisor {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = commands.recv().await {
            match command {
                Command::Configure(config) => self.configure(config),
                Command::SetOffline { epoch, reason } => self.set_offline(epoch, &reason),
                Command::Attempting { epoch } => {
                    if epoch == self.epoch {
                        self.publish(ConnectionState::Connecting, None);
                    }
                }
                Command::HandshakeDone { epoch, result } => {
                    if epoch == self.epoch {
                        self.handshake = None;
                        self.handshake_done(result);
                    } else {
                        debug!("Dropping stale handshake result (epoch {})", epoch);
                    }
                }
                Command::StreamEnded { epoch, end } => {
                    if epoch == self.epoch && self.state() == ConnectionState::Online {
                        self.stream = None;
                        if end.is_disconnect() {
                            warn!("Event stream ended: {}", end);
                        } else {
                            log_failure("Event stream ended", &end);
                        }
                        self.go_offline();
                    }
                }
                Command::Shutdown(done) => {
                    self.stop();
                    let _ = done.send(());
                    break;
                }
            }
        }
        debug!("Supervisor stopped");
    }

    fn state(&self) -> ConnectionState {
        self.status.borrow().state
    }

    fn publish(&self, state: ConnectionState, peer: Option<Option<PeerInfo>>) {
        let epoch = self.epoch;
        let backoff = self.backoff.current();
        self.status.send_modify(|status| {
            status.state = state;
            status.epoch = epoch;
            status.backoff = backoff;
            if let Some(peer) = peer {
                status.layout = peer.as_ref().map(PeerInfo::layout).unwrap_or_default();
                status.peer = peer;
            }
        });
    }

    fn cancel_tasks(&mut self) {
        if let Some(task) = self.handshake.take() {
            task.abort();
        }
        if let Some(task) = self.stream.take() {
            task.abort();
        }
    }

    fn configure(&mut self, config: ConnectionConfig) {
        let was_online = self.state() == ConnectionState::Online;
        self.epoch += 1;
        self.cancel_tasks();
        if was_online {
            self.notify_disconnect();
        }

        if !config.is_configured() {
            self.shared.set_session(None);
            self.config = config;
            info!("Peer connection unconfigured");
            self.publish(ConnectionState::Unconfigured, Some(None));
            return;
        }

        let client = match self.factory.open(&config) {
            Ok(client) => client,
            Err(e) => {
                error!("Could not open session for {}: {}", config.base_url(), e);
                self.shared.set_session(None);
                self.publish(ConnectionState::Unconfigured, Some(None));
                return;
            }
        };
        self.shared.set_session(Some(Session {
            client,
            base_url: config.base_url().to_string(),
        }));
        info!("Connecting to {}", config.base_url());
        self.backoff = BackoffTimer::from_config(&config);
        self.config = config;
        self.publish(ConnectionState::Connecting, Some(None));
        self.schedule_attempt();
    }

    /// Start the next handshake attempt after the backoff delay.
    fn schedule_attempt(&mut self) {
        if let Some(task) = self.handshake.take() {
            task.abort();
        }
        let epoch = self.epoch;
        let delay = self.backoff.current();
        let sleep = self.backoff.wait();
        self.status.send_modify(|status| status.backoff = delay);

        let client = self.ctx.client.clone();
        let commands = self.commands.clone();
        let expect_success = self.config.expect_success_on_probe;
        debug!("Next connection attempt in {:?}", delay);
        self.handshake = Some(tokio::spawn(async move {
            sleep.await;
            if commands.send(Command::Attempting { epoch }).is_err() {
                return;
            }
            let result = handshake::probe(&client, expect_success).await;
            let _ = commands.send(Command::HandshakeDone { epoch, result });
        }));
    }

    fn handshake_done(&mut self, result: ConnectionResult<PeerInfo>) {
        let info = match result {
            Ok(info) => info,
            Err(e) if e.is_transient() => {
                info!("Peer not ready: {}", e);
                self.schedule_attempt();
                return;
            }
            Err(e) => {
                log_failure(&format!("Connection attempt failed [{}]", e.error_code()), &e);
                self.schedule_attempt();
                return;
            }
        };

        let session = match self.shared.session() {
            Some(session) => session,
            None => {
                warn!("Handshake finished without a session");
                return;
            }
        };

        self.backoff.reset();
        let version = info.version.clone().unwrap_or_else(|| "unknown".to_string());
        let build = info.build.clone().unwrap_or_default();
        if self.status.borrow().read_only {
            info!("Connected read only to peer version {} ({})", version, build);
        } else {
            info!("Connected to peer version {} ({})", version, build);
        }

        let layout = info.layout();
        self.publish(ConnectionState::Online, Some(Some(info)));

        let ctx = StreamContext {
            session,
            layout,
            buffer_size: self.config.buffer_size,
            parser: self.parser.clone(),
            bus: self.ctx.bus.clone(),
            items: self.ctx.items.clone(),
        };
        let epoch = self.epoch;
        let commands = self.commands.clone();
        self.stream = Some(tokio::spawn(async move {
            let end = stream::run(ctx).await;
            let _ = commands.send(Command::StreamEnded { epoch, end });
        }));

        for plugin in &self.plugins {
            if let Err(e) = plugin.on_connect(&self.ctx) {
                error!("Plugin {} failed on connect: {}", plugin.name(), e);
            }
        }
    }

    fn set_offline(&mut self, epoch: Option<u64>, reason: &str) {
        if self.state() != ConnectionState::Online {
            debug!("Not online, ignoring disconnect: {}", reason);
            return;
        }
        if epoch.is_some_and(|e| e != self.epoch) {
            debug!("Ignoring disconnect from an earlier session: {}", reason);
            return;
        }
        warn!("Disconnected: {}", reason);
        self.go_offline();
    }

    fn go_offline(&mut self) {
        self.epoch += 1;
        self.cancel_tasks();
        self.publish(ConnectionState::Offline, Some(None));
        self.notify_disconnect();
        self.schedule_attempt();
    }

    fn notify_disconnect(&self) {
        for plugin in &self.plugins {
            if let Err(e) = plugin.on_disconnect() {
                error!("Plugin {} failed on disconnect: {}", plugin.name(), e);
            }
        }
    }

    fn stop(&mut self) {
        info!("Shutting down connection");
        self.shared.close();
        let was_online = self.state() == ConnectionState::Online;
        self.epoch += 1;
        self.cancel_tasks();
        if was_online {
            self.notify_disconnect();
        }
        let state = if self.config.is_configured() {
            ConnectionState::Offline
        } else {
            ConnectionState::Unconfigured
        };
        self.publish(state, Some(None));
    }
}

/// Log an unexpected failure at error level, one line per cause.
fn log_failure(context: &str, err: &(dyn std::error::Error + 'static)) {
    error!("{}: {}", context, err);
    for line in cause_chain(err).lines().skip(1) {
        error!("{}", line);
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.cancel_tasks();
    }
}
