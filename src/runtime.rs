//! Wiring of executor, bus, item registry and connection supervisor.
//!
//! ```ignore
//! let runtime = Runtime::builder(config)
//!     .plugin(PingPlugin::new(config.ping.clone()))
//!     .start();
//! runtime.bus().add_listener("items/*", callback, EventKind::ItemStateChanged);
//! ...
//! runtime.shutdown().await;
//! ```

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::adapters::ReqwestSessionFactory;
use crate::bus::EventBus;
use crate::config::Config;
use crate::connection::{self, ConnectionStatus, PeerClient, SupervisorHandle, SupervisorParts};
use crate::events::parse::OpenhabEventParser;
use crate::executor::CallbackExecutor;
use crate::items::ItemRegistry;
use crate::traits::{ConnectionPlugin, EventParser, SessionFactory};

/// Builder for [`Runtime`].
pub struct RuntimeBuilder {
    config: Config,
    plugins: Vec<Arc<dyn ConnectionPlugin>>,
    factory: Arc<dyn SessionFactory>,
    parser: Arc<dyn EventParser>,
}

impl RuntimeBuilder {
    /// Register a plugin. Plugins are notified in registration order.
    pub fn plugin(mut self, plugin: impl ConnectionPlugin + 'static) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    /// Register an already shared plugin.
    pub fn shared_plugin(mut self, plugin: Arc<dyn ConnectionPlugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Replace the HTTP session factory (reqwest by default).
    pub fn session_factory(mut self, factory: impl SessionFactory + 'static) -> Self {
        self.factory = Arc::new(factory);
        self
    }

    /// Replace the SSE frame parser.
    pub fn event_parser(mut self, parser: impl EventParser + 'static) -> Self {
        self.parser = Arc::new(parser);
        self
    }

    /// Start the runtime. Must be called from within a tokio runtime.
    pub fn start(self) -> Runtime {
        let executor = CallbackExecutor::new(&self.config.executor, Handle::current());
        let bus = EventBus::new(executor.clone());
        let items = ItemRegistry::new();
        let read_only = self.config.general.listen_only;
        if read_only {
            info!("Listen only mode: no updates will be sent to the peer");
        }

        let (supervisor, ctx, join) = connection::start(SupervisorParts {
            config: self.config.connection,
            read_only,
            factory: self.factory,
            parser: self.parser,
            plugins: self.plugins,
            bus,
            items,
        });
        debug!(
            "Runtime started with {} worker threads",
            executor.worker_threads()
        );

        Runtime {
            executor,
            bus: ctx.bus,
            client: ctx.client,
            items: ctx.items,
            supervisor,
            join: Mutex::new(Some(join)),
        }
    }
}

/// A running bridge.
pub struct Runtime {
    executor: CallbackExecutor,
    bus: EventBus,
    client: PeerClient,
    items: ItemRegistry,
    supervisor: SupervisorHandle,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl Runtime {
    pub fn builder(config: Config) -> RuntimeBuilder {
        RuntimeBuilder {
            config,
            plugins: Vec::new(),
            factory: Arc::new(ReqwestSessionFactory),
            parser: Arc::new(OpenhabEventParser),
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn client(&self) -> &PeerClient {
        &self.client
    }

    pub fn items(&self) -> &ItemRegistry {
        &self.items
    }

    pub fn executor(&self) -> &CallbackExecutor {
        &self.executor
    }

    pub fn supervisor(&self) -> &SupervisorHandle {
        &self.supervisor
    }

    /// Receiver for connection status changes.
    pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.client.status_receiver()
    }

    /// Stop the connection, notify plugins and drain running callbacks.
    pub async fn shutdown(&self) {
        self.supervisor.shutdown().await;
        self.executor.shutdown().await;
        if let Some(join) = self.join.lock().await.take() {
            let _ = join.await;
        }
        info!("Shutdown complete");
    }
}
