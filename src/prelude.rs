//! Prelude module for convenient imports.
//!
//! # Usage
//!
//! ```ignore
//! use rulebridge::prelude::*;
//! ```
//!
//! This will import:
//! - Runtime wiring (Runtime, Config)
//! - Bus and callback types (EventBus, ListenerId, WrappedCallback)
//! - Event types (Event, EventKind, EventFilter)
//! - Connection types (PeerClient, RequestOptions, ConnectionState)
//! - Plugin interface (ConnectionPlugin, PluginContext)

// Runtime wiring
pub use crate::config::Config;
pub use crate::runtime::Runtime;

// Bus and callbacks
pub use crate::bus::{EventBus, ListenerId, TopicPattern};
pub use crate::executor::WrappedCallback;

// Events
pub use crate::events::{ErrorEvent, Event, EventFilter, EventKind};
pub use crate::items::{Item, ItemRegistry};

// Connection
pub use crate::connection::{ConnectionState, ConnectionStatus, PeerClient, RequestOptions};
pub use crate::error::{ConnectionError, ConnectionResult};

// Plugins
pub use crate::traits::{ConnectionPlugin, PluginContext};
