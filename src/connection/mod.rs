//! Peer connection: supervisor, outward requests and the event stream.
//!
//! - [`PeerClient`] - outward `get/post/put/delete`, gated on the connection
//!   state and read-only mode
//! - [`SupervisorHandle`] - control of the supervisor task
//! - [`BackoffTimer`] - reconnect spacing
//! - [`TransportOutcome`] - the one place transport results are classified

mod backoff;
mod client;
pub mod handshake;
mod outcome;
mod state;
pub mod stream;
mod supervisor;

pub use backoff::BackoffTimer;
pub use client::{BlockingPeerClient, Method, PeerClient, RequestBody, RequestOptions};
pub use outcome::{classify_http_error, classify_status, TransportOutcome};
pub use state::{ConnectionState, ConnectionStatus, PeerInfo};
pub use supervisor::SupervisorHandle;

pub(crate) use supervisor::{start, SupervisorParts};
