use std::fmt;
use std::time::Duration;

use crate::events::TopicLayout;

/// Lifecycle of the peer connection.
///
/// Read-only mode is not a state: it is carried next to the state in
/// [`ConnectionStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No endpoint configured.
    #[default]
    Unconfigured,
    /// Connection lost; a new attempt is scheduled.
    Offline,
    /// Handshake in progress or being retried.
    Connecting,
    /// Handshake succeeded and the event stream is running.
    Online,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Unconfigured => "unconfigured",
            ConnectionState::Offline => "offline",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Online => "online",
        };
        f.write_str(s)
    }
}

/// What the handshake learned about the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    pub uuid: String,
    pub version: Option<String>,
    pub build: Option<String>,
    /// Peer predates the `runtimeInfo` root document.
    pub legacy: bool,
}

impl PeerInfo {
    pub fn layout(&self) -> TopicLayout {
        if self.legacy {
            TopicLayout::LEGACY
        } else {
            TopicLayout::CURRENT
        }
    }
}

/// Snapshot of the supervisor's state, published on every change.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub read_only: bool,
    pub layout: TopicLayout,
    pub peer: Option<PeerInfo>,
    /// Delay before the next reconnect attempt.
    pub backoff: Duration,
    /// Bumped whenever the supervisor abandons a connection attempt or an
    /// online session.
    pub epoch: u64,
}

impl ConnectionStatus {
    pub fn is_online(&self) -> bool {
        self.state == ConnectionState::Online
    }

    /// Whether mutating requests may be sent right now.
    pub fn accepts_writes(&self) -> bool {
        self.is_online() && !self.read_only
    }
}
