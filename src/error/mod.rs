//! Error types for the bridge.
//!
//! Errors are split by the domain that produces them:
//!
//! | Type | Raised by | Propagation |
//! |------|-----------|-------------|
//! | [`ConnectionError`] | outward requests, handshake | to the immediate caller only |
//! | [`StreamError`] | SSE frame decoding | logged, frame skipped |
//! | [`CallbackError`] | user callbacks | isolated, published as an error event |
//! | [`ConfigError`] | configuration loading | fatal to startup |
//!
//! Transport failures from the HTTP layer are classified once, at the
//! boundary, into a [`TransportOutcome`](crate::connection::TransportOutcome);
//! everything above that branches on the outcome rather than on error types.

mod callback;
mod config;
mod connection;
mod stream;

pub use callback::CallbackError;
pub use config::ConfigError;
pub use connection::{ConnectionError, ConnectionResult};
pub use stream::StreamError;

/// Render an error and its sources, one per line, outermost first.
pub fn cause_chain(err: &(dyn std::error::Error + 'static)) -> String {
    std::iter::successors(Some(err), |cause| cause.source())
        .enumerate()
        .map(|(idx, cause)| format!("{:>3}: {}", idx, cause))
        .collect::<Vec<_>>()
        .join("\n")
}
