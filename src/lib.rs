//! rulebridge - rule engine bridge to a home-automation server.
//!
//! The bridge keeps one HTTP/SSE connection to the peer, turns the event
//! stream into typed [`events::Event`]s and fans them out through an
//! [`bus::EventBus`] to rule callbacks running on a bounded worker pool.
//!
//! This library exposes modules for use in integration tests.

pub mod adapters;
pub mod bus;
pub mod cli;
pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod executor;
pub mod items;
pub mod logging;
pub mod plugins;
pub mod prelude;
pub mod runtime;
pub mod sse;
pub mod traits;
