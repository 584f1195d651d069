//! Trait abstractions for dependency injection and testability.
//!
//! # Traits
//!
//! - [`HttpClient`] - HTTP transport (GET, POST, PUT, DELETE, streaming GET)
//! - [`SessionFactory`] - opens a transport for a connection config
//! - [`EventParser`] - decoded SSE frame to typed event
//! - [`ConnectionPlugin`] - connect/disconnect hooks

pub mod http;
pub mod parser;
pub mod plugin;

pub use http::{ByteStream, Headers, HttpClient, HttpError, Response, SessionFactory};
pub use parser::EventParser;
pub use plugin::{ConnectionPlugin, PluginContext};
