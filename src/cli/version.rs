//! Version report for `--version`.
//!
//! Besides the build version this names the event topic namespaces the
//! bridge can subscribe to, which decides whether a given peer is usable.

use crate::events::TopicLayout;

/// The current version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Text printed for `--version`.
pub fn version_report() -> String {
    format!(
        "{} {}\n{}\npeer topics: {}/* (runtimeInfo peers), {}/* (older peers)",
        env!("CARGO_PKG_NAME"),
        VERSION,
        env!("CARGO_PKG_DESCRIPTION"),
        TopicLayout::CURRENT.prefix,
        TopicLayout::LEGACY.prefix,
    )
}
