//! Built-in connection plugins.

mod ping;

pub use ping::PingPlugin;
