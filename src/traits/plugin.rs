//! Connection lifecycle hooks.

use crate::bus::EventBus;
use crate::connection::PeerClient;
use crate::items::ItemRegistry;

/// Handles a plugin gets to work with.
#[derive(Clone)]
pub struct PluginContext {
    pub bus: EventBus,
    pub client: PeerClient,
    pub items: ItemRegistry,
}

/// A component that follows the peer connection.
///
/// `setup` runs once when the runtime starts. The supervisor calls
/// `on_connect` exactly once per successful handshake and `on_disconnect`
/// exactly once per transition out of the online state. Hooks run on the
/// supervisor task and must return quickly; long-running work belongs in a
/// task spawned from the hook.
pub trait ConnectionPlugin: Send + Sync {
    fn name(&self) -> &str;

    fn setup(&self, _ctx: &PluginContext) -> color_eyre::Result<()> {
        Ok(())
    }

    fn on_connect(&self, ctx: &PluginContext) -> color_eyre::Result<()>;

    fn on_disconnect(&self) -> color_eyre::Result<()>;
}
