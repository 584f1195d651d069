use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::events::Event;

/// Blocking callback run on the worker pool.
pub type SyncCallback = dyn Fn(&Event) -> color_eyre::Result<()> + Send + Sync;

/// Async callback scheduled as a task on the runtime.
pub type AsyncCallback = dyn Fn(Event) -> BoxFuture<'static, color_eyre::Result<()>> + Send + Sync;

/// How a callback is executed, decided when it is wrapped.
#[derive(Clone)]
pub enum CallbackKind {
    Sync(Arc<SyncCallback>),
    Async(Arc<AsyncCallback>),
}

/// A named user callback.
///
/// Created once per registration and invoked for every matching event.
#[derive(Clone)]
pub struct WrappedCallback {
    name: String,
    kind: CallbackKind,
    warn_too_long: bool,
}

impl WrappedCallback {
    /// Wrap a blocking callback.
    pub fn sync<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Event) -> color_eyre::Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind: CallbackKind::Sync(Arc::new(f)),
            warn_too_long: true,
        }
    }

    /// Wrap an async callback.
    pub fn from_async<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = color_eyre::Result<()>> + Send + 'static,
    {
        let f: Arc<AsyncCallback> =
            Arc::new(move |event: Event| -> BoxFuture<'static, color_eyre::Result<()>> {
                Box::pin(f(event))
            });
        Self {
            name: name.into(),
            kind: CallbackKind::Async(f),
            warn_too_long: true,
        }
    }

    /// Suppress the slow-execution warning for this callback.
    pub fn allow_long_running(mut self) -> Self {
        self.warn_too_long = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &CallbackKind {
        &self.kind
    }

    pub fn is_async(&self) -> bool {
        matches!(self.kind, CallbackKind::Async(_))
    }

    pub fn warn_too_long(&self) -> bool {
        self.warn_too_long
    }
}

impl fmt::Debug for WrappedCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrappedCallback")
            .field("name", &self.name)
            .field("async", &self.is_async())
            .field("warn_too_long", &self.warn_too_long)
            .finish()
    }
}
