//! Callback execution.
//!
//! Sync callbacks run on a bounded pool of blocking workers; async callbacks
//! are spawned as tasks. Either way a failure or panic is caught, logged and
//! reported through the `on_error` hook given to [`CallbackExecutor::submit`].
//! Nothing a callback does can reach the caller of `submit`.

mod callback;
mod pool;

pub use callback::{AsyncCallback, CallbackKind, SyncCallback, WrappedCallback};
pub use pool::CallbackExecutor;
