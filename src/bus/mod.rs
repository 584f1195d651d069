//! Listener registry and event fan-out.
//!
//! [`EventBus::publish`] matches the event against every registered listener
//! in registration order and submits each match to the
//! [`CallbackExecutor`]. The bus never runs callbacks itself and never sees
//! their failures: a failing callback turns into an
//! [`Event::Error`] published on [`ERRORS_TOPIC`].

mod pattern;

pub use pattern::TopicPattern;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use tracing::{debug, trace};

use crate::events::{Event, EventFilter, ERRORS_TOPIC};
use crate::executor::{CallbackExecutor, WrappedCallback};

/// Handle returned by [`EventBus::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

struct Listener {
    id: ListenerId,
    pattern: TopicPattern,
    filter: EventFilter,
    callback: WrappedCallback,
}

impl Listener {
    fn accepts(&self, topic: &str, event: &Event) -> bool {
        self.pattern.matches(topic) && self.filter.accepts(event)
    }
}

struct BusInner {
    listeners: RwLock<Vec<Arc<Listener>>>,
    next_id: AtomicU64,
    executor: CallbackExecutor,
}

/// Publish/subscribe hub. Cloning shares the same registry.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new(executor: CallbackExecutor) -> Self {
        Self {
            inner: Arc::new(BusInner {
                listeners: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(1),
                executor,
            }),
        }
    }

    pub fn executor(&self) -> &CallbackExecutor {
        &self.inner.executor
    }

    /// Register `callback` for events on topics matching `pattern` that pass
    /// `filter`.
    ///
    /// Registering the same callback twice yields two listeners.
    pub fn add_listener(
        &self,
        pattern: impl Into<TopicPattern>,
        callback: WrappedCallback,
        filter: impl Into<EventFilter>,
    ) -> ListenerId {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let listener = Listener {
            id,
            pattern: pattern.into(),
            filter: filter.into(),
            callback,
        };
        debug!(
            "Added {} for {} on '{}'",
            id,
            listener.callback.name(),
            listener.pattern
        );
        self.write().push(Arc::new(listener));
        id
    }

    /// Returns `false` if no such listener was registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.write();
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        before != listeners.len()
    }

    /// Remove several listeners at once, e.g. when a rule is unloaded.
    pub fn remove_listeners(&self, ids: &[ListenerId]) -> usize {
        let mut listeners = self.write();
        let before = listeners.len();
        listeners.retain(|l| !ids.contains(&l.id));
        before - listeners.len()
    }

    pub fn remove_all_listeners(&self) {
        self.write().clear();
    }

    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Fan `event` out to every matching listener.
    ///
    /// Returns the number of callbacks submitted. Listeners removed after this
    /// call returns are not affected by it; callbacks already submitted still
    /// run.
    pub fn publish(&self, topic: &str, event: Event) -> usize {
        let matching: Vec<Arc<Listener>> = self
            .inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|l| l.accepts(topic, &event))
            .cloned()
            .collect();

        trace!("{} -> {} listener(s): {}", topic, matching.len(), event);
        if matching.is_empty() {
            return 0;
        }

        let event = Arc::new(event);
        let mut submitted = 0;
        for listener in matching {
            let bus = Arc::downgrade(&self.inner);
            if self
                .inner
                .executor
                .submit(&listener.callback, event.clone(), move |err| {
                    publish_error(&bus, err)
                })
            {
                submitted += 1;
            }
        }
        submitted
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Arc<Listener>>> {
        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn publish_error(bus: &Weak<BusInner>, err: crate::events::ErrorEvent) {
    if let Some(inner) = bus.upgrade() {
        EventBus { inner }.publish(ERRORS_TOPIC, Event::Error(err));
    }
}
