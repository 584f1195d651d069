use std::collections::HashSet;

use super::{Event, EventKind};

/// Type filter attached to a listener.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EventFilter {
    /// Accept every event on the topic.
    #[default]
    Any,
    /// Accept only the listed kinds.
    Kinds(HashSet<EventKind>),
}

impl EventFilter {
    pub fn kind(kind: EventKind) -> Self {
        Self::Kinds(HashSet::from([kind]))
    }

    pub fn kinds(kinds: impl IntoIterator<Item = EventKind>) -> Self {
        Self::Kinds(kinds.into_iter().collect())
    }

    pub fn accepts(&self, event: &Event) -> bool {
        match self {
            EventFilter::Any => true,
            EventFilter::Kinds(kinds) => kinds.contains(&event.kind()),
        }
    }
}

impl From<EventKind> for EventFilter {
    fn from(kind: EventKind) -> Self {
        Self::kind(kind)
    }
}
