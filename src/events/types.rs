//! Typed events published on the bus.
//!
//! Events are immutable once built. They are produced either by the event
//! parser from an SSE frame or internally (see [`ErrorEvent`]).

use std::collections::BTreeSet;
use std::fmt;

/// Discriminant of an [`Event`], used by listener type filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    ItemState,
    ItemStateChanged,
    ItemCommand,
    ItemAdded,
    ItemUpdated,
    ItemRemoved,
    GroupItemStateChanged,
    ChannelTriggered,
    ThingStatusInfo,
    ThingStatusInfoChanged,
    Error,
}

impl EventKind {
    /// Name used by the peer in the `type` field of an event.
    pub fn wire_name(&self) -> &'static str {
        match self {
            EventKind::ItemState => "ItemStateEvent",
            EventKind::ItemStateChanged => "ItemStateChangedEvent",
            EventKind::ItemCommand => "ItemCommandEvent",
            EventKind::ItemAdded => "ItemAddedEvent",
            EventKind::ItemUpdated => "ItemUpdatedEvent",
            EventKind::ItemRemoved => "ItemRemovedEvent",
            EventKind::GroupItemStateChanged => "GroupItemStateChangedEvent",
            EventKind::ChannelTriggered => "ChannelTriggeredEvent",
            EventKind::ThingStatusInfo => "ThingStatusInfoEvent",
            EventKind::ThingStatusInfoChanged => "ThingStatusInfoChangedEvent",
            EventKind::Error => "HABAppException",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        let kind = match name {
            "ItemStateEvent" => EventKind::ItemState,
            "ItemStateChangedEvent" => EventKind::ItemStateChanged,
            "ItemCommandEvent" => EventKind::ItemCommand,
            "ItemAddedEvent" => EventKind::ItemAdded,
            "ItemUpdatedEvent" => EventKind::ItemUpdated,
            "ItemRemovedEvent" => EventKind::ItemRemoved,
            "GroupItemStateChangedEvent" => EventKind::GroupItemStateChanged,
            "ChannelTriggeredEvent" => EventKind::ChannelTriggered,
            "ThingStatusInfoEvent" => EventKind::ThingStatusInfo,
            "ThingStatusInfoChangedEvent" => EventKind::ThingStatusInfoChanged,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Item metadata carried by added/updated events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDefinition {
    pub name: String,
    pub item_type: String,
    pub tags: BTreeSet<String>,
    pub groups: BTreeSet<String>,
}

/// A callback failure turned into an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEvent {
    /// Name of the callback that failed.
    pub source_name: String,
    pub error_description: String,
    pub formatted_trace: String,
}

/// An event delivered to listeners.
///
/// Item values are kept as the peer's string representation; `None` means
/// the item has no state (`NULL`, `UNDEF` or `NONE` on the wire).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ItemState {
        name: String,
        value: Option<String>,
    },
    ItemStateChanged {
        name: String,
        value: Option<String>,
        old_value: Option<String>,
    },
    ItemCommand {
        name: String,
        value: Option<String>,
    },
    ItemAdded(ItemDefinition),
    ItemUpdated(ItemDefinition),
    ItemRemoved {
        name: String,
    },
    GroupItemStateChanged {
        name: String,
        item: String,
        value: Option<String>,
        old_value: Option<String>,
    },
    ChannelTriggered {
        name: String,
        channel: String,
        event: String,
    },
    ThingStatusInfo {
        name: String,
        status: String,
        detail: Option<String>,
    },
    ThingStatusInfoChanged {
        name: String,
        status: String,
        detail: Option<String>,
        old_status: String,
        old_detail: Option<String>,
    },
    Error(ErrorEvent),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::ItemState { .. } => EventKind::ItemState,
            Event::ItemStateChanged { .. } => EventKind::ItemStateChanged,
            Event::ItemCommand { .. } => EventKind::ItemCommand,
            Event::ItemAdded(_) => EventKind::ItemAdded,
            Event::ItemUpdated(_) => EventKind::ItemUpdated,
            Event::ItemRemoved { .. } => EventKind::ItemRemoved,
            Event::GroupItemStateChanged { .. } => EventKind::GroupItemStateChanged,
            Event::ChannelTriggered { .. } => EventKind::ChannelTriggered,
            Event::ThingStatusInfo { .. } => EventKind::ThingStatusInfo,
            Event::ThingStatusInfoChanged { .. } => EventKind::ThingStatusInfoChanged,
            Event::Error(_) => EventKind::Error,
        }
    }

    /// Name of the item, thing or channel the event is about.
    pub fn name(&self) -> &str {
        match self {
            Event::ItemState { name, .. }
            | Event::ItemStateChanged { name, .. }
            | Event::ItemCommand { name, .. }
            | Event::ItemRemoved { name }
            | Event::GroupItemStateChanged { name, .. }
            | Event::ChannelTriggered { name, .. }
            | Event::ThingStatusInfo { name, .. }
            | Event::ThingStatusInfoChanged { name, .. } => name,
            Event::ItemAdded(def) | Event::ItemUpdated(def) => &def.name,
            Event::Error(err) => &err.source_name,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Event::Error(_))
    }

    /// Bus topic this event is published on.
    pub fn topic(&self) -> String {
        match self {
            Event::ItemState { .. }
            | Event::ItemStateChanged { .. }
            | Event::ItemCommand { .. }
            | Event::ItemAdded(_)
            | Event::ItemUpdated(_)
            | Event::ItemRemoved { .. }
            | Event::GroupItemStateChanged { .. } => format!("items/{}", self.name()),
            Event::ChannelTriggered { name, .. } => format!("channels/{}", name),
            Event::ThingStatusInfo { name, .. } | Event::ThingStatusInfoChanged { name, .. } => {
                format!("things/{}", name)
            }
            Event::Error(_) => super::ERRORS_TOPIC.to_string(),
        }
    }
}

fn opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("None")
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::ItemState { name, value } | Event::ItemCommand { name, value } => {
                write!(f, "<{} name: {}, value: {}>", self.kind(), name, opt(value))
            }
            Event::ItemStateChanged {
                name,
                value,
                old_value,
            } => write!(
                f,
                "<{} name: {}, value: {}, old_value: {}>",
                self.kind(),
                name,
                opt(value),
                opt(old_value)
            ),
            Event::ItemAdded(def) | Event::ItemUpdated(def) => {
                let tags: Vec<&str> = def.tags.iter().map(String::as_str).collect();
                let groups: Vec<&str> = def.groups.iter().map(String::as_str).collect();
                write!(
                    f,
                    "<{} name: {}, type: {}, tags: {{{}}}, groups: {{{}}}>",
                    self.kind(),
                    def.name,
                    def.item_type,
                    tags.join(", "),
                    groups.join(", ")
                )
            }
            Event::ItemRemoved { name } => write!(f, "<{} name: {}>", self.kind(), name),
            Event::GroupItemStateChanged {
                name,
                item,
                value,
                old_value,
            } => write!(
                f,
                "<{} name: {}, item: {}, value: {}, old_value: {}>",
                self.kind(),
                name,
                item,
                opt(value),
                opt(old_value)
            ),
            Event::ChannelTriggered {
                name,
                channel,
                event,
            } => write!(
                f,
                "<{} name: {}, channel: {}, event: {}>",
                self.kind(),
                name,
                channel,
                event
            ),
            Event::ThingStatusInfo {
                name,
                status,
                detail,
            } => write!(
                f,
                "<{} name: {}, status: {}, detail: {}>",
                self.kind(),
                name,
                status,
                opt(detail)
            ),
            Event::ThingStatusInfoChanged {
                name,
                status,
                detail,
                old_status,
                old_detail,
            } => write!(
                f,
                "<{} name: {}, status: {}, detail: {}, old_status: {}, old_detail: {}>",
                self.kind(),
                name,
                status,
                opt(detail),
                old_status,
                opt(old_detail)
            ),
            Event::Error(err) => write!(
                f,
                "<{} function: {}, exception: {}>",
                self.kind(),
                err.source_name,
                err.error_description
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_names_round_trip() {
        for kind in [
            EventKind::ItemState,
            EventKind::ItemCommand,
            EventKind::GroupItemStateChanged,
            EventKind::ThingStatusInfoChanged,
        ] {
            assert_eq!(EventKind::from_wire_name(kind.wire_name()), Some(kind));
        }
        assert_eq!(EventKind::from_wire_name("HABAppException"), None);
    }

    #[test]
    fn test_topics() {
        let event = Event::ItemState {
            name: "Kitchen_Light".to_string(),
            value: Some("ON".to_string()),
        };
        assert_eq!(event.topic(), "items/Kitchen_Light");

        let event = Event::ThingStatusInfo {
            name: "astro:sun:home".to_string(),
            status: "ONLINE".to_string(),
            detail: None,
        };
        assert_eq!(event.topic(), "things/astro:sun:home");

        let event = Event::Error(ErrorEvent {
            source_name: "rule".to_string(),
            error_description: "boom".to_string(),
            formatted_trace: String::new(),
        });
        assert_eq!(event.topic(), "errors");
        assert!(event.is_error());
    }

    #[test]
    fn test_display_item_added() {
        let event = Event::ItemAdded(ItemDefinition {
            name: "TestColor_OFF".to_string(),
            item_type: "Color".to_string(),
            tags: ["test_tag".to_string(), "tag2".to_string()].into(),
            groups: ["TestGroup".to_string()].into(),
        });
        assert_eq!(
            event.to_string(),
            "<ItemAddedEvent name: TestColor_OFF, type: Color, tags: {tag2, test_tag}, groups: {TestGroup}>"
        );
    }

    #[test]
    fn test_display_missing_value() {
        let event = Event::ItemStateChanged {
            name: "Ping".to_string(),
            value: Some("1".to_string()),
            old_value: None,
        };
        assert_eq!(
            event.to_string(),
            "<ItemStateChangedEvent name: Ping, value: 1, old_value: None>"
        );
    }
}
