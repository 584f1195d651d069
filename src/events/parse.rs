//! Default parser for the peer's event stream.
//!
//! Every frame on the stream is a JSON object of the form
//!
//! ```json
//! {"topic": "openhab/items/Ping/state",
//!  "payload": "{\"type\":\"String\",\"value\":\"1\"}",
//!  "type": "ItemStateEvent"}
//! ```
//!
//! The payload is itself a JSON document encoded as a string. The entity name
//! is cut out of the topic at a fixed offset that depends on the peer's topic
//! layout.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::{Event, EventKind, ItemDefinition};
use crate::error::StreamError;
use crate::traits::EventParser;

/// Topic naming used by a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicLayout {
    /// Leading topic segment (`openhab` or `smarthome`).
    pub prefix: &'static str,
    /// Byte offset of the item name in an item topic.
    pub item_start: usize,
    pub thing_start: usize,
    pub channel_start: usize,
}

impl TopicLayout {
    pub const CURRENT: TopicLayout = TopicLayout {
        prefix: "openhab",
        item_start: 14,
        thing_start: 15,
        channel_start: 17,
    };

    /// Layout of peers that predate the `runtimeInfo` root document.
    pub const LEGACY: TopicLayout = TopicLayout {
        prefix: "smarthome",
        item_start: 16,
        thing_start: 17,
        channel_start: 19,
    };

    pub fn is_legacy(&self) -> bool {
        *self == Self::LEGACY
    }

    /// Value of the `topics` query parameter for the event subscription.
    pub fn subscription_topics(&self) -> String {
        let p = self.prefix;
        format!(
            "{p}/items/,{p}/channels/,{p}/things/*/status,{p}/things/*/statuschanged",
            p = p
        )
    }
}

impl Default for TopicLayout {
    fn default() -> Self {
        Self::CURRENT
    }
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    topic: String,
    #[serde(default)]
    payload: String,
    #[serde(rename = "type")]
    event_type: String,
}

#[derive(Debug, Deserialize)]
struct StatePayload {
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StateChangedPayload {
    value: String,
    old_value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemPayload {
    #[serde(rename = "type")]
    item_type: String,
    name: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    group_names: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TriggerPayload {
    event: String,
    channel: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThingStatusPayload {
    status: String,
    #[serde(default)]
    status_detail: Option<String>,
}

/// Map the peer's "no state" markers to `None`.
fn state_value(value: String) -> Option<String> {
    match value.as_str() {
        "NULL" | "UNDEF" | "NONE" => None,
        _ => Some(value),
    }
}

fn detail_value(detail: Option<String>) -> Option<String> {
    detail.and_then(state_value)
}

fn payload<T: DeserializeOwned>(kind: EventKind, raw: &str) -> Result<T, StreamError> {
    serde_json::from_str(raw).map_err(|e| StreamError::invalid_payload(kind.wire_name(), e))
}

/// Cut the name segment out of `topic` at `start`.
fn name_at(kind: EventKind, topic: &str, start: usize) -> Result<String, StreamError> {
    topic
        .get(start..)
        .and_then(|rest| rest.split('/').next())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| StreamError::invalid_payload(kind.wire_name(), format!("no name in topic '{}'", topic)))
}

/// Parser for the openHAB event stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenhabEventParser;

impl OpenhabEventParser {
    pub fn new() -> Self {
        Self
    }

    fn parse_frame(&self, frame: RawFrame, layout: &TopicLayout) -> Result<Event, StreamError> {
        let kind = EventKind::from_wire_name(&frame.event_type).ok_or_else(|| {
            StreamError::UnknownEventType {
                event_type: frame.event_type.clone(),
            }
        })?;
        let topic = frame.topic.as_str();
        let raw = frame.payload.as_str();

        let event = match kind {
            EventKind::ItemState => {
                let p: StatePayload = payload(kind, raw)?;
                Event::ItemState {
                    name: name_at(kind, topic, layout.item_start)?,
                    value: state_value(p.value),
                }
            }
            EventKind::ItemCommand => {
                let p: StatePayload = payload(kind, raw)?;
                Event::ItemCommand {
                    name: name_at(kind, topic, layout.item_start)?,
                    value: state_value(p.value),
                }
            }
            EventKind::ItemStateChanged => {
                let p: StateChangedPayload = payload(kind, raw)?;
                Event::ItemStateChanged {
                    name: name_at(kind, topic, layout.item_start)?,
                    value: state_value(p.value),
                    old_value: state_value(p.old_value),
                }
            }
            EventKind::ItemAdded => {
                let p: ItemPayload = payload(kind, raw)?;
                Event::ItemAdded(ItemDefinition {
                    name: p.name,
                    item_type: p.item_type,
                    tags: p.tags.into_iter().collect(),
                    groups: p.group_names.into_iter().collect(),
                })
            }
            EventKind::ItemUpdated => {
                // [new, old]; the topic carries the name
                let p: Vec<ItemPayload> = payload(kind, raw)?;
                let new = p
                    .into_iter()
                    .next()
                    .ok_or_else(|| StreamError::invalid_payload(kind.wire_name(), "empty update"))?;
                Event::ItemUpdated(ItemDefinition {
                    name: name_at(kind, topic, layout.item_start)?,
                    item_type: new.item_type,
                    tags: new.tags.into_iter().collect(),
                    groups: new.group_names.into_iter().collect(),
                })
            }
            EventKind::ItemRemoved => Event::ItemRemoved {
                name: name_at(kind, topic, layout.item_start)?,
            },
            EventKind::GroupItemStateChanged => {
                let p: StateChangedPayload = payload(kind, raw)?;
                let item = topic
                    .get(layout.item_start..)
                    .and_then(|rest| rest.split('/').nth(1))
                    .filter(|item| !item.is_empty())
                    .ok_or_else(|| {
                        StreamError::invalid_payload(kind.wire_name(), "no member item in topic")
                    })?;
                Event::GroupItemStateChanged {
                    name: name_at(kind, topic, layout.item_start)?,
                    item: item.to_string(),
                    value: state_value(p.value),
                    old_value: state_value(p.old_value),
                }
            }
            EventKind::ChannelTriggered => {
                let p: TriggerPayload = payload(kind, raw)?;
                Event::ChannelTriggered {
                    name: name_at(kind, topic, layout.channel_start)?,
                    channel: p.channel,
                    event: p.event,
                }
            }
            EventKind::ThingStatusInfo => {
                let p: ThingStatusPayload = payload(kind, raw)?;
                Event::ThingStatusInfo {
                    name: name_at(kind, topic, layout.thing_start)?,
                    status: p.status,
                    detail: detail_value(p.status_detail),
                }
            }
            EventKind::ThingStatusInfoChanged => {
                let p: Vec<ThingStatusPayload> = payload(kind, raw)?;
                let mut p = p.into_iter();
                let (new, old) = match (p.next(), p.next()) {
                    (Some(new), Some(old)) => (new, old),
                    _ => {
                        return Err(StreamError::invalid_payload(
                            kind.wire_name(),
                            "expected [new, old] status",
                        ))
                    }
                };
                Event::ThingStatusInfoChanged {
                    name: name_at(kind, topic, layout.thing_start)?,
                    status: new.status,
                    detail: detail_value(new.status_detail),
                    old_status: old.status,
                    old_detail: detail_value(old.status_detail),
                }
            }
            EventKind::Error => {
                return Err(StreamError::UnknownEventType {
                    event_type: frame.event_type,
                })
            }
        };
        Ok(event)
    }
}

impl EventParser for OpenhabEventParser {
    fn parse(&self, raw: &Value, layout: &TopicLayout) -> Result<(String, Event), StreamError> {
        let frame = RawFrame::deserialize(raw).map_err(|e| StreamError::MalformedFrame {
            message: e.to_string(),
            data: raw.to_string(),
        })?;
        let event = self.parse_frame(frame, layout)?;
        Ok((event.topic(), event))
    }
}
