//! Event parsing seam.

use serde_json::Value;

use crate::error::StreamError;
use crate::events::{Event, TopicLayout};

/// Turns a decoded SSE frame into a bus topic and a typed event.
///
/// Implementations must be pure: the same frame and layout always give the
/// same result.
pub trait EventParser: Send + Sync {
    fn parse(&self, raw: &Value, layout: &TopicLayout) -> Result<(String, Event), StreamError>;
}
