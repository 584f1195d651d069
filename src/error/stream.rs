//! Errors raised while decoding the server-sent event stream.
//!
//! All of these are local to a single frame: the stream loop logs them and
//! moves on to the next frame.

use thiserror::Error;

/// Stream-specific error variants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StreamError {
    /// Frame data was not valid JSON.
    #[error("malformed frame: {message}")]
    MalformedFrame { message: String, data: String },

    /// Frame carried an event type the parser does not know.
    #[error("unknown event type '{event_type}'")]
    UnknownEventType { event_type: String },

    /// Frame was JSON but did not have the expected shape.
    #[error("invalid payload for {event_type}: {message}")]
    InvalidPayload { event_type: String, message: String },

    /// A single line exceeded the configured buffer size.
    #[error("line exceeds buffer size of {limit} bytes")]
    LineTooLong { limit: usize },

    /// The peer ended the stream.
    #[error("event stream closed by peer")]
    Closed,
}

impl StreamError {
    /// Whether the error ends the stream rather than a single frame.
    pub fn ends_stream(&self) -> bool {
        matches!(self, StreamError::Closed)
    }

    pub(crate) fn invalid_payload(event_type: &str, message: impl ToString) -> Self {
        StreamError::InvalidPayload {
            event_type: event_type.to_string(),
            message: message.to_string(),
        }
    }
}
