//! Server-sent event framing.
//!
//! The SSE wire format is line based:
//! - `event: <name>` - event name line
//! - `data: <payload>` - data line (may repeat; lines are joined with `\n`)
//! - Empty line - ends the frame
//! - Lines starting with `:` - comments (ignored)
//!
//! [`SseParser`] turns lines into [`SseFrame`]s and [`frames`] turns a byte
//! stream into a stream of frames. Decoding the frame payload is left to the
//! connection layer.

mod decoder;
mod parser;

pub use decoder::frames;
pub use parser::{parse_sse_line, SseParser};

use thiserror::Error;

use crate::error::StreamError;
use crate::traits::HttpError;

/// Represents a parsed SSE line
#[derive(Debug, Clone, PartialEq)]
pub enum SseLine {
    /// Event name declaration (e.g., "event: message")
    Event(String),
    /// Data payload (e.g., "data: {\"topic\": ...}")
    Data(String),
    /// Empty line - signals end of frame
    Empty,
    /// Comment line (starts with ':') or unrecognised field
    Comment(String),
}

/// One complete frame from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

impl SseFrame {
    /// Keep-alive frames carry no payload worth decoding.
    pub fn is_keepalive(&self) -> bool {
        matches!(self.event.as_deref(), Some("alive") | Some("ping"))
    }
}

/// Errors produced while reading frames.
#[derive(Debug, Clone, Error)]
pub enum SseError {
    /// The underlying body stream failed; the stream is finished.
    #[error(transparent)]
    Transport(#[from] HttpError),
    /// A single line could not be framed; the stream continues.
    #[error(transparent)]
    Frame(#[from] StreamError),
}
