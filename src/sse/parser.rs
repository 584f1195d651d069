//! Stateful SSE line parser.

use super::{SseFrame, SseLine};

/// Parse a single SSE line into its component type
pub fn parse_sse_line(line: &str) -> SseLine {
    if line.is_empty() {
        return SseLine::Empty;
    }

    if let Some(stripped) = line.strip_prefix(':') {
        return SseLine::Comment(stripped.trim().to_string());
    }

    if let Some(rest) = line.strip_prefix("event:") {
        return SseLine::Event(rest.trim().to_string());
    }

    if let Some(rest) = line.strip_prefix("data:") {
        return SseLine::Data(rest.strip_prefix(' ').unwrap_or(rest).to_string());
    }

    // id:, retry: and unknown fields carry nothing we use
    SseLine::Comment(line.to_string())
}

/// Stateful SSE parser that accumulates lines and emits complete frames
#[derive(Debug, Default)]
pub struct SseParser {
    /// Current event name being accumulated
    current_event: Option<String>,
    /// Accumulated data lines (SSE allows multiple data: lines)
    data_buffer: Vec<String>,
}

impl SseParser {
    /// Create a new SSE parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a line (without its trailing newline) to the parser.
    ///
    /// Returns a frame when the line completes one.
    pub fn feed_line(&mut self, line: &str) -> Option<SseFrame> {
        match parse_sse_line(line) {
            SseLine::Event(name) => {
                self.current_event = Some(name);
                None
            }
            SseLine::Data(data) => {
                self.data_buffer.push(data);
                None
            }
            SseLine::Empty => self.try_emit(),
            SseLine::Comment(_) => None,
        }
    }

    fn try_emit(&mut self) -> Option<SseFrame> {
        if self.current_event.is_none() && self.data_buffer.is_empty() {
            return None;
        }

        let frame = SseFrame {
            event: self.current_event.take(),
            data: self.data_buffer.join("\n"),
        };
        self.data_buffer.clear();
        Some(frame)
    }

    /// Reset the parser state
    pub fn reset(&mut self) {
        self.current_event = None;
        self.data_buffer.clear();
    }
}
