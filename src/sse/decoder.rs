//! Byte stream to frame stream adapter.

use futures_util::stream::{self, Stream};
use futures_util::StreamExt;

use super::{SseError, SseFrame, SseParser};
use crate::error::StreamError;
use crate::traits::ByteStream;

struct DecoderState {
    body: ByteStream,
    parser: SseParser,
    buffer: Vec<u8>,
    max_line: usize,
    /// Dropping the rest of an oversized line.
    discarding: bool,
    finished: bool,
}

impl DecoderState {
    /// Pop the next complete line out of the buffer.
    fn next_line(&mut self) -> Option<Vec<u8>> {
        let pos = self.buffer.iter().position(|b| *b == b'\n')?;
        let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(line)
    }

    /// Drop the frame in progress and report the limit.
    fn too_long(&mut self) -> SseError {
        self.parser.reset();
        StreamError::LineTooLong {
            limit: self.max_line,
        }
        .into()
    }

    fn push_chunk(&mut self, chunk: &[u8]) {
        if self.discarding {
            if let Some(pos) = chunk.iter().position(|b| *b == b'\n') {
                self.discarding = false;
                self.buffer.extend_from_slice(&chunk[pos + 1..]);
            }
            return;
        }
        self.buffer.extend_from_slice(chunk);
    }

    /// Flush whatever is left once the body has ended.
    fn flush(&mut self) -> Option<SseFrame> {
        if !self.buffer.is_empty() && !self.discarding {
            let rest = String::from_utf8_lossy(&self.buffer).into_owned();
            self.buffer.clear();
            if let Some(frame) = self.parser.feed_line(rest.trim_end_matches('\r')) {
                return Some(frame);
            }
        }
        self.parser.feed_line("")
    }
}

/// Decode a body stream into SSE frames.
///
/// Lines longer than `max_line` bytes are dropped and reported as
/// [`StreamError::LineTooLong`]; decoding resumes at the next line. A body
/// error is yielded once and ends the stream.
pub fn frames(body: ByteStream, max_line: usize) -> impl Stream<Item = Result<SseFrame, SseError>> {
    let state = DecoderState {
        body,
        parser: SseParser::new(),
        buffer: Vec::new(),
        max_line,
        discarding: false,
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            while let Some(line) = state.next_line() {
                if line.len() > state.max_line {
                    let err = state.too_long();
                    return Some((Err(err), state));
                }
                if let Some(frame) = state.parser.feed_line(&String::from_utf8_lossy(&line)) {
                    return Some((Ok(frame), state));
                }
            }

            // an unterminated tail already over the limit
            if state.buffer.len() > state.max_line {
                state.buffer.clear();
                state.discarding = true;
                let err = state.too_long();
                return Some((Err(err), state));
            }

            if state.finished {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => state.push_chunk(&chunk),
                Some(Err(e)) => {
                    state.finished = true;
                    state.buffer.clear();
                    return Some((Err(SseError::Transport(e)), state));
                }
                None => {
                    state.finished = true;
                    if let Some(frame) = state.flush() {
                        return Some((Ok(frame), state));
                    }
                    return None;
                }
            }
        }
    })
}
