//! Event stream read loop.

use std::sync::Arc;

use futures_util::StreamExt;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::client::Session;
use super::outcome::{classify_http_error, TransportOutcome};
use crate::bus::EventBus;
use crate::error::StreamError;
use crate::events::TopicLayout;
use crate::items::ItemRegistry;
use crate::sse::{frames, SseError};
use crate::traits::{EventParser, Headers, HttpError};

pub const EVENTS_PATH: &str = "/rest/events";

/// Why the read loop stopped.
#[derive(Debug, Error)]
pub(crate) enum StreamEnd {
    #[error("{}", StreamError::Closed)]
    Closed,
    #[error("event stream failed: {0}")]
    Failed(#[source] HttpError),
}

impl StreamEnd {
    /// Whether the stream was lost with the connection rather than broken.
    pub(crate) fn is_disconnect(&self) -> bool {
        match self {
            StreamEnd::Closed => true,
            StreamEnd::Failed(e) => classify_http_error(e) == TransportOutcome::Disconnect,
        }
    }
}

/// Everything the read loop needs for one online session.
pub(crate) struct StreamContext {
    pub session: Session,
    pub layout: TopicLayout,
    pub buffer_size: usize,
    pub parser: Arc<dyn EventParser>,
    pub bus: EventBus,
    pub items: ItemRegistry,
}

impl StreamContext {
    fn url(&self) -> String {
        self.session.url(
            EVENTS_PATH,
            &[("topics".to_string(), self.layout.subscription_topics())],
        )
    }
}

/// Read the event stream until it ends.
///
/// Returns why it ended. A bad frame is logged and skipped; only the end of
/// the body or a transport error stops the loop. Cancellation is by aborting
/// the task.
pub(crate) async fn run(ctx: StreamContext) -> StreamEnd {
    let url = ctx.url();
    let mut headers = Headers::new();
    headers.insert("Accept".to_string(), "text/event-stream".to_string());

    let body = match ctx.session.client.get_stream(&url, &headers).await {
        Ok(body) => body,
        Err(e) => return StreamEnd::Failed(e),
    };
    info!("Event stream connected");

    let mut stream = Box::pin(frames(body, ctx.buffer_size));
    while let Some(item) = stream.next().await {
        let frame = match item {
            Ok(frame) => frame,
            Err(SseError::Frame(e)) => {
                warn!("Skipping frame: {}", e);
                continue;
            }
            Err(SseError::Transport(e)) => return StreamEnd::Failed(e),
        };
        if frame.is_keepalive() || frame.data.is_empty() {
            continue;
        }
        debug!("{}", frame.data);

        let raw: Value = match serde_json::from_str(&frame.data) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Invalid json: {}", e);
                warn!("{}", frame.data);
                continue;
            }
        };

        match ctx.parser.parse(&raw, &ctx.layout) {
            Ok((topic, event)) => {
                ctx.items.apply(&event);
                ctx.bus.publish(&topic, event);
            }
            Err(e @ StreamError::UnknownEventType { .. }) => debug!("{}", e),
            Err(e) => warn!("Could not parse event: {}", e),
        }
    }
    StreamEnd::Closed
}
