//! Event model, listener filters and the default stream parser.

mod filter;
pub mod parse;
mod types;

pub use filter::EventFilter;
pub use parse::{OpenhabEventParser, TopicLayout};
pub use types::{ErrorEvent, Event, EventKind, ItemDefinition};

/// Topic on which callback failures are published.
pub const ERRORS_TOPIC: &str = "errors";
