//! Failures raised by user callbacks.
//!
//! A callback failure never leaves the executor. It is logged with its
//! rendered cause chain and turned into an
//! [`ErrorEvent`](crate::events::ErrorEvent) on the `errors` topic.

use std::any::Any;
use std::fmt::Write;

use color_eyre::eyre::Report;
use thiserror::Error;

/// A failed or panicked callback invocation.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("error in {name}: {description}")]
pub struct CallbackError {
    /// Name of the wrapped callback.
    pub name: String,
    /// One-line description of the failure.
    pub description: String,
    /// Rendered cause chain, one cause per line.
    pub trace: String,
}

impl CallbackError {
    /// Build from an error returned by the callback.
    pub fn from_report(name: &str, report: &Report) -> Self {
        let mut trace = String::new();
        for (idx, cause) in report.chain().enumerate() {
            let _ = writeln!(trace, "{:>3}: {}", idx, cause);
        }
        Self {
            name: name.to_string(),
            description: report.to_string(),
            trace: trace.trim_end().to_string(),
        }
    }

    /// Build from a caught panic payload.
    pub fn from_panic(name: &str, payload: Box<dyn Any + Send>) -> Self {
        let description = if let Some(msg) = payload.downcast_ref::<&str>() {
            (*msg).to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "callback panicked".to_string()
        };
        Self {
            name: name.to_string(),
            trace: format!("  0: panicked: {}", description),
            description,
        }
    }

    /// Trace lines, for line-by-line logging.
    pub fn trace_lines(&self) -> impl Iterator<Item = &str> {
        self.trace.lines()
    }
}
