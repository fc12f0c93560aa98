//! Observability for centaure
//!
//! - Structured logging (JSON lines)
//! - Typed diagnostic events
//! - Pluggable diagnostic sinks (logger, `tracing`, in-memory)
//!
//! Observability is read-only: a sink can never fail the operation that
//! reports to it.
//!
//! # Usage
//!
//! ```ignore
//! use centaure::observability::{Event, Logger, MemorySink, DiagnosticSink};
//!
//! Logger::info("SCHEMA_SCANNED", &[("models", "2")]);
//!
//! let sink = MemorySink::new();
//! sink.event(Event::ModelConflict, &[("model", "User")]);
//! assert_eq!(sink.problems().len(), 1);
//! ```

mod events;
mod logger;
mod sink;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use sink::{format_message, Diagnostic, DiagnosticSink, LoggerSink, MemorySink, TracingSink};
