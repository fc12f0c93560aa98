//! Diagnostic sinks
//!
//! The registry and the query layer never print directly; they report to a
//! [`DiagnosticSink`] chosen by the host application.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use super::events::Event;
use super::logger::{Logger, Severity};

/// Receiver for `(severity, message)` diagnostics.
///
/// `event` has a default implementation that flattens the structured event
/// into a message, so a sink only has to implement `report`.
pub trait DiagnosticSink: Send + Sync {
    /// Report a free-form diagnostic
    fn report(&self, severity: Severity, message: &str);

    /// Report a typed event with fields
    fn event(&self, event: Event, fields: &[(&str, &str)]) {
        self.report(event.severity(), &format_message(event, fields));
    }
}

/// Renders `EVENT key=value key=value`.
pub fn format_message(event: Event, fields: &[(&str, &str)]) -> String {
    let mut message = event.as_str().to_string();
    for (key, value) in fields {
        message.push(' ');
        message.push_str(key);
        message.push('=');
        message.push_str(value);
    }
    message
}

/// Writes structured JSON lines through [`Logger`].
#[derive(Debug, Clone, Copy)]
pub struct LoggerSink {
    min_severity: Severity,
}

impl LoggerSink {
    pub fn new(min_severity: Severity) -> Self {
        Self { min_severity }
    }

    /// Sink that includes debug output (generated SQL)
    pub fn verbose() -> Self {
        Self::new(Severity::Debug)
    }
}

impl Default for LoggerSink {
    fn default() -> Self {
        Self::new(Severity::Info)
    }
}

impl DiagnosticSink for LoggerSink {
    fn report(&self, severity: Severity, message: &str) {
        if severity >= self.min_severity {
            Logger::log(severity, "DIAGNOSTIC", &[("message", message)]);
        }
    }

    fn event(&self, event: Event, fields: &[(&str, &str)]) {
        if event.severity() >= self.min_severity {
            Logger::log(event.severity(), event.as_str(), fields);
        }
    }
}

/// Forwards diagnostics to the `tracing` ecosystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Debug => tracing::debug!(target: "centaure", "{}", message),
            Severity::Info => tracing::info!(target: "centaure", "{}", message),
            Severity::Warn => tracing::warn!(target: "centaure", "{}", message),
            Severity::Error => tracing::error!(target: "centaure", "{}", message),
        }
    }
}

/// A recorded diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<&'static str>,
    pub message: String,
}

/// Collects diagnostics in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.records().clone()
    }

    /// Recorded diagnostics at warning level or above
    pub fn problems(&self) -> Vec<Diagnostic> {
        self.diagnostics()
            .into_iter()
            .filter(|d| d.severity >= Severity::Warn)
            .collect()
    }

    /// Number of times `event` was recorded
    pub fn count(&self, event: Event) -> usize {
        self.diagnostics()
            .iter()
            .filter(|d| d.event == Some(event.as_str()))
            .count()
    }

    pub fn clear(&self) {
        self.records().clear();
    }

    fn push(&self, diagnostic: Diagnostic) {
        self.records().push(diagnostic);
    }

    /// Poisoning is ignored; records are only ever appended or cleared.
    fn records(&self) -> MutexGuard<'_, Vec<Diagnostic>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DiagnosticSink for MemorySink {
    fn report(&self, severity: Severity, message: &str) {
        self.push(Diagnostic {
            severity,
            event: None,
            message: message.to_string(),
        });
    }

    fn event(&self, event: Event, fields: &[(&str, &str)]) {
        self.push(Diagnostic {
            severity: event.severity(),
            event: Some(event.as_str()),
            message: format_message(event, fields),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_message() {
        let message = format_message(Event::ModelConflict, &[("model", "User")]);
        assert_eq!(message, "MODEL_CONFLICT model=User");
    }

    #[test]
    fn test_memory_sink_records_events() {
        let sink = MemorySink::new();
        sink.event(Event::ModelRegistered, &[("model", "User")]);
        sink.event(Event::RelationUnresolved, &[("alias", "books")]);
        sink.report(Severity::Error, "boom");

        assert_eq!(sink.diagnostics().len(), 3);
        assert_eq!(sink.problems().len(), 2);
        assert_eq!(sink.count(Event::RelationUnresolved), 1);

        sink.clear();
        assert!(sink.diagnostics().is_empty());
    }

    #[test]
    fn test_memory_sink_survives_poisoned_lock() {
        let sink = std::sync::Arc::new(MemorySink::new());
        sink.event(Event::ModelRegistered, &[("model", "User")]);

        let poisoner = sink.clone();
        let joined = std::thread::spawn(move || {
            let _guard = poisoner.records.lock().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(joined.is_err());
        assert!(sink.records.is_poisoned());

        sink.event(Event::ModelRegistered, &[("model", "Book")]);
        assert_eq!(sink.count(Event::ModelRegistered), 2);
    }

    #[test]
    fn test_default_event_goes_through_report() {
        struct Last(Mutex<Option<(Severity, String)>>);
        impl DiagnosticSink for Last {
            fn report(&self, severity: Severity, message: &str) {
                *self.0.lock().unwrap() = Some((severity, message.to_string()));
            }
        }

        let sink = Last(Mutex::new(None));
        sink.event(Event::MissingSchema, &[("model", "Book")]);
        let (severity, message) = sink.0.lock().unwrap().clone().unwrap();
        assert_eq!(severity, Severity::Warn);
        assert_eq!(message, "MISSING_SCHEMA model=Book");
    }
}
