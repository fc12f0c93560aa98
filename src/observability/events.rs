//! Observable events
//!
//! Every diagnostic the registry, the relation graph and the query layer emit
//! is one of these.

use std::fmt;

use super::logger::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    // Lifecycle
    /// Database facade created
    Connected,
    /// Registry cleared
    RegistryReset,
    /// Model directory scanned
    SchemaScanned,

    // Registration
    /// Model registered
    ModelRegistered,
    /// Model name already registered
    ModelConflict,
    /// Model definition without a name
    MissingModelName,
    /// Model definition without properties
    MissingSchema,
    /// Property declared with a type outside the known set
    UnknownPropertyType,
    /// Model definition file could not be read or parsed
    MalformedDefinition,

    // Relations
    /// One relation resolved
    RelationResolved,
    /// Relation declaration could not be resolved
    RelationUnresolved,
    /// Resolution pass finished
    RelationsInitialized,

    // Queries
    /// A property value was dropped or defaulted during coercion
    PropertyCoercion,
    /// A request was executed
    QueryExecuted,
}

impl Event {
    /// Returns the event name used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::Connected => "CONNECTED",
            Event::RegistryReset => "REGISTRY_RESET",
            Event::SchemaScanned => "SCHEMA_SCANNED",
            Event::ModelRegistered => "MODEL_REGISTERED",
            Event::ModelConflict => "MODEL_CONFLICT",
            Event::MissingModelName => "MISSING_MODEL_NAME",
            Event::MissingSchema => "MISSING_SCHEMA",
            Event::UnknownPropertyType => "UNKNOWN_PROPERTY_TYPE",
            Event::MalformedDefinition => "MALFORMED_DEFINITION",
            Event::RelationResolved => "RELATION_RESOLVED",
            Event::RelationUnresolved => "RELATION_UNRESOLVED",
            Event::RelationsInitialized => "RELATIONS_INITIALIZED",
            Event::PropertyCoercion => "PROPERTY_COERCION",
            Event::QueryExecuted => "QUERY_EXECUTED",
        }
    }

    /// Default severity for this event
    pub fn severity(&self) -> Severity {
        match self {
            Event::ModelConflict
            | Event::MissingModelName
            | Event::MissingSchema
            | Event::UnknownPropertyType
            | Event::MalformedDefinition
            | Event::RelationUnresolved
            | Event::PropertyCoercion => Severity::Warn,
            Event::RelationResolved | Event::QueryExecuted => Severity::Debug,
            Event::Connected
            | Event::RegistryReset
            | Event::SchemaScanned
            | Event::ModelRegistered
            | Event::RelationsInitialized => Severity::Info,
        }
    }

    /// Returns whether this event reports a fail-soft problem
    pub fn is_problem(&self) -> bool {
        self.severity() >= Severity::Warn
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
