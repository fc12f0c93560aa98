//! Schema error types
//!
//! Registry errors are fail-soft: they are reported on the diagnostic sink,
//! the offending operation is skipped and the registry stays usable.

use thiserror::Error;

use crate::observability::Event;

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Model name already registered
    #[error("Model name conflicted: {0}")]
    DuplicateModel(String),

    /// Definition without a name
    #[error("Missing model name")]
    MissingModelName,

    /// Definition without properties
    #[error("Missing schema for model {0}")]
    MissingSchema(String),

    /// Lookup of an unregistered model
    #[error("Model not found: {0}")]
    NotFound(String),

    /// Relation whose target is missing or whose key is empty
    #[error("Relation '{alias}' of model '{model}' unresolved: {reason} (ref '{target}')")]
    UnresolvedRelation {
        model: String,
        alias: String,
        target: String,
        reason: String,
    },

    /// Definition file that could not be read or parsed
    #[error("Malformed model definition '{path}': {reason}")]
    MalformedDefinition { path: String, reason: String },
}

impl SchemaError {
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::DuplicateModel(_) => "DUPLICATE_MODEL",
            SchemaError::MissingModelName => "MISSING_MODEL_NAME",
            SchemaError::MissingSchema(_) => "MISSING_SCHEMA",
            SchemaError::NotFound(_) => "MODEL_NOT_FOUND",
            SchemaError::UnresolvedRelation { .. } => "UNRESOLVED_RELATION",
            SchemaError::MalformedDefinition { .. } => "MALFORMED_DEFINITION",
        }
    }

    /// Diagnostic event reported for this error, if any
    pub fn event(&self) -> Option<Event> {
        match self {
            SchemaError::DuplicateModel(_) => Some(Event::ModelConflict),
            SchemaError::MissingModelName => Some(Event::MissingModelName),
            SchemaError::MissingSchema(_) => Some(Event::MissingSchema),
            SchemaError::UnresolvedRelation { .. } => Some(Event::RelationUnresolved),
            SchemaError::MalformedDefinition { .. } => Some(Event::MalformedDefinition),
            SchemaError::NotFound(_) => None,
        }
    }

    /// Structured fields for the diagnostic sink
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            SchemaError::DuplicateModel(model)
            | SchemaError::MissingSchema(model)
            | SchemaError::NotFound(model) => vec![("model", model.clone())],
            SchemaError::MissingModelName => vec![],
            SchemaError::UnresolvedRelation {
                model,
                alias,
                target,
                reason,
            } => vec![
                ("model", model.clone()),
                ("alias", alias.clone()),
                ("ref", target.clone()),
                ("reason", reason.clone()),
            ],
            SchemaError::MalformedDefinition { path, reason } => {
                vec![("path", path.clone()), ("reason", reason.clone())]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(SchemaError::DuplicateModel("User".into()).code(), "DUPLICATE_MODEL");
        assert_eq!(SchemaError::MissingModelName.code(), "MISSING_MODEL_NAME");
        assert_eq!(SchemaError::NotFound("X".into()).code(), "MODEL_NOT_FOUND");
    }

    #[test]
    fn test_display_names_the_model() {
        let err = SchemaError::UnresolvedRelation {
            model: "User".into(),
            alias: "books".into(),
            target: "Book".into(),
            reason: "target model not found".into(),
        };
        let display = err.to_string();
        assert!(display.contains("User"));
        assert!(display.contains("books"));
        assert!(display.contains("Book"));
        assert_eq!(err.event(), Some(Event::RelationUnresolved));
    }

    #[test]
    fn test_lookup_failures_are_not_reported() {
        assert_eq!(SchemaError::NotFound("X".into()).event(), None);
    }
}
