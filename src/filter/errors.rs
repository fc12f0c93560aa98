//! Filter compilation errors

use thiserror::Error;

/// Result type for filter compilation
pub type FilterResult<T> = Result<T, FilterError>;

/// Malformed filter objects
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// `$or` value is not a non-empty array of objects
    #[error("Invalid disjunction '{key}': {reason}")]
    InvalidDisjunction { key: String, reason: String },

    /// A nested filter object has no keys
    #[error("Empty filter group")]
    EmptyGroup,

    /// `$`-prefixed key that is not a known operator
    #[error("Unknown operator '{operator}' on field '{field}'")]
    UnknownOperator { field: String, operator: String },

    /// An `in` list contains an object or array
    #[error("Invalid member in value list of field '{field}'")]
    InvalidArrayMember { field: String },

    /// Operator operand of the wrong shape, e.g. a scalar `$in`
    #[error("Invalid operand for '{operator}' on field '{field}'")]
    InvalidOperand { field: String, operator: String },
}

impl FilterError {
    pub fn code(&self) -> &'static str {
        match self {
            FilterError::InvalidDisjunction { .. } => "INVALID_DISJUNCTION",
            FilterError::EmptyGroup => "EMPTY_GROUP",
            FilterError::UnknownOperator { .. } => "UNKNOWN_OPERATOR",
            FilterError::InvalidArrayMember { .. } => "INVALID_ARRAY_MEMBER",
            FilterError::InvalidOperand { .. } => "INVALID_OPERAND",
        }
    }

    pub(crate) fn disjunction(key: &str, reason: impl Into<String>) -> Self {
        FilterError::InvalidDisjunction {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}
