//! Query error types
//!
//! Request building fails fast. Storage errors are passed through unchanged.

use thiserror::Error;

use crate::filter::FilterError;
use crate::schema::SchemaError;
use crate::storage::StorageError;

pub type QueryResult<T> = Result<T, QueryError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// Builder method not valid for this request
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    /// Populate path names a relation the model does not have
    #[error("Unknown relation '{alias}' on model '{model}'")]
    UnknownRelation { model: String, alias: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Execution(#[from] StorageError),
}

impl QueryError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        QueryError::InvalidOperation(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            QueryError::InvalidOperation(_) => "INVALID_OPERATION",
            QueryError::Filter(err) => err.code(),
            QueryError::UnknownRelation { .. } => "UNKNOWN_RELATION",
            QueryError::Schema(err) => err.code(),
            QueryError::Execution(err) => err.code(),
        }
    }
}
