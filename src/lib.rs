//! centaure - schema registry, filter compiler and query layer for
//! relational models

pub mod cli;
pub mod database;
pub mod filter;
pub mod model;
pub mod observability;
pub mod query;
pub mod schema;
pub mod storage;

pub use database::{Database, DatabaseOptions};
pub use model::Model;
pub use query::{Query, QueryError, QueryOutput, QueryResult};
pub use schema::{ModelDefinition, SchemaError, SchemaRegistry};
