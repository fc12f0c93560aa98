//! Schema registry and relation graph
//!
//! Model definitions are registered by name, normalized, and their relation
//! declarations are resolved into join specifications in a separate pass.
//!
//! # Lifecycle
//!
//! 1. `register` / `add_model` (or `SchemaLoader::scan`) for every model
//! 2. `resolve_all` once all models are known
//! 3. read-only lookups via `get`
//!
//! - Model names are unique; the first registration wins
//! - Unknown property types are kept and tagged `unknown`
//! - Failures are reported on the diagnostic sink, never panic

mod errors;
mod loader;
mod registry;
mod relations;
mod types;

pub use errors::{SchemaError, SchemaResult};
pub use loader::{ScanReport, SchemaLoader};
pub use registry::SchemaRegistry;
pub use relations::{
    resolve_all, ColumnRef, JoinSpec, RelationKind, ResolveReport, ResolvedRelation,
};
pub use types::{
    DefaultValue, ModelDefinition, ModelSchema, PropertyDecl, PropertyDef, PropertyType,
    RelationDecl, RelationDecls, SchemaBody, NOW_DEFAULT, PRIMARY_KEY,
};
