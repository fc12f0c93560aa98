//! Database facade
//!
//! Owns the schema registry, the storage handle and the options. Models are
//! registered through `&mut self` during initialization; afterwards the
//! database is shared read-only and hands out [`Model`] adapters.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::Model;
use crate::observability::{DiagnosticSink, Event, LoggerSink};
use crate::query::DEFAULT_LIMIT;
use crate::schema::{
    ModelDefinition, ModelSchema, ResolveReport, ScanReport, SchemaLoader, SchemaRegistry,
    SchemaResult,
};
use crate::storage::Storage;

/// Connection options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseOptions {
    /// Report the SQL of every executed request
    #[serde(default)]
    pub debug: bool,
    /// Page size used by `paginate` when none is given
    #[serde(default = "default_limit")]
    pub default_limit: u64,
}

fn default_limit() -> u64 {
    DEFAULT_LIMIT
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            debug: false,
            default_limit: DEFAULT_LIMIT,
        }
    }
}

pub struct Database {
    registry: SchemaRegistry,
    storage: Arc<dyn Storage>,
    options: DatabaseOptions,
}

impl Database {
    /// Connects with a structured-log sink; debug options include SQL output.
    pub fn connect(storage: Arc<dyn Storage>, options: DatabaseOptions) -> Self {
        let sink: Arc<dyn DiagnosticSink> = if options.debug {
            Arc::new(LoggerSink::verbose())
        } else {
            Arc::new(LoggerSink::default())
        };
        Self::connect_with_sink(storage, options, sink)
    }

    pub fn connect_with_sink(
        storage: Arc<dyn Storage>,
        options: DatabaseOptions,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        let db = Self {
            registry: SchemaRegistry::new(sink),
            storage,
            options,
        };
        db.sink().event(
            Event::Connected,
            &[
                ("debug", &db.options.debug.to_string()),
                ("default_limit", &db.options.default_limit.to_string()),
            ],
        );
        db
    }

    /// Registers one model definition. Relations are not resolved until
    /// `init_relations`.
    pub fn add_model(&mut self, definition: ModelDefinition) -> SchemaResult<&ModelSchema> {
        self.registry.add_model(definition)
    }

    pub fn init_relations(&mut self) -> ResolveReport {
        self.registry.resolve_all()
    }

    /// Registers every definition file in `dir` and resolves relations.
    pub fn scan(&mut self, dir: impl AsRef<Path>) -> SchemaResult<ScanReport> {
        SchemaLoader::new(dir.as_ref()).scan(&mut self.registry)
    }

    /// Forgets every registered model.
    pub fn reset(&mut self) {
        self.registry.reset();
    }

    pub fn model(&self, name: &str) -> SchemaResult<Model<'_>> {
        Ok(Model::new(self, self.registry.get(name)?))
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn options(&self) -> &DatabaseOptions {
        &self.options
    }

    pub fn sink(&self) -> &Arc<dyn DiagnosticSink> {
        self.registry.sink()
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("registry", &self.registry)
            .field("options", &self.options)
            .finish()
    }
}
