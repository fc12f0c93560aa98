//! Schema registry
//!
//! Name → normalized model schema, plus the relation declarations collected
//! at registration time and consumed by [`resolve_all`](super::resolve_all).
//!
//! Registration is fail-soft. A rejected definition is reported on the
//! diagnostic sink and returned as an error; the registry is left unchanged.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::observability::{DiagnosticSink, Event, LoggerSink};

use super::errors::{SchemaError, SchemaResult};
use super::relations::{self, RelationKind, ResolveReport, ResolvedRelation};
use super::types::{ModelDefinition, ModelSchema, PropertyDecl, RelationDecls};

pub struct SchemaRegistry {
    models: BTreeMap<String, ModelSchema>,
    has_many: BTreeMap<String, RelationDecls>,
    belongs_to: BTreeMap<String, RelationDecls>,
    sink: Arc<dyn DiagnosticSink>,
}

impl SchemaRegistry {
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            models: BTreeMap::new(),
            has_many: BTreeMap::new(),
            belongs_to: BTreeMap::new(),
            sink,
        }
    }

    /// Registers a model.
    ///
    /// Checks, in order: empty name, missing properties, duplicate name.
    /// Relation declarations are stored for the next resolution pass only
    /// when registration succeeds.
    pub fn register(
        &mut self,
        name: &str,
        properties: Option<BTreeMap<String, PropertyDecl>>,
        has_many: Option<RelationDecls>,
        belongs_to: Option<RelationDecls>,
    ) -> SchemaResult<&ModelSchema> {
        let name = name.trim();
        if name.is_empty() {
            return Err(self.reject(SchemaError::MissingModelName));
        }

        let Some(properties) = properties else {
            return Err(self.reject(SchemaError::MissingSchema(name.to_string())));
        };

        if self.models.contains_key(name) {
            return Err(self.reject(SchemaError::DuplicateModel(name.to_string())));
        }

        let schema = ModelSchema::new(name, &properties);

        for (field, def) in schema.unknown_properties() {
            self.sink.event(
                Event::UnknownPropertyType,
                &[("model", name), ("property", field), ("type", &def.declared_type)],
            );
        }

        if let Some(decls) = has_many.filter(|decls| !decls.is_empty()) {
            self.has_many.insert(name.to_string(), decls);
        }
        if let Some(decls) = belongs_to.filter(|decls| !decls.is_empty()) {
            self.belongs_to.insert(name.to_string(), decls);
        }

        self.sink.event(
            Event::ModelRegistered,
            &[
                ("model", name),
                ("table", &schema.table_name),
                ("properties", &schema.properties.len().to_string()),
            ],
        );

        Ok(self.models.entry(name.to_string()).or_insert(schema))
    }

    /// Registers a model from its definition form.
    pub fn add_model(&mut self, definition: ModelDefinition) -> SchemaResult<&ModelSchema> {
        let name = definition.name.unwrap_or_default();
        let body = definition.schema.unwrap_or_default();
        self.register(&name, body.properties, body.has_many, body.belongs_to)
    }

    pub fn get(&self, name: &str) -> SchemaResult<&ModelSchema> {
        self.models
            .get(name)
            .ok_or_else(|| SchemaError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Registered models in name order
    pub fn models(&self) -> impl Iterator<Item = &ModelSchema> {
        self.models.values()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Drops every model and pending declaration.
    pub fn reset(&mut self) {
        let dropped = self.models.len();
        self.models.clear();
        self.has_many.clear();
        self.belongs_to.clear();
        self.sink
            .event(Event::RegistryReset, &[("models", &dropped.to_string())]);
    }

    /// Runs a full relation resolution pass.
    pub fn resolve_all(&mut self) -> ResolveReport {
        relations::resolve_all(self)
    }

    pub fn sink(&self) -> &Arc<dyn DiagnosticSink> {
        &self.sink
    }

    /// Reports an error on the sink, if it maps to an event.
    pub(crate) fn report(&self, err: &SchemaError) {
        if let Some(event) = err.event() {
            let fields = err.fields();
            let borrowed: Vec<(&str, &str)> = fields
                .iter()
                .map(|(key, value)| (*key, value.as_str()))
                .collect();
            self.sink.event(event, &borrowed);
        }
    }

    /// Declarations of one kind, keyed by source model
    pub(crate) fn pending(&self, kind: RelationKind) -> &BTreeMap<String, RelationDecls> {
        match kind {
            RelationKind::HasMany => &self.has_many,
            RelationKind::BelongsTo => &self.belongs_to,
        }
    }

    /// Replaces every model's relation map. Models absent from `relations`
    /// end up with none.
    pub(crate) fn replace_relations(
        &mut self,
        mut relations: BTreeMap<String, BTreeMap<String, ResolvedRelation>>,
    ) {
        for (name, schema) in self.models.iter_mut() {
            schema.relations = relations.remove(name).unwrap_or_default();
        }
    }

    fn reject(&self, err: SchemaError) -> SchemaError {
        self.report(&err);
        err
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new(Arc::new(LoggerSink::default()))
    }
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("models", &self.models.keys().collect::<Vec<_>>())
            .finish()
    }
}
