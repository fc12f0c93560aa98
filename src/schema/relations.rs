//! Relation graph builder
//!
//! Registration only collects relation declarations. `resolve_all` is the
//! second, flat pass that turns them into join specifications once every
//! model is known, so models may reference each other in any order.
//!
//! - has-many `books: {ref: Book, key: user_id}` on `User`:
//!   `book.user_id` → `user.id` (the key lives on the target table)
//! - belongs-to `author: {ref: User, key: user_id}` on `Book`:
//!   `book.user_id` → `user.id` (the key lives on the source table)

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::observability::Event;

use super::errors::{SchemaError, SchemaResult};
use super::registry::SchemaRegistry;
use super::types::{ModelSchema, RelationDecl, PRIMARY_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    #[serde(rename = "has-many")]
    HasMany,
    #[serde(rename = "belongs-to")]
    BelongsTo,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::HasMany => "has-many",
            RelationKind::BelongsTo => "belongs-to",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `table.column`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// Join condition `from = to`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JoinSpec {
    pub from: ColumnRef,
    pub to: ColumnRef,
}

/// A relation declaration after both endpoints were found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRelation {
    pub kind: RelationKind,
    pub alias: String,
    /// Target model name
    pub model_class: String,
    pub source_table: String,
    pub target_table: String,
    pub foreign_key: String,
    pub join: JoinSpec,
}

impl ResolvedRelation {
    pub fn new(
        kind: RelationKind,
        alias: impl Into<String>,
        source: &ModelSchema,
        target: &ModelSchema,
        foreign_key: impl Into<String>,
    ) -> Self {
        let foreign_key = foreign_key.into();
        let join = match kind {
            RelationKind::HasMany => JoinSpec {
                from: ColumnRef::new(&target.table_name, &foreign_key),
                to: ColumnRef::new(&source.table_name, PRIMARY_KEY),
            },
            RelationKind::BelongsTo => JoinSpec {
                from: ColumnRef::new(&source.table_name, &foreign_key),
                to: ColumnRef::new(&target.table_name, PRIMARY_KEY),
            },
        };

        Self {
            kind,
            alias: alias.into(),
            model_class: target.name.clone(),
            source_table: source.table_name.clone(),
            target_table: target.table_name.clone(),
            foreign_key,
            join,
        }
    }

    /// Column on the source row that identifies related rows
    pub fn source_key(&self) -> &str {
        match self.kind {
            RelationKind::HasMany => PRIMARY_KEY,
            RelationKind::BelongsTo => &self.foreign_key,
        }
    }

    /// Column on the target table matched against `source_key`
    pub fn target_key(&self) -> &str {
        match self.kind {
            RelationKind::HasMany => &self.foreign_key,
            RelationKind::BelongsTo => PRIMARY_KEY,
        }
    }
}

/// Outcome of one resolution pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveReport {
    /// Declarations that produced a relation
    pub resolved: usize,
    /// Declarations that were skipped, as `UnresolvedRelation` errors
    pub unresolved: Vec<SchemaError>,
}

impl ResolveReport {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Resolves every pending declaration and replaces each model's relation map.
///
/// Idempotent: relation maps are rebuilt from the declarations on every call.
/// Unresolvable declarations are reported and left out; they never stop the
/// pass. An alias declared both ways on one model ends up as belongs-to.
pub fn resolve_all(registry: &mut SchemaRegistry) -> ResolveReport {
    let mut report = ResolveReport::default();
    let mut relations: BTreeMap<String, BTreeMap<String, ResolvedRelation>> = BTreeMap::new();

    for kind in [RelationKind::HasMany, RelationKind::BelongsTo] {
        for (source_name, declarations) in registry.pending(kind) {
            let Ok(source) = registry.get(source_name) else {
                continue;
            };

            for (alias, declaration) in declarations {
                match resolve_one(registry, source, kind, alias, declaration) {
                    Ok(relation) => {
                        registry.sink().event(
                            Event::RelationResolved,
                            &[
                                ("model", source_name.as_str()),
                                ("alias", alias.as_str()),
                                ("kind", kind.as_str()),
                                ("join", &format!("{} = {}", relation.join.from, relation.join.to)),
                            ],
                        );
                        relations
                            .entry(source_name.clone())
                            .or_default()
                            .insert(alias.clone(), relation);
                        report.resolved += 1;
                    }
                    Err(err) => {
                        registry.report(&err);
                        report.unresolved.push(err);
                    }
                }
            }
        }
    }

    registry.replace_relations(relations);

    registry.sink().event(
        Event::RelationsInitialized,
        &[
            ("resolved", &report.resolved.to_string()),
            ("unresolved", &report.unresolved.len().to_string()),
        ],
    );

    report
}

fn resolve_one(
    registry: &SchemaRegistry,
    source: &ModelSchema,
    kind: RelationKind,
    alias: &str,
    declaration: &RelationDecl,
) -> SchemaResult<ResolvedRelation> {
    let unresolved = |reason: &str| SchemaError::UnresolvedRelation {
        model: source.name.clone(),
        alias: alias.to_string(),
        target: declaration.target.clone(),
        reason: reason.to_string(),
    };

    let target = registry
        .get(&declaration.target)
        .map_err(|_| unresolved("target model not found"))?;

    if declaration.key.trim().is_empty() {
        return Err(unresolved("missing foreign key"));
    }

    Ok(ResolvedRelation::new(kind, alias, source, target, &declaration.key))
}
