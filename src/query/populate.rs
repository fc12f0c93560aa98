//! Eager relation loading
//!
//! A populate expression names relations to attach to every returned row:
//!
//! ```text
//! books                     one relation
//! books.author              nested: each book gets its author
//! [books,author]            several relations
//! books.[author,publisher]  several nested relations
//! ```
//!
//! has-many relations attach an array, belongs-to relations attach an object
//! or `null`. Loading issues one `in` query per relation and level.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::database::Database;
use crate::filter::{values_equal, Condition, WhereClause};
use crate::schema::{ModelSchema, RelationKind, SchemaRegistry, PRIMARY_KEY};
use crate::storage::{OrderBy, Row, SelectPlan};

use super::errors::{QueryError, QueryResult};

/// Populate argument as accepted by `Query::populate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Populate {
    /// Relation expression, e.g. `books.author`
    Expr(String),
    List(Vec<Populate>),
    /// `{ path: "books", populate: "author" }`
    Nested {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        populate: Option<Box<Populate>>,
    },
}

impl Populate {
    pub fn nested(path: impl Into<String>, populate: impl Into<Populate>) -> Self {
        Populate::Nested {
            path: path.into(),
            populate: Some(Box::new(populate.into())),
        }
    }

    /// Flattens to the relation expression syntax.
    pub fn to_expression(&self) -> String {
        match self {
            Populate::Expr(expr) => expr.clone(),
            Populate::List(items) => format!(
                "[{}]",
                items
                    .iter()
                    .map(Populate::to_expression)
                    .collect::<Vec<_>>()
                    .join(",")
            ),
            Populate::Nested { path, populate } => match populate {
                Some(populate) => format!("{}.{}", path, populate.to_expression()),
                None => path.clone(),
            },
        }
    }

    /// Parses into relation nodes, merging repeated aliases.
    pub fn parse(&self) -> QueryResult<Vec<PopulateNode>> {
        let expression = self.to_expression();
        let compact: String = expression.chars().filter(|c| !c.is_whitespace()).collect();
        let mut parser = Parser {
            input: compact.as_bytes(),
            pos: 0,
        };

        let nodes = parser.list()?;
        if parser.pos != parser.input.len() {
            return Err(parser.error());
        }
        Ok(merge(nodes))
    }
}

impl From<&str> for Populate {
    fn from(expr: &str) -> Self {
        Populate::Expr(expr.to_string())
    }
}

impl From<String> for Populate {
    fn from(expr: String) -> Self {
        Populate::Expr(expr)
    }
}

impl<T: Into<Populate>> From<Vec<T>> for Populate {
    fn from(items: Vec<T>) -> Self {
        Populate::List(items.into_iter().map(Into::into).collect())
    }
}

/// One relation to load, with the relations to load below it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulateNode {
    pub alias: String,
    pub children: Vec<PopulateNode>,
}

impl PopulateNode {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            children: Vec::new(),
        }
    }
}

struct Parser<'s> {
    input: &'s [u8],
    pos: usize,
}

impl Parser<'_> {
    fn list(&mut self) -> QueryResult<Vec<PopulateNode>> {
        if !self.eat(b'[') {
            return Ok(vec![self.item()?]);
        }

        let mut nodes = Vec::new();
        loop {
            nodes.extend(self.list()?);
            if self.eat(b',') {
                continue;
            }
            if self.eat(b']') {
                return Ok(nodes);
            }
            return Err(self.error());
        }
    }

    fn item(&mut self) -> QueryResult<PopulateNode> {
        let start = self.pos;
        while self
            .input
            .get(self.pos)
            .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_' || *b == b'$')
        {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error());
        }

        let alias = String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();
        let children = if self.eat(b'.') { self.list()? } else { Vec::new() };
        Ok(PopulateNode { alias, children })
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.input.get(self.pos) == Some(&byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error(&self) -> QueryError {
        QueryError::invalid(format!(
            "Invalid populate expression '{}' at offset {}",
            String::from_utf8_lossy(self.input),
            self.pos
        ))
    }
}

fn merge(nodes: Vec<PopulateNode>) -> Vec<PopulateNode> {
    let mut merged: Vec<PopulateNode> = Vec::new();
    for node in nodes {
        match merged.iter_mut().find(|m| m.alias == node.alias) {
            Some(existing) => {
                let children = std::mem::take(&mut existing.children);
                existing.children = merge(children.into_iter().chain(node.children).collect());
            }
            None => merged.push(PopulateNode {
                alias: node.alias,
                children: merge(node.children),
            }),
        }
    }
    merged
}

/// Checks every alias in the tree against the relation graph.
pub(crate) fn validate(
    registry: &SchemaRegistry,
    schema: &ModelSchema,
    nodes: &[PopulateNode],
) -> QueryResult<()> {
    for node in nodes {
        let relation = lookup(schema, &node.alias)?;
        if !node.children.is_empty() {
            validate(registry, registry.get(&relation.model_class)?, &node.children)?;
        }
    }
    Ok(())
}

type LoadFuture<'b> = Pin<Box<dyn Future<Output = QueryResult<()>> + Send + 'b>>;

/// Attaches the relations in `nodes` to `rows`.
pub(crate) fn load<'b>(
    db: &'b Database,
    schema: &'b ModelSchema,
    rows: &'b mut [Row],
    nodes: &'b [PopulateNode],
) -> LoadFuture<'b> {
    Box::pin(async move {
        for node in nodes {
            let relation = lookup(schema, &node.alias)?;
            let target = db.registry().get(&relation.model_class)?;
            let source_key = relation.source_key();
            let target_key = relation.target_key();

            let mut keys: Vec<Value> = Vec::new();
            for key in rows.iter().filter_map(|row| row.get(source_key)) {
                if !key.is_null() && !keys.iter().any(|k| values_equal(k, key)) {
                    keys.push(key.clone());
                }
            }

            let mut related = if keys.is_empty() {
                Vec::new()
            } else {
                let clause = WhereClause::new().and_where(Condition::in_list(target_key, keys));
                let mut plan = SelectPlan::new(&target.table_name, clause);
                plan.order.push(OrderBy::asc(PRIMARY_KEY));
                db.storage().select(&plan).await?
            };

            if !node.children.is_empty() {
                load(db, target, &mut related, &node.children).await?;
            }

            for row in rows.iter_mut() {
                let key = row.get(source_key).cloned().unwrap_or(Value::Null);
                let linked = |candidate: &&Row| {
                    candidate
                        .get(target_key)
                        .is_some_and(|value| values_equal(value, &key))
                };
                let value = match relation.kind {
                    RelationKind::HasMany => Value::Array(
                        related
                            .iter()
                            .filter(linked)
                            .cloned()
                            .map(Value::Object)
                            .collect(),
                    ),
                    RelationKind::BelongsTo => related
                        .iter()
                        .find(linked)
                        .cloned()
                        .map(Value::Object)
                        .unwrap_or(Value::Null),
                };
                row.insert(node.alias.clone(), value);
            }
        }
        Ok(())
    })
}

fn lookup<'s>(
    schema: &'s ModelSchema,
    alias: &str,
) -> QueryResult<&'s crate::schema::ResolvedRelation> {
    schema
        .relation(alias)
        .ok_or_else(|| QueryError::UnknownRelation {
            model: schema.name.clone(),
            alias: alias.to_string(),
        })
}
