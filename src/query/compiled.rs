//! Compiled requests and their execution
//!
//! A [`CompiledQuery`] holds the lowered predicate and a storage statement.
//! Executing it consumes it and yields a [`QueryOutput`].

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::database::Database;
use crate::filter::{Predicate, WhereClause};
use crate::observability::Event;
use crate::schema::ModelSchema;
use crate::storage::{count_sql, delete_sql, insert_sql, update_sql, Page, Row, SelectPlan};

use super::errors::{QueryError, QueryResult};
use super::populate::{self, PopulateNode};
use super::projection::Projection;

/// Operation kind of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    Select,
    Insert,
    Update,
    Delete,
    Count,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Select => "select",
            QueryKind::Insert => "insert",
            QueryKind::Update => "update",
            QueryKind::Delete => "delete",
            QueryKind::Count => "count",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Storage statement of a compiled request
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectPlan),
    Count {
        table: String,
        clause: WhereClause,
    },
    Insert {
        table: String,
        row: Row,
    },
    Update {
        table: String,
        clause: WhereClause,
        patch: Row,
        limit: Option<usize>,
    },
    Delete {
        table: String,
        clause: WhereClause,
    },
}

impl Statement {
    /// SQL text with `?` placeholders and the bindings in order
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        match self {
            Statement::Select(plan) => plan.to_sql(),
            Statement::Count { table, clause } => count_sql(table, clause),
            Statement::Insert { table, row } => insert_sql(table, row),
            Statement::Update {
                table,
                clause,
                patch,
                limit,
            } => {
                let (mut sql, bindings) = update_sql(table, patch, clause);
                if let Some(limit) = limit {
                    sql.push_str(&format!(" limit {}", limit));
                }
                (sql, bindings)
            }
            Statement::Delete { table, clause } => delete_sql(table, clause),
        }
    }
}

/// Result of an executed request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryOutput {
    Rows(Vec<Row>),
    /// `find_one`: first matching row, if any
    Row(Option<Row>),
    Count(u64),
    /// Rows changed by an update or delete
    Affected(u64),
    /// Row as stored by an insert
    Inserted(Row),
}

impl QueryOutput {
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            QueryOutput::Rows(rows) => rows,
            QueryOutput::Row(row) => row.into_iter().collect(),
            QueryOutput::Inserted(row) => vec![row],
            QueryOutput::Count(_) | QueryOutput::Affected(_) => Vec::new(),
        }
    }

    pub fn into_row(self) -> Option<Row> {
        self.into_rows().into_iter().next()
    }

    /// Count, or number of affected rows
    pub fn as_count(&self) -> Option<u64> {
        match self {
            QueryOutput::Count(n) | QueryOutput::Affected(n) => Some(*n),
            _ => None,
        }
    }

    fn size(&self) -> u64 {
        match self {
            QueryOutput::Rows(rows) => rows.len() as u64,
            QueryOutput::Row(row) => row.is_some() as u64,
            QueryOutput::Inserted(_) => 1,
            QueryOutput::Count(n) | QueryOutput::Affected(n) => *n,
        }
    }
}

/// A request with its predicate built and selection finalized
#[derive(Debug)]
pub struct CompiledQuery<'a> {
    pub(crate) db: &'a Database,
    pub(crate) schema: &'a ModelSchema,
    pub(crate) kind: QueryKind,
    pub(crate) tree: Option<Predicate>,
    pub(crate) statement: Statement,
    pub(crate) projection: Projection,
    pub(crate) populate: Vec<PopulateNode>,
    pub(crate) first: bool,
}

impl<'a> CompiledQuery<'a> {
    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    /// Predicate tree of the filter; `None` when the filter was empty
    pub fn tree(&self) -> Option<&Predicate> {
        self.tree.as_ref()
    }

    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    pub fn to_sql(&self) -> (String, Vec<Value>) {
        self.statement.to_sql()
    }

    /// Runs the statement and post-processes the result.
    pub async fn execute(self) -> QueryResult<QueryOutput> {
        let storage = self.db.storage();
        let sql = self.trace();

        let output = match &self.statement {
            Statement::Select(plan) => {
                let mut rows = storage.select(plan).await?;
                self.finish(&mut rows).await?;
                if self.first {
                    QueryOutput::Row(rows.into_iter().next())
                } else {
                    QueryOutput::Rows(rows)
                }
            }
            Statement::Count { table, clause } => {
                QueryOutput::Count(storage.count(table, clause).await?)
            }
            Statement::Insert { table, row } => {
                QueryOutput::Inserted(storage.insert(table, row.clone()).await?)
            }
            Statement::Update {
                table,
                clause,
                patch,
                limit,
            } => QueryOutput::Affected(storage.patch(table, clause, patch, *limit).await?),
            Statement::Delete { table, clause } => {
                QueryOutput::Affected(storage.delete(table, clause).await?)
            }
        };

        tracing::debug!(
            target: "centaure",
            model = %self.schema.name,
            kind = %self.kind,
            sql = %sql,
            rows = output.size(),
            "query executed"
        );

        Ok(output)
    }

    /// Runs a select over rows `start..=end` and reports the total count.
    pub async fn execute_range(self, start: usize, end: usize) -> QueryResult<Page> {
        let Statement::Select(plan) = &self.statement else {
            return Err(QueryError::invalid(format!(
                "Invalid 'paginate' for operation {}",
                self.kind
            )));
        };

        let sql = self.trace();
        let mut page = self.db.storage().select_range(plan, start, end).await?;
        self.finish(&mut page.results).await?;

        tracing::debug!(
            target: "centaure",
            model = %self.schema.name,
            sql = %sql,
            start,
            end,
            total = page.total,
            "page executed"
        );

        Ok(page)
    }

    async fn finish(&self, rows: &mut [Row]) -> QueryResult<()> {
        if !self.populate.is_empty() {
            populate::load(self.db, self.schema, rows, &self.populate).await?;
        }

        let keep: Vec<&str> = self.populate.iter().map(|n| n.alias.as_str()).collect();
        for row in rows.iter_mut() {
            self.projection.apply(row, &keep);
        }
        Ok(())
    }

    /// Renders the statement and reports it when debug output is enabled.
    fn trace(&self) -> String {
        let (sql, bindings) = self.statement.to_sql();
        if self.db.options().debug {
            let bindings = Value::Array(bindings).to_string();
            self.db.sink().event(
                Event::QueryExecuted,
                &[
                    ("model", self.schema.name.as_str()),
                    ("kind", self.kind.as_str()),
                    ("sql", sql.as_str()),
                    ("bindings", bindings.as_str()),
                ],
            );
        }
        sql
    }
}
