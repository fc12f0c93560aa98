//! In-memory storage backend
//!
//! Tables are vectors of rows in insertion order behind a tokio `RwLock`.
//! Primary keys are auto-incremented integers. Ordering puts `null` and
//! missing values first, as SQLite does.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::filter::{compare_values, WhereClause};
use crate::schema::PRIMARY_KEY;

use super::errors::{StorageError, StorageResult};
use super::plan::{Direction, OrderBy, Page, Row, SelectPlan};
use super::Storage;

#[derive(Debug, Default)]
struct Table {
    rows: Vec<Row>,
    next_id: u64,
}

impl Table {
    fn assign_id(&mut self, row: Row) -> StorageResult<Row> {
        let id = match row.get(PRIMARY_KEY) {
            None | Some(Value::Null) => {
                self.next_id += 1;
                self.next_id
            }
            Some(Value::Number(n)) => {
                let id = n.as_u64().ok_or_else(|| {
                    StorageError::execution(format!("Invalid primary key: {}", n))
                })?;
                if self.rows.iter().any(|r| r.get(PRIMARY_KEY) == Some(&Value::from(id))) {
                    return Err(StorageError::execution(format!(
                        "Duplicate primary key: {}",
                        id
                    )));
                }
                self.next_id = self.next_id.max(id);
                id
            }
            Some(other) => {
                return Err(StorageError::execution(format!(
                    "Invalid primary key: {}",
                    other
                )))
            }
        };

        let mut stored = Row::new();
        stored.insert(PRIMARY_KEY.to_string(), Value::from(id));
        for (column, value) in row {
            if column != PRIMARY_KEY {
                stored.insert(column, value);
            }
        }
        Ok(stored)
    }

    fn matching(&self, plan: &SelectPlan) -> Vec<&Row> {
        let mut rows: Vec<&Row> = self
            .rows
            .iter()
            .filter(|row| plan.clause.matches(row))
            .collect();
        if !plan.order.is_empty() {
            rows.sort_by(|a, b| order_rows(a, b, &plan.order));
        }
        rows
    }
}

/// Reference backend keeping every table in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with the given empty tables
    pub fn with_tables<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tables = tables
            .into_iter()
            .map(|name| (name.into(), Table::default()))
            .collect();
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Creates an empty table; an existing table is kept as is.
    pub async fn create_table(&self, name: &str) {
        self.tables
            .write()
            .await
            .entry(name.to_string())
            .or_default();
    }

    /// Drops every row of every table.
    pub async fn truncate_all(&self) {
        for table in self.tables.write().await.values_mut() {
            *table = Table::default();
        }
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn select(&self, plan: &SelectPlan) -> StorageResult<Vec<Row>> {
        let tables = self.tables.read().await;
        let table = lookup(&tables, &plan.table)?;

        let offset = plan.offset.unwrap_or(0);
        let limit = plan.limit.unwrap_or(usize::MAX);

        Ok(table
            .matching(plan)
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|row| project(row, plan.columns.as_deref()))
            .collect())
    }

    async fn select_range(
        &self,
        plan: &SelectPlan,
        start: usize,
        end: usize,
    ) -> StorageResult<Page> {
        let tables = self.tables.read().await;
        let table = lookup(&tables, &plan.table)?;

        let rows = table.matching(plan);
        let total = rows.len() as u64;
        let results = if end < start {
            Vec::new()
        } else {
            rows.into_iter()
                .skip(start)
                .take((end - start).saturating_add(1))
                .map(|row| project(row, plan.columns.as_deref()))
                .collect()
        };

        Ok(Page { results, total })
    }

    async fn count(&self, table: &str, clause: &WhereClause) -> StorageResult<u64> {
        let tables = self.tables.read().await;
        let table = lookup(&tables, table)?;
        Ok(table.rows.iter().filter(|row| clause.matches(row)).count() as u64)
    }

    async fn insert(&self, table: &str, row: Row) -> StorageResult<Row> {
        let mut tables = self.tables.write().await;
        let table = tables
            .get_mut(table)
            .ok_or_else(|| StorageError::UnknownTable(table.to_string()))?;

        let stored = table.assign_id(row)?;
        table.rows.push(stored.clone());
        Ok(stored)
    }

    async fn patch(
        &self,
        table: &str,
        clause: &WhereClause,
        patch: &Row,
        limit: Option<usize>,
    ) -> StorageResult<u64> {
        let mut tables = self.tables.write().await;
        let table = tables
            .get_mut(table)
            .ok_or_else(|| StorageError::UnknownTable(table.to_string()))?;

        let mut changed = 0;
        for row in table.rows.iter_mut().filter(|row| clause.matches(row)) {
            if limit.is_some_and(|limit| changed >= limit as u64) {
                break;
            }
            for (column, value) in patch {
                if column != PRIMARY_KEY {
                    row.insert(column.clone(), value.clone());
                }
            }
            changed += 1;
        }
        Ok(changed)
    }

    async fn delete(&self, table: &str, clause: &WhereClause) -> StorageResult<u64> {
        let mut tables = self.tables.write().await;
        let table = tables
            .get_mut(table)
            .ok_or_else(|| StorageError::UnknownTable(table.to_string()))?;

        let before = table.rows.len();
        table.rows.retain(|row| !clause.matches(row));
        Ok((before - table.rows.len()) as u64)
    }
}

fn lookup<'a>(tables: &'a HashMap<String, Table>, name: &str) -> StorageResult<&'a Table> {
    tables
        .get(name)
        .ok_or_else(|| StorageError::UnknownTable(name.to_string()))
}

fn project(row: &Row, columns: Option<&[String]>) -> Row {
    match columns {
        Some(columns) if !columns.is_empty() => row
            .iter()
            .filter(|(column, _)| columns.iter().any(|c| c == *column))
            .map(|(column, value)| (column.clone(), value.clone()))
            .collect(),
        _ => row.clone(),
    }
}

fn order_rows(a: &Row, b: &Row, order: &[OrderBy]) -> Ordering {
    for entry in order {
        let left = a.get(&entry.column).unwrap_or(&Value::Null);
        let right = b.get(&entry.column).unwrap_or(&Value::Null);
        let ordering = match (left.is_null(), right.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => compare_values(left, right).unwrap_or(Ordering::Equal),
        };
        let ordering = match entry.direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
