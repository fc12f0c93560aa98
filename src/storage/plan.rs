//! Statement plans handed to a [`Storage`](super::Storage) backend
//!
//! Plans are engine-neutral. `to_sql` renders the statement a SQL backend
//! would run, with `?` placeholders; it is used for debug logging.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::filter::{quote_ident, WhereClause};

/// A record: column name → JSON value
pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

/// `order by` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Desc,
        }
    }
}

/// A `select` statement
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectPlan {
    pub table: String,
    pub clause: WhereClause,
    /// `None` selects every column
    pub columns: Option<Vec<String>>,
    pub order: Vec<OrderBy>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl SelectPlan {
    pub fn new(table: impl Into<String>, clause: WhereClause) -> Self {
        Self {
            table: table.into(),
            clause,
            ..Self::default()
        }
    }

    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let columns = match &self.columns {
            Some(columns) if !columns.is_empty() => columns
                .iter()
                .map(|column| quote_ident(column))
                .collect::<Vec<_>>()
                .join(", "),
            _ => "*".to_string(),
        };

        let mut sql = format!("select {} from {}", columns, quote_ident(&self.table));
        let bindings = push_where(&mut sql, &self.clause);

        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|entry| format!("{} {}", quote_ident(&entry.column), entry.direction))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(" order by ");
            sql.push_str(&order);
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" limit {}", limit));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" offset {}", offset));
        }

        (sql, bindings)
    }
}

/// Rows of one page plus the total number of matching rows
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Page {
    pub results: Vec<Row>,
    pub total: u64,
}

/// Renders `insert into "table" ("a", "b") values (?, ?)`.
pub fn insert_sql(table: &str, row: &Row) -> (String, Vec<Value>) {
    let columns = row.keys().map(|c| quote_ident(c)).collect::<Vec<_>>();
    let placeholders = vec!["?"; columns.len()];
    (
        format!(
            "insert into {} ({}) values ({})",
            quote_ident(table),
            columns.join(", "),
            placeholders.join(", ")
        ),
        row.values().cloned().collect(),
    )
}

/// Renders `update "table" set "a" = ? where ...`.
pub fn update_sql(table: &str, patch: &Row, clause: &WhereClause) -> (String, Vec<Value>) {
    let assignments = patch
        .keys()
        .map(|column| format!("{} = ?", quote_ident(column)))
        .collect::<Vec<_>>()
        .join(", ");
    let mut sql = format!("update {} set {}", quote_ident(table), assignments);
    let mut bindings: Vec<Value> = patch.values().cloned().collect();
    bindings.extend(push_where(&mut sql, clause));
    (sql, bindings)
}

/// Renders `delete from "table" where ...`.
pub fn delete_sql(table: &str, clause: &WhereClause) -> (String, Vec<Value>) {
    let mut sql = format!("delete from {}", quote_ident(table));
    let bindings = push_where(&mut sql, clause);
    (sql, bindings)
}

/// Renders `select count(*) from "table" where ...`.
pub fn count_sql(table: &str, clause: &WhereClause) -> (String, Vec<Value>) {
    let mut sql = format!("select count(*) from {}", quote_ident(table));
    let bindings = push_where(&mut sql, clause);
    (sql, bindings)
}

fn push_where(sql: &mut String, clause: &WhereClause) -> Vec<Value> {
    if clause.is_empty() {
        return Vec::new();
    }
    let (fragment, bindings) = clause.to_sql();
    sql.push_str(" where ");
    sql.push_str(&fragment);
    bindings
}
