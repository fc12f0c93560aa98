//! Storage capability
//!
//! The query layer never talks to a database directly. It builds plans and
//! hands them to a [`Storage`] implementation shared as `Arc<dyn Storage>`.
//!
//! [`MemoryStore`] is the in-process reference backend.

mod errors;
mod memory;
mod plan;

use async_trait::async_trait;

use crate::filter::WhereClause;

pub use errors::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use plan::{
    count_sql, delete_sql, insert_sql, update_sql, Direction, OrderBy, Page, Row, SelectPlan,
};

/// Relational backend the query layer executes against.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Rows matching the plan
    async fn select(&self, plan: &SelectPlan) -> StorageResult<Vec<Row>>;

    /// Rows `start..=end` of the plan's ordered result, plus the total number
    /// of matching rows. `limit`/`offset` of the plan are ignored.
    async fn select_range(&self, plan: &SelectPlan, start: usize, end: usize)
        -> StorageResult<Page>;

    async fn count(&self, table: &str, clause: &WhereClause) -> StorageResult<u64>;

    /// Inserts a row and returns it as stored, including the primary key.
    async fn insert(&self, table: &str, row: Row) -> StorageResult<Row>;

    /// Merges `patch` into matching rows, at most `limit` of them.
    /// Returns the number of rows changed.
    async fn patch(
        &self,
        table: &str,
        clause: &WhereClause,
        patch: &Row,
        limit: Option<usize>,
    ) -> StorageResult<u64>;

    /// Deletes matching rows and returns how many were removed.
    async fn delete(&self, table: &str, clause: &WhereClause) -> StorageResult<u64>;
}
