//! Query requests
//!
//! A request moves one way through three states:
//!
//! 1. [`Query`]: filters, selection, ordering and populate paths accumulate
//! 2. [`CompiledQuery`]: predicate tree lowered, statement finalized
//! 3. [`QueryOutput`]: executed result
//!
//! Post-processing runs after execution: eager relation loading, then field
//! exclusion. Pagination runs the statement over a row range and returns the
//! total count with the page.

mod compiled;
mod errors;
mod pagination;
mod populate;
mod projection;
mod request;

pub use compiled::{CompiledQuery, QueryKind, QueryOutput, Statement};
pub use errors::{QueryError, QueryResult};
pub use pagination::{page_range, PageInfo, Pagination, DEFAULT_LIMIT, DEFAULT_PAGE};
pub use populate::{Populate, PopulateNode};
pub use projection::{Fields, Projection};
pub use request::Query;
