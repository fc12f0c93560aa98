//! Filter compiler
//!
//! Turns a MongoDB-style filter object into a predicate tree, then into
//! ordered query-builder operations.
//!
//! ```ignore
//! use centaure::filter::{compile, WhereClause};
//! use serde_json::json;
//!
//! let filter = json!({"id": {"$in": [1, 2, 3]}, "deleted": null});
//! let tree = compile(filter.as_object().unwrap())?;
//! let clause = WhereClause::from_predicate(tree.as_ref());
//! assert_eq!(clause.to_sql().0, "\"id\" in (?, ?, ?) and \"deleted\" is null");
//! ```
//!
//! The compiler knows nothing about schemas or relations.

mod clause;
mod compiler;
mod errors;
mod lowering;
mod tree;

pub use clause::{compare_values, like_matches, quote_ident, values_equal, ClauseItem, WhereClause};
pub use compiler::{compile, OR_PREFIX};
pub use errors::{FilterError, FilterResult};
pub use lowering::{to_query_operations, Combine, ConditionBuilder};
pub use tree::{Comparison, Condition, Predicate};
