//! Predicate tree → query-builder operations
//!
//! The builder sees a flat sequence of `where` / `or where` calls with
//! explicit groups. A node whose connective matches the surrounding combine
//! mode is flattened into sequential calls; a node with the other connective
//! is wrapped in a group so precedence survives the translation.

use super::tree::{Condition, Predicate};

/// How a condition or group joins what precedes it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combine {
    And,
    Or,
}

impl Combine {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Combine::And => "and",
            Combine::Or => "or",
        }
    }
}

/// The query-builder capability the compiler drives.
///
/// Any storage engine that can express `where` / `or where` conditions and
/// parenthesized sub-clauses can consume a compiled filter.
pub trait ConditionBuilder: Sized {
    /// Append a leaf condition
    fn push_condition(&mut self, combine: Combine, condition: &Condition);

    /// Append a parenthesized sub-clause populated by `build`
    fn push_group<F>(&mut self, combine: Combine, build: F)
    where
        F: FnOnce(&mut Self);
}

/// Issues the builder operations for `tree` under `combine`.
pub fn to_query_operations<B: ConditionBuilder>(tree: &Predicate, builder: &mut B, combine: Combine) {
    match tree {
        Predicate::Leaf(condition) => builder.push_condition(combine, condition),
        Predicate::And(children) => match combine {
            Combine::And => {
                for child in children {
                    to_query_operations(child, builder, Combine::And);
                }
            }
            Combine::Or => builder.push_group(Combine::Or, |group| {
                for child in children {
                    to_query_operations(child, group, Combine::And);
                }
            }),
        },
        Predicate::Or(children) => match combine {
            Combine::Or => {
                for child in children {
                    to_query_operations(child, builder, Combine::Or);
                }
            }
            Combine::And => builder.push_group(Combine::And, |group| {
                for child in children {
                    to_query_operations(child, group, Combine::Or);
                }
            }),
        },
    }
}
