//! Predicate tree
//!
//! The compiled intermediate form of a filter object: leaf comparisons
//! combined by conjunction and disjunction nodes.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison operator of a leaf condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "<>")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "like")]
    Like,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "is null")]
    IsNull,
    #[serde(rename = "is not null")]
    IsNotNull,
}

impl Comparison {
    /// SQL spelling of the operator
    pub fn as_sql(&self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Ne => "<>",
            Comparison::Gt => ">",
            Comparison::Gte => ">=",
            Comparison::Lt => "<",
            Comparison::Lte => "<=",
            Comparison::Like => "like",
            Comparison::In => "in",
            Comparison::IsNull => "is null",
            Comparison::IsNotNull => "is not null",
        }
    }

    /// Maps a filter operator tag (`$gt`, `$in`, ...) to its comparison.
    ///
    /// `$ne` maps to `<>`; the compiler turns `$ne: null` into `is not null`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "$gt" => Some(Comparison::Gt),
            "$gte" => Some(Comparison::Gte),
            "$lt" => Some(Comparison::Lt),
            "$lte" => Some(Comparison::Lte),
            "$like" => Some(Comparison::Like),
            "$ne" => Some(Comparison::Ne),
            "$in" => Some(Comparison::In),
            _ => None,
        }
    }

    /// Whether the operator takes no operand
    pub fn is_null_test(&self) -> bool {
        matches!(self, Comparison::IsNull | Comparison::IsNotNull)
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

/// A leaf triple `(field, operator, value)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub op: Comparison,
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, op: Comparison, value: Value) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }

    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, Comparison::Eq, value)
    }

    pub fn in_list(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::new(field, Comparison::In, Value::Array(values))
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Self::new(field, Comparison::IsNull, Value::Null)
    }

    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::new(field, Comparison::IsNotNull, Value::Null)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.op.is_null_test() {
            write!(f, "{} {}", self.field, self.op)
        } else {
            write!(f, "{} {} {}", self.field, self.op, self.value)
        }
    }
}

/// Compiled boolean expression.
///
/// `And` and `Or` nodes always carry at least one child.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Predicate {
    Leaf(Condition),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn leaf(field: impl Into<String>, op: Comparison, value: Value) -> Self {
        Predicate::Leaf(Condition::new(field, op, value))
    }

    /// Returns the leaf condition, if this node is one
    pub fn as_leaf(&self) -> Option<&Condition> {
        match self {
            Predicate::Leaf(condition) => Some(condition),
            _ => None,
        }
    }

    /// Number of leaf conditions in the tree
    pub fn leaf_count(&self) -> usize {
        match self {
            Predicate::Leaf(_) => 1,
            Predicate::And(children) | Predicate::Or(children) => {
                children.iter().map(Predicate::leaf_count).sum()
            }
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Leaf(condition) => write!(f, "{}", condition),
            Predicate::And(children) | Predicate::Or(children) => {
                let joiner = if matches!(self, Predicate::And(_)) {
                    " and "
                } else {
                    " or "
                };
                write!(f, "(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{}", joiner)?;
                    }
                    write!(f, "{}", child)?;
                }
                write!(f, ")")
            }
        }
    }
}
