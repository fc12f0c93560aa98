//! Recorded `where` clause
//!
//! [`WhereClause`] is the builder storage backends receive: it records the
//! operations issued by [`to_query_operations`], renders them to SQL text
//! with positional bindings, and evaluates them against a JSON row.

use std::cmp::Ordering;

use regex::RegexBuilder;
use serde_json::{Map, Value};

use super::lowering::{to_query_operations, Combine, ConditionBuilder};
use super::tree::{Comparison, Condition, Predicate};

/// One recorded operation
#[derive(Debug, Clone, PartialEq)]
pub enum ClauseItem {
    Condition(Condition),
    Group(WhereClause),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereClause {
    items: Vec<(Combine, ClauseItem)>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lowers a compiled tree; `None` yields the empty clause.
    pub fn from_predicate(tree: Option<&Predicate>) -> Self {
        let mut clause = Self::new();
        if let Some(tree) = tree {
            to_query_operations(tree, &mut clause, Combine::And);
        }
        clause
    }

    /// Appends `condition` with `and`
    pub fn and_where(mut self, condition: Condition) -> Self {
        self.push_condition(Combine::And, &condition);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[(Combine, ClauseItem)] {
        &self.items
    }

    /// Renders the clause body (without the `where` keyword).
    ///
    /// Values are replaced by `?` placeholders and returned in binding order.
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let mut sql = String::new();
        let mut bindings = Vec::new();
        self.write_sql(&mut sql, &mut bindings);
        (sql, bindings)
    }

    fn write_sql(&self, sql: &mut String, bindings: &mut Vec<Value>) {
        for (i, (combine, item)) in self.items.iter().enumerate() {
            if i > 0 {
                sql.push(' ');
                sql.push_str(combine.as_sql());
                sql.push(' ');
            }
            match item {
                ClauseItem::Condition(condition) => write_condition(condition, sql, bindings),
                ClauseItem::Group(group) => {
                    sql.push('(');
                    group.write_sql(sql, bindings);
                    sql.push(')');
                }
            }
        }
    }

    /// Evaluates the clause against a row.
    ///
    /// `and` binds tighter than `or`, as in SQL. Missing columns read as
    /// `null`, and `null` only satisfies `is null`.
    pub fn matches(&self, row: &Map<String, Value>) -> bool {
        let mut satisfied = false;
        let mut current = true;

        for (i, (combine, item)) in self.items.iter().enumerate() {
            let hit = match item {
                ClauseItem::Condition(condition) => evaluate(condition, row),
                ClauseItem::Group(group) => group.matches(row),
            };
            if i > 0 && *combine == Combine::Or {
                satisfied |= current;
                current = hit;
            } else {
                current &= hit;
            }
        }

        satisfied || current
    }
}

impl ConditionBuilder for WhereClause {
    fn push_condition(&mut self, combine: Combine, condition: &Condition) {
        self.items
            .push((combine, ClauseItem::Condition(condition.clone())));
    }

    fn push_group<F>(&mut self, combine: Combine, build: F)
    where
        F: FnOnce(&mut Self),
    {
        let mut group = WhereClause::new();
        build(&mut group);
        if !group.is_empty() {
            self.items.push((combine, ClauseItem::Group(group)));
        }
    }
}

/// Quotes an identifier, splitting `table.column` references.
pub fn quote_ident(ident: &str) -> String {
    ident
        .split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

fn write_condition(condition: &Condition, sql: &mut String, bindings: &mut Vec<Value>) {
    let column = quote_ident(&condition.field);
    match condition.op {
        Comparison::IsNull | Comparison::IsNotNull => {
            sql.push_str(&format!("{} {}", column, condition.op.as_sql()));
        }
        Comparison::In => {
            let members = condition.value.as_array().cloned().unwrap_or_default();
            if members.is_empty() {
                // `in ()` is not valid SQL; an empty list matches nothing
                sql.push_str("1 = 0");
                return;
            }
            let placeholders = vec!["?"; members.len()].join(", ");
            sql.push_str(&format!("{} in ({})", column, placeholders));
            bindings.extend(members);
        }
        _ => {
            sql.push_str(&format!("{} {} ?", column, condition.op.as_sql()));
            bindings.push(condition.value.clone());
        }
    }
}

fn evaluate(condition: &Condition, row: &Map<String, Value>) -> bool {
    let actual = row.get(&condition.field).unwrap_or(&Value::Null);

    let operand = &condition.value;
    match condition.op {
        Comparison::IsNull => actual.is_null(),
        Comparison::IsNotNull => !actual.is_null(),
        _ if actual.is_null() => false,
        Comparison::Eq => values_equal(actual, operand),
        Comparison::Ne => !operand.is_null() && !values_equal(actual, operand),
        Comparison::Gt => compare_values(actual, operand) == Some(Ordering::Greater),
        Comparison::Gte => matches!(
            compare_values(actual, operand),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Comparison::Lt => compare_values(actual, operand) == Some(Ordering::Less),
        Comparison::Lte => matches!(
            compare_values(actual, operand),
            Some(Ordering::Less | Ordering::Equal)
        ),
        Comparison::Like => match (actual.as_str(), operand.as_str()) {
            (Some(text), Some(pattern)) => like_matches(text, pattern),
            _ => false,
        },
        Comparison::In => operand
            .as_array()
            .map(|members| members.iter().any(|m| values_equal(actual, m)))
            .unwrap_or(false),
    }
}

/// Numeric view of a scalar; booleans count as 0/1 like SQL tinyint columns
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Equality without string/number coercion
pub fn values_equal(a: &Value, b: &Value) -> bool {
    if a.is_null() || b.is_null() {
        return false;
    }
    match (a, b) {
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Number(_) | Value::Bool(_), Value::Number(_) | Value::Bool(_)) => {
            as_number(a) == as_number(b)
        }
        _ => a == b,
    }
}

/// Ordering of two scalars of the same kind
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Number(_) | Value::Bool(_), Value::Number(_) | Value::Bool(_)) => {
            as_number(a)?.partial_cmp(&as_number(b)?)
        }
        _ => None,
    }
}

/// SQL `LIKE`: `%` is any sequence, `_` one character, `\` escapes.
/// Case-insensitive, like the default collation of most engines.
pub fn like_matches(value: &str, pattern: &str) -> bool {
    let mut expr = String::from("^");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => expr.push_str(".*"),
            '_' => expr.push('.'),
            '\\' => {
                if let Some(escaped) = chars.next() {
                    expr.push_str(&regex::escape(&escaped.to_string()));
                }
            }
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');

    RegexBuilder::new(&expr)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .map(|re| re.is_match(value))
        .unwrap_or(false)
}
