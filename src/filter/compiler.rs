//! Filter object → predicate tree
//!
//! Compilation is pure and stable: the input is never mutated and the same
//! object always yields the same tree, fields in input order.

use serde_json::{Map, Value};

use super::errors::{FilterError, FilterResult};
use super::tree::{Comparison, Condition, Predicate};

/// Keys starting with this prefix hold an array of alternative filters.
///
/// Several disjunctions can live in one object under distinct keys
/// (`$or`, `$or2`, ...); they are AND-ed like any other key.
pub const OR_PREFIX: &str = "$or";

/// Operator tags in the order their leaves are emitted
const OPERATORS: [(&str, Comparison); 7] = [
    ("$gt", Comparison::Gt),
    ("$gte", Comparison::Gte),
    ("$lt", Comparison::Lt),
    ("$lte", Comparison::Lte),
    ("$like", Comparison::Like),
    ("$ne", Comparison::Ne),
    ("$in", Comparison::In),
];

/// Compiles a filter object.
///
/// Returns `None` for an empty object, which matches every row.
pub fn compile(filter: &Map<String, Value>) -> FilterResult<Option<Predicate>> {
    if filter.is_empty() {
        return Ok(None);
    }
    compile_mapping(filter).map(Some)
}

fn compile_mapping(filter: &Map<String, Value>) -> FilterResult<Predicate> {
    let mut entries = filter.iter();
    match (entries.next(), filter.len()) {
        (None, _) => Err(FilterError::EmptyGroup),
        // A single key is compiled in place, never wrapped in a one-child `And`
        (Some((key, value)), 1) => compile_entry(key, value),
        _ => {
            let children = filter
                .iter()
                .map(|(key, value)| compile_entry(key, value))
                .collect::<FilterResult<Vec<_>>>()?;
            Ok(Predicate::And(children))
        }
    }
}

fn compile_entry(key: &str, value: &Value) -> FilterResult<Predicate> {
    if key.starts_with(OR_PREFIX) {
        compile_disjunction(key, value)
    } else {
        compile_field(key, value)
    }
}

fn compile_disjunction(key: &str, value: &Value) -> FilterResult<Predicate> {
    let branches = value
        .as_array()
        .ok_or_else(|| FilterError::disjunction(key, "expected an array of filter objects"))?;

    if branches.is_empty() {
        return Err(FilterError::disjunction(key, "at least one branch is required"));
    }

    let children = branches
        .iter()
        .map(|branch| match branch {
            Value::Object(filter) => compile_mapping(filter),
            _ => Err(FilterError::disjunction(key, "every branch must be an object")),
        })
        .collect::<FilterResult<Vec<_>>>()?;

    Ok(Predicate::Or(children))
}

fn compile_field(field: &str, value: &Value) -> FilterResult<Predicate> {
    match value {
        Value::Null => Ok(Predicate::Leaf(Condition::is_null(field))),
        Value::Object(ops) if ops.keys().any(|k| k.starts_with('$')) => {
            compile_operators(field, ops)
        }
        Value::Array(members) => compile_list(field, members),
        _ => Ok(Predicate::Leaf(Condition::eq(field, value.clone()))),
    }
}

fn compile_operators(field: &str, ops: &Map<String, Value>) -> FilterResult<Predicate> {
    if let Some(unknown) = ops.keys().find(|k| Comparison::from_tag(k).is_none()) {
        return Err(FilterError::UnknownOperator {
            field: field.to_string(),
            operator: unknown.clone(),
        });
    }

    let mut leaves = Vec::with_capacity(ops.len());
    for (tag, op) in OPERATORS.iter() {
        let Some(operand) = ops.get(*tag) else {
            continue;
        };
        let leaf = match op {
            Comparison::Ne if operand.is_null() => Condition::is_not_null(field),
            Comparison::In => Condition::in_list(field, in_operand(field, tag, operand)?),
            _ => Condition::new(field, *op, operand.clone()),
        };
        leaves.push(Predicate::Leaf(leaf));
    }

    match leaves.len() {
        1 => Ok(leaves.remove(0)),
        _ => Ok(Predicate::And(leaves)),
    }
}

/// Members of an explicit `$in`. Must be an array of scalars.
fn in_operand(field: &str, tag: &str, operand: &Value) -> FilterResult<Vec<Value>> {
    let members = operand.as_array().ok_or_else(|| FilterError::InvalidOperand {
        field: field.to_string(),
        operator: tag.to_string(),
    })?;
    if members.iter().any(|m| m.is_object() || m.is_array()) {
        return Err(FilterError::InvalidArrayMember {
            field: field.to_string(),
        });
    }
    Ok(members.clone())
}

/// Implicit `in` list.
///
/// SQL `IN` never matches `NULL`, so a list containing `null` becomes
/// `field in (non-null members) or field is null`.
fn compile_list(field: &str, members: &[Value]) -> FilterResult<Predicate> {
    if members.iter().any(|m| m.is_object() || m.is_array()) {
        return Err(FilterError::InvalidArrayMember {
            field: field.to_string(),
        });
    }

    if !members.iter().any(Value::is_null) {
        return Ok(Predicate::Leaf(Condition::in_list(field, members.to_vec())));
    }

    let present: Vec<Value> = members.iter().filter(|m| !m.is_null()).cloned().collect();
    if present.is_empty() {
        return Ok(Predicate::Leaf(Condition::is_null(field)));
    }

    Ok(Predicate::Or(vec![
        Predicate::Leaf(Condition::in_list(field, present)),
        Predicate::Leaf(Condition::is_null(field)),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compile_json(value: Value) -> FilterResult<Option<Predicate>> {
        match value {
            Value::Object(map) => compile(&map),
            _ => panic!("test filters must be objects"),
        }
    }

    #[test]
    fn test_empty_filter_compiles_to_nothing() {
        assert_eq!(compile_json(json!({})).unwrap(), None);
    }

    #[test]
    fn test_single_scalar_is_a_bare_leaf() {
        let tree = compile_json(json!({"name": "Alice"})).unwrap().unwrap();
        assert_eq!(tree, Predicate::Leaf(Condition::eq("name", json!("Alice"))));
    }

    #[test]
    fn test_multiple_keys_keep_input_order() {
        let tree = compile_json(json!({"b": 1, "a": 2, "c": 3})).unwrap().unwrap();
        match tree {
            Predicate::And(children) => {
                let fields: Vec<_> = children
                    .iter()
                    .map(|c| c.as_leaf().unwrap().field.as_str())
                    .collect();
                assert_eq!(fields, vec!["b", "a", "c"]);
            }
            other => panic!("expected conjunction, got {:?}", other),
        }
    }

    #[test]
    fn test_operator_leaves_follow_fixed_order() {
        let tree = compile_json(json!({"age": {"$lt": 65, "$gte": 18}}))
            .unwrap()
            .unwrap();
        assert_eq!(
            tree,
            Predicate::And(vec![
                Predicate::leaf("age", Comparison::Gte, json!(18)),
                Predicate::leaf("age", Comparison::Lt, json!(65)),
            ])
        );
    }

    #[test]
    fn test_ne_null_is_not_null() {
        let tree = compile_json(json!({"deleted_at": {"$ne": null}})).unwrap().unwrap();
        assert_eq!(tree, Predicate::Leaf(Condition::is_not_null("deleted_at")));
    }

    #[test]
    fn test_ne_value_stays_a_comparison() {
        let tree = compile_json(json!({"status": {"$ne": "gone"}})).unwrap().unwrap();
        assert_eq!(tree, Predicate::leaf("status", Comparison::Ne, json!("gone")));
    }

    #[test]
    fn test_list_with_only_null() {
        let tree = compile_json(json!({"id": [null]})).unwrap().unwrap();
        assert_eq!(tree, Predicate::Leaf(Condition::is_null("id")));
    }

    #[test]
    fn test_empty_list_is_an_empty_in() {
        let tree = compile_json(json!({"id": []})).unwrap().unwrap();
        assert_eq!(tree, Predicate::Leaf(Condition::in_list("id", vec![])));
    }

    #[test]
    fn test_unknown_operator_rejected() {
        let err = compile_json(json!({"name": {"$regex": "^a"}})).unwrap_err();
        assert_eq!(
            err,
            FilterError::UnknownOperator {
                field: "name".into(),
                operator: "$regex".into()
            }
        );
    }

    #[test]
    fn test_in_operand_must_be_a_scalar_list() {
        let err = compile_json(json!({"age": {"$in": 5}})).unwrap_err();
        assert_eq!(
            err,
            FilterError::InvalidOperand {
                field: "age".into(),
                operator: "$in".into()
            }
        );
        assert_eq!(err.code(), "INVALID_OPERAND");

        let err = compile_json(json!({"age": {"$in": [1, [2]]}})).unwrap_err();
        assert_eq!(err, FilterError::InvalidArrayMember { field: "age".into() });

        let tree = compile_json(json!({"age": {"$in": [1, 2]}})).unwrap().unwrap();
        assert_eq!(tree, Predicate::Leaf(Condition::in_list("age", vec![json!(1), json!(2)])));
    }

    #[test]
    fn test_plain_object_is_equality() {
        let tree = compile_json(json!({"meta": {"a": 1}})).unwrap().unwrap();
        assert_eq!(tree, Predicate::Leaf(Condition::eq("meta", json!({"a": 1}))));
    }

    #[test]
    fn test_disjunction_errors() {
        assert_eq!(
            compile_json(json!({"$or": {"a": 1}})).unwrap_err().code(),
            "INVALID_DISJUNCTION"
        );
        assert_eq!(
            compile_json(json!({"$or": []})).unwrap_err().code(),
            "INVALID_DISJUNCTION"
        );
        assert_eq!(
            compile_json(json!({"$or": [1]})).unwrap_err().code(),
            "INVALID_DISJUNCTION"
        );
        assert_eq!(
            compile_json(json!({"$or": [{}]})).unwrap_err(),
            FilterError::EmptyGroup
        );
    }

    #[test]
    fn test_nested_list_member_rejected() {
        let err = compile_json(json!({"id": [[1]]})).unwrap_err();
        assert_eq!(err.code(), "INVALID_ARRAY_MEMBER");
    }

    #[test]
    fn test_compile_does_not_mutate_input() {
        let filter = json!({"id": [1, null], "$or": [{"a": 1}, {"b": {"$ne": null}}]});
        let before = filter.clone();
        let first = compile(filter.as_object().unwrap()).unwrap();
        let second = compile(filter.as_object().unwrap()).unwrap();
        assert_eq!(filter, before);
        assert_eq!(first, second);
    }
}
