//! Property coercion
//!
//! Input documents are reduced to the declared properties and each value is
//! converted to its declared type:
//!
//! | type    | accepted input                         | on failure        |
//! |---------|----------------------------------------|-------------------|
//! | string  | any value, rendered as text            | n/a               |
//! | number  | number, numeric string                 | `0` / dropped     |
//! | boolean | any value, by truthiness               | n/a               |
//! | date    | RFC 3339, `YYYY-MM-DD`, epoch millis   | dropped           |
//! | unknown | any value, unchanged                   | n/a               |
//!
//! `null` is kept unless the property is required. Dropped values are
//! reported as `PROPERTY_COERCION` warnings.

use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use serde_json::{Map, Number, Value};

use crate::observability::{DiagnosticSink, Event};
use crate::schema::{ModelSchema, PropertyDef, PropertyType};
use crate::storage::Row;

/// Coerces `doc` against the schema's declared properties.
pub fn coerce_properties(
    doc: &Map<String, Value>,
    schema: &ModelSchema,
    sink: &dyn DiagnosticSink,
) -> Row {
    let mut output = Row::new();

    for (name, def) in &schema.properties {
        let Some(value) = doc.get(name) else {
            continue;
        };

        if value.is_null() {
            if def.required {
                report(sink, schema, name, "required property is null");
            } else {
                output.insert(name.clone(), Value::Null);
            }
            continue;
        }

        match coerce_value(value, def) {
            Some(coerced) => {
                output.insert(name.clone(), coerced);
            }
            None => report(
                sink,
                schema,
                name,
                &format!("cannot convert {} to {}", value, def.kind.type_name()),
            ),
        }
    }

    output
}

/// Fills missing properties from their declared defaults.
pub fn apply_defaults(row: &mut Row, schema: &ModelSchema) {
    for (name, def) in &schema.properties {
        if row.contains_key(name) {
            continue;
        }
        if let Some(default) = &def.default {
            row.insert(name.clone(), default.resolve());
        }
    }
}

/// Converts one non-null value; `None` when it has no representation.
pub fn coerce_value(value: &Value, def: &PropertyDef) -> Option<Value> {
    match def.kind {
        PropertyType::String => Some(Value::String(match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })),
        PropertyType::Number => match value {
            Value::Number(_) => Some(value.clone()),
            Value::String(s) => Some(number(parse_number(s).unwrap_or(0.0))),
            _ => None,
        },
        PropertyType::Boolean => Some(Value::Bool(truthy(value))),
        PropertyType::Date => to_date(value).map(|date| {
            Value::String(date.to_rfc3339_opts(SecondsFormat::Millis, true))
        }),
        PropertyType::Unknown => Some(value.clone()),
    }
}

/// Truthiness: `false`, `0`, `""` and `null` are false.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Parses the leading numeric part of a string, like `parseFloat`.
fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let mut best = None;
    for (i, c) in text.char_indices() {
        if !(c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E')) {
            break;
        }
        if let Ok(parsed) = text[..=i].parse::<f64>() {
            best = Some(parsed);
        }
    }
    best.filter(|f| f.is_finite())
}

/// Integral values stay integers.
fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::from(value as i64)
    } else {
        Number::from_f64(value).map(Value::Number).unwrap_or(Value::from(0))
    }
}

fn to_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => {
            let text = text.trim();
            if let Ok(date) = DateTime::parse_from_rfc3339(text) {
                return Some(date.with_timezone(&Utc));
            }
            let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?;
            Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
        }
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            Utc.timestamp_millis_opt(millis).single()
        }
        _ => None,
    }
}

fn report(sink: &dyn DiagnosticSink, schema: &ModelSchema, property: &str, reason: &str) {
    sink.event(
        Event::PropertyCoercion,
        &[
            ("model", schema.name.as_str()),
            ("property", property),
            ("reason", reason),
        ],
    );
}
