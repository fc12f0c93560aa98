//! Model definition types
//!
//! Declared form (`ModelDefinition`, `PropertyDecl`, `RelationDecl`) is what
//! users write; normalized form (`ModelSchema`, `PropertyDef`) is what the
//! registry stores.
//!
//! Known property types:
//! - string
//! - number
//! - boolean
//! - date
//!
//! Anything else is tagged `unknown` and kept.

use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::relations::ResolvedRelation;

/// Primary key column of every model table
pub const PRIMARY_KEY: &str = "id";

/// Default marker meaning "timestamp at insert time"
pub const NOW_DEFAULT: &str = "$now";

/// Normalized property type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    String,
    Number,
    Boolean,
    Date,
    /// Declared type outside the known set. Deliberately lenient.
    Unknown,
}

impl PropertyType {
    /// Normalizes a declared type name.
    ///
    /// Accepts the constructor-style names (`String`, `Number`, ...) and the
    /// lower-case tags. Never fails.
    pub fn normalize(declared: &str) -> Self {
        match declared.trim() {
            "String" | "string" => PropertyType::String,
            "Number" | "number" => PropertyType::Number,
            "Boolean" | "boolean" => PropertyType::Boolean,
            "Date" | "date" => PropertyType::Date,
            _ => PropertyType::Unknown,
        }
    }

    /// Returns the type name for messages
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyType::String => "string",
            PropertyType::Number => "number",
            PropertyType::Boolean => "boolean",
            PropertyType::Date => "date",
            PropertyType::Unknown => "unknown",
        }
    }
}

/// Property as declared in a model definition
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PropertyDecl {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub declared_type: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl PropertyDecl {
    pub fn new(declared_type: impl Into<String>) -> Self {
        Self {
            declared_type: Some(declared_type.into()),
            required: false,
            default: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Relation declaration: `{ "ref": "Book", "key": "user_id" }`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RelationDecl {
    /// Referenced model name
    #[serde(rename = "ref", default)]
    pub target: String,
    /// Foreign-key column
    #[serde(default)]
    pub key: String,
}

impl RelationDecl {
    pub fn new(target: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            key: key.into(),
        }
    }
}

/// Alias → declaration
pub type RelationDecls = BTreeMap<String, RelationDecl>;

/// Body of a model definition
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SchemaBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, PropertyDecl>>,
    #[serde(
        rename = "hasMany",
        alias = "has_many",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub has_many: Option<RelationDecls>,
    #[serde(
        rename = "belongsTo",
        alias = "belongs_to",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub belongs_to: Option<RelationDecls>,
}

/// A model definition as read from a file or built in code.
///
/// Both fields are optional so malformed definitions can be reported
/// instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaBody>,
}

impl ModelDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            schema: Some(SchemaBody {
                properties: Some(BTreeMap::new()),
                ..SchemaBody::default()
            }),
        }
    }

    pub fn property(mut self, name: impl Into<String>, decl: PropertyDecl) -> Self {
        self.body()
            .properties
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), decl);
        self
    }

    pub fn has_many(mut self, alias: impl Into<String>, decl: RelationDecl) -> Self {
        self.body()
            .has_many
            .get_or_insert_with(BTreeMap::new)
            .insert(alias.into(), decl);
        self
    }

    pub fn belongs_to(mut self, alias: impl Into<String>, decl: RelationDecl) -> Self {
        self.body()
            .belongs_to
            .get_or_insert_with(BTreeMap::new)
            .insert(alias.into(), decl);
        self
    }

    fn body(&mut self) -> &mut SchemaBody {
        self.schema.get_or_insert_with(SchemaBody::default)
    }
}

/// Default value of a property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultValue {
    Literal(Value),
    /// Current timestamp, evaluated at insert time
    Now,
}

impl DefaultValue {
    /// Produces the value to store
    pub fn resolve(&self) -> Value {
        match self {
            DefaultValue::Literal(value) => value.clone(),
            DefaultValue::Now => {
                Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
            }
        }
    }
}

/// Normalized property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDef {
    /// Type name exactly as declared
    pub declared_type: String,
    #[serde(rename = "type")]
    pub kind: PropertyType,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
}

impl PropertyDef {
    pub fn from_decl(decl: &PropertyDecl) -> Self {
        let declared_type = decl.declared_type.clone().unwrap_or_default();
        let kind = PropertyType::normalize(&declared_type);
        let default = decl.default.as_ref().map(|value| match value {
            Value::String(marker) if marker == NOW_DEFAULT && kind == PropertyType::Date => {
                DefaultValue::Now
            }
            other => DefaultValue::Literal(other.clone()),
        });

        Self {
            declared_type,
            kind,
            required: decl.required,
            default,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.kind == PropertyType::Unknown
    }
}

/// A registered model: field mapping plus resolved relation map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSchema {
    pub name: String,
    pub table_name: String,
    pub properties: BTreeMap<String, PropertyDef>,
    pub relations: BTreeMap<String, ResolvedRelation>,
}

impl ModelSchema {
    /// Builds the normalized schema; the table name is the lower-cased model name.
    pub fn new(name: impl Into<String>, properties: &BTreeMap<String, PropertyDecl>) -> Self {
        let name = name.into();
        Self {
            table_name: name.to_lowercase(),
            properties: properties
                .iter()
                .map(|(field, decl)| (field.clone(), PropertyDef::from_decl(decl)))
                .collect(),
            relations: BTreeMap::new(),
            name,
        }
    }

    pub fn primary_key(&self) -> &'static str {
        PRIMARY_KEY
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.get(name)
    }

    pub fn relation(&self, alias: &str) -> Option<&ResolvedRelation> {
        self.relations.get(alias)
    }

    /// Properties whose declared type was not recognized
    pub fn unknown_properties(&self) -> impl Iterator<Item = (&str, &PropertyDef)> {
        self.properties
            .iter()
            .filter(|(_, def)| def.is_unknown())
            .map(|(name, def)| (name.as_str(), def))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_normalization() {
        assert_eq!(PropertyType::normalize("String"), PropertyType::String);
        assert_eq!(PropertyType::normalize("number"), PropertyType::Number);
        assert_eq!(PropertyType::normalize("Boolean"), PropertyType::Boolean);
        assert_eq!(PropertyType::normalize("Date"), PropertyType::Date);
    }

    #[test]
    fn test_unrecognized_type_is_tagged_unknown_not_rejected() {
        let def = PropertyDef::from_decl(&PropertyDecl::new("Buffer"));
        assert_eq!(def.kind, PropertyType::Unknown);
        assert_eq!(def.declared_type, "Buffer");

        let def = PropertyDef::from_decl(&PropertyDecl::default());
        assert_eq!(def.kind, PropertyType::Unknown);
        assert_eq!(def.declared_type, "");
    }

    #[test]
    fn test_now_default_only_for_dates() {
        let def = PropertyDef::from_decl(&PropertyDecl::new("Date").with_default(json!("$now")));
        assert_eq!(def.default, Some(DefaultValue::Now));

        let def = PropertyDef::from_decl(&PropertyDecl::new("String").with_default(json!("$now")));
        assert_eq!(def.default, Some(DefaultValue::Literal(json!("$now"))));
    }

    #[test]
    fn test_now_default_resolves_to_rfc3339() {
        let value = DefaultValue::Now.resolve();
        let text = value.as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(text).is_ok());
        assert!(text.ends_with('Z'));
    }

    #[test]
    fn test_definition_deserialization() {
        let definition: ModelDefinition = serde_json::from_value(json!({
            "name": "Book",
            "schema": {
                "properties": {
                    "name": {"type": "String"},
                    "deleted": {"type": "Boolean", "default": false},
                    "user_id": {"type": "Number"}
                },
                "belongsTo": {"author": {"key": "user_id", "ref": "User"}}
            }
        }))
        .unwrap();

        let body = definition.schema.unwrap();
        assert_eq!(definition.name.as_deref(), Some("Book"));
        assert_eq!(body.properties.unwrap().len(), 3);
        assert_eq!(
            body.belongs_to.unwrap()["author"],
            RelationDecl::new("User", "user_id")
        );
        assert!(body.has_many.is_none());
    }

    #[test]
    fn test_table_name_is_lowercase() {
        let schema = ModelSchema::new("BookShelf", &BTreeMap::new());
        assert_eq!(schema.table_name, "bookshelf");
        assert_eq!(schema.primary_key(), "id");
    }
}
