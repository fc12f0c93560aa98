//! Schema Scan Tests
//!
//! Loading model definition files from disk:
//! - All definitions in a directory are registered, then relations resolved
//! - Malformed files and invalid definitions are reported, not fatal
//! - Unknown property types are kept as `unknown`

use std::fs;
use std::sync::Arc;

use centaure::observability::{Event, MemorySink};
use centaure::schema::{
    ModelDefinition, PropertyDecl, PropertyType, RelationDecl, SchemaLoader, SchemaRegistry,
};
use centaure::storage::MemoryStore;
use centaure::{Database, DatabaseOptions};
use serde_json::json;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn write_model(dir: &TempDir, file: &str, body: serde_json::Value) {
    fs::write(dir.path().join(file), body.to_string()).unwrap();
}

fn setup_models_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_model(
        &dir,
        "book.json",
        json!({
            "name": "Book",
            "schema": {
                "properties": {
                    "name": {"type": "String"},
                    "deleted": {"type": "Boolean", "default": false},
                    "user_id": {"type": "Number"}
                },
                "belongsTo": {"author": {"ref": "User", "key": "user_id"}}
            }
        }),
    );
    write_model(
        &dir,
        "user.json",
        json!({
            "name": "User",
            "schema": {
                "properties": {
                    "name": {"type": "String", "required": true},
                    "avatar": {"type": "Buffer"}
                },
                "hasMany": {"books": {"ref": "Book", "key": "user_id"}}
            }
        }),
    );
    dir
}

// =============================================================================
// Scan Tests
// =============================================================================

/// Scanning registers every file and resolves relations across files.
#[test]
fn test_scan_registers_and_resolves() {
    let dir = setup_models_dir();
    let sink = Arc::new(MemorySink::new());
    let mut registry = SchemaRegistry::new(sink.clone());

    let report = SchemaLoader::new(dir.path()).scan(&mut registry).unwrap();

    assert_eq!(report.registered, vec!["Book".to_string(), "User".to_string()]);
    assert!(report.skipped.is_empty());
    assert_eq!(report.relations.resolved, 2);
    assert!(registry.get("User").unwrap().relation("books").is_some());
    assert!(registry.get("Book").unwrap().relation("author").is_some());
    assert_eq!(sink.count(Event::SchemaScanned), 1);
}

/// Unknown property types are tagged, reported and kept.
#[test]
fn test_unknown_types_are_lenient() {
    let dir = setup_models_dir();
    let sink = Arc::new(MemorySink::new());
    let mut registry = SchemaRegistry::new(sink.clone());

    SchemaLoader::new(dir.path()).scan(&mut registry).unwrap();

    let avatar = registry.get("User").unwrap().property("avatar").unwrap();
    assert_eq!(avatar.kind, PropertyType::Unknown);
    assert_eq!(avatar.declared_type, "Buffer");
    assert_eq!(sink.count(Event::UnknownPropertyType), 1);
}

/// Bad files are skipped; the rest of the directory still loads.
#[test]
fn test_bad_definitions_are_skipped() {
    let dir = setup_models_dir();
    fs::write(dir.path().join("broken.json"), "{\"name\": ").unwrap();
    write_model(&dir, "nameless.json", json!({"schema": {"properties": {}}}));
    write_model(&dir, "schemaless.json", json!({"name": "Ghost"}));
    write_model(
        &dir,
        "zz_duplicate.json",
        json!({"name": "User", "schema": {"properties": {}}}),
    );

    let sink = Arc::new(MemorySink::new());
    let mut registry = SchemaRegistry::new(sink.clone());
    let report = SchemaLoader::new(dir.path()).scan(&mut registry).unwrap();

    assert_eq!(report.registered.len(), 2);
    let codes: Vec<&str> = report.skipped.iter().map(|e| e.code()).collect();
    assert_eq!(
        codes,
        vec![
            "MALFORMED_DEFINITION",
            "MISSING_MODEL_NAME",
            "MISSING_SCHEMA",
            "DUPLICATE_MODEL"
        ]
    );
    assert_eq!(sink.count(Event::ModelConflict), 1);
    assert!(registry.get("User").unwrap().property("avatar").is_some());
}

/// Definitions saved by the loader scan back identically.
#[test]
fn test_save_then_scan_round_trip() {
    let dir = TempDir::new().unwrap();
    let loader = SchemaLoader::new(dir.path());
    let definition = ModelDefinition::new("Shelf")
        .property("label", PropertyDecl::new("String"))
        .has_many("books", RelationDecl::new("Book", "shelf_id"));

    let path = loader.save_definition(&definition).unwrap();
    assert!(path.ends_with("Shelf.json"));

    let mut registry = SchemaRegistry::new(Arc::new(MemorySink::new()));
    let report = loader.scan(&mut registry).unwrap();
    assert_eq!(report.registered, vec!["Shelf".to_string()]);
    assert_eq!(report.relations.unresolved.len(), 1);
}

/// The database facade scans into its own registry.
#[tokio::test]
async fn test_database_scan() {
    let dir = setup_models_dir();
    let store = Arc::new(MemoryStore::new());
    let mut db = Database::connect_with_sink(
        store.clone(),
        DatabaseOptions::default(),
        Arc::new(MemorySink::new()),
    );

    db.scan(dir.path()).unwrap();
    assert_eq!(db.registry().len(), 2);
    assert!(db.model("Book").unwrap().schema().relation("author").is_some());

    for schema in db.registry().models() {
        store.create_table(&schema.table_name).await;
    }
    let author = db.model("User").unwrap().create(json!({"name": "Ann"})).await.unwrap();
    assert_eq!(author["id"], json!(1));

    db.reset();
    assert!(db.registry().is_empty());
}
