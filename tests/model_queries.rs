//! Model Query Tests
//!
//! Model adapter and query lifecycle against the in-memory store:
//! - create / find / find_one / count / update / delete
//! - pagination, sorting, projection
//! - eager relation loading
//! - error propagation from storage

use std::sync::Arc;

use centaure::observability::{Event, MemorySink};
use centaure::query::{Pagination, QueryError, QueryOutput};
use centaure::schema::{ModelDefinition, PropertyDecl, RelationDecl};
use centaure::storage::{MemoryStore, Row, StorageError};
use centaure::{Database, DatabaseOptions};
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn definitions() -> Vec<ModelDefinition> {
    vec![
        ModelDefinition::new("User")
            .property("name", PropertyDecl::new("String").required())
            .property("age", PropertyDecl::new("Number"))
            .property("email", PropertyDecl::new("String"))
            .property(
                "deleted",
                PropertyDecl::new("Boolean").with_default(json!(false)),
            )
            .property("created", PropertyDecl::new("Date").with_default(json!("$now")))
            .has_many("books", RelationDecl::new("Book", "user_id")),
        ModelDefinition::new("Book")
            .property("name", PropertyDecl::new("String"))
            .property("pages", PropertyDecl::new("Number"))
            .property("user_id", PropertyDecl::new("Number"))
            .belongs_to("author", RelationDecl::new("User", "user_id")),
    ]
}

fn setup_database(options: DatabaseOptions) -> (Database, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let store = Arc::new(MemoryStore::with_tables(["user", "book"]));
    let mut db = Database::connect_with_sink(store, options, sink.clone());
    for definition in definitions() {
        db.add_model(definition).unwrap();
    }
    assert!(db.init_relations().is_complete());
    (db, sink)
}

fn setup() -> Database {
    setup_database(DatabaseOptions::default()).0
}

async fn seed_users(db: &Database, count: u64) {
    let users = db.model("User").unwrap();
    for i in 1..=count {
        users
            .create(json!({"name": format!("user{}", i), "age": i}))
            .await
            .unwrap();
    }
}

async fn seed_library(db: &Database) {
    let users = db.model("User").unwrap();
    let books = db.model("Book").unwrap();

    let ann = users.create(json!({"name": "Ann"})).await.unwrap();
    let bob = users.create(json!({"name": "Bob"})).await.unwrap();
    users.create(json!({"name": "Cid"})).await.unwrap();

    for (name, owner) in [("Dune", &ann), ("Emma", &ann), ("Ulysses", &bob)] {
        books
            .create(json!({"name": name, "pages": 300, "user_id": owner["id"]}))
            .await
            .unwrap();
    }
    books
        .create(json!({"name": "Orphan", "pages": 10, "user_id": null}))
        .await
        .unwrap();
}

fn names(rows: &[Row]) -> Vec<&str> {
    rows.iter().map(|r| r["name"].as_str().unwrap()).collect()
}

// =============================================================================
// Create Tests
// =============================================================================

/// Create coerces the input, fills defaults and returns the stored row.
#[tokio::test]
async fn test_create_returns_stored_row() {
    let db = setup();
    let users = db.model("User").unwrap();

    let row = users
        .create(json!({"name": "Ann", "age": "42", "role": "admin"}))
        .await
        .unwrap();

    assert_eq!(row["id"], json!(1));
    assert_eq!(row["name"], json!("Ann"));
    assert_eq!(row["age"], json!(42));
    assert_eq!(row["deleted"], json!(false));
    assert!(row["created"].as_str().unwrap().ends_with('Z'));
    assert!(!row.contains_key("role"));
}

/// Non-object documents are rejected before storage is touched.
#[tokio::test]
async fn test_create_rejects_non_object() {
    let db = setup();
    let err = db.model("User").unwrap().create(json!([1])).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_OPERATION");
}

// =============================================================================
// Read Tests
// =============================================================================

#[tokio::test]
async fn test_find_with_operators_and_sort() {
    let db = setup();
    seed_users(&db, 7).await;

    let rows = db
        .model("User")
        .unwrap()
        .find(json!({"age": {"$gt": 2, "$lte": 5}}))
        .unwrap()
        .sort("-age")
        .unwrap()
        .exec()
        .await
        .unwrap()
        .into_rows();

    assert_eq!(names(&rows), vec!["user5", "user4", "user3"]);
}

#[tokio::test]
async fn test_find_one() {
    let db = setup();
    seed_users(&db, 3).await;
    let users = db.model("User").unwrap();

    let found = users
        .find_one(json!({"name": "user2"}))
        .unwrap()
        .exec()
        .await
        .unwrap();
    assert!(matches!(&found, QueryOutput::Row(Some(row)) if row["age"] == json!(2)));

    let missing = users
        .find_one(json!({"name": "nobody"}))
        .unwrap()
        .exec()
        .await
        .unwrap();
    assert_eq!(missing, QueryOutput::Row(None));
}

#[tokio::test]
async fn test_count() {
    let db = setup();
    seed_users(&db, 7).await;
    let users = db.model("User").unwrap();

    assert_eq!(users.count(json!({})).await.unwrap(), 7);
    assert_eq!(users.count(json!({"age": {"$in": [1, 2, 99]}})).await.unwrap(), 2);
}

/// Excluded fields are stripped, selected fields are the only ones returned.
#[tokio::test]
async fn test_select_projection() {
    let db = setup();
    seed_users(&db, 2).await;
    let users = db.model("User").unwrap();

    let rows = users
        .find(json!({}))
        .unwrap()
        .select("-created -deleted")
        .unwrap()
        .exec()
        .await
        .unwrap()
        .into_rows();
    assert_eq!(
        rows[0].keys().collect::<Vec<_>>(),
        vec!["id", "age", "name"]
    );

    let rows = users
        .find(json!({}))
        .unwrap()
        .select(["name"])
        .unwrap()
        .exec()
        .await
        .unwrap()
        .into_rows();
    assert_eq!(rows[0], *json!({"name": "user1"}).as_object().unwrap());
}

#[tokio::test]
async fn test_invalid_builder_calls() {
    let db = setup();
    let users = db.model("User").unwrap();

    assert!(matches!(
        users.find(json!("name")),
        Err(QueryError::InvalidOperation(_))
    ));
    assert!(matches!(
        users.find(json!({})).unwrap().sort(""),
        Err(QueryError::InvalidOperation(_))
    ));
}

/// SQL rendering of a compiled request.
#[tokio::test]
async fn test_to_sql() {
    let db = setup();
    let (sql, bindings) = db
        .model("User")
        .unwrap()
        .find(json!({"id": {"$in": [1, 2, 3]}, "deleted": null}))
        .unwrap()
        .sort("-age name")
        .unwrap()
        .limit(5)
        .to_sql()
        .unwrap();

    assert_eq!(
        sql,
        "select * from \"user\" where \"id\" in (?, ?, ?) and \"deleted\" is null order by \"age\" desc, \"name\" asc limit 5"
    );
    assert_eq!(bindings, vec![json!(1), json!(2), json!(3)]);
}

// =============================================================================
// Pagination Tests
// =============================================================================

/// Page 2 of size 3 over 7 ordered rows is rows 4-6, count 7.
#[tokio::test]
async fn test_paginate_second_page() {
    let db = setup();
    seed_users(&db, 7).await;

    let (rows, info) = db
        .model("User")
        .unwrap()
        .find(json!({}))
        .unwrap()
        .sort("age")
        .unwrap()
        .paginate(Pagination::new(2, 3))
        .await
        .unwrap();

    assert_eq!(names(&rows), vec!["user4", "user5", "user6"]);
    assert_eq!((info.page, info.limit, info.count), (2, 3, 7));
}

/// Missing pagination values fall back to page 1 and the request limit.
#[tokio::test]
async fn test_paginate_defaults() {
    let db = setup();
    seed_users(&db, 12).await;
    let users = db.model("User").unwrap();

    let (rows, info) = users
        .find(json!({}))
        .unwrap()
        .paginate(Pagination::default())
        .await
        .unwrap();
    assert_eq!(rows.len(), 10);
    assert_eq!((info.page, info.limit, info.count), (1, 10, 12));

    let (rows, info) = users
        .find(json!({"age": {"$gt": 2}}))
        .unwrap()
        .limit(4)
        .paginate(Pagination::new(3, 0))
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!((info.page, info.limit, info.count), (3, 4, 10));
}

// =============================================================================
// Mutation Tests
// =============================================================================

/// Mutation counts equal the number of affected rows.
#[tokio::test]
async fn test_update_and_delete_counts() {
    let db = setup();
    seed_users(&db, 5).await;
    let users = db.model("User").unwrap();

    let updated = users
        .update_many(json!({}), json!({"deleted": 1}))
        .await
        .unwrap();
    assert_eq!(updated, 5);
    assert_eq!(users.count(json!({"deleted": true})).await.unwrap(), 5);

    let updated = users
        .update_one(json!({"deleted": true}), json!({"email": "x@y.z"}))
        .await
        .unwrap();
    assert_eq!(updated, 1);

    let deleted = users.delete_many(json!({})).await.unwrap();
    assert_eq!(deleted, 5);
    assert_eq!(users.count(json!({})).await.unwrap(), 0);
}

/// save writes declared properties back; update merges first.
#[tokio::test]
async fn test_save_and_update_instance() {
    let db = setup();
    let users = db.model("User").unwrap();
    let mut ann = users.create(json!({"name": "Ann", "age": 30})).await.unwrap();

    ann.insert("age".into(), json!(31));
    assert_eq!(users.save(&ann).await.unwrap(), 1);

    assert_eq!(
        users.update(&mut ann, json!({"email": "ann@example.com"})).await.unwrap(),
        1
    );
    assert_eq!(ann["email"], json!("ann@example.com"));

    let stored = users
        .find_one(json!({"id": ann["id"]}))
        .unwrap()
        .exec()
        .await
        .unwrap()
        .into_row()
        .unwrap();
    assert_eq!(stored["age"], json!(31));
    assert_eq!(stored["email"], json!("ann@example.com"));
}

#[tokio::test]
async fn test_save_requires_id() {
    let db = setup();
    let row: Row = json!({"name": "Ann"}).as_object().cloned().unwrap();
    let err = db.model("User").unwrap().save(&row).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_OPERATION");
}

// =============================================================================
// Populate Tests
// =============================================================================

/// has-many attaches arrays, including empty ones.
#[tokio::test]
async fn test_populate_has_many() {
    let db = setup();
    seed_library(&db).await;

    let rows = db
        .model("User")
        .unwrap()
        .find(json!({}))
        .unwrap()
        .sort("name")
        .unwrap()
        .populate("books")
        .unwrap()
        .exec()
        .await
        .unwrap()
        .into_rows();

    let counts: Vec<usize> = rows
        .iter()
        .map(|r| r["books"].as_array().unwrap().len())
        .collect();
    assert_eq!(counts, vec![2, 1, 0]);
    assert_eq!(rows[0]["books"][0]["name"], json!("Dune"));
}

/// belongs-to attaches an object, or null without an owner.
#[tokio::test]
async fn test_populate_belongs_to() {
    let db = setup();
    seed_library(&db).await;

    let rows = db
        .model("Book")
        .unwrap()
        .find(json!({}))
        .unwrap()
        .populate("author")
        .unwrap()
        .exec()
        .await
        .unwrap()
        .into_rows();

    assert_eq!(rows[0]["author"]["name"], json!("Ann"));
    assert_eq!(rows[2]["author"]["name"], json!("Bob"));
    assert_eq!(rows[3]["author"], Value::Null);
}

/// Nested paths load level by level; selection keeps populated aliases.
#[tokio::test]
async fn test_populate_nested_with_selection() {
    let db = setup();
    seed_library(&db).await;

    let ann = db
        .model("User")
        .unwrap()
        .find_one(json!({"name": "Ann"}))
        .unwrap()
        .select("name")
        .unwrap()
        .populate("books.author")
        .unwrap()
        .exec()
        .await
        .unwrap()
        .into_row()
        .unwrap();

    assert_eq!(ann.keys().collect::<Vec<_>>(), vec!["name", "books"]);
    assert_eq!(ann["books"][1]["author"]["name"], json!("Ann"));
}

#[tokio::test]
async fn test_populate_unknown_relation() {
    let db = setup();
    let err = db
        .model("User")
        .unwrap()
        .find(json!({}))
        .unwrap()
        .populate("friends")
        .unwrap()
        .exec()
        .await
        .unwrap_err();

    assert_eq!(
        err,
        QueryError::UnknownRelation {
            model: "User".into(),
            alias: "friends".into()
        }
    );
}

// =============================================================================
// Error Propagation Tests
// =============================================================================

/// Storage failures surface unchanged.
#[tokio::test]
async fn test_storage_error_propagates() {
    let store = Arc::new(MemoryStore::new());
    let mut db = Database::connect_with_sink(
        store,
        DatabaseOptions::default(),
        Arc::new(MemorySink::new()),
    );
    for definition in definitions() {
        db.add_model(definition).unwrap();
    }

    let err = db
        .model("User")
        .unwrap()
        .find(json!({}))
        .unwrap()
        .exec()
        .await
        .unwrap_err();
    assert_eq!(
        err,
        QueryError::Execution(StorageError::UnknownTable("user".into()))
    );
}

/// Invalid filters fail at compile time.
#[tokio::test]
async fn test_filter_error_propagates() {
    let db = setup();
    let err = db
        .model("User")
        .unwrap()
        .count(json!({"$or": []}))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_DISJUNCTION");
}

/// A scalar `$in` operand is rejected instead of matching nothing.
#[tokio::test]
async fn test_scalar_in_operand_rejected() {
    let db = setup();
    seed_users(&db, 5).await;
    let users = db.model("User").unwrap();

    let err = users
        .find(json!({"age": {"$in": 5}}))
        .unwrap()
        .exec()
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_OPERAND");

    let rows = users
        .find(json!({"age": {"$in": [5]}}))
        .unwrap()
        .exec()
        .await
        .unwrap()
        .into_rows();
    assert_eq!(names(&rows), vec!["user5"]);
}

/// Pages beyond any addressable row are empty but still counted.
#[tokio::test]
async fn test_paginate_huge_page_is_empty() {
    let db = setup();
    seed_users(&db, 3).await;

    let (rows, info) = db
        .model("User")
        .unwrap()
        .find(json!({}))
        .unwrap()
        .paginate(Pagination::new(i64::MAX, i64::MAX))
        .await
        .unwrap();

    assert!(rows.is_empty());
    assert_eq!(info.count, 3);
    assert_eq!(info.page, i64::MAX as u64);
}

/// Debug mode reports every executed statement.
#[tokio::test]
async fn test_debug_reports_sql() {
    let (db, sink) = setup_database(DatabaseOptions {
        debug: true,
        ..DatabaseOptions::default()
    });
    seed_users(&db, 2).await;
    db.model("User").unwrap().count(json!({})).await.unwrap();

    assert_eq!(sink.count(Event::QueryExecuted), 3);
    let last = sink.diagnostics().pop().unwrap();
    assert!(last.message.contains("select count(*) from \"user\""));
}
