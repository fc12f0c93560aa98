//! Model runtime adapter
//!
//! [`Model`] binds one registered schema to a database and exposes the CRUD
//! entry points. Reads return a [`Query`] to refine before execution;
//! writes coerce their input and run immediately.
//!
//! ```ignore
//! let users = db.model("User")?;
//! let ann = users.create(json!({"name": "Ann"})).await?;
//! let adults = users
//!     .find(json!({"age": {"$gte": 18}}))?
//!     .sort("-age")?
//!     .populate("books")?
//!     .exec()
//!     .await?
//!     .into_rows();
//! ```

mod coerce;

use serde_json::{Map, Value};

use crate::database::Database;
use crate::query::{Query, QueryError, QueryKind, QueryResult};
use crate::schema::{ModelSchema, PRIMARY_KEY};
use crate::storage::Row;

pub use coerce::{apply_defaults, coerce_properties, coerce_value, truthy};

#[derive(Debug, Clone, Copy)]
pub struct Model<'a> {
    db: &'a Database,
    schema: &'a ModelSchema,
}

impl<'a> Model<'a> {
    pub(crate) fn new(db: &'a Database, schema: &'a ModelSchema) -> Self {
        Self { db, schema }
    }

    pub fn name(&self) -> &'a str {
        &self.schema.name
    }

    pub fn schema(&self) -> &'a ModelSchema {
        self.schema
    }

    /// Unfiltered select request
    pub fn query(&self) -> Query<'a> {
        Query::new(self.db, self.schema, QueryKind::Select)
    }

    /// Coerces `doc`, fills defaults and inserts it. Returns the stored row.
    pub async fn create(&self, doc: Value) -> QueryResult<Row> {
        let mut row = self.coerce(&doc)?;
        apply_defaults(&mut row, self.schema);

        let output = Query::new(self.db, self.schema, QueryKind::Insert)
            .with_payload(row)
            .exec()
            .await?;
        output
            .into_row()
            .ok_or_else(|| QueryError::invalid("Insert returned no row"))
    }

    pub fn find(&self, filter: Value) -> QueryResult<Query<'a>> {
        self.query().filter(filter)
    }

    /// Like `find`, but the output is the first row or none.
    pub fn find_one(&self, filter: Value) -> QueryResult<Query<'a>> {
        self.query().first().filter(filter)
    }

    pub async fn count(&self, filter: Value) -> QueryResult<u64> {
        let output = Query::new(self.db, self.schema, QueryKind::Count)
            .filter(filter)?
            .exec()
            .await?;
        Ok(output.as_count().unwrap_or(0))
    }

    /// Patches every matching row with the coerced `doc`.
    pub async fn update_many(&self, filter: Value, doc: Value) -> QueryResult<u64> {
        self.update_where(filter, doc, false).await
    }

    /// Patches at most one matching row.
    pub async fn update_one(&self, filter: Value, doc: Value) -> QueryResult<u64> {
        self.update_where(filter, doc, true).await
    }

    pub async fn delete_many(&self, filter: Value) -> QueryResult<u64> {
        let output = Query::new(self.db, self.schema, QueryKind::Delete)
            .filter(filter)?
            .exec()
            .await?;
        Ok(output.as_count().unwrap_or(0))
    }

    /// Writes the declared properties of `row` back, keyed by its `id`.
    pub async fn save(&self, row: &Row) -> QueryResult<u64> {
        let id = row
            .get(PRIMARY_KEY)
            .filter(|id| !id.is_null())
            .cloned()
            .ok_or_else(|| QueryError::invalid("Cannot save a row without id"))?;

        let patch = coerce_properties(row, self.schema, self.db.sink().as_ref());
        if patch.is_empty() {
            return Ok(0);
        }

        let filter = Value::Object(Map::from_iter([(PRIMARY_KEY.to_string(), id)]));
        let output = Query::new(self.db, self.schema, QueryKind::Update)
            .with_payload(patch)
            .first()
            .filter(filter)?
            .exec()
            .await?;
        Ok(output.as_count().unwrap_or(0))
    }

    /// Merges `doc` into `row`, then saves it.
    pub async fn update(&self, row: &mut Row, doc: Value) -> QueryResult<u64> {
        match doc {
            Value::Object(doc) => row.extend(doc),
            other => {
                return Err(QueryError::invalid(format!(
                    "Update document must be an object, got {}",
                    other
                )))
            }
        }
        self.save(row).await
    }

    async fn update_where(&self, filter: Value, doc: Value, single: bool) -> QueryResult<u64> {
        let patch = self.coerce(&doc)?;
        let mut query = Query::new(self.db, self.schema, QueryKind::Update).with_payload(patch);
        if single {
            query = query.first();
        }
        let output = query.filter(filter)?.exec().await?;
        Ok(output.as_count().unwrap_or(0))
    }

    fn coerce(&self, doc: &Value) -> QueryResult<Row> {
        let doc = doc.as_object().ok_or_else(|| {
            QueryError::invalid(format!("Document must be an object, got {}", doc))
        })?;
        Ok(coerce_properties(doc, self.schema, self.db.sink().as_ref()))
    }
}
