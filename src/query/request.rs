//! Query request builder
//!
//! `Query` accumulates filters, selection, ordering and populate paths.
//! `compile` is pure and may be called any number of times; `exec` and
//! `paginate` consume the request.

use serde_json::{Map, Value};

use crate::database::Database;
use crate::filter::{compile, WhereClause};
use crate::schema::{ModelSchema, PRIMARY_KEY};
use crate::storage::{OrderBy, Row, SelectPlan};

use super::compiled::{CompiledQuery, QueryKind, QueryOutput, Statement};
use super::errors::{QueryError, QueryResult};
use super::pagination::{page_range, PageInfo, Pagination};
use super::populate::{self, Populate, PopulateNode};
use super::projection::{split_sign, Fields, Projection};

#[derive(Debug, Clone)]
pub struct Query<'a> {
    db: &'a Database,
    schema: &'a ModelSchema,
    kind: QueryKind,
    filter: Map<String, Value>,
    projection: Projection,
    order: Vec<OrderBy>,
    limit: Option<usize>,
    offset: Option<usize>,
    populate: Vec<PopulateNode>,
    /// Row to insert, or patch to apply
    payload: Option<Row>,
    /// Return only the first row
    first: bool,
    page_limit: u64,
}

impl<'a> Query<'a> {
    pub(crate) fn new(db: &'a Database, schema: &'a ModelSchema, kind: QueryKind) -> Self {
        Self {
            db,
            schema,
            kind,
            filter: Map::new(),
            projection: Projection::default(),
            order: Vec::new(),
            limit: None,
            offset: None,
            populate: Vec::new(),
            payload: None,
            first: false,
            page_limit: db.options().default_limit,
        }
    }

    pub(crate) fn with_payload(mut self, payload: Row) -> Self {
        self.payload = Some(payload);
        self
    }

    pub(crate) fn first(mut self) -> Self {
        self.first = true;
        self
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub fn schema(&self) -> &'a ModelSchema {
        self.schema
    }

    /// Merges the keys of a filter object; later keys overwrite earlier ones.
    pub fn filter(mut self, filter: Value) -> QueryResult<Self> {
        match filter {
            Value::Object(map) => {
                self.filter.extend(map);
                Ok(self)
            }
            Value::Null => Ok(self),
            other => Err(QueryError::invalid(format!(
                "Filter must be an object, got {}",
                other
            ))),
        }
    }

    /// Adds selected fields; `-field` excludes a field instead.
    pub fn select(mut self, fields: impl Into<Fields>) -> QueryResult<Self> {
        if self.kind != QueryKind::Select {
            return Err(QueryError::invalid(format!(
                "Invalid 'select' for operation {}",
                self.kind
            )));
        }
        for field in fields.into().iter() {
            self.projection.push(field);
        }
        Ok(self)
    }

    /// Adds ordering; `-field` sorts descending.
    pub fn sort(mut self, fields: impl Into<Fields>) -> QueryResult<Self> {
        let fields = fields.into();
        if fields.is_empty() {
            return Err(QueryError::invalid("Invalid parameter of sort"));
        }
        for field in fields.iter() {
            match split_sign(field) {
                ("", _) => return Err(QueryError::invalid("Invalid parameter of sort")),
                (name, true) => self.order.push(OrderBy::desc(name)),
                (name, false) => self.order.push(OrderBy::asc(name)),
            }
        }
        Ok(self)
    }

    /// Caps the number of rows; also the default page size of `paginate`.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        if limit > 0 {
            self.page_limit = limit as u64;
        }
        self
    }

    pub fn skip(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Adds relations to load with the result.
    pub fn populate(mut self, populate: impl Into<Populate>) -> QueryResult<Self> {
        if self.kind != QueryKind::Select {
            return Err(QueryError::invalid(format!(
                "Invalid 'populate' for operation {}",
                self.kind
            )));
        }
        self.populate.extend(populate.into().parse()?);
        Ok(self)
    }

    /// Builds the predicate tree and the storage statement.
    pub fn compile(&self) -> QueryResult<CompiledQuery<'a>> {
        let tree = compile(&self.filter)?;
        let clause = WhereClause::from_predicate(tree.as_ref());
        let table = self.schema.table_name.clone();

        let statement = match self.kind {
            QueryKind::Select => {
                populate::validate(self.db.registry(), self.schema, &self.populate)?;

                let mut required = Vec::new();
                for node in &self.populate {
                    if let Some(relation) = self.schema.relation(&node.alias) {
                        required.push(relation.source_key());
                    }
                }
                if !self.populate.is_empty() {
                    required.push(PRIMARY_KEY);
                }

                let mut plan = SelectPlan::new(table, clause);
                plan.columns = self.projection.columns(&required);
                plan.order = self.order.clone();
                plan.limit = if self.first { Some(1) } else { self.limit };
                plan.offset = self.offset;
                Statement::Select(plan)
            }
            QueryKind::Count => Statement::Count { table, clause },
            QueryKind::Insert => Statement::Insert {
                table,
                row: self.payload.clone().unwrap_or_default(),
            },
            QueryKind::Update => {
                let patch = self.payload.clone().unwrap_or_default();
                if patch.is_empty() {
                    return Err(QueryError::invalid("Empty update"));
                }
                Statement::Update {
                    table,
                    clause,
                    patch,
                    limit: if self.first { Some(1) } else { self.limit },
                }
            }
            QueryKind::Delete => Statement::Delete { table, clause },
        };

        Ok(CompiledQuery {
            db: self.db,
            schema: self.schema,
            kind: self.kind,
            tree,
            statement,
            projection: self.projection.clone(),
            populate: self.populate.clone(),
            first: self.first,
        })
    }

    /// Statement SQL with its bindings, for inspection.
    pub fn to_sql(&self) -> QueryResult<(String, Vec<Value>)> {
        Ok(self.compile()?.to_sql())
    }

    pub async fn exec(self) -> QueryResult<QueryOutput> {
        self.compile()?.execute().await
    }

    /// Runs a select for one page and returns it with the total count.
    pub async fn paginate(self, pagination: Pagination) -> QueryResult<(Vec<Row>, PageInfo)> {
        if self.kind != QueryKind::Select || self.first {
            return Err(QueryError::invalid(format!(
                "Invalid 'paginate' for operation {}",
                self.kind
            )));
        }

        let (page, limit) = pagination.resolve(self.page_limit);
        let (start, end) = page_range(page, limit);
        let result = self.compile()?.execute_range(start, end).await?;

        Ok((
            result.results,
            PageInfo {
                page,
                limit,
                count: result.total,
            },
        ))
    }
}
