//! The composable query builder.

use std::sync::Arc;

use rusqlite::{types::Value as SqlValue, ToSql};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::{
    connection::Database,
    error::{DbError, Result},
    expr::{
        column::{validate_identifier, Col},
        ops::{ExistsOp, Operator},
    },
    model::{fresh_timestamp, Model},
    page::{Page, DEFAULT_PER_PAGE},
    query::{
        clause::{push_wheres, OrderClause, WhereClause},
        DeleteQuery, UpdateQuery,
    },
    relation::eager_load,
    schema::Schema,
    traits::Expression,
    value::{from_sql_ref, is_blank, key_string, to_sql_value, Attributes},
};

/// Direction of an `ORDER BY` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub const fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Result of [`Builder::pluck`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Plucked {
    /// One value per row, in query order.
    Values(Vec<Value>),
    /// `key column => value column`; later rows win on duplicate keys.
    Keyed(Attributes),
}

enum RemovedScopes {
    None,
    All,
    Named(Vec<String>),
}

impl RemovedScopes {
    fn contains(&self, name: &str) -> bool {
        match self {
            RemovedScopes::None => false,
            RemovedScopes::All => true,
            RemovedScopes::Named(names) => names.iter().any(|n| n == name),
        }
    }
}

/// A query over the table of one [`Schema`].
///
/// Mutators consume and return the builder so calls chain; terminal methods
/// consume it and run the query. Global scopes of the schema are applied when
/// a terminal method runs, unless removed with
/// [`Builder::without_global_scopes`].
///
/// Column names and relation names passed to mutators are checked eagerly,
/// but the first error is only reported by the terminal method, so chains stay
/// infallible.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use repokit_db::{Builder, Database, Schema, SortDirection};
///
/// let db = Database::open_in_memory().unwrap();
/// db.execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)").unwrap();
///
/// let schema = Arc::new(Schema::new("user", "users"));
/// let users = Builder::new(schema, db)
///     .where_eq("name", "soar")
///     .order_by("id", SortDirection::Desc)
///     .limit(10)
///     .get(&[])
///     .unwrap();
/// assert!(users.is_empty());
/// ```
pub struct Builder {
    schema: Arc<Schema>,
    db: Database,
    wheres: Vec<WhereClause>,
    orders: Vec<OrderClause>,
    eager: Vec<String>,
    removed_scopes: RemovedScopes,
    hidden: Option<Vec<String>>,
    visible: Option<Vec<String>>,
    limit: Option<u64>,
    offset: Option<u64>,
    invalid: Option<DbError>,
}

impl Builder {
    /// Starts a new, unconstrained query on the schema's table.
    pub fn new(schema: Arc<Schema>, db: Database) -> Self {
        Self {
            schema,
            db,
            wheres: vec![],
            orders: vec![],
            eager: vec![],
            removed_scopes: RemovedScopes::None,
            hidden: None,
            visible: None,
            limit: None,
            offset: None,
            invalid: None,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn reject(&mut self, err: DbError) {
        if self.invalid.is_none() {
            self.invalid = Some(err);
        }
    }

    fn column(&mut self, name: &str) -> Col {
        if let Err(err) = validate_identifier(name, "column") {
            self.reject(err);
        }
        Col::named(name)
    }

    /// Adds a WHERE condition built from the expression DSL.
    pub fn filter<E: Expression + 'static>(mut self, expr: E) -> Self {
        self.wheres.push(WhereClause::new(expr));
        self
    }

    /// Adds `column = value`.
    pub fn where_eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.where_op(column, Operator::Eq, value)
    }

    /// Adds `column <op> value`. `LIKE` matches the value anywhere in the column.
    pub fn where_op(mut self, column: &str, op: Operator, value: impl Into<Value>) -> Self {
        let col = self.column(column);
        match (op, value.into()) {
            (Operator::Like, Value::String(pattern)) => self.filter(col.like(pattern)),
            (Operator::Like, other) => self.filter(col.like(other.to_string())),
            (op, value) => self.filter(col.compare(op, value)),
        }
    }

    /// Adds `column IN (values)`.
    pub fn where_in<T, I>(mut self, column: &str, values: I) -> Self
    where
        T: Into<Value>,
        I: IntoIterator<Item = T>,
    {
        let col = self.column(column);
        self.filter(col.in_(values))
    }

    /// Eager loads the named relations on every returned model.
    ///
    /// Nested relations are written with dots (`posts.comments`).
    pub fn with<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for relation in relations {
            let relation = relation.into();
            if !self.eager.contains(&relation) {
                self.eager.push(relation);
            }
        }
        self
    }

    /// Restricts results to rows that have at least one related row.
    pub fn has(mut self, relation: &str) -> Self {
        let Some(rel) = self.schema.get_relation(relation) else {
            let err = DbError::UnknownRelation {
                model: self.schema.name().to_string(),
                relation: relation.to_string(),
            };
            self.reject(err);
            return self;
        };

        let related = (rel.related)();
        let outer = format!("{}.{}", self.schema.table(), rel.local_column);
        let exists = ExistsOp::new(related.table(), rel.related_column.clone(), outer);
        self.filter(exists)
    }

    /// Appends an ORDER BY clause.
    pub fn order_by(mut self, column: &str, direction: SortDirection) -> Self {
        let col = self.column(column);
        self.orders.push(OrderClause {
            column: col.name.into_owned(),
            desc: direction == SortDirection::Desc,
        });
        self
    }

    /// Removes global scopes from this query: all of them when `scopes` is
    /// empty, otherwise only the named ones.
    pub fn without_global_scopes(mut self, scopes: &[&str]) -> Self {
        self.removed_scopes = match (self.removed_scopes, scopes.is_empty()) {
            (_, true) | (RemovedScopes::All, _) => RemovedScopes::All,
            (RemovedScopes::None, false) => {
                RemovedScopes::Named(scopes.iter().map(|s| s.to_string()).collect())
            }
            (RemovedScopes::Named(mut names), false) => {
                names.extend(scopes.iter().map(|s| s.to_string()));
                RemovedScopes::Named(names)
            }
        };
        self
    }

    /// Attributes to hide on every returned model.
    pub fn set_hidden<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hidden = Some(attributes.into_iter().map(Into::into).collect());
        self
    }

    /// Attributes to show on every returned model; all others are hidden.
    pub fn set_visible<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.visible = Some(attributes.into_iter().map(Into::into).collect());
        self
    }

    /// Passes each filter entry to the handler the schema registered for its
    /// key. Blank values and keys without a handler are skipped.
    pub fn apply_filters(mut self, filters: &Attributes) -> Self {
        for (key, value) in filters {
            if is_blank(value) {
                continue;
            }
            let Some(handler) = self.schema.filter_handler(key).cloned() else {
                trace!(filter = %key, model = %self.schema.name(), "no filter handler, skipping");
                continue;
            };
            self = handler(self, value);
        }
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Limits the query to page `page` (1-based) of `per_page` rows.
    ///
    /// An offset past the end of the addressable range saturates, so an
    /// oversized page reads as an empty one.
    pub fn for_page(mut self, page: u64, per_page: u64) -> Self {
        self.limit = Some(per_page);
        self.offset = Some(page.saturating_sub(1).saturating_mul(per_page));
        self
    }

    /// Applies the remaining global scopes. Applying twice is a no-op.
    fn scoped(mut self) -> Self {
        let scopes = self
            .schema
            .scopes()
            .iter()
            .filter(|(name, _)| !self.removed_scopes.contains(name))
            .map(|(_, scope)| Arc::clone(scope))
            .collect::<Vec<_>>();

        self.removed_scopes = RemovedScopes::All;
        for scope in scopes {
            self = scope(self);
        }
        self
    }

    fn check(&mut self) -> Result<()> {
        match self.invalid.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Runs the query and returns every matching model.
    ///
    /// An empty `columns` slice selects all columns.
    pub fn get(self, columns: &[&str]) -> Result<Vec<Model>> {
        let mut query = self.scoped();
        query.check()?;

        let rows = query.fetch_rows(columns)?;
        let mut models = rows
            .into_iter()
            .map(|attributes| {
                Model::from_row(Arc::clone(&query.schema), query.db.clone(), attributes)
            })
            .collect::<Vec<_>>();

        for model in &mut models {
            if let Some(hidden) = &query.hidden {
                model.set_hidden(hidden.clone());
            }
            if let Some(visible) = &query.visible {
                model.set_visible(visible.clone());
            }
        }

        eager_load(&query.schema, &query.db, &mut models, &query.eager)?;
        Ok(models)
    }

    /// Runs the query and returns the first matching model.
    pub fn first(self, columns: &[&str]) -> Result<Option<Model>> {
        Ok(self.limit(1).get(columns)?.into_iter().next())
    }

    /// Finds a model by primary key.
    pub fn find(self, id: impl Into<Value>, columns: &[&str]) -> Result<Option<Model>> {
        let key_name = self.schema.key_name().to_string();
        self.where_eq(&key_name, id).first(columns)
    }

    /// Counts matching rows. Limit and offset are ignored.
    pub fn count(self) -> Result<u64> {
        let mut query = self.scoped();
        query.check()?;
        query.count_rows()
    }

    /// Returns page `page` (1-based) of `per_page` rows with the total count.
    ///
    /// A `per_page` of zero uses [`DEFAULT_PER_PAGE`]; a `page` of zero is
    /// treated as the first page.
    pub fn paginate(self, per_page: u64, page: u64, columns: &[&str]) -> Result<Page<Model>> {
        let per_page = if per_page == 0 {
            DEFAULT_PER_PAGE
        } else {
            per_page
        };
        let page = page.max(1);

        let mut query = self.scoped();
        query.check()?;
        let total = query.count_rows()?;
        let data = query.for_page(page, per_page).get(columns)?;

        Ok(Page::new(data, total, per_page, page))
    }

    /// Returns the values of one column, optionally keyed by another column.
    pub fn pluck(self, value: &str, key: Option<&str>) -> Result<Plucked> {
        let mut query = self.scoped();
        query.check()?;

        let columns = match key {
            Some(key) if key != value => vec![value, key],
            _ => vec![value],
        };
        let rows = query.fetch_rows(&columns)?;

        let plucked = match key {
            None => Plucked::Values(
                rows.into_iter()
                    .map(|row| row.get(value).cloned().unwrap_or(Value::Null))
                    .collect(),
            ),
            Some(key) => Plucked::Keyed(
                rows.into_iter()
                    .map(|row| {
                        let k = row.get(key).map(key_string).unwrap_or_default();
                        let v = row.get(value).cloned().unwrap_or(Value::Null);
                        (k, v)
                    })
                    .collect(),
            ),
        };
        Ok(plucked)
    }

    /// Updates every matching row with a single statement and returns the
    /// number of affected rows.
    ///
    /// No model is loaded, so no observer fires. The updated-at timestamp is
    /// touched when the schema keeps timestamps. Ordering, limit and offset
    /// are ignored.
    pub fn update(self, data: &Attributes) -> Result<usize> {
        let mut query = self.scoped();
        query.check()?;

        let mut update = UpdateQuery::table(query.db.clone(), query.schema.table());
        for (column, value) in data {
            validate_identifier(column, "column")?;
            update = update.set(column.clone(), to_sql_value(value));
        }
        if let Some(timestamps) = query.schema.get_timestamps() {
            if !data.contains_key(&timestamps.updated_at) {
                update = update.set(timestamps.updated_at.clone(), fresh_timestamp());
            }
        }

        update.with_wheres(query.wheres).execute()
    }

    /// Deletes every matching row with a single statement.
    ///
    /// Like [`Builder::update`], this bypasses observers.
    pub fn delete(self) -> Result<usize> {
        let mut query = self.scoped();
        query.check()?;

        DeleteQuery::from(query.db.clone(), query.schema.table())
            .with_wheres(query.wheres)
            .execute()
    }

    fn fetch_rows(&self, columns: &[&str]) -> Result<Vec<Attributes>> {
        let (sql, params) = self.build_sql(columns)?;
        debug!(sql = %sql, params = params.len(), "select");

        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let column_names = stmt
                .column_names()
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>();

            let params_ref: Vec<&dyn ToSql> = params.iter().map(|v| v as &dyn ToSql).collect();
            let rows = stmt.query_map(params_ref.as_slice(), |row| {
                let mut attributes = Attributes::new();
                for (idx, name) in column_names.iter().enumerate() {
                    attributes.insert(name.clone(), from_sql_ref(row.get_ref(idx)?));
                }
                Ok(attributes)
            })?;
            rows.collect()
        })
    }

    fn count_rows(&self) -> Result<u64> {
        let (sql, params) = self.build_count_sql();
        debug!(sql = %sql, params = params.len(), "count");

        let count: i64 = self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let params_ref: Vec<&dyn ToSql> = params.iter().map(|v| v as &dyn ToSql).collect();
            stmt.query_row(params_ref.as_slice(), |row| row.get(0))
        })?;
        Ok(count.max(0) as u64)
    }

    fn build_sql(&self, columns: &[&str]) -> Result<(String, Vec<SqlValue>)> {
        let select = match columns {
            [] | ["*"] => "*".to_string(),
            columns => {
                for column in columns {
                    validate_identifier(column, "column")?;
                }
                columns.join(", ")
            }
        };

        let mut params = vec![];
        let mut sql = format!("SELECT {} FROM {}", select, self.schema.table());
        push_wheres(&mut sql, &self.wheres, &mut params);

        if !self.orders.is_empty() {
            sql.push_str(" ORDER BY ");
            let orders = self
                .orders
                .iter()
                .map(|o| format!("{} {}", o.column, if o.desc { "DESC" } else { "ASC" }))
                .collect::<Vec<_>>();
            sql.push_str(&orders.join(", "));
        }

        // SQLite reads LIMIT and OFFSET as signed 64-bit integers.
        let clamp = |n: u64| n.min(i64::MAX as u64);
        match (self.limit.map(clamp), self.offset.map(clamp)) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
            (None, None) => {}
        }

        Ok((sql, params))
    }

    fn build_count_sql(&self) -> (String, Vec<SqlValue>) {
        let mut params = vec![];
        let mut sql = format!("SELECT COUNT(*) FROM {}", self.schema.table());
        push_wheres(&mut sql, &self.wheres, &mut params);

        (sql, params)
    }
}

impl std::fmt::Debug for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("table", &self.schema.table())
            .field("wheres", &self.wheres.len())
            .field("orders", &self.orders.len())
            .field("eager", &self.eager)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn setup() -> (Arc<Schema>, Database) {
        let db = Database::open_in_memory().unwrap();
        db.execute_batch(
            "CREATE TABLE packages (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                version TEXT NOT NULL,
                downloads INTEGER NOT NULL DEFAULT 0,
                archived INTEGER NOT NULL DEFAULT 0
            );
            INSERT INTO packages (name, version, downloads) VALUES ('soar', '1.0.0', 300);
            INSERT INTO packages (name, version, downloads) VALUES ('zls', '0.15.1', 100);
            INSERT INTO packages (name, version, downloads) VALUES ('rust-analyzer', '1.92.0', 200);
            INSERT INTO packages (name, version, downloads, archived) VALUES ('old', '0.0.1', 5, 1);",
        )
        .unwrap();

        let schema = Schema::new("package", "packages")
            .scope("active", |q| q.where_eq("archived", 0))
            .filter("name", |q, v| {
                q.where_op("name", Operator::Like, v.as_str().unwrap_or_default())
            })
            .filter("min_downloads", |q, v| {
                q.where_op("downloads", Operator::Gte, v.clone())
            });
        (Arc::new(schema), db)
    }

    fn names(models: &[Model]) -> Vec<String> {
        models
            .iter()
            .map(|m| m.get("name").and_then(Value::as_str).unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_global_scope_applies_unless_removed() {
        let (schema, db) = setup();

        let scoped = Builder::new(schema.clone(), db.clone()).count().unwrap();
        assert_eq!(scoped, 3);

        let all = Builder::new(schema.clone(), db.clone())
            .without_global_scopes(&[])
            .count()
            .unwrap();
        assert_eq!(all, 4);

        let named = Builder::new(schema, db)
            .without_global_scopes(&["active"])
            .count()
            .unwrap();
        assert_eq!(named, 4);
    }

    #[test]
    fn test_order_and_limit() {
        let (schema, db) = setup();

        let models = Builder::new(schema, db)
            .order_by("downloads", SortDirection::Desc)
            .limit(2)
            .get(&[])
            .unwrap();

        assert_eq!(names(&models), vec!["soar", "rust-analyzer"]);
    }

    #[test]
    fn test_apply_filters_skips_blank_and_unknown_keys() {
        let (schema, db) = setup();
        let filters = json!({"name": "s", "min_downloads": 150, "unknown": "x", "blank": ""});

        let models = Builder::new(schema.clone(), db.clone())
            .apply_filters(filters.as_object().unwrap())
            .order_by("name", SortDirection::Asc)
            .get(&["name"])
            .unwrap();
        assert_eq!(names(&models), vec!["rust-analyzer", "soar"]);

        let blank = json!({"name": "", "min_downloads": null});
        let count = Builder::new(schema, db)
            .apply_filters(blank.as_object().unwrap())
            .count()
            .unwrap();
        assert_eq!(count, 3);
    }

    #[test]
    fn test_paginate() {
        let (schema, db) = setup();

        let page = Builder::new(schema.clone(), db.clone())
            .order_by("id", SortDirection::Asc)
            .paginate(2, 2, &[])
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.last_page, 2);
        assert_eq!(page.current_page, 2);
        assert_eq!(names(&page.data), vec!["rust-analyzer"]);

        let page = Builder::new(schema, db).paginate(0, 0, &[]).unwrap();
        assert_eq!(page.per_page, DEFAULT_PER_PAGE);
        assert_eq!(page.current_page, 1);
        assert_eq!(page.data.len(), 3);
    }

    #[test]
    fn test_paginate_past_the_end() {
        let (schema, db) = setup();

        let page = Builder::new(schema.clone(), db.clone())
            .paginate(15, i64::MAX as u64, &[])
            .unwrap();
        assert_eq!(page.total, 3);
        assert!(page.data.is_empty());

        let page = Builder::new(schema, db)
            .paginate(u64::MAX, u64::MAX, &[])
            .unwrap();
        assert_eq!(page.last_page, 1);
        assert!(page.data.is_empty());
    }

    #[test]
    fn test_pluck() {
        let (schema, db) = setup();

        let values = Builder::new(schema.clone(), db.clone())
            .order_by("id", SortDirection::Asc)
            .pluck("name", None)
            .unwrap();
        assert_eq!(values, Plucked::Values(vec![json!("soar"), json!("zls"), json!("rust-analyzer")]));

        let keyed = Builder::new(schema, db)
            .where_eq("name", "zls")
            .pluck("version", Some("id"))
            .unwrap();
        assert_eq!(
            keyed,
            Plucked::Keyed(json!({"2": "0.15.1"}).as_object().unwrap().clone())
        );
    }

    #[test]
    fn test_bulk_update_and_delete() {
        let (schema, db) = setup();
        let data = json!({"version": "2.0.0"});

        let updated = Builder::new(schema.clone(), db.clone())
            .where_op("downloads", Operator::Gt, 150)
            .update(data.as_object().unwrap())
            .unwrap();
        assert_eq!(updated, 2);

        let deleted = Builder::new(schema.clone(), db.clone())
            .where_eq("version", "2.0.0")
            .delete()
            .unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(Builder::new(schema, db).count().unwrap(), 1);
    }

    #[test]
    fn test_invalid_column_is_reported_at_execution() {
        let (schema, db) = setup();

        let result = Builder::new(schema.clone(), db.clone())
            .order_by("name; DROP TABLE packages", SortDirection::Asc)
            .get(&[]);
        assert!(matches!(result, Err(DbError::InvalidIdentifier { .. })));

        let result = Builder::new(schema, db).has("maintainers").count();
        assert!(matches!(result, Err(DbError::UnknownRelation { .. })));
    }
}
