//! The generic repository.

use std::sync::Arc;

use repokit_db::{Attributes, Builder, Model, Operator, Page, Plucked, SortDirection};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::{
    container::Container,
    error::Result,
    input::{coerce_int, FilterInput},
    ordering::{order_directions, resolve_direction, resolve_order_columns, table_prefix},
};

/// Values accepted as the ids of [`Repository::delete`].
///
/// A single id, a JSON array, a `Vec`, an array, a slice or a tuple of ids
/// all work, so `delete(1)`, `delete([1, 2, 3])` and `delete((1, 2, 3))`
/// behave the same way.
pub trait IntoIds {
    fn into_ids(self) -> Vec<Value>;
}

impl IntoIds for Value {
    fn into_ids(self) -> Vec<Value> {
        match self {
            Value::Array(ids) => ids,
            id => vec![id],
        }
    }
}

impl<T: Into<Value>> IntoIds for Vec<T> {
    fn into_ids(self) -> Vec<Value> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: Into<Value>, const N: usize> IntoIds for [T; N] {
    fn into_ids(self) -> Vec<Value> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: Into<Value> + Clone> IntoIds for &[T] {
    fn into_ids(self) -> Vec<Value> {
        self.iter().cloned().map(Into::into).collect()
    }
}

macro_rules! scalar_ids {
    ($($ty:ty),*) => {
        $(
            impl IntoIds for $ty {
                fn into_ids(self) -> Vec<Value> {
                    vec![self.into()]
                }
            }
        )*
    };
}

scalar_ids!(i32, i64, u32, u64, &str, String);

macro_rules! tuple_ids {
    ($($name:ident),+) => {
        impl<$($name: Into<Value>),+> IntoIds for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_ids(self) -> Vec<Value> {
                let ($($name,)+) = self;
                vec![$($name.into()),+]
            }
        }
    };
}

tuple_ids!(A);
tuple_ids!(A, B);
tuple_ids!(A, B, C);
tuple_ids!(A, B, C, D);
tuple_ids!(A, B, C, D, E);
tuple_ids!(A, B, C, D, E, F);

/// Data access over one model.
///
/// A repository holds an active query. Mutators such as [`Repository::with`]
/// or [`Repository::order_by`] narrow it; terminal operations such as
/// [`Repository::all`] or [`Repository::create`] run it and then replace it
/// with a fresh query, whether they succeed or not. Nothing set before a
/// terminal operation leaks into the next one.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use repokit_core::{Container, Repository};
/// use repokit_db::{Database, Schema, SortDirection};
/// use serde_json::json;
///
/// let db = Database::open_in_memory().unwrap();
/// db.execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT)").unwrap();
///
/// let mut container = Container::new();
/// container
///     .bind_database(db)
///     .register_model(Schema::new("user", "users").fillable(["email"]));
///
/// let mut users = Repository::new(Arc::new(container), "user").unwrap();
/// let data = json!({"email": "a@b.com"});
/// users.create(data.as_object().unwrap()).unwrap();
///
/// let all = users.order_by("email", SortDirection::Asc).all(&[]).unwrap();
/// assert_eq!(all.len(), 1);
/// ```
pub struct Repository {
    container: Arc<Container>,
    model_name: String,
    model: Model,
    query: Builder,
    page: u64,
}

impl Repository {
    /// Resolves `model_name` from the container.
    ///
    /// Fails with a configuration error when the name is unbound or does not
    /// resolve to a model.
    pub fn new(container: Arc<Container>, model_name: impl Into<String>) -> Result<Self> {
        let model_name = model_name.into();
        let model = container.make_model(&model_name)?;
        let query = model.new_query();

        Ok(Self {
            container,
            model_name,
            model,
            query,
            page: 1,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    /// Resolves a fresh, unsaved model.
    pub fn make_model(&self) -> Result<Model> {
        self.container.make_model(&self.model_name)
    }

    /// Resolves a fresh query. The active query is left untouched.
    pub fn make_query(&self) -> Result<Builder> {
        Ok(self.make_model()?.new_query())
    }

    /// Replaces the model and the active query with fresh ones.
    pub fn reset_model(&mut self) -> Result<()> {
        self.model = self.make_model()?;
        self.query = self.model.new_query();
        self.page = 1;
        trace!(model = %self.model_name, "repository reset");
        Ok(())
    }

    pub fn get_model(&self) -> &Model {
        &self.model
    }

    pub fn get_key_name(&self) -> &str {
        self.query.schema().key_name()
    }

    /// Prefix of the primary key name, see [`table_prefix`].
    pub fn get_table_prefix(&self) -> &str {
        table_prefix(self.get_key_name())
    }

    pub fn get_order_directions(&self) -> &'static [&'static str] {
        order_directions()
    }

    pub fn get_fillable(&self) -> &[String] {
        self.model.get_fillable()
    }

    fn take_query(&mut self) -> Builder {
        std::mem::replace(&mut self.query, self.model.new_query())
    }

    fn map_query(&mut self, f: impl FnOnce(Builder) -> Builder) -> &mut Self {
        let query = self.take_query();
        self.query = f(query);
        self
    }

    /// Resets, then hands back the terminal operation's result.
    fn finish<T>(&mut self, result: Result<T>) -> Result<T> {
        let reset = self.reset_model();
        let value = result?;
        reset?;
        Ok(value)
    }

    /// Eager loads relations on the results.
    pub fn with<I, S>(&mut self, relations: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.map_query(|q| q.with(relations))
    }

    /// Restricts results to entities that have a related entity.
    pub fn has(&mut self, relation: &str) -> &mut Self {
        self.map_query(|q| q.has(relation))
    }

    pub fn order_by(&mut self, column: &str, direction: SortDirection) -> &mut Self {
        self.map_query(|q| q.order_by(column, direction))
    }

    pub fn hidden<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.map_query(|q| q.set_hidden(fields))
    }

    pub fn visible<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.map_query(|q| q.set_visible(fields))
    }

    /// Removes all global scopes when `scopes` is empty, else the named ones.
    pub fn without_global_scopes(&mut self, scopes: &[&str]) -> &mut Self {
        self.map_query(|q| q.without_global_scopes(scopes))
    }

    /// Hands the filter set to the model's filter handlers.
    pub fn filter(&mut self, filters: &Attributes) -> &mut Self {
        self.map_query(|q| q.apply_filters(filters))
    }

    /// Page number used by the next [`Repository::paginate`].
    pub fn for_page(&mut self, page: u64) -> &mut Self {
        self.page = page.max(1);
        self
    }

    /// Replaces the active query with one built from declarative input.
    ///
    /// Ordering columns come from `order.col` and are kept only when
    /// fillable, falling back to `{prefix}_created_at`. The direction comes
    /// from `order.dir` and falls back to descending. `filters` is handed to
    /// the filter handlers and `with` names relations to load.
    pub fn filter_input(&mut self, input: &Value, with: &[&str]) -> Result<&mut Self> {
        self.apply_input(&FilterInput::from_value(input), with)
    }

    fn apply_input(&mut self, input: &FilterInput, with: &[&str]) -> Result<&mut Self> {
        let key_name = self.get_key_name().to_string();
        let columns = resolve_order_columns(
            input.order_col.as_deref(),
            self.get_fillable(),
            &key_name,
        );
        let direction = resolve_direction(input.order_dir.as_deref());
        debug!(model = %self.model_name, ?columns, ?direction, "applying filter input");

        let mut query = self
            .make_query()?
            .apply_filters(&input.filters)
            .with(with.iter().copied());
        for column in &columns {
            query = query.order_by(column, direction);
        }

        self.query = query;
        Ok(self)
    }

    /// [`Repository::filter_input`] followed by [`Repository::paginate`].
    ///
    /// `input.limit` overrides `pagination_size` and `input.page` selects the page.
    pub fn filter_paginate(
        &mut self,
        input: &Value,
        with: &[&str],
        pagination_size: u64,
    ) -> Result<Page<Model>> {
        let input = FilterInput::from_value(input);
        self.apply_input(&input, with)?;
        if let Some(page) = input.page {
            self.for_page(page);
        }
        self.paginate(input.limit.unwrap_or(pagination_size), &[])
    }

    /// [`Repository::filter_input`] followed by [`Repository::all`].
    pub fn filter_get(&mut self, input: &Value, with: &[&str]) -> Result<Vec<Model>> {
        self.filter_input(input, with)?;
        self.all(&[])
    }

    /// Every entity matching the active query.
    pub fn all(&mut self, columns: &[&str]) -> Result<Vec<Model>> {
        let result = self.take_query().get(columns).map_err(Into::into);
        self.finish(result)
    }

    /// One page of the active query. A `per_page` of zero uses 15.
    pub fn paginate(&mut self, per_page: u64, columns: &[&str]) -> Result<Page<Model>> {
        let page = self.page;
        let result = self
            .take_query()
            .paginate(per_page, page, columns)
            .map_err(Into::into);
        self.finish(result)
    }

    /// Values of `value`, keyed by `key` when given.
    pub fn pluck(&mut self, value: &str, key: Option<&str>) -> Result<Plucked> {
        let result = self.take_query().pluck(value, key).map_err(Into::into);
        self.finish(result)
    }

    pub fn find(&mut self, id: impl Into<Value>, columns: &[&str]) -> Result<Option<Model>> {
        let result = self.take_query().find(id, columns).map_err(Into::into);
        self.finish(result)
    }

    /// First entity whose `attribute` equals `value`.
    pub fn find_by(
        &mut self,
        attribute: &str,
        value: impl Into<Value>,
        columns: &[&str],
    ) -> Result<Option<Model>> {
        let result = self
            .take_query()
            .where_eq(attribute, value)
            .first(columns)
            .map_err(Into::into);
        self.finish(result)
    }

    /// The matching entity, or a newly created one with `attribute = value`.
    pub fn find_by_or_create(
        &mut self,
        attribute: &str,
        value: impl Into<Value>,
        columns: &[&str],
    ) -> Result<Model> {
        let value = value.into();
        if let Some(entity) = self.find_by(attribute, value.clone(), columns)? {
            return Ok(entity);
        }

        let mut data = Attributes::new();
        data.insert(attribute.to_string(), value);
        self.create(&data)
    }

    /// The matching entity, or an unsaved instance with `attribute = value`.
    pub fn find_by_or_new(
        &mut self,
        attribute: &str,
        value: impl Into<Value>,
        columns: &[&str],
    ) -> Result<Model> {
        let value = value.into();
        if let Some(entity) = self.find_by(attribute, value.clone(), columns)? {
            return Ok(entity);
        }

        let mut model = self.make_model()?;
        model.set(attribute, value);
        Ok(model)
    }

    /// Creates an entity from mass-assigned `data`.
    pub fn create(&mut self, data: &Attributes) -> Result<Model> {
        let result = self.make_model().and_then(|mut model| {
            model.fill(data);
            model.save()?;
            Ok(model)
        });
        self.finish(result)
    }

    /// Updates every entity whose `attribute` equals `id`, one by one, and
    /// returns how many were saved.
    pub fn update(&mut self, data: &Attributes, id: impl Into<Value>, attribute: &str) -> Result<usize> {
        self.update_where(data, id, attribute, "=")
    }

    /// Like [`Repository::update`], comparing with `condition` (`=`, `<`, `like`, ...).
    pub fn update_where(
        &mut self,
        data: &Attributes,
        id: impl Into<Value>,
        attribute: &str,
        condition: &str,
    ) -> Result<usize> {
        let query = self.take_query();
        let result = update_each(query, data, id.into(), attribute, condition);
        self.finish(result)
    }

    /// Updates every entity whose `attribute` equals `id` with one statement.
    ///
    /// `data` is mass-assigned to a fresh model first, so non-fillable keys
    /// are dropped. No observer fires.
    pub fn update_bulk(
        &mut self,
        data: &Attributes,
        id: impl Into<Value>,
        attribute: &str,
    ) -> Result<usize> {
        let query = self.take_query();
        let result = self.make_model().and_then(|mut model| {
            let filled = model.fill(data).attributes().clone();
            Ok(query.where_eq(attribute, id).update(&filled)?)
        });
        self.finish(result)
    }

    /// `update` when `id` reads as a positive integer, `create` otherwise.
    ///
    /// After an update the entity is fetched again by `attribute`.
    pub fn create_or_update(
        &mut self,
        data: &Attributes,
        id: impl Into<Value>,
        attribute: &str,
    ) -> Result<Option<Model>> {
        let id = id.into();
        if coerce_int(&id) > 0 {
            self.update(data, id.clone(), attribute)?;
            self.find_by(attribute, id, &[])
        } else {
            self.create(data).map(Some)
        }
    }

    /// Deletes the entities with the given keys, one by one, and returns how
    /// many were deleted. Missing keys and failed deletions are not counted.
    pub fn delete(&mut self, ids: impl IntoIds) -> Result<usize> {
        let ids = ids.into_ids();
        let key_name = self.get_key_name().to_string();
        let query = self.take_query();

        let result = query
            .where_in(&key_name, ids)
            .get(&[])
            .map(|models| {
                models
                    .into_iter()
                    .map(|model| persist(model, "delete", |m| m.delete()))
                    .filter(|deleted| *deleted)
                    .count()
            })
            .map_err(Into::into);
        self.finish(result)
    }
}

fn update_each(
    query: Builder,
    data: &Attributes,
    id: Value,
    attribute: &str,
    condition: &str,
) -> Result<usize> {
    let op: Operator = condition.parse()?;
    let models = query.where_op(attribute, op, id).get(&[])?;

    Ok(models
        .into_iter()
        .map(|model| {
            persist(model, "update", |m| {
                m.fill(data);
                m.save()
            })
        })
        .filter(|saved| *saved)
        .count())
}

/// Runs one per-entity operation. Failures are logged and reported as `false`.
fn persist<F>(mut model: Model, action: &str, op: F) -> bool
where
    F: FnOnce(&mut Model) -> repokit_db::Result<bool>,
{
    match op(&mut model) {
        Ok(done) => done,
        Err(err) => {
            warn!(
                model = %model.schema().name(),
                key = ?model.key(),
                "failed to {action}: {err}"
            );
            false
        }
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("model", &self.model_name)
            .field("query", &self.query)
            .field("page", &self.page)
            .finish()
    }
}
