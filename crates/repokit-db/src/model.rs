//! Active-record style entity instances.

use std::{collections::BTreeMap, sync::Arc};

use serde::{de::DeserializeOwned, Serialize, Serializer};
use serde_json::Value;
use tracing::trace;
use uuid::Uuid;

use crate::{
    connection::Database,
    error::{DbError, Result},
    expr::column::{validate_identifier, Col},
    observer::Observer,
    query::{Builder, DeleteQuery, InsertQuery, UpdateQuery},
    schema::{KeyType, Schema},
    traits::Expression,
    value::{to_sql_value, Attributes},
};

/// Current time in the format stored in timestamp columns.
pub(crate) fn fresh_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// An eager-loaded relation.
#[derive(Debug, Clone)]
pub enum Loaded {
    One(Option<Box<Model>>),
    Many(Vec<Model>),
}

impl Loaded {
    pub fn to_json(&self) -> Value {
        match self {
            Loaded::One(None) => Value::Null,
            Loaded::One(Some(model)) => model.to_json(),
            Loaded::Many(models) => Value::Array(models.iter().map(Model::to_json).collect()),
        }
    }
}

/// One entity of a [`Schema`].
///
/// Attributes are kept as JSON values. A model either exists in the database
/// (it was read from or saved to it) or is a fresh, unsaved instance.
#[derive(Clone)]
pub struct Model {
    schema: Arc<Schema>,
    db: Database,
    attributes: Attributes,
    original: Attributes,
    exists: bool,
    hidden: Option<Vec<String>>,
    visible: Vec<String>,
    relations: BTreeMap<String, Loaded>,
}

impl Model {
    /// Creates a fresh, unsaved instance.
    pub fn new(schema: Arc<Schema>, db: Database) -> Self {
        Self {
            schema,
            db,
            attributes: Attributes::new(),
            original: Attributes::new(),
            exists: false,
            hidden: None,
            visible: Vec::new(),
            relations: BTreeMap::new(),
        }
    }

    pub(crate) fn from_row(schema: Arc<Schema>, db: Database, attributes: Attributes) -> Self {
        Self {
            original: attributes.clone(),
            attributes,
            exists: true,
            ..Self::new(schema, db)
        }
    }

    /// Creates a fresh, unsaved instance of the same schema, mass-assigned
    /// from `attributes`.
    pub fn new_instance(&self, attributes: &Attributes) -> Self {
        let mut model = Self::new(Arc::clone(&self.schema), self.db.clone());
        model.fill(attributes);
        model
    }

    /// Starts a new query on this model's table.
    pub fn new_query(&self) -> Builder {
        Builder::new(Arc::clone(&self.schema), self.db.clone())
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn table(&self) -> &str {
        self.schema.table()
    }

    pub fn key_name(&self) -> &str {
        self.schema.key_name()
    }

    pub fn get_fillable(&self) -> &[String] {
        self.schema.get_fillable()
    }

    /// Mass-assigns attributes. Keys that are not fillable are dropped.
    pub fn fill(&mut self, attributes: &Attributes) -> &mut Self {
        for (key, value) in attributes {
            if self.schema.is_fillable(key) {
                self.attributes.insert(key.clone(), value.clone());
            } else {
                trace!(attribute = %key, model = %self.schema.name(), "dropping non-fillable attribute");
            }
        }
        self
    }

    /// Assigns attributes without the fillable check.
    pub fn force_fill(&mut self, attributes: &Attributes) -> &mut Self {
        for (key, value) in attributes {
            self.attributes.insert(key.clone(), value.clone());
        }
        self
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.attributes.get(attribute)
    }

    pub fn set(&mut self, attribute: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.attributes.insert(attribute.into(), value.into());
        self
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Primary key value, if set and not null.
    pub fn key(&self) -> Option<&Value> {
        self.attributes
            .get(self.schema.key_name())
            .filter(|v| !v.is_null())
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    /// Attributes changed since the model was loaded or last saved.
    pub fn dirty(&self) -> Attributes {
        self.attributes
            .iter()
            .filter(|(k, v)| self.original.get(*k) != Some(*v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn is_dirty(&self) -> bool {
        self.attributes
            .iter()
            .any(|(k, v)| self.original.get(k) != Some(v))
    }

    /// Inserts or updates the model.
    ///
    /// Returns `Ok(false)` when an observer cancelled the operation. Saving an
    /// existing model without changes is a successful no-op.
    pub fn save(&mut self) -> Result<bool> {
        let schema = Arc::clone(&self.schema);
        let observers = schema.observers();

        if !observers.iter().all(|o| o.saving(self)) {
            return Ok(false);
        }

        let saved = if self.exists {
            self.perform_update(&schema)?
        } else {
            self.perform_insert(&schema)?
        };
        if !saved {
            return Ok(false);
        }

        self.original = self.attributes.clone();
        for observer in observers {
            observer.saved(self);
        }
        Ok(true)
    }

    fn perform_update(&mut self, schema: &Schema) -> Result<bool> {
        if !self.is_dirty() {
            return Ok(true);
        }

        let observers = schema.observers();
        if !observers.iter().all(|o| o.updating(self)) {
            return Ok(false);
        }

        if let Some(timestamps) = schema.get_timestamps() {
            if !self.dirty().contains_key(&timestamps.updated_at) {
                self.attributes
                    .insert(timestamps.updated_at.clone(), fresh_timestamp().into());
            }
        }

        let key = self
            .original
            .get(schema.key_name())
            .filter(|v| !v.is_null())
            .or_else(|| self.key())
            .cloned()
            .ok_or_else(|| DbError::MissingKey(schema.name().to_string()))?;

        let mut query = UpdateQuery::table(self.db.clone(), schema.table());
        for (column, value) in &self.dirty() {
            validate_identifier(column, "column")?;
            query = query.set(column.clone(), to_sql_value(value));
        }
        query
            .filter(Col::named(schema.key_name()).eq(key))
            .execute()?;

        for observer in observers {
            observer.updated(self);
        }
        Ok(true)
    }

    fn perform_insert(&mut self, schema: &Schema) -> Result<bool> {
        let observers = schema.observers();
        if !observers.iter().all(|o| o.creating(self)) {
            return Ok(false);
        }

        if let Some(timestamps) = schema.get_timestamps() {
            let now = Value::from(fresh_timestamp());
            for column in [&timestamps.created_at, &timestamps.updated_at] {
                if !self.attributes.contains_key(column) {
                    self.attributes.insert(column.clone(), now.clone());
                }
            }
        }

        if schema.get_key_type() == KeyType::Uuid && self.key().is_none() {
            self.attributes.insert(
                schema.key_name().to_string(),
                Uuid::new_v4().to_string().into(),
            );
        }

        let mut query = InsertQuery::into(self.db.clone(), schema.table());
        for (column, value) in &self.attributes {
            validate_identifier(column, "column")?;
            query = query.set(column.clone(), to_sql_value(value));
        }
        let rowid = query.execute()?;

        if schema.get_key_type() == KeyType::Increment && self.key().is_none() {
            self.attributes
                .insert(schema.key_name().to_string(), rowid.into());
        }
        self.exists = true;

        for observer in observers {
            observer.created(self);
        }
        Ok(true)
    }

    /// Deletes the model's row.
    ///
    /// Returns `Ok(false)` for models that were never saved, when an observer
    /// cancelled the deletion, or when no row matched the key.
    pub fn delete(&mut self) -> Result<bool> {
        if !self.exists {
            return Ok(false);
        }

        let schema = Arc::clone(&self.schema);
        let observers = schema.observers();
        if !observers.iter().all(|o| o.deleting(self)) {
            return Ok(false);
        }

        let key = self
            .key()
            .cloned()
            .ok_or_else(|| DbError::MissingKey(schema.name().to_string()))?;
        let affected = DeleteQuery::from(self.db.clone(), schema.table())
            .filter(Col::named(schema.key_name()).eq(key))
            .execute()?;

        self.exists = false;
        if affected == 0 {
            return Ok(false);
        }

        for observer in observers {
            observer.deleted(self);
        }
        Ok(true)
    }

    /// Replaces the attributes hidden from serialization.
    pub fn set_hidden(&mut self, hidden: Vec<String>) -> &mut Self {
        self.hidden = Some(hidden);
        self
    }

    /// Restricts serialization to the given attributes. An empty list shows all.
    pub fn set_visible(&mut self, visible: Vec<String>) -> &mut Self {
        self.visible = visible;
        self
    }

    fn is_visible(&self, attribute: &str) -> bool {
        let hidden = self
            .hidden
            .as_deref()
            .unwrap_or_else(|| self.schema.get_hidden());
        if hidden.iter().any(|h| h == attribute) {
            return false;
        }
        self.visible.is_empty() || self.visible.iter().any(|v| v == attribute)
    }

    /// Serializes visible attributes and loaded relations.
    pub fn to_json(&self) -> Value {
        let mut out = Attributes::new();
        for (key, value) in &self.attributes {
            if self.is_visible(key) {
                out.insert(key.clone(), value.clone());
            }
        }
        for (name, loaded) in &self.relations {
            if self.is_visible(name) {
                out.insert(name.clone(), loaded.to_json());
            }
        }
        Value::Object(out)
    }

    pub fn relation(&self, name: &str) -> Option<&Loaded> {
        self.relations.get(name)
    }

    pub(crate) fn set_relation(&mut self, name: impl Into<String>, loaded: Loaded) {
        self.relations.insert(name.into(), loaded);
    }

    /// Deserializes all attributes, hidden ones included, into `T`.
    pub fn into_typed<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(Value::Object(
            self.attributes.clone(),
        ))?)
    }
}

impl Serialize for Model {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("schema", &self.schema.name())
            .field("exists", &self.exists)
            .field("attributes", &self.attributes)
            .field("relations", &self.relations)
            .finish()
    }
}
