//! Declarative description of an entity type.
//!
//! A [`Schema`] carries everything the persistence layer needs to know about a
//! table: its primary key, which attributes may be mass-assigned, default
//! serialization visibility, relations, global scopes, filter handlers and
//! lifecycle observers.

use std::{collections::HashMap, fmt, sync::Arc};

use serde_json::Value;

use crate::{observer::Observer, query::Builder};

/// A global scope: a query constraint applied to every query of the schema.
pub type ScopeFn = Arc<dyn Fn(Builder) -> Builder + Send + Sync>;

/// A filter handler: applies one input value to a query.
pub type FilterFn = Arc<dyn Fn(Builder, &Value) -> Builder + Send + Sync>;

/// Lazily builds the schema on the other side of a relation.
pub type RelatedFn = Arc<dyn Fn() -> Schema + Send + Sync>;

/// How primary keys are produced on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyType {
    /// SQLite assigns the key (`INTEGER PRIMARY KEY`).
    #[default]
    Increment,
    /// A random v4 UUID is generated unless one was supplied.
    Uuid,
}

/// Names of the automatically maintained timestamp columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamps {
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    HasMany,
    HasOne,
    BelongsTo,
}

/// A relation to another schema.
///
/// Every relation is normalised to a pair of columns: the related rows are
/// those whose `related_column` equals the parent's `local_column`.
#[derive(Clone)]
pub struct Relation {
    pub name: String,
    pub kind: RelationKind,
    pub related: RelatedFn,
    pub local_column: String,
    pub related_column: String,
}

impl Relation {
    pub fn is_many(&self) -> bool {
        self.kind == RelationKind::HasMany
    }
}

impl fmt::Debug for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relation")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("local_column", &self.local_column)
            .field("related_column", &self.related_column)
            .finish()
    }
}

/// Schema of one entity type.
#[derive(Clone)]
pub struct Schema {
    name: String,
    table: String,
    key_name: String,
    key_type: KeyType,
    fillable: Vec<String>,
    hidden: Vec<String>,
    timestamps: Option<Timestamps>,
    relations: Vec<Relation>,
    scopes: Vec<(String, ScopeFn)>,
    filters: HashMap<String, FilterFn>,
    observers: Vec<Arc<dyn Observer>>,
}

impl Schema {
    /// Creates a schema for `table`, registered under `name`.
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            key_name: "id".to_string(),
            key_type: KeyType::Increment,
            fillable: Vec::new(),
            hidden: Vec::new(),
            timestamps: None,
            relations: Vec::new(),
            scopes: Vec::new(),
            filters: HashMap::new(),
            observers: Vec::new(),
        }
    }

    pub fn key(mut self, key_name: impl Into<String>) -> Self {
        self.key_name = key_name.into();
        self
    }

    pub fn key_type(mut self, key_type: KeyType) -> Self {
        self.key_type = key_type;
        self
    }

    /// Attributes that may be set through mass assignment.
    pub fn fillable<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fillable = attributes.into_iter().map(Into::into).collect();
        self
    }

    /// Attributes left out of serialized output by default.
    pub fn hidden<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hidden = attributes.into_iter().map(Into::into).collect();
        self
    }

    pub fn timestamps(mut self, created_at: impl Into<String>, updated_at: impl Into<String>) -> Self {
        self.timestamps = Some(Timestamps {
            created_at: created_at.into(),
            updated_at: updated_at.into(),
        });
        self
    }

    /// Declares a one-to-many relation: related rows carry `foreign_key`
    /// pointing at this schema's `local_key`.
    pub fn has_many<F>(self, name: &str, related: F, foreign_key: &str, local_key: &str) -> Self
    where
        F: Fn() -> Schema + Send + Sync + 'static,
    {
        self.relation(name, RelationKind::HasMany, related, local_key, foreign_key)
    }

    /// Like [`Schema::has_many`], but loads at most one related row.
    pub fn has_one<F>(self, name: &str, related: F, foreign_key: &str, local_key: &str) -> Self
    where
        F: Fn() -> Schema + Send + Sync + 'static,
    {
        self.relation(name, RelationKind::HasOne, related, local_key, foreign_key)
    }

    /// Declares an inverse relation: this schema's `foreign_key` points at
    /// the related schema's `owner_key`.
    pub fn belongs_to<F>(self, name: &str, related: F, foreign_key: &str, owner_key: &str) -> Self
    where
        F: Fn() -> Schema + Send + Sync + 'static,
    {
        self.relation(name, RelationKind::BelongsTo, related, foreign_key, owner_key)
    }

    fn relation<F>(
        mut self,
        name: &str,
        kind: RelationKind,
        related: F,
        local_column: &str,
        related_column: &str,
    ) -> Self
    where
        F: Fn() -> Schema + Send + Sync + 'static,
    {
        self.relations.push(Relation {
            name: name.to_string(),
            kind,
            related: Arc::new(related),
            local_column: local_column.to_string(),
            related_column: related_column.to_string(),
        });
        self
    }

    /// Registers a named global scope.
    pub fn scope<F>(mut self, name: impl Into<String>, scope: F) -> Self
    where
        F: Fn(Builder) -> Builder + Send + Sync + 'static,
    {
        self.scopes.push((name.into(), Arc::new(scope)));
        self
    }

    /// Registers the handler for one filter input key.
    pub fn filter<F>(mut self, key: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Builder, &Value) -> Builder + Send + Sync + 'static,
    {
        self.filters.insert(key.into(), Arc::new(handler));
        self
    }

    pub fn observe(mut self, observer: impl Observer + 'static) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn key_name(&self) -> &str {
        &self.key_name
    }

    pub fn get_key_type(&self) -> KeyType {
        self.key_type
    }

    pub fn get_fillable(&self) -> &[String] {
        &self.fillable
    }

    pub fn get_hidden(&self) -> &[String] {
        &self.hidden
    }

    pub fn get_timestamps(&self) -> Option<&Timestamps> {
        self.timestamps.as_ref()
    }

    /// Whether `attribute` may be mass-assigned.
    ///
    /// A schema without a fillable list accepts every attribute.
    pub fn is_fillable(&self, attribute: &str) -> bool {
        self.fillable.is_empty() || self.fillable.iter().any(|f| f == attribute)
    }

    pub fn get_relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.name == name)
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub(crate) fn scopes(&self) -> &[(String, ScopeFn)] {
        &self.scopes
    }

    pub(crate) fn filter_handler(&self, key: &str) -> Option<&FilterFn> {
        self.filters.get(key)
    }

    pub(crate) fn observers(&self) -> &[Arc<dyn Observer>] {
        &self.observers
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("key_name", &self.key_name)
            .field("key_type", &self.key_type)
            .field("fillable", &self.fillable)
            .field("hidden", &self.hidden)
            .field("timestamps", &self.timestamps)
            .field("relations", &self.relations)
            .field("scopes", &self.scopes.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .field("filters", &self.filters.keys().collect::<Vec<_>>())
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post() -> Schema {
        Schema::new("post", "posts").key("post_id")
    }

    #[test]
    fn test_defaults() {
        let schema = Schema::new("user", "users");

        assert_eq!(schema.key_name(), "id");
        assert_eq!(schema.get_key_type(), KeyType::Increment);
        assert!(schema.is_fillable("anything"));
        assert!(schema.get_timestamps().is_none());
    }

    #[test]
    fn test_fillable_restricts_mass_assignment() {
        let schema = Schema::new("user", "users").fillable(["email", "name"]);

        assert!(schema.is_fillable("email"));
        assert!(!schema.is_fillable("is_admin"));
    }

    #[test]
    fn test_relations_are_normalised() {
        let schema = Schema::new("user", "users")
            .key("user_id")
            .has_many("posts", post, "user_id", "user_id")
            .belongs_to("team", || Schema::new("team", "teams"), "team_id", "id");

        let posts = schema.get_relation("posts").unwrap();
        assert!(posts.is_many());
        assert_eq!(posts.local_column, "user_id");
        assert_eq!(posts.related_column, "user_id");
        assert_eq!((posts.related)().table(), "posts");

        let team = schema.get_relation("team").unwrap();
        assert_eq!(team.kind, RelationKind::BelongsTo);
        assert_eq!(team.local_column, "team_id");
        assert_eq!(team.related_column, "id");

        assert!(schema.get_relation("comments").is_none());
    }
}
