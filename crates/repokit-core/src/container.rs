//! Name-keyed dependency resolution.
//!
//! Repositories name the model they work on; the [`Container`] turns that name
//! into a fresh [`Model`] bound to the shared [`Database`].

use std::{
    any::{type_name, Any},
    collections::HashMap,
    fmt,
    sync::Arc,
};

use repokit_db::{Database, Model, Schema};
use tracing::trace;

use crate::error::{RepositoryError, Result};

/// A resolved instance.
pub type Instance = Arc<dyn Any + Send + Sync>;

type Factory = Box<dyn Fn(&Container) -> Result<Instance> + Send + Sync>;

enum Binding {
    /// Always resolves to the same instance.
    Shared(Instance),
    /// Builds a new instance on every resolution.
    Factory(Factory),
}

#[derive(Default)]
pub struct Container {
    bindings: HashMap<String, Binding>,
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = self.bindings.keys().collect::<Vec<_>>();
        names.sort();
        f.debug_struct("Container")
            .field("bindings", &names)
            .finish()
    }
}

impl Container {
    /// Name the shared [`Database`] is bound under.
    pub const DATABASE: &'static str = "db";

    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a factory that builds a new `T` each time `name` is resolved.
    pub fn bind<T, F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        T: Any + Send + Sync,
        F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
    {
        let factory: Factory = Box::new(move |container| {
            let instance: Instance = Arc::new(factory(container)?);
            Ok(instance)
        });
        self.bindings.insert(name.into(), Binding::Factory(factory));
        self
    }

    /// Binds a shared instance.
    pub fn instance<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) -> &mut Self {
        self.bindings
            .insert(name.into(), Binding::Shared(Arc::new(value)));
        self
    }

    pub fn bind_database(&mut self, db: Database) -> &mut Self {
        self.instance(Self::DATABASE, db)
    }

    /// Binds the schema's name to a factory producing fresh, unsaved models
    /// of that schema on the bound database.
    pub fn register_model(&mut self, schema: Schema) -> &mut Self {
        let name = schema.name().to_string();
        let schema = Arc::new(schema);
        self.bind(name, move |container| {
            let db = container.make_as::<Database>(Self::DATABASE)?;
            Ok(Model::new(Arc::clone(&schema), Database::clone(&db)))
        })
    }

    pub fn has(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Resolves `name`.
    pub fn make(&self, name: &str) -> Result<Instance> {
        trace!(binding = %name, "resolving");
        match self.bindings.get(name) {
            Some(Binding::Shared(instance)) => Ok(Arc::clone(instance)),
            Some(Binding::Factory(factory)) => factory(self),
            None => Err(RepositoryError::Configuration(format!(
                "nothing is bound to `{name}`"
            ))),
        }
    }

    /// Resolves `name` and checks that it is a `T`.
    pub fn make_as<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>> {
        self.make(name)?.downcast::<T>().map_err(|_| {
            RepositoryError::Configuration(format!(
                "`{name}` does not resolve to a {}",
                type_name::<T>()
            ))
        })
    }

    /// Resolves `name` as a fresh model.
    pub fn make_model(&self, name: &str) -> Result<Model> {
        let model = self.make_as::<Model>(name)?;
        Ok(Arc::unwrap_or_clone(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container() -> Container {
        let mut container = Container::new();
        container
            .bind_database(Database::open_in_memory().unwrap())
            .register_model(Schema::new("user", "users").key("user_id"))
            .instance("greeting", String::from("hello"));
        container
    }

    #[test]
    fn test_make_model() {
        let container = container();
        let model = container.make_model("user").unwrap();

        assert_eq!(model.table(), "users");
        assert_eq!(model.key_name(), "user_id");
        assert!(!model.exists());
    }

    #[test]
    fn test_models_are_fresh_per_resolution() {
        let container = container();
        let mut first = container.make_model("user").unwrap();
        first.set("email", "a@b.com");

        let second = container.make_model("user").unwrap();
        assert!(second.get("email").is_none());
    }

    #[test]
    fn test_non_model_binding_is_a_configuration_error() {
        let container = container();

        assert!(container.has("greeting"));
        assert_eq!(*container.make_as::<String>("greeting").unwrap(), "hello");
        assert!(matches!(
            container.make_model("greeting"),
            Err(RepositoryError::Configuration(_))
        ));
        assert!(matches!(
            container.make_model("missing"),
            Err(RepositoryError::Configuration(_))
        ));
    }

    #[test]
    fn test_model_without_database_is_a_configuration_error() {
        let mut container = Container::new();
        container.register_model(Schema::new("user", "users"));

        assert!(matches!(
            container.make_model("user"),
            Err(RepositoryError::Configuration(_))
        ));
    }
}
