//! Macros for defining concrete repositories.
//!
//! The [`define_repository!`] macro generates a repository type bound to one
//! model name. The type derefs to [`crate::Repository`], so every repository
//! operation is available on it.

/// Defines a repository type for a model registered in a [`crate::Container`].
///
/// # Syntax
///
/// ```ignore
/// define_repository!(pub UserRepository => "user");
/// ```
///
/// This expands to a newtype around [`crate::Repository`] implementing
/// [`crate::EntityRepository`] with `MODEL = "user"`, plus `Deref`/`DerefMut`
/// to the core.
///
/// # Usage
///
/// ```rust
/// use std::sync::Arc;
/// use repokit_core::{define_repository, Container};
/// use repokit_db::{Database, Schema};
///
/// define_repository!(pub UserRepository => "user");
///
/// let mut container = Container::new();
/// container
///     .bind_database(Database::open_in_memory().unwrap())
///     .register_model(Schema::new("user", "users").key("user_id"));
///
/// let users = UserRepository::new(Arc::new(container)).unwrap();
/// assert_eq!(users.get_table_prefix(), "user");
/// ```
#[macro_export]
macro_rules! define_repository {
    ($(#[$meta:meta])* $vis:vis $name:ident => $model:literal) => {
        $(#[$meta])*
        $vis struct $name($crate::Repository);

        impl $crate::EntityRepository for $name {
            const MODEL: &'static str = $model;

            fn from_core(core: $crate::Repository) -> Self {
                Self(core)
            }
        }

        impl $name {
            /// Builds the repository, resolving its model from the container.
            pub fn new(
                container: ::std::sync::Arc<$crate::Container>,
            ) -> $crate::Result<Self> {
                <Self as $crate::EntityRepository>::make(container)
            }
        }

        impl ::std::ops::Deref for $name {
            type Target = $crate::Repository;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl ::std::ops::DerefMut for $name {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }
    };
}
