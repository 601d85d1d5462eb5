//! The query builders.
//!
//! - [`Builder`]: the composable, schema-aware query used by models and
//!   repositories. It knows about global scopes, eager relations, filters
//!   and pagination.
//! - [`InsertQuery`], [`UpdateQuery`], [`DeleteQuery`]: plain statement
//!   builders used to persist single models and bulk changes.
//!
//! Every builder produces a SQL string with `?` placeholders and a parameter
//! list, which is executed against the shared [`crate::Database`].

pub mod builder;
pub(crate) mod clause;
pub mod delete;
pub mod insert;
pub mod update;

pub use builder::{Builder, Plucked, SortDirection};
pub use delete::DeleteQuery;
pub use insert::InsertQuery;
pub use update::UpdateQuery;
