pub mod connection;
pub mod error;
pub mod expr;
pub mod model;
pub mod observer;
pub mod page;
pub mod query;
mod relation;
pub mod schema;
pub mod traits;
pub mod value;

pub use connection::Database;
pub use error::{DbError, Result};
pub use expr::{Col, Operator};
pub use model::{Loaded, Model};
pub use observer::Observer;
pub use page::{Page, DEFAULT_PER_PAGE};
pub use query::*;
pub use schema::{KeyType, Relation, RelationKind, Schema};
pub use value::Attributes;
