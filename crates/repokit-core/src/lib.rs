pub mod container;
pub mod error;
pub mod input;
pub mod macros;
pub mod ordering;
pub mod repository;

use std::sync::Arc;

pub use container::Container;
pub use error::{RepositoryError, Result};
pub use input::FilterInput;
pub use repository::{IntoIds, Repository};

/// A repository bound to one model name.
///
/// Implemented by the types [`define_repository!`] generates.
pub trait EntityRepository: Sized {
    /// Name the model is registered under in the [`Container`].
    const MODEL: &'static str;

    fn from_core(core: Repository) -> Self;

    fn make(container: Arc<Container>) -> Result<Self> {
        Repository::new(container, Self::MODEL).map(Self::from_core)
    }
}

#[cfg(test)]
mod tests {
    use repokit_db::{Database, Schema};
    use serde_json::json;

    use super::*;

    define_repository!(
        /// Orders placed by customers.
        OrderRepository => "order"
    );

    define_repository!(BrokenRepository => "missing");

    fn container() -> Arc<Container> {
        let db = Database::open_in_memory().unwrap();
        db.execute_batch(
            "CREATE TABLE orders (
                order_id INTEGER PRIMARY KEY,
                total INTEGER,
                order_created_at TEXT,
                order_updated_at TEXT
            )",
        )
        .unwrap();

        let mut container = Container::new();
        container.bind_database(db).register_model(
            Schema::new("order", "orders")
                .key("order_id")
                .fillable(["total"])
                .timestamps("order_created_at", "order_updated_at"),
        );
        Arc::new(container)
    }

    #[test]
    fn test_generated_repository() {
        let mut orders = OrderRepository::new(container()).unwrap();

        assert_eq!(OrderRepository::MODEL, "order");
        assert_eq!(orders.get_table_prefix(), "order");

        orders
            .create(json!({"total": 10}).as_object().unwrap())
            .unwrap();
        orders
            .create(json!({"total": 20}).as_object().unwrap())
            .unwrap();

        let page = orders
            .filter_paginate(&json!({"order": {"col": "bogus"}}), &[], 15)
            .unwrap();
        assert_eq!(page.total, 2);
    }

    #[test]
    fn test_generated_repository_with_unknown_model() {
        assert!(matches!(
            BrokenRepository::new(container()),
            Err(RepositoryError::Configuration(_))
        ));
    }
}
