//! Turns declared models into schemas registered in a [`Container`].

use std::sync::Arc;

use repokit_config::{Config, ModelConfig, RelationKind};
use repokit_core::Container;
use repokit_db::{Database, KeyType, Operator, Schema};
use serde_json::Value;
use tracing::debug;

/// Builds the container holding `db` and every declared model.
pub fn build_container(config: Arc<Config>, db: Database) -> miette::Result<Container> {
    let mut container = Container::new();
    container.bind_database(db);

    for model in &config.models {
        let schema = build_schema(&config, model)?;
        debug!(model = %model.name, table = %model.table, "registering model");
        container.register_model(schema);
    }

    Ok(container)
}

/// Builds the schema of one declared model.
///
/// Related schemas are built lazily, so relations may point back at the
/// model that declares them.
pub fn build_schema(config: &Arc<Config>, model: &ModelConfig) -> miette::Result<Schema> {
    let key = model.get_key().to_string();
    let mut schema = Schema::new(&model.name, &model.table)
        .key(&key)
        .fillable(&model.fillable)
        .hidden(&model.hidden);

    if model.uuid {
        schema = schema.key_type(KeyType::Uuid);
    }
    if let Some(ref timestamps) = model.timestamps {
        schema = schema.timestamps(&timestamps.created_at, &timestamps.updated_at);
    }

    for relation in &model.relations {
        let target = config.get_model(&relation.model)?;
        let related = {
            let config = Arc::clone(config);
            let target = relation.model.clone();
            move || related_schema(&config, &target)
        };

        schema = match relation.kind {
            RelationKind::HasMany => {
                let local_key = relation.local_key.as_deref().unwrap_or(&key);
                schema.has_many(&relation.name, related, &relation.foreign_key, local_key)
            }
            RelationKind::HasOne => {
                let local_key = relation.local_key.as_deref().unwrap_or(&key);
                schema.has_one(&relation.name, related, &relation.foreign_key, local_key)
            }
            RelationKind::BelongsTo => {
                let owner_key = relation.local_key.as_deref().unwrap_or(target.get_key());
                schema.belongs_to(&relation.name, related, &relation.foreign_key, owner_key)
            }
        };
    }

    for filter in &model.filters {
        let op: Operator = filter.get_op().parse()?;
        let column = filter.get_column().to_string();
        schema = schema.filter(&filter.key, move |query, value: &Value| {
            query.where_op(&column, op, value.clone())
        });
    }

    for scope in &model.scopes {
        let op: Operator = scope.get_op().parse()?;
        let column = scope.column.clone();
        let value = scope.value.clone();
        schema = schema.scope(&scope.name, move |query| {
            query.where_op(&column, op, value.clone())
        });
    }

    Ok(schema)
}

fn related_schema(config: &Arc<Config>, name: &str) -> Schema {
    // Relation targets are checked by `Config::resolve`, so the lookup only
    // fails for a config that skipped it.
    config
        .get_model(name)
        .ok()
        .and_then(|model| build_schema(config, model).ok())
        .unwrap_or_else(|| Schema::new(name, name))
}

#[cfg(test)]
mod tests {
    use repokit_core::Repository;
    use serde_json::json;

    use super::*;

    const CONFIG: &str = r#"
        [[models]]
        name = "user"
        table = "users"
        key = "user_id"
        fillable = ["user_name", "user_email", "user_active"]
        hidden = ["user_email"]

        [[models.relations]]
        name = "posts"
        kind = "has_many"
        model = "post"
        foreign_key = "user_id"

        [[models.filters]]
        key = "name"
        column = "user_name"
        op = "like"

        [[models.scopes]]
        name = "active"
        column = "user_active"
        value = 1

        [[models]]
        name = "post"
        table = "posts"
        key = "post_id"
        fillable = ["user_id", "title"]

        [[models.relations]]
        name = "author"
        kind = "belongs_to"
        model = "user"
        foreign_key = "user_id"
    "#;

    fn container() -> Arc<Container> {
        let mut config: Config = toml::from_str(CONFIG).unwrap();
        config.resolve().unwrap();

        let db = Database::open_in_memory().unwrap();
        db.execute_batch(
            "CREATE TABLE users (
                user_id INTEGER PRIMARY KEY,
                user_name TEXT,
                user_email TEXT,
                user_active INTEGER,
                user_created_at TEXT
            );
            CREATE TABLE posts (
                post_id INTEGER PRIMARY KEY,
                user_id INTEGER,
                title TEXT,
                post_created_at TEXT
            );
            INSERT INTO users (user_name, user_email, user_active) VALUES
                ('ada', 'ada@example.com', 1),
                ('alan', 'alan@example.com', 1),
                ('grace', 'grace@example.com', 0);
            INSERT INTO posts (user_id, title) VALUES (1, 'notes'), (1, 'engines'), (2, 'machines');",
        )
        .unwrap();

        Arc::new(build_container(Arc::new(config), db).unwrap())
    }

    #[test]
    fn test_schema_from_config() {
        let container = container();
        let model = container.make_model("user").unwrap();

        assert_eq!(model.table(), "users");
        assert_eq!(model.key_name(), "user_id");
        assert_eq!(
            model.get_fillable(),
            &["user_name", "user_email", "user_active"]
        );
        assert!(model.schema().get_relation("posts").is_some());
    }

    #[test]
    fn test_filters_and_scopes_from_config() {
        let container = container();
        let mut users = Repository::new(container, "user").unwrap();

        let found = users
            .filter_get(&json!({"filters": {"name": "a"}}), &[])
            .unwrap();
        let names = found
            .iter()
            .map(|user| user.get("user_name").cloned().unwrap())
            .collect::<Vec<_>>();

        // grace is outside the active scope
        assert_eq!(names.len(), 2);
        assert!(!names.contains(&json!("grace")));
    }

    #[test]
    fn test_relations_from_config() {
        let container = container();
        let mut posts = Repository::new(container, "post").unwrap();

        let post = posts
            .with(["author"])
            .find_by("title", "machines", &[])
            .unwrap()
            .unwrap();
        let json = post.to_json();
        assert_eq!(json["author"]["user_name"], json!("alan"));
        assert!(json["author"].get("user_email").is_none());
    }
}
