//! Eager loading of relations.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};

use serde_json::Value;
use tracing::debug;

use crate::{
    connection::Database,
    error::{DbError, Result},
    model::{Loaded, Model},
    query::Builder,
    schema::Schema,
    value::key_string,
};

/// Loads `relations` for all `models` with one query per relation.
///
/// Dotted paths (`posts.comments`) load the nested relation on the related
/// models. Naming a relation the schema does not declare is an error.
pub(crate) fn eager_load(
    schema: &Schema,
    db: &Database,
    models: &mut [Model],
    relations: &[String],
) -> Result<()> {
    let mut grouped: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for path in relations {
        match path.split_once('.') {
            Some((head, rest)) => grouped.entry(head).or_default().push(rest.to_string()),
            None => {
                grouped.entry(path.as_str()).or_default();
            }
        }
    }

    for (name, nested) in grouped {
        let relation = schema
            .get_relation(name)
            .ok_or_else(|| DbError::UnknownRelation {
                model: schema.name().to_string(),
                relation: name.to_string(),
            })?;

        if models.is_empty() {
            continue;
        }

        let mut seen = HashSet::new();
        let keys = models
            .iter()
            .filter_map(|m| m.get(&relation.local_column))
            .filter(|v| !v.is_null() && seen.insert(key_string(v)))
            .cloned()
            .collect::<Vec<Value>>();

        debug!(relation = %name, model = %schema.name(), keys = keys.len(), "eager loading");

        let children = if keys.is_empty() {
            Vec::new()
        } else {
            Builder::new(Arc::new((relation.related)()), db.clone())
                .where_in(&relation.related_column, keys)
                .with(nested)
                .get(&[])?
        };

        let mut by_key: HashMap<String, Vec<Model>> = HashMap::new();
        for child in children {
            if let Some(key) = child.get(&relation.related_column).map(key_string) {
                by_key.entry(key).or_default().push(child);
            }
        }

        for model in models.iter_mut() {
            let matches = model
                .get(&relation.local_column)
                .filter(|v| !v.is_null())
                .and_then(|v| by_key.get(&key_string(v)))
                .cloned()
                .unwrap_or_default();

            let loaded = if relation.is_many() {
                Loaded::Many(matches)
            } else {
                Loaded::One(matches.into_iter().next().map(Box::new))
            };
            model.set_relation(name, loaded);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::query::SortDirection;

    fn posts() -> Schema {
        Schema::new("post", "posts")
            .key("post_id")
            .has_many("comments", comments, "post_id", "post_id")
            .belongs_to("author", authors, "user_id", "user_id")
    }

    fn comments() -> Schema {
        Schema::new("comment", "comments").key("comment_id")
    }

    fn authors() -> Schema {
        Schema::new("user", "users")
            .key("user_id")
            .has_many("posts", posts, "user_id", "user_id")
            .has_one("latest_post", posts, "user_id", "user_id")
    }

    fn setup_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.execute_batch(
            "CREATE TABLE users (user_id INTEGER PRIMARY KEY, name TEXT);
            CREATE TABLE posts (post_id INTEGER PRIMARY KEY, user_id INTEGER, title TEXT);
            CREATE TABLE comments (comment_id INTEGER PRIMARY KEY, post_id INTEGER, body TEXT);
            INSERT INTO users (name) VALUES ('ada'), ('grace'), ('linus');
            INSERT INTO posts (user_id, title) VALUES (1, 'engines'), (1, 'notes'), (2, 'cobol');
            INSERT INTO comments (post_id, body) VALUES (1, 'first'), (1, 'second'), (3, 'nice');",
        )
        .unwrap();
        db
    }

    #[test]
    fn test_has_many_and_has_one() {
        let users = Builder::new(Arc::new(authors()), setup_db())
            .with(["posts", "latest_post"])
            .order_by("user_id", SortDirection::Asc)
            .get(&[])
            .unwrap();

        let counts = users
            .iter()
            .map(|u| match u.relation("posts") {
                Some(Loaded::Many(posts)) => posts.len(),
                _ => usize::MAX,
            })
            .collect::<Vec<_>>();
        assert_eq!(counts, vec![2, 1, 0]);

        assert!(matches!(users[0].relation("latest_post"), Some(Loaded::One(Some(_)))));
        assert!(matches!(users[2].relation("latest_post"), Some(Loaded::One(None))));
        assert_eq!(users[2].to_json()["posts"], json!([]));
    }

    #[test]
    fn test_nested_and_belongs_to() {
        let posts = Builder::new(Arc::new(posts()), setup_db())
            .with(["author", "comments"])
            .with(["author.posts"])
            .order_by("post_id", SortDirection::Asc)
            .get(&[])
            .unwrap();

        let json = posts[0].to_json();
        assert_eq!(json["author"]["name"], json!("ada"));
        assert_eq!(json["author"]["posts"].as_array().unwrap().len(), 2);
        assert_eq!(json["comments"].as_array().unwrap().len(), 2);
        assert_eq!(posts[1].to_json()["comments"], json!([]));
    }

    #[test]
    fn test_unknown_relation() {
        let result = Builder::new(Arc::new(comments()), setup_db())
            .with(["post"])
            .get(&[]);

        assert!(matches!(
            result,
            Err(DbError::UnknownRelation { ref relation, .. }) if relation == "post"
        ));
    }
}
