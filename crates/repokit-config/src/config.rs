use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{ConfigError, Result},
    model::{ModelConfig, OPERATORS},
    paths::{resolve_path, xdg_config_home, xdg_data_home},
};

/// Default page size when neither the caller nor the config sets one.
pub const DEFAULT_PAGINATION_SIZE: u64 = 15;

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("unable to compile identifier regex")
});

/// Application's configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Path to the SQLite database. `$REPOKIT_DB` takes precedence.
    /// Default: $XDG_DATA_HOME/repokit/repokit.db
    pub database: Option<String>,

    /// Page size used by filtered pagination when the input sets no limit.
    /// Default: 15
    pub pagination_size: Option<u64>,

    #[serde(default)]
    pub models: Vec<ModelConfig>,
}

/// Location of the config file: `$REPOKIT_CONFIG`, else
/// `$XDG_CONFIG_HOME/repokit/config.toml`.
pub fn default_config_path() -> PathBuf {
    match std::env::var("REPOKIT_CONFIG") {
        Ok(path) => PathBuf::from(path),
        Err(_) => xdg_config_home().join("repokit").join("config.toml"),
    }
}

impl Config {
    /// Loads and resolves the configuration.
    ///
    /// An explicit `path` must exist. Without one the default location is
    /// read, and a missing file there gives the default configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map_or_else(default_config_path, Path::to_path_buf);
        debug!(path = %config_path.display(), "loading config");

        let mut config = match fs::read_to_string(&config_path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if path.is_some() {
                    return Err(ConfigError::NotFound(config_path.display().to_string()));
                }
                Self::default()
            }
            Err(err) => return Err(ConfigError::IoError(err)),
        };

        config.resolve()?;

        Ok(config)
    }

    /// Fills in defaults and validates the declared models.
    pub fn resolve(&mut self) -> Result<()> {
        self.pagination_size.get_or_insert(DEFAULT_PAGINATION_SIZE);

        let mut seen = HashSet::new();
        for model in &self.models {
            if !seen.insert(model.name.as_str()) {
                return Err(ConfigError::DuplicateModel(model.name.clone()));
            }
        }

        for model in &self.models {
            let invalid = |reason: String| ConfigError::InvalidModel {
                model: model.name.clone(),
                reason,
            };

            if model.table.trim().is_empty() {
                return Err(invalid("table name is empty".into()));
            }

            check_identifier(&model.table, "table").map_err(invalid)?;
            check_identifier(model.get_key(), "key").map_err(invalid)?;
            for column in model.fillable.iter().chain(&model.hidden) {
                check_identifier(column, "column").map_err(invalid)?;
            }
            if let Some(ref timestamps) = model.timestamps {
                check_identifier(&timestamps.created_at, "column").map_err(invalid)?;
                check_identifier(&timestamps.updated_at, "column").map_err(invalid)?;
            }

            for relation in &model.relations {
                if !seen.contains(relation.model.as_str()) {
                    return Err(invalid(format!(
                        "relation `{}` targets undeclared model `{}`",
                        relation.name, relation.model
                    )));
                }
                check_identifier(&relation.foreign_key, "column").map_err(invalid)?;
                if let Some(ref local_key) = relation.local_key {
                    check_identifier(local_key, "column").map_err(invalid)?;
                }
            }

            for filter in &model.filters {
                check_identifier(filter.get_column(), "column").map_err(invalid)?;
                check_operator(filter.get_op()).map_err(invalid)?;
            }

            for scope in &model.scopes {
                check_identifier(&scope.column, "column").map_err(invalid)?;
                check_operator(scope.get_op()).map_err(invalid)?;
            }
        }

        Ok(())
    }

    pub fn get_model(&self, name: &str) -> Result<&ModelConfig> {
        self.models
            .iter()
            .find(|model| model.name == name)
            .ok_or_else(|| ConfigError::MissingModel(name.to_string()))
    }

    pub fn get_pagination_size(&self) -> u64 {
        self.pagination_size.unwrap_or(DEFAULT_PAGINATION_SIZE)
    }

    /// Resolves the database path: `$REPOKIT_DB`, then `database`, then
    /// `$XDG_DATA_HOME/repokit/repokit.db`.
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Ok(path) = std::env::var("REPOKIT_DB") {
            return resolve_path(&path);
        }
        match self.database {
            Some(ref path) => resolve_path(path),
            None => Ok(xdg_data_home().join("repokit").join("repokit.db")),
        }
    }
}

fn check_identifier(ident: &str, kind: &str) -> std::result::Result<(), String> {
    if IDENTIFIER.is_match(ident) {
        Ok(())
    } else {
        Err(format!("invalid {kind} name `{ident}`"))
    }
}

fn check_operator(op: &str) -> std::result::Result<(), String> {
    if OPERATORS.contains(&op) {
        Ok(())
    } else {
        Err(format!(
            "unknown operator `{op}`, expected one of {}",
            OPERATORS.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::{env, io::Write};

    use serial_test::serial;
    use tempfile::NamedTempFile;

    use super::*;

    const CONFIG: &str = r#"
        database = "/tmp/repokit-test.db"
        pagination_size = 20

        [[models]]
        name = "user"
        table = "users"
        key = "user_id"
        fillable = ["user_name", "user_email"]
        hidden = ["user_email"]
        timestamps = { created_at = "user_created_at", updated_at = "user_updated_at" }

        [[models.relations]]
        name = "orders"
        kind = "has_many"
        model = "order"
        foreign_key = "user_id"

        [[models.filters]]
        key = "name"
        column = "user_name"
        op = "like"

        [[models]]
        name = "order"
        table = "orders"
        uuid = true

        [[models.scopes]]
        name = "active"
        column = "status"
        value = "active"
    "#;

    fn parse(content: &str) -> Result<Config> {
        let mut config: Config = toml::from_str(content)?;
        config.resolve()?;
        Ok(config)
    }

    #[test]
    fn test_parse_config() {
        let config = parse(CONFIG).unwrap();

        assert_eq!(config.get_pagination_size(), 20);
        assert_eq!(config.models.len(), 2);

        let user = config.get_model("user").unwrap();
        assert_eq!(user.get_key(), "user_id");
        assert_eq!(user.relations[0].kind, crate::RelationKind::HasMany);
        assert_eq!(user.filters[0].get_column(), "user_name");
        assert_eq!(user.filters[0].get_op(), "like");
        assert_eq!(
            user.timestamps.as_ref().unwrap().created_at,
            "user_created_at"
        );

        let order = config.get_model("order").unwrap();
        assert_eq!(order.get_key(), "id");
        assert!(order.uuid);
        assert_eq!(order.scopes[0].get_op(), "eq");
        assert_eq!(order.scopes[0].value, serde_json::json!("active"));

        assert!(matches!(
            config.get_model("missing"),
            Err(ConfigError::MissingModel(_))
        ));
    }

    #[test]
    fn test_resolve_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.pagination_size, Some(DEFAULT_PAGINATION_SIZE));
        assert!(config.models.is_empty());
    }

    #[test]
    fn test_duplicate_model() {
        let result = parse(
            r#"
            [[models]]
            name = "user"
            table = "users"

            [[models]]
            name = "user"
            table = "people"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::DuplicateModel(name)) if name == "user"));
    }

    #[test]
    fn test_empty_table() {
        let result = parse(
            r#"
            [[models]]
            name = "user"
            table = "  "
            "#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidModel { .. })));
    }

    #[test]
    fn test_unknown_relation_target() {
        let result = parse(
            r#"
            [[models]]
            name = "user"
            table = "users"

            [[models.relations]]
            name = "orders"
            kind = "has_many"
            model = "order"
            foreign_key = "user_id"
            "#,
        );
        assert!(
            matches!(result, Err(ConfigError::InvalidModel { reason, .. }) if reason.contains("order"))
        );
    }

    #[test]
    fn test_unknown_operator() {
        let result = parse(
            r#"
            [[models]]
            name = "user"
            table = "users"

            [[models.filters]]
            key = "name"
            op = "regexp"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidModel { .. })));
    }

    #[test]
    fn test_invalid_identifier() {
        let result = parse(
            r#"
            [[models]]
            name = "user"
            table = "users; drop table users"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidModel { .. })));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert!(matches!(
            parse("databse = \"x\""),
            Err(ConfigError::TomlDeError(_))
        ));
    }

    #[test]
    #[serial]
    fn test_load_from_path() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.models.len(), 2);
    }

    #[test]
    #[serial]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("config.toml");

        assert!(matches!(
            Config::load(Some(&missing)),
            Err(ConfigError::NotFound(_))
        ));

        env::set_var("REPOKIT_CONFIG", &missing);
        let config = Config::load(None).unwrap();
        env::remove_var("REPOKIT_CONFIG");

        assert!(config.models.is_empty());
        assert_eq!(config.get_pagination_size(), DEFAULT_PAGINATION_SIZE);
    }

    #[test]
    #[serial]
    fn test_load_from_env() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();

        env::set_var("REPOKIT_CONFIG", file.path());
        let config = Config::load(None);
        env::remove_var("REPOKIT_CONFIG");

        assert_eq!(config.unwrap().get_pagination_size(), 20);
    }

    #[test]
    #[serial]
    fn test_database_path() {
        env::remove_var("REPOKIT_DB");
        let config = parse(CONFIG).unwrap();
        assert_eq!(
            config.database_path().unwrap(),
            PathBuf::from("/tmp/repokit-test.db")
        );

        env::set_var("XDG_DATA_HOME", "/tmp/data");
        assert_eq!(
            Config::default().database_path().unwrap(),
            PathBuf::from("/tmp/data/repokit/repokit.db")
        );
        env::remove_var("XDG_DATA_HOME");

        env::set_var("REPOKIT_DB", "/tmp/override.db");
        assert_eq!(
            config.database_path().unwrap(),
            PathBuf::from("/tmp/override.db")
        );
        env::remove_var("REPOKIT_DB");
    }
}
