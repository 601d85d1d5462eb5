//! Error types for repokit-db.

use miette::Diagnostic;
use thiserror::Error;

/// Database error type for repokit-db operations.
#[derive(Error, Diagnostic, Debug)]
pub enum DbError {
    #[error("Database connection failed: {0}")]
    #[diagnostic(
        code(repokit_db::connection),
        help("Check if the database file exists and is accessible")
    )]
    ConnectionError(String),

    #[error("Database query failed: {0}")]
    #[diagnostic(code(repokit_db::query))]
    QueryError(#[from] rusqlite::Error),

    #[error("Database connection lock was poisoned")]
    #[diagnostic(
        code(repokit_db::lock_poisoned),
        help("A previous operation panicked while holding the connection")
    )]
    LockPoisoned,

    #[error("Invalid {kind} identifier: {ident}")]
    #[diagnostic(
        code(repokit_db::invalid_identifier),
        help("Identifiers may only contain letters, digits and underscores, optionally qualified with a table name")
    )]
    InvalidIdentifier { kind: &'static str, ident: String },

    #[error("Invalid comparison operator: {0}")]
    #[diagnostic(
        code(repokit_db::invalid_operator),
        help("Use one of =, !=, <>, <, >, <=, >= or like")
    )]
    InvalidOperator(String),

    #[error("Relation `{relation}` is not defined on model `{model}`")]
    #[diagnostic(
        code(repokit_db::unknown_relation),
        help("Declare the relation on the model schema before eager loading it")
    )]
    UnknownRelation { model: String, relation: String },

    #[error("Model `{0}` has no primary key value")]
    #[diagnostic(
        code(repokit_db::missing_key),
        help("Only persisted models can be updated or deleted")
    )]
    MissingKey(String),

    #[error("JSON conversion failed: {0}")]
    #[diagnostic(code(repokit_db::json))]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    #[diagnostic(code(repokit_db::io), help("Check file permissions and disk space"))]
    IoError(#[from] std::io::Error),
}

/// Result type alias for repokit-db operations.
pub type Result<T> = std::result::Result<T, DbError>;
