//! Error types for repokit-core.

use miette::Diagnostic;
use repokit_db::DbError;
use thiserror::Error;

/// Error type for repository operations.
#[derive(Error, Diagnostic, Debug)]
pub enum RepositoryError {
    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(repokit::configuration),
        help("Register the model in the container before building a repository for it")
    )]
    Configuration(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Db(#[from] DbError),
}

/// Result type alias for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
