use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(repokit_config::toml_deserialize),
        help("Check your config.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("Configuration file not found: {0}")]
    #[diagnostic(
        code(repokit_config::not_found),
        help("Check the path passed with --config or $REPOKIT_CONFIG")
    )]
    NotFound(String),

    #[error("Duplicate model name: {0}")]
    #[diagnostic(
        code(repokit_config::duplicate_model),
        help("Each model must have a unique name")
    )]
    DuplicateModel(String),

    #[error("Invalid model `{model}`: {reason}")]
    #[diagnostic(code(repokit_config::invalid_model))]
    InvalidModel { model: String, reason: String },

    #[error("Missing model: {0}")]
    #[diagnostic(
        code(repokit_config::missing_model),
        help("Declare the model under [[models]] in your config file")
    )]
    MissingModel(String),

    #[error("Path is empty")]
    #[diagnostic(code(repokit_config::empty_path))]
    EmptyPath,

    #[error("Environment variable `{var}` is not set (in `{input}`)")]
    #[diagnostic(
        code(repokit_config::missing_env_var),
        help("Set the environment variable or use an absolute path")
    )]
    MissingEnvVar { input: String, var: String },

    #[error("Unclosed variable expression: {input}")]
    #[diagnostic(
        code(repokit_config::unclosed_variable),
        help("Close the variable with `}}`")
    )]
    UnclosedVariable { input: String },

    #[error("IO error: {0}")]
    #[diagnostic(code(repokit_config::io))]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
