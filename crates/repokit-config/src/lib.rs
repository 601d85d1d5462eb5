pub mod config;
pub mod error;
pub mod model;
pub mod paths;

pub use config::Config;
pub use error::{ConfigError, Result};
pub use model::{FilterConfig, ModelConfig, RelationConfig, RelationKind, ScopeConfig};
