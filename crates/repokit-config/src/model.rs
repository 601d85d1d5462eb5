use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Operators a filter or scope may use.
pub const OPERATORS: [&str; 7] = ["eq", "ne", "gt", "lt", "gte", "lte", "like"];

/// A model declared under `[[models]]`.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Name repositories resolve the model by.
    pub name: String,

    pub table: String,

    /// Primary key column. Default: `id`
    pub key: Option<String>,

    /// Generate v4 UUID keys instead of relying on an auto-increment column.
    #[serde(default)]
    pub uuid: bool,

    /// Mass assignable columns. An empty list accepts every column.
    #[serde(default)]
    pub fillable: Vec<String>,

    /// Columns left out of serialized output by default.
    #[serde(default)]
    pub hidden: Vec<String>,

    pub timestamps: Option<TimestampsConfig>,

    #[serde(default)]
    pub relations: Vec<RelationConfig>,

    #[serde(default)]
    pub filters: Vec<FilterConfig>,

    #[serde(default)]
    pub scopes: Vec<ScopeConfig>,
}

impl ModelConfig {
    pub fn get_key(&self) -> &str {
        self.key.as_deref().unwrap_or("id")
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TimestampsConfig {
    #[serde(default = "default_created_at")]
    pub created_at: String,
    #[serde(default = "default_updated_at")]
    pub updated_at: String,
}

fn default_created_at() -> String {
    "created_at".into()
}

fn default_updated_at() -> String {
    "updated_at".into()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    HasMany,
    HasOne,
    BelongsTo,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelationConfig {
    pub name: String,
    pub kind: RelationKind,

    /// Name of the related model.
    pub model: String,

    /// For `has_many` / `has_one` the column on the related table, for
    /// `belongs_to` the column on this model's table.
    pub foreign_key: String,

    /// The key the foreign key points at. Defaults to the owning side's key.
    pub local_key: Option<String>,
}

/// Maps a key of the filter set to a condition on a column.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    pub key: String,

    /// Column to compare. Default: the filter key
    pub column: Option<String>,

    /// Default: `eq`
    pub op: Option<String>,
}

impl FilterConfig {
    pub fn get_column(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.key)
    }

    pub fn get_op(&self) -> &str {
        self.op.as_deref().unwrap_or("eq")
    }
}

/// A named global scope: a fixed condition applied to every query.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScopeConfig {
    pub name: String,
    pub column: String,

    /// Default: `eq`
    pub op: Option<String>,

    pub value: Value,
}

impl ScopeConfig {
    pub fn get_op(&self) -> &str {
        self.op.as_deref().unwrap_or("eq")
    }
}
