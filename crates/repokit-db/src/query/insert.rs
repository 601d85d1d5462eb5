use rusqlite::{types::Value, ToSql};
use tracing::debug;

use crate::{connection::Database, error::Result};

/// Builds and runs an `INSERT INTO` statement.
pub struct InsertQuery {
    db: Database,
    table: String,
    columns: Vec<String>,
    values: Vec<Value>,
}

impl InsertQuery {
    pub fn into(db: Database, table: impl Into<String>) -> Self {
        Self {
            db,
            table: table.into(),
            columns: vec![],
            values: vec![],
        }
    }

    pub fn set<V: Into<Value>>(mut self, column: impl Into<String>, value: V) -> Self {
        self.columns.push(column.into());
        self.values.push(value.into());
        self
    }

    /// Runs the statement and returns the rowid of the inserted row.
    pub fn execute(self) -> Result<i64> {
        let (sql, params) = self.build_sql();
        debug!(sql = %sql, "insert");

        self.db.with_conn(|conn| {
            let params_ref: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();
            conn.execute(&sql, params_ref.as_slice())?;
            Ok(conn.last_insert_rowid())
        })
    }

    fn build_sql(&self) -> (String, Vec<Value>) {
        if self.columns.is_empty() {
            return (format!("INSERT INTO {} DEFAULT VALUES", self.table), vec![]);
        }

        let columns = self.columns.join(", ");
        let placeholders = vec!["?"; self.values.len()].join(", ");

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table, columns, placeholders
        );

        (sql, self.values.clone())
    }
}
