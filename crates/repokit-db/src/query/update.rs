use rusqlite::{types::Value, ToSql};
use tracing::debug;

use crate::{
    connection::Database,
    error::Result,
    query::clause::{push_wheres, WhereClause},
    traits::Expression,
};

/// Builds and runs an `UPDATE` statement.
pub struct UpdateQuery {
    db: Database,
    table: String,
    updates: Vec<(String, Value)>,
    wheres: Vec<WhereClause>,
}

impl UpdateQuery {
    pub fn table(db: Database, table: impl Into<String>) -> Self {
        Self {
            db,
            table: table.into(),
            updates: vec![],
            wheres: vec![],
        }
    }

    pub fn set<V: Into<Value>>(mut self, column: impl Into<String>, value: V) -> Self {
        self.updates.push((column.into(), value.into()));
        self
    }

    pub fn filter<Expr: Expression + 'static>(mut self, expr: Expr) -> Self {
        self.wheres.push(WhereClause::new(expr));
        self
    }

    pub(crate) fn with_wheres(mut self, wheres: Vec<WhereClause>) -> Self {
        self.wheres.extend(wheres);
        self
    }

    /// Runs the statement and returns the number of affected rows.
    ///
    /// An update without any `SET` column is a no-op.
    pub fn execute(self) -> Result<usize> {
        if self.updates.is_empty() {
            return Ok(0);
        }

        let (sql, params) = self.build_sql();
        debug!(sql = %sql, "update");

        self.db.with_conn(|conn| {
            let params_ref: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();
            conn.execute(&sql, params_ref.as_slice())
        })
    }

    fn build_sql(&self) -> (String, Vec<Value>) {
        let mut params = Vec::new();

        let sets: Vec<String> = self
            .updates
            .iter()
            .map(|(col, val)| {
                params.push(val.clone());
                format!("{} = ?", col)
            })
            .collect();

        let mut sql = format!("UPDATE {} SET {}", self.table, sets.join(", "));
        push_wheres(&mut sql, &self.wheres, &mut params);

        (sql, params)
    }
}
