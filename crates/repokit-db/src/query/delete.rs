use rusqlite::{types::Value, ToSql};
use tracing::debug;

use crate::{
    connection::Database,
    error::Result,
    query::clause::{push_wheres, WhereClause},
    traits::Expression,
};

/// Builds and runs a `DELETE FROM` statement.
pub struct DeleteQuery {
    db: Database,
    table: String,
    wheres: Vec<WhereClause>,
}

impl DeleteQuery {
    pub fn from(db: Database, table: impl Into<String>) -> Self {
        Self {
            db,
            table: table.into(),
            wheres: Vec::new(),
        }
    }

    pub fn filter<Expr: Expression + 'static>(mut self, expr: Expr) -> Self {
        self.wheres.push(WhereClause::new(expr));
        self
    }

    pub(crate) fn with_wheres(mut self, wheres: Vec<WhereClause>) -> Self {
        self.wheres.extend(wheres);
        self
    }

    pub fn execute(self) -> Result<usize> {
        let (sql, params) = self.build_sql();
        debug!(sql = %sql, "delete");

        self.db.with_conn(|conn| {
            let params_ref: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();
            conn.execute(&sql, params_ref.as_slice())
        })
    }

    fn build_sql(&self) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let mut sql = format!("DELETE FROM {}", self.table);
        push_wheres(&mut sql, &self.wheres, &mut params);

        (sql, params)
    }
}
