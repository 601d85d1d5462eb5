//! Internal representation of query clauses.
//!
//! These types are shared by the query builders and are not part of the public API.

use rusqlite::types::Value;

use crate::traits::Expression;

/// A WHERE clause represented as a closure that generates SQL and binds parameters.
pub(crate) struct WhereClause {
    pub sql_fn: Box<dyn Fn(&mut Vec<Value>) -> String>,
}

impl WhereClause {
    pub fn new<E: Expression + 'static>(expr: E) -> Self {
        Self {
            sql_fn: Box::new(move |params| expr.to_sql(params)),
        }
    }
}

/// An ORDER BY clause.
pub(crate) struct OrderClause {
    pub column: String,
    pub desc: bool,
}

/// Renders ` WHERE a AND b` (or nothing) and collects the bound parameters.
pub(crate) fn push_wheres(sql: &mut String, wheres: &[WhereClause], params: &mut Vec<Value>) {
    if wheres.is_empty() {
        return;
    }
    sql.push_str(" WHERE ");
    let conditions = wheres
        .iter()
        .map(|w| (w.sql_fn)(params))
        .collect::<Vec<_>>();
    sql.push_str(&conditions.join(" AND "));
}
