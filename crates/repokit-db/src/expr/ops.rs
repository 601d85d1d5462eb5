//! SQL expression operators.
//!
//! These structs represent compound expressions like `col = ?`, `col LIKE ?`, etc.
//! Each implements [`Expression`] and recursively builds SQL fragments.

use std::str::FromStr;

use rusqlite::types::Value as SqlValue;

use crate::{error::DbError, traits::Expression};

/// Comparison operators accepted from callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    Like,
}

impl Operator {
    pub const fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Gte => ">=",
            Operator::Lte => "<=",
            Operator::Like => "LIKE",
        }
    }
}

impl FromStr for Operator {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "=" | "eq" => Ok(Operator::Eq),
            "!=" | "<>" | "ne" => Ok(Operator::Ne),
            ">" | "gt" => Ok(Operator::Gt),
            "<" | "lt" => Ok(Operator::Lt),
            ">=" | "gte" => Ok(Operator::Gte),
            "<=" | "lte" => Ok(Operator::Lte),
            "like" => Ok(Operator::Like),
            _ => Err(DbError::InvalidOperator(s.to_string())),
        }
    }
}

/// Represents a binary comparison (e.g., `=`, `>`, `<=`).
pub struct BinaryOp<L> {
    left: L,
    op: &'static str,
    right: SqlValue,
}

impl<L> BinaryOp<L> {
    pub fn new(left: L, op: &'static str, right: SqlValue) -> Self {
        Self {
            left,
            op,
            right,
        }
    }
}

impl<L: Expression> Expression for BinaryOp<L> {
    fn to_sql(&self, params: &mut Vec<SqlValue>) -> String {
        let left_sql = self.left.to_sql(params);
        params.push(self.right.clone());
        format!("{} {} ?", left_sql, self.op)
    }
}

/// Represents a `LIKE` or case-insensitive `LIKE` pattern match.
pub struct LikeOp<L> {
    left: L,
    pattern: String,
    case_insensitive: bool,
}

impl<L> LikeOp<L> {
    pub const fn new(left: L, pattern: String, case_insensitive: bool) -> Self {
        Self {
            left,
            pattern,
            case_insensitive,
        }
    }
}

impl<L: Expression> Expression for LikeOp<L> {
    fn to_sql(&self, params: &mut Vec<SqlValue>) -> String {
        let left_sql = self.left.to_sql(params);
        params.push(SqlValue::Text(format!("%{}%", self.pattern)));
        if self.case_insensitive {
            format!("LOWER({}) LIKE LOWER(?)", left_sql)
        } else {
            format!("{} LIKE ?", left_sql)
        }
    }
}

/// Represents an `IN` or `NOT IN` clause.
pub struct InOp<L> {
    left: L,
    values: Vec<SqlValue>,
    negated: bool,
}

impl<L> InOp<L> {
    pub fn new(left: L, values: Vec<SqlValue>, negated: bool) -> Self {
        Self {
            left,
            values,
            negated,
        }
    }
}

impl<L: Expression> Expression for InOp<L> {
    fn to_sql(&self, params: &mut Vec<SqlValue>) -> String {
        let left_sql = self.left.to_sql(params);
        let placeholders = vec!["?"; self.values.len()].join(", ");
        params.extend(self.values.iter().cloned());
        let op = if self.negated { "NOT IN" } else { "IN" };
        format!("{} {} ({})", left_sql, op, placeholders)
    }
}

/// Represents an `IS NULL` or `IS NOT NULL` check.
pub struct NullOp<L> {
    left: L,
    is_null: bool,
}

impl<L> NullOp<L> {
    pub fn new(left: L, is_null: bool) -> Self {
        Self {
            left,
            is_null,
        }
    }
}

impl<L: Expression> Expression for NullOp<L> {
    fn to_sql(&self, params: &mut Vec<SqlValue>) -> String {
        let left_sql = self.left.to_sql(params);
        let op = if self.is_null {
            "IS NULL"
        } else {
            "IS NOT NULL"
        };
        format!("{} {}", left_sql, op)
    }
}

/// Combines two expressions with `AND` or `OR`.
pub struct LogicalOp<L, R> {
    left: L,
    right: R,
    op: &'static str,
}

impl<L, R> LogicalOp<L, R> {
    pub fn new(left: L, right: R, op: &'static str) -> Self {
        Self {
            left,
            right,
            op,
        }
    }
}

impl<L: Expression, R: Expression> Expression for LogicalOp<L, R> {
    fn to_sql(&self, params: &mut Vec<SqlValue>) -> String {
        let left_sql = self.left.to_sql(params);
        let right_sql = self.right.to_sql(params);
        format!("({} {} {})", left_sql, self.op, right_sql)
    }
}

/// An `EXISTS (...)` sub-query correlating two tables on one column each.
pub struct ExistsOp {
    table: String,
    column: String,
    outer: String,
}

impl ExistsOp {
    /// `EXISTS (SELECT 1 FROM {table} WHERE {table}.{column} = {outer})`
    pub fn new(table: impl Into<String>, column: impl Into<String>, outer: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            outer: outer.into(),
        }
    }
}

impl Expression for ExistsOp {
    fn to_sql(&self, _params: &mut Vec<SqlValue>) -> String {
        format!(
            "EXISTS (SELECT 1 FROM {table} WHERE {table}.{column} = {outer})",
            table = self.table,
            column = self.column,
            outer = self.outer
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Col;

    #[test]
    fn test_operator_parsing() {
        assert_eq!("=".parse::<Operator>().unwrap(), Operator::Eq);
        assert_eq!("<>".parse::<Operator>().unwrap(), Operator::Ne);
        assert_eq!("LIKE".parse::<Operator>().unwrap(), Operator::Like);
        assert!(matches!(
            "sideways".parse::<Operator>(),
            Err(DbError::InvalidOperator(_))
        ));
    }

    #[test]
    fn test_compound_expressions() {
        let expr = Col::new("name")
            .like("rust")
            .or(Col::new("downloads").gte(100));
        let mut params = vec![];

        assert_eq!(expr.to_sql(&mut params), "(name LIKE ? OR downloads >= ?)");
        assert_eq!(
            params,
            vec![SqlValue::Text("%rust%".into()), SqlValue::Integer(100)]
        );
    }

    #[test]
    fn test_in_and_null() {
        let mut params = vec![];
        let sql = Col::new("id").in_([1, 2, 3]).to_sql(&mut params);
        assert_eq!(sql, "id IN (?, ?, ?)");
        assert_eq!(params.len(), 3);

        let sql = Col::new("deleted_at").null().to_sql(&mut params);
        assert_eq!(sql, "deleted_at IS NULL");
    }
}
