//! Core trait that powers the query builder.
//!
//! [`Expression`] is the contract for anything that renders into a SQL
//! condition: columns, comparisons, pattern matches and their combinations.

use rusqlite::types::Value as SqlValue;
use serde_json::Value;

use crate::{
    expr::ops::{BinaryOp, InOp, LikeOp, LogicalOp, NullOp, Operator},
    value::to_sql_value,
};

/// A trait for types that can be converted into SQL expressions.
///
/// This enables ergonomic query construction using operators like `.eq()`, `.like()`, etc.
/// Implementors include:
/// - [`crate::expr::Col`]: a table column
/// - [`BinaryOp`], [`LikeOp`], etc.: compound expressions
///
/// When `to_sql` is called, it appends bound parameters to the provided `params` vector
/// and returns the SQL fragment (with `?` placeholders).
pub trait Expression: Sized {
    /// Converts this expression into a SQL string fragment and appends bound parameters.
    ///
    /// # Example
    ///
    /// ```rust
    /// use repokit_db::expr::Col;
    /// use repokit_db::traits::Expression as _;
    ///
    /// let expr = Col::new("name").eq("User");
    /// let mut params = vec![];
    /// let sql = expr.to_sql(&mut params);
    /// assert_eq!(sql, "name = ?");
    /// assert_eq!(params.len(), 1);
    /// ```
    fn to_sql(&self, params: &mut Vec<SqlValue>) -> String;

    /// Creates a comparison with an explicit operator.
    fn compare<T: Into<Value>>(self, op: Operator, value: T) -> BinaryOp<Self> {
        BinaryOp::new(self, op.as_str(), to_sql_value(&value.into()))
    }

    /// Creates a SQL `=` condition.
    fn eq<T: Into<Value>>(self, value: T) -> BinaryOp<Self> {
        self.compare(Operator::Eq, value)
    }

    /// Creates a SQL `!=` condition.
    fn ne<T: Into<Value>>(self, value: T) -> BinaryOp<Self> {
        self.compare(Operator::Ne, value)
    }

    /// Creates a SQL `>` condition.
    fn gt<T: Into<Value>>(self, value: T) -> BinaryOp<Self> {
        self.compare(Operator::Gt, value)
    }

    /// Creates a SQL `<` condition.
    fn lt<T: Into<Value>>(self, value: T) -> BinaryOp<Self> {
        self.compare(Operator::Lt, value)
    }

    /// Creates a SQL `>=` condition.
    fn gte<T: Into<Value>>(self, value: T) -> BinaryOp<Self> {
        self.compare(Operator::Gte, value)
    }

    /// Creates a SQL `<=` condition.
    fn lte<T: Into<Value>>(self, value: T) -> BinaryOp<Self> {
        self.compare(Operator::Lte, value)
    }

    /// Creates a SQL `LIKE` condition matching the pattern anywhere in the value.
    fn like(self, pattern: impl Into<String>) -> LikeOp<Self> {
        LikeOp::new(self, pattern.into(), false)
    }

    /// Creates a case-insensitive `LIKE` condition.
    fn ilike(self, pattern: impl Into<String>) -> LikeOp<Self> {
        LikeOp::new(self, pattern.into(), true)
    }

    /// Creates a SQL `IN` condition.
    fn in_<T, I>(self, values: I) -> InOp<Self>
    where
        T: Into<Value>,
        I: IntoIterator<Item = T>,
    {
        let values = values
            .into_iter()
            .map(|v| to_sql_value(&v.into()))
            .collect();
        InOp::new(self, values, false)
    }

    /// Creates a SQL `NOT IN` condition.
    fn not_in<T, I>(self, values: I) -> InOp<Self>
    where
        T: Into<Value>,
        I: IntoIterator<Item = T>,
    {
        let values = values
            .into_iter()
            .map(|v| to_sql_value(&v.into()))
            .collect();
        InOp::new(self, values, true)
    }

    /// Creates a SQL `IS NULL` condition.
    fn null(self) -> NullOp<Self> {
        NullOp::new(self, true)
    }

    /// Creates a SQL `IS NOT NULL` condition.
    fn not_null(self) -> NullOp<Self> {
        NullOp::new(self, false)
    }

    /// Combines two expressions with `AND`.
    fn and<E: Expression>(self, other: E) -> LogicalOp<Self, E> {
        LogicalOp::new(self, other, "AND")
    }

    /// Combines two expressions with `OR`.
    fn or<E: Expression>(self, other: E) -> LogicalOp<Self, E> {
        LogicalOp::new(self, other, "OR")
    }
}
