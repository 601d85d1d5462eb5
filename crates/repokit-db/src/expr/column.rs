//! Represents a database column.
//!
//! `Col` names a column so it can be used directly in filters. Column names
//! that come from callers are checked with [`Col::checked`] before they reach
//! any SQL string.

use std::borrow::Cow;

use rusqlite::types::Value as SqlValue;

use crate::{
    error::{DbError, Result},
    traits::Expression,
};

/// A reference to a database column.
///
/// # Example
///
/// ```rust
/// use repokit_db::expr::Col;
/// const NAME: Col = Col::new("name");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Col {
    pub name: Cow<'static, str>,
}

impl Col {
    /// Creates a column reference from a static name.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
        }
    }

    /// Creates a column reference from a runtime name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Cow::Owned(name.into()),
        }
    }

    /// Creates a column reference after validating the name as an identifier.
    pub fn checked(name: &str) -> Result<Self> {
        validate_identifier(name, "column")?;
        Ok(Self::named(name))
    }

    /// Qualifies the column with a table name (`table.column`).
    pub fn qualified(table: &str, name: &str) -> Self {
        Self::named(format!("{table}.{name}"))
    }
}

impl Expression for Col {
    fn to_sql(&self, _params: &mut Vec<SqlValue>) -> String {
        self.name.to_string()
    }
}

/// Rejects anything that is not a plain or table-qualified identifier.
pub fn validate_identifier(ident: &str, kind: &'static str) -> Result<()> {
    if is_valid_identifier(ident) {
        Ok(())
    } else {
        Err(DbError::InvalidIdentifier {
            kind,
            ident: ident.to_string(),
        })
    }
}

fn is_valid_identifier(ident: &str) -> bool {
    !ident.is_empty() && ident.split('.').count() <= 2 && ident.split('.').all(is_valid_segment)
}

fn is_valid_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_validation() {
        assert!(is_valid_identifier("email"));
        assert!(is_valid_identifier("users.user_created_at"));
        assert!(is_valid_identifier("_private"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("1st"));
        assert!(!is_valid_identifier("name; DROP TABLE users"));
        assert!(!is_valid_identifier("a.b.c"));
    }

    #[test]
    fn test_checked_column() {
        assert_eq!(Col::checked("name").unwrap(), Col::new("name"));
        assert!(matches!(
            Col::checked("name desc"),
            Err(DbError::InvalidIdentifier { kind: "column", .. })
        ));
    }
}
