//! Ordering rules for caller supplied input.
//!
//! Order input usually comes straight from a request, so nothing here fails:
//! unknown directions fall back to descending and columns that are not
//! fillable are dropped.

use repokit_db::SortDirection;

const ORDER_DIRECTIONS: [&str; 4] = ["ASC", "DESC", "asc", "desc"];

/// Directions accepted in order input.
pub fn order_directions() -> &'static [&'static str] {
    &ORDER_DIRECTIONS
}

/// Resolves a direction string. Anything outside [`order_directions`],
/// including mixed case, resolves to [`SortDirection::Desc`].
pub fn resolve_direction(direction: Option<&str>) -> SortDirection {
    match direction {
        Some("ASC" | "asc") => SortDirection::Asc,
        _ => SortDirection::Desc,
    }
}

/// Splits a comma separated column list, trimming entries and dropping empty ones.
pub fn parse_order_columns(columns: &str) -> Vec<String> {
    columns
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect()
}

/// Prefix of a key name: everything before the first underscore.
///
/// `user_id` gives `user`; a key without an underscore is its own prefix.
pub fn table_prefix(key_name: &str) -> &str {
    key_name
        .split_once('_')
        .map_or(key_name, |(prefix, _)| prefix)
}

/// Default ordering column for a key name: `{prefix}_created_at`.
pub fn default_order_column(key_name: &str) -> String {
    format!("{}_created_at", table_prefix(key_name))
}

/// Keeps the requested columns that are fillable. When none survive, or none
/// were requested, falls back to [`default_order_column`].
pub fn resolve_order_columns(
    requested: Option<&str>,
    fillable: &[String],
    key_name: &str,
) -> Vec<String> {
    let columns = requested
        .map(parse_order_columns)
        .unwrap_or_default()
        .into_iter()
        .filter(|c| fillable.contains(c))
        .collect::<Vec<_>>();

    if columns.is_empty() {
        vec![default_order_column(key_name)]
    } else {
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fillable() -> Vec<String> {
        ["a", "b", "email"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_order_directions() {
        assert_eq!(order_directions(), &["ASC", "DESC", "asc", "desc"]);
    }

    #[test]
    fn test_resolve_direction() {
        assert_eq!(resolve_direction(Some("asc")), SortDirection::Asc);
        assert_eq!(resolve_direction(Some("ASC")), SortDirection::Asc);
        assert_eq!(resolve_direction(Some("desc")), SortDirection::Desc);
        assert_eq!(resolve_direction(Some("sideways")), SortDirection::Desc);
        assert_eq!(resolve_direction(Some("Asc")), SortDirection::Desc);
        assert_eq!(resolve_direction(None), SortDirection::Desc);
    }

    #[test]
    fn test_parse_order_columns() {
        assert_eq!(parse_order_columns("a, b ,c"), vec!["a", "b", "c"]);
        assert_eq!(parse_order_columns(" , a,,"), vec!["a"]);
        assert!(parse_order_columns("").is_empty());
    }

    #[test]
    fn test_table_prefix() {
        assert_eq!(table_prefix("order_id"), "order");
        assert_eq!(table_prefix("user_account_id"), "user");
        assert_eq!(table_prefix("id"), "id");
    }

    #[test]
    fn test_resolve_order_columns() {
        let fillable = fillable();

        assert_eq!(
            resolve_order_columns(Some("a, b ,c"), &fillable, "user_id"),
            vec!["a", "b"]
        );
        assert_eq!(
            resolve_order_columns(Some("not_fillable_field"), &fillable, "user_id"),
            vec!["user_created_at"]
        );
        assert_eq!(
            resolve_order_columns(None, &fillable, "order_id"),
            vec!["order_created_at"]
        );
    }
}
