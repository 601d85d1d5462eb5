use std::{
    fmt::Display,
    sync::{LazyLock, RwLock},
};

use miette::miette;
use nu_ansi_term::Color;
use repokit_db::Attributes;
use serde_json::Value;

pub static COLOR: LazyLock<RwLock<bool>> = LazyLock::new(|| RwLock::new(true));

pub struct Colored<T: Display>(pub Color, pub T);

impl<T: Display> Display for Colored<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let color = COLOR.read().map(|c| *c).unwrap_or(true);
        if color {
            write!(f, "{}", self.0.prefix())?;
            self.1.fmt(f)?;
            write!(f, "{}", self.0.suffix())
        } else {
            self.1.fmt(f)
        }
    }
}

/// Reads a command line value as JSON, falling back to a plain string.
///
/// `5` is a number, `true` a bool, `[1,2]` an array and `ada` a string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Parses `key=value` pairs into attributes. Later keys win.
pub fn parse_assignments(pairs: &[String]) -> miette::Result<Attributes> {
    let mut attributes = Attributes::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| miette!("Expected key=value, got `{pair}`"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(miette!("Missing key in `{pair}`"));
        }
        attributes.insert(key.to_string(), parse_value(value));
    }
    Ok(attributes)
}

/// Prints serialized output: compact in JSON mode, pretty otherwise.
pub fn print_json(value: &Value, json: bool) -> miette::Result<()> {
    let output = if json {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    }
    .map_err(|err| miette!("Failed to serialize output: {err}"))?;

    println!("{output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("5"), json!(5));
        assert_eq!(parse_value("true"), json!(true));
        assert_eq!(parse_value("[1, 2]"), json!([1, 2]));
        assert_eq!(parse_value("ada"), json!("ada"));
        assert_eq!(parse_value("\"5\""), json!("5"));
    }

    #[test]
    fn test_parse_assignments() {
        let attributes = parse_assignments(&[
            "name=ada lovelace".to_string(),
            "age=36".to_string(),
            "expr=a=b".to_string(),
            "age=37".to_string(),
        ])
        .unwrap();

        assert_eq!(attributes.get("name"), Some(&json!("ada lovelace")));
        assert_eq!(attributes.get("age"), Some(&json!(37)));
        assert_eq!(attributes.get("expr"), Some(&json!("a=b")));

        assert!(parse_assignments(&["novalue".to_string()]).is_err());
        assert!(parse_assignments(&["=1".to_string()]).is_err());
    }
}
