//! Declarative filter input.
//!
//! The input has the shape
//!
//! ```json
//! {
//!   "order": { "col": "name, email", "dir": "asc" },
//!   "filters": { "name": "ada" },
//!   "limit": 20,
//!   "page": 2
//! }
//! ```
//!
//! Every part is optional and malformed parts are ignored.

use repokit_db::Attributes;
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterInput {
    /// Raw comma separated order columns.
    pub order_col: Option<String>,
    /// Raw order direction.
    pub order_dir: Option<String>,
    /// Filter set, passed through to the model's filter handlers unchanged.
    pub filters: Attributes,
    pub limit: Option<u64>,
    pub page: Option<u64>,
}

impl FilterInput {
    pub fn from_value(input: &Value) -> Self {
        let order = input.get("order");
        let text = |value: Option<&Value>| value.and_then(Value::as_str).map(String::from);

        Self {
            order_col: text(order.and_then(|o| o.get("col"))),
            order_dir: text(order.and_then(|o| o.get("dir"))),
            filters: input
                .get("filters")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
            limit: input.get("limit").and_then(positive_int),
            page: input.get("page").and_then(positive_int),
        }
    }
}

fn positive_int(value: &Value) -> Option<u64> {
    u64::try_from(coerce_int(value)).ok().filter(|n| *n > 0)
}

/// Loose integer conversion for ids and sizes coming from untrusted input.
///
/// Strings are read up to the first non-digit (`"12abc"` is 12), floats are
/// truncated and anything unreadable is 0.
pub fn coerce_int(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or_default(),
        Value::String(s) => leading_int(s),
        Value::Bool(b) => i64::from(*b),
        _ => 0,
    }
}

fn leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut n: i64 = 0;
    for c in digits.chars().take_while(char::is_ascii_digit) {
        let digit = i64::from(c as u8 - b'0');
        n = n.saturating_mul(10).saturating_add(digit);
    }
    if negative {
        -n
    } else {
        n
    }
}
