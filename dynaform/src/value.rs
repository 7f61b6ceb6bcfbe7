//! JSON value helpers shared by field types and rules.

use serde_json::Value;

/// Render a stored value as plain text.
///
/// Arrays are comma-joined element by element; null renders empty. This is
/// the fallback text form used when a field type has no richer rendering.
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(value_text)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

/// Whether a value counts as "not filled in".
///
/// Null, `false`, zero, the empty string, `"0"` and empty collections are
/// all empty. `Required` and the filter no-op check share this notion.
pub(crate) fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Coerce a value into a list. Null and the empty string become an empty
/// list, arrays pass through, anything else wraps into a one-element list.
pub(crate) fn as_array(value: Value) -> Vec<Value> {
    match value {
        Value::Null => Vec::new(),
        Value::String(s) if s.is_empty() => Vec::new(),
        Value::Array(items) => items,
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_joins_arrays() {
        assert_eq!(value_text(&json!(["a", "b", 3])), "a,b,3");
        assert_eq!(value_text(&Value::Null), "");
        assert_eq!(value_text(&json!(42)), "42");
    }

    #[test]
    fn emptiness_matches_loose_falsy() {
        assert!(is_empty_value(&Value::Null));
        assert!(is_empty_value(&json!(0)));
        assert!(is_empty_value(&json!("0")));
        assert!(is_empty_value(&json!("")));
        assert!(is_empty_value(&json!([])));
        assert!(!is_empty_value(&json!("0.5")));
        assert!(!is_empty_value(&json!([0])));
    }

    #[test]
    fn as_array_coerces() {
        assert_eq!(as_array(json!(null)), Vec::<Value>::new());
        assert_eq!(as_array(json!("")), Vec::<Value>::new());
        assert_eq!(as_array(json!([1, 2])), vec![json!(1), json!(2)]);
        assert_eq!(as_array(json!("x")), vec![json!("x")]);
    }
}
