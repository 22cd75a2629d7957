//! Canonical JSON encoding for signing
//!
//! Object keys are sorted recursively; array order is preserved;
//! primitives use their plain JSON encoding. Signing the same payload
//! twice must yield byte-identical input to the HMAC.

use serde_json::Value;
use std::collections::BTreeMap;

/// Render a JSON value with recursively sorted object keys.
pub fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            // BTreeMap iteration gives the sorted key order regardless of
            // how the source map is configured.
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            let fields: Vec<String> = sorted
                .into_iter()
                .map(|(key, val)| {
                    format!(
                        "{}:{}",
                        serde_json::to_string(key).unwrap_or_default(),
                        canonical_json(val)
                    )
                })
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        Value::Array(items) => {
            let rendered: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", rendered.join(","))
        }
        leaf => serde_json::to_string(leaf).unwrap_or_else(|_| "null".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_sorted_recursively() {
        let value = json!({"b": {"z": 1, "a": 2}, "a": true});
        assert_eq!(canonical_json(&value), r#"{"a":true,"b":{"a":2,"z":1}}"#);
    }

    #[test]
    fn array_order_preserved() {
        let value = json!({"items": [3, 1, 2]});
        assert_eq!(canonical_json(&value), r#"{"items":[3,1,2]}"#);
        let objects = json!([{"b": 1, "a": 2}, "x"]);
        assert_eq!(canonical_json(&objects), r#"[{"a":2,"b":1},"x"]"#);
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let first = json!({"alpha": 1, "beta": 2});
        let mut second = serde_json::Map::new();
        second.insert("beta".to_string(), json!(2));
        second.insert("alpha".to_string(), json!(1));
        assert_eq!(canonical_json(&first), canonical_json(&Value::Object(second)));
    }

    #[test]
    fn strings_escaped_as_json() {
        let value = json!({"note": "line\n\"quoted\""});
        assert_eq!(canonical_json(&value), r#"{"note":"line\n\"quoted\""}"#);
    }
}
