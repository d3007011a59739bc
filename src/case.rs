//! Key casing at the API boundary: clients speak camelCase, columns are snake_case.

use serde_json::{Map, Value};

/// `contact_number` -> `contactNumber`
pub fn to_camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper_next = false;
    for c in s.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// `contactNumber` -> `contact_number`
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Rename the top-level keys of a row to camelCase. Nested JSON values are left alone.
pub fn camelize_row(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (to_camel_case(&k), v))
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}

/// Rename the keys of a request object to snake_case, keeping insertion order.
pub fn snake_case_keys(map: Map<String, Value>) -> Vec<(String, Value)> {
    map.into_iter().map(|(k, v)| (to_snake_case(&k), v)).collect()
}
