//! Collapse free-form LLM values into display strings.
//!
//! The model may answer any key with a string, a list, or a map of
//! sub-topics. Reports need plain text.

use serde_json::Value;

/// Flatten to one line.
///
/// - list: items joined with `"; "`
/// - map: `"Key: v1, v2"` parts joined with `" | "`
/// - scalar: its text
pub fn flatten_value(value: &Value) -> String {
    match value {
        Value::Array(items) => items.iter().map(scalar_text).collect::<Vec<_>>().join("; "),
        Value::Object(_) => flatten_lines(value).join(" | "),
        other => scalar_text(other),
    }
}

/// Flatten to a list of lines: one per list item or map entry.
pub fn flatten_lines(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(scalar_text).collect(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| {
                let text = match v {
                    Value::Array(items) => {
                        items.iter().map(scalar_text).collect::<Vec<_>>().join(", ")
                    }
                    other => scalar_text(other),
                };
                format!("{}: {text}", title_case(k))
            })
            .collect(),
        other => vec![scalar_text(other)],
    }
}

/// Strings unquoted, null empty, everything else as JSON text.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Capitalise the first letter of each alphabetic run, lowercase the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}
