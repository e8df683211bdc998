//! Argument Marshaler
//!
//! Turns a test case's named inputs into positional JavaScript literals.
//! Positions follow the input map's insertion order; values are never
//! coerced, so every literal evaluates back to exactly the JSON it came from.

use serde_json::Value;
use verdict_common::types::TestCase;

use crate::adapter::emit::string_literal;

/// Render one JSON value as a JavaScript literal.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => string_literal(s),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(render_value).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(entries) => {
            if entries.is_empty() {
                return "{}".to_string();
            }
            let entries: Vec<String> = entries
                .iter()
                .map(|(key, value)| {
                    // A literal `__proto__` key would set the prototype
                    // instead of creating a property.
                    let key = if key == "__proto__" {
                        format!("[{}]", string_literal(key))
                    } else {
                        string_literal(key)
                    };
                    format!("{key}: {}", render_value(value))
                })
                .collect();
            format!("{{ {} }}", entries.join(", "))
        }
    }
}

/// Positional argument literals in input order.
pub fn render_arguments(case: &TestCase) -> Vec<String> {
    case.input.values().map(render_value).collect()
}

/// `function(arg0, arg1, ...)`
pub fn render_call(function: &str, case: &TestCase) -> String {
    format!("{function}({})", render_arguments(case).join(", "))
}
