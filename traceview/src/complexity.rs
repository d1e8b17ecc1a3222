use serde_json::Value;

use crate::value::TYPE_FIELD;

/// Vertical-space cost of a dynamic value, used as the renderer's budget signal.
///
/// Primitives cost 1, strings cost their line count, and structures cost 1 plus
/// the sum of their fields (the `_type` discriminator excluded) or items.
/// Traversal uses an explicit stack, so nesting depth is unbounded.
pub fn cost(value: &Value) -> usize {
    let mut total = 0usize;
    let mut pending = vec![value];
    while let Some(value) = pending.pop() {
        total += match value {
            Value::Null | Value::Bool(_) | Value::Number(_) => 1,
            Value::String(text) => line_count(text),
            Value::Array(items) => {
                pending.extend(items);
                1
            }
            Value::Object(fields) => {
                pending.extend(
                    fields
                        .iter()
                        .filter(|(key, _)| key.as_str() != TYPE_FIELD)
                        .map(|(_, value)| value),
                );
                1
            }
        };
    }
    total
}

/// Number of line breaks plus one
pub fn line_count(text: &str) -> usize {
    text.bytes().filter(|b| *b == b'\n').count() + 1
}
