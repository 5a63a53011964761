//! Immutable merging of in-flight data values.

use serde_json::Value;

/// Merge `new` into `old`, returning a fresh value.
///
/// Objects are combined key by key, recursing where both sides hold
/// objects; scalars and arrays from `new` overwrite. Neither input is
/// mutated, so values stored for one state never alias another's.
pub fn merge_values(old: &Value, new: &Value) -> Value {
    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) => {
            let mut merged = old_map.clone();
            for (key, new_value) in new_map {
                let value = match merged.get(key) {
                    Some(existing) => merge_values(existing, new_value),
                    None => new_value.clone(),
                };
                merged.insert(key.clone(), value);
            }
            Value::Object(merged)
        }
        (_, new) => new.clone(),
    }
}
