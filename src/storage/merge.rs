//! Recursive merge of JSON objects, used by `update`.

use serde_json::{Map, Value};

/// Merges `patch` into `target`.
///
/// For each key in `patch`: when both sides hold an object the two are
/// merged recursively, otherwise the patch value wins. Keys present only in
/// `target` are kept. Arrays are values like any other and are replaced,
/// never concatenated.
///
/// # Example
///
/// ```
/// use flashstore::storage::deep_merge;
/// use serde_json::json;
///
/// let mut target = json!({"a": 1, "b": {"c": 2}});
/// let patch = json!({"b": {"d": 3}});
///
/// if let (Some(target), serde_json::Value::Object(patch)) = (target.as_object_mut(), patch) {
///     deep_merge(target, patch);
/// }
/// assert_eq!(target, json!({"a": 1, "b": {"c": 2, "d": 3}}));
/// ```
pub fn deep_merge(target: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, incoming) in patch {
        match incoming {
            Value::Object(nested) => match target.get_mut(&key) {
                Some(Value::Object(existing)) => deep_merge(existing, nested),
                _ => {
                    target.insert(key, Value::Object(nested));
                }
            },
            other => {
                target.insert(key, other);
            }
        }
    }
}
