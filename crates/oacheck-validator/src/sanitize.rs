//! Strip `$id` annotations that break Draft 2020-12 once schemas are inlined

use serde_json::Value;

/// Return a deep copy of `schema` without malformed `$id` values.
///
/// A `$id` survives only if it has no `#`, or a single trailing one.
/// Non-string `$id` entries are kept: inside `properties` the key names a
/// property, not an identifier.
#[must_use]
pub fn sanitize(schema: &Value) -> Value {
    let mut copy = schema.clone();
    strip_ids(&mut copy);
    copy
}

fn strip_ids(node: &mut Value) {
    match node {
        Value::Object(map) => {
            if map
                .get("$id")
                .and_then(Value::as_str)
                .is_some_and(|id| !is_bare_id(id))
            {
                map.remove("$id");
            }
            map.values_mut().for_each(strip_ids);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_ids),
        _ => {}
    }
}

fn is_bare_id(id: &str) -> bool {
    match id.find('#') {
        None => true,
        Some(i) => i + 1 == id.len(),
    }
}
