use serde_json::Value;

/// Extracts the latest published body from a relay GET response.
///
/// The relay normally wraps results as `{"with": [{"content": .., "created": ..}]}`
/// with the newest entry first. A bare object is accepted as the content
/// itself. `{"with": <not an array>}` is how the relay reports a miss.
pub fn unwrap_latest(response: Value) -> Option<Value> {
    let Value::Object(mut map) = response else {
        return None;
    };

    match map.remove("with") {
        None => Some(Value::Object(map)),
        Some(Value::Array(items)) => {
            let Value::Object(mut first) = items.into_iter().next()? else {
                return None;
            };
            first.remove("content")
        }
        Some(_) => None,
    }
}
