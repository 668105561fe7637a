//! Fixture value helpers: scalar casting, dotted-path unflattening, deep merge

use serde_json::{Map, Number, Value};

/// Cast a raw cell to the most specific scalar it represents
///
/// `"true"`/`"false"` (any case, surrounding blanks ignored) become booleans,
/// integers and finite floats become numbers, anything else stays a string.
pub fn cast(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Value::Number(int.into());
    }
    // "inf" and "NaN" parse as floats but are not numbers a fixture means
    if let Some(number) = raw
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(Number::from_f64)
    {
        return Value::Number(number);
    }
    Value::String(raw.to_string())
}

/// Set `value` at a dotted path, creating intermediate objects
///
/// A segment that already holds a scalar is replaced by an object.
pub fn set_path(root: &mut Map<String, Value>, path: &str, value: Value) {
    let mut segments = path.split('.').peekable();
    let mut current = root;
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_string(), value);
            return;
        }
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        current = match slot {
            Value::Object(map) => map,
            _ => return,
        };
    }
}

/// Build a nested object from `(dotted path, value)` pairs
pub fn unflatten<I, K>(pairs: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (K, Value)>,
    K: AsRef<str>,
{
    let mut root = Map::new();
    for (path, value) in pairs {
        set_path(&mut root, path.as_ref(), value);
    }
    root
}

/// Merge `overlay` into `base`
///
/// Objects merge key by key; any other overlay value replaces the base value.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let merged = match base.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                base.insert(key, merged);
            }
            Value::Object(base)
        }
        (_, overlay) => overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cast() {
        assert_eq!(cast("true"), json!(true));
        assert_eq!(cast("false"), json!(false));
        assert_eq!(cast("200"), json!(200));
        assert_eq!(cast("-3"), json!(-3));
        assert_eq!(cast("1.5"), json!(1.5));
        assert_eq!(cast("GET"), json!("GET"));
        assert_eq!(cast(" True "), json!(true));
        assert_eq!(cast("FALSE"), json!(false));
        assert_eq!(cast("NaN"), json!("NaN"));
        assert_eq!(cast("inf"), json!("inf"));
    }

    #[test]
    fn test_unflatten_nests_dotted_keys() {
        let tree = unflatten(vec![
            ("host", json!("http://localhost")),
            ("user.name", json!("ada")),
            ("user.address.city", json!("London")),
        ]);
        assert_eq!(
            Value::Object(tree),
            json!({
                "host": "http://localhost",
                "user": {"name": "ada", "address": {"city": "London"}}
            })
        );
    }

    #[test]
    fn test_set_path_replaces_scalar_parent() {
        let mut root = Map::new();
        set_path(&mut root, "a", json!(1));
        set_path(&mut root, "a.b", json!(2));
        assert_eq!(Value::Object(root), json!({"a": {"b": 2}}));
    }

    #[test]
    fn test_deep_merge() {
        let base = json!({"host": "h", "user": {"name": "a", "age": 3}, "list": [1, 2]});
        let overlay = json!({"user": {"name": "b"}, "list": [3], "code": 200});
        assert_eq!(
            deep_merge(base, overlay),
            json!({"host": "h", "user": {"name": "b", "age": 3}, "list": [3], "code": 200})
        );
    }
}
