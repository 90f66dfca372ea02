//! Type-checked extraction of values from untyped update batches
//!
//! Producers send loosely typed key/value maps. Every helper here is total:
//! a missing key or a value of the wrong runtime type yields nothing rather
//! than an error, so one bad entry never spoils the rest of a batch.

use serde_json::{Map, Value};

/// An untyped, string-keyed collection of proposed field updates
pub type UpdateBatch = Map<String, Value>;

/// A type that can be extracted from an untyped value
pub trait FromUntyped: Sized {
    /// Name used in diagnostics
    const TYPE_NAME: &'static str;

    /// Extract `Self` if `value` has the matching runtime type
    fn from_untyped(value: &Value) -> Option<Self>;
}

impl FromUntyped for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_untyped(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromUntyped for String {
    const TYPE_NAME: &'static str = "string";

    fn from_untyped(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
}

impl FromUntyped for i64 {
    const TYPE_NAME: &'static str = "integer";

    /// Integral JSON numbers only.
    ///
    /// Floats with no fractional part are accepted because browser-side
    /// producers encode every number as a double.
    fn from_untyped(value: &Value) -> Option<Self> {
        let Value::Number(number) = value else {
            return None;
        };
        if let Some(n) = number.as_i64() {
            return Some(n);
        }
        number
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
            .map(|f| f as i64)
    }
}

/// Extract the value at `key` as `T`
///
/// Returns `None` when the key is absent or holds a different type.
pub fn extract<T: FromUntyped>(batch: &UpdateBatch, key: &str) -> Option<T> {
    batch.get(key).and_then(T::from_untyped)
}

/// Invoke `on_success` with the value at `key` if it has type `T`
///
/// Returns whether the callback ran. Mismatches are logged at debug level
/// and otherwise ignored.
pub fn coerce<T, F>(batch: &UpdateBatch, key: &str, on_success: F) -> bool
where
    T: FromUntyped,
    F: FnOnce(T),
{
    let Some(value) = batch.get(key) else {
        return false;
    };

    match T::from_untyped(value) {
        Some(typed) => {
            on_success(typed);
            true
        }
        None => {
            tracing::debug!(
                key = %key,
                expected = T::TYPE_NAME,
                found = json_type_name(value),
                "Ignoring settings update with mismatched type"
            );
            false
        }
    }
}

/// Runtime type of a JSON value, for diagnostics
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn batch(value: Value) -> UpdateBatch {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_check_int_only_matches_integers() {
        let m = batch(json!({ "test": 4809 }));

        let mut seen = None;
        assert!(coerce::<i64, _>(&m, "test", |v| seen = Some(v)));
        assert_eq!(seen, Some(4809));

        assert!(!coerce::<String, _>(&m, "test", |_| panic!("Should not have been called")));
        assert!(!coerce::<bool, _>(&m, "test", |_| panic!("Should not have been called")));
    }

    #[test]
    fn test_missing_key_is_noop() {
        let m = batch(json!({ "other": true }));
        assert!(!coerce::<bool, _>(&m, "proxyAll", |_| panic!("Should not have been called")));
        assert_eq!(extract::<bool>(&m, "proxyAll"), None);
    }

    #[test]
    fn test_extract_bool_and_string() {
        let m = batch(json!({ "flag": false, "name": "token" }));
        assert_eq!(extract::<bool>(&m, "flag"), Some(false));
        assert_eq!(extract::<String>(&m, "name"), Some("token".to_string()));
        assert_eq!(extract::<String>(&m, "flag"), None);
        assert_eq!(extract::<bool>(&m, "name"), None);
    }

    #[test]
    fn test_integer_rules() {
        let m = batch(json!({
            "int": 483109,
            "negative": -7,
            "whole_float": 483109.0,
            "fraction": 1.5,
            "digits": "483109",
            "flag": true,
            "huge": u64::MAX,
            "null": null,
        }));

        assert_eq!(extract::<i64>(&m, "int"), Some(483109));
        assert_eq!(extract::<i64>(&m, "negative"), Some(-7));
        assert_eq!(extract::<i64>(&m, "whole_float"), Some(483109));
        assert_eq!(extract::<i64>(&m, "fraction"), None);
        assert_eq!(extract::<i64>(&m, "digits"), None);
        assert_eq!(extract::<i64>(&m, "flag"), None);
        assert_eq!(extract::<i64>(&m, "huge"), None);
        assert_eq!(extract::<i64>(&m, "null"), None);
    }

    #[test]
    fn test_callback_runs_exactly_once() {
        let m = batch(json!({ "userToken": "abc" }));
        let mut calls = 0;
        coerce::<String, _>(&m, "userToken", |_| calls += 1);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_json_type_name() {
        assert_eq!(json_type_name(&json!(null)), "null");
        assert_eq!(json_type_name(&json!(1)), "integer");
        assert_eq!(json_type_name(&json!(1.5)), "float");
        assert_eq!(json_type_name(&json!("x")), "string");
        assert_eq!(json_type_name(&json!([1])), "array");
        assert_eq!(json_type_name(&json!({})), "object");
    }
}
