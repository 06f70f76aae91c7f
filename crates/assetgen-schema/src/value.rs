//! # Value Model
//!
//! Instances and schemas share one representation: [`serde_json::Value`]
//! built with `preserve_order`, so object members iterate in insertion
//! order. This module adds the parsing entry points and the typed accessors
//! the engine relies on.
//!
//! Numbers are treated as `f64` for every comparison. No coercion happens
//! between kinds: `"1"` is a string, never a number.

use serde_json::{Map, Number};

use crate::error::ValueError;

pub use serde_json::Value;

/// An object value: string keys in insertion order.
pub type Object = Map<String, Value>;

/// Parse JSON text. Trailing content after the top-level value is rejected.
pub fn parse_json(text: &str) -> Result<Value, ValueError> {
    serde_json::from_str(text).map_err(|e| ValueError::Parse {
        message: e.to_string(),
        line: e.line(),
        column: e.column(),
    })
}

/// Parse YAML text into the same value tree JSON would produce.
///
/// Only the JSON-compatible subset of YAML is accepted: tags are ignored,
/// map keys must be scalars, and non-finite floats are rejected.
pub fn parse_yaml(text: &str) -> Result<Value, ValueError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(text).map_err(|e| {
        let (line, column) = e
            .location()
            .map(|loc| (loc.line(), loc.column()))
            .unwrap_or((0, 0));
        ValueError::Parse {
            message: e.to_string(),
            line,
            column,
        }
    })?;
    yaml_to_value(&yaml).map_err(|message| ValueError::Parse {
        message,
        line: 0,
        column: 0,
    })
}

fn yaml_to_value(yaml: &serde_yaml::Value) -> Result<Value, String> {
    match yaml {
        serde_yaml::Value::Null => Ok(Value::Null),
        serde_yaml::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Number(Number::from(i)))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::Number(Number::from(u)))
            } else if let Some(f) = n.as_f64() {
                Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| format!("cannot represent float {f}"))
            } else {
                Err(format!("unsupported YAML number: {n:?}"))
            }
        }
        serde_yaml::Value::String(s) => Ok(Value::String(s.clone())),
        serde_yaml::Value::Sequence(seq) => seq
            .iter()
            .map(yaml_to_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        serde_yaml::Value::Mapping(map) => {
            let mut object = Object::new();
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    other => return Err(format!("unsupported YAML map key: {other:?}")),
                };
                object.insert(key, yaml_to_value(v)?);
            }
            Ok(Value::Object(object))
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_value(&tagged.value),
    }
}

/// Name of a value's kind, as used in diagnostics.
pub fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// True for a finite number with no fractional part.
pub fn is_integer_valued(value: &Value) -> bool {
    value
        .as_f64()
        .is_some_and(|n| n.is_finite() && n.fract() == 0.0)
}

/// Structural equality with numbers compared by their `f64` value,
/// so `1` and `1.0` are equal. Object member order is irrelevant.
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| deep_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(key, l)| y.get(key).is_some_and(|r| deep_equal(l, r)))
        }
        _ => a == b,
    }
}

/// Typed accessors that fail with [`ValueError::TypeMismatch`] instead of
/// returning `None`.
pub trait ValueExt {
    fn try_str(&self) -> Result<&str, ValueError>;
    fn try_f64(&self) -> Result<f64, ValueError>;
    fn try_bool(&self) -> Result<bool, ValueError>;
    fn try_array(&self) -> Result<&Vec<Value>, ValueError>;
    fn try_object(&self) -> Result<&Object, ValueError>;
}

impl ValueExt for Value {
    fn try_str(&self) -> Result<&str, ValueError> {
        self.as_str().ok_or_else(|| mismatch("string", self))
    }

    fn try_f64(&self) -> Result<f64, ValueError> {
        self.as_f64().ok_or_else(|| mismatch("number", self))
    }

    fn try_bool(&self) -> Result<bool, ValueError> {
        self.as_bool().ok_or_else(|| mismatch("boolean", self))
    }

    fn try_array(&self) -> Result<&Vec<Value>, ValueError> {
        self.as_array().ok_or_else(|| mismatch("array", self))
    }

    fn try_object(&self) -> Result<&Object, ValueError> {
        self.as_object().ok_or_else(|| mismatch("object", self))
    }
}

fn mismatch(expected: &'static str, value: &Value) -> ValueError {
    ValueError::TypeMismatch {
        expected,
        found: kind(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_json_preserves_member_order() {
        let value = parse_json(r#"{"zeta": 1, "alpha": 2, "mid": 3}"#).unwrap();
        let keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn parse_json_rejects_malformed_text() {
        for text in [r#"{"id": "oak""#, r#"{"id": "\q"}"#, r#"{"id": 1} trailing"#, ""] {
            let err = parse_json(text).unwrap_err();
            assert!(matches!(err, ValueError::Parse { .. }), "{text}: {err:?}");
        }
    }

    #[test]
    fn parse_json_reports_location() {
        let err = parse_json("{\n  \"id\": ,\n}").unwrap_err();
        match err {
            ValueError::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[test]
    fn parse_yaml_matches_json_tree() {
        let yaml = r#"
id: oak_plank
count: 4
hardness: 2.5
flammable: true
tags:
  - wood
  - plank
"#;
        let value = parse_yaml(yaml).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "oak_plank",
                "count": 4,
                "hardness": 2.5,
                "flammable": true,
                "tags": ["wood", "plank"]
            })
        );
    }

    #[test]
    fn parse_yaml_stringifies_scalar_keys() {
        let value = parse_yaml("1: one\ntrue: yes\n").unwrap();
        assert_eq!(value["1"], "one");
        assert_eq!(value["true"], "yes");
    }

    #[test]
    fn parse_yaml_rejects_malformed_text() {
        assert!(matches!(
            parse_yaml("id: [unterminated"),
            Err(ValueError::Parse { .. })
        ));
    }

    #[test]
    fn typed_accessors_do_not_coerce() {
        let value = json!("42");
        assert_eq!(value.try_str().unwrap(), "42");
        assert_eq!(
            value.try_f64().unwrap_err(),
            ValueError::TypeMismatch {
                expected: "number",
                found: "string"
            }
        );
        assert!(json!(1).try_bool().is_err());
        assert!(json!({}).try_array().is_err());
        assert!(json!([]).try_object().is_err());
    }

    #[test]
    fn integer_valued_numbers() {
        assert!(is_integer_valued(&json!(3)));
        assert!(is_integer_valued(&json!(3.0)));
        assert!(is_integer_valued(&json!(-7)));
        assert!(!is_integer_valued(&json!(3.5)));
        assert!(!is_integer_valued(&json!("3")));
    }

    #[test]
    fn deep_equal_compares_numbers_by_value() {
        assert!(deep_equal(&json!(1), &json!(1.0)));
        assert!(deep_equal(&json!([1, {"a": 2}]), &json!([1.0, {"a": 2.0}])));
        assert!(!deep_equal(&json!(1), &json!("1")));
    }

    #[test]
    fn deep_equal_ignores_member_order() {
        assert!(deep_equal(&json!({"a": 1, "b": 2}), &json!({"b": 2, "a": 1})));
        assert!(!deep_equal(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
        assert!(!deep_equal(&json!([1, 2]), &json!([2, 1])));
    }
}
