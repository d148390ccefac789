//! The `Record` data model.
//!
//! A `Record` is a flat mapping from attribute name to [`Value`]. Callers
//! hand the engine a sequence of possibly-nested records; [`Record::flatten`]
//! is applied once on ingest so every downstream component (rules,
//! comparators, encoders) only ever sees flat string-keyed maps.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A single attribute value. Nested mappings are flattened away before any
/// component but [`Record::flatten`] itself ever sees a `Value::Map`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Number(f64),
    Map(BTreeMap<String, Value>),
    Null,
}

impl Value {
    /// Renders the value the way a comparator or encoder expects to receive
    /// it: as a string. Missing/null values coerce to the empty string.
    pub fn as_comparable_str(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            Value::Null => String::new(),
            Value::Map(_) => String::new(),
        }
    }

}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<JsonValue> for Value {
    fn from(v: JsonValue) -> Self {
        match v {
            JsonValue::String(s) => Value::String(s),
            JsonValue::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            JsonValue::Bool(b) => Value::String(b.to_string()),
            JsonValue::Null => Value::Null,
            JsonValue::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
            JsonValue::Array(items) => {
                let joined = items
                    .into_iter()
                    .map(|v| Value::from(v).as_comparable_str())
                    .collect::<Vec<_>>()
                    .join(",");
                Value::String(joined)
            }
        }
    }
}

/// A single input record: an unordered, possibly-nested bag of attributes.
///
/// `Record`'s identity in the engine is purely positional -- the `MentionId`
/// is the record's index in the input sequence, never stored on the value
/// itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    attributes: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(attributes: BTreeMap<String, Value>) -> Self {
        Record { attributes }
    }

    /// Flattens nested [`Value::Map`] attributes using `separator` (the
    /// engine default is `"."`), e.g. `{addr: {city: X}}` becomes
    /// `addr.city = X`.
    pub fn flatten(&self, separator: &str) -> Record {
        let mut flat = BTreeMap::new();
        flatten_into(&mut flat, "", &self.attributes, separator);
        Record { attributes: flat }
    }

    /// Returns the attribute's comparable string form, or the empty string
    /// if the attribute is missing -- per the spec, missing attributes
    /// coerce to empty strings rather than propagating an error.
    pub fn get_str(&self, attr: &str) -> String {
        self.attributes
            .get(attr)
            .map(Value::as_comparable_str)
            .unwrap_or_default()
    }

    pub fn get(&self, attr: &str) -> Option<&Value> {
        self.attributes.get(attr)
    }

    pub fn contains(&self, attr: &str) -> bool {
        self.attributes.contains_key(attr)
    }

    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }
}

fn flatten_into(
    out: &mut BTreeMap<String, Value>,
    prefix: &str,
    attributes: &BTreeMap<String, Value>,
    separator: &str,
) {
    for (key, value) in attributes {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}{separator}{key}")
        };
        match value {
            Value::Map(nested) => flatten_into(out, &full_key, nested, separator),
            other => {
                out.insert(full_key, other.clone());
            }
        }
    }
}

/// Flattens an entire batch of records. Kept as a free function (rather than
/// a method on a collection type) so callers can apply it lazily over an
/// iterator without collecting twice.
pub fn flatten_records(records: &[Record], separator: &str) -> Vec<Record> {
    records.iter().map(|r| r.flatten(separator)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(pairs: &[(&str, Value)]) -> Record {
        Record::new(pairs.iter().cloned().map(|(k, v)| (k.to_string(), v)).collect())
    }

    #[test]
    fn flattens_one_level_of_nesting() {
        let nested = rec(&[(
            "addr",
            Value::Map(BTreeMap::from([("city".to_string(), Value::from("Springfield"))])),
        )]);
        let flat = nested.flatten(".");
        assert_eq!(flat.get_str("addr.city"), "Springfield");
        assert!(!flat.contains("addr"));
    }

    #[test]
    fn missing_attribute_coerces_to_empty_string() {
        let r = rec(&[("n", Value::from("a"))]);
        assert_eq!(r.get_str("missing"), "");
    }

    #[test]
    fn number_value_renders_without_decimal_when_integral() {
        let r = rec(&[("age", Value::from(42.0))]);
        assert_eq!(r.get_str("age"), "42");
    }

    #[test]
    fn flatten_is_idempotent_on_already_flat_records() {
        let r = rec(&[("n", Value::from("a")), ("m", Value::from("b"))]);
        let flat = r.flatten(".");
        assert_eq!(flat, r);
    }
}
