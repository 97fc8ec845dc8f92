//! Scalar values and open records.
//!
//! `Value` is the language-level scalar held by records and filters. The
//! execution layer speaks `sea_query::Value`, where a SQL NULL is a typed `None`
//! and therefore distinct from a parameter that is absent from the map.

use crate::error::ScaffoldError;
use sea_query::Value as SqlValue;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Scalar value of a record field or filter parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Integer view of the value, if it holds an integral number
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Convert a JSON scalar into a `Value`
///
/// # Errors
///
/// Returns `ScaffoldError::TypeConversion` for arrays and objects, which have no
/// scalar representation.
pub fn from_json(field: &str, value: &serde_json::Value) -> Result<Value, ScaffoldError> {
    match value {
        serde_json::Value::Null => Ok(Value::Null),
        serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Value::Float(f))
            } else {
                Err(ScaffoldError::TypeConversion(format!(
                    "field {field}: number {n} is not representable"
                )))
            }
        }
        serde_json::Value::String(s) => Ok(Value::Text(s.clone())),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
            Err(ScaffoldError::TypeConversion(format!(
                "field {field}: nested arrays and objects are not scalar values"
            )))
        }
    }
}

/// The SQL NULL marker bound for absent or null parameters
#[must_use]
pub fn sql_null() -> SqlValue {
    SqlValue::String(None)
}

/// Convert a language-level value into an execution-layer parameter value
///
/// `Value::Null` becomes the explicit SQL NULL marker.
#[must_use]
pub fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => sql_null(),
        Value::Bool(b) => SqlValue::from(*b),
        Value::Int(i) => SqlValue::from(*i),
        Value::Float(f) => SqlValue::from(*f),
        Value::Text(s) => SqlValue::from(s.clone()),
    }
}

/// Convert an execution-layer value back into a language-level value
///
/// Every typed `None` maps to `Value::Null`. Date/time, UUID, decimal and JSON
/// values are rendered as text.
///
/// # Errors
///
/// Returns `ScaffoldError::TypeConversion` for value kinds with no scalar mapping.
pub fn from_sql_value(value: &SqlValue) -> Result<Value, ScaffoldError> {
    let converted = match value {
        SqlValue::Bool(v) => v.map_or(Value::Null, Value::Bool),
        SqlValue::TinyInt(v) => v.map_or(Value::Null, |i| Value::Int(i64::from(i))),
        SqlValue::SmallInt(v) => v.map_or(Value::Null, |i| Value::Int(i64::from(i))),
        SqlValue::Int(v) => v.map_or(Value::Null, |i| Value::Int(i64::from(i))),
        SqlValue::BigInt(v) => v.map_or(Value::Null, Value::Int),
        SqlValue::TinyUnsigned(v) => v.map_or(Value::Null, |u| Value::Int(i64::from(u))),
        SqlValue::SmallUnsigned(v) => v.map_or(Value::Null, |u| Value::Int(i64::from(u))),
        SqlValue::Unsigned(v) => v.map_or(Value::Null, |u| Value::Int(i64::from(u))),
        SqlValue::BigUnsigned(v) => match v {
            None => Value::Null,
            Some(u) => Value::Int(i64::try_from(*u).map_err(|_| {
                ScaffoldError::TypeConversion(format!(
                    "unsigned value {u} exceeds i64::MAX ({})",
                    i64::MAX
                ))
            })?),
        },
        SqlValue::Float(v) => v.map_or(Value::Null, |f| Value::Float(f64::from(f))),
        SqlValue::Double(v) => v.map_or(Value::Null, Value::Float),
        SqlValue::String(v) => v
            .as_ref()
            .map_or(Value::Null, |s| Value::Text(s.to_string())),
        SqlValue::Char(v) => v.map_or(Value::Null, |c| Value::Text(c.to_string())),
        SqlValue::Bytes(v) => v
            .as_ref()
            .map_or(Value::Null, |b| Value::Text(String::from_utf8_lossy(b).into_owned())),
        SqlValue::Json(v) => v
            .as_ref()
            .map_or(Value::Null, |j| Value::Text(j.to_string())),
        SqlValue::ChronoDate(v) => v.as_ref().map_or(Value::Null, |d| Value::Text(d.to_string())),
        SqlValue::ChronoTime(v) => v.as_ref().map_or(Value::Null, |t| Value::Text(t.to_string())),
        SqlValue::ChronoDateTime(v) => v
            .as_ref()
            .map_or(Value::Null, |dt| Value::Text(dt.to_string())),
        SqlValue::ChronoDateTimeUtc(v) => v
            .as_ref()
            .map_or(Value::Null, |dt| Value::Text(dt.to_rfc3339())),
        SqlValue::Uuid(v) => v.as_ref().map_or(Value::Null, |u| Value::Text(u.to_string())),
        SqlValue::Decimal(v) => v.as_ref().map_or(Value::Null, |d| Value::Text(d.to_string())),
        other => {
            return Err(ScaffoldError::TypeConversion(format!(
                "unsupported result value: {other:?}"
            )))
        }
    };
    Ok(converted)
}

/// Open, dynamically-keyed result object
///
/// Keys keep insertion order, which for mapped rows is the table's column
/// declaration order. Inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((key, value)),
        }
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Render as a JSON object, keeping key order
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .fields
            .iter()
            .map(|(k, v)| {
                let json = match v {
                    Value::Null => serde_json::Value::Null,
                    Value::Bool(b) => serde_json::Value::Bool(*b),
                    Value::Int(i) => serde_json::Value::from(*i),
                    Value::Float(f) => serde_json::Value::from(*f),
                    Value::Text(s) => serde_json::Value::String(s.clone()),
                };
                (k.clone(), json)
            })
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
