//! Field enumeration for repository inputs.
//!
//! Write operations accept any input that can list its fields as name/value
//! pairs. Dynamically shaped callers (JSON objects, maps, records) implement it
//! natively; strongly typed callers go through serde with [`Serialized`].

use crate::error::ScaffoldError;
use crate::meta::Column;
use crate::query::Params;
use crate::value::{self, sql_null, to_sql_value, Record, Value};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Enumerates an input object's fields
pub trait Fields {
    /// Field names and scalar values
    ///
    /// # Errors
    ///
    /// Returns `ScaffoldError::TypeConversion` if a field has no scalar
    /// representation, or the input is not object-shaped.
    fn fields(&self) -> Result<Vec<(String, Value)>, ScaffoldError>;
}

impl<F: Fields + ?Sized> Fields for &F {
    fn fields(&self) -> Result<Vec<(String, Value)>, ScaffoldError> {
        (**self).fields()
    }
}

impl Fields for Record {
    fn fields(&self) -> Result<Vec<(String, Value)>, ScaffoldError> {
        Ok(self.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
    }
}

impl Fields for BTreeMap<String, Value> {
    fn fields(&self) -> Result<Vec<(String, Value)>, ScaffoldError> {
        Ok(self.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}

impl Fields for HashMap<String, Value> {
    fn fields(&self) -> Result<Vec<(String, Value)>, ScaffoldError> {
        Ok(self.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}

impl Fields for serde_json::Map<String, serde_json::Value> {
    fn fields(&self) -> Result<Vec<(String, Value)>, ScaffoldError> {
        self.iter()
            .map(|(k, v)| Ok((k.clone(), value::from_json(k, v)?)))
            .collect()
    }
}

impl Fields for serde_json::Value {
    fn fields(&self) -> Result<Vec<(String, Value)>, ScaffoldError> {
        match self {
            serde_json::Value::Object(map) => map.fields(),
            other => Err(ScaffoldError::TypeConversion(format!(
                "expected a JSON object with named fields, got {other}"
            ))),
        }
    }
}

/// Adapter enumerating the serialized fields of any `Serialize` struct
///
/// ```
/// use scaffolder::{Fields, Serialized};
///
/// #[derive(serde::Serialize)]
/// struct NewUser {
///     login: String,
///     manager_id: Option<i64>,
/// }
///
/// let user = NewUser { login: "alice".into(), manager_id: None };
/// let fields = Serialized(&user).fields().unwrap();
/// assert_eq!(fields.len(), 2);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Serialized<'a, T: ?Sized>(pub &'a T);

impl<T: Serialize + ?Sized> Fields for Serialized<'_, T> {
    fn fields(&self) -> Result<Vec<(String, Value)>, ScaffoldError> {
        let json = serde_json::to_value(self.0)
            .map_err(|e| ScaffoldError::TypeConversion(format!("failed to serialize input: {e}")))?;
        json.fields()
    }
}

/// Build a bindable parameter map from an input object
///
/// Every input field is kept with nulls normalized to the SQL NULL marker. With
/// a restricting column set, each column missing from the input (compared
/// ignoring ASCII case) is added as an explicit NULL.
///
/// # Errors
///
/// Propagates field enumeration failures.
pub fn derive_parameters(
    input: &dyn Fields,
    restrict: Option<&[&Column]>,
) -> Result<Params, ScaffoldError> {
    let mut params: Params = input
        .fields()?
        .into_iter()
        .map(|(name, value)| (name, to_sql_value(&value)))
        .collect();

    if let Some(columns) = restrict {
        for column in columns {
            if !params.keys().any(|k| k.eq_ignore_ascii_case(&column.name)) {
                params.insert(column.name.clone(), sql_null());
            }
        }
    }

    Ok(params)
}
