//! Filter parameter resolution.
//!
//! A parameter named exactly like a column is an equality test (or `IS NULL`
//! for a null value). Otherwise a recognized suffix selects a range or pattern
//! comparison against the column named by the rest of the key.

use crate::error::ScaffoldError;
use crate::meta::{Column, Table};
use crate::value::Value;

/// Comparison applied by a resolved predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    IsNull,
    Gte,
    Lte,
    Like,
}

const SUFFIXES: [(&str, Comparison); 3] = [
    ("_from", Comparison::Gte),
    ("_to", Comparison::Lte),
    ("_like", Comparison::Like),
];

/// Filter parameter bound to a column
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate<'a> {
    pub column: &'a Column,
    pub comparison: Comparison,
    /// Parameter key, without the placeholder prefix
    pub parameter: &'a str,
}

impl Predicate<'_> {
    /// Whether the predicate consumes a bound parameter
    #[must_use]
    pub fn binds(&self) -> bool {
        self.comparison != Comparison::IsNull
    }
}

/// Resolve one filter parameter against the table
///
/// # Errors
///
/// Returns `ScaffoldError::UnknownParameter` if the key matches no column and no
/// `<column>_from`, `<column>_to` or `<column>_like` form.
pub fn resolve<'a>(
    table: &'a Table,
    parameter: &'a str,
    value: &Value,
) -> Result<Predicate<'a>, ScaffoldError> {
    if let Some(column) = table.column(parameter) {
        let comparison = if value.is_null() {
            Comparison::IsNull
        } else {
            Comparison::Eq
        };
        return Ok(Predicate {
            column,
            comparison,
            parameter,
        });
    }

    for (suffix, comparison) in SUFFIXES {
        let Some(column) = parameter
            .strip_suffix(suffix)
            .and_then(|name| table.column(name))
        else {
            continue;
        };
        return Ok(Predicate {
            column,
            comparison,
            parameter,
        });
    }

    Err(ScaffoldError::UnknownParameter(format!(
        "{parameter} is not a column or predicate of table {}",
        table.name
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders() -> Table {
        Table::new(
            "orders",
            vec![
                Column::new("id").key(),
                Column::new("placed"),
                Column::new("placed_to"),
                Column::new("customer"),
            ],
        )
    }

    #[test]
    fn test_exact_column_is_equality() {
        let table = orders();
        let p = resolve(&table, "customer", &Value::from("acme")).unwrap();
        assert_eq!(p.column.name, "customer");
        assert_eq!(p.comparison, Comparison::Eq);
        assert!(p.binds());
    }

    #[test]
    fn test_null_is_is_null() {
        let table = orders();
        let p = resolve(&table, "customer", &Value::Null).unwrap();
        assert_eq!(p.comparison, Comparison::IsNull);
        assert!(!p.binds());
    }

    #[test]
    fn test_range_suffixes() {
        let table = orders();
        let from = resolve(&table, "placed_from", &Value::from("2024-01-01")).unwrap();
        assert_eq!((from.column.name.as_str(), from.comparison), ("placed", Comparison::Gte));
        let like = resolve(&table, "customer_like", &Value::from("ac%")).unwrap();
        assert_eq!(like.comparison, Comparison::Like);
    }

    #[test]
    fn test_exact_column_wins_over_suffix() {
        let table = orders();
        let p = resolve(&table, "placed_to", &Value::from("x")).unwrap();
        assert_eq!(p.column.name, "placed_to");
        assert_eq!(p.comparison, Comparison::Eq);
    }

    #[test]
    fn test_unknown_parameter() {
        let table = orders();
        assert!(matches!(
            resolve(&table, "nickname", &Value::from("x")),
            Err(ScaffoldError::UnknownParameter(_))
        ));
        assert!(resolve(&table, "nickname_from", &Value::from("x")).is_err());
    }
}
