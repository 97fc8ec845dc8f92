//! Table metadata.
//!
//! A `Table` is built once from a schema document or by hand, validated, and then
//! shared read-only (usually behind an `Arc`) by every repository bound to it.

use super::column::Column;
use crate::error::ScaffoldError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Names become quoted identifiers and `@name` placeholders, so they are kept to
/// plain identifier characters.
static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

/// Returns true if `name` is usable as a table, column or alias name
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Table definition metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    /// Columns in declaration order
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key columns, in declaration order
    #[must_use]
    pub fn primary_keys(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.is_key).collect()
    }

    /// Look up a column by exact name
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up a column ignoring ASCII case
    #[must_use]
    pub fn column_ignore_case(&self, name: &str) -> Option<&Column> {
        self.column(name)
            .or_else(|| self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name)))
    }

    /// Check the table is usable by the query builder and repository
    ///
    /// # Errors
    ///
    /// Returns `ScaffoldError::InvalidMetadata` if the table has no primary key,
    /// repeats a column name, uses a non-identifier name, or a reference alias
    /// collides with another result name.
    pub fn validate(&self) -> Result<(), ScaffoldError> {
        if !is_identifier(&self.name) {
            return Err(ScaffoldError::InvalidMetadata(format!(
                "table name {:?} is not a valid identifier",
                self.name
            )));
        }
        if self.primary_keys().is_empty() {
            return Err(ScaffoldError::InvalidMetadata(format!(
                "table {} has no primary key column",
                self.name
            )));
        }

        let mut names = HashSet::new();
        for column in &self.columns {
            if !is_identifier(&column.name) {
                return Err(ScaffoldError::InvalidMetadata(format!(
                    "column name {:?} in table {} is not a valid identifier",
                    column.name, self.name
                )));
            }
            if !names.insert(column.name.to_ascii_lowercase()) {
                return Err(ScaffoldError::InvalidMetadata(format!(
                    "duplicate column {} in table {}",
                    column.name, self.name
                )));
            }
        }

        for column in &self.columns {
            let Some(alias) = column.reference_alias() else {
                continue;
            };
            if !is_identifier(&alias) {
                return Err(ScaffoldError::InvalidMetadata(format!(
                    "reference alias {alias:?} of {}.{} is not a valid identifier",
                    self.name, column.name
                )));
            }
            if !names.insert(alias.to_ascii_lowercase()) {
                return Err(ScaffoldError::InvalidMetadata(format!(
                    "reference alias {alias} of {}.{} collides with another column or alias",
                    self.name, column.name
                )));
            }
        }

        Ok(())
    }
}
