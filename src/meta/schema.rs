//! Schema documents: the set of tables an application scaffolds.
//!
//! A schema is a JSON document of the form
//! `{"tables": [{"name": "users", "columns": [...]}]}`. Loading validates every
//! table and every wired reference, then hands tables out as `Arc<Table>`.

use super::table::Table;
use crate::error::ScaffoldError;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct SchemaDocument {
    tables: Vec<Table>,
}

/// Validated, immutable collection of tables
#[derive(Debug, Clone, Default)]
pub struct Schema {
    tables: Vec<Arc<Table>>,
}

impl Schema {
    /// Build a schema from tables, validating each table and every reference
    ///
    /// # Errors
    ///
    /// Returns `ScaffoldError::InvalidMetadata` if any table is invalid, table
    /// names repeat, or a wired reference points at a missing table or column.
    pub fn new(tables: Vec<Table>) -> Result<Self, ScaffoldError> {
        let schema = Self {
            tables: tables.into_iter().map(Arc::new).collect(),
        };
        schema.validate()?;
        Ok(schema)
    }

    /// Parse and validate a JSON schema document
    ///
    /// # Errors
    ///
    /// Returns `ScaffoldError::InvalidMetadata` for malformed JSON or invalid metadata.
    pub fn from_json(json: &str) -> Result<Self, ScaffoldError> {
        let document: SchemaDocument = serde_json::from_str(json)
            .map_err(|e| ScaffoldError::InvalidMetadata(format!("malformed schema document: {e}")))?;
        Self::new(document.tables)
    }

    /// Read, parse and validate a JSON schema file
    ///
    /// # Errors
    ///
    /// Returns `ScaffoldError::Configuration` if the file cannot be read, and the
    /// errors of [`Schema::from_json`] otherwise.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScaffoldError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ScaffoldError::Configuration(format!("cannot read schema {}: {e}", path.display()))
        })?;
        let schema = Self::from_json(&json)?;
        log::debug!("Loaded {} table(s) from {}", schema.tables.len(), path.display());
        Ok(schema)
    }

    /// Shared handle to a table by name
    #[must_use]
    pub fn table(&self, name: &str) -> Option<Arc<Table>> {
        self.tables.iter().find(|t| t.name == name).cloned()
    }

    pub fn tables(&self) -> impl Iterator<Item = &Arc<Table>> {
        self.tables.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    fn validate(&self) -> Result<(), ScaffoldError> {
        let mut names = HashSet::new();
        for table in &self.tables {
            table.validate()?;
            if !names.insert(table.name.as_str()) {
                return Err(ScaffoldError::InvalidMetadata(format!(
                    "duplicate table {}",
                    table.name
                )));
            }
        }

        // One hop only: the target must exist, its own references are not followed.
        for table in &self.tables {
            for column in &table.columns {
                let Some(reference) = column.wired_reference() else {
                    if column.reference.is_some() {
                        log::warn!(
                            "Reference on {}.{} is incomplete and will be ignored",
                            table.name,
                            column.name
                        );
                    }
                    continue;
                };
                let target = self
                    .tables
                    .iter()
                    .find(|t| t.name == reference.table)
                    .ok_or_else(|| {
                        ScaffoldError::InvalidMetadata(format!(
                            "{}.{} references unknown table {}",
                            table.name, column.name, reference.table
                        ))
                    })?;
                for target_column in [&reference.key_column, &reference.display_column] {
                    if target.column(target_column).is_none() {
                        return Err(ScaffoldError::InvalidMetadata(format!(
                            "{}.{} references unknown column {}.{}",
                            table.name, column.name, reference.table, target_column
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
