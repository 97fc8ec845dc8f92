//! Column metadata and foreign-key references.
//!
//! A `Column` carries the behavioral flags the query builder and repository
//! consult: key membership, auto-increment, read-only, grid visibility, and an
//! optional `Reference` to a display column in another table.

use serde::{Deserialize, Serialize};

/// Foreign-key relationship from a column to a display column of another table
///
/// References are resolved one level deep only, so cyclic schemas (A → B → A)
/// never recurse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    /// Target table name
    pub table: String,
    /// Column in the target table the source column points at
    pub key_column: String,
    /// Column in the target table shown instead of the raw key
    pub display_column: String,
    /// Explicit result name for the display value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl Reference {
    pub fn new(
        table: impl Into<String>,
        key_column: impl Into<String>,
        display_column: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            key_column: key_column.into(),
            display_column: display_column.into(),
            alias: None,
        }
    }

    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Result name of the display value for a reference held by `source_column`
    ///
    /// Uses the explicit alias when set, otherwise the source column name without
    /// a trailing `_id`, joined to the display column: `manager_id` referencing
    /// `users.login` yields `manager_login`.
    #[must_use]
    pub fn column_alias(&self, source_column: &str) -> String {
        if let Some(alias) = &self.alias {
            return alias.clone();
        }
        let stem = source_column
            .strip_suffix("_id")
            .filter(|s| !s.is_empty())
            .unwrap_or(source_column);
        format!("{}_{}", stem, self.display_column)
    }

    /// Whether target table, key column and display column are all configured
    #[must_use]
    pub fn is_wired(&self) -> bool {
        !self.table.is_empty() && !self.key_column.is_empty() && !self.display_column.is_empty()
    }
}

/// Column metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    /// Column name, unique within its table
    pub name: String,
    #[serde(default)]
    pub is_key: bool,
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default)]
    pub show_in_grid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<Reference>,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn key(mut self) -> Self {
        self.is_key = true;
        self
    }

    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    #[must_use]
    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    #[must_use]
    pub fn in_grid(mut self) -> Self {
        self.show_in_grid = true;
        self
    }

    #[must_use]
    pub fn references(mut self, reference: Reference) -> Self {
        self.reference = Some(reference);
        self
    }

    /// The reference, if it is fully configured
    #[must_use]
    pub fn wired_reference(&self) -> Option<&Reference> {
        self.reference.as_ref().filter(|r| r.is_wired())
    }

    /// Result name of this column's reference display value
    #[must_use]
    pub fn reference_alias(&self) -> Option<String> {
        self.wired_reference().map(|r| r.column_alias(&self.name))
    }

    /// Accepts a value on INSERT: neither auto-increment nor read-only
    #[must_use]
    pub fn is_insertable(&self) -> bool {
        !self.auto_increment && !self.readonly
    }

    /// May appear in an UPDATE SET list: not read-only and not a key
    ///
    /// Keys only ever appear in the WHERE clause, so auto-increment keys are never
    /// written; auto-increment columns that are not keys stay updatable.
    #[must_use]
    pub fn is_updatable(&self) -> bool {
        !self.readonly && !self.is_key
    }
}
