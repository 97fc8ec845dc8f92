//! Metadata-driven query generation.
//!
//! A [`QueryBuilder`] turns an operation, table metadata and an optional filter
//! or parameter map into a [`Statement`]: SQL text with `@name` placeholders plus
//! the list of placeholder names the caller is expected to bind. The builder is
//! pure; it performs no I/O and never sees bound values other than through the
//! filter it is handed.

pub mod predicate;
pub mod projection;
pub mod sql;

use crate::error::ScaffoldError;
use crate::filter::Filter;
use crate::meta::Table;
use sea_query::Value as SqlValue;
use std::collections::BTreeMap;

pub use sql::{Dialect, SqlQueryBuilder};

/// Marker character prefixed to every bound parameter name
pub const PARAM_PREFIX: char = '@';

/// Parameter map: name to execution-layer value
///
/// A SQL NULL is an explicit typed `None` value; an absent key means the
/// parameter was never supplied.
pub type Params = BTreeMap<String, SqlValue>;

/// Placeholder name for a field or filter parameter
#[must_use]
pub fn param_name(key: &str) -> String {
    format!("{PARAM_PREFIX}{key}")
}

/// Re-key a parameter map with placeholder names, ready for the database
#[must_use]
pub fn bind(params: &Params) -> Params {
    params
        .iter()
        .map(|(k, v)| {
            let name = if k.starts_with(PARAM_PREFIX) {
                k.clone()
            } else {
                param_name(k)
            };
            (name, v.clone())
        })
        .collect()
}

/// Operations a query builder can render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl QueryKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Select => "select",
            QueryKind::Insert => "insert",
            QueryKind::Update => "update",
            QueryKind::Delete => "delete",
        }
    }
}

/// Rendered query: SQL text plus the placeholder names it expects, in first-use order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub parameters: Vec<String>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, parameters: Vec<String>) -> Self {
        Self {
            sql: sql.into(),
            parameters,
        }
    }

    /// Whether the statement expects `name` (with or without the prefix)
    #[must_use]
    pub fn expects(&self, name: &str) -> bool {
        let name = name.strip_prefix(PARAM_PREFIX).unwrap_or(name);
        self.parameters
            .iter()
            .any(|p| p.strip_prefix(PARAM_PREFIX) == Some(name))
    }
}

/// Renders parameterized SQL from table metadata
pub trait QueryBuilder {
    /// Render one of the four CRUD operations
    ///
    /// `filter` shapes `Select` (predicates, paging, sort, detail mode). `params`
    /// tells `Update` which columns are being set.
    ///
    /// # Errors
    ///
    /// Returns `ScaffoldError::InvalidMetadata` when the table lacks a primary key
    /// for `Update`/`Delete`, and `ScaffoldError::UnknownParameter` when a filter or
    /// update parameter matches no column or recognized predicate.
    fn build(
        &self,
        kind: QueryKind,
        table: &Table,
        filter: Option<&Filter>,
        params: Option<&Params>,
    ) -> Result<Statement, ScaffoldError>;

    /// Render a single-integer row count using the filter's predicates only
    ///
    /// # Errors
    ///
    /// Returns `ScaffoldError::UnknownParameter` for unrecognized filter parameters.
    fn build_record_count_query(
        &self,
        table: &Table,
        filter: &Filter,
    ) -> Result<Statement, ScaffoldError>;
}

impl<B: QueryBuilder + ?Sized> QueryBuilder for &B {
    fn build(
        &self,
        kind: QueryKind,
        table: &Table,
        filter: Option<&Filter>,
        params: Option<&Params>,
    ) -> Result<Statement, ScaffoldError> {
        (**self).build(kind, table, filter, params)
    }

    fn build_record_count_query(
        &self,
        table: &Table,
        filter: &Filter,
    ) -> Result<Statement, ScaffoldError> {
        (**self).build_record_count_query(table, filter)
    }
}
