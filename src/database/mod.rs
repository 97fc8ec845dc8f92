//! `Database` collaborator abstraction.
//!
//! The repository never talks to a driver directly. It hands a rendered
//! [`Statement`] and an `@name`-keyed parameter map to a [`Database`], which
//! executes it and returns rows of execution-layer values. Connection
//! management, pooling and transactions stay behind this trait.

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use crate::error::ScaffoldError;
use crate::query::{Params, Statement};
use crate::value::Record;
use sea_query::Value as SqlValue;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "postgres")]
pub use self::postgres::PostgresDatabase;
#[cfg(feature = "sqlite")]
pub use self::sqlite::SqliteDatabase;

/// Database collaborator error type
#[derive(Debug)]
pub enum DbError {
    /// SQLite error from `rusqlite`
    #[cfg(feature = "sqlite")]
    Sqlite(rusqlite::Error),
    /// `PostgreSQL` error from `may_postgres`
    #[cfg(feature = "postgres")]
    Postgres(may_postgres::Error),
    /// Query execution error
    QueryError(String),
    /// Row parsing/conversion error
    ParseError(String),
    /// Other execution errors
    Other(String),
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "sqlite")]
            DbError::Sqlite(e) => {
                write!(f, "SQLite error: {e}")
            }
            #[cfg(feature = "postgres")]
            DbError::Postgres(e) => {
                write!(f, "PostgreSQL error: {e}")
            }
            DbError::QueryError(s) => {
                write!(f, "Query error: {s}")
            }
            DbError::ParseError(s) => {
                write!(f, "Parse error: {s}")
            }
            DbError::Other(s) => {
                write!(f, "Execution error: {s}")
            }
        }
    }
}

impl std::error::Error for DbError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            #[cfg(feature = "sqlite")]
            DbError::Sqlite(e) => Some(e),
            #[cfg(feature = "postgres")]
            DbError::Postgres(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        DbError::Sqlite(err)
    }
}

#[cfg(feature = "postgres")]
impl From<may_postgres::Error> for DbError {
    fn from(err: may_postgres::Error) -> Self {
        DbError::Postgres(err)
    }
}

/// One result row: column names paired with execution-layer values, in result order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    #[must_use]
    pub fn new(columns: Vec<(String, SqlValue)>) -> Self {
        Self { columns }
    }

    /// Value of the named column
    ///
    /// Exact matches win; otherwise the first column equal ignoring ASCII case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .or_else(|| self.columns.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)))
            .map(|(_, v)| v)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    /// First value of the row, used for scalar results
    #[must_use]
    pub fn first(&self) -> Option<&SqlValue> {
        self.columns.first().map(|(_, v)| v)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Projects one result row into a record
pub type RowMapper<'a> = &'a dyn Fn(&Row) -> Result<Record, ScaffoldError>;

/// Executes rendered statements
///
/// Implementors bind the statement's `@name` parameters from `params`, whose keys
/// carry the same prefix. A key missing from `params` is an error; keys the
/// statement does not expect are ignored.
pub trait Database {
    /// Execute and return every result row
    ///
    /// # Errors
    ///
    /// Returns `DbError` if binding or execution fails.
    fn fetch(&self, statement: &Statement, params: &Params) -> Result<Vec<Row>, DbError>;

    /// Execute a query expected to yield one scalar value
    ///
    /// # Errors
    ///
    /// Returns `DbError` if execution fails or no value is returned.
    fn fetch_scalar(&self, statement: &Statement, params: &Params) -> Result<SqlValue, DbError> {
        let rows = self.fetch(statement, params)?;
        rows.first()
            .and_then(Row::first)
            .cloned()
            .ok_or_else(|| DbError::QueryError("scalar query returned no value".to_string()))
    }

    /// Execute and map every row, materializing the results
    ///
    /// # Errors
    ///
    /// Returns `ScaffoldError::ExecutionFailure` wrapping the collaborator's error,
    /// or whatever the mapper fails with.
    fn execute(
        &self,
        statement: &Statement,
        mapper: RowMapper<'_>,
        params: &Params,
    ) -> Result<Vec<Record>, ScaffoldError> {
        let rows = self.fetch(statement, params)?;
        rows.iter().map(mapper).collect()
    }

    /// Execute a scalar query
    ///
    /// # Errors
    ///
    /// Returns `ScaffoldError::ExecutionFailure` wrapping the collaborator's error.
    fn execute_scalar(
        &self,
        statement: &Statement,
        params: &Params,
    ) -> Result<SqlValue, ScaffoldError> {
        Ok(self.fetch_scalar(statement, params)?)
    }
}

impl<D: Database + ?Sized> Database for &D {
    fn fetch(&self, statement: &Statement, params: &Params) -> Result<Vec<Row>, DbError> {
        (**self).fetch(statement, params)
    }

    fn fetch_scalar(&self, statement: &Statement, params: &Params) -> Result<SqlValue, DbError> {
        (**self).fetch_scalar(statement, params)
    }
}

impl<D: Database + ?Sized> Database for Arc<D> {
    fn fetch(&self, statement: &Statement, params: &Params) -> Result<Vec<Row>, DbError> {
        (**self).fetch(statement, params)
    }

    fn fetch_scalar(&self, statement: &Statement, params: &Params) -> Result<SqlValue, DbError> {
        (**self).fetch_scalar(statement, params)
    }
}

/// Look up the value bound to placeholder `name`
///
/// # Errors
///
/// Returns `DbError::QueryError` if the caller did not supply it.
#[cfg(any(feature = "sqlite", feature = "postgres"))]
pub(crate) fn bound<'p>(params: &'p Params, name: &str) -> Result<&'p SqlValue, DbError> {
    params
        .get(name)
        .ok_or_else(|| DbError::QueryError(format!("missing value for parameter {name}")))
}
