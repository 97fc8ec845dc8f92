//! `Database` adapter over `rusqlite`.
//!
//! SQLite understands `@name` placeholders natively, so statements are prepared
//! as rendered and each named parameter is bound from the map by name.

use super::{bound, Database, DbError, Row};
use crate::query::{Params, Statement};
use crate::value::{from_sql_value, sql_null, Value};
use rusqlite::types::Value as SqliteValue;
use rusqlite::{params_from_iter, Connection};
use sea_query::Value as SqlValue;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// SQLite-backed `Database`
///
/// The connection sits behind a mutex so one instance can be shared between
/// threads (for example in an `Arc`).
pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    #[must_use]
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Open (or create) a database file
    ///
    /// # Errors
    ///
    /// Returns `DbError::Sqlite` if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        Ok(Self::new(Connection::open(path)?))
    }

    /// Open a private in-memory database
    ///
    /// # Errors
    ///
    /// Returns `DbError::Sqlite` if SQLite cannot allocate the database.
    pub fn open_in_memory() -> Result<Self, DbError> {
        Ok(Self::new(Connection::open_in_memory()?))
    }

    /// Run unparameterized SQL, e.g. schema setup
    ///
    /// # Errors
    ///
    /// Returns `DbError::Sqlite` if any statement fails.
    pub fn execute_batch(&self, sql: &str) -> Result<(), DbError> {
        self.lock()?.execute_batch(sql)?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        self.conn
            .lock()
            .map_err(|_| DbError::Other("SQLite connection mutex poisoned".to_string()))
    }

    fn query(&self, statement: &Statement, params: &Params) -> Result<Vec<Row>, DbError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&statement.sql)?;

        let mut values = Vec::with_capacity(stmt.parameter_count());
        for index in 1..=stmt.parameter_count() {
            let name = stmt.parameter_name(index).ok_or_else(|| {
                DbError::QueryError(format!("positional parameter ?{index} cannot be bound by name"))
            })?;
            values.push(to_sqlite(bound(params, name)?)?);
        }

        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query(params_from_iter(values))?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut columns = Vec::with_capacity(names.len());
            for (index, name) in names.iter().enumerate() {
                let value: SqliteValue = row.get(index)?;
                columns.push((name.clone(), from_sqlite(value)));
            }
            result.push(Row::new(columns));
        }
        Ok(result)
    }
}

impl Database for SqliteDatabase {
    fn fetch(&self, statement: &Statement, params: &Params) -> Result<Vec<Row>, DbError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::execute_query_span(&statement.sql).entered();

        let start = Instant::now();
        let result = self.query(statement, params).map_err(|e| {
            #[cfg(feature = "metrics")]
            METRICS.record_query_error();
            e
        });

        let duration = start.elapsed();
        #[cfg(feature = "metrics")]
        METRICS.record_query_duration(duration);
        log::trace!("sqlite query finished in {duration:?}: {}", statement.sql);

        result
    }
}

fn to_sqlite(value: &SqlValue) -> Result<SqliteValue, DbError> {
    let value = from_sql_value(value).map_err(|e| DbError::ParseError(e.to_string()))?;
    Ok(match value {
        Value::Null => SqliteValue::Null,
        Value::Bool(b) => SqliteValue::Integer(i64::from(b)),
        Value::Int(i) => SqliteValue::Integer(i),
        Value::Float(f) => SqliteValue::Real(f),
        Value::Text(s) => SqliteValue::Text(s),
    })
}

fn from_sqlite(value: SqliteValue) -> SqlValue {
    match value {
        SqliteValue::Null => sql_null(),
        SqliteValue::Integer(i) => SqlValue::from(i),
        SqliteValue::Real(f) => SqlValue::from(f),
        SqliteValue::Text(s) => SqlValue::from(s),
        SqliteValue::Blob(b) => SqlValue::from(b),
    }
}
