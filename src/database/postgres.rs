//! `Database` adapter over `may_postgres`.
//!
//! `PostgreSQL` only understands positional `$n` placeholders, so `@name`
//! placeholders are rewritten before preparing. Preparing first tells us the
//! server-side type of every parameter; each bound value is converted to that
//! type, which keeps NULLs typed and integer widths correct.

use super::{bound, Database, DbError, Row};
use crate::query::{Params, Statement};
use crate::value::{from_sql_value, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use may_postgres::types::{FromSql, ToSql, Type};
use may_postgres::Client;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use sea_query::Value as SqlValue;
use std::str::FromStr;
use std::time::Instant;
use uuid::Uuid;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@([A-Za-z_][A-Za-z0-9_]*)").expect("placeholder pattern is valid"));

/// Rewrite `@name` placeholders to `$n`, returning the names in position order
///
/// A name used more than once keeps its first position.
#[must_use]
pub fn to_positional(sql: &str) -> (String, Vec<String>) {
    let mut names: Vec<String> = Vec::new();
    let rewritten = PLACEHOLDER.replace_all(sql, |caps: &regex::Captures<'_>| {
        let name = caps[0].to_string();
        let position = match names.iter().position(|n| *n == name) {
            Some(i) => i + 1,
            None => {
                names.push(name);
                names.len()
            }
        };
        format!("${position}")
    });
    (rewritten.into_owned(), names)
}

/// PostgreSQL-backed `Database`
pub struct PostgresDatabase {
    client: Client,
}

impl PostgresDatabase {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect with a libpq-style or URL connection string
    ///
    /// # Errors
    ///
    /// Returns `DbError::Postgres` if the connection cannot be established.
    pub fn connect(connection_string: &str) -> Result<Self, DbError> {
        if connection_string.is_empty() {
            return Err(DbError::Other("connection string is empty".to_string()));
        }
        Ok(Self::new(may_postgres::connect(connection_string)?))
    }

    fn query(&self, statement: &Statement, params: &Params) -> Result<Vec<Row>, DbError> {
        let (sql, names) = to_positional(&statement.sql);
        let prepared = self.client.prepare(&sql)?;

        let mut converted: Vec<Box<dyn ToSql>> = Vec::with_capacity(names.len());
        for (name, ty) in names.iter().zip(prepared.params()) {
            converted.push(to_postgres(name, bound(params, name)?, ty)?);
        }
        let refs: Vec<&dyn ToSql> = converted.iter().map(AsRef::as_ref).collect();

        let rows = self.client.query(&prepared, &refs)?;
        rows.iter().map(read_row).collect()
    }
}

impl Database for PostgresDatabase {
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
        log::trace!("postgres query finished in {duration:?}: {}", statement.sql);

        result
    }
}

fn conversion_error(name: &str, value: &str, ty: &Type, reason: impl std::fmt::Display) -> DbError {
    DbError::ParseError(format!("parameter {name}: cannot bind {value:?} as {ty}: {reason}"))
}

fn typed_null(ty: &Type) -> Box<dyn ToSql> {
    match *ty {
        Type::BOOL => Box::new(None::<bool>),
        Type::INT2 => Box::new(None::<i16>),
        Type::INT4 => Box::new(None::<i32>),
        Type::INT8 => Box::new(None::<i64>),
        Type::FLOAT4 => Box::new(None::<f32>),
        Type::FLOAT8 => Box::new(None::<f64>),
        Type::NUMERIC => Box::new(None::<Decimal>),
        Type::UUID => Box::new(None::<Uuid>),
        Type::DATE => Box::new(None::<NaiveDate>),
        Type::TIME => Box::new(None::<NaiveTime>),
        Type::TIMESTAMP => Box::new(None::<NaiveDateTime>),
        Type::TIMESTAMPTZ => Box::new(None::<DateTime<Utc>>),
        Type::JSON | Type::JSONB => Box::new(None::<serde_json::Value>),
        Type::BYTEA => Box::new(None::<Vec<u8>>),
        _ => Box::new(None::<String>),
    }
}

fn int_param(name: &str, i: i64, ty: &Type) -> Result<Box<dyn ToSql>, DbError> {
    let fail = |e: std::num::TryFromIntError| conversion_error(name, &i.to_string(), ty, e);
    Ok(match *ty {
        Type::INT2 => Box::new(i16::try_from(i).map_err(fail)?),
        Type::INT4 => Box::new(i32::try_from(i).map_err(fail)?),
        Type::FLOAT4 => Box::new(i as f32),
        Type::FLOAT8 => Box::new(i as f64),
        Type::NUMERIC => Box::new(Decimal::from(i)),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR => Box::new(i.to_string()),
        _ => Box::new(i),
    })
}

fn bool_param(b: bool, ty: &Type) -> Box<dyn ToSql> {
    match *ty {
        Type::INT2 => Box::new(i16::from(b)),
        Type::INT4 => Box::new(i32::from(b)),
        Type::INT8 => Box::new(i64::from(b)),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR => Box::new(b.to_string()),
        _ => Box::new(b),
    }
}

fn float_param(name: &str, f: f64, ty: &Type) -> Result<Box<dyn ToSql>, DbError> {
    Ok(match *ty {
        Type::FLOAT4 => Box::new(f as f32),
        Type::NUMERIC => Box::new(
            Decimal::try_from(f).map_err(|e| conversion_error(name, &f.to_string(), ty, e))?,
        ),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR => Box::new(f.to_string()),
        _ => Box::new(f),
    })
}

fn text_param(name: &str, s: String, ty: &Type) -> Result<Box<dyn ToSql>, DbError> {
    fn parsed<T, E>(name: &str, s: &str, ty: &Type, r: Result<T, E>) -> Result<T, DbError>
    where
        E: std::fmt::Display,
    {
        r.map_err(|e| conversion_error(name, s, ty, e))
    }

    Ok(match *ty {
        Type::BOOL => Box::new(parsed(name, &s, ty, bool::from_str(&s))?),
        Type::INT2 => Box::new(parsed(name, &s, ty, s.parse::<i16>())?),
        Type::INT4 => Box::new(parsed(name, &s, ty, s.parse::<i32>())?),
        Type::INT8 => Box::new(parsed(name, &s, ty, s.parse::<i64>())?),
        Type::FLOAT4 => Box::new(parsed(name, &s, ty, s.parse::<f32>())?),
        Type::FLOAT8 => Box::new(parsed(name, &s, ty, s.parse::<f64>())?),
        Type::NUMERIC => Box::new(parsed(name, &s, ty, Decimal::from_str(&s))?),
        Type::UUID => Box::new(parsed(name, &s, ty, Uuid::parse_str(&s))?),
        Type::DATE => Box::new(parsed(name, &s, ty, NaiveDate::from_str(&s))?),
        Type::TIME => Box::new(parsed(name, &s, ty, NaiveTime::from_str(&s))?),
        Type::TIMESTAMP => Box::new(parsed(name, &s, ty, NaiveDateTime::from_str(&s))?),
        Type::TIMESTAMPTZ => Box::new(
            parsed(name, &s, ty, DateTime::parse_from_rfc3339(&s))?.with_timezone(&Utc),
        ),
        Type::JSON | Type::JSONB => {
            Box::new(parsed(name, &s, ty, serde_json::from_str::<serde_json::Value>(&s))?)
        }
        _ => Box::new(s),
    })
}

/// Convert one bound value to the parameter type the server declared
fn to_postgres(name: &str, value: &SqlValue, ty: &Type) -> Result<Box<dyn ToSql>, DbError> {
    let value = from_sql_value(value).map_err(|e| DbError::ParseError(e.to_string()))?;
    match value {
        Value::Null => Ok(typed_null(ty)),
        Value::Bool(b) => Ok(bool_param(b, ty)),
        Value::Int(i) => int_param(name, i, ty),
        Value::Float(f) => float_param(name, f, ty),
        Value::Text(s) => text_param(name, s, ty),
    }
}

fn read<T>(row: &may_postgres::Row, index: usize, null: SqlValue) -> Result<SqlValue, DbError>
where
    T: for<'a> FromSql<'a>,
    SqlValue: From<T>,
{
    Ok(row
        .try_get::<_, Option<T>>(index)?
        .map_or(null, SqlValue::from))
}

fn read_row(row: &may_postgres::Row) -> Result<Row, DbError> {
    let mut columns = Vec::with_capacity(row.len());
    for (index, column) in row.columns().iter().enumerate() {
        let value = match *column.type_() {
            Type::BOOL => read::<bool>(row, index, SqlValue::Bool(None))?,
            Type::INT2 => read::<i16>(row, index, SqlValue::SmallInt(None))?,
            Type::INT4 => read::<i32>(row, index, SqlValue::Int(None))?,
            Type::INT8 => read::<i64>(row, index, SqlValue::BigInt(None))?,
            Type::FLOAT4 => read::<f32>(row, index, SqlValue::Float(None))?,
            Type::FLOAT8 => read::<f64>(row, index, SqlValue::Double(None))?,
            Type::NUMERIC => read::<Decimal>(row, index, SqlValue::Decimal(None))?,
            Type::UUID => read::<Uuid>(row, index, SqlValue::Uuid(None))?,
            Type::DATE => read::<NaiveDate>(row, index, SqlValue::ChronoDate(None))?,
            Type::TIME => read::<NaiveTime>(row, index, SqlValue::ChronoTime(None))?,
            Type::TIMESTAMP => read::<NaiveDateTime>(row, index, SqlValue::ChronoDateTime(None))?,
            Type::TIMESTAMPTZ => {
                read::<DateTime<Utc>>(row, index, SqlValue::ChronoDateTimeUtc(None))?
            }
            Type::JSON | Type::JSONB => read::<serde_json::Value>(row, index, SqlValue::Json(None))?,
            Type::BYTEA => read::<Vec<u8>>(row, index, SqlValue::Bytes(None))?,
            _ => read::<String>(row, index, SqlValue::String(None))?,
        };
        columns.push((column.name().to_string(), value));
    }
    Ok(Row::new(columns))
}
