//! # Scaffolder
//!
//! Metadata-driven query generation and a generic CRUD repository for
//! table-scaffolding tools.
//!
//! Describe a table once ([`Table`], [`Column`], [`Reference`]), and a
//! [`Repository`] selects, counts, inserts, updates and deletes its rows as open
//! [`Record`]s: no table-specific code. SQL is rendered by a [`QueryBuilder`]
//! and executed by any [`Database`] collaborator; adapters for SQLite (feature
//! `sqlite`) and PostgreSQL over `may_postgres` (feature `postgres`) are included.

pub mod catalog;
pub mod config;
pub mod database;
pub mod error;
pub mod fields;
pub mod filter;
pub mod meta;
pub mod metrics;
pub mod query;
pub mod repository;
pub mod value;

pub use catalog::Catalog;
pub use config::ScaffoldConfig;
pub use database::{Database, DbError, Row, RowMapper};
pub use error::ScaffoldError;
pub use fields::{derive_parameters, Fields, Serialized};
pub use filter::{Filter, Sort, SortOrder};
pub use meta::{Column, Reference, Schema, Table};
pub use query::{Dialect, Params, QueryBuilder, QueryKind, SqlQueryBuilder, Statement};
pub use repository::{DataRepository, Repository};
pub use value::{Record, Value};

#[cfg(feature = "postgres")]
pub use database::PostgresDatabase;
#[cfg(feature = "sqlite")]
pub use database::SqliteDatabase;
