//! Generic CRUD repository over table metadata.
//!
//! A [`Repository`] is bound to one table, one [`Database`] and one
//! [`QueryBuilder`]. Reads map each row through the projection policy; writes
//! run the write statement, take the primary key from its result and re-read the
//! record in detail mode, so callers always get the fully projected record
//! (reference display values included) rather than the raw write result.

use crate::database::{Database, Row};
use crate::error::ScaffoldError;
use crate::fields::{derive_parameters, Fields};
use crate::filter::Filter;
use crate::meta::{Column, Table};
use crate::query::projection::shows_plain;
use crate::query::{bind, param_name, Params, QueryBuilder, QueryKind, SqlQueryBuilder};
use crate::value::{from_sql_value, to_sql_value, Record, Value};
use sea_query::Value as SqlValue;
use std::sync::Arc;
use std::time::Instant;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// Object-safe view of a repository, for UI layers that handle many tables
pub trait DataRepository {
    fn table(&self) -> &Table;

    /// # Errors
    ///
    /// See [`Repository::select`].
    fn select(&self, filter: &Filter) -> Result<Vec<Record>, ScaffoldError>;

    /// # Errors
    ///
    /// See [`Repository::get_record_count`].
    fn get_record_count(&self, filter: &Filter) -> Result<u64, ScaffoldError>;

    /// # Errors
    ///
    /// See [`Repository::insert`].
    fn insert(&self, input: &dyn Fields) -> Result<Option<Record>, ScaffoldError>;

    /// # Errors
    ///
    /// See [`Repository::update`].
    fn update(&self, input: &dyn Fields) -> Result<Option<Record>, ScaffoldError>;

    /// # Errors
    ///
    /// See [`Repository::delete`].
    fn delete(&self, input: &dyn Fields) -> Result<bool, ScaffoldError>;
}

/// Repository for one table
///
/// # Example
///
/// ```
/// use scaffolder::{Column, Dialect, Filter, Reference, Repository, SqlQueryBuilder, SqliteDatabase, Table};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// let db = SqliteDatabase::open_in_memory()?;
/// db.execute_batch(
///     "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, login TEXT, manager_id INTEGER)",
/// )?;
///
/// let users = Arc::new(Table::new(
///     "users",
///     vec![
///         Column::new("id").key().auto_increment(),
///         Column::new("login").in_grid(),
///         Column::new("manager_id").references(Reference::new("users", "id", "login")),
///     ],
/// ));
/// let repo = Repository::with_builder(users, db, SqlQueryBuilder::new(Dialect::Sqlite));
///
/// let alice = repo.insert(&json!({"login": "alice"}))?.expect("inserted");
/// repo.insert(&json!({"login": "bob", "manager_id": alice.get("id").cloned()}))?;
///
/// let rows = repo.select(&Filter::new("users"))?;
/// assert_eq!(rows[1].get("manager_login").and_then(|v| v.as_str()), Some("alice"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Repository<D, B = SqlQueryBuilder> {
    table: Arc<Table>,
    db: D,
    builder: B,
}

impl<D: Database> Repository<D, SqlQueryBuilder> {
    /// Repository using the default (PostgreSQL) query builder
    pub fn new(table: Arc<Table>, db: D) -> Self {
        Self::with_builder(table, db, SqlQueryBuilder::default())
    }
}

impl<D: Database, B: QueryBuilder> Repository<D, B> {
    pub fn with_builder(table: Arc<Table>, db: D, builder: B) -> Self {
        Self { table, db, builder }
    }

    #[must_use]
    pub fn table(&self) -> &Table {
        &self.table
    }

    #[must_use]
    pub fn database(&self) -> &D {
        &self.db
    }

    /// Rows matching the filter, projected per its mode
    ///
    /// # Errors
    ///
    /// Returns `UnknownParameter` for unrecognized filter parameters and
    /// `ExecutionFailure` if the database fails.
    pub fn select(&self, filter: &Filter) -> Result<Vec<Record>, ScaffoldError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::select_span(&self.table.name).entered();

        self.instrumented("select", || self.run_select(filter))
    }

    /// Number of rows matching the filter's predicates, ignoring paging
    ///
    /// # Errors
    ///
    /// Returns `TypeConversion` if the database's scalar is not a non-negative
    /// integer (integral floats and numeric text are accepted).
    pub fn get_record_count(&self, filter: &Filter) -> Result<u64, ScaffoldError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::count_span(&self.table.name).entered();

        self.instrumented("count", || {
            let statement = self.builder.build_record_count_query(&self.table, filter)?;
            log::debug!("count {}: {}", self.table.name, statement.sql);
            let scalar = self.db.execute_scalar(&statement, &filter_params(filter))?;
            count_from(&scalar)
        })
    }

    /// Insert a record and return it as re-read in detail mode
    ///
    /// Returns `None` when the write produced no row.
    ///
    /// # Errors
    ///
    /// Propagates field enumeration, query building and database failures.
    pub fn insert(&self, input: &dyn Fields) -> Result<Option<Record>, ScaffoldError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::insert_span(&self.table.name).entered();

        self.instrumented("insert", || {
            let columns: Vec<&Column> =
                self.table.columns.iter().filter(|c| c.is_insertable()).collect();
            let params = self.column_params(input, &columns)?;
            self.write(QueryKind::Insert, &params)
        })
    }

    /// Update a record by primary key and return it as re-read in detail mode
    ///
    /// Key and readonly columns are never written. Updatable columns missing from
    /// the input are set to NULL, except auto-increment ones, which are written
    /// only when supplied. Returns `None` when no row matched the key.
    ///
    /// # Errors
    ///
    /// Propagates field enumeration, query building and database failures.
    pub fn update(&self, input: &dyn Fields) -> Result<Option<Record>, ScaffoldError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::update_span(&self.table.name).entered();

        self.instrumented("update", || {
            let mut columns: Vec<&Column> = self
                .table
                .columns
                .iter()
                .filter(|c| c.is_updatable() && !c.auto_increment)
                .collect();
            columns.extend(self.table.primary_keys());
            let params = self.column_params(input, &columns)?;
            self.write(QueryKind::Update, &params)
        })
    }

    /// Delete a record by primary key; `true` if a row was removed
    ///
    /// # Errors
    ///
    /// Returns `InvalidMetadata` if the input lacks a value for any key column.
    pub fn delete(&self, input: &dyn Fields) -> Result<bool, ScaffoldError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::delete_span(&self.table.name).entered();

        self.instrumented("delete", || {
            let keys = self.table.primary_keys();
            let mut params = self.column_params(input, &keys)?;
            params.retain(|name, _| keys.iter().any(|k| k.name == *name));
            for key in &keys {
                let missing = match params.get(&key.name) {
                    Some(value) => from_sql_value(value)?.is_null(),
                    None => true,
                };
                if missing {
                    return Err(ScaffoldError::InvalidMetadata(format!(
                        "delete from {} needs a value for key column {}",
                        self.table.name, key.name
                    )));
                }
            }

            let statement = self.builder.build(QueryKind::Delete, &self.table, None, None)?;
            log::debug!("delete {}: {}", self.table.name, statement.sql);
            let mapper = |row: &Row| self.key_record(row);
            let deleted = self.db.execute(&statement, &mapper, &bind(&params))?;
            if deleted.is_empty() {
                log::debug!("delete {}: no row matched", self.table.name);
            }
            Ok(!deleted.is_empty())
        })
    }

    /// Project one result row into a record
    ///
    /// Columns are visited in declaration order. A column with a wired reference
    /// yields its raw value and the display value when the row carries the alias
    /// and the raw value is not NULL; otherwise it follows the plain rule (grid,
    /// key, or `load_all`).
    ///
    /// # Errors
    ///
    /// Returns `TypeConversion` for row values with no scalar mapping.
    pub fn map_row(&self, row: &Row, load_all: bool) -> Result<Record, ScaffoldError> {
        let mut record = Record::new();
        for column in &self.table.columns {
            if let Some(reference) = column.wired_reference() {
                let alias = reference.column_alias(&column.name);
                if let (Some(raw), Some(display)) = (row.get(&column.name), row.get(&alias)) {
                    let raw = from_sql_value(raw)?;
                    if !raw.is_null() {
                        record.insert(column.name.clone(), raw);
                        record.insert(alias, from_sql_value(display)?);
                        continue;
                    }
                }
            }
            if shows_plain(column, load_all) {
                if let Some(value) = row.get(&column.name) {
                    record.insert(column.name.clone(), from_sql_value(value)?);
                }
            }
        }
        Ok(record)
    }

    fn run_select(&self, filter: &Filter) -> Result<Vec<Record>, ScaffoldError> {
        let statement = self
            .builder
            .build(QueryKind::Select, &self.table, Some(filter), None)?;
        log::debug!("select {}: {}", self.table.name, statement.sql);
        let load_all = filter.detail_mode;
        let mapper = |row: &Row| self.map_row(row, load_all);
        self.db.execute(&statement, &mapper, &filter_params(filter))
    }

    /// Run an insert or update, then re-read the written record by key
    fn write(&self, kind: QueryKind, params: &Params) -> Result<Option<Record>, ScaffoldError> {
        let statement = self.builder.build(kind, &self.table, None, Some(params))?;
        log::debug!("{} {}: {}", kind.as_str(), self.table.name, statement.sql);

        let mapper = |row: &Row| self.key_record(row);
        let written = self.db.execute(&statement, &mapper, &bind(params))?;
        let Some(keys) = written.into_iter().next() else {
            log::debug!("{} {}: write returned no row", kind.as_str(), self.table.name);
            return Ok(None);
        };

        let mut filter = Filter::new(self.table.name.clone()).detail();
        for (name, value) in keys.iter() {
            filter.parameters.insert(name.to_string(), value.clone());
        }
        Ok(self.run_select(&filter)?.into_iter().next())
    }

    /// Primary-key values of a write result
    fn key_record(&self, row: &Row) -> Result<Record, ScaffoldError> {
        let mut keys = Record::new();
        for key in self.table.primary_keys() {
            let value = row.get(&key.name).ok_or_else(|| {
                ScaffoldError::InvalidMetadata(format!(
                    "write result for {} lacks key column {}",
                    self.table.name, key.name
                ))
            })?;
            keys.insert(key.name.clone(), from_sql_value(value)?);
        }
        Ok(keys)
    }

    /// Derive parameters and keep only table columns, under their declared names
    fn column_params(
        &self,
        input: &dyn Fields,
        restrict: &[&Column],
    ) -> Result<Params, ScaffoldError> {
        let mut params = Params::new();
        for (name, value) in derive_parameters(input, Some(restrict))? {
            match self.table.column_ignore_case(&name) {
                Some(column) => {
                    params.insert(column.name.clone(), value);
                }
                None => {
                    log::debug!("{}: dropping input field {name}, not a column", self.table.name);
                }
            }
        }
        Ok(params)
    }

    fn instrumented<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce() -> Result<T, ScaffoldError>,
    ) -> Result<T, ScaffoldError> {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        #[cfg(feature = "metrics")]
        METRICS.record_operation(operation, &self.table.name, elapsed, result.is_err());

        match &result {
            Ok(_) => log::trace!("{operation} {} finished in {elapsed:?}", self.table.name),
            Err(e) => log::debug!("{operation} {} failed ({}): {e}", self.table.name, e.kind()),
        }
        result
    }
}

impl<D: Database, B: QueryBuilder> DataRepository for Repository<D, B> {
    fn table(&self) -> &Table {
        Repository::table(self)
    }

    fn select(&self, filter: &Filter) -> Result<Vec<Record>, ScaffoldError> {
        Repository::select(self, filter)
    }

    fn get_record_count(&self, filter: &Filter) -> Result<u64, ScaffoldError> {
        Repository::get_record_count(self, filter)
    }

    fn insert(&self, input: &dyn Fields) -> Result<Option<Record>, ScaffoldError> {
        Repository::insert(self, input)
    }

    fn update(&self, input: &dyn Fields) -> Result<Option<Record>, ScaffoldError> {
        Repository::update(self, input)
    }

    fn delete(&self, input: &dyn Fields) -> Result<bool, ScaffoldError> {
        Repository::delete(self, input)
    }
}

/// Filter parameters keyed by placeholder name
fn filter_params(filter: &Filter) -> Params {
    filter
        .parameters
        .iter()
        .map(|(k, v)| (param_name(k), to_sql_value(v)))
        .collect()
}

/// Interpret a count scalar
fn count_from(scalar: &SqlValue) -> Result<u64, ScaffoldError> {
    let invalid = |what: String| ScaffoldError::TypeConversion(format!("record count {what}"));
    match from_sql_value(scalar)? {
        Value::Int(i) => u64::try_from(i).map_err(|_| invalid(format!("is negative: {i}"))),
        Value::Float(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => {
            Ok(f as u64)
        }
        Value::Text(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<u64>()
                .or_else(|_| match trimmed.parse::<f64>() {
                    Ok(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 => Ok(f as u64),
                    _ => Err(()),
                })
                .map_err(|()| invalid(format!("is not an integer: {s:?}")))
        }
        other => Err(invalid(format!("is not an integer: {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DbError;
    use crate::meta::Reference;
    use crate::query::Statement;
    use crate::value::sql_null;
    use serde_json::json;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Replays canned row sets and records every call
    #[derive(Default)]
    struct Scripted {
        responses: RefCell<VecDeque<Vec<Row>>>,
        calls: RefCell<Vec<(Statement, Params)>>,
    }

    impl Scripted {
        fn reply(self, rows: Vec<Row>) -> Self {
            self.responses.borrow_mut().push_back(rows);
            self
        }
    }

    impl Database for Scripted {
        fn fetch(&self, statement: &Statement, params: &Params) -> Result<Vec<Row>, DbError> {
            self.calls
                .borrow_mut()
                .push((statement.clone(), params.clone()));
            Ok(self.responses.borrow_mut().pop_front().unwrap_or_default())
        }
    }

    fn users() -> Arc<Table> {
        Arc::new(Table::new(
            "users",
            vec![
                Column::new("id").key().auto_increment(),
                Column::new("login").in_grid(),
                Column::new("created").readonly(),
                Column::new("manager_id").references(Reference::new("users", "id", "login")),
            ],
        ))
    }

    fn row(pairs: &[(&str, SqlValue)]) -> Row {
        Row::new(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
    }

    #[test]
    fn test_map_row_pairs_reference() {
        let repo = Repository::new(users(), Scripted::default());
        let r = row(&[
            ("id", SqlValue::from(2i64)),
            ("login", SqlValue::from("bob".to_string())),
            ("manager_id", SqlValue::from(1i64)),
            ("manager_login", SqlValue::from("alice".to_string())),
        ]);
        let record = repo.map_row(&r, false).unwrap();
        let keys: Vec<&str> = record.keys().collect();
        assert_eq!(keys, vec!["id", "login", "manager_id", "manager_login"]);
        assert_eq!(record.get("manager_login"), Some(&Value::Text("alice".into())));
    }

    #[test]
    fn test_map_row_null_reference_has_no_pair() {
        let repo = Repository::new(users(), Scripted::default());
        let r = row(&[
            ("id", SqlValue::from(1i64)),
            ("login", SqlValue::from("alice".to_string())),
            ("created", sql_null()),
            ("manager_id", sql_null()),
            ("manager_login", sql_null()),
        ]);
        let grid = repo.map_row(&r, false).unwrap();
        assert_eq!(grid.keys().collect::<Vec<_>>(), vec!["id", "login"]);

        let detail = repo.map_row(&r, true).unwrap();
        assert_eq!(
            detail.keys().collect::<Vec<_>>(),
            vec!["id", "login", "created", "manager_id"]
        );
        assert_eq!(detail.get("manager_id"), Some(&Value::Null));
    }

    #[test]
    fn test_insert_pads_and_refetches() {
        let db = Scripted::default()
            .reply(vec![row(&[("id", SqlValue::from(5i64))])])
            .reply(vec![row(&[
                ("id", SqlValue::from(5i64)),
                ("login", SqlValue::from("eve".to_string())),
                ("created", SqlValue::from("2024-01-01".to_string())),
                ("manager_id", sql_null()),
                ("manager_login", sql_null()),
            ])]);
        let repo = Repository::new(users(), db);

        let record = repo
            .insert(&json!({"login": "eve", "manager_login": "ignored"}))
            .unwrap()
            .unwrap();
        assert_eq!(record.get("id"), Some(&Value::Int(5)));
        assert_eq!(record.get("created"), Some(&Value::Text("2024-01-01".into())));

        let calls = repo.database().calls.borrow();
        assert_eq!(calls.len(), 2);
        let (insert, params) = &calls[0];
        assert!(insert.sql.starts_with("INSERT"));
        assert_eq!(params.get("@manager_id"), Some(&sql_null()));
        assert!(!params.contains_key("@manager_login"));
        let (refetch, params) = &calls[1];
        assert!(refetch.sql.starts_with("SELECT"));
        assert_eq!(params.get("@id"), Some(&SqlValue::from(5i64)));
    }

    #[test]
    fn test_write_without_result_row_is_none() {
        let repo = Repository::new(users(), Scripted::default());
        let result = repo.update(&json!({"id": 99, "login": "ghost"})).unwrap();
        assert!(result.is_none());
        assert_eq!(repo.database().calls.borrow().len(), 1);
    }

    #[test]
    fn test_update_never_sets_key_or_readonly() {
        let repo = Repository::new(users(), Scripted::default());
        repo.update(&json!({"id": 1, "login": "x", "created": "2000-01-01"}))
            .unwrap();
        let calls = repo.database().calls.borrow();
        let (statement, _) = &calls[0];
        assert!(!statement.sql.contains(r#""created" ="#));
        assert!(!statement.sql.contains(r#"SET "id""#));
        assert_eq!(statement.parameters, vec!["@login", "@manager_id", "@id"]);
    }

    #[test]
    fn test_update_leaves_unsupplied_auto_increment_alone() {
        let table = Arc::new(Table::new(
            "posts",
            vec![
                Column::new("id").key().auto_increment(),
                Column::new("title").in_grid(),
                Column::new("revision").auto_increment(),
            ],
        ));
        let repo = Repository::new(table, Scripted::default());
        repo.update(&json!({"id": 1, "title": "b"})).unwrap();
        repo.update(&json!({"id": 1, "title": "b", "revision": 9}))
            .unwrap();

        let calls = repo.database().calls.borrow();
        let (partial, params) = &calls[0];
        assert_eq!(partial.parameters, vec!["@title", "@id"]);
        assert!(!params.contains_key("@revision"));
        let (supplied, params) = &calls[1];
        assert_eq!(supplied.parameters, vec!["@title", "@revision", "@id"]);
        assert_eq!(params.get("@revision"), Some(&SqlValue::from(9i64)));
    }

    #[test]
    fn test_delete_binds_only_key_columns() {
        let repo = Repository::new(users(), Scripted::default());
        repo.delete(&json!({"id": 3, "login": "carol", "manager_id": 1}))
            .unwrap();
        let calls = repo.database().calls.borrow();
        let (_, params) = &calls[0];
        assert_eq!(params.keys().collect::<Vec<_>>(), vec!["@id"]);
    }

    #[test]
    fn test_delete_requires_key_value() {
        let repo = Repository::new(users(), Scripted::default());
        let err = repo.delete(&json!({"login": "alice"})).unwrap_err();
        assert!(matches!(err, ScaffoldError::InvalidMetadata(_)));
        assert!(repo.database().calls.borrow().is_empty());
    }

    #[test]
    fn test_delete_reports_affected_row() {
        let db = Scripted::default().reply(vec![row(&[("id", SqlValue::from(1i64))])]);
        let repo = Repository::new(users(), db);
        assert!(repo.delete(&json!({"id": 1})).unwrap());
        assert!(!repo.delete(&json!({"id": 1})).unwrap());
    }

    #[test]
    fn test_count_conversion() {
        assert_eq!(count_from(&SqlValue::from(3i64)).unwrap(), 3);
        assert_eq!(count_from(&SqlValue::from(4.0f64)).unwrap(), 4);
        assert_eq!(count_from(&SqlValue::from("12".to_string())).unwrap(), 12);
        assert!(matches!(
            count_from(&SqlValue::from("many".to_string())),
            Err(ScaffoldError::TypeConversion(_))
        ));
        assert!(count_from(&SqlValue::from(2.5f64)).is_err());
        assert!(count_from(&SqlValue::from(-1i64)).is_err());
        assert!(count_from(&sql_null()).is_err());
    }

    #[test]
    fn test_unknown_filter_parameter_never_reaches_database() {
        let repo = Repository::new(users(), Scripted::default());
        let filter = Filter::new("users").with_parameter("nickname", "al");
        assert!(matches!(
            repo.select(&filter),
            Err(ScaffoldError::UnknownParameter(_))
        ));
        assert!(repo.database().calls.borrow().is_empty());
    }

    #[test]
    fn test_dyn_repository() {
        let repo: Box<dyn DataRepository> = Box::new(Repository::new(users(), Scripted::default()));
        assert_eq!(repo.table().name(), "users");
        assert!(repo.select(&Filter::new("users")).unwrap().is_empty());
    }
}
