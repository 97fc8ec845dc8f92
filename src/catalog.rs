//! Entry point tying a validated schema to settings.

use crate::config::ScaffoldConfig;
use crate::database::Database;
use crate::error::ScaffoldError;
use crate::filter::Filter;
use crate::meta::{Schema, Table};
use crate::query::SqlQueryBuilder;
use crate::repository::Repository;
use std::sync::Arc;

/// Validated schema plus the settings repositories are built with
#[derive(Debug, Clone)]
pub struct Catalog {
    schema: Schema,
    config: ScaffoldConfig,
}

impl Catalog {
    #[must_use]
    pub fn new(schema: Schema, config: ScaffoldConfig) -> Self {
        Self { schema, config }
    }

    /// Load the schema document named by `config.schema_path`
    ///
    /// # Errors
    ///
    /// Returns `Configuration` when no schema path is set or the file cannot be
    /// read, and `InvalidMetadata` when the document is invalid.
    pub fn load(config: ScaffoldConfig) -> Result<Self, ScaffoldError> {
        let path = config.schema_path.as_ref().ok_or_else(|| {
            ScaffoldError::Configuration("schema_path is not configured".to_string())
        })?;
        let schema = Schema::load(path)?;
        log::info!(
            "loaded {} table(s) from {}",
            schema.len(),
            path.display()
        );
        Ok(Self::new(schema, config))
    }

    /// Load settings from `config/scaffolder.toml` and the environment, then the schema
    ///
    /// # Errors
    ///
    /// See [`ScaffoldConfig::load`] and [`Catalog::load`].
    pub fn from_env() -> Result<Self, ScaffoldError> {
        Self::load(ScaffoldConfig::load()?)
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    #[must_use]
    pub fn config(&self) -> &ScaffoldConfig {
        &self.config
    }

    #[must_use]
    pub fn table(&self, name: &str) -> Option<Arc<Table>> {
        self.schema.table(name)
    }

    /// Query builder for the configured dialect
    #[must_use]
    pub fn query_builder(&self) -> SqlQueryBuilder {
        SqlQueryBuilder::new(self.config.dialect)
    }

    /// Repository for `name` over `db`
    ///
    /// # Errors
    ///
    /// Returns `InvalidMetadata` if the schema has no such table.
    pub fn repository<D: Database>(
        &self,
        name: &str,
        db: D,
    ) -> Result<Repository<D, SqlQueryBuilder>, ScaffoldError> {
        let table = self.table(name).ok_or_else(|| {
            ScaffoldError::InvalidMetadata(format!("table {name} is not in the schema"))
        })?;
        Ok(Repository::with_builder(table, db, self.query_builder()))
    }

    /// First page of a grid listing for `name`, sized per the settings
    #[must_use]
    pub fn filter(&self, name: &str) -> Filter {
        Filter::new(name).paged(1, self.config.default_page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Dialect;

    const SCHEMA: &str = r#"{
        "tables": [
            {"name": "teams", "columns": [
                {"name": "id", "isKey": true, "autoIncrement": true},
                {"name": "name", "showInGrid": true}
            ]}
        ]
    }"#;

    fn catalog() -> Catalog {
        let config = ScaffoldConfig {
            dialect: Dialect::Sqlite,
            default_page_size: 50,
            ..Default::default()
        };
        Catalog::new(Schema::from_json(SCHEMA).unwrap(), config)
    }

    #[test]
    fn test_filter_uses_default_page_size() {
        let filter = catalog().filter("teams");
        assert_eq!(filter.table_name, "teams");
        assert_eq!(filter.page_window(), Some((50, 0)));
        assert!(!filter.detail_mode);
    }

    #[test]
    fn test_query_builder_follows_dialect() {
        assert_eq!(catalog().query_builder().dialect(), Dialect::Sqlite);
    }

    #[test]
    fn test_load_requires_schema_path() {
        assert!(matches!(
            Catalog::load(ScaffoldConfig::default()),
            Err(ScaffoldError::Configuration(_))
        ));
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_repository_for_unknown_table() {
        let db = crate::database::SqliteDatabase::open_in_memory().unwrap();
        let catalog = catalog();
        assert!(catalog.repository("teams", &db).is_ok());
        assert!(matches!(
            catalog.repository("players", &db),
            Err(ScaffoldError::InvalidMetadata(_))
        ));
    }
}
