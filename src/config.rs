//! Scaffolder settings.
//!
//! [`ScaffoldConfig::load`] reads the `[scaffolder]` section of
//! `config/scaffolder.toml` (optional) and overlays environment variables such
//! as `SCAFFOLDER__DIALECT=sqlite` or `SCAFFOLDER__DEFAULT_PAGE_SIZE=50`.

use crate::query::Dialect;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default location of the settings file
pub const CONFIG_FILE: &str = "config/scaffolder.toml";

const SECTION: &str = "scaffolder";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScaffoldConfig {
    /// SQL dialect the query builder renders
    #[serde(default)]
    pub dialect: Dialect,
    /// JSON schema document describing the tables
    #[serde(default)]
    pub schema_path: Option<PathBuf>,
    /// Page size for grid listings; 0 disables paging
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,
}

fn default_page_size() -> u64 {
    25
}

impl Default for ScaffoldConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            schema_path: None,
            default_page_size: default_page_size(),
        }
    }
}

fn environment() -> Environment {
    Environment::with_prefix("SCAFFOLDER")
        .separator("__")
        .keep_prefix(true)
        .try_parsing(true)
}

impl ScaffoldConfig {
    /// Load from `config/scaffolder.toml`, falling back to environment variables only
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if neither source yields a valid configuration.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(CONFIG_FILE)
    }

    /// Load from the given settings file overlaid with environment variables
    ///
    /// A missing file is not an error. An unreadable or malformed one is logged
    /// and skipped.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the `[scaffolder]` section is invalid.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let builder = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(environment());

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                if path.exists() {
                    log::warn!(
                        "failed to load {}, falling back to env: {err}",
                        path.display()
                    );
                }
                Config::builder()
                    .add_source(environment())
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file and env: {err}, then env-only error: {env_err}"
                        ))
                    })?
            }
        };

        match settings.get::<ScaffoldConfig>(SECTION) {
            Ok(cfg) => Ok(cfg),
            Err(ConfigError::NotFound(_)) => Ok(Self::default()),
            Err(e) => Err(ConfigError::Message(format!(
                "Scaffolder configuration could not be loaded from file or environment: {e}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("scaffolder-{}-{name}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let cfg = ScaffoldConfig::default();
        assert_eq!(cfg.dialect, Dialect::Postgres);
        assert_eq!(cfg.default_page_size, 25);
        assert!(cfg.schema_path.is_none());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let cfg = ScaffoldConfig::load_from("does/not/exist.toml").unwrap();
        assert_eq!(cfg.default_page_size, ScaffoldConfig::default().default_page_size);
    }

    #[test]
    fn test_load_section_from_file() {
        let path = write_temp(
            "section",
            "[scaffolder]\ndialect = \"sqlite\"\nschema_path = \"schema.json\"\ndefault_page_size = 10\n",
        );
        let cfg = ScaffoldConfig::load_from(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(cfg.dialect, Dialect::Sqlite);
        assert_eq!(cfg.schema_path, Some(PathBuf::from("schema.json")));
        assert_eq!(cfg.default_page_size, 10);
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let path = write_temp("broken", "[scaffolder\ndialect = ");
        let cfg = ScaffoldConfig::load_from(&path);
        std::fs::remove_file(&path).ok();
        assert!(cfg.is_ok());
    }
}
