//! Error taxonomy for query generation and repository operations.
//!
//! Every failure aborts the current operation and propagates to the caller.
//! The only absorbed condition is a write that affected no row, which the
//! repository reports as `None`/`false` instead of an error.

use crate::database::DbError;
use std::fmt;

/// Error type for metadata, query building and repository operations
#[derive(Debug)]
pub enum ScaffoldError {
    /// Table metadata cannot support the requested operation (e.g. no primary key)
    InvalidMetadata(String),
    /// A filter or write parameter matches no column and no recognized predicate
    UnknownParameter(String),
    /// A value cannot be coerced to the expected type
    TypeConversion(String),
    /// Failure surfaced unchanged from the `Database` collaborator
    ExecutionFailure(DbError),
    /// Settings or schema documents could not be loaded
    Configuration(String),
}

impl fmt::Display for ScaffoldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScaffoldError::InvalidMetadata(s) => {
                write!(f, "Invalid metadata: {s}")
            }
            ScaffoldError::UnknownParameter(s) => {
                write!(f, "Unknown parameter: {s}")
            }
            ScaffoldError::TypeConversion(s) => {
                write!(f, "Type conversion error: {s}")
            }
            ScaffoldError::ExecutionFailure(e) => {
                write!(f, "Query execution failed: {e}")
            }
            ScaffoldError::Configuration(s) => {
                write!(f, "Configuration error: {s}")
            }
        }
    }
}

impl std::error::Error for ScaffoldError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScaffoldError::ExecutionFailure(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DbError> for ScaffoldError {
    fn from(err: DbError) -> Self {
        ScaffoldError::ExecutionFailure(err)
    }
}

impl From<config::ConfigError> for ScaffoldError {
    fn from(err: config::ConfigError) -> Self {
        ScaffoldError::Configuration(err.to_string())
    }
}

impl ScaffoldError {
    /// Short stable label for the error kind, used in logs and metrics
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ScaffoldError::InvalidMetadata(_) => "invalid_metadata",
            ScaffoldError::UnknownParameter(_) => "unknown_parameter",
            ScaffoldError::TypeConversion(_) => "type_conversion",
            ScaffoldError::ExecutionFailure(_) => "execution_failure",
            ScaffoldError::Configuration(_) => "configuration",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_scaffold_error_display() {
        let err = ScaffoldError::InvalidMetadata("users has no primary key".to_string());
        assert!(err.to_string().contains("Invalid metadata"));
        assert!(err.to_string().contains("users has no primary key"));

        let err = ScaffoldError::UnknownParameter("nickname".to_string());
        assert!(err.to_string().contains("Unknown parameter: nickname"));

        let err = ScaffoldError::TypeConversion("count".to_string());
        assert!(err.to_string().contains("Type conversion error"));
    }

    #[test]
    fn test_execution_failure_keeps_source() {
        let err: ScaffoldError = DbError::QueryError("syntax error at or near".to_string()).into();
        assert_eq!(err.kind(), "execution_failure");
        assert!(err.to_string().contains("syntax error at or near"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_config_error_conversion() {
        let err: ScaffoldError = config::ConfigError::Message("missing field".to_string()).into();
        assert!(matches!(err, ScaffoldError::Configuration(ref m) if m.contains("missing field")));
    }
}
