//! Error types for designer operations

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Error returned by every fallible model, formula and persistence operation.
///
/// None of these are fatal to the in-memory model: a failed mutation leaves
/// the project exactly as it was before the call.
#[derive(Error, Debug)]
pub enum DesignError {
    /// Empty or otherwise unusable user input
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Unknown field type: {0}")]
    UnknownType(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A Reference field names a table that no longer exists
    #[error("Field '{field_id}' in table '{table_id}' references missing table '{target}'")]
    DanglingReference {
        table_id: String,
        field_id: String,
        target: String,
    },

    #[error("Failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DesignError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for designer operations
pub type Result<T> = std::result::Result<T, DesignError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = DesignError::validation("name", "must not be empty");
        assert_eq!(err.to_string(), "Invalid name: must not be empty");

        let err = DesignError::not_found("Table", "table_3_zakazy");
        assert_eq!(err.to_string(), "Table not found: table_3_zakazy");

        let err = DesignError::DanglingReference {
            table_id: "table_0_a".into(),
            field_id: "field_0_ssylka".into(),
            target: "table_1_b".into(),
        };
        assert!(err.to_string().contains("missing table 'table_1_b'"));
    }
}
