//! Error types for the blob logger

use crate::storage::StorageError;

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Entry or configuration rejected before any backend call
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// A single formatted entry exceeds the append primitive's payload ceiling
    #[error("Entry too large: {size} bytes exceeds the {limit} byte append limit")]
    EntryTooLarge { size: usize, limit: usize },

    /// The backing blob of a logical log file does not exist
    #[error("Log file '{path}' does not exist")]
    NotFound { path: String },

    /// Credential service or backend refused access
    #[error("Access error: {message}")]
    Access { message: String },

    /// Target container is missing; a configuration error, not a transient one
    #[error("Container '{container}' does not exist")]
    ContainerMissing { container: String },

    /// Any other backend failure
    #[error("Storage error: {0}")]
    Storage(StorageError),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Formatter error with format type
    #[error("Formatter error ({format_type}): {message}")]
    Formatter {
        format_type: String,
        message: String,
    },

    /// Workbook could not be encoded or decoded
    #[error("Spreadsheet error: {message}")]
    Spreadsheet { message: String },

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Failure of a public operation, prefixed with what was being attempted
    #[error("Failed to {operation}: {source}")]
    Operation {
        operation: &'static str,
        #[source]
        source: Box<LoggerError>,
    },
}

impl LoggerError {
    pub fn validation(message: impl Into<String>) -> Self {
        LoggerError::Validation {
            message: message.into(),
        }
    }

    pub fn entry_too_large(size: usize, limit: usize) -> Self {
        LoggerError::EntryTooLarge { size, limit }
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        LoggerError::NotFound { path: path.into() }
    }

    pub fn access(message: impl Into<String>) -> Self {
        LoggerError::Access {
            message: message.into(),
        }
    }

    pub fn container_missing(container: impl Into<String>) -> Self {
        LoggerError::ContainerMissing {
            container: container.into(),
        }
    }

    /// Create a formatter error
    pub fn formatter(format_type: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::Formatter {
            format_type: format_type.into(),
            message: message.into(),
        }
    }

    pub fn spreadsheet(message: impl ToString) -> Self {
        LoggerError::Spreadsheet {
            message: message.to_string(),
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Wrap an error with the name of the public operation that failed
    pub fn operation(operation: &'static str, source: LoggerError) -> Self {
        LoggerError::Operation {
            operation,
            source: Box::new(source),
        }
    }

    /// The underlying typed error, looking through operation prefixes
    pub fn root(&self) -> &LoggerError {
        match self {
            LoggerError::Operation { source, .. } => source.root(),
            other => other,
        }
    }

    /// Configuration-class failures that will not go away by calling again
    pub fn is_permanent(&self) -> bool {
        matches!(
            self.root(),
            LoggerError::Validation { .. }
                | LoggerError::EntryTooLarge { .. }
                | LoggerError::Access { .. }
                | LoggerError::ContainerMissing { .. }
                | LoggerError::InvalidConfiguration { .. }
        )
    }
}

impl From<StorageError> for LoggerError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ContainerNotFound { container } => {
                LoggerError::ContainerMissing { container }
            }
            StorageError::BlobNotFound { path } => LoggerError::NotFound { path },
            StorageError::AccessDenied { message } => LoggerError::Access { message },
            StorageError::PayloadTooLarge { size, limit } => {
                LoggerError::EntryTooLarge { size, limit }
            }
            other => LoggerError::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LoggerError::entry_too_large(5_000_000, 4_194_304);
        assert_eq!(
            err.to_string(),
            "Entry too large: 5000000 bytes exceeds the 4194304 byte append limit"
        );

        let err = LoggerError::container_missing("logs");
        assert_eq!(err.to_string(), "Container 'logs' does not exist");

        let err = LoggerError::formatter("CSV", "bad row");
        assert_eq!(err.to_string(), "Formatter error (CSV): bad row");
    }

    #[test]
    fn test_operation_prefix_and_root() {
        let err = LoggerError::operation("append log", LoggerError::validation("empty message"));
        assert_eq!(
            err.to_string(),
            "Failed to append log: Validation failed: empty message"
        );
        assert!(matches!(err.root(), LoggerError::Validation { .. }));
        assert!(err.is_permanent());
    }

    #[test]
    fn test_storage_errors_map_to_typed_variants() {
        let err: LoggerError = StorageError::ContainerNotFound {
            container: "logs".into(),
        }
        .into();
        assert!(matches!(err, LoggerError::ContainerMissing { .. }));

        let err: LoggerError = StorageError::AccessDenied {
            message: "expired".into(),
        }
        .into();
        assert!(matches!(err, LoggerError::Access { .. }));

        let err: LoggerError = StorageError::Transport("connection reset".into()).into();
        assert!(matches!(err, LoggerError::Storage(_)));
        assert!(!err.is_permanent());
    }
}
