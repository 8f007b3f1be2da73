//! Log file configuration
//!
//! [`LogFileConfig`] is the resolved, immutable input to strategy construction and
//! doubles as the canonical cache key. [`LoggingConfigOverrides`] is the partial
//! shape callers submit; it is validated without touching the backend and then
//! resolved against the defaults.

use super::error::{LoggerError, Result};
use super::file_type::FileType;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONTAINER: &str = "logs";
pub const DEFAULT_DIRECTORY: &str = "application";
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 100;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Configuration of one logical log file
///
/// # Examples
///
/// ```
/// use rust_blob_logger::{FileType, LogFileConfig};
///
/// let config = LogFileConfig::new()
///     .with_container("audit-logs")
///     .with_directory("payments/2024")
///     .with_max_file_size_mb(25)
///     .with_file_type(FileType::Csv)
///     .with_dynamic_columns(true);
///
/// assert_eq!(config.max_file_size_bytes(), 25 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogFileConfig {
    pub container_name: String,
    pub directory: String,
    /// Rotation threshold in megabytes
    pub max_file_size: u64,
    /// Informational only; rotation is driven by size
    pub rotate_daily: bool,
    /// Explicit representation; `None` infers it from the file name
    pub file_type: Option<FileType>,
    pub dynamic_columns: bool,
}

impl Default for LogFileConfig {
    fn default() -> Self {
        Self {
            container_name: DEFAULT_CONTAINER.to_string(),
            directory: DEFAULT_DIRECTORY.to_string(),
            max_file_size: DEFAULT_MAX_FILE_SIZE_MB,
            rotate_daily: false,
            file_type: None,
            dynamic_columns: false,
        }
    }
}

impl LogFileConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_container(mut self, container_name: impl Into<String>) -> Self {
        self.container_name = container_name.into();
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_directory(mut self, directory: impl Into<String>) -> Self {
        self.directory = directory.into();
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_file_size_mb(mut self, megabytes: u64) -> Self {
        self.max_file_size = megabytes;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_rotate_daily(mut self, enabled: bool) -> Self {
        self.rotate_daily = enabled;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_file_type(mut self, file_type: FileType) -> Self {
        self.file_type = Some(file_type);
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_dynamic_columns(mut self, enabled: bool) -> Self {
        self.dynamic_columns = enabled;
        self
    }

    /// Rotation threshold in bytes
    #[must_use]
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size.saturating_mul(BYTES_PER_MB)
    }

    /// Representation for `file_name`: the explicit type wins, otherwise the extension decides
    #[must_use]
    pub fn resolve_file_type(&self, file_name: &str) -> FileType {
        self.file_type
            .unwrap_or_else(|| FileType::from_file_name(file_name))
    }
}

/// Partial configuration as submitted by callers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfigOverrides {
    pub container_name: Option<String>,
    pub directory: Option<String>,
    pub max_file_size: Option<u64>,
    pub rotate_daily: Option<bool>,
    pub file_type: Option<String>,
    pub dynamic_columns: Option<bool>,
}

impl LoggingConfigOverrides {
    /// Resolve against the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::InvalidConfiguration`] if `fileType` names an
    /// unknown representation. Callers should run
    /// [`BlobLogger::validate_logging_config`](crate::BlobLogger::validate_logging_config)
    /// first to get every problem at once.
    pub fn into_config(self) -> Result<LogFileConfig> {
        let defaults = LogFileConfig::default();
        let file_type = self
            .file_type
            .as_deref()
            .map(str::parse::<FileType>)
            .transpose()
            .map_err(|e| LoggerError::config("fileType", e))?;

        Ok(LogFileConfig {
            container_name: self.container_name.unwrap_or(defaults.container_name),
            directory: self.directory.unwrap_or(defaults.directory),
            max_file_size: self.max_file_size.unwrap_or(defaults.max_file_size),
            rotate_daily: self.rotate_daily.unwrap_or(defaults.rotate_daily),
            file_type,
            dynamic_columns: self.dynamic_columns.unwrap_or(defaults.dynamic_columns),
        })
    }
}

impl From<&LogFileConfig> for LoggingConfigOverrides {
    fn from(config: &LogFileConfig) -> Self {
        Self {
            container_name: Some(config.container_name.clone()),
            directory: Some(config.directory.clone()),
            max_file_size: Some(config.max_file_size),
            rotate_daily: Some(config.rotate_daily),
            file_type: config.file_type.map(|t| t.as_str().to_string()),
            dynamic_columns: Some(config.dynamic_columns),
        }
    }
}

/// Outcome of a configuration check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub(crate) fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

pub(crate) fn check_container_name(name: &str) -> Option<String> {
    if name.is_empty() {
        return Some("Container name must not be empty".to_string());
    }
    let allowed = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if allowed {
        None
    } else {
        Some(format!(
            "Container name '{}' must contain only lowercase letters, numbers, and hyphens",
            name
        ))
    }
}

pub(crate) fn check_directory(directory: &str) -> Option<String> {
    let traverses = directory
        .split(['/', '\\'])
        .any(|segment| segment == "..");
    traverses.then(|| {
        format!(
            "Directory '{}' must not contain path traversal segments ('..')",
            directory
        )
    })
}

pub(crate) fn check_max_file_size(megabytes: u64) -> Option<String> {
    (megabytes == 0).then(|| "Maximum file size must be greater than 0 MB".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LogFileConfig::default();
        assert_eq!(config.container_name, "logs");
        assert_eq!(config.directory, "application");
        assert_eq!(config.max_file_size, 100);
        assert_eq!(config.file_type, None);
        assert!(!config.dynamic_columns);
        assert!(!config.rotate_daily);
    }

    #[test]
    fn test_explicit_file_type_wins_over_extension() {
        let config = LogFileConfig::new().with_file_type(FileType::Xlsx);
        assert_eq!(config.resolve_file_type("audit.csv"), FileType::Xlsx);

        let config = LogFileConfig::new();
        assert_eq!(config.resolve_file_type("audit.csv"), FileType::Csv);
        assert_eq!(config.resolve_file_type("audit"), FileType::Log);
    }

    #[test]
    fn test_deserialize_partial_config_fills_defaults() {
        let config: LogFileConfig =
            serde_json::from_str(r#"{"directory": "billing", "fileType": "csv"}"#).unwrap();
        assert_eq!(config.container_name, "logs");
        assert_eq!(config.directory, "billing");
        assert_eq!(config.file_type, Some(FileType::Csv));
    }

    #[test]
    fn test_overrides_into_config() {
        let overrides = LoggingConfigOverrides {
            container_name: Some("audit".into()),
            file_type: Some("XLSX".into()),
            ..Default::default()
        };
        let config = overrides.into_config().unwrap();
        assert_eq!(config.container_name, "audit");
        assert_eq!(config.file_type, Some(FileType::Xlsx));
        assert_eq!(config.max_file_size, DEFAULT_MAX_FILE_SIZE_MB);

        let overrides = LoggingConfigOverrides {
            file_type: Some("parquet".into()),
            ..Default::default()
        };
        assert!(overrides.into_config().is_err());
    }

    #[test]
    fn test_rule_checks() {
        assert!(check_container_name("audit-logs-2024").is_none());
        assert!(check_container_name("Invalid-Name").is_some());
        assert!(check_container_name("under_score").is_some());

        assert!(check_directory("application/payments").is_none());
        assert!(check_directory("a..b").is_none());
        assert!(check_directory("../x").is_some());
        assert!(check_directory("a\\..\\b").is_some());

        assert!(check_max_file_size(0).is_some());
        assert!(check_max_file_size(1).is_none());
    }
}
