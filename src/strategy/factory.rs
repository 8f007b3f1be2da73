//! Strategy construction by representation

use super::LogStrategy;
use crate::core::{FileType, LogFileConfig};
use crate::formatters::formatter_for;
use crate::writers::{AppendBlobWriter, LogWriter, SpreadsheetWriter, WriterContext};
use serde::{Deserialize, Serialize};

/// Capability description of one supported representation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatDescriptor {
    pub file_type: FileType,
    pub extension: String,
    pub supports_append: bool,
    pub description: String,
}

impl From<FileType> for FormatDescriptor {
    fn from(file_type: FileType) -> Self {
        Self {
            file_type,
            extension: file_type.extension().to_string(),
            supports_append: file_type.supports_append(),
            description: file_type.description().to_string(),
        }
    }
}

pub struct StrategyFactory;

impl StrategyFactory {
    /// Build the formatter/writer pair for `file_name`.
    ///
    /// An explicit `config.file_type` wins; otherwise the file name's
    /// extension decides. The strategy is returned unattached.
    pub fn create_strategy(file_name: &str, config: &LogFileConfig, ctx: &WriterContext) -> LogStrategy {
        let file_type = config.resolve_file_type(file_name);
        let formatter = formatter_for(file_type);

        let writer: Box<dyn LogWriter> = if formatter.supports_append() {
            Box::new(AppendBlobWriter::new(ctx.clone(), file_type))
        } else {
            Box::new(SpreadsheetWriter::new(ctx.clone()))
        };

        ctx.metrics.record_strategy_built();
        tracing::debug!(
            file = file_name,
            file_type = %file_type,
            writer = writer.name(),
            "built log strategy"
        );

        LogStrategy::new(file_name, config.clone(), formatter, writer, ctx.metrics.clone())
    }

    pub fn supported_file_types() -> &'static [FileType] {
        &FileType::ALL
    }

    pub fn is_file_type_supported(file_type: &str) -> bool {
        file_type.parse::<FileType>().is_ok()
    }

    pub fn supported_formats() -> Vec<FormatDescriptor> {
        Self::supported_file_types()
            .iter()
            .copied()
            .map(FormatDescriptor::from)
            .collect()
    }
}
