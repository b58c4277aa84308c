use super::ConfigError;
use crate::domain::{LogFormat, PayloadKind, RecordMetadata, Severity, StorageTarget};
use crate::sender::{ConsoleSink, FallbackSink};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Per-record options: descriptive metadata plus sender behavior.
///
/// All metadata fields default to empty/zero and are passed through to the
/// backend verbatim. `validate` rejects contradictory settings and fills
/// in the remaining defaults: the flush threshold from the payload kind
/// and the console fallback sink. Senders can rely on fully-populated
/// options.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordOptions {
    pub project: String,
    pub version: String,
    pub variant: String,
    pub task_name: String,
    pub task_id: String,
    pub execution: i32,
    pub test_name: String,
    pub trial: i32,
    pub process_name: String,
    pub arguments: HashMap<String, String>,
    pub mainline: bool,

    /// At most one of the format flags may be set; none means
    /// [`LogFormat::Unknown`].
    pub log_format_text: bool,
    pub log_format_json: bool,
    pub log_format_bson: bool,

    pub storage: StorageTarget,
    pub payload: PayloadKind,

    /// Flush threshold in bytes; `0` selects the payload kind's default.
    pub max_buffer_size: usize,

    /// Buffer caller content verbatim instead of splitting on newlines.
    pub disable_newline_splitting: bool,

    /// Lowest severity that will be buffered; anything below is dropped.
    pub severity_threshold: Severity,

    /// Local destination for sender errors; defaults to standard error.
    #[serde(skip)]
    pub fallback: Option<Arc<dyn FallbackSink>>,

    /// Cancelling this token makes in-flight and future calls to the
    /// service fail promptly.
    #[serde(skip)]
    pub cancellation: Option<CancellationToken>,
}

impl fmt::Debug for RecordOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordOptions")
            .field("project", &self.project)
            .field("task_id", &self.task_id)
            .field("test_name", &self.test_name)
            .field("payload", &self.payload)
            .field("storage", &self.storage)
            .field("max_buffer_size", &self.max_buffer_size)
            .field("severity_threshold", &self.severity_threshold)
            .field("has_fallback", &self.fallback.is_some())
            .finish_non_exhaustive()
    }
}

impl RecordOptions {
    /// Resolves the format flags to a single [`LogFormat`].
    pub fn log_format(&self) -> Result<LogFormat, ConfigError> {
        match (
            self.log_format_text,
            self.log_format_json,
            self.log_format_bson,
        ) {
            (false, false, false) => Ok(LogFormat::Unknown),
            (true, false, false) => Ok(LogFormat::Text),
            (false, true, false) => Ok(LogFormat::Json),
            (false, false, true) => Ok(LogFormat::Bson),
            _ => Err(ConfigError::InvalidConfig(
                "cannot specify more than one log format".to_string(),
            )),
        }
    }

    /// Checks for contradictions and fills remaining defaults in place.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.log_format()?;

        if self.max_buffer_size == 0 {
            self.max_buffer_size = self.payload.default_max_buffer_size();
        }

        if self.fallback.is_none() {
            self.fallback = Some(Arc::new(ConsoleSink::new()));
        }

        Ok(())
    }

    /// Assembles the record-opening envelope, stamped with `created_at`.
    pub fn metadata(&self, created_at: DateTime<Utc>) -> Result<RecordMetadata, ConfigError> {
        Ok(RecordMetadata {
            project: self.project.clone(),
            version: self.version.clone(),
            variant: self.variant.clone(),
            task_name: self.task_name.clone(),
            task_id: self.task_id.clone(),
            execution: self.execution,
            test_name: self.test_name.clone(),
            trial: self.trial,
            process_name: self.process_name.clone(),
            format: self.log_format()?,
            arguments: self.arguments.clone(),
            mainline: self.mainline,
            storage: self.storage,
            created_at,
        })
    }
}
