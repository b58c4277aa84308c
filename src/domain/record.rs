use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Default flush threshold for line-oriented records, in bytes.
pub const DEFAULT_LINE_BUFFER_SIZE: usize = 4096;

/// Default flush threshold for byte-chunk records, in bytes.
pub const DEFAULT_CHUNK_BUFFER_SIZE: usize = 10_000_000;

/// Backend-assigned identifier of an open record. Opaque to this crate; it is
/// received when the record is created and echoed on every subsequent call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Declared format of line content, recorded with the metadata so readers can
/// interpret the stored payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Unknown,
    Text,
    Json,
    Bson,
}

/// Backend storage tier the record's payload lands in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageTarget {
    #[default]
    S3,
    Local,
    GridFs,
}

/// Payload shape a record carries. Selects the ingest route and the default
/// buffer threshold: line-oriented records flush early and often, byte-chunk
/// records accumulate much larger batches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    #[default]
    Lines,
    Bytes,
}

impl PayloadKind {
    pub fn default_max_buffer_size(self) -> usize {
        match self {
            PayloadKind::Lines => DEFAULT_LINE_BUFFER_SIZE,
            PayloadKind::Bytes => DEFAULT_CHUNK_BUFFER_SIZE,
        }
    }
}

/// Descriptive envelope sent once when a record is opened. All string fields
/// pass through to the backend verbatim; empty means unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub project: String,
    pub version: String,
    pub variant: String,
    pub task_name: String,
    pub task_id: String,
    pub execution: i32,
    pub test_name: String,
    pub trial: i32,
    pub process_name: String,
    pub format: LogFormat,
    pub arguments: HashMap<String, String>,
    pub mainline: bool,
    pub storage: StorageTarget,
    pub created_at: DateTime<Utc>,
}

/// Terminal state reported when a record is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEnd {
    pub exit_code: i32,
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_is_transparent_in_json() {
        let id = RecordId::new("5fabc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"5fabc\"");
        let parsed: RecordId = serde_json::from_str("\"5fabc\"").unwrap();
        assert_eq!(parsed, id);
        assert_eq!(parsed.as_str(), "5fabc");
    }

    #[test]
    fn test_payload_kind_default_buffer_sizes() {
        assert_eq!(PayloadKind::Lines.default_max_buffer_size(), 4096);
        assert_eq!(PayloadKind::Bytes.default_max_buffer_size(), 10_000_000);
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_string(&LogFormat::Json).unwrap(), "\"json\"");
        assert_eq!(serde_json::to_string(&StorageTarget::GridFs).unwrap(), "\"gridfs\"");
        assert_eq!(serde_json::to_string(&PayloadKind::Bytes).unwrap(), "\"bytes\"");
    }
}
