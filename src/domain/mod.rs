//! Domain layer for cedar-client.
//!
//! Contains the canonical types shared across all modules:
//! - `BufferedLine`: the unit of buffered payload (text line or byte chunk)
//! - `Message`: a leveled message as handed over by callers
//! - `Severity`: ordered severity with threshold semantics
//! - `RecordMetadata`/`RecordEnd`: a record's opening and closing envelopes

pub mod line;
pub mod record;
pub mod severity;

pub use line::{BufferedLine, LinePayload, Message};
pub use record::{
    DEFAULT_CHUNK_BUFFER_SIZE, DEFAULT_LINE_BUFFER_SIZE, LogFormat, PayloadKind, RecordEnd,
    RecordId, RecordMetadata, StorageTarget,
};
pub use severity::{InvalidSeverity, Severity};
