//! Client library for the Cedar telemetry service.
//!
//! Opens a record against the service, buffers log lines or raw byte
//! chunks in memory, and flushes them in size-bounded batches over HTTP.
//! [`StreamingSender`] is the write path; [`fetch()`](fetch::fetch) is the
//! read path for stored content.

#![deny(warnings, rust_2024_compatibility)]
// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_possible_truncation, // Safe within realistic value bounds (durations, sizes)
    clippy::cast_precision_loss,      // Acceptable for jitter math on small delays
    clippy::cast_sign_loss,           // Safe where values are known non-negative
    clippy::missing_errors_doc,       // Error conditions covered by the error enums
    clippy::missing_panics_doc,       // Public API does not panic
    clippy::module_name_repetitions,  // e.g. SenderError in sender module
    clippy::must_use_candidate,       // Annotated selectively on critical APIs
    clippy::doc_markdown              // Internal API
)]

pub mod buffer;
pub mod config;
pub mod domain;
pub mod fetch;
pub mod rpc;
pub mod sender;

// Re-export main types for easy access
pub use config::{ConfigError, ConnectionConfig, RecordOptions};
pub use domain::{
    DEFAULT_CHUNK_BUFFER_SIZE, DEFAULT_LINE_BUFFER_SIZE, LogFormat, Message, PayloadKind, RecordId,
    Severity, StorageTarget,
};
pub use fetch::{FetchError, LogQuery, PaginatedReader, fetch};
pub use rpc::{HttpRecordClient, RecordClient, RpcError};
pub use sender::{ConsoleSink, Diagnostic, FallbackSink, SenderError, StreamingSender};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
