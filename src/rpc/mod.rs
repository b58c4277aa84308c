//! Transport capability for record ingest.
//!
//! The sender talks to the service exclusively through [`RecordClient`];
//! [`HttpRecordClient`] is the provided implementation. Tests substitute
//! their own to observe calls without a server.

pub mod http;
pub mod retry;

pub use http::HttpRecordClient;
pub use retry::RetryConfig;

use crate::domain::{BufferedLine, RecordEnd, RecordId, RecordMetadata};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("request timeout: {0}")]
    Timeout(String),
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("operation cancelled")]
    Cancelled,
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("retries exhausted after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        source: Box<RpcError>,
    },
}

/// Produces request correlation ids. Injectable so tests and embedding
/// applications control id generation; the default draws random UUIDs.
pub type IdSource = Arc<dyn Fn() -> String + Send + Sync>;

pub fn uuid_id_source() -> IdSource {
    Arc::new(|| uuid::Uuid::new_v4().to_string())
}

/// Operations a record ingest transport must provide.
///
/// One client serves one record kind: open a record, append payload batches
/// to it, close it with terminal state. `disconnect` exists so transports
/// owned by a sender can be torn down eagerly on close; implementations
/// with nothing to tear down return `Ok(())`. `stream_lines` is reserved
/// for a server-streaming ingest path and is currently a no-op.
pub trait RecordClient: Send + Sync {
    fn create_record(
        &self,
        metadata: &RecordMetadata,
    ) -> impl Future<Output = Result<RecordId, RpcError>> + Send;

    fn append_lines(
        &self,
        id: &RecordId,
        lines: &[BufferedLine],
    ) -> impl Future<Output = Result<(), RpcError>> + Send;

    fn close_record(
        &self,
        id: &RecordId,
        end: &RecordEnd,
    ) -> impl Future<Output = Result<(), RpcError>> + Send;

    fn stream_lines(
        &self,
        id: &RecordId,
        lines: &[BufferedLine],
    ) -> impl Future<Output = Result<(), RpcError>> + Send;

    fn disconnect(&self) -> impl Future<Output = Result<(), RpcError>> + Send;
}
