use super::fallback::{ConsoleSink, Diagnostic, FallbackSink};
use crate::buffer::RecordBuffer;
use crate::config::{ConfigError, ConnectionConfig, RecordOptions};
use crate::domain::{BufferedLine, Message, RecordEnd, RecordId, Severity};
use crate::rpc::{HttpRecordClient, RecordClient, RpcError};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Error, Debug)]
pub enum SenderError {
    #[error("invalid sender options: {0}")]
    InvalidOptions(#[from] ConfigError),
    #[error("sender is closed")]
    Closed,
    #[error("connecting to service: {0}")]
    Connect(#[source] RpcError),
    #[error("creating record: {0}")]
    CreateRecord(#[source] RpcError),
    #[error("flushing buffer: {0}")]
    Flush(#[source] RpcError),
    #[error("closing record: {0}")]
    CloseRecord(#[source] RpcError),
    #[error("closing transport: {0}")]
    Transport(#[source] RpcError),
    #[error("multiple failures: {}", format_failures(.0))]
    Multiple(Vec<SenderError>),
}

fn format_failures(failures: &[SenderError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

struct SenderState {
    buffer: RecordBuffer,
    closed: bool,
    exit_code: Option<i32>,
}

/// Buffered, size-triggered sender for one open record.
///
/// Construction opens the record synchronously: when a sender exists, its
/// [`RecordId`] exists. Content accumulates in an in-memory buffer and is
/// flushed whenever appending would push the running payload size strictly
/// past the configured threshold, and once more on close.
///
/// All state sits behind one async lock that is held across flush calls to
/// the service, so sends are serialized behind an in-progress flush. The
/// sender is `&self` throughout, made for sharing via `Arc` across tasks.
///
/// Callers must [`close`](Self::close) the sender when done; dropping it
/// without closing leaves the record open on the backend and discards any
/// buffered content.
pub struct StreamingSender<C: RecordClient> {
    client: C,
    record_id: RecordId,
    owns_transport: bool,
    split_lines: bool,
    threshold: Severity,
    fallback: Arc<dyn FallbackSink>,
    cancellation: Option<CancellationToken>,
    state: Mutex<SenderState>,
}

impl<C: RecordClient> fmt::Debug for StreamingSender<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingSender")
            .field("record_id", &self.record_id)
            .field("owns_transport", &self.owns_transport)
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

impl StreamingSender<HttpRecordClient> {
    /// Dials the service and opens a record. The transport is owned by the
    /// sender and torn down when it closes.
    pub async fn open(
        config: ConnectionConfig,
        options: RecordOptions,
    ) -> Result<Self, SenderError> {
        config.validate()?;
        if config.is_secure() && (config.api_user.is_none() || config.api_key.is_none()) {
            return Err(SenderError::InvalidOptions(ConfigError::InvalidConfig(
                "must specify API credentials when making a secure connection".to_string(),
            )));
        }

        let client =
            HttpRecordClient::new(config, options.payload).map_err(SenderError::Connect)?;
        Self::with_transport(client, true, options).await
    }
}

impl<C: RecordClient> StreamingSender<C> {
    /// Opens a record over a caller-supplied transport. The transport stays
    /// the caller's responsibility and is not torn down on close.
    pub async fn with_client(client: C, options: RecordOptions) -> Result<Self, SenderError> {
        Self::with_transport(client, false, options).await
    }

    async fn with_transport(
        client: C,
        owns_transport: bool,
        mut options: RecordOptions,
    ) -> Result<Self, SenderError> {
        options.validate()?;
        let fallback = options
            .fallback
            .clone()
            .unwrap_or_else(|| Arc::new(ConsoleSink::new()));
        let cancellation = options.cancellation.clone();

        let metadata = options.metadata(Utc::now())?;
        let record_id =
            match guard_rpc(cancellation.as_ref(), client.create_record(&metadata)).await {
                Ok(id) => id,
                Err(err) => {
                    fallback.accept(Diagnostic::error(format!("creating record: {err}")));
                    return Err(SenderError::CreateRecord(err));
                }
            };
        debug!(record_id = %record_id, "record opened");

        Ok(Self {
            client,
            record_id,
            owns_transport,
            split_lines: !options.disable_newline_splitting,
            threshold: options.severity_threshold,
            fallback,
            cancellation,
            state: Mutex::new(SenderState {
                buffer: RecordBuffer::new(options.max_buffer_size),
                closed: false,
                exit_code: None,
            }),
        })
    }

    /// The backend-assigned id of the record this sender feeds.
    pub fn record_id(&self) -> &RecordId {
        &self.record_id
    }

    /// Buffers a leveled message, flushing first whenever a line would push
    /// the buffer past its threshold.
    ///
    /// Errors never reach the caller: a failed flush routes one diagnostic
    /// to the fallback sink, drops the line that triggered it, and leaves
    /// the rest of the buffer for a later attempt. Messages below the
    /// severity threshold are discarded without side effects. The content is
    /// split on newlines (empty segments dropped) unless splitting was
    /// disabled in the options.
    pub async fn send(&self, message: Message) {
        let captured_at = Utc::now();
        let mut state = self.state.lock().await;
        if state.closed {
            self.fallback
                .accept(Diagnostic::error("cannot send after close"));
            return;
        }
        if !self.threshold.allows(message.severity) {
            return;
        }

        for line in self.split(captured_at, &message.content) {
            if state.buffer.would_overflow(line.payload_len()) {
                if let Err(err) = self.flush_locked(&mut state).await {
                    self.fallback
                        .accept(Diagnostic::error(format!("flushing buffer: {err}")));
                    return;
                }
            }
            state.buffer.push(line);
        }
    }

    /// Buffers an opaque byte chunk, splitting it at threshold boundaries so
    /// no flushed batch exceeds the configured size. Unlike [`send`](Self::send),
    /// failures are returned to the caller.
    pub async fn send_data(&self, data: &[u8]) -> Result<(), SenderError> {
        let captured_at = Utc::now();
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(SenderError::Closed);
        }

        let mut rest = data;
        while !rest.is_empty() {
            let capacity = state.buffer.remaining_capacity();
            if rest.len() <= capacity {
                state
                    .buffer
                    .push(BufferedLine::chunk(captured_at, Bytes::copy_from_slice(rest)));
                break;
            }
            let (head, tail) = rest.split_at(capacity);
            if !head.is_empty() {
                state
                    .buffer
                    .push(BufferedLine::chunk(captured_at, Bytes::copy_from_slice(head)));
            }
            self.flush_locked(&mut state)
                .await
                .map_err(SenderError::Flush)?;
            rest = tail;
        }
        Ok(())
    }

    /// Flushes buffered content now, regardless of size. After close this
    /// is a quiet no-op; the closing flush already drained the buffer.
    pub async fn flush(&self) -> Result<(), SenderError> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Ok(());
        }
        self.flush_locked(&mut state).await.map_err(SenderError::Flush)
    }

    /// Records the exit code reported when the record closes. May be called
    /// repeatedly; the last value before close wins. After close this has
    /// no effect.
    pub async fn set_exit_code(&self, exit_code: i32) {
        let mut state = self.state.lock().await;
        if state.closed {
            return;
        }
        state.exit_code = Some(exit_code);
    }

    /// Closes the record: flushes remaining content, reports terminal state
    /// (exit code and completion time), and tears down the transport when
    /// the sender owns it.
    ///
    /// The sender is unusable afterwards whether or not errors occurred;
    /// repeated calls are no-ops returning `Ok`. Every failure along the
    /// sequence is collected and returned together; a flush failure skips
    /// the close call but transport teardown still runs.
    pub async fn close(&self) -> Result<(), SenderError> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Ok(());
        }
        state.closed = true;
        let completed_at = Utc::now();
        let mut failures: Vec<SenderError> = Vec::new();

        if let Err(err) = self.flush_locked(&mut state).await {
            self.fallback
                .accept(Diagnostic::error(format!("flushing buffer: {err}")));
            failures.push(SenderError::Flush(err));
        }

        if failures.is_empty() {
            let end = RecordEnd {
                exit_code: state.exit_code.unwrap_or(0),
                completed_at,
            };
            match self
                .guard(self.client.close_record(&self.record_id, &end))
                .await
            {
                Ok(()) => {
                    debug!(record_id = %self.record_id, exit_code = end.exit_code, "record closed");
                }
                Err(err) => {
                    self.fallback
                        .accept(Diagnostic::error(format!("closing record: {err}")));
                    failures.push(SenderError::CloseRecord(err));
                }
            }
        }

        if self.owns_transport
            && let Err(err) = self.guard(self.client.disconnect()).await
        {
            failures.push(SenderError::Transport(err));
        }

        match failures.len() {
            0 => Ok(()),
            1 => Err(failures.remove(0)),
            _ => Err(SenderError::Multiple(failures)),
        }
    }

    fn split(&self, captured_at: DateTime<Utc>, content: &str) -> Vec<BufferedLine> {
        if self.split_lines {
            content
                .split('\n')
                .filter(|segment| !segment.is_empty())
                .map(|segment| BufferedLine::text(captured_at, segment))
                .collect()
        } else {
            vec![BufferedLine::text(captured_at, content)]
        }
    }

    /// Sends the whole buffer as one batch and clears it only on success, so
    /// a failed flush leaves the content intact.
    async fn flush_locked(&self, state: &mut SenderState) -> Result<(), RpcError> {
        if state.buffer.is_empty() {
            return Ok(());
        }
        let lines = state.buffer.len();
        let bytes = state.buffer.current_size();
        self.guard(self.client.append_lines(&self.record_id, state.buffer.lines()))
            .await?;
        state.buffer.clear();
        debug!(record_id = %self.record_id, lines, bytes, "buffer flushed");
        Ok(())
    }

    async fn guard<T>(
        &self,
        fut: impl Future<Output = Result<T, RpcError>>,
    ) -> Result<T, RpcError> {
        guard_rpc(self.cancellation.as_ref(), fut).await
    }
}

/// Races a service call against cancellation. A token cancelled up front
/// fails the call before it is issued.
async fn guard_rpc<T>(
    cancellation: Option<&CancellationToken>,
    fut: impl Future<Output = Result<T, RpcError>>,
) -> Result<T, RpcError> {
    match cancellation {
        Some(token) => {
            if token.is_cancelled() {
                return Err(RpcError::Cancelled);
            }
            tokio::select! {
                () = token.cancelled() => Err(RpcError::Cancelled),
                result = fut => result,
            }
        }
        None => fut.await,
    }
}
