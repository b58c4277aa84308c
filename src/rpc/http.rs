use super::{IdSource, RecordClient, RpcError, uuid_id_source};
use crate::config::ConnectionConfig;
use crate::domain::{BufferedLine, LinePayload, PayloadKind, RecordEnd, RecordId, RecordMetadata};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::write::GzEncoder;
use reqwest::Client;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use tracing::{debug, warn};
use url::Url;

// Bodies smaller than this are not worth compressing.
const COMPRESSION_MIN_BYTES: usize = 1024;

/// One serialized line on the ingest wire.
#[derive(Serialize)]
struct WireLine<'a> {
    timestamp: DateTime<Utc>,
    data: &'a str,
}

#[derive(Deserialize)]
struct CreatedRecord {
    id: String,
}

/// HTTP implementation of [`RecordClient`] against the service's REST
/// ingest endpoints (`/rest/v1/buildlogger`, `/rest/v1/system_metrics`).
///
/// Each client serves one record kind. Transient failures (timeouts,
/// connection errors, 429 and 5xx responses) are retried with exponential
/// backoff per the connection's [`RetryConfig`](super::RetryConfig); other
/// HTTP errors surface immediately.
#[derive(Clone)]
pub struct HttpRecordClient {
    http: Client,
    base: Url,
    kind: PayloadKind,
    config: ConnectionConfig,
    id_source: IdSource,
}

impl fmt::Debug for HttpRecordClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRecordClient")
            .field("base", &self.base.as_str())
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl HttpRecordClient {
    /// Builds a pooled client from connection settings, serving records of
    /// the given payload kind.
    pub fn new(config: ConnectionConfig, kind: PayloadKind) -> Result<Self, RpcError> {
        config
            .validate()
            .map_err(|e| RpcError::InvalidConfig(e.to_string()))?;
        let base: Url = config.base_url.parse().map_err(|e| {
            RpcError::InvalidConfig(format!("invalid base URL '{}': {e}", config.base_url))
        })?;
        let http = config
            .http_client()
            .map_err(|e| RpcError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            http,
            base,
            kind,
            config,
            id_source: uuid_id_source(),
        })
    }

    /// Replaces the request-id generator. Tests use this to make correlation
    /// ids deterministic.
    #[must_use]
    pub fn with_id_source(mut self, id_source: IdSource) -> Self {
        self.id_source = id_source;
        self
    }

    fn ingest_root(&self) -> &'static str {
        match self.kind {
            PayloadKind::Lines => "buildlogger",
            PayloadKind::Bytes => "system_metrics",
        }
    }

    fn ingest_url(&self, segments: &[&str]) -> Result<Url, RpcError> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| RpcError::InvalidConfig("base URL cannot be a base".to_string()))?;
            path.pop_if_empty();
            path.extend(["rest", "v1", self.ingest_root()]);
            path.extend(segments);
        }
        Ok(url)
    }

    /// Headers common to every ingest request. The correlation id is drawn
    /// once per logical operation and stays stable across its retries.
    fn request_headers(&self) -> Result<HeaderMap, RpcError> {
        let mut headers = self
            .config
            .credential_headers()
            .map_err(|e| RpcError::InvalidConfig(e.to_string()))?;
        headers.insert(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_str(&(self.id_source)())
                .map_err(|e| RpcError::InvalidConfig(format!("invalid request id: {e}")))?,
        );
        Ok(headers)
    }

    async fn post_once(
        &self,
        url: &Url,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<reqwest::Response, RpcError> {
        debug!(url = %url, bytes = body.len(), "sending ingest request");
        let response = self
            .http
            .post(url.clone())
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(RpcError::Http {
            status: status.as_u16(),
            message,
        })
    }

    async fn post_with_retry(
        &self,
        url: Url,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<reqwest::Response, RpcError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.post_once(&url, headers.clone(), body.clone()).await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    if !is_retryable(&err) {
                        return Err(err);
                    }
                    if attempt >= self.config.retry.max_attempts {
                        return Err(RpcError::RetriesExhausted {
                            attempts: attempt,
                            source: Box::new(err),
                        });
                    }
                    let delay = self.config.retry.delay_for(attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        url = %url,
                        "transient ingest failure, retrying: {err}"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Compresses the body when enabled and large enough to pay off,
    /// recording the encoding in `headers`.
    fn maybe_compress(&self, headers: &mut HeaderMap, body: Vec<u8>) -> Result<Vec<u8>, RpcError> {
        if self.config.enable_compression && body.len() > COMPRESSION_MIN_BYTES {
            headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
            gzip_body(&body)
        } else {
            Ok(body)
        }
    }
}

impl RecordClient for HttpRecordClient {
    async fn create_record(&self, metadata: &RecordMetadata) -> Result<RecordId, RpcError> {
        let url = self.ingest_url(&[])?;
        let mut headers = self.request_headers()?;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let body = serde_json::to_vec(metadata)?;

        let response = self.post_with_retry(url, headers, body.into()).await?;
        let created: CreatedRecord = response
            .json()
            .await
            .map_err(|e| RpcError::MalformedResponse(format!("invalid create response: {e}")))?;
        if created.id.is_empty() {
            return Err(RpcError::MalformedResponse(
                "create response carried an empty record id".to_string(),
            ));
        }
        debug!(id = %created.id, kind = ?self.kind, "record opened");
        Ok(RecordId::new(created.id))
    }

    async fn append_lines(&self, id: &RecordId, lines: &[BufferedLine]) -> Result<(), RpcError> {
        if lines.is_empty() {
            return Ok(());
        }
        let url = self.ingest_url(&[id.as_str()])?;
        let mut headers = self.request_headers()?;
        let (body, content_type) = encode_payload(lines)?;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        let body = self.maybe_compress(&mut headers, body)?;

        let line_count = lines.len();
        let byte_count = body.len();
        self.post_with_retry(url, headers, body.into()).await?;
        debug!(id = %id, lines = line_count, bytes = byte_count, "payload appended");
        Ok(())
    }

    async fn close_record(&self, id: &RecordId, end: &RecordEnd) -> Result<(), RpcError> {
        let url = self.ingest_url(&[id.as_str(), "close"])?;
        let mut headers = self.request_headers()?;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let body = serde_json::to_vec(end)?;

        self.post_with_retry(url, headers, body.into()).await?;
        debug!(id = %id, exit_code = end.exit_code, "record closed");
        Ok(())
    }

    async fn stream_lines(&self, _id: &RecordId, _lines: &[BufferedLine]) -> Result<(), RpcError> {
        // The service exposes no streaming ingest endpoint; appends cover
        // the same ground batch by batch.
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), RpcError> {
        // Pooled connections are released when the client drops; nothing to
        // tear down eagerly over HTTP.
        debug!(kind = ?self.kind, "record client disconnected");
        Ok(())
    }
}

/// Serializes a flush batch: text lines as NDJSON, anything carrying byte
/// chunks as one concatenated octet stream.
fn encode_payload(lines: &[BufferedLine]) -> Result<(Vec<u8>, &'static str), RpcError> {
    let text_only = lines
        .iter()
        .all(|line| matches!(line.payload, LinePayload::Text(_)));

    if text_only {
        let mut out = Vec::new();
        for line in lines {
            if let LinePayload::Text(text) = &line.payload {
                serde_json::to_writer(
                    &mut out,
                    &WireLine {
                        timestamp: line.captured_at,
                        data: text,
                    },
                )?;
                out.push(b'\n');
            }
        }
        Ok((out, "application/x-ndjson"))
    } else {
        let mut out =
            Vec::with_capacity(lines.iter().map(BufferedLine::payload_len).sum::<usize>());
        for line in lines {
            match &line.payload {
                LinePayload::Text(text) => out.extend_from_slice(text.as_bytes()),
                LinePayload::Chunk(data) => out.extend_from_slice(data),
            }
        }
        Ok((out, "application/octet-stream"))
    }
}

fn gzip_body(body: &[u8]) -> Result<Vec<u8>, RpcError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body)?;
    Ok(encoder.finish()?)
}

fn map_reqwest_error(err: reqwest::Error) -> RpcError {
    if err.is_timeout() {
        RpcError::Timeout(err.to_string())
    } else {
        RpcError::Network(err)
    }
}

fn is_retryable(err: &RpcError) -> bool {
    match err {
        RpcError::Http { status, .. } => *status == 429 || *status >= 500,
        RpcError::Network(_) | RpcError::Timeout(_) => true,
        _ => false,
    }
}
