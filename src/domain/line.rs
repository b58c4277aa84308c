use super::severity::Severity;
use bytes::Bytes;
use chrono::{DateTime, Utc};

/// A leveled message handed to the sender by a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub severity: Severity,
    pub content: String,
}

impl Message {
    pub fn new(severity: Severity, content: impl Into<String>) -> Self {
        Self {
            severity,
            content: content.into(),
        }
    }
}

/// One buffered unit awaiting flush: a line of text or an opaque byte
/// fragment, stamped with the wall-clock time it was handed over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferedLine {
    pub captured_at: DateTime<Utc>,
    pub payload: LinePayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinePayload {
    Text(String),
    Chunk(Bytes),
}

impl BufferedLine {
    pub fn text(captured_at: DateTime<Utc>, text: impl Into<String>) -> Self {
        Self {
            captured_at,
            payload: LinePayload::Text(text.into()),
        }
    }

    pub fn chunk(captured_at: DateTime<Utc>, data: impl Into<Bytes>) -> Self {
        Self {
            captured_at,
            payload: LinePayload::Chunk(data.into()),
        }
    }

    /// Payload bytes this unit contributes to the running buffer size.
    /// Timestamps and framing do not count toward the flush threshold.
    pub fn payload_len(&self) -> usize {
        match &self.payload {
            LinePayload::Text(text) => text.len(),
            LinePayload::Chunk(data) => data.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_len_counts_payload_bytes_only() {
        let now = Utc::now();
        assert_eq!(BufferedLine::text(now, "hello").payload_len(), 5);
        assert_eq!(BufferedLine::text(now, "").payload_len(), 0);
        let chunk = BufferedLine::chunk(now, Bytes::from_static(&[0u8; 16]));
        assert_eq!(chunk.payload_len(), 16);
    }

    #[test]
    fn test_text_length_is_byte_length_not_char_count() {
        let line = BufferedLine::text(Utc::now(), "héllo");
        assert_eq!(line.payload_len(), 6);
    }
}
