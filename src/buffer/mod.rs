//! Pending-payload accumulation for an open record.
//!
//! `RecordBuffer` keeps lines in arrival order next to a running byte count,
//! so the overflow check never has to rescan the queue. The buffer does not
//! flush itself; the sender decides when, holding its own lock.

use crate::domain::BufferedLine;

/// Ordered accumulation of buffered lines with a byte-size threshold.
///
/// Invariant: `current_size` always equals the sum of `payload_len()` over
/// the held lines. `push` is unconditional; callers consult
/// [`would_overflow`](Self::would_overflow) first when they want the
/// flush-before-append behavior, which is what permits a single oversized
/// line to sit in the buffer on its own.
#[derive(Debug)]
pub struct RecordBuffer {
    lines: Vec<BufferedLine>,
    current_size: usize,
    max_size: usize,
}

impl RecordBuffer {
    pub fn new(max_size: usize) -> Self {
        Self {
            lines: Vec::new(),
            current_size: 0,
            max_size,
        }
    }

    pub fn push(&mut self, line: BufferedLine) {
        self.current_size += line.payload_len();
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[BufferedLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn current_size(&self) -> usize {
        self.current_size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// True when appending `additional` payload bytes would push the buffer
    /// strictly past its threshold. A payload landing exactly on the
    /// threshold still fits.
    pub fn would_overflow(&self, additional: usize) -> bool {
        self.current_size + additional > self.max_size
    }

    /// Bytes that still fit without crossing the threshold. Zero when an
    /// oversized line has already pushed the buffer past it.
    pub fn remaining_capacity(&self) -> usize {
        self.max_size.saturating_sub(self.current_size)
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.current_size = 0;
    }
}
