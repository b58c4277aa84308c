//! The buffered sender and its diagnostic fallback channel.
//!
//! [`StreamingSender`] owns one open record on the service and batches
//! content toward it; [`FallbackSink`] is where diagnostics go when the
//! service cannot be reached on paths that do not return errors.

pub mod fallback;
pub mod streaming;

pub use fallback::{ConsoleSink, Diagnostic, FallbackSink};
pub use streaming::{SenderError, StreamingSender};
