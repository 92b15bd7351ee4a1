//! Durable output for per-tick log lines.

mod log_file;

use futures::future::BoxFuture;

use traffic_core::LogLine;

pub use log_file::FileLogSink;

/// Destination for log lines. A failed append must leave the sink usable;
/// the caller keeps the lines and retries.
pub trait LogSink: Send + Sync {
    fn append<'a>(&'a self, lines: &'a [LogLine]) -> BoxFuture<'a, anyhow::Result<()>>;

    /// Human-readable destination for logs.
    fn describe(&self) -> String;
}
