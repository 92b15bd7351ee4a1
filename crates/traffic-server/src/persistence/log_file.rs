//! Append-only CSV file of log lines.

use std::path::PathBuf;

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use traffic_core::LogLine;

use super::LogSink;

#[derive(Debug, Clone)]
pub struct FileLogSink {
    path: PathBuf,
}

impl FileLogSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append one CSV row per line, creating the file on first use.
    async fn write_rows(&self, lines: &[LogLine]) -> Result<()> {
        if lines.is_empty() {
            return Ok(());
        }
        let mut buf = String::with_capacity(lines.len() * 64);
        for line in lines {
            buf.push_str(&line.to_string());
            buf.push('\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("opening log file {}", self.path.display()))?;
        file.write_all(buf.as_bytes())
            .await
            .with_context(|| format!("writing log file {}", self.path.display()))?;
        file.flush().await?;
        Ok(())
    }
}

impl LogSink for FileLogSink {
    fn append<'a>(&'a self, lines: &'a [LogLine]) -> BoxFuture<'a, Result<()>> {
        self.write_rows(lines).boxed()
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
