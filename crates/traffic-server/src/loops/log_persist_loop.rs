//! Log line persistence loop.
//!
//! Buffers the log lines of every tick report and appends them to the log
//! file once per flush interval, backing off while the file is unwritable.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::interval;

use traffic_core::LogLine;

use crate::backoff::Backoff;
use crate::clock::TickReport;
use crate::persistence::LogSink;

const LOG_FLUSH_SECS: u64 = 1;
const LOG_BACKOFF_MAX_SECS: u64 = 30;
/// Pending lines kept while the sink is failing; older lines are dropped first
const MAX_PENDING_LINES: usize = 100_000;

pub async fn run_log_persist_loop(
    sink: Box<dyn LogSink>,
    mut reports: broadcast::Receiver<Arc<TickReport>>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(Duration::from_secs(LOG_FLUSH_SECS));
    let mut backoff = Backoff::new(
        Duration::from_secs(LOG_FLUSH_SECS),
        Duration::from_secs(LOG_BACKOFF_MAX_SECS),
    );
    let mut pending: Vec<LogLine> = Vec::new();
    tracing::info!("Persisting log lines to {}", sink.describe());

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Log persistence loop shutting down");
                break;
            }
            received = reports.recv() => {
                match received {
                    Ok(report) => {
                        pending.extend(report.log_lines.iter().cloned());
                        trim_pending(&mut pending);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Log persistence lagged, {} report(s) skipped", skipped);
                    }
                    Err(RecvError::Closed) => {
                        tracing::info!("Report channel closed");
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                if pending.is_empty() || !backoff.ready() {
                    continue;
                }
                match sink.append(&pending).await {
                    Ok(()) => {
                        pending.clear();
                        backoff.reset();
                    }
                    Err(err) => {
                        let delay = backoff.fail();
                        tracing::warn!(
                            "Log flush failed: {:#} (backing off {:?})",
                            err,
                            delay
                        );
                    }
                }
            }
        }
    }

    if pending.is_empty() {
        return;
    }
    if let Err(err) = sink.append(&pending).await {
        tracing::warn!("Final log flush failed, {} line(s) lost: {:#}", pending.len(), err);
    }
}

fn trim_pending(pending: &mut Vec<LogLine>) {
    if pending.len() > MAX_PENDING_LINES {
        let excess = pending.len() - MAX_PENDING_LINES;
        pending.drain(..excess);
        tracing::warn!("Dropped {} unflushed log line(s)", excess);
    }
}
