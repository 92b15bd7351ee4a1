//! Serializes tick reports and control events as JSON lines.

use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;

use crate::clock::TickReport;
use crate::control::ControlEvent;

/// One outbound JSON line.
#[derive(Debug, Serialize)]
#[serde(tag = "channel", content = "payload", rename_all = "snake_case")]
enum Outbound<'a> {
    Tick(&'a TickReport),
    Event(&'a ControlEvent),
}

pub async fn run_publish_loop<W>(
    mut out: W,
    mut reports: broadcast::Receiver<Arc<TickReport>>,
    mut events: mpsc::Receiver<ControlEvent>,
    mut shutdown: broadcast::Receiver<()>,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        let written = tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Publish loop shutting down");
                break;
            }
            received = reports.recv() => match received {
                Ok(report) => write_line(&mut out, &Outbound::Tick(&report)).await,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Publisher lagged, {} tick report(s) skipped", skipped);
                    Ok(())
                }
                Err(RecvError::Closed) => break,
            },
            Some(event) = events.recv() => write_line(&mut out, &Outbound::Event(&event)).await,
        };

        if let Err(err) = written {
            tracing::error!("Publishing failed, stopping: {:#}", err);
            break;
        }
    }
    let _ = out.flush().await;
}

async fn write_line<W>(out: &mut W, message: &Outbound<'_>) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(message)?;
    line.push(b'\n');
    out.write_all(&line).await?;
    out.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use traffic_core::SpawnOutcome;

    #[tokio::test]
    async fn writes_reports_and_events_as_tagged_lines() {
        let (report_tx, report_rx) = broadcast::channel(4);
        let (event_tx, event_rx) = mpsc::channel(4);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let (writer, mut reader) = tokio::io::duplex(64 * 1024);

        let handle = tokio::spawn(run_publish_loop(writer, report_rx, event_rx, shutdown_rx));

        report_tx
            .send(Arc::new(TickReport {
                tick: 7,
                published_at: Utc::now(),
                spawn: SpawnOutcome::SkippedCapacity,
                arrived: Vec::new(),
                rerouted: Vec::new(),
                removed: Vec::new(),
                car_positions: Vec::new(),
                log_lines: Vec::new(),
            }))
            .unwrap();
        event_tx
            .send(ControlEvent::ObstacleRemoved { id: "o1".to_string() })
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut reader, &mut buf).await.unwrap();
        let lines: Vec<serde_json::Value> = String::from_utf8(buf)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        let tick = lines.iter().find(|l| l["channel"] == "tick").unwrap();
        assert_eq!(tick["payload"]["tick"], 7);
        assert_eq!(tick["payload"]["spawn"]["type"], "skipped_capacity");
        let event = lines.iter().find(|l| l["channel"] == "event").unwrap();
        assert_eq!(event["payload"]["type"], "obstacle_removed");
    }
}
