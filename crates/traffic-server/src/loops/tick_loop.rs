//! Fixed-rate simulation driver.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};

use crate::clock::{SimulationClock, TickReport};

/// Run one tick per `period` until shutdown, broadcasting every report.
pub async fn run_tick_loop(
    clock: Arc<SimulationClock>,
    period: Duration,
    dt: f64,
    reports: broadcast::Sender<Arc<TickReport>>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::info!("Tick loop started: period {:?}, dt {}s", period, dt);

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Tick loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                let report = clock.tick(dt).await;
                // Fails only when nobody is subscribed.
                let _ = reports.send(Arc::new(report));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::state::AppState;
    use traffic_core::{SimRng, StraightLineRouter};

    #[tokio::test(start_paused = true)]
    async fn publishes_reports_until_shutdown() {
        let config = Config::default();
        let state = Arc::new(AppState::with_rng(&config, SimRng::seeded(5)));
        let clock = Arc::new(SimulationClock::new(
            state,
            Arc::new(StraightLineRouter::new()),
            &config,
        ));
        let (report_tx, mut report_rx) = broadcast::channel(8);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let handle = tokio::spawn(run_tick_loop(
            clock,
            Duration::from_secs(1),
            1.0,
            report_tx,
            shutdown_rx,
        ));

        let first = report_rx.recv().await.unwrap();
        let second = report_rx.recv().await.unwrap();
        assert_eq!(first.tick, 1);
        assert_eq!(second.tick, 2);

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
