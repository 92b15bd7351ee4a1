//! Traffic Server - always-on city traffic simulation.
//!
//! Reads JSON control commands from stdin, writes tick reports and control
//! events to stdout as JSON lines. Logs go to stderr.

use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use traffic_core::GridRouter;
use traffic_server::clock::SimulationClock;
use traffic_server::config::Config;
use traffic_server::control;
use traffic_server::loops;
use traffic_server::persistence::FileLogSink;
use traffic_server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("traffic_server=debug".parse()?)
                .add_directive("traffic_core=info".parse()?),
        )
        .init();

    tracing::info!("Starting Traffic Server...");

    let config = Config::from_env();
    let state = Arc::new(AppState::new(&config));
    // Lattice spacing is exact at the starting city only.
    let reference_lat = state.region().center().lat;
    let router = Arc::new(GridRouter::new(config.grid_spacing_m, reference_lat));
    let clock = Arc::new(SimulationClock::new(state.clone(), router, &config));

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let (report_tx, _) = broadcast::channel(64);
    let (event_tx, event_rx) = mpsc::channel(256);

    let mut tasks = Vec::new();
    tasks.push(tokio::spawn(loops::publish_loop::run_publish_loop(
        tokio::io::stdout(),
        report_tx.subscribe(),
        event_rx,
        shutdown_tx.subscribe(),
    )));
    if let Some(path) = config.log_path.clone() {
        tasks.push(tokio::spawn(loops::log_persist_loop::run_log_persist_loop(
            Box::new(FileLogSink::new(path)),
            report_tx.subscribe(),
            shutdown_tx.subscribe(),
        )));
    }
    tasks.push(tokio::spawn(loops::tick_loop::run_tick_loop(
        clock,
        config.tick_interval,
        config.tick_dt_secs,
        report_tx,
        shutdown_tx.subscribe(),
    )));

    // Greet new readers with the initial status and obstacle set.
    let _ = event_tx.send(control::ControlEvent::Status(state.status())).await;
    let _ = event_tx
        .send(control::ControlEvent::ObstaclesReset {
            obstacles: state.list_obstacles(),
        })
        .await;

    let control_state = state.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if let Some(event) = control::handle_line(&control_state, &line) {
                        if event_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                }
                Ok(None) => {
                    tracing::info!("Control input closed; simulation keeps running");
                    break;
                }
                Err(err) => {
                    tracing::warn!("Control input failed: {}", err);
                    break;
                }
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    let _ = shutdown_tx.send(());
    for task in tasks {
        if let Err(err) = task.await {
            tracing::warn!("Background task ended abnormally: {}", err);
        }
    }

    Ok(())
}
