//! Per-tick simulation driver.
//!
//! One tick spawns (subject to cadence and capacity), moves every car of a
//! snapshot, re-checks the path ahead of each car against the current
//! obstacles and only then assembles the published report. Reroutes are
//! awaited inside the tick so no reader ever sees a path mid-rewrite.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use traffic_core::{
    advance, Car, CarPosition, LogLine, RoadGraphRouter, RoutePlanner, SpawnController,
    SpawnGate, SpawnOutcome, StepOutcome,
};

use crate::config::Config;
use crate::state::AppState;

const MIN_ALTITUDE_M: f64 = 250.0;
const MAX_ALTITUDE_M: f64 = 450.0;

/// Everything a tick produced, ready for publishing.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub published_at: DateTime<Utc>,
    pub spawn: SpawnOutcome,
    pub arrived: Vec<String>,
    pub rerouted: Vec<String>,
    pub removed: Vec<String>,
    pub car_positions: Vec<CarPosition>,
    pub log_lines: Vec<LogLine>,
}

/// What happened to one car during the movement phase.
enum CarStep {
    Arrived,
    Moved(Car),
    Rerouted(Car),
    Removed,
}

pub struct SimulationClock {
    state: Arc<AppState>,
    planner: RoutePlanner,
    spawner: SpawnController,
    gate: Mutex<SpawnGate>,
    ticks: AtomicU64,
}

impl SimulationClock {
    pub fn new(state: Arc<AppState>, router: Arc<dyn RoadGraphRouter>, config: &Config) -> Self {
        let planner = RoutePlanner::new(router, state.obstacles().clone(), config.planner_config());
        let spawner = SpawnController {
            max_attempts: config.spawn_attempts.max(1),
        };
        Self::with_parts(state, planner, spawner)
    }

    pub fn with_parts(state: Arc<AppState>, planner: RoutePlanner, spawner: SpawnController) -> Self {
        Self {
            state,
            planner,
            spawner,
            gate: Mutex::new(SpawnGate::default()),
            ticks: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    pub fn planner(&self) -> &RoutePlanner {
        &self.planner
    }

    /// Run one full tick of `dt` simulated seconds.
    pub async fn tick(&self, dt: f64) -> TickReport {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
        let spawn = self.spawn_step().await;

        let mut arrived = Vec::new();
        let mut rerouted = Vec::new();
        let mut removed = Vec::new();

        for car in self.state.fleet().snapshot() {
            let id = car.id.clone();
            match self.step_car(car, dt).await {
                CarStep::Arrived => {
                    self.state.fleet().remove(&id);
                    arrived.push(id);
                }
                CarStep::Removed => {
                    self.state.fleet().remove(&id);
                    removed.push(id);
                }
                CarStep::Moved(car) => {
                    self.write_back(car);
                }
                CarStep::Rerouted(car) => {
                    if self.write_back(car) {
                        rerouted.push(id);
                    }
                }
            }
        }

        if !arrived.is_empty() || !removed.is_empty() {
            tracing::debug!(
                "Tick {}: {} arrived, {} removed, {} rerouted",
                tick,
                arrived.len(),
                removed.len(),
                rerouted.len()
            );
        }

        let (car_positions, log_lines) = self.report_cars();
        TickReport {
            tick,
            published_at: Utc::now(),
            spawn,
            arrived,
            rerouted,
            removed,
            car_positions,
            log_lines,
        }
    }

    async fn spawn_step(&self) -> SpawnOutcome {
        let settings = self.state.settings();
        let skipped = self
            .gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .check(settings.spawn_every_sec, self.state.fleet().len(), settings.max_cars);
        if let Some(outcome) = skipped {
            return outcome;
        }

        match self
            .spawner
            .try_spawn(&self.planner, settings.region, self.state.rng())
            .await
        {
            Ok(car) => {
                let car_id = car.id.clone();
                if self.state.insert_spawned(car, settings.generation) {
                    SpawnOutcome::Spawned { car_id }
                } else {
                    tracing::debug!("Dropped car {} planned for a previous region", car_id);
                    SpawnOutcome::Discarded { car_id }
                }
            }
            Err(err) => {
                tracing::debug!("Spawn skipped: {}", err);
                SpawnOutcome::Failed {
                    attempts: self.spawner.max_attempts,
                }
            }
        }
    }

    async fn step_car(&self, mut car: Car, dt: f64) -> CarStep {
        if advance(&mut car, dt) == StepOutcome::Arrived {
            return CarStep::Arrived;
        }
        if !self.planner.route_blocked(car.remaining_path()) {
            return CarStep::Moved(car);
        }

        tracing::warn!("Car {} path is blocked, rerouting", car.id);
        let plan = self
            .planner
            .route_with_avoidance(
                car.position,
                car.destination,
                self.planner.config().max_iterations,
            )
            .await;
        match plan {
            Ok(plan) if !plan.blocked && plan.path.len() >= 2 => {
                tracing::info!(
                    "Car {} rerouted with {} detour(s), {} path points",
                    car.id,
                    plan.detours,
                    plan.path.len()
                );
                car.replace_path(plan.path);
                CarStep::Rerouted(car)
            }
            Ok(_) => {
                tracing::warn!("Car {} has no clear route, removing", car.id);
                CarStep::Removed
            }
            Err(err) => {
                tracing::warn!("Car {} reroute failed: {}, removing", car.id, err);
                CarStep::Removed
            }
        }
    }

    /// Store the stepped car unless it was removed while the tick ran.
    fn write_back(&self, stepped: Car) -> bool {
        let id = stepped.id.clone();
        self.state.fleet().update(&id, move |car| *car = stepped)
    }

    fn report_cars(&self) -> (Vec<CarPosition>, Vec<LogLine>) {
        let cars = self.state.fleet().snapshot();
        let mut rng = self.state.rng().lock().unwrap_or_else(PoisonError::into_inner);
        let positions = cars.iter().map(CarPosition::from).collect();
        let lines = cars
            .iter()
            .map(|car| LogLine {
                id: car.id.clone(),
                lat: car.position.lat,
                lng: car.position.lng,
                altitude: rng.uniform(MIN_ALTITUDE_M, MAX_ALTITUDE_M),
                speed: car.speed_mps,
                bearing: car.reporting_bearing(),
            })
            .collect();
        (positions, lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use traffic_core::{Coordinate, RouteError, RouteResult, SimRng, StraightLineRouter, Vertex};

    /// Switches city the first time it is asked to route, like a user
    /// changing city while a spawn is being planned.
    struct CitySwitchingRouter {
        state: Arc<AppState>,
        switched: AtomicBool,
        inner: StraightLineRouter,
    }

    impl RoadGraphRouter for CitySwitchingRouter {
        fn resolve(&self, at: Coordinate) -> Result<Vertex, RouteError> {
            if !self.switched.swap(true, Ordering::SeqCst) {
                self.state.set_city("berlin");
            }
            self.inner.resolve(at)
        }

        fn calculate(&self, from: &Vertex, to: &Vertex) -> Result<RouteResult, RouteError> {
            self.inner.calculate(from, to)
        }
    }

    fn clock() -> SimulationClock {
        let config = Config::default();
        let state = Arc::new(AppState::with_rng(&config, SimRng::seeded(11)));
        SimulationClock::new(state, Arc::new(StraightLineRouter::new()), &config)
    }

    fn car_between(id: &str, a: Coordinate, b: Coordinate, speed_mps: f64) -> Car {
        Car {
            id: id.to_string(),
            position: a,
            destination: b,
            path: vec![a, b],
            path_index: 0,
            leg_progress_m: 0.0,
            speed_mps,
        }
    }

    #[tokio::test]
    async fn first_tick_spawns_and_reports_the_car() {
        let clock = clock();
        let report = clock.tick(1.0).await;
        assert_eq!(report.tick, 1);
        let SpawnOutcome::Spawned { car_id } = &report.spawn else {
            panic!("expected a spawn, got {:?}", report.spawn);
        };
        assert_eq!(report.car_positions.len(), 1);
        assert_eq!(&report.car_positions[0].id, car_id);
        let line = &report.log_lines[0];
        assert!((MIN_ALTITUDE_M..MAX_ALTITUDE_M).contains(&line.altitude));
        assert!((5.0..18.0).contains(&line.speed));
    }

    #[tokio::test]
    async fn spawn_planned_before_city_switch_is_discarded() {
        let config = Config::default();
        let state = Arc::new(AppState::with_rng(&config, SimRng::seeded(11)));
        let router = Arc::new(CitySwitchingRouter {
            state: state.clone(),
            switched: AtomicBool::new(false),
            inner: StraightLineRouter::new(),
        });
        let clock = SimulationClock::new(state.clone(), router, &config);

        let report = clock.tick(1.0).await;
        assert!(matches!(report.spawn, SpawnOutcome::Discarded { .. }), "{:?}", report.spawn);
        assert_eq!(state.status().city_key, "berlin");
        assert!(state.fleet().is_empty());

        let next = clock.tick(1.0).await;
        assert!(matches!(next.spawn, SpawnOutcome::Spawned { .. }));
        let berlin = state.region();
        assert!(next
            .car_positions
            .iter()
            .all(|p| berlin.contains(Coordinate::new(p.lat, p.lng))));
    }

    #[tokio::test]
    async fn removed_car_is_not_resurrected_by_write_back() {
        let clock = clock();
        let center = clock.state().region().center();
        let car = car_between("ghost", center, Coordinate::new(center.lat + 0.01, center.lng), 10.0);
        clock.state().fleet().insert(car.clone());
        clock.state().fleet().remove("ghost");
        assert!(!clock.write_back(car));
        assert!(clock.state().fleet().get("ghost").is_none());
    }

    #[tokio::test]
    async fn arriving_car_is_removed_in_the_same_tick() {
        let clock = clock();
        clock.state().apply_settings(3, 1, 1, true);
        let center = clock.state().region().center();
        let car = car_between("short", center, Coordinate::new(center.lat + 0.0001, center.lng), 18.0);
        clock.state().fleet().insert(car);

        let report = clock.tick(1.0).await;
        assert_eq!(report.spawn, SpawnOutcome::SkippedCapacity);
        assert_eq!(report.arrived, vec!["short".to_string()]);
        assert!(clock.state().fleet().is_empty());
        assert!(report.car_positions.is_empty());
    }
}
