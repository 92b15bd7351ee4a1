//! Car creation under attempt limits and cadence/capacity gating.

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::SpawnError;
use crate::models::Car;
use crate::planner::RoutePlanner;
use crate::region::RegionBounds;
use crate::rng::SimRng;

pub const MIN_SPEED_MPS: f64 = 5.0;
pub const MAX_SPEED_MPS: f64 = 18.0;

/// What the spawn step of a tick did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpawnOutcome {
    Spawned { car_id: String },
    /// Not a spawn tick
    SkippedCadence,
    /// Fleet already at its cap
    SkippedCapacity,
    Failed { attempts: usize },
    /// Region changed while the route was being planned
    Discarded { car_id: String },
}

/// Decides on which ticks a spawn is attempted.
#[derive(Debug, Default)]
pub struct SpawnGate {
    counter: u64,
}

impl SpawnGate {
    /// Count one tick and check cadence (`every` ticks) and capacity.
    pub fn check(&mut self, every: u32, fleet_len: usize, max_cars: usize) -> Option<SpawnOutcome> {
        self.counter += 1;
        if self.counter % u64::from(every.max(1)) != 0 {
            return Some(SpawnOutcome::SkippedCadence);
        }
        if fleet_len >= max_cars {
            return Some(SpawnOutcome::SkippedCapacity);
        }
        None
    }
}

/// Bounded-retry car creation.
#[derive(Debug, Clone)]
pub struct SpawnController {
    pub max_attempts: usize,
}

impl Default for SpawnController {
    fn default() -> Self {
        Self { max_attempts: 20 }
    }
}

impl SpawnController {
    /// Sample start/end pairs inside `bounds` until one yields a route with
    /// at least two points.
    ///
    /// The generator is only locked while sampling, never across a routing query.
    pub async fn try_spawn(
        &self,
        planner: &RoutePlanner,
        bounds: RegionBounds,
        rng: &Mutex<SimRng>,
    ) -> Result<Car, SpawnError> {
        for attempt in 1..=self.max_attempts {
            let (start, end) = {
                let mut rng = rng.lock().unwrap_or_else(PoisonError::into_inner);
                (rng.point_in(&bounds), rng.point_in(&bounds))
            };

            let plan = match planner
                .route_with_avoidance(start, end, planner.config().max_iterations)
                .await
            {
                Ok(plan) => plan,
                Err(err) => {
                    tracing::trace!("Spawn attempt {} failed: {}", attempt, err);
                    continue;
                }
            };
            if plan.path.len() < 2 {
                continue;
            }

            let mut rng = rng.lock().unwrap_or_else(PoisonError::into_inner);
            let car = Car {
                id: rng.car_id(),
                position: plan.path[0],
                destination: end,
                path: plan.path,
                path_index: 0,
                leg_progress_m: 0.0,
                speed_mps: rng.uniform(MIN_SPEED_MPS, MAX_SPEED_MPS),
            };
            tracing::debug!(
                "Spawned car {} after {} attempt(s), {} path points",
                car.id,
                attempt,
                car.path.len()
            );
            return Ok(car);
        }

        Err(SpawnError::Failed {
            attempts: self.max_attempts,
        })
    }
}
