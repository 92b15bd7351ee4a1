//! Error taxonomy for routing and spawning.
//!
//! None of these are fatal to the simulation: callers recover by skipping a
//! spawn or removing the affected car.

use thiserror::Error;

use crate::models::Coordinate;

#[derive(Debug, Error)]
pub enum RouteError {
    /// No routable vertex within tolerance of the coordinate.
    #[error("no routable vertex near ({lat}, {lng})")]
    Resolution { lat: f64, lng: f64 },

    /// The road graph has no path connecting the two vertices.
    #[error("no route between vertex {from} and vertex {to}")]
    NoRoute { from: u64, to: u64 },

    /// The detour search used its whole iteration budget.
    #[error("route still blocked after {iterations} detour iteration(s)")]
    Unresolved { iterations: usize },

    #[error("routing worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl RouteError {
    pub fn resolution(at: Coordinate) -> Self {
        RouteError::Resolution {
            lat: at.lat,
            lng: at.lng,
        }
    }
}

#[derive(Debug, Error)]
pub enum SpawnError {
    /// No start/end pair produced a usable route.
    #[error("no usable route found after {attempts} spawn attempt(s)")]
    Failed { attempts: usize },
}
