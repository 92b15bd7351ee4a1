//! Owned, seedable random source for the simulation.
//!
//! One instance drives every random choice of a run (spawn points, car ids,
//! speeds, reported altitude), so a fixed seed reproduces a run exactly.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::Coordinate;
use crate::region::RegionBounds;

pub struct SimRng(StdRng);

impl SimRng {
    pub fn seeded(seed: u64) -> Self {
        SimRng(StdRng::seed_from_u64(seed))
    }

    pub fn from_os() -> Self {
        SimRng(StdRng::from_os_rng())
    }

    /// Seeded when `seed` is given, otherwise drawn from the OS.
    pub fn from_seed_opt(seed: Option<u64>) -> Self {
        seed.map(Self::seeded).unwrap_or_else(Self::from_os)
    }

    /// Uniform value in `[lo, hi)`; returns `lo` for an empty range.
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        if hi > lo {
            self.0.random_range(lo..hi)
        } else {
            lo
        }
    }

    /// Uniformly random point inside `bounds`.
    pub fn point_in(&mut self, bounds: &RegionBounds) -> Coordinate {
        let lat = self.uniform(bounds.south, bounds.north);
        let lng = self.uniform(bounds.west, bounds.east);
        Coordinate::new(lat, lng)
    }

    /// Identifier of the form `<u64>_<u32>`.
    pub fn car_id(&mut self) -> String {
        let high: u64 = self.0.random_range(0..i64::MAX as u64);
        let low: u32 = self.0.random_range(1..i32::MAX as u32);
        format!("{high}_{low}")
    }
}
