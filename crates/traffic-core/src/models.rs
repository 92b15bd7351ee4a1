//! Core data models for the traffic simulation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::spatial::distance_to_segment_m;

/// Category that marks a road incident; every other category is a generic obstruction.
pub const INCIDENT_CATEGORY: &str = "incident";

const INCIDENT_RADIUS_M: f64 = 30.0;
const DEFAULT_RADIUS_M: f64 = 40.0;

/// Geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

/// A circular exclusion zone placed on the road network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub category: String,
    /// Exclusion radius in meters, fixed by the category
    pub radius: f64,
}

impl Obstacle {
    pub fn new(id: impl Into<String>, lat: f64, lng: f64, category: impl Into<String>) -> Self {
        let category = category.into();
        let radius = radius_for_category(&category);
        Self {
            id: id.into(),
            lat,
            lng,
            category,
            radius,
        }
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }

    /// Check if the segment `a`-`b` passes within the obstacle radius.
    pub fn intersects(&self, a: Coordinate, b: Coordinate) -> bool {
        // Canonical endpoint order keeps the result identical under a swap.
        let (first, second) = if (a.lat, a.lng) <= (b.lat, b.lng) {
            (a, b)
        } else {
            (b, a)
        };
        distance_to_segment_m(self.center(), first, second) <= self.radius
    }
}

/// Exclusion radius in meters for an obstacle category.
pub fn radius_for_category(category: &str) -> f64 {
    if category == INCIDENT_CATEGORY {
        INCIDENT_RADIUS_M
    } else {
        DEFAULT_RADIUS_M
    }
}

/// A simulated vehicle following a road path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Car {
    pub id: String,
    pub position: Coordinate,
    pub destination: Coordinate,
    pub path: Vec<Coordinate>,
    /// Index of the last path point reached; always `< path.len()`
    pub path_index: usize,
    /// Meters covered on the leg from `path[path_index]` to the next point
    #[serde(default)]
    pub leg_progress_m: f64,
    pub speed_mps: f64,
}

impl Car {
    /// True once the last path point has been reached.
    pub fn at_end(&self) -> bool {
        self.path_index + 1 >= self.path.len()
    }

    pub fn next_point(&self) -> Option<Coordinate> {
        self.path.get(self.path_index + 1).copied()
    }

    /// Path still ahead of the car, starting one point behind the current index.
    pub fn remaining_path(&self) -> &[Coordinate] {
        let from = self.path_index.saturating_sub(1).min(self.path.len());
        &self.path[from..]
    }

    /// Swap in a freshly planned path and restart progress along it.
    pub fn replace_path(&mut self, path: Vec<Coordinate>) {
        self.path = path;
        self.path_index = 0;
        self.leg_progress_m = 0.0;
    }

    /// Heading for reporting: toward the next point, else along the last leg, else 0.
    pub fn reporting_bearing(&self) -> f64 {
        if let Some(next) = self.next_point() {
            return crate::spatial::bearing_deg(self.position, next);
        }
        if self.path_index > 0 {
            if let Some(prev) = self.path.get(self.path_index - 1) {
                return crate::spatial::bearing_deg(*prev, self.position);
            }
        }
        0.0
    }
}

/// Result of a road-graph route query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteResult {
    pub coordinates: Vec<Coordinate>,
    /// Total distance in meters
    pub distance: f64,
    /// Total travel time in seconds
    pub time: f64,
}

/// Output of the detour search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedRoute {
    pub path: Vec<Coordinate>,
    /// Still crosses an obstacle; returned when no detour candidate worked
    pub blocked: bool,
    /// Number of via points stitched into the route
    pub detours: usize,
}

/// Position of a car as published each tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarPosition {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
}

impl From<&Car> for CarPosition {
    fn from(car: &Car) -> Self {
        Self {
            id: car.id.clone(),
            lat: car.position.lat,
            lng: car.position.lng,
        }
    }
}

/// One telemetry row per car per tick.
///
/// Serializes as the CSV line `id,lat,lng,altitude,speed,bearing` with six decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "String")]
pub struct LogLine {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub altitude: f64,
    pub speed: f64,
    pub bearing: f64,
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6},{:.6}",
            self.id, self.lat, self.lng, self.altitude, self.speed, self.bearing
        )
    }
}

impl From<LogLine> for String {
    fn from(line: LogLine) -> Self {
        line.to_string()
    }
}
