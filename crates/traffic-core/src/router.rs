//! Road-graph routing boundary.
//!
//! The shortest-path engine is an external collaborator. The simulation only
//! needs two queries from it, captured by [`RoadGraphRouter`]. Two
//! self-contained implementations ship with the crate:
//!
//! - **`StraightLineRouter`**: every point is routable, a route is the chord
//!   between its endpoints.
//! - **`GridRouter`**: a synthetic Manhattan street lattice, so the engine can
//!   run without a road database.

use serde::{Deserialize, Serialize};

use crate::error::RouteError;
use crate::models::{Coordinate, RouteResult};
use crate::region::RegionBounds;
use crate::spatial::{haversine_distance, path_length_m, PROJECTION_RADIUS_M};

/// A routable vertex of the road graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: u64,
    /// Snapped position of the vertex
    pub location: Coordinate,
}

/// Trait for road-graph backends. Implementations are loaded once, never
/// mutated afterwards and must answer concurrent queries.
pub trait RoadGraphRouter: Send + Sync {
    /// Snap a coordinate to the nearest routable vertex.
    fn resolve(&self, at: Coordinate) -> Result<Vertex, RouteError>;

    /// Shortest path between two resolved vertices.
    fn calculate(&self, from: &Vertex, to: &Vertex) -> Result<RouteResult, RouteError>;
}

// ---------------------------------------------------------------------------
// Straight-line router
// ---------------------------------------------------------------------------

/// Routes as the crow flies at a fixed speed.
#[derive(Debug, Clone)]
pub struct StraightLineRouter {
    coverage: Option<RegionBounds>,
    speed_mps: f64,
}

impl Default for StraightLineRouter {
    fn default() -> Self {
        Self {
            coverage: None,
            speed_mps: 13.9,
        }
    }
}

impl StraightLineRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only coordinates inside `bounds` resolve.
    pub fn with_coverage(mut self, bounds: RegionBounds) -> Self {
        self.coverage = Some(bounds);
        self
    }
}

impl RoadGraphRouter for StraightLineRouter {
    fn resolve(&self, at: Coordinate) -> Result<Vertex, RouteError> {
        let covered = self.coverage.map_or(true, |bounds| bounds.contains(at));
        if !at.is_finite() || !covered {
            return Err(RouteError::resolution(at));
        }
        Ok(Vertex { id: 0, location: at })
    }

    fn calculate(&self, from: &Vertex, to: &Vertex) -> Result<RouteResult, RouteError> {
        let coordinates = if from.location == to.location {
            vec![from.location]
        } else {
            vec![from.location, to.location]
        };
        let distance = path_length_m(&coordinates);
        Ok(RouteResult {
            coordinates,
            distance,
            time: distance / self.speed_mps,
        })
    }
}

// ---------------------------------------------------------------------------
// Grid router
// ---------------------------------------------------------------------------

const METERS_PER_DEG: f64 = PROJECTION_RADIUS_M * std::f64::consts::PI / 180.0;
const MAX_ROUTABLE_LAT: f64 = 85.0;
/// Free-flow speed used for lattice travel times
const GRID_SPEED_MPS: f64 = 13.9;
/// Longest lattice walk answered before reporting no route
const MAX_LATTICE_HOPS: u64 = 20_000;

/// Manhattan street lattice with fixed spacing in degrees.
///
/// Streets run along parallels and meridians. Spacing is given in meters at
/// a reference latitude; away from it the east-west spacing drifts with
/// `cos(lat)`. Routes go east/west along the start row first, then north/south,
/// visiting every intersection on the way.
#[derive(Debug, Clone)]
pub struct GridRouter {
    lat_step: f64,
    lng_step: f64,
    snap_tolerance_m: f64,
}

impl GridRouter {
    /// Lattice with `spacing_m` between streets, measured at `reference_lat`.
    ///
    /// East-west spacing is fixed here: used far from `reference_lat` (after
    /// switching to another city, say) streets drift apart or together by
    /// the ratio of the two latitudes' cosines.
    pub fn new(spacing_m: f64, reference_lat: f64) -> Self {
        let spacing_m = spacing_m.max(1.0);
        let cos_lat = reference_lat
            .clamp(-MAX_ROUTABLE_LAT, MAX_ROUTABLE_LAT)
            .to_radians()
            .cos();
        Self {
            lat_step: spacing_m / METERS_PER_DEG,
            lng_step: spacing_m / (METERS_PER_DEG * cos_lat),
            snap_tolerance_m: spacing_m,
        }
    }

    pub fn with_snap_tolerance(mut self, tolerance_m: f64) -> Self {
        self.snap_tolerance_m = tolerance_m.max(0.0);
        self
    }

    fn node(&self, row: i32, col: i32) -> Coordinate {
        Coordinate::new(row as f64 * self.lat_step, col as f64 * self.lng_step)
    }
}

fn pack(row: i32, col: i32) -> u64 {
    ((row as u32 as u64) << 32) | (col as u32 as u64)
}

fn unpack(id: u64) -> (i32, i32) {
    ((id >> 32) as u32 as i32, id as u32 as i32)
}

impl RoadGraphRouter for GridRouter {
    fn resolve(&self, at: Coordinate) -> Result<Vertex, RouteError> {
        if !at.is_finite() || at.lat.abs() > MAX_ROUTABLE_LAT {
            return Err(RouteError::resolution(at));
        }
        let row = (at.lat / self.lat_step).round() as i32;
        let col = (at.lng / self.lng_step).round() as i32;
        let location = self.node(row, col);
        if haversine_distance(at, location) > self.snap_tolerance_m {
            return Err(RouteError::resolution(at));
        }
        Ok(Vertex {
            id: pack(row, col),
            location,
        })
    }

    fn calculate(&self, from: &Vertex, to: &Vertex) -> Result<RouteResult, RouteError> {
        let (row1, col1) = unpack(from.id);
        let (row2, col2) = unpack(to.id);

        let hops = (row1 as i64 - row2 as i64).unsigned_abs() + (col1 as i64 - col2 as i64).unsigned_abs();
        if hops > MAX_LATTICE_HOPS {
            return Err(RouteError::NoRoute {
                from: from.id,
                to: to.id,
            });
        }

        let mut coordinates = Vec::with_capacity(hops as usize + 1);
        coordinates.push(self.node(row1, col1));
        let col_step = (col2 - col1).signum();
        let mut col = col1;
        while col != col2 {
            col += col_step;
            coordinates.push(self.node(row1, col));
        }
        let row_step = (row2 - row1).signum();
        let mut row = row1;
        while row != row2 {
            row += row_step;
            coordinates.push(self.node(row, col2));
        }

        let distance = path_length_m(&coordinates);
        Ok(RouteResult {
            coordinates,
            distance,
            time: distance / GRID_SPEED_MPS,
        })
    }
}
