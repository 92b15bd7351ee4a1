//! Active simulation region.

use serde::{Deserialize, Serialize};

use crate::models::Coordinate;

pub const MIN_SIZE_KM: u32 = 1;
pub const MAX_SIZE_KM: u32 = 50;

const KM_PER_DEG_LAT: f64 = 110.57;
const KM_PER_DEG_LNG_EQUATOR: f64 = 111.32;
/// Narrowest span kept on either axis after normalisation
const MIN_SPAN_DEG: f64 = 1e-4;

/// Axis-aligned bounding box in degrees with `south < north` and `west < east`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl RegionBounds {
    /// Square region of `size_km` (clamped to `[1, 50]`) centred on `center`.
    pub fn around(center: Coordinate, size_km: u32) -> Self {
        let size_km = clamp_size_km(size_km) as f64;
        let lat = center.lat.clamp(-89.0, 89.0);
        let d_lat = size_km / KM_PER_DEG_LAT / 2.0;
        let d_lng = size_km / (KM_PER_DEG_LNG_EQUATOR * lat.to_radians().cos()) / 2.0;
        Self {
            south: lat - d_lat,
            west: center.lng - d_lng,
            north: lat + d_lat,
            east: center.lng + d_lng,
        }
    }

    /// Build from raw edges, swapping reversed edges and widening degenerate ones.
    ///
    /// Returns `None` when any edge is not finite.
    pub fn from_edges(south: f64, west: f64, north: f64, east: f64) -> Option<Self> {
        if ![south, west, north, east].iter().all(|v| v.is_finite()) {
            return None;
        }
        let (south, north) = normalise_span(
            south.clamp(-90.0, 90.0),
            north.clamp(-90.0, 90.0),
        );
        let (west, east) = normalise_span(
            west.clamp(-180.0, 180.0),
            east.clamp(-180.0, 180.0),
        );
        Some(Self {
            south,
            west,
            north,
            east,
        })
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    pub fn contains(&self, c: Coordinate) -> bool {
        c.lat >= self.south && c.lat <= self.north && c.lng >= self.west && c.lng <= self.east
    }

    pub fn is_valid(&self) -> bool {
        self.south < self.north && self.west < self.east
    }
}

pub fn clamp_size_km(size_km: u32) -> u32 {
    size_km.clamp(MIN_SIZE_KM, MAX_SIZE_KM)
}

fn normalise_span(a: f64, b: f64) -> (f64, f64) {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    if hi - lo >= MIN_SPAN_DEG {
        return (lo, hi);
    }
    let mid = (lo + hi) / 2.0;
    (mid - MIN_SPAN_DEG / 2.0, mid + MIN_SPAN_DEG / 2.0)
}
