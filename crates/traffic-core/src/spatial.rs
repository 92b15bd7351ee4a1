//! Spatial math for obstacle checks, movement and reporting.

use crate::models::Coordinate;

/// Mean Earth radius used for great-circle distances.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Equatorial radius used by the local planar projection.
pub const PROJECTION_RADIUS_M: f64 = 6_378_137.0;

/// Calculate distance between two points in meters using Haversine formula.
///
/// # Arguments
/// * `a`, `b` - Coordinates in decimal degrees
///
/// # Returns
/// Distance in meters
pub fn haversine_distance(a: Coordinate, b: Coordinate) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let dphi = (b.lat - a.lat).to_radians();
    let dlambda = (b.lng - a.lng).to_radians();
    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Forward azimuth from `a` to `b` in degrees, 0 = north, 90 = east.
///
/// Coincident points have no direction; they report 0.
pub fn bearing_deg(a: Coordinate, b: Coordinate) -> f64 {
    if a == b {
        return 0.0;
    }
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let delta_lambda = (b.lng - a.lng).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    let theta = x.atan2(y).to_degrees();
    if !theta.is_finite() {
        return 0.0;
    }
    (theta + 360.0) % 360.0
}

/// Straight chord interpolation in degree space.
///
/// Only a short-distance approximation of moving along the great circle.
pub fn lerp(a: Coordinate, b: Coordinate, t: f64) -> Coordinate {
    Coordinate::new(a.lat + (b.lat - a.lat) * t, a.lng + (b.lng - a.lng) * t)
}

/// Total haversine length of a polyline in meters.
pub fn path_length_m(path: &[Coordinate]) -> f64 {
    path.windows(2)
        .map(|pair| haversine_distance(pair[0], pair[1]))
        .sum()
}

// ==== Local planar frame ====
// Equirectangular projection centered on a reference point. Valid at
// sub-kilometer scale; error grows with latitude and segment length.

/// Planar (east, north) frame in meters around an origin coordinate.
#[derive(Debug, Clone, Copy)]
pub struct LocalFrame {
    origin: Coordinate,
    cos_lat: f64,
}

impl LocalFrame {
    pub fn new(origin: Coordinate) -> Self {
        Self {
            origin,
            cos_lat: origin.lat.to_radians().cos(),
        }
    }

    pub fn origin(&self) -> Coordinate {
        self.origin
    }

    /// Project a coordinate to `(x, y)` meters east/north of the origin.
    pub fn project(&self, c: Coordinate) -> (f64, f64) {
        let x = (c.lng - self.origin.lng).to_radians() * PROJECTION_RADIUS_M * self.cos_lat;
        let y = (c.lat - self.origin.lat).to_radians() * PROJECTION_RADIUS_M;
        (x, y)
    }

    /// Inverse of [`LocalFrame::project`].
    pub fn unproject(&self, x: f64, y: f64) -> Coordinate {
        let lat = self.origin.lat + (y / PROJECTION_RADIUS_M).to_degrees();
        let scale = (PROJECTION_RADIUS_M * self.cos_lat).max(1e-9);
        let lng = self.origin.lng + (x / scale).to_degrees();
        Coordinate::new(lat, lng)
    }

    /// Points evenly spaced on a circle of `radius_m` around the origin,
    /// starting due east and turning counter-clockwise.
    pub fn ring(&self, radius_m: f64, points: usize) -> Vec<Coordinate> {
        let step = std::f64::consts::TAU / points.max(1) as f64;
        (0..points)
            .map(|i| {
                let angle = step * i as f64;
                self.unproject(angle.cos() * radius_m, angle.sin() * radius_m)
            })
            .collect()
    }
}

/// Calculate minimum distance from a point to a line segment (in meters).
///
/// The segment is projected into a [`LocalFrame`] centered on the point and
/// the closest point uses the projection parameter clamped to `[0, 1]`.
pub fn distance_to_segment_m(point: Coordinate, seg_start: Coordinate, seg_end: Coordinate) -> f64 {
    let frame = LocalFrame::new(point);
    let (ax, ay) = frame.project(seg_start);
    let (bx, by) = frame.project(seg_end);

    let abx = bx - ax;
    let aby = by - ay;
    let seg_len_sq = abx * abx + aby * aby;

    // Project point onto segment line: t = ((P-A) · (B-A)) / |B-A|², with P at the origin
    let t = if seg_len_sq > 0.0 {
        ((-ax * abx - ay * aby) / seg_len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let closest_x = ax + abx * t;
    let closest_y = ay + aby * t;

    (closest_x * closest_x + closest_y * closest_y).sqrt()
}
