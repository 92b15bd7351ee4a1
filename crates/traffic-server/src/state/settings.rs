//! Runtime-adjustable simulation settings.
//!
//! Every setter clamps its input into range; nothing here is ever rejected.

use serde::Serialize;
use traffic_core::region::clamp_size_km;
use traffic_core::{Coordinate, RegionBounds};

/// Known cities as `(key, lat, lng)`.
pub const CITIES: &[(&str, f64, f64)] = &[
    ("kostanay", 53.219, 63.635),
    ("astana", 51.1694, 71.4491),
    ("almaty", 43.238, 76.945),
    ("moscow", 55.7558, 37.6173),
    ("berlin", 52.52, 13.405),
];

const DEFAULT_CITY: &str = "kostanay";
const MAX_CARS_RANGE: (i64, i64) = (1, 300);
const SPAWN_EVERY_RANGE: (i64, i64) = (1, 20);
const SIZE_KM_RANGE: (i64, i64) = (1, 50);

pub fn city_center(key: &str) -> Option<Coordinate> {
    CITIES
        .iter()
        .find(|(name, _, _)| *name == key)
        .map(|(_, lat, lng)| Coordinate::new(*lat, *lng))
}

#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    pub city_key: String,
    pub region: RegionBounds,
    pub region_size_km: u32,
    pub max_cars: usize,
    /// Spawn cadence in ticks (seconds at the default 1 Hz)
    pub spawn_every_sec: u32,
    pub show_route: bool,
    /// Bumped whenever the region changes
    #[serde(skip)]
    pub generation: u64,
}

impl Settings {
    /// Settings for `city_key`, falling back to the default city when unknown.
    pub fn new(city_key: &str, region_size_km: u32, max_cars: usize, spawn_every_sec: u32) -> Self {
        let (key, center) = match city_center(city_key) {
            Some(center) => (city_key, center),
            None => {
                tracing::warn!("Unknown city '{}', using {}", city_key, DEFAULT_CITY);
                (DEFAULT_CITY, city_center(DEFAULT_CITY).unwrap_or(Coordinate::new(0.0, 0.0)))
            }
        };
        let region_size_km = clamp_size_km(region_size_km);
        Self {
            city_key: key.to_string(),
            region: RegionBounds::around(center, region_size_km),
            region_size_km,
            max_cars: clamp(max_cars as i64, MAX_CARS_RANGE) as usize,
            spawn_every_sec: clamp(spawn_every_sec as i64, SPAWN_EVERY_RANGE) as u32,
            show_route: true,
            generation: 0,
        }
    }

    /// Apply user settings; the region keeps its center and takes the new size.
    pub fn apply(&mut self, region_size_km: i64, max_cars: i64, spawn_every_sec: i64, show_route: bool) {
        self.region_size_km = clamp(region_size_km, SIZE_KM_RANGE) as u32;
        self.max_cars = clamp(max_cars, MAX_CARS_RANGE) as usize;
        self.spawn_every_sec = clamp(spawn_every_sec, SPAWN_EVERY_RANGE) as u32;
        self.show_route = show_route;
        self.region = RegionBounds::around(self.region.center(), self.region_size_km);
        self.generation += 1;
    }

    /// Switch city. Returns false for an unknown key, leaving settings untouched.
    pub fn set_city(&mut self, key: &str) -> bool {
        let Some(center) = city_center(key) else {
            return false;
        };
        self.city_key = key.to_string();
        self.region = RegionBounds::around(center, self.region_size_km);
        self.generation += 1;
        true
    }

    /// Replace the region with explicit edges. Returns false for non-finite input.
    pub fn set_region(&mut self, south: f64, west: f64, north: f64, east: f64) -> bool {
        match RegionBounds::from_edges(south, west, north, east) {
            Some(region) => {
                self.region = region;
                self.generation += 1;
                true
            }
            None => false,
        }
    }
}

/// Snapshot of the simulation for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub running: bool,
    pub city_key: String,
    pub city_center: Option<Coordinate>,
    pub region: RegionBounds,
    pub region_size_km: u32,
    pub max_cars: usize,
    pub spawn_every_sec: u32,
    pub show_route: bool,
    pub current_car_count: usize,
}

fn clamp(value: i64, (lo, hi): (i64, i64)) -> i64 {
    value.clamp(lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_city_falls_back_to_default() {
        let settings = Settings::new("atlantis", 3, 100, 1);
        assert_eq!(settings.city_key, "kostanay");
        assert!(settings.region.contains(Coordinate::new(53.219, 63.635)));
    }

    #[test]
    fn apply_clamps_every_value() {
        let mut settings = Settings::new("berlin", 3, 100, 1);
        settings.apply(0, -4, 999, false);
        assert_eq!(settings.region_size_km, 1);
        assert_eq!(settings.max_cars, 1);
        assert_eq!(settings.spawn_every_sec, 20);
        assert!(!settings.show_route);

        settings.apply(80, 1_000, 0, true);
        assert_eq!(settings.region_size_km, 50);
        assert_eq!(settings.max_cars, 300);
        assert_eq!(settings.spawn_every_sec, 1);
        assert!(settings.region.is_valid());
    }

    #[test]
    fn apply_keeps_region_center() {
        let mut settings = Settings::new("almaty", 3, 100, 1);
        let before = settings.region.center();
        settings.apply(10, 50, 2, true);
        let after = settings.region.center();
        assert!((before.lat - after.lat).abs() < 1e-9);
        assert!((before.lng - after.lng).abs() < 1e-9);
        assert!(settings.region.north - settings.region.south > 0.08);
    }

    #[test]
    fn set_city_moves_region_and_ignores_unknown_keys() {
        let mut settings = Settings::new("kostanay", 3, 100, 1);
        assert!(settings.set_city("moscow"));
        assert!(settings.region.contains(Coordinate::new(55.7558, 37.6173)));

        let region = settings.region;
        assert!(!settings.set_city("nowhere"));
        assert_eq!(settings.city_key, "moscow");
        assert_eq!(settings.region, region);
    }

    #[test]
    fn bounds_stay_ordered_after_every_update() {
        let mut settings = Settings::new("astana", 3, 100, 1);
        assert!(settings.region.is_valid());
        settings.set_region(51.3, 71.6, 51.1, 71.3);
        assert!(settings.region.is_valid());
        settings.set_region(51.1, 71.3, 51.1, 71.3);
        assert!(settings.region.is_valid());
        assert!(!settings.set_region(f64::NAN, 71.3, 51.1, 71.6));
        assert!(settings.region.is_valid());
        settings.set_city("berlin");
        assert!(settings.region.is_valid());
        settings.apply(25, 10, 3, true);
        assert!(settings.region.is_valid());
    }

    #[test]
    fn region_changes_bump_generation() {
        let mut settings = Settings::new("astana", 3, 100, 1);
        assert_eq!(settings.generation, 0);
        settings.set_city("nowhere");
        settings.set_region(f64::NAN, 0.0, 1.0, 1.0);
        assert_eq!(settings.generation, 0);

        settings.set_city("moscow");
        settings.set_region(55.7, 37.5, 55.8, 37.7);
        settings.apply(5, 10, 1, true);
        assert_eq!(settings.generation, 3);
    }
}
