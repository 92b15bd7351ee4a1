//! In-memory state store shared by the tick driver and the control surface.

use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use traffic_core::{Car, CarFleet, Coordinate, Obstacle, ObstacleRegistry, RegionBounds, SimRng};

use super::settings::{city_center, Settings, Status};
use crate::config::Config;

/// Application state: obstacles, cars, settings and the simulation generator.
pub struct AppState {
    obstacles: Arc<ObstacleRegistry>,
    fleet: CarFleet,
    settings: RwLock<Settings>,
    rng: Mutex<SimRng>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self::with_rng(config, SimRng::from_seed_opt(config.seed))
    }

    pub fn with_rng(config: &Config, rng: SimRng) -> Self {
        Self {
            obstacles: Arc::new(ObstacleRegistry::new()),
            fleet: CarFleet::new(),
            settings: RwLock::new(Settings::new(
                &config.city_key,
                config.region_size_km,
                config.max_cars,
                config.spawn_every_ticks,
            )),
            rng: Mutex::new(rng),
        }
    }

    pub fn obstacles(&self) -> &Arc<ObstacleRegistry> {
        &self.obstacles
    }

    pub fn fleet(&self) -> &CarFleet {
        &self.fleet
    }

    pub fn rng(&self) -> &Mutex<SimRng> {
        &self.rng
    }

    pub fn settings(&self) -> Settings {
        self.read_settings().clone()
    }

    pub fn region(&self) -> RegionBounds {
        self.read_settings().region
    }

    pub fn status(&self) -> Status {
        let settings = self.read_settings();
        Status {
            running: true,
            city_key: settings.city_key.clone(),
            city_center: city_center(&settings.city_key),
            region: settings.region,
            region_size_km: settings.region_size_km,
            max_cars: settings.max_cars,
            spawn_every_sec: settings.spawn_every_sec,
            show_route: settings.show_route,
            current_car_count: self.fleet.len(),
        }
    }

    // ==== Obstacles ====

    pub fn list_obstacles(&self) -> Vec<Obstacle> {
        self.obstacles.list()
    }

    pub fn add_obstacle(&self, lat: f64, lng: f64, category: &str) -> Obstacle {
        self.obstacles.add(lat, lng, category)
    }

    pub fn remove_obstacle(&self, id: &str) -> bool {
        self.obstacles.remove(id)
    }

    // ==== Settings ====

    /// Switch to a known city and drop every car. Unknown keys change nothing.
    pub fn set_city(&self, key: &str) -> bool {
        let mut settings = self.write_settings();
        let changed = settings.set_city(key);
        if changed {
            // Cleared under the settings lock so no spawn for the old city slips in.
            self.fleet.clear();
            drop(settings);
            tracing::info!("City set to {}, fleet cleared", key);
        } else {
            tracing::warn!("Ignoring unknown city '{}'", key);
        }
        changed
    }

    pub fn set_region(&self, south: f64, west: f64, north: f64, east: f64) -> bool {
        let applied = self.write_settings().set_region(south, west, north, east);
        if applied {
            tracing::info!("Region set to S{} W{} N{} E{}", south, west, north, east);
        } else {
            tracing::warn!("Ignoring non-finite region S{} W{} N{} E{}", south, west, north, east);
        }
        applied
    }

    pub fn apply_settings(&self, region_size_km: i64, max_cars: i64, spawn_every_sec: i64, show_route: bool) {
        let mut settings = self.write_settings();
        settings.apply(region_size_km, max_cars, spawn_every_sec, show_route);
        tracing::info!(
            "Settings applied: size={}km max_cars={} spawn_every={} show_route={}",
            settings.region_size_km,
            settings.max_cars,
            settings.spawn_every_sec,
            settings.show_route
        );
    }

    // ==== Cars ====

    /// Insert a freshly spawned car unless the region changed since
    /// `generation` was read. Returns false when the car was dropped.
    pub fn insert_spawned(&self, car: Car, generation: u64) -> bool {
        let settings = self.read_settings();
        if settings.generation != generation {
            return false;
        }
        self.fleet.insert(car);
        true
    }

    pub fn path_for_car(&self, id: &str) -> Option<Vec<Coordinate>> {
        self.fleet.path_for(id)
    }

    fn read_settings(&self) -> RwLockReadGuard<'_, Settings> {
        self.settings.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_settings(&self) -> RwLockWriteGuard<'_, Settings> {
        self.settings.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppState {
        AppState::with_rng(&Config::default(), SimRng::seeded(7))
    }

    fn parked_car(id: &str, at: Coordinate) -> Car {
        Car {
            id: id.to_string(),
            position: at,
            destination: at,
            path: vec![at, Coordinate::new(at.lat + 0.001, at.lng)],
            path_index: 0,
            leg_progress_m: 0.0,
            speed_mps: 10.0,
        }
    }

    #[test]
    fn status_reflects_defaults() {
        let status = state().status();
        assert!(status.running);
        assert_eq!(status.city_key, "kostanay");
        assert_eq!(status.region_size_km, 3);
        assert_eq!(status.max_cars, 100);
        assert_eq!(status.spawn_every_sec, 1);
        assert!(status.show_route);
        assert_eq!(status.current_car_count, 0);
    }

    #[test]
    fn set_city_clears_fleet_only_for_known_keys() {
        let state = state();
        let center = state.region().center();
        state.fleet().insert(parked_car("a", center));

        assert!(!state.set_city("gotham"));
        assert_eq!(state.fleet().len(), 1);

        assert!(state.set_city("berlin"));
        assert!(state.fleet().is_empty());
        assert_eq!(state.status().city_key, "berlin");
    }

    #[test]
    fn set_region_keeps_previous_bounds_on_bad_input() {
        let state = state();
        let before = state.region();
        assert!(!state.set_region(f64::INFINITY, 0.0, 1.0, 1.0));
        assert_eq!(state.region(), before);

        assert!(state.set_region(10.0, 20.0, 9.0, 19.0));
        let region = state.region();
        assert_eq!((region.south, region.north), (9.0, 10.0));
        assert_eq!((region.west, region.east), (19.0, 20.0));
    }

    #[test]
    fn obstacle_operations_round_trip_through_registry() {
        let state = state();
        let obstacle = state.add_obstacle(53.2, 63.6, "incident");
        assert_eq!(obstacle.radius, 30.0);
        assert_eq!(state.list_obstacles().len(), 1);
        assert!(state.remove_obstacle(&obstacle.id));
        assert!(!state.remove_obstacle(&obstacle.id));
        assert!(state.list_obstacles().is_empty());
    }

    #[test]
    fn spawn_from_before_city_switch_is_dropped() {
        let state = state();
        let generation = state.settings().generation;
        let car = parked_car("stale", state.region().center());

        assert!(state.set_city("almaty"));
        assert!(!state.insert_spawned(car, generation));
        assert!(state.fleet().is_empty());

        let fresh = parked_car("fresh", state.region().center());
        assert!(state.insert_spawned(fresh, state.settings().generation));
        assert_eq!(state.fleet().len(), 1);
    }

    #[test]
    fn path_for_unknown_car_is_none() {
        let state = state();
        assert!(state.path_for_car("missing").is_none());
        let center = state.region().center();
        state.fleet().insert(parked_car("a", center));
        assert_eq!(state.path_for_car("a").map(|p| p.len()), Some(2));
    }
}
