//! Server configuration from environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use traffic_core::PlannerConfig;

#[derive(Debug, Clone)]
pub struct Config {
    /// Wall-clock period between ticks
    pub tick_interval: Duration,
    /// Simulated seconds advanced per tick
    pub tick_dt_secs: f64,
    pub seed: Option<u64>,
    pub city_key: String,
    pub region_size_km: u32,
    pub max_cars: usize,
    pub spawn_every_ticks: u32,
    pub spawn_attempts: usize,
    pub avoid_iterations: usize,
    pub detour_candidates: usize,
    pub detour_margin_m: f64,
    pub grid_spacing_m: f64,
    /// CSV sink for log lines; unset disables persistence
    pub log_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(1000),
            tick_dt_secs: 1.0,
            seed: None,
            city_key: "kostanay".to_string(),
            region_size_km: 3,
            max_cars: 100,
            spawn_every_ticks: 1,
            spawn_attempts: 20,
            avoid_iterations: 5,
            detour_candidates: 8,
            detour_margin_m: 60.0,
            grid_spacing_m: 150.0,
            log_path: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            tick_interval: parse_env::<u64>("TRAFFIC_TICK_MS")
                .map(|ms| Duration::from_millis(ms.max(10)))
                .unwrap_or(defaults.tick_interval),
            tick_dt_secs: parse_env("TRAFFIC_DT_SECS")
                .filter(|dt: &f64| dt.is_finite() && *dt > 0.0)
                .unwrap_or(defaults.tick_dt_secs),
            seed: parse_env("TRAFFIC_SEED"),
            city_key: env::var("TRAFFIC_CITY").unwrap_or(defaults.city_key),
            region_size_km: parse_env("TRAFFIC_REGION_KM").unwrap_or(defaults.region_size_km),
            max_cars: parse_env("TRAFFIC_MAX_CARS").unwrap_or(defaults.max_cars),
            spawn_every_ticks: parse_env("TRAFFIC_SPAWN_EVERY")
                .unwrap_or(defaults.spawn_every_ticks),
            spawn_attempts: parse_env("TRAFFIC_SPAWN_ATTEMPTS").unwrap_or(defaults.spawn_attempts),
            avoid_iterations: parse_env("TRAFFIC_AVOID_ITERATIONS")
                .unwrap_or(defaults.avoid_iterations),
            detour_candidates: parse_env("TRAFFIC_DETOUR_CANDIDATES")
                .unwrap_or(defaults.detour_candidates),
            detour_margin_m: parse_env("TRAFFIC_DETOUR_MARGIN_M")
                .filter(|m: &f64| m.is_finite() && *m >= 0.0)
                .unwrap_or(defaults.detour_margin_m),
            grid_spacing_m: parse_env("TRAFFIC_GRID_SPACING_M")
                .filter(|m: &f64| m.is_finite() && *m > 0.0)
                .unwrap_or(defaults.grid_spacing_m),
            log_path: env::var("TRAFFIC_LOG_PATH")
                .ok()
                .filter(|path| !path.trim().is_empty()),
        }
    }

    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig {
            detour_candidates: self.detour_candidates,
            safety_margin_m: self.detour_margin_m,
            max_iterations: self.avoid_iterations,
        }
    }
}

fn parse_env<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
