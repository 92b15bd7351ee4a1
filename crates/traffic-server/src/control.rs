//! Line-oriented control surface.
//!
//! Each input line is one JSON [`ControlCommand`]; each command yields at
//! most one [`ControlEvent`] for the publisher.

use serde::{Deserialize, Serialize};

use traffic_core::{Coordinate, Obstacle, INCIDENT_CATEGORY};

use crate::state::{AppState, Status};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlCommand {
    Status,
    ListObstacles,
    AddObstacle {
        lat: f64,
        lng: f64,
        #[serde(default = "default_category")]
        category: String,
    },
    RemoveObstacle {
        id: String,
    },
    SetCity {
        key: String,
    },
    SetRegion {
        south: f64,
        west: f64,
        north: f64,
        east: f64,
    },
    ApplySettings {
        region_size_km: i64,
        max_cars: i64,
        spawn_every_sec: i64,
        #[serde(default = "default_show_route")]
        show_route: bool,
    },
    RequestRoute {
        car_id: String,
    },
}

fn default_category() -> String {
    INCIDENT_CATEGORY.to_string()
}

fn default_show_route() -> bool {
    true
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlEvent {
    Status(Status),
    ObstaclesReset { obstacles: Vec<Obstacle> },
    ObstacleAdded(Obstacle),
    ObstacleRemoved { id: String },
    RouteResult { car_id: String, coordinates: Vec<Coordinate> },
    Error { message: String },
}

/// Parse and apply one input line.
pub fn handle_line(state: &AppState, line: &str) -> Option<ControlEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str::<ControlCommand>(line) {
        Ok(command) => apply_command(state, command),
        Err(err) => {
            tracing::warn!("Rejected control line: {}", err);
            Some(ControlEvent::Error {
                message: format!("invalid command: {}", err),
            })
        }
    }
}

pub fn apply_command(state: &AppState, command: ControlCommand) -> Option<ControlEvent> {
    match command {
        ControlCommand::Status => Some(ControlEvent::Status(state.status())),
        ControlCommand::ListObstacles => Some(ControlEvent::ObstaclesReset {
            obstacles: state.list_obstacles(),
        }),
        ControlCommand::AddObstacle { lat, lng, category } => {
            if !Coordinate::new(lat, lng).is_finite() {
                return Some(ControlEvent::Error {
                    message: "obstacle coordinates must be finite".to_string(),
                });
            }
            Some(ControlEvent::ObstacleAdded(state.add_obstacle(lat, lng, &category)))
        }
        ControlCommand::RemoveObstacle { id } => {
            if state.remove_obstacle(&id) {
                Some(ControlEvent::ObstacleRemoved { id })
            } else {
                Some(ControlEvent::Error {
                    message: format!("unknown obstacle {}", id),
                })
            }
        }
        ControlCommand::SetCity { key } => {
            state.set_city(&key);
            Some(ControlEvent::Status(state.status()))
        }
        ControlCommand::SetRegion {
            south,
            west,
            north,
            east,
        } => {
            state.set_region(south, west, north, east);
            Some(ControlEvent::Status(state.status()))
        }
        ControlCommand::ApplySettings {
            region_size_km,
            max_cars,
            spawn_every_sec,
            show_route,
        } => {
            state.apply_settings(region_size_km, max_cars, spawn_every_sec, show_route);
            Some(ControlEvent::Status(state.status()))
        }
        ControlCommand::RequestRoute { car_id } => {
            // Only paths with more than one point are published.
            let coordinates = state.path_for_car(&car_id).filter(|path| path.len() > 1)?;
            Some(ControlEvent::RouteResult {
                car_id,
                coordinates,
            })
        }
    }
}
