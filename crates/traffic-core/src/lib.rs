pub mod error;
pub mod fleet;
pub mod models;
pub mod motion;
pub mod obstacles;
pub mod planner;
pub mod region;
pub mod rng;
pub mod router;
pub mod spatial;
pub mod spawn;

pub use error::{RouteError, SpawnError};
pub use fleet::CarFleet;
pub use models::{
    Car, CarPosition, Coordinate, LogLine, Obstacle, PlannedRoute, RouteResult, INCIDENT_CATEGORY,
};
pub use motion::{advance, StepOutcome};
pub use obstacles::{path_blocked, ObstacleRegistry};
pub use planner::{PlannerConfig, RoutePlanner};
pub use region::RegionBounds;
pub use rng::SimRng;
pub use router::{GridRouter, RoadGraphRouter, StraightLineRouter, Vertex};
pub use spatial::{bearing_deg, haversine_distance};
pub use spawn::{SpawnController, SpawnGate, SpawnOutcome};
