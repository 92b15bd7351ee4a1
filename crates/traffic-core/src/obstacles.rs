//! Concurrent registry of circular obstacles.

use dashmap::DashMap;
use uuid::Uuid;

use crate::models::{Coordinate, Obstacle};

/// Thread-safe store of obstacles keyed by id.
///
/// Readers work on [`ObstacleRegistry::list`] snapshots, so obstacles added or
/// removed mid-check never disturb an iteration already in progress.
#[derive(Debug, Default)]
pub struct ObstacleRegistry {
    obstacles: DashMap<String, Obstacle>,
}

impl ObstacleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a new obstacle; its radius follows from the category.
    pub fn add(&self, lat: f64, lng: f64, category: &str) -> Obstacle {
        let obstacle = Obstacle::new(Uuid::new_v4().to_string(), lat, lng, category);
        self.obstacles.insert(obstacle.id.clone(), obstacle.clone());
        tracing::info!(
            "Added {} obstacle {} at ({:.6}, {:.6}) r={}m",
            obstacle.category,
            obstacle.id,
            lat,
            lng,
            obstacle.radius
        );
        obstacle
    }

    /// Remove an obstacle. Returns false when the id is unknown.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.obstacles.remove(id).is_some();
        if removed {
            tracing::info!("Removed obstacle {}", id);
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<Obstacle> {
        self.obstacles.get(id).map(|entry| entry.value().clone())
    }

    /// Point-in-time copy of every obstacle.
    pub fn list(&self) -> Vec<Obstacle> {
        self.obstacles.iter().map(|r| r.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    pub fn clear(&self) {
        self.obstacles.clear();
    }
}

/// True iff any consecutive segment of `path` intersects any obstacle.
///
/// Paths with fewer than two points have no segments and are never blocked.
pub fn path_blocked(path: &[Coordinate], obstacles: &[Obstacle]) -> bool {
    path.windows(2).any(|seg| {
        obstacles
            .iter()
            .any(|obstacle| obstacle.intersects(seg[0], seg[1]))
    })
}

/// Every distinct obstacle crossed by `path`, in order of first contact.
pub fn obstacles_hit<'a>(path: &[Coordinate], obstacles: &'a [Obstacle]) -> Vec<&'a Obstacle> {
    let mut hits: Vec<&Obstacle> = Vec::new();
    for seg in path.windows(2) {
        for obstacle in obstacles {
            if hits.iter().any(|hit| hit.id == obstacle.id) {
                continue;
            }
            if obstacle.intersects(seg[0], seg[1]) {
                hits.push(obstacle);
            }
        }
    }
    hits
}
