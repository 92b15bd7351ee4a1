//! Route planning with bounded obstacle avoidance.
//!
//! Routes come from the road-graph router; this module only decides whether
//! a route crosses an obstacle and, if so, searches for a detour through via
//! points placed around the offending obstacles. Every routing query is
//! comparatively expensive, so the search is bounded by the number of
//! candidates per obstacle and the number of iterations. It trades
//! completeness for predictable latency: when no candidate clears the
//! obstacles, the best route found so far is returned and flagged as blocked.

use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::error::RouteError;
use crate::models::{Coordinate, Obstacle, PlannedRoute, RouteResult};
use crate::obstacles::{obstacles_hit, path_blocked, ObstacleRegistry};
use crate::router::RoadGraphRouter;
use crate::spatial::LocalFrame;

/// Tuning knobs for the detour search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Via points generated around each obstacle hit
    pub detour_candidates: usize,
    /// Extra clearance beyond the obstacle radius for via points (meters)
    pub safety_margin_m: f64,
    /// Default iteration budget for callers without their own
    pub max_iterations: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            detour_candidates: 8,
            safety_margin_m: 60.0,
            max_iterations: 5,
        }
    }
}

/// Builds routes and steers them around registered obstacles.
#[derive(Clone)]
pub struct RoutePlanner {
    router: Arc<dyn RoadGraphRouter>,
    obstacles: Arc<ObstacleRegistry>,
    config: PlannerConfig,
}

impl RoutePlanner {
    pub fn new(
        router: Arc<dyn RoadGraphRouter>,
        obstacles: Arc<ObstacleRegistry>,
        config: PlannerConfig,
    ) -> Self {
        Self {
            router,
            obstacles,
            config,
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn obstacles(&self) -> &Arc<ObstacleRegistry> {
        &self.obstacles
    }

    /// Resolve both endpoints and ask the router for the route between them.
    pub fn build_route(&self, start: Coordinate, end: Coordinate) -> Result<RouteResult, RouteError> {
        build_route_with(self.router.as_ref(), start, end)
    }

    /// True iff any segment of `path` crosses an obstacle of the current snapshot.
    pub fn route_blocked(&self, path: &[Coordinate]) -> bool {
        if path.len() < 2 {
            return false;
        }
        path_blocked(path, &self.obstacles.list())
    }

    /// Route from `start` to `end`, detouring around obstacles.
    ///
    /// Errors from the direct route propagate. Failing detour candidates are
    /// skipped. Returns a route flagged `blocked` when no candidate around any
    /// obstacle clears the path, and [`RouteError::Unresolved`] when
    /// `max_iterations` rounds end without an unblocked route.
    pub async fn route_with_avoidance(
        &self,
        start: Coordinate,
        end: Coordinate,
        max_iterations: usize,
    ) -> Result<PlannedRoute, RouteError> {
        let mut route = self.build_route_blocking(start, end).await?.coordinates;
        let mut current_start = start;
        let mut current_end = end;
        let mut detours = 0;

        for iteration in 0..max_iterations {
            let obstacles = self.obstacles.list();
            let hits = obstacles_hit(&route, &obstacles);
            if hits.is_empty() {
                return Ok(PlannedRoute {
                    path: route,
                    blocked: false,
                    detours,
                });
            }

            tracing::debug!(
                "Route iteration {} crosses {} obstacle(s), searching detours",
                iteration,
                hits.len()
            );

            match self
                .find_detour(current_start, current_end, &hits, &obstacles)
                .await
            {
                Some(merged) => {
                    current_start = merged.first().copied().unwrap_or(current_start);
                    current_end = merged.last().copied().unwrap_or(current_end);
                    route = merged;
                    detours += 1;
                }
                None => {
                    tracing::debug!("No detour candidate cleared the route; keeping best effort");
                    return Ok(PlannedRoute {
                        path: route,
                        blocked: true,
                        detours,
                    });
                }
            }
        }

        if !self.route_blocked(&route) {
            return Ok(PlannedRoute {
                path: route,
                blocked: false,
                detours,
            });
        }
        Err(RouteError::Unresolved {
            iterations: max_iterations,
        })
    }

    /// First unblocked `start -> via -> end` route over all hits.
    ///
    /// The candidates of one obstacle are queried concurrently; acceptance
    /// follows candidate order so results do not depend on query timing.
    async fn find_detour(
        &self,
        start: Coordinate,
        end: Coordinate,
        hits: &[&Obstacle],
        obstacles: &[Obstacle],
    ) -> Option<Vec<Coordinate>> {
        for hit in hits {
            let frame = LocalFrame::new(hit.center());
            let candidates = frame.ring(
                hit.radius + self.config.safety_margin_m,
                self.config.detour_candidates,
            );

            let attempts = join_all(
                candidates
                    .iter()
                    .map(|via| self.route_via_blocking(start, *via, end)),
            )
            .await;

            for (via, attempt) in candidates.iter().zip(attempts) {
                match attempt {
                    Ok(merged) if !path_blocked(&merged, obstacles) => {
                        tracing::debug!(
                            "Detour around obstacle {} via ({:.6}, {:.6})",
                            hit.id,
                            via.lat,
                            via.lng
                        );
                        return Some(merged);
                    }
                    Ok(_) => {}
                    Err(err) => {
                        tracing::trace!("Detour candidate skipped: {}", err);
                    }
                }
            }
        }
        None
    }

    async fn build_route_blocking(
        &self,
        start: Coordinate,
        end: Coordinate,
    ) -> Result<RouteResult, RouteError> {
        let router = self.router.clone();
        tokio::task::spawn_blocking(move || build_route_with(router.as_ref(), start, end)).await?
    }

    async fn route_via_blocking(
        &self,
        start: Coordinate,
        via: Coordinate,
        end: Coordinate,
    ) -> Result<Vec<Coordinate>, RouteError> {
        let router = self.router.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<Coordinate>, RouteError> {
            let head = build_route_with(router.as_ref(), start, via)?;
            let tail = build_route_with(router.as_ref(), via, end)?;
            Ok(merge_legs(head.coordinates, tail.coordinates))
        })
        .await?
    }
}

fn build_route_with(
    router: &dyn RoadGraphRouter,
    start: Coordinate,
    end: Coordinate,
) -> Result<RouteResult, RouteError> {
    let from = router.resolve(start)?;
    let to = router.resolve(end)?;
    router.calculate(&from, &to)
}

/// Join two legs that share the via point, keeping it once.
fn merge_legs(mut head: Vec<Coordinate>, tail: Vec<Coordinate>) -> Vec<Coordinate> {
    if head.is_empty() {
        return tail;
    }
    head.extend(tail.into_iter().skip(1));
    head
}
