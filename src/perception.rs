/*
 * Perception Module
 *
 * Which agents can an agent see? Another agent is visible when it lies
 * within the flockmate range and inside the view cone around the
 * observer's heading. A stationary observer has no heading and sees in
 * every direction.
 *
 * The query is O(n) per agent; with the spatial grid enabled the candidates
 * come from nearby cells instead, and the same exact test is applied.
 */

use glam::Vec2;

use crate::boid::Boid;
use crate::params::{ParamName, SpeciesProfile};
use crate::population::{BoidId, Population};
use crate::spatial_grid::SpatialGrid;
use crate::vector;

// Slack so a 180 degree cone still admits agents directly behind
const ANGLE_EPSILON: f32 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerceptionCone {
    pub range: f32,
    // Half-angle of the cone, radians
    pub view_angle: f32,
}

impl PerceptionCone {
    pub fn new(range: f32, view_angle_degrees: f32) -> Self {
        Self {
            range,
            view_angle: view_angle_degrees.to_radians(),
        }
    }

    // Cone from the species' flockmate range and view angle, if it has them
    pub fn for_profile(profile: &SpeciesProfile) -> Option<Self> {
        let range = profile.value(ParamName::FlockmateRange)?;
        let view_angle = profile.value(ParamName::ViewAngle)?;
        Some(Self::new(range, view_angle))
    }

    pub fn sees(&self, observer: &Boid, other: &Boid) -> bool {
        self.sees_offset(observer.velocity, other.position - observer.position)
    }

    // `offset` is the other agent's position relative to the observer
    pub fn sees_offset(&self, heading: Vec2, offset: Vec2) -> bool {
        if vector::ssq(offset) > self.range * self.range {
            return false;
        }
        match vector::angle_between(heading, offset) {
            Some(angle) => angle <= self.view_angle + ANGLE_EPSILON,
            None => true,
        }
    }
}

// Visible agents among `candidates`, excluding the observer, in candidate order
pub fn neighbours_among(
    observer_id: BoidId,
    boids: &Population,
    candidates: &[BoidId],
    cone: &PerceptionCone,
) -> Vec<BoidId> {
    let Some(observer) = boids.get(observer_id) else {
        return Vec::new();
    };
    candidates
        .iter()
        .copied()
        .filter(|id| *id != observer_id)
        .filter(|id| boids.get(*id).is_some_and(|other| cone.sees(observer, other)))
        .collect()
}

// Visible agents across the whole population, in population order
pub fn visible_neighbours(
    observer_id: BoidId,
    boids: &Population,
    cone: &PerceptionCone,
    grid: Option<&SpatialGrid>,
) -> Vec<BoidId> {
    let candidates = match (grid, boids.get(observer_id)) {
        (Some(grid), Some(observer)) => {
            let mut found = grid.query(observer.position, cone.range);
            found.sort_unstable_by_key(|id| boids.spawn_rank(*id));
            found
        }
        _ => boids.ids(),
    };
    neighbours_among(observer_id, boids, &candidates, cone)
}
