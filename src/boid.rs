/*
 * Boid Module
 *
 * This module defines the Boid struct: the kinematic state of one agent,
 * its cached perception results and the flock it currently belongs to.
 * Steering decisions live in the steering module; this file only covers
 * what happens once a net force is known:
 * 1. Integration: force -> acceleration -> velocity -> position
 * 2. Speed limit: velocity is rescaled to the species' max velocity
 * 3. Border handling: wrap around or bounce off the world edges
 * plus the idle spiral used by species that do not herd.
 */

use glam::Vec2;
use rand::Rng;
use std::f32::consts::TAU;

use crate::config::{BorderPolicy, WorldConfig};
use crate::flock::FlockId;
use crate::params::{ParamName, SpeciesProfile};
use crate::population::BoidId;
use crate::species::Species;
use crate::vector;

// Tightness of the idle spiral
const SPIRAL_SCALE: f32 = 2.0;

#[derive(Debug, Clone)]
pub struct Boid {
    pub species: Species,
    pub mass: f32,
    pub size: f32,
    pub position: Vec2,
    pub origin: Vec2,
    pub velocity: Vec2,
    pub acceleration: Vec2,
    pub net_force: Vec2,
    pub time_alive: f32,
    pub(crate) flock: FlockId,
    pub neighbours: Vec<BoidId>,
    pub flock_neighbours: Vec<BoidId>,
    pub has_visible_neighbours: bool,
    pub goal: Option<Vec2>,
}

impl Boid {
    // New agent with a random heading at the species' max velocity
    pub fn new(
        species: Species,
        profile: &SpeciesProfile,
        position: Vec2,
        flock: FlockId,
        rng: &mut impl Rng,
    ) -> Self {
        let angle = rng.gen_range(0.0..TAU);
        let speed = profile.value_or(ParamName::MaxVelocity, 1.0);
        let velocity = Vec2::new(angle.cos(), angle.sin()) * speed;
        Self::with_velocity(species, profile, position, velocity, flock)
    }

    pub fn with_velocity(
        species: Species,
        profile: &SpeciesProfile,
        position: Vec2,
        velocity: Vec2,
        flock: FlockId,
    ) -> Self {
        Self {
            species,
            mass: 1.0,
            size: profile.size,
            position,
            origin: position,
            velocity,
            acceleration: Vec2::ZERO,
            net_force: Vec2::ZERO,
            time_alive: 0.0,
            flock,
            neighbours: Vec::new(),
            flock_neighbours: Vec::new(),
            has_visible_neighbours: false,
            goal: None,
        }
    }

    pub fn flock(&self) -> FlockId {
        self.flock
    }

    // Heading in whole degrees, for renderers
    pub fn heading_degrees(&self) -> u32 {
        vector::heading_degrees(self.velocity)
    }

    // Apply the net steering force of this tick
    pub fn apply_force(&mut self, force: Vec2) {
        self.net_force = force;
        self.acceleration = force / self.mass;
    }

    // Update the boid's velocity and position from its acceleration
    pub fn integrate(&mut self, dt: f32, max_velocity: f32) {
        self.velocity = clamp_velocity(self.velocity + self.acceleration * dt, max_velocity);
        self.position += self.velocity * dt;
        self.time_alive += dt;
    }

    // Advance along the idle spiral by dt
    pub fn spiral(&mut self, dt: f32) {
        let before = spiral_offset(self.time_alive);
        self.time_alive += dt;
        let delta = spiral_offset(self.time_alive) - before;
        self.position += delta;
        if dt > 0.0 {
            self.velocity = delta / dt;
        }
    }

    pub fn handle_border(&mut self, world: &WorldConfig) {
        match world.border {
            BorderPolicy::Wrap => self.wrap_edges(world),
            BorderPolicy::Bounce => self.bounce_edges(world),
        }
    }

    // Wrap the boid around the world edges once it leaves the padded range
    fn wrap_edges(&mut self, world: &WorldConfig) {
        self.position.x = wrap_axis(self.position.x, world.width, world.padding);
        self.position.y = wrap_axis(self.position.y, world.height, world.padding);
    }

    // Mirror the boid back inside and point the crossed velocity component inward
    fn bounce_edges(&mut self, world: &WorldConfig) {
        let (x, vx) = bounce_axis(self.position.x, self.velocity.x, world.width);
        let (y, vy) = bounce_axis(self.position.y, self.velocity.y, world.height);
        self.position = Vec2::new(x, y);
        self.velocity = Vec2::new(vx, vy);
    }
}

// Rescale to exactly max_velocity when faster, keeping direction
pub fn clamp_velocity(velocity: Vec2, max_velocity: f32) -> Vec2 {
    vector::clamp_length(velocity, max_velocity.max(0.0))
}

fn spiral_offset(t: f32) -> Vec2 {
    let r = SPIRAL_SCALE * t;
    Vec2::new(r * t.cos(), r * t.sin())
}

fn wrap_axis(value: f32, extent: f32, padding: f32) -> f32 {
    if extent <= 0.0 {
        return value;
    }
    if value < -padding || value > extent + padding {
        value.rem_euclid(extent)
    } else {
        value
    }
}

fn bounce_axis(value: f32, velocity: f32, extent: f32) -> (f32, f32) {
    if value < 0.0 {
        ((-value).min(extent.max(0.0)), velocity.abs())
    } else if value > extent {
        ((2.0 * extent - value).max(0.0), -velocity.abs())
    } else {
        (value, velocity)
    }
}
