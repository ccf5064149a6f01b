/*
 * Simulation Module
 *
 * The Simulation owns the population, the flock arena, the configuration
 * and the terrain, and is the surface a front end talks to: spawn and
 * despawn agents, advance ticks, edit parameters, place waypoints and
 * obstacles, then read agent positions back for drawing.
 *
 * All mutation goes through &mut self, so spawning can never happen in the
 * middle of a tick.
 */

use std::collections::BTreeMap;
use std::time::Duration;

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::boid::Boid;
use crate::config::SimulationConfig;
use crate::debug::DebugInfo;
use crate::error::{Result, SimError};
use crate::flock::{Flock, FlockArena, FlockId};
use crate::params::{BehaviourStore, ParamChange, ParamName};
use crate::physics::{self, TickContext, TickSummary};
use crate::population::{BoidId, Population};
use crate::species::Species;
use crate::steering::Obstacle;
use crate::terrain::{FlatTerrain, Terrain};

pub struct Simulation {
    config: SimulationConfig,
    boids: Population,
    flocks: FlockArena,
    terrain: Box<dyn Terrain>,
    obstacles: Vec<Obstacle>,
    waypoints: BTreeMap<Species, Vec2>,
    rng: StdRng,
    tick_count: u64,
    last_tick: Duration,
    last_summary: TickSummary,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Self {
        let rng = match config.engine.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            boids: Population::new(),
            flocks: FlockArena::new(),
            terrain: Box::new(FlatTerrain),
            obstacles: Vec::new(),
            waypoints: BTreeMap::new(),
            rng,
            tick_count: 0,
            last_tick: Duration::ZERO,
            last_summary: TickSummary::default(),
        }
    }

    pub fn with_terrain(mut self, terrain: impl Terrain + 'static) -> Self {
        self.set_terrain(terrain);
        self
    }

    pub fn set_terrain(&mut self, terrain: impl Terrain + 'static) {
        self.terrain = Box::new(terrain);
    }

    pub fn terrain(&self) -> &dyn Terrain {
        self.terrain.as_ref()
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn behaviours(&self) -> &BehaviourStore {
        &self.config.behaviours
    }

    // Spawn `count` agents around `position`, each in its own flock
    pub fn spawn(&mut self, species: Species, position: Vec2, count: usize) -> Vec<BoidId> {
        let spacing = self.config.engine.spawn_spacing;
        let goal = self.waypoints.get(&species).copied();
        let profile = self.config.behaviours.profile(species);

        let mut spawned = Vec::with_capacity(count);
        for i in 0..count {
            let spread = i as f32 * spacing;
            let rng = &mut self.rng;
            let offset = Vec2::new(
                if rng.gen_bool(0.5) { -spread } else { spread },
                if rng.gen_bool(0.5) { -spread } else { spread },
            );

            let flocks = &mut self.flocks;
            let id = self.boids.insert_with(|id| {
                let flock = flocks.singleton(species, id);
                let mut boid = Boid::new(species, profile, position + offset, flock, rng);
                boid.goal = goal;
                boid
            });
            spawned.push(id);
        }

        tracing::debug!(%species, count, x = position.x, y = position.y, "spawned agents");
        spawned
    }

    // Spawn by species name, for front ends that pass strings through
    pub fn spawn_named(&mut self, species: &str, position: Vec2, count: usize) -> Result<Vec<BoidId>> {
        let species: Species = species.parse()?;
        Ok(self.spawn(species, position, count))
    }

    // Remove an agent from the world and from its flock
    pub fn despawn(&mut self, id: BoidId) -> Result<Boid> {
        let flock = self.boids.get(id).ok_or(SimError::UnknownBoid(id))?.flock();
        self.flocks.detach(flock, id);
        let boid = self.boids.remove(id).ok_or(SimError::UnknownBoid(id))?;

        // No cached neighbour list may keep pointing at the removed agent
        for (_, other) in self.boids.iter_mut() {
            other.neighbours.retain(|n| *n != id);
            other.flock_neighbours.retain(|n| *n != id);
        }
        tracing::debug!(?id, species = %boid.species, "despawned agent");
        Ok(boid)
    }

    // Advance every agent by dt. A non-positive dt runs no physics.
    pub fn tick(&mut self, dt: f32) -> Result<TickSummary> {
        if !dt.is_finite() || dt <= 0.0 {
            return Ok(TickSummary::default());
        }
        let ctx = TickContext {
            config: &self.config,
            terrain: self.terrain.as_ref(),
            obstacles: &self.obstacles,
        };
        let (summary, elapsed) = physics::timed_update(&mut self.boids, &mut self.flocks, &ctx, dt)?;

        self.tick_count += 1;
        self.last_tick = elapsed;
        self.last_summary = summary;
        Ok(summary)
    }

    // Advance a single agent; true when it merged into another flock
    pub fn advance(&mut self, id: BoidId, dt: f32) -> Result<bool> {
        if !dt.is_finite() || dt <= 0.0 {
            return Ok(false);
        }
        let ctx = TickContext {
            config: &self.config,
            terrain: self.terrain.as_ref(),
            obstacles: &self.obstacles,
        };
        physics::advance(id, &mut self.boids, &mut self.flocks, &mut None, &ctx, dt)
    }

    // Edit a parameter; returns the value actually applied
    pub fn set_parameter(&mut self, species: Species, param: ParamName, raw: f32) -> Result<f32> {
        let applied = self.config.behaviours.set(species, param, raw)?;
        if param == ParamName::HerdSize {
            self.enforce_herd_size(species);
        }
        Ok(applied)
    }

    pub fn set_parameter_by_name(&mut self, species: &str, param: &str, raw: f32) -> Result<f32> {
        let species: Species = species.parse()?;
        let param: ParamName = param.parse().map_err(|param| SimError::UnknownParameter {
            species: species.to_string(),
            param,
        })?;
        self.set_parameter(species, param, raw)
    }

    pub fn reset_parameters(&mut self, species: Species) {
        self.config.behaviours.reset_to_default(species);
        self.enforce_herd_size(species);
    }

    pub fn on_parameter_change(&mut self, observer: impl FnMut(&ParamChange) + Send + 'static) {
        self.config.behaviours.subscribe(observer);
    }

    // Split every flock of `species` that no longer fits its herd size
    fn enforce_herd_size(&mut self, species: Species) {
        let herd_size = self.config.behaviours.profile(species).herd_size();
        let oversized: Vec<FlockId> = self
            .flocks
            .iter()
            .filter(|(_, flock)| flock.species() == species && flock.size() > herd_size)
            .map(|(id, _)| id)
            .collect();
        for id in oversized {
            self.flocks.limit_size(&mut self.boids, id, herd_size);
        }
    }

    pub fn merge_flocks(&mut self, a: BoidId, b: BoidId) -> bool {
        let Some(species) = self.boids.get(a).map(|boid| boid.species) else {
            return false;
        };
        let herd_size = self.config.behaviours.profile(species).herd_size();
        self.flocks.merge(&mut self.boids, a, b, herd_size)
    }

    pub fn limit_flock_size(&mut self, flock: FlockId) -> usize {
        let Some(species) = self.flocks.get(flock).map(Flock::species) else {
            return 0;
        };
        let herd_size = self.config.behaviours.profile(species).herd_size();
        self.flocks.limit_size(&mut self.boids, flock, herd_size)
    }

    // Take an agent out of its flock into a singleton of its own
    pub fn leave_flock(&mut self, id: BoidId) -> Result<FlockId> {
        let flock = self.boids.get(id).ok_or(SimError::UnknownBoid(id))?.flock();
        self.flocks
            .remove_member(&mut self.boids, flock, id)
            .ok_or_else(|| SimError::FlockInconsistent(format!("{:?} missing from {:?}", id, flock)))
    }

    // Set or clear the waypoint every agent of `species` heads for
    pub fn set_waypoint(&mut self, species: Species, waypoint: Option<Vec2>) {
        match waypoint {
            Some(point) => self.waypoints.insert(species, point),
            None => self.waypoints.remove(&species),
        };
        for (_, boid) in self.boids.iter_mut() {
            if boid.species == species {
                boid.goal = waypoint;
            }
        }
    }

    pub fn waypoint(&self, species: Species) -> Option<Vec2> {
        self.waypoints.get(&species).copied()
    }

    pub fn add_obstacle(&mut self, obstacle: Obstacle) {
        self.obstacles.push(obstacle);
    }

    pub fn clear_obstacles(&mut self) {
        self.obstacles.clear();
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn boid(&self, id: BoidId) -> Option<&Boid> {
        self.boids.get(id)
    }

    pub fn boid_mut(&mut self, id: BoidId) -> Option<&mut Boid> {
        self.boids.get_mut(id)
    }

    pub fn population(&self) -> &Population {
        &self.boids
    }

    pub fn flocks(&self) -> &FlockArena {
        &self.flocks
    }

    pub fn flock_of(&self, id: BoidId) -> Option<&Flock> {
        self.flocks.get(self.boids.get(id)?.flock())
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn validate(&self) -> Result<()> {
        self.flocks.validate(&self.boids)
    }

    pub fn debug_info(&self) -> DebugInfo {
        DebugInfo {
            tick_count: self.tick_count,
            last_tick: self.last_tick,
            agents: self.boids.len(),
            flocks: self.flocks.len(),
            largest_flock: self.flocks.iter().map(|(_, flock)| flock.size()).max().unwrap_or(0),
            agents_with_visible_neighbours: self
                .boids
                .iter()
                .filter(|(_, boid)| boid.has_visible_neighbours)
                .count(),
            last_merges: self.last_summary.merges,
            last_modified: self.config.behaviours.last_modified().copied(),
        }
    }
}
