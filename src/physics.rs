/*
 * Physics Module
 *
 * The per-tick update. Agents are advanced one at a time, in population
 * order, and each agent runs the same fixed pipeline:
 * 1. Perceive: find the visible neighbours
 * 2. Socialize: join the first neighbour's flock that has room
 * 3. Re-perceive: find the visible flockmates
 * 4. Decide: ask the species' steering policy for a direction
 * 5. Integrate: direction -> force -> velocity (terrain-limited) -> position
 * 6. Border: wrap or bounce
 * Later agents see the already-updated state of earlier ones.
 */

use std::time::Instant;

use crate::config::SimulationConfig;
use crate::error::{Result, SimError};
use crate::flock::FlockArena;
use crate::params::ParamName;
use crate::perception::{self, PerceptionCone};
use crate::population::{BoidId, Population};
use crate::spatial_grid::SpatialGrid;
use crate::species::{Motion, Species};
use crate::steering::{Obstacle, SteeringContext};
use crate::terrain::Terrain;

// Read-only surroundings of a tick
pub struct TickContext<'a> {
    pub config: &'a SimulationConfig,
    pub terrain: &'a dyn Terrain,
    pub obstacles: &'a [Obstacle],
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickSummary {
    pub advanced: usize,
    pub merges: usize,
    pub dt: f32,
}

// Grid cell size covering the widest perception range of any species
fn grid_cell_size(config: &SimulationConfig) -> Option<f32> {
    Species::ALL
        .into_iter()
        .filter_map(|species| config.behaviours.profile(species).value(ParamName::FlockmateRange))
        .reduce(f32::max)
}

// Advance every agent once
pub fn update_boids(
    boids: &mut Population,
    flocks: &mut FlockArena,
    ctx: &TickContext<'_>,
    dt: f32,
) -> Result<TickSummary> {
    let world = &ctx.config.world;
    let mut grid = if ctx.config.engine.enable_spatial_grid {
        grid_cell_size(ctx.config).map(|cell_size| SpatialGrid::build(cell_size, world.width, world.height, boids))
    } else {
        None
    };

    let mut summary = TickSummary { dt, ..TickSummary::default() };
    for id in boids.ids() {
        if advance(id, boids, flocks, &mut grid, ctx, dt)? {
            summary.merges += 1;
        }
        summary.advanced += 1;
    }
    Ok(summary)
}

// Run the pipeline for one agent. Returns true when it merged into another flock.
pub fn advance(
    id: BoidId,
    boids: &mut Population,
    flocks: &mut FlockArena,
    grid: &mut Option<SpatialGrid>,
    ctx: &TickContext<'_>,
    dt: f32,
) -> Result<bool> {
    let boid = boids.get(id).ok_or(SimError::UnknownBoid(id))?;
    let from = boid.position;
    let profile = ctx.config.behaviours.profile(boid.species);

    let steer = match boid.species.motion() {
        Motion::Steered(steer) => steer,
        Motion::Spiral => {
            let boid = boids.get_mut(id).ok_or(SimError::UnknownBoid(id))?;
            boid.spiral(dt);
            boid.handle_border(&ctx.config.world);
            let to = boid.position;
            if let Some(grid) = grid.as_mut() {
                grid.relocate(id, from, to);
            }
            return Ok(false);
        }
    };

    let cone = PerceptionCone::for_profile(profile);

    // Perceive
    let neighbours = match &cone {
        Some(cone) => perception::visible_neighbours(id, boids, cone, grid.as_ref()),
        None => Vec::new(),
    };

    // Socialize: at most one merge per agent per tick
    let herd_size = profile.herd_size();
    let merged = neighbours
        .iter()
        .any(|other| flocks.merge(boids, id, *other, herd_size));

    // Re-perceive within the flock
    let flock = boids.get(id).ok_or(SimError::UnknownBoid(id))?.flock();
    let flockmates = flocks.get(flock).map(|flock| flock.members().to_vec()).unwrap_or_default();
    let flock_neighbours = match &cone {
        Some(cone) => perception::neighbours_among(id, boids, &flockmates, cone),
        None => Vec::new(),
    };

    {
        let boid = boids.get_mut(id).ok_or(SimError::UnknownBoid(id))?;
        boid.has_visible_neighbours = !neighbours.is_empty();
        boid.neighbours = neighbours;
        boid.flock_neighbours = flock_neighbours;
    }

    // Decide
    let boid = boids.get(id).ok_or(SimError::UnknownBoid(id))?;
    let direction = steer(&SteeringContext {
        boid,
        profile,
        boids,
        obstacles: ctx.obstacles,
    });

    // Terrain-limited top speed: one terrain query per agent
    let max_velocity = profile.value_or(ParamName::MaxVelocity, 1.0);
    let floor = profile.value_or(ParamName::CruisingSpeed, 0.0).max(1.0).min(max_velocity);
    let speed_limit = ctx
        .terrain
        .scale_by_height(floor, max_velocity, ctx.terrain.clamp(boid.position))
        .unwrap_or_else(|err| {
            tracing::warn!(?id, %err, "terrain query failed, using flat-ground speed");
            max_velocity
        });
    let max_acceleration = profile.value_or(ParamName::MaxAcceleration, 1.0);

    // Integrate and handle the border
    let boid = boids.get_mut(id).ok_or(SimError::UnknownBoid(id))?;
    boid.apply_force(direction * max_acceleration * boid.mass);
    boid.integrate(dt, speed_limit);
    boid.handle_border(&ctx.config.world);

    let to = boid.position;
    if let Some(grid) = grid.as_mut() {
        grid.relocate(id, from, to);
    }
    Ok(merged)
}

// Run a tick and log how long it took
pub fn timed_update(
    boids: &mut Population,
    flocks: &mut FlockArena,
    ctx: &TickContext<'_>,
    dt: f32,
) -> Result<(TickSummary, std::time::Duration)> {
    let started = Instant::now();
    let summary = update_boids(boids, flocks, ctx, dt)?;
    let elapsed = started.elapsed();
    tracing::trace!(agents = summary.advanced, merges = summary.merges, ?elapsed, "tick");
    Ok((summary, elapsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boid::Boid;
    use crate::terrain::{FlatTerrain, Heightmap};
    use glam::Vec2;

    struct Bench {
        config: SimulationConfig,
        boids: Population,
        flocks: FlockArena,
    }

    impl Bench {
        fn new() -> Self {
            Self { config: SimulationConfig::new(), boids: Population::new(), flocks: FlockArena::new() }
        }

        fn add(&mut self, species: Species, position: Vec2, velocity: Vec2) -> BoidId {
            let (config, flocks) = (&self.config, &mut self.flocks);
            self.boids.insert_with(|id| {
                let flock = flocks.singleton(species, id);
                Boid::with_velocity(species, config.behaviours.profile(species), position, velocity, flock)
            })
        }

        fn tick(&mut self, terrain: &dyn Terrain, dt: f32) -> TickSummary {
            let ctx = TickContext { config: &self.config, terrain, obstacles: &[] };
            update_boids(&mut self.boids, &mut self.flocks, &ctx, dt).unwrap()
        }
    }

    #[test]
    fn visible_sheep_merge_into_one_flock() {
        let mut bench = Bench::new();
        let a = bench.add(Species::Sheep, Vec2::new(100.0, 100.0), Vec2::ZERO);
        let b = bench.add(Species::Sheep, Vec2::new(120.0, 100.0), Vec2::ZERO);

        let summary = bench.tick(&FlatTerrain, 0.1);

        assert_eq!(summary.advanced, 2);
        assert_eq!(summary.merges, 1);
        assert_eq!(bench.boids.get(a).unwrap().flock(), bench.boids.get(b).unwrap().flock());
        assert_eq!(bench.boids.get(b).unwrap().flock_neighbours, vec![a]);
        bench.flocks.validate(&bench.boids).unwrap();
    }

    #[test]
    fn distant_sheep_stay_apart() {
        let mut bench = Bench::new();
        let a = bench.add(Species::Sheep, Vec2::new(10.0, 10.0), Vec2::ZERO);
        let b = bench.add(Species::Sheep, Vec2::new(300.0, 300.0), Vec2::ZERO);

        bench.tick(&FlatTerrain, 0.1);

        assert_ne!(bench.boids.get(a).unwrap().flock(), bench.boids.get(b).unwrap().flock());
        assert!(!bench.boids.get(a).unwrap().has_visible_neighbours);
    }

    #[test]
    fn sheep_do_not_merge_with_foxes_but_still_avoid_them() {
        let mut bench = Bench::new();
        let sheep = bench.add(Species::Sheep, Vec2::new(100.0, 100.0), Vec2::ZERO);
        let fox = bench.add(Species::Fox, Vec2::new(110.0, 100.0), Vec2::ZERO);

        bench.tick(&FlatTerrain, 0.1);

        let sheep = bench.boids.get(sheep).unwrap();
        assert_eq!(sheep.neighbours, vec![fox]);
        assert!(sheep.flock_neighbours.is_empty());
        assert!(sheep.velocity.x < 0.0);
        assert_ne!(sheep.flock(), bench.boids.get(fox).unwrap().flock());
    }

    #[test]
    fn speed_never_exceeds_terrain_limit() {
        let mut bench = Bench::new();
        let id = bench.add(Species::Sheep, Vec2::new(10.0, 10.0), Vec2::new(4.0, 0.0));
        let hills = Heightmap::from_fn(64, 64, |_, _| 127.5);

        bench.tick(&hills, 1.0);

        let speed = bench.boids.get(id).unwrap().velocity.length();
        assert!(speed <= 2.0 + 1e-4, "speed {} over the hill limit", speed);
    }

    #[test]
    fn grid_and_linear_ticks_agree() {
        let mut with_grid = Bench::new();
        let mut linear = Bench::new();
        linear.config.engine.enable_spatial_grid = false;

        for i in 0..30 {
            let position = Vec2::new((i * 17 % 160) as f32 + 40.0, (i * 29 % 160) as f32 + 40.0);
            let velocity = Vec2::new((i as f32 * 0.7).cos(), (i as f32 * 0.7).sin()) * 3.0;
            with_grid.add(Species::Sheep, position, velocity);
            linear.add(Species::Sheep, position, velocity);
        }

        for _ in 0..5 {
            with_grid.tick(&FlatTerrain, 0.5);
            linear.tick(&FlatTerrain, 0.5);
        }

        for ((_, a), (_, b)) in with_grid.boids.iter().zip(linear.boids.iter()) {
            assert_eq!(a.position, b.position);
            assert_eq!(a.neighbours, b.neighbours);
        }
    }

    #[test]
    fn spiral_species_wander_alone() {
        let mut bench = Bench::new();
        let lion = bench.add(Species::Lion, Vec2::new(200.0, 200.0), Vec2::ZERO);
        let other = bench.add(Species::Lion, Vec2::new(205.0, 200.0), Vec2::ZERO);

        bench.tick(&FlatTerrain, 0.5);

        let boid = bench.boids.get(lion).unwrap();
        assert_ne!(boid.position, Vec2::new(200.0, 200.0));
        assert_ne!(boid.flock(), bench.boids.get(other).unwrap().flock());
    }
}
