/*
 * Steering Module
 *
 * Turns what an agent perceives into one net steering direction. Each
 * behaviour produces a unit-capped contribution, and the navigator feeds
 * them into a shared accumulator in strict priority order:
 * 1. Obstacle avoidance: keep clear of static obstacles
 * 2. Separation: keep out of neighbours' comfort zone
 * 3. Alignment: match the flock's heading
 * 4. Cohesion: steer towards the flock's centre
 * 5. Goal seeking: head for the species' waypoint
 * The accumulator never grows past unit length; once it is full the
 * lower-priority behaviours are not consulted.
 */

use glam::Vec2;

use crate::boid::Boid;
use crate::params::{ParamName, SpeciesProfile};
use crate::population::{BoidId, Population};
use crate::vector::{self, cap_unit, ssq, unit};

// Distance at which cohesion reaches full strength
const COHESION_DISTANCE: f32 = 50.0;

// Tolerance on |acc|^2 when deciding the accumulator is full
const SATURATION_EPSILON: f32 = 1e-6;

// Static circular obstacle (tree, stone)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub position: Vec2,
    pub radius: f32,
}

// Everything a steering policy may read for one agent
pub struct SteeringContext<'a> {
    pub boid: &'a Boid,
    pub profile: &'a SpeciesProfile,
    pub boids: &'a Population,
    pub obstacles: &'a [Obstacle],
}

impl<'a> SteeringContext<'a> {
    fn resolve(&self, ids: &'a [BoidId]) -> impl Iterator<Item = &'a Boid> + 'a {
        let boids = self.boids;
        ids.iter().filter_map(move |id| boids.get(*id))
    }

    pub fn neighbours(&self) -> impl Iterator<Item = &'a Boid> + 'a {
        let boid: &'a Boid = self.boid;
        self.resolve(&boid.neighbours)
    }

    pub fn flock_neighbours(&self) -> impl Iterator<Item = &'a Boid> + 'a {
        let boid: &'a Boid = self.boid;
        self.resolve(&boid.flock_neighbours)
    }
}

// Add `contribution` to `acc` without letting |acc| exceed 1. Returns the new
// magnitude, which is 1 once the accumulator is saturated.
pub fn accumulate(acc: &mut Vec2, contribution: Vec2) -> f32 {
    if ssq(*acc) >= 1.0 - SATURATION_EPSILON {
        return 1.0;
    }

    let temp = *acc + contribution;
    if ssq(temp) <= 1.0 {
        *acc = temp;
        return vector::magnitude(temp);
    }

    // Largest t in [0, 1] with |acc + t * contribution| = 1
    let a = ssq(contribution);
    let b = 2.0 * vector::dot(*acc, contribution);
    let c = ssq(*acc) - 1.0;
    let discriminant = (b * b - 4.0 * a * c).max(0.0);
    let t = ((-b + discriminant.sqrt()) / (2.0 * a)).clamp(0.0, 1.0);

    *acc += contribution * t;
    1.0
}

// Push away from every neighbour inside the comfort zone, ramping up to full
// strength at the danger zone
pub fn keep_distance<'b>(
    boid: &Boid,
    neighbours: impl IntoIterator<Item = &'b Boid>,
    comfort_zone: f32,
    danger_zone: f32,
) -> Vec2 {
    let comfort_sq = comfort_zone * comfort_zone;
    let ramp = comfort_sq - danger_zone * danger_zone;

    let mut push = Vec2::ZERO;
    for other in neighbours {
        let away = boid.position - other.position;
        let dist_sq = ssq(away);
        if dist_sq >= comfort_sq {
            continue;
        }
        let strength = if ramp > 0.0 {
            ((comfort_sq - dist_sq) / ramp).clamp(0.0, 1.0)
        } else {
            1.0
        };
        push += unit(away) * strength;
    }
    cap_unit(push)
}

// Steer towards the neighbours' average velocity
pub fn match_heading<'b>(boid: &Boid, neighbours: impl IntoIterator<Item = &'b Boid>, max_velocity: f32) -> Vec2 {
    let (sum, count) = neighbours
        .into_iter()
        .fold((Vec2::ZERO, 0usize), |(sum, count), other| (sum + other.velocity, count + 1));
    if count == 0 || max_velocity <= 0.0 {
        return Vec2::ZERO;
    }
    let average = sum / count as f32;
    cap_unit((average - boid.velocity) / (max_velocity / 2.0))
}

// Steer towards the neighbours' average position
pub fn steer_to_center<'b>(boid: &Boid, neighbours: impl IntoIterator<Item = &'b Boid>) -> Vec2 {
    let (sum, count) = neighbours
        .into_iter()
        .fold((Vec2::ZERO, 0usize), |(sum, count), other| (sum + other.position, count + 1));
    if count == 0 {
        return Vec2::ZERO;
    }
    let center = sum / count as f32;
    cap_unit((center - boid.position) / COHESION_DISTANCE)
}

// Push away from obstacles whose edge is closer than `range`
pub fn avoid_obstacles(boid: &Boid, obstacles: &[Obstacle], range: f32) -> Vec2 {
    if range <= 0.0 {
        return Vec2::ZERO;
    }
    let mut push = Vec2::ZERO;
    for obstacle in obstacles {
        let away = boid.position - obstacle.position;
        let clearance = vector::magnitude(away) - obstacle.radius;
        if clearance >= range {
            continue;
        }
        let strength = (1.0 - clearance / range).clamp(0.0, 1.0);
        push += unit(away) * strength;
    }
    cap_unit(push)
}

// Unit vector towards the goal until the agent is within its own size of it
pub fn seek_goal(boid: &Boid, goal: Option<Vec2>) -> Vec2 {
    match goal {
        Some(goal) if ssq(goal - boid.position) > boid.size * boid.size => unit(goal - boid.position),
        _ => Vec2::ZERO,
    }
}

fn obstacle_step(ctx: &SteeringContext<'_>) -> Vec2 {
    match ctx.profile.value(ParamName::ObstacleRange) {
        Some(range) => avoid_obstacles(ctx.boid, ctx.obstacles, range),
        None => Vec2::ZERO,
    }
}

fn separation_step(ctx: &SteeringContext<'_>) -> Vec2 {
    let comfort = ctx.profile.value_or(ParamName::ComfortZone, ctx.profile.size);
    let danger = ctx.profile.value_or(ParamName::DangerZone, ctx.profile.size);
    keep_distance(ctx.boid, ctx.neighbours(), comfort, danger)
}

fn alignment_step(ctx: &SteeringContext<'_>) -> Vec2 {
    let max_velocity = ctx.profile.value_or(ParamName::MaxVelocity, 1.0);
    match_heading(ctx.boid, ctx.flock_neighbours(), max_velocity)
}

fn cohesion_step(ctx: &SteeringContext<'_>) -> Vec2 {
    steer_to_center(ctx.boid, ctx.flock_neighbours())
}

fn goal_step(ctx: &SteeringContext<'_>) -> Vec2 {
    seek_goal(ctx.boid, ctx.boid.goal)
}

const PRIORITIES: [fn(&SteeringContext<'_>) -> Vec2; 5] =
    [obstacle_step, separation_step, alignment_step, cohesion_step, goal_step];

// Herding policy: priority accumulation of all behaviours
pub fn navigator(ctx: &SteeringContext<'_>) -> Vec2 {
    let mut acc = Vec2::ZERO;
    for step in PRIORITIES {
        if accumulate(&mut acc, step(ctx)) >= 1.0 {
            break;
        }
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flock::FlockId;
    use crate::params::BehaviourStore;
    use crate::species::Species;

    fn sheep(position: Vec2, velocity: Vec2) -> Boid {
        let store = BehaviourStore::new();
        Boid::with_velocity(Species::Sheep, store.profile(Species::Sheep), position, velocity, FlockId::default())
    }

    #[test]
    fn accumulate_commits_small_contributions() {
        let mut acc = Vec2::ZERO;
        assert!((accumulate(&mut acc, Vec2::new(0.3, 0.4)) - 0.5).abs() < 1e-6);
        assert_eq!(acc, Vec2::new(0.3, 0.4));
    }

    #[test]
    fn accumulate_truncates_at_unit_length() {
        let mut acc = Vec2::new(0.6, 0.0);
        assert_eq!(accumulate(&mut acc, Vec2::new(0.0, 2.0)), 1.0);
        assert!((acc.length() - 1.0).abs() < 1e-5);
        assert!((acc.x - 0.6).abs() < 1e-6);
        assert!((acc.y - 0.8).abs() < 1e-5);
    }

    #[test]
    fn saturated_accumulator_ignores_further_input() {
        let mut acc = Vec2::ZERO;
        accumulate(&mut acc, Vec2::new(5.0, 0.0));
        let full = acc;
        assert_eq!(accumulate(&mut acc, Vec2::new(-0.5, 0.3)), 1.0);
        assert_eq!(acc, full);
    }

    #[test]
    fn keep_distance_is_symmetric_for_close_pairs() {
        let a = sheep(Vec2::new(100.0, 100.0), Vec2::ZERO);
        let b = sheep(Vec2::new(105.0, 100.0), Vec2::ZERO);

        let push_a = keep_distance(&a, [&b], 14.0, 9.0);
        let push_b = keep_distance(&b, [&a], 14.0, 9.0);

        assert!(push_a.length() > 0.0);
        assert_eq!(push_a, -push_b);
        assert_eq!(push_a, Vec2::new(-1.0, 0.0));
    }

    #[test]
    fn keep_distance_ramps_between_zones() {
        let a = sheep(Vec2::ZERO, Vec2::ZERO);
        let b = sheep(Vec2::new(0.0, 12.0), Vec2::ZERO);
        let push = keep_distance(&a, [&b], 14.0, 9.0);
        let expected = (196.0 - 144.0) / (196.0 - 81.0);
        assert!((push.y + expected).abs() < 1e-6);

        let far = sheep(Vec2::new(0.0, 14.0), Vec2::ZERO);
        assert_eq!(keep_distance(&a, [&far], 14.0, 9.0), Vec2::ZERO);
    }

    #[test]
    fn match_heading_scales_by_half_max_velocity() {
        let me = sheep(Vec2::ZERO, Vec2::ZERO);
        let other = sheep(Vec2::X, Vec2::new(1.0, 0.0));
        assert_eq!(match_heading(&me, [&other], 4.0), Vec2::new(0.5, 0.0));
        assert_eq!(match_heading(&me, std::iter::empty(), 4.0), Vec2::ZERO);
    }

    #[test]
    fn steer_to_center_is_capped() {
        let me = sheep(Vec2::ZERO, Vec2::ZERO);
        let near = sheep(Vec2::new(25.0, 0.0), Vec2::ZERO);
        let far = sheep(Vec2::new(500.0, 0.0), Vec2::ZERO);
        assert_eq!(steer_to_center(&me, [&near]), Vec2::new(0.5, 0.0));
        assert_eq!(steer_to_center(&me, [&far]), Vec2::new(1.0, 0.0));
    }

    #[test]
    fn obstacles_push_when_close() {
        let me = sheep(Vec2::new(10.0, 0.0), Vec2::ZERO);
        let rock = Obstacle { position: Vec2::ZERO, radius: 5.0 };
        let push = avoid_obstacles(&me, &[rock], 10.0);
        assert!((push.x - 0.5).abs() < 1e-6);
        assert_eq!(avoid_obstacles(&me, &[rock], 4.0), Vec2::ZERO);
    }

    #[test]
    fn seek_goal_stops_at_arrival() {
        let me = sheep(Vec2::ZERO, Vec2::ZERO);
        assert_eq!(seek_goal(&me, Some(Vec2::new(0.0, 100.0))), Vec2::Y);
        assert_eq!(seek_goal(&me, Some(Vec2::new(0.0, 4.0))), Vec2::ZERO);
        assert_eq!(seek_goal(&me, None), Vec2::ZERO);
    }

    #[test]
    fn navigator_prefers_separation_over_goal() {
        let store = BehaviourStore::new();
        let mut boids = Population::new();
        let me = boids.insert_with(|_| sheep(Vec2::new(100.0, 100.0), Vec2::ZERO));
        let crowd = boids.insert_with(|_| sheep(Vec2::new(110.0, 100.0), Vec2::ZERO));
        {
            let boid = boids.get_mut(me).unwrap();
            boid.neighbours = vec![crowd];
            boid.goal = Some(Vec2::new(100.0, 400.0));
        }

        let ctx = SteeringContext {
            boid: boids.get(me).unwrap(),
            profile: store.profile(Species::Sheep),
            boids: &boids,
            obstacles: &[],
        };
        let net = navigator(&ctx);

        // separation saturates the accumulator, the goal never gets a say
        assert!((net.length() - 1.0).abs() < 1e-5);
        assert!(net.x < 0.0);
        assert_eq!(net.y, 0.0);
    }
}
