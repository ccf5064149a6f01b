/*
 * End-to-end scenarios driving the public Simulation surface.
 */

use std::sync::{Arc, Mutex};

use glam::Vec2;
use herdsim::{
    BorderPolicy, BoidId, Obstacle, ParamName, PerceptionCone, SimError, Simulation, SimulationConfig, Species,
};

fn seeded(seed: u64) -> Simulation {
    let mut config = SimulationConfig::new();
    config.engine.seed = Some(seed);
    Simulation::new(config)
}

// One stationary sheep at exactly `position`
fn place(sim: &mut Simulation, position: Vec2) -> BoidId {
    let id = sim.spawn(Species::Sheep, position, 1)[0];
    let boid = sim.boid_mut(id).unwrap();
    boid.position = position;
    boid.velocity = Vec2::ZERO;
    id
}

#[test]
fn crowded_pair_pushes_apart_symmetrically() {
    let mut sim = seeded(1);
    sim.set_parameter(Species::Sheep, ParamName::ComfortZone, 14.0).unwrap();
    sim.set_parameter(Species::Sheep, ParamName::DangerZone, 9.0).unwrap();
    let a = place(&mut sim, Vec2::new(100.0, 100.0));
    let b = place(&mut sim, Vec2::new(105.0, 100.0));

    sim.tick(0.1).unwrap();

    let (va, vb) = (sim.boid(a).unwrap().velocity, sim.boid(b).unwrap().velocity);
    assert!(va.x < 0.0, "left sheep should move left, got {:?}", va);
    assert!(vb.x > 0.0, "right sheep should move right, got {:?}", vb);
    assert!((va + vb).length() < 1e-5, "pushes not opposite: {:?} {:?}", va, vb);
    assert!((va.length() - vb.length()).abs() < 1e-5);
}

#[test]
fn full_herds_refuse_to_merge() {
    let mut sim = seeded(2);
    let left = sim.spawn(Species::Sheep, Vec2::new(100.0, 100.0), 20);
    let right = sim.spawn(Species::Sheep, Vec2::new(400.0, 400.0), 20);
    for ids in [&left, &right] {
        for other in &ids[1..] {
            assert!(sim.merge_flocks(ids[0], *other));
        }
    }
    assert_eq!(sim.flock_of(left[0]).unwrap().size(), 20);

    // 20 + 20 > 32
    assert!(!sim.merge_flocks(left[0], right[0]));
    assert_eq!(sim.flock_of(left[0]).unwrap().size(), 20);
    assert_eq!(sim.flock_of(right[0]).unwrap().size(), 20);

    sim.set_parameter(Species::Sheep, ParamName::HerdSize, 40.0).unwrap();
    assert!(sim.merge_flocks(left[0], right[0]));
    let flock = sim.flock_of(right[5]).unwrap();
    assert_eq!(flock.size(), 40);
    assert_eq!(flock.members()[0], left[0]);
    assert_eq!(flock.members()[20], right[0]);
    sim.validate().unwrap();
}

#[test]
fn sheep_never_merge_with_other_species() {
    let mut sim = seeded(3);
    let sheep = sim.spawn(Species::Sheep, Vec2::new(100.0, 100.0), 1)[0];
    let fox = sim.spawn(Species::Fox, Vec2::new(100.0, 100.0), 1)[0];
    assert!(!sim.merge_flocks(sheep, fox));
    assert_ne!(sim.boid(sheep).unwrap().flock(), sim.boid(fox).unwrap().flock());
}

#[test]
fn comfort_zone_edit_clamps_danger_zone() {
    let mut sim = seeded(4);
    assert_eq!(sim.set_parameter_by_name("sheep", "danger_zone", 39.0).unwrap(), 39.0);
    assert_eq!(sim.set_parameter_by_name("Sheep", "comfort-zone", 20.0).unwrap(), 20.0);

    let danger = sim.behaviours().get(Species::Sheep, ParamName::DangerZone).unwrap();
    assert_eq!(danger.max, 19.0);
    assert_eq!(danger.value, 19.0);

    let change = sim.behaviours().last_modified().copied().unwrap();
    assert_eq!(change.param, ParamName::ComfortZone);
    assert_eq!(change.value, 20.0);
}

#[test]
fn unknown_names_are_reported() {
    let mut sim = seeded(5);
    assert!(matches!(
        sim.set_parameter_by_name("Wolf", "herd-size", 3.0),
        Err(SimError::UnknownSpecies(_))
    ));
    assert!(matches!(
        sim.set_parameter_by_name("Sheep", "wool", 3.0),
        Err(SimError::UnknownParameter { .. })
    ));
    // Lions carry no herd size
    assert!(matches!(
        sim.set_parameter(Species::Lion, ParamName::HerdSize, 3.0),
        Err(SimError::UnknownParameter { .. })
    ));
}

#[test]
fn half_turn_view_cone_sees_every_direction() {
    let cone = PerceptionCone::new(40.0, 180.0);
    let heading = Vec2::new(1.0, 0.0);
    for step in 0..36 {
        let angle = (step as f32 * 10.0).to_radians();
        let direction = Vec2::new(angle.cos(), angle.sin());
        assert!(cone.sees_offset(heading, direction * 39.0), "missed bearing {}", step * 10);
        assert!(!cone.sees_offset(heading, direction * 41.0));
    }
}

#[test]
fn flocks_stay_consistent_through_ticks_and_despawns() {
    let mut sim = seeded(6);
    let mut ids = Vec::new();
    for i in 0..6 {
        let centre = Vec2::new(60.0 + 70.0 * i as f32, 200.0);
        ids.extend(sim.spawn(Species::Sheep, centre, 10));
    }
    ids.extend(sim.spawn(Species::Lion, Vec2::new(250.0, 250.0), 2));

    for round in 0..4 {
        for _ in 0..15 {
            sim.tick(0.2).unwrap();
        }
        sim.validate().unwrap();

        // Drop every third surviving agent
        let doomed: Vec<BoidId> = ids.iter().copied().skip(round).step_by(3).collect();
        for id in &doomed {
            sim.despawn(*id).unwrap();
            assert!(matches!(sim.despawn(*id), Err(SimError::UnknownBoid(_))));
        }
        ids.retain(|id| !doomed.contains(id));
        sim.validate().unwrap();

        for (_, boid) in sim.population().iter() {
            assert!(boid.neighbours.iter().all(|n| sim.boid(*n).is_some()));
            assert!(boid.flock_neighbours.iter().all(|n| sim.boid(*n).is_some()));
        }
    }

    let herd_size = sim.behaviours().profile(Species::Sheep).herd_size();
    for (_, flock) in sim.flocks().iter() {
        assert!(flock.size() <= herd_size);
    }
}

#[test]
fn stale_ids_never_reach_respawned_agents() {
    let mut sim = seeded(11);
    let first = sim.spawn(Species::Sheep, Vec2::new(100.0, 100.0), 5);
    for id in &first[..3] {
        sim.despawn(*id).unwrap();
    }
    let foxes = sim.spawn(Species::Fox, Vec2::new(300.0, 300.0), 3);

    for id in &first[..3] {
        assert!(sim.boid(*id).is_none());
        assert!(sim.flock_of(*id).is_none());
        assert!(!sim.merge_flocks(*id, first[3]));
        assert!(matches!(sim.despawn(*id), Err(SimError::UnknownBoid(_))));
    }
    for fox in &foxes {
        assert_eq!(sim.boid(*fox).unwrap().species, Species::Fox);
    }

    let mut expected = first[3..].to_vec();
    expected.extend_from_slice(&foxes);
    assert_eq!(sim.population().ids(), expected);

    sim.tick(0.2).unwrap();
    assert_eq!(sim.population().len(), 5);
    sim.validate().unwrap();
}

#[test]
fn shrinking_herd_size_splits_existing_flocks() {
    let mut sim = seeded(7);
    let ids = sim.spawn(Species::Sheep, Vec2::new(200.0, 200.0), 12);
    for other in &ids[1..] {
        sim.merge_flocks(ids[0], *other);
    }
    assert_eq!(sim.flocks().len(), 1);

    sim.set_parameter(Species::Sheep, ParamName::HerdSize, 5.0).unwrap();

    let flock = sim.flock_of(ids[0]).unwrap();
    assert_eq!(flock.members(), &ids[..5]);
    // The seven left over each end up alone
    assert_eq!(sim.flocks().len(), 8);
    for id in &ids[5..] {
        assert_eq!(sim.flock_of(*id).unwrap().size(), 1);
    }

    sim.reset_parameters(Species::Sheep);
    assert_eq!(sim.behaviours().profile(Species::Sheep).herd_size(), 32);
    sim.validate().unwrap();
}

#[test]
fn parameter_observers_hear_every_edit() {
    let mut sim = seeded(8);
    let heard = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&heard);
    sim.on_parameter_change(move |change| sink.lock().unwrap().push((change.param, change.value)));

    sim.set_parameter(Species::Sheep, ParamName::MaxVelocity, 25.0).unwrap();
    sim.set_parameter(Species::Fish, ParamName::Cohesion, 0.5).unwrap();

    let heard = heard.lock().unwrap();
    assert_eq!(*heard, vec![(ParamName::MaxVelocity, 10.0), (ParamName::Cohesion, 0.5)]);
}

#[test]
fn waypoints_pull_a_lone_sheep() {
    let mut sim = seeded(9);
    sim.set_waypoint(Species::Sheep, Some(Vec2::new(400.0, 200.0)));
    let id = place(&mut sim, Vec2::new(200.0, 200.0));
    assert_eq!(sim.boid(id).unwrap().goal, Some(Vec2::new(400.0, 200.0)));

    for _ in 0..20 {
        sim.tick(0.5).unwrap();
    }
    assert!(sim.boid(id).unwrap().position.x > 200.0);

    sim.set_waypoint(Species::Sheep, None);
    assert_eq!(sim.boid(id).unwrap().goal, None);
}

#[test]
fn obstacles_deflect_approaching_sheep() {
    let mut sim = seeded(10);
    sim.add_obstacle(Obstacle { position: Vec2::new(220.0, 200.0), radius: 10.0 });
    let id = place(&mut sim, Vec2::new(200.0, 200.0));

    sim.tick(0.5).unwrap();

    assert!(sim.boid(id).unwrap().velocity.x < 0.0);
    sim.clear_obstacles();
    assert!(sim.obstacles().is_empty());
}

#[test]
fn toml_config_drives_world_and_species() {
    let config = SimulationConfig::from_toml_str(
        r#"
        [world]
        width = 300.0
        height = 200.0
        border = "bounce"

        [simulation]
        seed = 12

        [species.Sheep]
        herd-size = 4
        "#,
    )
    .unwrap();
    assert_eq!(config.world.border, BorderPolicy::Bounce);

    let mut sim = Simulation::new(config);
    let ids = sim.spawn(Species::Sheep, Vec2::new(150.0, 100.0), 8);
    for _ in 0..50 {
        sim.tick(0.5).unwrap();
    }
    for id in &ids {
        let boid = sim.boid(*id).unwrap();
        assert!((0.0..=300.0).contains(&boid.position.x));
        assert!((0.0..=200.0).contains(&boid.position.y));
        assert!(sim.flock_of(*id).unwrap().size() <= 4);
    }
}
