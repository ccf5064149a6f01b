/*
 * Population Module
 *
 * Storage for the live agents. Agents are addressed by BoidId, a generational
 * key: once an agent is removed its id never resolves again, even after a
 * later spawn lands in the same slot.
 *
 * Iteration runs in spawn order, which is the population order the tick loop
 * advances agents in. Removing an agent keeps the relative order of the rest.
 */

use slotmap::{new_key_type, SecondaryMap, SlotMap};

use crate::boid::Boid;

new_key_type! {
    pub struct BoidId;
}

#[derive(Debug, Default)]
pub struct Population {
    boids: SlotMap<BoidId, Boid>,
    order: Vec<BoidId>,
    spawn_rank: SecondaryMap<BoidId, u64>,
    next_rank: u64,
}

impl Population {
    pub fn new() -> Self {
        Self {
            boids: SlotMap::with_key(),
            order: Vec::new(),
            spawn_rank: SecondaryMap::new(),
            next_rank: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.boids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boids.is_empty()
    }

    // Insert an agent built from the id it is about to receive
    pub fn insert_with(&mut self, build: impl FnOnce(BoidId) -> Boid) -> BoidId {
        let id = self.boids.insert_with_key(build);
        self.order.push(id);
        self.spawn_rank.insert(id, self.next_rank);
        self.next_rank += 1;
        id
    }

    pub fn remove(&mut self, id: BoidId) -> Option<Boid> {
        let boid = self.boids.remove(id)?;
        self.spawn_rank.remove(id);
        if let Some(position) = self.order.iter().position(|other| *other == id) {
            self.order.remove(position);
        }
        Some(boid)
    }

    pub fn get(&self, id: BoidId) -> Option<&Boid> {
        self.boids.get(id)
    }

    pub fn get_mut(&mut self, id: BoidId) -> Option<&mut Boid> {
        self.boids.get_mut(id)
    }

    pub fn contains(&self, id: BoidId) -> bool {
        self.boids.contains_key(id)
    }

    // Position of a live agent in spawn order; smaller spawned earlier
    pub fn spawn_rank(&self, id: BoidId) -> Option<u64> {
        self.spawn_rank.get(id).copied()
    }

    pub fn ids(&self) -> Vec<BoidId> {
        self.order.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BoidId, &Boid)> {
        self.order
            .iter()
            .filter_map(|id| self.boids.get(*id).map(|boid| (*id, boid)))
    }

    // Storage order, not spawn order. For edits that touch every agent
    // independently of the others.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (BoidId, &mut Boid)> {
        self.boids.iter_mut()
    }
}
