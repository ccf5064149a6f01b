/*
 * Flock Module
 *
 * Dynamic, same-species groups of agents. Flocks live in an arena and are
 * addressed by FlockId; every agent stores the id of its flock and every
 * flock stores the ids of its members, so the two sides must always agree:
 * - an agent's flock lists the agent exactly once
 * - a flock's members all point back at it
 * - size is the length of the member list, never tracked separately
 * Two agents are flockmates exactly when their flock ids are equal.
 *
 * Merging replaces both flocks with a new one; splitting hands each excess
 * member a brand-new singleton. Flocks nobody points at are released; a
 * released FlockId never resolves again.
 */

use slotmap::{new_key_type, SlotMap};

use crate::error::{Result, SimError};
use crate::population::{BoidId, Population};
use crate::species::Species;

new_key_type! {
    pub struct FlockId;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Flock {
    species: Species,
    members: Vec<BoidId>,
}

impl Flock {
    pub fn species(&self) -> Species {
        self.species
    }

    pub fn members(&self) -> &[BoidId] {
        &self.members
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }
}

#[derive(Debug, Default)]
pub struct FlockArena {
    flocks: SlotMap<FlockId, Flock>,
}

impl FlockArena {
    pub fn new() -> Self {
        Self { flocks: SlotMap::with_key() }
    }

    pub fn get(&self, id: FlockId) -> Option<&Flock> {
        self.flocks.get(id)
    }

    // Number of live flocks
    pub fn len(&self) -> usize {
        self.flocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (FlockId, &Flock)> {
        self.flocks.iter()
    }

    // Flock of one for an agent that is about to be inserted under `boid`
    pub fn singleton(&mut self, species: Species, boid: BoidId) -> FlockId {
        self.create(species, vec![boid])
    }

    fn create(&mut self, species: Species, members: Vec<BoidId>) -> FlockId {
        self.flocks.insert(Flock { species, members })
    }

    // Create a flock and point every member back at it
    fn adopt(&mut self, boids: &mut Population, species: Species, members: Vec<BoidId>) -> FlockId {
        let id = self.create(species, members.clone());
        for member in members {
            if let Some(boid) = boids.get_mut(member) {
                boid.flock = id;
            }
        }
        id
    }

    fn release(&mut self, id: FlockId) {
        self.flocks.remove(id);
    }

    // Union the flocks of `a` and `b` when they are distinct, of the same
    // species and fit in `herd_size` together. No partial merges.
    pub fn merge(&mut self, boids: &mut Population, a: BoidId, b: BoidId, herd_size: usize) -> bool {
        let (Some(boid_a), Some(boid_b)) = (boids.get(a), boids.get(b)) else {
            return false;
        };
        if boid_a.species != boid_b.species || boid_a.flock == boid_b.flock {
            return false;
        }
        let (species, flock_a, flock_b) = (boid_a.species, boid_a.flock, boid_b.flock);

        let (Some(first), Some(second)) = (self.get(flock_a), self.get(flock_b)) else {
            return false;
        };
        let combined = first.size() + second.size();
        if combined > herd_size {
            return false;
        }

        let mut members = Vec::with_capacity(combined);
        members.extend_from_slice(first.members());
        members.extend_from_slice(second.members());

        self.release(flock_a);
        self.release(flock_b);
        let merged = self.adopt(boids, species, members);

        tracing::trace!(?a, ?b, ?merged, size = combined, "flocks merged");
        true
    }

    // Keep the first `herd_size` members; every excess member becomes its own
    // singleton. Returns how many members were split off.
    pub fn limit_size(&mut self, boids: &mut Population, id: FlockId, herd_size: usize) -> usize {
        let Some(flock) = self.flocks.get_mut(id) else {
            return 0;
        };
        if flock.size() <= herd_size {
            return 0;
        }
        let species = flock.species;
        let leaving = flock.members.split_off(herd_size);

        for member in &leaving {
            self.adopt(boids, species, vec![*member]);
        }

        tracing::debug!(flock = ?id, kept = herd_size, split = leaving.len(), "flock over capacity");
        leaving.len()
    }

    // Take `boid` out of `id` and give it a fresh singleton flock
    pub fn remove_member(&mut self, boids: &mut Population, id: FlockId, boid: BoidId) -> Option<FlockId> {
        let species = self.get(id)?.species;
        if !self.detach(id, boid) {
            return None;
        }
        Some(self.adopt(boids, species, vec![boid]))
    }

    // Drop `boid` from the member list without regrouping it, for agents that
    // are leaving the simulation. An emptied flock is released.
    pub fn detach(&mut self, id: FlockId, boid: BoidId) -> bool {
        let Some(flock) = self.flocks.get_mut(id) else {
            return false;
        };
        let Some(position) = flock.members.iter().position(|member| *member == boid) else {
            return false;
        };
        flock.members.remove(position);
        if flock.members.is_empty() {
            self.release(id);
        }
        true
    }

    // Check the two-way references between agents and flocks
    pub fn validate(&self, boids: &Population) -> Result<()> {
        for (id, boid) in boids.iter() {
            let flock = self.get(boid.flock).ok_or_else(|| {
                inconsistent(format!("{:?} points at released flock {:?}", id, boid.flock))
            })?;
            let copies = flock.members.iter().filter(|member| **member == id).count();
            if copies != 1 {
                return Err(inconsistent(format!(
                    "{:?} appears {} times in its flock {:?}",
                    id, copies, boid.flock
                )));
            }
            if flock.species != boid.species {
                return Err(inconsistent(format!("{:?} is in a {} flock", id, flock.species)));
            }
        }

        for (id, flock) in self.iter() {
            if flock.members.is_empty() {
                return Err(inconsistent(format!("{:?} is empty but not released", id)));
            }
            for member in &flock.members {
                match boids.get(*member) {
                    Some(boid) if boid.flock == id => {}
                    Some(boid) => {
                        return Err(inconsistent(format!(
                            "{:?} lists {:?}, which points at {:?}",
                            id, member, boid.flock
                        )))
                    }
                    None => return Err(inconsistent(format!("{:?} lists removed {:?}", id, member))),
                }
            }
        }
        Ok(())
    }
}

fn inconsistent(detail: String) -> SimError {
    SimError::FlockInconsistent(detail)
}
