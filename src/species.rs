/*
 * Species Module
 *
 * The roster of animals the simulation knows about, and the table mapping
 * each species to its motion policy. Species share one Boid record; what
 * differs is the function that turns a steering context into a direction.
 */

use std::fmt;
use std::str::FromStr;

use glam::Vec2;

use crate::error::SimError;
use crate::steering::{self, SteeringContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Species {
    Sheep,
    Lion,
    Fox,
    Penguin,
    Bunny,
    Fish,
}

// Steering capability: computes the unit-capped net direction for one agent
pub type SteerFn = fn(&SteeringContext<'_>) -> Vec2;

#[derive(Clone, Copy)]
pub enum Motion {
    // Perceive, flock and steer through the given policy
    Steered(SteerFn),
    // Idle Archimedean spiral around the spawn point
    Spiral,
}

impl fmt::Debug for Motion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Motion::Steered(_) => f.write_str("Steered"),
            Motion::Spiral => f.write_str("Spiral"),
        }
    }
}

impl Species {
    pub const ALL: [Species; 6] = [
        Species::Sheep,
        Species::Lion,
        Species::Fox,
        Species::Penguin,
        Species::Bunny,
        Species::Fish,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Species::Sheep => "Sheep",
            Species::Lion => "Lion",
            Species::Fox => "Fox",
            Species::Penguin => "Penguin",
            Species::Bunny => "Bunny",
            Species::Fish => "Fish",
        }
    }

    // Motion policy table
    pub fn motion(self) -> Motion {
        match self {
            Species::Sheep => Motion::Steered(steering::navigator),
            Species::Lion | Species::Fox | Species::Penguin | Species::Bunny | Species::Fish => {
                Motion::Spiral
            }
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Species {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Species::ALL
            .into_iter()
            .find(|species| species.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SimError::UnknownSpecies(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("Sheep".parse::<Species>().unwrap(), Species::Sheep);
        assert_eq!(" fish ".parse::<Species>().unwrap(), Species::Fish);
    }

    #[test]
    fn unknown_species_is_a_typed_error() {
        match "Wolf".parse::<Species>() {
            Err(SimError::UnknownSpecies(name)) => assert_eq!(name, "Wolf"),
            other => panic!("expected UnknownSpecies, got {:?}", other),
        }
    }

    #[test]
    fn only_sheep_flock() {
        assert!(matches!(Species::Sheep.motion(), Motion::Steered(_)));
        assert!(matches!(Species::Lion.motion(), Motion::Spiral));
    }
}
