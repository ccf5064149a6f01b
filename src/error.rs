/*
 * Error Module
 *
 * Errors surfaced to the collaborator driving the simulation. None of them
 * are fatal to the running tick loop: the caller decides on a fallback.
 */

use thiserror::Error;

use crate::population::BoidId;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Unknown species: {0}")]
    UnknownSpecies(String),

    #[error("Species {species} has no parameter {param}")]
    UnknownParameter { species: String, param: String },

    #[error("Terrain query at ({x}, {y}) is outside the {width}x{height} grid")]
    OutOfBounds {
        x: f32,
        y: f32,
        width: usize,
        height: usize,
    },

    #[error("Terrain grid {width}x{height} needs {expected} heights, got {actual}")]
    TerrainShape {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Boid not found: {0:?}")]
    UnknownBoid(BoidId),

    #[error("Flock bookkeeping is inconsistent: {0}")]
    FlockInconsistent(String),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
