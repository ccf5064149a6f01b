/*
 * Herd Simulation - Module Definitions
 *
 * The flocking and herding engine: per-species behaviour parameters,
 * perception, flock formation under a herd-size limit, a priority steering
 * pipeline and terrain-aware motion. Rendering and input live elsewhere and
 * drive the engine through `Simulation` and `FrameDriver`.
 */

// Re-export key components for easier access
pub use boid::Boid;
pub use config::{BorderPolicy, DriverConfig, EngineConfig, SimulationConfig, WorldConfig};
pub use debug::DebugInfo;
pub use driver::{FrameDriver, FrameReport};
pub use error::{Result, SimError};
pub use flock::{Flock, FlockArena, FlockId};
pub use params::{BehaviourStore, ParamChange, ParamKind, ParamName, ParamSpec, SpeciesProfile};
pub use perception::PerceptionCone;
pub use physics::TickSummary;
pub use population::{BoidId, Population};
pub use simulation::Simulation;
pub use spatial_grid::SpatialGrid;
pub use species::{Motion, Species};
pub use steering::{Obstacle, SteeringContext};
pub use terrain::{FlatTerrain, Heightmap, Terrain};

// Define modules
pub mod boid;
pub mod config;
pub mod debug;
pub mod driver;
pub mod error;
pub mod flock;
pub mod params;
pub mod perception;
pub mod physics;
pub mod population;
pub mod simulation;
pub mod spatial_grid;
pub mod species;
pub mod steering;
pub mod terrain;
pub mod vector;

// Constants
pub const DEFAULT_WORLD_SIZE: f32 = 512.0;
