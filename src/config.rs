/*
 * Simulation Configuration Module
 *
 * SimulationConfig owns everything a tick needs to know that is not agent
 * state: world bounds, border policy, frame driver settings and the
 * behaviour parameter store. It is passed by reference to the components
 * that read it. A TOML file can override any of it; species parameter
 * overrides go through the normal clamping path of the store.
 */

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, SimError};
use crate::params::{BehaviourStore, ParamName};
use crate::species::Species;
use crate::DEFAULT_WORLD_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BorderPolicy {
    #[default]
    Wrap,
    Bounce,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub width: f32,
    pub height: f32,
    // Slack outside the world before wrapping kicks in
    pub padding: f32,
    pub border: BorderPolicy,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WORLD_SIZE,
            height: DEFAULT_WORLD_SIZE,
            padding: 0.0,
            border: BorderPolicy::Wrap,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub frame_rate: f32,
    pub speed_multiplier: f32,
    pub start_paused: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            frame_rate: 60.0,
            speed_multiplier: 1.0,
            start_paused: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub seed: Option<u64>,
    pub enable_spatial_grid: bool,
    // Spread between successive agents of one spawn request
    pub spawn_spacing: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: None,
            enable_spatial_grid: true,
            spawn_spacing: 5.0,
        }
    }
}

// On-disk shape of a config file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    world: WorldConfig,
    driver: DriverConfig,
    simulation: EngineConfig,
    species: BTreeMap<String, BTreeMap<String, f32>>,
}

#[derive(Debug, Default)]
pub struct SimulationConfig {
    pub world: WorldConfig,
    pub driver: DriverConfig,
    pub engine: EngineConfig,
    pub behaviours: BehaviourStore,
}

impl SimulationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        tracing::info!(path = %path.display(), "loading simulation config");
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(text)?;

        let mut config = SimulationConfig {
            world: file.world,
            driver: file.driver,
            engine: file.simulation,
            behaviours: BehaviourStore::new(),
        };

        for (species_name, overrides) in &file.species {
            let species: Species = species_name.parse()?;
            for (key, raw) in overrides {
                let param: ParamName = key.parse().map_err(|param| SimError::UnknownParameter {
                    species: species.to_string(),
                    param,
                })?;
                let applied = config.behaviours.set(species, param, *raw)?;
                if applied != *raw {
                    tracing::warn!(%species, %param, raw, applied, "config value coerced into bounds");
                }
            }
        }

        Ok(config)
    }
}
