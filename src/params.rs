/*
 * Behaviour Parameters Module
 *
 * This module holds the per-species tunable parameters of the simulation.
 * Every parameter carries its bounds, slider step and value kind next to the
 * current value, and every edit goes through one clamping path so the
 * current value can never leave its bounds. Some bounds are derived from
 * other parameters (the danger zone may not reach the comfort zone, for
 * example) and are recomputed after each edit.
 */

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use crate::error::{Result, SimError};
use crate::species::Species;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamName {
    HerdSize,
    MaxAcceleration,
    MaxVelocity,
    Cohesion,
    Adhesion,
    Separation,
    CruisingSpeed,
    ComfortZone,
    DangerZone,
    ObstacleRange,
    FlockmateRange,
    ViewAngle,
    DragFactor,
    PerceptionRadius,
}

impl ParamName {
    pub const ALL: [ParamName; 14] = [
        ParamName::HerdSize,
        ParamName::MaxAcceleration,
        ParamName::MaxVelocity,
        ParamName::Cohesion,
        ParamName::Adhesion,
        ParamName::Separation,
        ParamName::CruisingSpeed,
        ParamName::ComfortZone,
        ParamName::DangerZone,
        ParamName::ObstacleRange,
        ParamName::FlockmateRange,
        ParamName::ViewAngle,
        ParamName::DragFactor,
        ParamName::PerceptionRadius,
    ];

    // Key used in config files
    pub fn key(self) -> &'static str {
        match self {
            ParamName::HerdSize => "herd-size",
            ParamName::MaxAcceleration => "max-acceleration",
            ParamName::MaxVelocity => "max-velocity",
            ParamName::Cohesion => "cohesion",
            ParamName::Adhesion => "adhesion",
            ParamName::Separation => "separation",
            ParamName::CruisingSpeed => "cruising-speed",
            ParamName::ComfortZone => "comfort-zone",
            ParamName::DangerZone => "danger-zone",
            ParamName::ObstacleRange => "obstacle-range",
            ParamName::FlockmateRange => "flockmate-range",
            ParamName::ViewAngle => "view-angle",
            ParamName::DragFactor => "drag-factor",
            ParamName::PerceptionRadius => "perception-radius",
        }
    }

    // Short display name for slider labels
    pub fn label(self) -> &'static str {
        match self {
            ParamName::HerdSize => "Herd Size",
            ParamName::MaxAcceleration => "Max Force",
            ParamName::MaxVelocity => "Max Velocity",
            ParamName::Cohesion => "Cohesion",
            ParamName::Adhesion => "Adhesion",
            ParamName::Separation => "Separation",
            ParamName::CruisingSpeed => "Cruise Speed",
            ParamName::ComfortZone => "Comfort Zone",
            ParamName::DangerZone => "Danger Zone",
            ParamName::ObstacleRange => "Avoidance",
            ParamName::FlockmateRange => "Flock Range",
            ParamName::ViewAngle => "View Angle",
            ParamName::DragFactor => "Drag Factor",
            ParamName::PerceptionRadius => "Perception",
        }
    }
}

impl fmt::Display for ParamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ParamName {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().replace('_', "-").to_ascii_lowercase();
        ParamName::ALL
            .into_iter()
            .find(|name| name.key() == wanted)
            .ok_or_else(|| s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Integer,
    Real,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub kind: ParamKind,
    pub value: f32,
}

impl ParamSpec {
    pub fn integer(min: f32, max: f32, value: f32) -> Self {
        Self { min, max, step: 1.0, kind: ParamKind::Integer, value }
    }

    pub fn real(min: f32, max: f32, step: f32, value: f32) -> Self {
        Self { min, max, step, kind: ParamKind::Real, value }
    }

    // Round to the value kind and clamp into bounds. NaN keeps the current value.
    pub fn coerce(&self, raw: f32) -> f32 {
        if raw.is_nan() {
            return self.value;
        }
        let rounded = match self.kind {
            ParamKind::Integer => raw.round(),
            ParamKind::Real => raw,
        };
        rounded.clamp(self.min, self.max)
    }

    // Replace one bound; a crossing pair collapses onto the upper bound
    fn set_bound(&mut self, bound: Bound, at: f32) {
        match bound {
            Bound::Min => self.min = at,
            Bound::Max => self.max = at,
        }
        if self.min > self.max {
            self.min = self.max;
        }
    }

    // Returns true when the value had to move
    fn reclamp(&mut self) -> bool {
        let clamped = self.coerce(self.value);
        let moved = clamped != self.value;
        self.value = clamped;
        moved
    }
}

#[derive(Debug, Clone, Copy)]
enum Bound {
    Min,
    Max,
}

#[derive(Debug, Clone, Copy)]
enum Source {
    Size,
    Value(ParamName, f32),
}

struct BoundRule {
    target: ParamName,
    bound: Bound,
    source: Source,
}

// Derived bounds, applied to every species that carries both ends of a rule
const BOUND_RULES: &[BoundRule] = &[
    BoundRule { target: ParamName::MaxVelocity, bound: Bound::Min, source: Source::Value(ParamName::CruisingSpeed, 0.0) },
    BoundRule { target: ParamName::CruisingSpeed, bound: Bound::Max, source: Source::Value(ParamName::MaxVelocity, 0.0) },
    BoundRule { target: ParamName::ComfortZone, bound: Bound::Min, source: Source::Size },
    BoundRule { target: ParamName::DangerZone, bound: Bound::Min, source: Source::Size },
    BoundRule { target: ParamName::DangerZone, bound: Bound::Max, source: Source::Value(ParamName::ComfortZone, -1.0) },
    BoundRule { target: ParamName::FlockmateRange, bound: Bound::Min, source: Source::Value(ParamName::ComfortZone, 0.0) },
    BoundRule { target: ParamName::ObstacleRange, bound: Bound::Min, source: Source::Size },
];

#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesProfile {
    pub size: f32,
    params: BTreeMap<ParamName, ParamSpec>,
}

impl SpeciesProfile {
    pub fn new(size: f32, params: impl IntoIterator<Item = (ParamName, ParamSpec)>) -> Self {
        let mut profile = Self { size, params: params.into_iter().collect() };
        profile.recompute_bounds();
        profile
    }

    pub fn get(&self, param: ParamName) -> Option<&ParamSpec> {
        self.params.get(&param)
    }

    pub fn value(&self, param: ParamName) -> Option<f32> {
        self.params.get(&param).map(|spec| spec.value)
    }

    pub fn value_or(&self, param: ParamName, fallback: f32) -> f32 {
        self.value(param).unwrap_or(fallback)
    }

    pub fn params(&self) -> impl Iterator<Item = (ParamName, &ParamSpec)> {
        self.params.iter().map(|(name, spec)| (*name, spec))
    }

    // Flock capacity; species without a herd size never group
    pub fn herd_size(&self) -> usize {
        self.value(ParamName::HerdSize).map_or(1, |v| v.max(1.0) as usize)
    }

    // Recompute derived bounds until no value moves any more
    pub fn recompute_bounds(&mut self) {
        for _ in 0..=BOUND_RULES.len() {
            for rule in BOUND_RULES {
                let at = match rule.source {
                    Source::Size => Some(self.size),
                    Source::Value(param, offset) => self.value(param).map(|v| v + offset),
                };
                if let (Some(at), Some(target)) = (at, self.params.get_mut(&rule.target)) {
                    target.set_bound(rule.bound, at);
                }
            }
            let mut moved = false;
            for spec in self.params.values_mut() {
                moved |= spec.reclamp();
            }
            if !moved {
                break;
            }
        }
    }

    // Clamp, store, and recompute; returns the value that was applied
    fn set(&mut self, param: ParamName, raw: f32) -> Option<f32> {
        let spec = self.params.get_mut(&param)?;
        spec.value = spec.coerce(raw);
        self.recompute_bounds();
        self.value(param)
    }
}

// Record of the most recent edit, for debug overlays
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamChange {
    pub species: Species,
    pub param: ParamName,
    pub value: f32,
    pub at: Instant,
}

type Observer = Box<dyn FnMut(&ParamChange) + Send>;

pub struct BehaviourStore {
    defaults: [SpeciesProfile; 6],
    current: [SpeciesProfile; 6],
    last_modified: Option<ParamChange>,
    observers: Vec<Observer>,
}

impl fmt::Debug for BehaviourStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviourStore")
            .field("current", &self.current)
            .field("last_modified", &self.last_modified)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Default for BehaviourStore {
    fn default() -> Self {
        let defaults = Species::ALL.map(default_profile);
        Self {
            current: defaults.clone(),
            defaults,
            last_modified: None,
            observers: Vec::new(),
        }
    }
}

impl BehaviourStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile(&self, species: Species) -> &SpeciesProfile {
        &self.current[species as usize]
    }

    pub fn default_profile(&self, species: Species) -> &SpeciesProfile {
        &self.defaults[species as usize]
    }

    pub fn get(&self, species: Species, param: ParamName) -> Result<ParamSpec> {
        self.profile(species)
            .get(param)
            .copied()
            .ok_or_else(|| unknown_parameter(species, param))
    }

    // Apply an edit. Out-of-range or fractional values are coerced, never rejected.
    pub fn set(&mut self, species: Species, param: ParamName, raw: f32) -> Result<f32> {
        let applied = self.current[species as usize]
            .set(param, raw)
            .ok_or_else(|| unknown_parameter(species, param))?;

        tracing::debug!(%species, %param, raw, applied, "parameter edited");

        let change = ParamChange { species, param, value: applied, at: Instant::now() };
        self.last_modified = Some(change);
        for observer in &mut self.observers {
            observer(&change);
        }
        Ok(applied)
    }

    pub fn reset_to_default(&mut self, species: Species) {
        self.current[species as usize] = self.defaults[species as usize].clone();
        tracing::debug!(%species, "parameters reset to defaults");
    }

    pub fn last_modified(&self) -> Option<&ParamChange> {
        self.last_modified.as_ref()
    }

    // Register a callback invoked after every successful edit
    pub fn subscribe(&mut self, observer: impl FnMut(&ParamChange) + Send + 'static) {
        self.observers.push(Box::new(observer));
    }
}

fn unknown_parameter(species: Species, param: ParamName) -> SimError {
    SimError::UnknownParameter {
        species: species.to_string(),
        param: param.to_string(),
    }
}

fn default_profile(species: Species) -> SpeciesProfile {
    use ParamName::*;

    let int = ParamSpec::integer;
    let real = ParamSpec::real;

    match species {
        Species::Sheep => SpeciesProfile::new(
            8.0,
            [
                (HerdSize, int(1.0, 100.0, 32.0)),
                (MaxAcceleration, int(1.0, 10.0, 1.0)),
                (MaxVelocity, int(1.0, 10.0, 4.0)),
                (Cohesion, real(0.0, 1.0, 0.1, 0.3)),
                (Adhesion, real(0.0, 1.0, 0.1, 0.5)),
                (Separation, real(0.0, 1.0, 0.1, 0.2)),
                (CruisingSpeed, int(0.0, 4.0, 0.0)),
                (ComfortZone, int(32.0, 100.0, 40.0)),
                (DangerZone, int(32.0, 40.0, 32.0)),
                (ObstacleRange, int(32.0, 100.0, 32.0)),
                (FlockmateRange, int(40.0, 100.0, 40.0)),
                (ViewAngle, int(90.0, 180.0, 90.0)),
                (DragFactor, int(0.0, 55.0, 10.0)),
            ],
        ),
        Species::Lion => wanderer(32.0, 8.0, 9.0, 0.2, 0.1, 0.7, 15.0),
        Species::Fox => wanderer(8.0, 7.0, 8.0, 0.2, 0.1, 0.6, 12.0),
        Species::Penguin => wanderer(12.0, 3.0, 5.0, 0.8, 0.7, 0.4, 8.0),
        Species::Bunny => wanderer(8.0, 9.0, 7.0, 0.1, 0.1, 0.8, 6.0),
        Species::Fish => wanderer(8.0, 4.0, 6.0, 0.9, 0.8, 0.3, 10.0),
    }
}

// Profile shape shared by the species that do not herd
fn wanderer(
    size: f32,
    max_acceleration: f32,
    max_velocity: f32,
    cohesion: f32,
    adhesion: f32,
    separation: f32,
    perception: f32,
) -> SpeciesProfile {
    SpeciesProfile::new(
        size,
        [
            (ParamName::MaxAcceleration, ParamSpec::integer(1.0, 10.0, max_acceleration)),
            (ParamName::MaxVelocity, ParamSpec::integer(1.0, 10.0, max_velocity)),
            (ParamName::Cohesion, ParamSpec::real(0.0, 1.0, 0.1, cohesion)),
            (ParamName::Adhesion, ParamSpec::real(0.0, 1.0, 0.1, adhesion)),
            (ParamName::Separation, ParamSpec::real(0.0, 1.0, 0.1, separation)),
            (ParamName::PerceptionRadius, ParamSpec::integer(1.0, 20.0, perception)),
        ],
    )
}
