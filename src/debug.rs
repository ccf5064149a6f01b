/*
 * Debug Information Module
 *
 * Snapshot of the simulation for logging and overlays:
 * - Tick count and how long the last tick took
 * - Population and flock statistics
 * - The most recent parameter edit
 */

use std::fmt;
use std::time::Duration;

use crate::params::ParamChange;

#[derive(Debug, Clone, Default)]
pub struct DebugInfo {
    pub tick_count: u64,
    pub last_tick: Duration,
    pub agents: usize,
    pub flocks: usize,
    pub largest_flock: usize,
    pub agents_with_visible_neighbours: usize,
    pub last_merges: usize,
    pub last_modified: Option<ParamChange>,
}

impl DebugInfo {
    // Mean members per flock
    pub fn mean_flock_size(&self) -> f32 {
        if self.flocks == 0 {
            0.0
        } else {
            self.agents as f32 / self.flocks as f32
        }
    }
}

impl fmt::Display for DebugInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tick {} ({:.2?}): {} agents in {} flocks (largest {}, mean {:.1}), {} seeing others, {} merges",
            self.tick_count,
            self.last_tick,
            self.agents,
            self.flocks,
            self.largest_flock,
            self.mean_flock_size(),
            self.agents_with_visible_neighbours,
            self.last_merges,
        )
    }
}
