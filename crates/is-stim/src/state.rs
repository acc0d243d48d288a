//! Runtime state carried between timesteps.

use serde::{Deserialize, Serialize};

/// Mutable protocol state, advanced once per host timestep.
///
/// Reset to zero whenever a configuration is applied or the host period
/// changes. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProtocolState {
    /// Signed offset from the range start (pA).
    pub current_step_pa: f64,
    /// Time spent holding the current step (seconds).
    pub step_elapsed_s: f64,
    /// Time spent in the inter-cycle gap (seconds).
    pub inter_cycle_elapsed_s: f64,
    /// Time spent in the post-step downtime (seconds).
    pub downtime_elapsed_s: f64,
    /// Completed cycles.
    pub cycle_index: u32,
    /// Last computed output before scaling (pA).
    pub output_pa: f64,
}

impl ProtocolState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Phase given the configured cycle count.
    pub fn phase(&self, cycles: u32) -> RunPhase {
        if self.cycle_index < cycles {
            RunPhase::Running
        } else {
            RunPhase::Done
        }
    }
}

/// Coarse protocol phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunPhase {
    /// Cycles remain; output follows the staircase.
    Running,
    /// All cycles completed; output is pinned at zero. Absorbing.
    Done,
}
