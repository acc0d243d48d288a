//! Result data types.

use serde::{Deserialize, Serialize};

pub type RunId = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunManifest {
    pub run_id: RunId,
    pub protocol_name: String,
    pub timestamp: String,
    pub run_type: RunType,
    pub period_ms: f64,
    pub generator_version: String,
    pub samples: usize,
}

impl RunManifest {
    /// Manifest stamped with the current UTC time.
    pub fn now(
        run_id: RunId,
        protocol_name: impl Into<String>,
        run_type: RunType,
        period_ms: f64,
        generator_version: impl Into<String>,
        samples: usize,
    ) -> Self {
        Self {
            run_id,
            protocol_name: protocol_name.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            run_type,
            period_ms,
            generator_version: generator_version.into(),
            samples,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum RunType {
    /// Fixed number of host periods.
    Steps { steps: usize },
    /// Run until the protocol is done, bounded by `max_steps`.
    UntilDone { max_steps: usize },
}

/// One host period of a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceRecord {
    pub step: usize,
    pub time_s: f64,
    pub input: f64,
    /// Scaled amplifier command.
    pub command: f64,
    /// Level before scaling (pA).
    pub level_pa: f64,
    pub cycle_index: u32,
    pub current_step_pa: f64,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub done: bool,
}
