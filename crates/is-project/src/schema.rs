//! Protocol file schema definitions.

use serde::{Deserialize, Serialize};

pub const LATEST_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProtocolFile {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub protocol: ProtocolDef,
    #[serde(default)]
    pub host: HostDef,
}

impl ProtocolFile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: LATEST_VERSION,
            name: name.into(),
            protocol: ProtocolDef::default(),
            host: HostDef::default(),
        }
    }
}

/// Step protocol parameters as stored on disk.
///
/// Missing fields take the plugin defaults. Values the generator clamps
/// (stim time, cycles, increment sign) are stored as written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProtocolDef {
    pub stim_time_ms: f64,
    pub range_start_pa: f64,
    pub range_end_pa: f64,
    pub increment_pa: f64,
    pub cycles: i64,
    pub inter_cycle_interval_s: f64,
    pub downtime_s: f64,
}

impl Default for ProtocolDef {
    fn default() -> Self {
        Self {
            stim_time_ms: 0.25,
            range_start_pa: -100.0,
            range_end_pa: 380.0,
            increment_pa: 20.0,
            cycles: 1,
            inter_cycle_interval_s: 5.0,
            downtime_s: 0.556,
        }
    }
}

/// Host loop settings used for offline runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HostDef {
    /// Real-time period (milliseconds).
    pub period_ms: f64,
    /// Intervals during which the host holds the plugin paused.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pauses: Vec<PauseWindowDef>,
}

impl Default for HostDef {
    fn default() -> Self {
        Self {
            period_ms: 0.1,
            pauses: Vec::new(),
        }
    }
}

/// A pause from `start_s` (inclusive) to `end_s` (exclusive) of host time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PauseWindowDef {
    pub start_s: f64,
    pub end_s: f64,
}
