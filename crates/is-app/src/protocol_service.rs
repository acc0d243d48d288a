//! Protocol file loading, saving, validation and introspection.

use std::path::Path;

use is_project::schema::{HostDef, ProtocolDef, ProtocolFile};
use is_stim::{Adjustment, ParamId, ParamValue, ProtocolConfig, StepProtocol, Timestep};

use crate::error::{AppError, AppResult};

/// One parameter as entered and as it will run.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSummary {
    pub id: ParamId,
    pub entered: ParamValue,
    pub effective: ParamValue,
}

impl ParameterSummary {
    pub fn adjusted(&self) -> bool {
        self.entered != self.effective
    }
}

/// Summary of a protocol file for listing and previews.
#[derive(Debug, Clone)]
pub struct ProtocolSummary {
    pub name: String,
    pub period_ms: f64,
    pub parameters: Vec<ParameterSummary>,
    pub adjustments: Vec<Adjustment>,
    /// Planned levels of the first cycle.
    pub first_cycle_levels_pa: Vec<f64>,
    /// Planned levels of every later cycle; empty for a single cycle.
    pub later_cycle_levels_pa: Vec<f64>,
    pub cycles: u32,
    pub nominal_total_duration_s: f64,
}

/// Load a protocol file (YAML or JSON by extension).
pub fn load_protocol(path: &Path) -> AppResult<ProtocolFile> {
    if !path.exists() {
        return Err(AppError::ProtocolFileRead {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
        });
    }
    let file = is_project::load(path)?;
    tracing::debug!(path = %path.display(), name = %file.name, "protocol loaded");
    Ok(file)
}

/// Save a protocol file (YAML or JSON by extension).
pub fn save_protocol(path: &Path, file: &ProtocolFile) -> AppResult<()> {
    is_project::save(path, file)?;
    Ok(())
}

/// Validate protocol structure.
pub fn validate_protocol(file: &ProtocolFile) -> AppResult<()> {
    is_project::validate_protocol_file(file)?;
    Ok(())
}

pub fn to_config(def: &ProtocolDef) -> ProtocolConfig {
    ProtocolConfig {
        stim_time_ms: def.stim_time_ms,
        range_start_pa: def.range_start_pa,
        range_end_pa: def.range_end_pa,
        increment_pa: def.increment_pa,
        cycles: def.cycles,
        inter_cycle_interval_s: def.inter_cycle_interval_s,
        downtime_s: def.downtime_s,
    }
}

pub fn from_config(config: &ProtocolConfig) -> ProtocolDef {
    ProtocolDef {
        stim_time_ms: config.stim_time_ms,
        range_start_pa: config.range_start_pa,
        range_end_pa: config.range_end_pa,
        increment_pa: config.increment_pa,
        cycles: config.cycles,
        inter_cycle_interval_s: config.inter_cycle_interval_s,
        downtime_s: config.downtime_s,
    }
}

pub fn host_timestep(host: &HostDef) -> AppResult<Timestep> {
    Ok(Timestep::from_millis(host.period_ms)?)
}

/// Entered vs. effective parameters, planned levels and nominal duration.
pub fn summarize_protocol(file: &ProtocolFile) -> ProtocolSummary {
    let entered = to_config(&file.protocol);
    let normalized = entered.normalize();
    let effective = normalized.protocol.to_config();

    let parameters = ParamId::ALL
        .into_iter()
        .map(|id| ParameterSummary {
            id,
            entered: entered.value_of(id),
            effective: effective.value_of(id),
        })
        .collect();

    let protocol: StepProtocol = normalized.protocol;
    ProtocolSummary {
        name: file.name.clone(),
        period_ms: file.host.period_ms,
        parameters,
        adjustments: normalized.adjustments,
        first_cycle_levels_pa: protocol.ramp_levels(0).collect(),
        later_cycle_levels_pa: if protocol.cycles() > 1 {
            protocol.ramp_levels(1).collect()
        } else {
            Vec::new()
        },
        cycles: protocol.cycles(),
        nominal_total_duration_s: protocol.nominal_total_duration_s(),
    }
}
