//! Offline stand-in for the real-time host.
//!
//! [`HostLoop`] owns a [`StepGenerator`] and a [`ParamTable`] and drives them
//! the way the host does: parameters go in through the table and a `Modify`
//! event, every period calls [`PeriodicSink::execute`], and scheduled pause
//! windows raise `Pause`/`Unpause`.

use is_core::TIME_EPSILON_S;
use is_project::schema::{PauseWindowDef, ProtocolFile};
use is_results::TraceRecord;
use is_stim::{
    ConfigSource, HostEvent, ParamTable, PeriodicSink, ProtocolConfig, StepGenerator, Timestep,
};

use crate::error::{AppError, AppResult};
use crate::protocol_service::{host_timestep, to_config};

/// Half-open interval `[start_s, end_s)` of host time with output disabled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PauseWindow {
    pub start_s: f64,
    pub end_s: f64,
}

impl PauseWindow {
    pub fn new(start_s: f64, end_s: f64) -> AppResult<Self> {
        if !(start_s.is_finite() && end_s.is_finite()) || start_s < 0.0 || end_s <= start_s {
            return Err(AppError::InvalidInput(format!(
                "pause window [{start_s}, {end_s}) is empty or negative"
            )));
        }
        Ok(Self { start_s, end_s })
    }

    pub fn contains(&self, time_s: f64) -> bool {
        time_s + TIME_EPSILON_S >= self.start_s && time_s + TIME_EPSILON_S < self.end_s
    }
}

impl TryFrom<&PauseWindowDef> for PauseWindow {
    type Error = AppError;

    fn try_from(def: &PauseWindowDef) -> AppResult<Self> {
        Self::new(def.start_s, def.end_s)
    }
}

pub struct HostLoop {
    generator: StepGenerator,
    params: ParamTable,
    pauses: Vec<PauseWindow>,
    step: usize,
    /// Host time and step index at the last period change.
    origin: (f64, usize),
}

impl HostLoop {
    /// Build a loop whose parameter table holds `config` and hand it to the
    /// generator through `Init` followed by `Modify`.
    pub fn new(config: &ProtocolConfig, timestep: Timestep) -> Self {
        let mut generator = StepGenerator::new(&ProtocolConfig::default(), timestep);
        let mut params = ParamTable::new();
        generator.update(HostEvent::Init, &mut params);
        params = ParamTable::from_config(config);
        generator.update(HostEvent::Modify, &mut params);
        Self {
            generator,
            params,
            pauses: Vec::new(),
            step: 0,
            origin: (0.0, 0),
        }
    }

    pub fn from_file(file: &ProtocolFile) -> AppResult<Self> {
        let timestep = host_timestep(&file.host)?;
        let pauses = file
            .host
            .pauses
            .iter()
            .map(PauseWindow::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(Self::new(&to_config(&file.protocol), timestep).with_pauses(pauses))
    }

    pub fn with_pauses(mut self, mut pauses: Vec<PauseWindow>) -> Self {
        pauses.sort_by(|a, b| a.start_s.total_cmp(&b.start_s));
        self.pauses = pauses;
        self
    }

    pub fn generator(&self) -> &StepGenerator {
        &self.generator
    }

    /// Parameter values as the host form currently shows them.
    pub fn params(&self) -> &ParamTable {
        &self.params
    }

    /// Host time at the start of the next period.
    pub fn time_s(&self) -> f64 {
        let (origin_s, origin_step) = self.origin;
        origin_s + (self.step - origin_step) as f64 * self.generator.timestep().seconds()
    }

    pub fn steps_taken(&self) -> usize {
        self.step
    }

    pub fn is_done(&self) -> bool {
        self.generator.is_done()
    }

    /// Edit one parameter by display name and re-apply, as an operator would.
    pub fn modify(&mut self, name: &str, value: impl Into<is_stim::ParamValue>) -> AppResult<()> {
        self.params.set_parameter(name, value.into())?;
        self.generator.update(HostEvent::Modify, &mut self.params);
        Ok(())
    }

    /// Change the host period; the protocol restarts.
    pub fn set_period(&mut self, timestep: Timestep) {
        self.origin = (self.time_s(), self.step);
        self.generator
            .update(HostEvent::Period(timestep), &mut self.params);
    }

    /// Run one host period.
    pub fn step(&mut self, input: f64) -> TraceRecord {
        let time_s = self.time_s();
        let should_pause = self.pauses.iter().any(|w| w.contains(time_s));
        if should_pause != self.generator.is_paused() {
            let event = if should_pause {
                HostEvent::Pause
            } else {
                HostEvent::Unpause
            };
            tracing::debug!(time_s, ?event, "pause window edge");
            self.generator.update(event, &mut self.params);
        }

        let cycle_before = self.generator.state().cycle_index;
        let command = self.generator.execute(input);
        let state = self.generator.state();
        if state.cycle_index != cycle_before {
            tracing::debug!(
                time_s,
                cycle = state.cycle_index,
                of = self.generator.protocol().cycles(),
                "cycle completed"
            );
        }

        let paused = self.generator.is_paused();
        let record = TraceRecord {
            step: self.step,
            time_s,
            input,
            command,
            level_pa: self.generator.last_output_pa(),
            cycle_index: state.cycle_index,
            current_step_pa: state.current_step_pa,
            paused,
            done: self.generator.is_done(),
        };
        self.step += 1;
        record
    }
}
