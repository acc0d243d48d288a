//! The step generator state machine.
//!
//! Each call to [`PeriodicSink::execute`] walks one host period through the
//! protocol:
//!
//! - **Inter-cycle gap**: after the first cycle, output stays at zero until the
//!   inter-cycle interval has elapsed
//! - **Hold**: the level `start + offset` is emitted for the stim time; the
//!   terminal offset emits exactly the range end once the inter-cycle gate
//!   is satisfied
//! - **Downtime**: output drops to zero between steps
//! - **Advance**: the offset moves by the increment; once its magnitude
//!   passes `|start| + |end|` the cycle completes
//!
//! After the last cycle the generator is done and emits zero forever.

use is_core::TIME_EPSILON_S;

use crate::host::{HostEvent, PeriodicSink};
use crate::params::ConfigSource;
use crate::protocol::{Adjustment, ProtocolConfig, StepProtocol};
use crate::scaling::picoamps_to_command;
use crate::state::{ProtocolState, RunPhase};
use crate::timestep::Timestep;

/// Stepped current-injection generator.
///
/// # Example
///
/// ```
/// use is_stim::{PeriodicSink, ProtocolConfig, StepGenerator, Timestep};
///
/// let config = ProtocolConfig {
///     stim_time_ms: 10.0,
///     range_start_pa: 0.0,
///     range_end_pa: 100.0,
///     increment_pa: 20.0,
///     cycles: 1,
///     inter_cycle_interval_s: 0.0,
///     downtime_s: 0.0,
/// };
/// let mut generator = StepGenerator::new(&config, Timestep::from_millis(1.0).unwrap());
///
/// // First step holds the range start.
/// assert_eq!(generator.execute(0.0), 0.0);
/// for _ in 0..9 {
///     generator.execute(0.0);
/// }
/// // Second step: 20 pA scaled to the amplifier command.
/// assert!((generator.execute(0.0) - 0.01).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct StepGenerator {
    config: ProtocolConfig,
    protocol: StepProtocol,
    state: ProtocolState,
    timestep: Timestep,
    paused: bool,
    input: f64,
    command: f64,
}

impl StepGenerator {
    /// Create a generator and apply `config`.
    pub fn new(config: &ProtocolConfig, timestep: Timestep) -> Self {
        let mut generator = Self {
            config: config.clone(),
            protocol: StepProtocol::default(),
            state: ProtocolState::default(),
            timestep,
            paused: false,
            input: 0.0,
            command: 0.0,
        };
        generator.apply(config);
        generator
    }

    /// Apply a configuration: normalize it and restart the protocol.
    ///
    /// Returns the corrections made while normalizing. Must not be called
    /// from inside the periodic callback.
    pub fn apply(&mut self, config: &ProtocolConfig) -> Vec<Adjustment> {
        let normalized = config.normalize();
        for adjustment in &normalized.adjustments {
            tracing::warn!(param = adjustment.param().name(), "{adjustment}");
        }
        self.config = config.clone();
        self.protocol = normalized.protocol;
        self.reset();
        tracing::debug!(
            start_pa = self.protocol.range_start_pa(),
            end_pa = self.protocol.range_end_pa(),
            increment_pa = self.protocol.increment_pa(),
            cycles = self.protocol.cycles(),
            "protocol applied"
        );
        normalized.adjustments
    }

    /// Adopt a new host period and restart the protocol.
    pub fn set_timestep(&mut self, timestep: Timestep) {
        self.timestep = timestep;
        self.reset();
        tracing::debug!(dt_ms = timestep.millis(), "host period changed");
    }

    /// Handle a host lifecycle event.
    ///
    /// `Init` and `Modify` write the normalized parameters back to `source` so
    /// the host displays the values actually in effect.
    pub fn update(&mut self, event: HostEvent, source: &mut dyn ConfigSource) {
        match event {
            HostEvent::Init => {
                let config = self.config.clone();
                self.apply(&config);
                self.publish(source);
            }
            HostEvent::Modify => {
                let config = ProtocolConfig::from_source(&*source, &self.config);
                self.apply(&config);
                self.publish(source);
            }
            HostEvent::Pause => self.pause(),
            HostEvent::Unpause => self.resume(),
            HostEvent::Period(timestep) => self.set_timestep(timestep),
        }
    }

    fn publish(&self, source: &mut dyn ConfigSource) {
        if let Err(err) = self.protocol.to_config().publish(source) {
            tracing::warn!(error = %err, "failed to publish parameters to host");
        }
    }

    /// Force the output to zero without advancing the protocol.
    pub fn pause(&mut self) {
        self.paused = true;
        self.state.output_pa = 0.0;
        self.command = 0.0;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Restart the protocol from the first step of the first cycle.
    pub fn reset(&mut self) {
        self.state.reset();
        self.command = 0.0;
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn protocol(&self) -> &StepProtocol {
        &self.protocol
    }

    pub fn state(&self) -> &ProtocolState {
        &self.state
    }

    pub fn timestep(&self) -> Timestep {
        self.timestep
    }

    pub fn phase(&self) -> RunPhase {
        self.state.phase(self.protocol.cycles())
    }

    pub fn is_done(&self) -> bool {
        self.phase() == RunPhase::Done
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Last input sample latched by `execute`.
    pub fn last_input(&self) -> f64 {
        self.input
    }

    /// Level behind the last emitted command (pA); zero while paused.
    pub fn last_output_pa(&self) -> f64 {
        self.state.output_pa
    }

    /// Last emitted command sample.
    pub fn last_command(&self) -> f64 {
        self.command
    }

    /// Advance one period and return the raw level (pA).
    fn advance(&mut self) -> f64 {
        let p = &self.protocol;
        let s = &mut self.state;
        let dt = self.timestep.seconds();

        let mut output = 0.0;
        if s.cycle_index >= p.cycles() {
            return output;
        }

        let max_magnitude = p.max_magnitude();
        if p.is_descending() {
            s.current_step_pa = -s.current_step_pa.abs();
        }
        let hold_s = p.stim_time_s();
        let mut magnitude = s.current_step_pa.abs();

        if magnitude <= max_magnitude {
            if s.step_elapsed_s < hold_s - TIME_EPSILON_S {
                if s.inter_cycle_elapsed_s < p.inter_cycle_interval_s() && s.cycle_index > 0 {
                    output = 0.0;
                    s.inter_cycle_elapsed_s += dt;
                } else if magnitude >= max_magnitude
                    && s.inter_cycle_elapsed_s >= p.inter_cycle_interval_s()
                {
                    output = p.range_end_pa();
                    s.step_elapsed_s += dt;
                    s.downtime_elapsed_s = 0.0;
                } else {
                    output += p.range_start_pa() + s.current_step_pa;
                    s.step_elapsed_s += dt;
                    s.downtime_elapsed_s = 0.0;
                }
            } else {
                s.step_elapsed_s += dt;
            }

            if s.downtime_elapsed_s < p.downtime_s() && s.step_elapsed_s >= hold_s {
                output = 0.0;
                s.downtime_elapsed_s += dt;
            }

            if s.step_elapsed_s >= hold_s - TIME_EPSILON_S
                && s.downtime_elapsed_s >= p.downtime_s()
            {
                s.current_step_pa += p.increment_pa();
                s.step_elapsed_s = 0.0;
                s.downtime_elapsed_s = 0.0;
            }

            magnitude = s.current_step_pa.abs();
        }

        if magnitude > max_magnitude {
            s.cycle_index += 1;
            s.current_step_pa = 0.0;
            s.inter_cycle_elapsed_s = 0.0;
            s.downtime_elapsed_s = 0.0;
        }

        output
    }
}

impl PeriodicSink for StepGenerator {
    fn execute(&mut self, input: f64) -> f64 {
        self.input = input;
        if self.paused {
            self.state.output_pa = 0.0;
            self.command = 0.0;
            return self.command;
        }
        let level = self.advance();
        self.state.output_pa = level;
        self.command = picoamps_to_command(level);
        self.command
    }
}
