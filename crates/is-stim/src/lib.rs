//! Stepped current-injection protocol generator for istep.
//!
//! This crate contains the real-time core: a state machine advanced once per
//! host timestep that walks a staircase of current levels, holding each level
//! for the stimulus time, inserting downtime between steps and an inter-cycle
//! interval between repetitions.
//!
//! # Architecture
//!
//! - [`StepGenerator`] owns the protocol state and implements [`PeriodicSink`]
//! - [`ConfigSource`] is the host's named-parameter surface; [`ParamTable`] is
//!   an in-memory implementation
//! - [`ProtocolConfig`] holds values as entered, [`StepProtocol`] the
//!   normalized form the generator runs
//! - [`HostEvent`] carries the host lifecycle signals (init, modify, pause,
//!   period change)
//!
//! # Real-time rules
//!
//! `execute` never allocates, logs, or fails. All clamping happens when a
//! configuration is applied, and every clamp is reported as an [`Adjustment`].

pub mod error;
pub mod generator;
pub mod host;
pub mod params;
pub mod protocol;
pub mod scaling;
pub mod state;
pub mod timestep;

pub use error::{StimError, StimResult};
pub use generator::StepGenerator;
pub use host::{HostEvent, PeriodicSink};
pub use params::{ConfigSource, ParamId, ParamKind, ParamTable, ParamValue};
pub use protocol::{Adjustment, Normalized, ProtocolConfig, StepProtocol};
pub use scaling::{COMMAND_PER_PICOAMP, picoamps_to_command};
pub use state::{ProtocolState, RunPhase};
pub use timestep::Timestep;
