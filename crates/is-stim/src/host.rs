//! Host-facing capabilities.
//!
//! The real-time host owns the loop. It drives the generator through two
//! seams: a lifecycle channel ([`HostEvent`]) on the non-real-time control
//! path, and the per-period [`PeriodicSink::execute`] call.

use crate::timestep::Timestep;

/// Lifecycle signals raised by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostEvent {
    /// Plugin created: publish the current configuration to the host.
    Init,
    /// Operator edited parameters: read them back and re-apply.
    Modify,
    /// Output disabled; state is kept.
    Pause,
    /// Output re-enabled.
    Unpause,
    /// Host period changed.
    Period(Timestep),
}

/// Receives one input sample per host period and returns one output sample.
///
/// Implementations must be bounded-time: no blocking, allocation or I/O.
pub trait PeriodicSink {
    fn execute(&mut self, input: f64) -> f64;
}
