//! Host timestep.
//!
//! The host loop runs at a fixed period and calls the generator once per
//! period. The period may change at runtime, in which case the host signals
//! [`crate::HostEvent::Period`] with the new value.

use is_core::{Time, as_millis, as_seconds, ensure_positive, ms, ns, s};
use serde::{Deserialize, Serialize};

use crate::error::StimResult;

/// Duration of one host period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timestep {
    dt_s: f64,
}

impl Timestep {
    /// Create a timestep from a duration.
    ///
    /// # Errors
    ///
    /// Returns error if the duration is not finite and positive.
    pub fn new(dt: Time) -> StimResult<Self> {
        let dt_s = ensure_positive(as_seconds(dt), "timestep")?;
        Ok(Self { dt_s })
    }

    pub fn from_seconds(dt_s: f64) -> StimResult<Self> {
        Self::new(s(dt_s))
    }

    pub fn from_millis(dt_ms: f64) -> StimResult<Self> {
        Self::new(ms(dt_ms))
    }

    /// Real-time hosts usually report their period in nanoseconds.
    pub fn from_host_period_ns(period_ns: u64) -> StimResult<Self> {
        Self::new(ns(period_ns as f64))
    }

    pub fn seconds(&self) -> f64 {
        self.dt_s
    }

    pub fn millis(&self) -> f64 {
        as_millis(s(self.dt_s))
    }
}
