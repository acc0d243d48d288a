//! Protocol configuration and its normalization.
//!
//! [`ProtocolConfig`] holds parameters exactly as the operator entered them.
//! [`ProtocolConfig::normalize`] turns them into a [`StepProtocol`] whose
//! invariants the generator relies on:
//!
//! - stim time is finite and positive (invalid entries fall back to 0.25 ms)
//! - cycle count is at least 1
//! - the increment is non-zero and carries the sign of `end - start`
//! - inter-cycle interval and downtime are finite and non-negative
//!
//! Every correction is reported as an [`Adjustment`].

use std::fmt;

use is_core::{as_seconds, ms, with_sign_of};
use serde::{Deserialize, Serialize};

use crate::error::StimResult;
use crate::params::{ConfigSource, ParamId, ParamValue};

pub const DEFAULT_STIM_TIME_MS: f64 = 0.25;
pub const DEFAULT_RANGE_START_PA: f64 = -100.0;
pub const DEFAULT_RANGE_END_PA: f64 = 380.0;
pub const DEFAULT_INCREMENT_PA: f64 = 20.0;
pub const DEFAULT_CYCLES: i64 = 1;
pub const DEFAULT_INTER_CYCLE_INTERVAL_S: f64 = 5.0;
pub const DEFAULT_DOWNTIME_S: f64 = 0.556;

/// Protocol parameters as entered by the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Hold time of each step (milliseconds).
    pub stim_time_ms: f64,
    /// First current level (pA).
    pub range_start_pa: f64,
    /// Final current level (pA).
    pub range_end_pa: f64,
    /// Step size (pA). Sign is corrected on normalization.
    pub increment_pa: f64,
    /// Number of times the staircase is repeated.
    pub cycles: i64,
    /// Gap between cycles (seconds).
    pub inter_cycle_interval_s: f64,
    /// Gap after each step (seconds).
    pub downtime_s: f64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            stim_time_ms: DEFAULT_STIM_TIME_MS,
            range_start_pa: DEFAULT_RANGE_START_PA,
            range_end_pa: DEFAULT_RANGE_END_PA,
            increment_pa: DEFAULT_INCREMENT_PA,
            cycles: DEFAULT_CYCLES,
            inter_cycle_interval_s: DEFAULT_INTER_CYCLE_INTERVAL_S,
            downtime_s: DEFAULT_DOWNTIME_S,
        }
    }
}

impl ProtocolConfig {
    /// Value of a single parameter in host representation.
    pub fn value_of(&self, id: ParamId) -> ParamValue {
        match id {
            ParamId::StimTime => ParamValue::Real(self.stim_time_ms),
            ParamId::RangeStart => ParamValue::Real(self.range_start_pa),
            ParamId::RangeEnd => ParamValue::Real(self.range_end_pa),
            ParamId::Increment => ParamValue::Real(self.increment_pa),
            ParamId::Cycles => ParamValue::Integer(self.cycles),
            ParamId::InterCycleInterval => ParamValue::Real(self.inter_cycle_interval_s),
            ParamId::Downtime => ParamValue::Real(self.downtime_s),
        }
    }

    /// Overwrite a single parameter.
    pub fn set_value(&mut self, id: ParamId, value: ParamValue) {
        match id {
            ParamId::StimTime => self.stim_time_ms = value.as_real(),
            ParamId::RangeStart => self.range_start_pa = value.as_real(),
            ParamId::RangeEnd => self.range_end_pa = value.as_real(),
            ParamId::Increment => self.increment_pa = value.as_real(),
            ParamId::Cycles => self.cycles = value.as_integer(),
            ParamId::InterCycleInterval => self.inter_cycle_interval_s = value.as_real(),
            ParamId::Downtime => self.downtime_s = value.as_real(),
        }
    }

    /// Read every known parameter from `source`, keeping `base` values for
    /// parameters the source does not provide.
    pub fn from_source(source: &dyn ConfigSource, base: &ProtocolConfig) -> Self {
        let mut config = base.clone();
        for id in ParamId::ALL {
            if let Some(value) = source.get_parameter(id.name()) {
                config.set_value(id, value);
            }
        }
        config
    }

    /// Write every parameter into `sink`.
    pub fn publish(&self, sink: &mut dyn ConfigSource) -> StimResult<()> {
        for id in ParamId::ALL {
            sink.set_parameter(id.name(), self.value_of(id))?;
        }
        Ok(())
    }

    /// Clamp and sign-correct into a runnable protocol.
    pub fn normalize(&self) -> Normalized {
        let mut adjustments = Vec::new();

        let stim_time_ms = if self.stim_time_ms.is_finite() && self.stim_time_ms > 0.0 {
            self.stim_time_ms
        } else {
            adjustments.push(Adjustment::StimTimeDefaulted {
                from: self.stim_time_ms,
            });
            DEFAULT_STIM_TIME_MS
        };

        let cycles = if self.cycles < 1 {
            adjustments.push(Adjustment::CyclesClamped { from: self.cycles });
            1
        } else {
            u32::try_from(self.cycles).unwrap_or(u32::MAX)
        };

        let range_start_pa = finite_or_default(
            self.range_start_pa,
            DEFAULT_RANGE_START_PA,
            ParamId::RangeStart,
            &mut adjustments,
        );
        let range_end_pa = finite_or_default(
            self.range_end_pa,
            DEFAULT_RANGE_END_PA,
            ParamId::RangeEnd,
            &mut adjustments,
        );

        let magnitude = if self.increment_pa.is_finite() && self.increment_pa != 0.0 {
            self.increment_pa.abs()
        } else {
            adjustments.push(Adjustment::IncrementDefaulted {
                from: self.increment_pa,
            });
            DEFAULT_INCREMENT_PA
        };
        let increment_pa = with_sign_of(magnitude, range_end_pa - range_start_pa);
        if self.increment_pa.is_finite()
            && self.increment_pa != 0.0
            && increment_pa != self.increment_pa
        {
            adjustments.push(Adjustment::IncrementSignCorrected {
                from: self.increment_pa,
                to: increment_pa,
            });
        }

        let inter_cycle_interval_s = non_negative(
            self.inter_cycle_interval_s,
            ParamId::InterCycleInterval,
            &mut adjustments,
        );
        let downtime_s = non_negative(self.downtime_s, ParamId::Downtime, &mut adjustments);

        Normalized {
            protocol: StepProtocol {
                stim_time_ms,
                stim_time_s: as_seconds(ms(stim_time_ms)),
                range_start_pa,
                range_end_pa,
                increment_pa,
                cycles,
                inter_cycle_interval_s,
                downtime_s,
            },
            adjustments,
        }
    }
}

fn finite_or_default(
    value: f64,
    default: f64,
    param: ParamId,
    adjustments: &mut Vec<Adjustment>,
) -> f64 {
    if value.is_finite() {
        value
    } else {
        adjustments.push(Adjustment::Defaulted {
            param,
            from: value,
            to: default,
        });
        default
    }
}

fn non_negative(value: f64, param: ParamId, adjustments: &mut Vec<Adjustment>) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        adjustments.push(Adjustment::Defaulted {
            param,
            from: value,
            to: 0.0,
        });
        0.0
    }
}

/// A correction applied while normalizing a [`ProtocolConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Adjustment {
    /// Non-positive or non-finite stim time replaced by the default.
    StimTimeDefaulted { from: f64 },
    /// Cycle count below one raised to one.
    CyclesClamped { from: i64 },
    /// Increment sign flipped to follow the start-to-end direction.
    IncrementSignCorrected { from: f64, to: f64 },
    /// Zero or non-finite increment replaced by the default magnitude.
    IncrementDefaulted { from: f64 },
    /// Any other parameter replaced by a safe value.
    Defaulted { param: ParamId, from: f64, to: f64 },
}

impl Adjustment {
    /// Parameter the correction applies to.
    pub fn param(&self) -> ParamId {
        match self {
            Self::StimTimeDefaulted { .. } => ParamId::StimTime,
            Self::CyclesClamped { .. } => ParamId::Cycles,
            Self::IncrementSignCorrected { .. } | Self::IncrementDefaulted { .. } => {
                ParamId::Increment
            }
            Self::Defaulted { param, .. } => *param,
        }
    }
}

impl fmt::Display for Adjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StimTimeDefaulted { from } => write!(
                f,
                "{} = {from} is not positive, using {DEFAULT_STIM_TIME_MS}",
                ParamId::StimTime.name()
            ),
            Self::CyclesClamped { from } => {
                write!(f, "{} = {from} is below 1, using 1", ParamId::Cycles.name())
            }
            Self::IncrementSignCorrected { from, to } => write!(
                f,
                "{} = {from} points away from the range end, using {to}",
                ParamId::Increment.name()
            ),
            Self::IncrementDefaulted { from } => write!(
                f,
                "{} = {from} cannot advance the ramp, using {DEFAULT_INCREMENT_PA}",
                ParamId::Increment.name()
            ),
            Self::Defaulted { param, from, to } => {
                write!(f, "{} = {from} is invalid, using {to}", param.name())
            }
        }
    }
}

/// Result of [`ProtocolConfig::normalize`].
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub protocol: StepProtocol,
    pub adjustments: Vec<Adjustment>,
}

/// Normalized protocol the generator executes.
///
/// Only obtainable through [`ProtocolConfig::normalize`], so the invariants
/// listed at module level always hold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepProtocol {
    stim_time_ms: f64,
    stim_time_s: f64,
    range_start_pa: f64,
    range_end_pa: f64,
    increment_pa: f64,
    cycles: u32,
    inter_cycle_interval_s: f64,
    downtime_s: f64,
}

impl Default for StepProtocol {
    fn default() -> Self {
        ProtocolConfig::default().normalize().protocol
    }
}

impl StepProtocol {
    pub fn stim_time_ms(&self) -> f64 {
        self.stim_time_ms
    }

    /// Hold time of each step in seconds.
    pub fn stim_time_s(&self) -> f64 {
        self.stim_time_s
    }

    pub fn range_start_pa(&self) -> f64 {
        self.range_start_pa
    }

    pub fn range_end_pa(&self) -> f64 {
        self.range_end_pa
    }

    /// Signed step size.
    pub fn increment_pa(&self) -> f64 {
        self.increment_pa
    }

    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn inter_cycle_interval_s(&self) -> f64 {
        self.inter_cycle_interval_s
    }

    pub fn downtime_s(&self) -> f64 {
        self.downtime_s
    }

    /// Excursion the step offset covers before a cycle completes.
    ///
    /// This is `|end| + |start|`, not the range width: a ramp from 50 to 200
    /// runs its offset up to 250 and therefore overshoots the end value.
    pub fn max_magnitude(&self) -> f64 {
        self.range_end_pa.abs() + self.range_start_pa.abs()
    }

    /// True when the ramp walks from a higher start toward a lower end.
    pub fn is_descending(&self) -> bool {
        self.range_start_pa > self.range_end_pa
    }

    /// Whether the terminal step of `cycle` is pinned to the range end.
    ///
    /// The pin only engages once the inter-cycle timer has run out. That timer
    /// starts at zero and is only advanced between cycles, so with a non-zero
    /// interval the first cycle emits `start + offset` on its terminal step.
    pub fn terminal_pinned_to_end(&self, cycle: u32) -> bool {
        cycle > 0 || self.inter_cycle_interval_s <= 0.0
    }

    /// Current levels of `cycle` (zero-based) in emission order.
    pub fn ramp_levels(&self, cycle: u32) -> impl Iterator<Item = f64> + '_ {
        let max = self.max_magnitude();
        let pinned = self.terminal_pinned_to_end(cycle);
        (0_u64..)
            .map(move |i| i as f64 * self.increment_pa)
            .take_while(move |offset| offset.abs() <= max)
            .map(move |offset| {
                if pinned && offset.abs() >= max {
                    self.range_end_pa
                } else {
                    self.range_start_pa + offset
                }
            })
    }

    pub fn steps_per_cycle(&self) -> usize {
        self.ramp_levels(0).count()
    }

    /// Nominal cycle length: every step held for the stim time plus downtime.
    pub fn nominal_cycle_duration_s(&self) -> f64 {
        self.steps_per_cycle() as f64 * (self.stim_time_s + self.downtime_s)
    }

    /// Nominal protocol length including inter-cycle gaps.
    pub fn nominal_total_duration_s(&self) -> f64 {
        let cycles = f64::from(self.cycles);
        cycles * self.nominal_cycle_duration_s() + (cycles - 1.0) * self.inter_cycle_interval_s
    }

    /// Configuration equivalent of this protocol; normalizing it is a no-op.
    pub fn to_config(&self) -> ProtocolConfig {
        ProtocolConfig {
            stim_time_ms: self.stim_time_ms,
            range_start_pa: self.range_start_pa,
            range_end_pa: self.range_end_pa,
            increment_pa: self.increment_pa,
            cycles: i64::from(self.cycles),
            inter_cycle_interval_s: self.inter_cycle_interval_s,
            downtime_s: self.downtime_s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(start: f64, end: f64, increment: f64) -> ProtocolConfig {
        ProtocolConfig {
            range_start_pa: start,
            range_end_pa: end,
            increment_pa: increment,
            ..ProtocolConfig::default()
        }
    }

    #[test]
    fn defaults_need_no_adjustment() {
        let normalized = ProtocolConfig::default().normalize();
        assert!(normalized.adjustments.is_empty());
        let p = normalized.protocol;
        assert_eq!(p.cycles(), 1);
        assert_eq!(p.increment_pa(), 20.0);
        assert!((p.stim_time_s() - 0.000_25).abs() < 1e-15);
        assert_eq!(p.max_magnitude(), 480.0);
    }

    #[test]
    fn descending_range_forces_negative_increment() {
        let normalized = config(100.0, 0.0, 20.0).normalize();
        assert_eq!(normalized.protocol.increment_pa(), -20.0);
        assert!(normalized.protocol.is_descending());
        assert_eq!(
            normalized.adjustments,
            vec![Adjustment::IncrementSignCorrected {
                from: 20.0,
                to: -20.0
            }]
        );
    }

    #[test]
    fn ascending_range_forces_positive_increment() {
        let normalized = config(0.0, 100.0, -20.0).normalize();
        assert_eq!(normalized.protocol.increment_pa(), 20.0);
    }

    #[test]
    fn invalid_stim_time_falls_back_to_default() {
        for bad in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            let cfg = ProtocolConfig {
                stim_time_ms: bad,
                ..ProtocolConfig::default()
            };
            let normalized = cfg.normalize();
            assert_eq!(normalized.protocol.stim_time_ms(), 0.25);
            assert_eq!(normalized.adjustments[0].param(), ParamId::StimTime);
        }
    }

    #[test]
    fn cycle_count_clamped_to_one() {
        for bad in [0, -5] {
            let cfg = ProtocolConfig {
                cycles: bad,
                ..ProtocolConfig::default()
            };
            let normalized = cfg.normalize();
            assert_eq!(normalized.protocol.cycles(), 1);
            assert_eq!(
                normalized.adjustments,
                vec![Adjustment::CyclesClamped { from: bad }]
            );
        }
    }

    #[test]
    fn zero_increment_uses_default_magnitude() {
        let normalized = config(200.0, -200.0, 0.0).normalize();
        assert_eq!(normalized.protocol.increment_pa(), -20.0);
        assert_eq!(
            normalized.adjustments,
            vec![Adjustment::IncrementDefaulted { from: 0.0 }]
        );
    }

    #[test]
    fn negative_gaps_clamped_to_zero() {
        let cfg = ProtocolConfig {
            inter_cycle_interval_s: -1.0,
            downtime_s: -0.5,
            ..ProtocolConfig::default()
        };
        let normalized = cfg.normalize();
        assert_eq!(normalized.protocol.inter_cycle_interval_s(), 0.0);
        assert_eq!(normalized.protocol.downtime_s(), 0.0);
        assert_eq!(normalized.adjustments.len(), 2);
    }

    #[test]
    fn ramp_levels_end_exactly_at_range_end() {
        let p = config(0.0, 100.0, 20.0).normalize().protocol;
        let levels: Vec<f64> = p.ramp_levels(0).collect();
        assert_eq!(levels, vec![0.0, 20.0, 40.0, 60.0, 80.0, 100.0]);
    }

    #[test]
    fn ramp_levels_default_protocol() {
        let p = StepProtocol::default();
        let levels: Vec<f64> = p.ramp_levels(0).collect();
        assert_eq!(levels.len(), 25);
        assert_eq!(levels.first(), Some(&-100.0));
        assert_eq!(levels.last(), Some(&380.0));
    }

    #[test]
    fn ramp_overshoots_when_start_and_end_share_sign() {
        let p = config(50.0, 200.0, 20.0).normalize().protocol;
        let levels: Vec<f64> = p.ramp_levels(0).collect();
        assert_eq!(levels.last(), Some(&290.0));
    }

    #[test]
    fn first_cycle_terminal_step_ignores_pin_while_interval_pending() {
        let cfg = ProtocolConfig {
            inter_cycle_interval_s: 0.003,
            cycles: 2,
            ..config(10.0, 30.0, 20.0)
        };
        let p = cfg.normalize().protocol;
        assert!(!p.terminal_pinned_to_end(0));
        assert_eq!(p.ramp_levels(0).collect::<Vec<_>>(), vec![10.0, 30.0, 50.0]);
        assert_eq!(p.ramp_levels(1).collect::<Vec<_>>(), vec![10.0, 30.0, 30.0]);

        let no_gap = ProtocolConfig {
            inter_cycle_interval_s: 0.0,
            ..cfg
        }
        .normalize()
        .protocol;
        assert_eq!(no_gap.ramp_levels(0).collect::<Vec<_>>(), vec![10.0, 30.0, 30.0]);
    }

    #[test]
    fn renormalizing_is_stable() {
        let first = config(100.0, -60.0, 15.0).normalize().protocol;
        let second = first.to_config().normalize();
        assert!(second.adjustments.is_empty());
        assert_eq!(second.protocol, first);
    }

    #[test]
    fn adjustment_messages_name_the_parameter() {
        let msg = Adjustment::CyclesClamped { from: -5 }.to_string();
        assert!(msg.contains("Cycles (#)"));
        assert!(msg.contains("-5"));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn normalized_invariants_hold(
            stim in -10.0_f64..10.0,
            start in -1000.0_f64..1000.0,
            end in -1000.0_f64..1000.0,
            increment in -100.0_f64..100.0,
            cycles in -10_i64..10,
            ici in -5.0_f64..5.0,
            downtime in -5.0_f64..5.0,
        ) {
            let cfg = ProtocolConfig {
                stim_time_ms: stim,
                range_start_pa: start,
                range_end_pa: end,
                increment_pa: increment,
                cycles,
                inter_cycle_interval_s: ici,
                downtime_s: downtime,
            };
            let p = cfg.normalize().protocol;
            prop_assert!(p.stim_time_s() > 0.0);
            prop_assert!(p.cycles() >= 1);
            prop_assert!(p.increment_pa() != 0.0);
            prop_assert!(p.inter_cycle_interval_s() >= 0.0);
            prop_assert!(p.downtime_s() >= 0.0);
            if start > end {
                prop_assert!(p.increment_pa() < 0.0);
            } else {
                prop_assert!(p.increment_pa() > 0.0);
            }
        }

        #[test]
        fn descending_levels_strictly_decrease(
            start in 1.0_f64..500.0,
            end in -500.0_f64..0.0,
            increment in 1.0_f64..50.0,
        ) {
            let cfg = ProtocolConfig {
                range_start_pa: start,
                range_end_pa: end,
                increment_pa: increment,
                ..ProtocolConfig::default()
            };
            let p = cfg.normalize().protocol;
            let levels: Vec<f64> = p.ramp_levels(0).collect();
            for pair in levels.windows(2) {
                prop_assert!(pair[1] < pair[0]);
            }
        }
    }
}
