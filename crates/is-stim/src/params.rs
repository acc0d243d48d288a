//! Named parameter registry and the host configuration surface.
//!
//! The host UI addresses parameters by display name (e.g. `"Stim time (ms)"`).
//! [`ParamId`] maps those names to typed identifiers with units, descriptions
//! and defaults; [`ConfigSource`] is the capability the generator uses to read
//! and write them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{StimError, StimResult};
use crate::protocol::ProtocolConfig;

/// Identifier for a protocol parameter exposed to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ParamId {
    StimTime,
    RangeStart,
    RangeEnd,
    Increment,
    Cycles,
    InterCycleInterval,
    Downtime,
}

impl ParamId {
    /// All parameters in host display order.
    pub const ALL: [ParamId; 7] = [
        ParamId::StimTime,
        ParamId::RangeStart,
        ParamId::RangeEnd,
        ParamId::Increment,
        ParamId::Cycles,
        ParamId::InterCycleInterval,
        ParamId::Downtime,
    ];

    /// Display name used by the host UI.
    pub fn name(self) -> &'static str {
        match self {
            Self::StimTime => "Stim time (ms)",
            Self::RangeStart => "Current Range Start (pA)",
            Self::RangeEnd => "Current Range End (pA)",
            Self::Increment => "Increment (pA)",
            Self::Cycles => "Cycles (#)",
            Self::InterCycleInterval => "Inter-Cycle-Interval (s)",
            Self::Downtime => "Downtime (s)",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::StimTime => "Amount of time current is injected at every step",
            Self::RangeStart => "Starting current of the steps",
            Self::RangeEnd => "Ending current of the steps",
            Self::Increment => "How much the current increases on each step",
            Self::Cycles => "How many times to repeat the protocol",
            Self::InterCycleInterval => {
                "The time between each cycle where the protocol isn't running (output is 0)"
            }
            Self::Downtime => {
                "The time between each step where the protocol isn't running (output is 0)"
            }
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Self::StimTime => "ms",
            Self::RangeStart | Self::RangeEnd | Self::Increment => "pA",
            Self::Cycles => "#",
            Self::InterCycleInterval | Self::Downtime => "s",
        }
    }

    pub fn kind(self) -> ParamKind {
        match self {
            Self::Cycles => ParamKind::UInteger,
            _ => ParamKind::Real,
        }
    }

    pub fn default_value(self) -> ParamValue {
        ProtocolConfig::default().value_of(self)
    }

    /// Look up a parameter by its display name.
    pub fn from_name(name: &str) -> StimResult<Self> {
        Self::ALL
            .into_iter()
            .find(|id| id.name() == name)
            .ok_or_else(|| StimError::UnknownParameter {
                name: name.to_string(),
            })
    }
}

/// Storage kind of a parameter as the host widget sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamKind {
    Real,
    UInteger,
}

/// Parameter value exchanged with the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Integer(i64),
    Real(f64),
}

impl ParamValue {
    pub fn as_real(&self) -> f64 {
        match *self {
            Self::Real(v) => v,
            Self::Integer(v) => v as f64,
        }
    }

    /// Integer view; reals are truncated toward zero (NaN maps to 0).
    pub fn as_integer(&self) -> i64 {
        match *self {
            Self::Real(v) => v.trunc() as i64,
            Self::Integer(v) => v,
        }
    }

    /// Coerce to a storage kind.
    pub fn coerce(self, kind: ParamKind) -> Self {
        match kind {
            ParamKind::Real => Self::Real(self.as_real()),
            ParamKind::UInteger => Self::Integer(self.as_integer()),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Real(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
        }
    }
}

/// Host capability for reading and writing named parameters.
pub trait ConfigSource {
    /// Current value of the named parameter, if the host knows it.
    fn get_parameter(&self, name: &str) -> Option<ParamValue>;

    /// Store a value under the named parameter.
    fn set_parameter(&mut self, name: &str, value: ParamValue) -> StimResult<()>;
}

/// In-memory parameter table seeded with the registry defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamTable {
    values: BTreeMap<ParamId, ParamValue>,
}

impl Default for ParamTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamTable {
    pub fn new() -> Self {
        Self::from_config(&ProtocolConfig::default())
    }

    pub fn from_config(config: &ProtocolConfig) -> Self {
        let values = ParamId::ALL
            .into_iter()
            .map(|id| (id, config.value_of(id)))
            .collect();
        Self { values }
    }

    pub fn get(&self, id: ParamId) -> Option<ParamValue> {
        self.values.get(&id).copied()
    }

    pub fn set(&mut self, id: ParamId, value: impl Into<ParamValue>) {
        self.values.insert(id, value.into().coerce(id.kind()));
    }

    /// Parameters in display order.
    pub fn iter(&self) -> impl Iterator<Item = (ParamId, ParamValue)> + '_ {
        self.values.iter().map(|(id, value)| (*id, *value))
    }
}

impl ConfigSource for ParamTable {
    fn get_parameter(&self, name: &str) -> Option<ParamValue> {
        ParamId::from_name(name).ok().and_then(|id| self.get(id))
    }

    fn set_parameter(&mut self, name: &str, value: ParamValue) -> StimResult<()> {
        let id = ParamId::from_name(name)?;
        self.set(id, value);
        Ok(())
    }
}
