//! Clock type definitions
//!
//! A clock type tags the semantics of a timestamp axis:
//! - UTC: exact or approximate absolute time
//! - Experiment global time: shared by every device in an experiment
//! - Device global time: continuous across epochs of one device
//! - Device local time: restarts with every epoch
//! - No time: static data without a time axis
//!
//! Approximate and exact variants share an axis and are comparable.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Semantics of a timestamp axis
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClockType {
    /// Exact absolute time
    Utc,
    /// Absolute time known only approximately
    ApproxUtc,
    /// Time shared by all devices in an experiment
    ExpGlobalTime,
    ApproxExpGlobalTime,
    /// Continuous time of one device across its epochs
    DevGlobalTime,
    ApproxDevGlobalTime,
    /// Free-running device clock, restarted every epoch
    #[default]
    DevLocalTime,
    /// Static data, no time axis
    NoTime,
    /// Clock taken from an underlying object, never linked directly
    Inherited,
    /// User-defined axis, linked only within one epoch
    Custom(String),
}

/// Semantic axis shared by comparable clock types
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ClockAxis {
    Utc,
    ExpGlobal,
    DevGlobal,
    DevLocal,
    Custom(String),
}

/// Which node pairs an axis allows to be linked without a sync rule
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LinkScope {
    /// Any two nodes on the axis
    Any,
    /// Nodes owned by the same device
    SameOwner,
    /// Nodes of the same epoch on the same device
    SameEpoch,
}

impl ClockAxis {
    pub fn link_scope(&self) -> LinkScope {
        match self {
            ClockAxis::Utc | ClockAxis::ExpGlobal => LinkScope::Any,
            ClockAxis::DevGlobal => LinkScope::SameOwner,
            ClockAxis::DevLocal | ClockAxis::Custom(_) => LinkScope::SameEpoch,
        }
    }
}

impl ClockType {
    /// Canonical string tag
    pub fn as_str(&self) -> &str {
        match self {
            ClockType::Utc => "utc",
            ClockType::ApproxUtc => "approx_utc",
            ClockType::ExpGlobalTime => "exp_global_time",
            ClockType::ApproxExpGlobalTime => "approx_exp_global_time",
            ClockType::DevGlobalTime => "dev_global_time",
            ClockType::ApproxDevGlobalTime => "approx_dev_global_time",
            ClockType::DevLocalTime => "dev_local_time",
            ClockType::NoTime => "no_time",
            ClockType::Inherited => "inherited",
            ClockType::Custom(name) => name,
        }
    }

    /// Axis this clock type measures, `None` for types without one
    pub fn axis(&self) -> Option<ClockAxis> {
        match self {
            ClockType::Utc | ClockType::ApproxUtc => Some(ClockAxis::Utc),
            ClockType::ExpGlobalTime | ClockType::ApproxExpGlobalTime => {
                Some(ClockAxis::ExpGlobal)
            }
            ClockType::DevGlobalTime | ClockType::ApproxDevGlobalTime => {
                Some(ClockAxis::DevGlobal)
            }
            ClockType::DevLocalTime => Some(ClockAxis::DevLocal),
            ClockType::NoTime | ClockType::Inherited => None,
            ClockType::Custom(name) => Some(ClockAxis::Custom(name.clone())),
        }
    }

    /// Do both clock types denote the same semantic axis?
    pub fn is_comparable(&self, other: &ClockType) -> bool {
        match (self.axis(), other.axis()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    pub fn is_approximate(&self) -> bool {
        matches!(
            self,
            ClockType::ApproxUtc | ClockType::ApproxExpGlobalTime | ClockType::ApproxDevGlobalTime
        )
    }

    /// Does data on this clock have a time axis at all?
    pub fn has_time(&self) -> bool {
        !matches!(self, ClockType::NoTime)
    }
}

impl FromStr for ClockType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "utc" => ClockType::Utc,
            "approx_utc" => ClockType::ApproxUtc,
            "exp_global_time" => ClockType::ExpGlobalTime,
            "approx_exp_global_time" => ClockType::ApproxExpGlobalTime,
            "dev_global_time" => ClockType::DevGlobalTime,
            "approx_dev_global_time" => ClockType::ApproxDevGlobalTime,
            "dev_local_time" => ClockType::DevLocalTime,
            "no_time" => ClockType::NoTime,
            "inherited" => ClockType::Inherited,
            other => ClockType::Custom(other.to_string()),
        })
    }
}

impl From<String> for ClockType {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(clock) => clock,
            Err(never) => match never {},
        }
    }
}

impl From<&str> for ClockType {
    fn from(s: &str) -> Self {
        ClockType::from(s.to_string())
    }
}

impl From<ClockType> for String {
    fn from(clock: ClockType) -> Self {
        clock.as_str().to_string()
    }
}

impl fmt::Debug for ClockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Clock({})", self.as_str())
    }
}

impl fmt::Display for ClockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
