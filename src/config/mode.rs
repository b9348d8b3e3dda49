//! Run mode and loop policy, validated once from command-line flags.

use super::TimeoutPolicy;
use crate::error::{ConfigError, ConfigResult};
use crate::types::{PortSet, TargetSpec};
use ipnetwork::Ipv4Network;
use std::fmt;
use std::num::{NonZeroU32, NonZeroUsize};
use std::time::Duration;

/// When a multi-sweep scan stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPolicy {
    /// Run exactly this many sweeps.
    Count(NonZeroU32),
    /// Sweep until cancelled.
    Continuous,
    /// Sweep until every unit's latest outcome is open.
    UntilAllOpen,
    /// Sweep until every unit's latest outcome is closed.
    UntilAllClosed,
}

impl LoopPolicy {
    /// A single sweep.
    pub const ONCE: Self = Self::Count(NonZeroU32::MIN);

    /// Build the policy from the raw `--loop`, `--loop-open` and
    /// `--loop-closed` flags. At most one of them may be given.
    pub fn from_flags(count: Option<u32>, until_open: bool, until_closed: bool) -> ConfigResult<Self> {
        match (count, until_open, until_closed) {
            (None, false, false) => Ok(Self::ONCE),
            (Some(0), false, false) => Ok(Self::Continuous),
            (Some(k), false, false) => Ok(NonZeroU32::new(k).map_or(Self::Continuous, Self::Count)),
            (None, true, false) => Ok(Self::UntilAllOpen),
            (None, false, true) => Ok(Self::UntilAllClosed),
            (None, true, true) => Err(ConfigError::InvalidLoopPolicy(
                "--loop-open and --loop-closed are mutually exclusive".to_string(),
            )),
            (Some(_), _, _) => Err(ConfigError::InvalidLoopPolicy(
                "--loop cannot be combined with --loop-open or --loop-closed".to_string(),
            )),
        }
    }

    /// True when more than one sweep may run.
    pub fn repeats(&self) -> bool {
        *self != Self::ONCE
    }
}

impl Default for LoopPolicy {
    fn default() -> Self {
        Self::ONCE
    }
}

impl fmt::Display for LoopPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(k) => write!(f, "{k} sweep(s)"),
            Self::Continuous => write!(f, "continuous"),
            Self::UntilAllOpen => write!(f, "until all open"),
            Self::UntilAllClosed => write!(f, "until all closed"),
        }
    }
}

/// Order randomization applied when generating work units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShuffleOptions {
    pub hosts: bool,
    pub ports: bool,
}

/// Everything an active scan needs, already validated.
#[derive(Debug, Clone)]
pub struct ScanPlan {
    pub target: TargetSpec,
    pub exclude: Option<Ipv4Network>,
    pub ports: PortSet,
    pub concurrency: NonZeroUsize,
    pub timeout: TimeoutPolicy,
    pub loop_policy: LoopPolicy,
    pub shuffle: ShuffleOptions,
    pub loop_delay: Duration,
    pub rate_limit: Option<NonZeroU32>,
}

/// Ports to listen on in passive mode.
#[derive(Debug, Clone)]
pub struct ListenPlan {
    pub ports: PortSet,
}

/// The two mutually exclusive ways to run.
#[derive(Debug, Clone)]
pub enum RunMode {
    Scan(ScanPlan),
    Listen(ListenPlan),
}
