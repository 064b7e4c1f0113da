//! Polling interval selector
//!
//! A pure decision table turning the current situation into the time to wait
//! before the next status poll. The first matching rule wins:
//!
//! 1. monthly quota used up: [`IntervalPolicy::quota_interval`]
//! 2. mowers switched off: [`IntervalPolicy::off_interval`]
//! 3. local time inside the night window: [`IntervalPolicy::night_interval`]
//! 4. otherwise the configured interval, floored at [`IntervalPolicy::min_interval`]
//!
//! A throttling rule never polls faster than the floored configured interval.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::PollerConfig;

/// Aggregated power state of the mowers on the account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PowerState {
    On,
    Off,
    /// No status observed yet; treated as [`PowerState::On`]
    #[default]
    Unknown,
}

/// The rule that produced an interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntervalRule {
    QuotaReached,
    MowerOff,
    Night,
    Normal,
}

impl IntervalRule {
    /// Whether the rule slows polling down compared to the configured interval
    pub fn is_throttled(&self) -> bool {
        !matches!(self, IntervalRule::Normal)
    }

    pub fn reason(&self) -> &'static str {
        match self {
            IntervalRule::QuotaReached => "Husqvarna API limits are reached",
            IntervalRule::MowerOff => "all Husqvarna mowers are off",
            IntervalRule::Night => "it is nighttime",
            IntervalRule::Normal => "normal operation",
        }
    }
}

impl fmt::Display for IntervalRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IntervalRule::QuotaReached => "quota reached",
            IntervalRule::MowerOff => "mower off",
            IntervalRule::Night => "night",
            IntervalRule::Normal => "normal",
        };
        f.write_str(name)
    }
}

/// Thresholds used by [`select_interval`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalPolicy {
    pub monthly_quota: u32,
    pub min_interval: Duration,
    pub quota_interval: Duration,
    pub off_interval: Duration,
    pub night_interval: Duration,
    pub night_start: NaiveTime,
    pub night_end: NaiveTime,
}

impl Default for IntervalPolicy {
    fn default() -> Self {
        Self::from(&PollerConfig::default())
    }
}

impl From<&PollerConfig> for IntervalPolicy {
    fn from(config: &PollerConfig) -> Self {
        Self {
            monthly_quota: config.monthly_quota,
            min_interval: config.min_interval,
            quota_interval: config.quota_interval,
            off_interval: config.off_interval,
            night_interval: config.night_interval,
            night_start: config.night_start,
            night_end: config.night_end,
        }
    }
}

impl IntervalPolicy {
    /// Whether `time` falls in `[night_start, night_end)`, wrapping past midnight
    pub fn is_night(&self, time: NaiveTime) -> bool {
        if self.night_start <= self.night_end {
            time >= self.night_start && time < self.night_end
        } else {
            time >= self.night_start || time < self.night_end
        }
    }
}

/// Inputs of one interval decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingInputs {
    /// Local wall-clock time
    pub local_time: NaiveTime,
    pub power: PowerState,
    pub calls_this_month: u32,
    pub configured_interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalDecision {
    pub interval: Duration,
    pub rule: IntervalRule,
}

/// Pick the polling interval for `inputs`
pub fn select_interval(policy: &IntervalPolicy, inputs: &PollingInputs) -> IntervalDecision {
    let baseline = inputs.configured_interval.max(policy.min_interval);

    let (floor, rule) = if inputs.calls_this_month >= policy.monthly_quota {
        (policy.quota_interval, IntervalRule::QuotaReached)
    } else if inputs.power == PowerState::Off {
        (policy.off_interval, IntervalRule::MowerOff)
    } else if policy.is_night(inputs.local_time) {
        (policy.night_interval, IntervalRule::Night)
    } else {
        (baseline, IntervalRule::Normal)
    };

    IntervalDecision {
        interval: floor.max(baseline),
        rule,
    }
}
