//! Configuration for the mower poller
//!
//! Every throttling constant used by the interval selector and the failure
//! backoff lives here so hosts and tests can tune them.

use chrono::NaiveTime;
use std::time::Duration;

use crate::PollerError;

/// Configuration for [`MowerPoller`](crate::MowerPoller)
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Polling interval requested by the user
    /// Default: 5 minutes
    pub configured_interval: Duration,

    /// Lower bound applied to the configured interval
    /// Default: 4.5 minutes
    pub min_interval: Duration,

    /// Calls allowed per calendar month
    /// Default: 10,000
    pub monthly_quota: u32,

    /// Interval once the monthly quota is used up
    /// Default: 1 hour
    pub quota_interval: Duration,

    /// Interval while every mower is switched off
    /// Default: 1 hour
    pub off_interval: Duration,

    /// Interval during the night window
    /// Default: 3 hours
    pub night_interval: Duration,

    /// Default: 22:00 local time
    pub night_start: NaiveTime,

    /// First minute after the night window
    /// Default: 05:00 local time
    pub night_end: NaiveTime,

    /// Age after which the mower list is fetched again
    /// Default: 24 hours
    pub list_refresh: Duration,

    /// Retries for a failed mower command
    /// Default: 2
    pub command_retries: u32,

    /// Consecutive failed polls tolerated before backing off
    /// Default: 5
    pub failure_threshold: u32,

    /// Upper bound of the failure backoff
    /// Default: 12 hours
    pub max_backoff: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            configured_interval: Duration::from_secs(5 * 60),
            min_interval: Duration::from_secs(270),
            monthly_quota: 10_000,
            quota_interval: Duration::from_secs(60 * 60),
            off_interval: Duration::from_secs(60 * 60),
            night_interval: Duration::from_secs(3 * 60 * 60),
            night_start: NaiveTime::from_hms_opt(22, 0, 0).unwrap_or(NaiveTime::MIN),
            night_end: NaiveTime::from_hms_opt(5, 0, 0).unwrap_or(NaiveTime::MIN),
            list_refresh: Duration::from_secs(24 * 60 * 60),
            command_retries: 2,
            failure_threshold: 5,
            max_backoff: Duration::from_secs(12 * 60 * 60),
        }
    }
}

impl PollerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default configuration polling every `minutes` minutes
    ///
    /// Fractional minutes are accepted; negative or non-finite values fall
    /// back to zero, which the floor then lifts to [`Self::min_interval`].
    /// Values too large for a `Duration` saturate and fail [`Self::validate`].
    pub fn with_interval_minutes(minutes: f64) -> Self {
        let seconds = if minutes.is_finite() && minutes > 0.0 {
            minutes * 60.0
        } else {
            0.0
        };

        Self {
            configured_interval: Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX),
            ..Default::default()
        }
    }

    /// The configured interval once the floor is applied
    pub fn effective_interval(&self) -> Duration {
        self.configured_interval.max(self.min_interval)
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<(), PollerError> {
        if self.min_interval.is_zero() {
            return Err(PollerError::Configuration(
                "Minimum interval must be greater than 0".to_string(),
            ));
        }

        if self.monthly_quota == 0 {
            return Err(PollerError::Configuration(
                "Monthly quota must be greater than 0".to_string(),
            ));
        }

        if self.quota_interval.is_zero() || self.off_interval.is_zero() || self.night_interval.is_zero() {
            return Err(PollerError::Configuration(
                "Throttled intervals must be greater than 0".to_string(),
            ));
        }

        if self.night_start == self.night_end {
            return Err(PollerError::Configuration(
                "Night window start and end must differ".to_string(),
            ));
        }

        if self.configured_interval > self.max_backoff {
            return Err(PollerError::Configuration(format!(
                "Update interval must not exceed {} minutes",
                self.max_backoff.as_secs() / 60
            )));
        }
        if self.max_backoff < self.min_interval {
            return Err(PollerError::Configuration(
                "Maximum backoff must not be below the minimum interval".to_string(),
            ));
        }

        Ok(())
    }
}
