//! Polling policy state
//!
//! Everything the poller remembers between cycles to decide when the next
//! status poll is due: the call counter, the last known power state, the
//! interval currently in force and the consecutive failure count.

use automower_api::Mower;
use chrono::{DateTime, FixedOffset, Utc};
use std::time::Duration;

use crate::quota::CallCounter;
use crate::selector::{select_interval, IntervalDecision, IntervalPolicy, IntervalRule, PollingInputs, PowerState};
use crate::PollerConfig;

/// Power state of an account: off only when every known mower reports `OFF`
pub fn aggregate_power(mowers: &[Mower]) -> PowerState {
    if mowers.is_empty() {
        PowerState::Unknown
    } else if mowers.iter().all(Mower::is_off) {
        PowerState::Off
    } else {
        PowerState::On
    }
}

/// How long to wait after a failed poll
///
/// Up to `threshold` consecutive failures keep the selector interval. Past
/// that the wait grows linearly with the failure count, capped at `max_backoff`,
/// and never drops below the selector interval.
pub fn failure_backoff(
    failures: u32,
    threshold: u32,
    baseline: Duration,
    selected: Duration,
    max_backoff: Duration,
) -> Duration {
    if failures <= threshold {
        return selected;
    }
    let grown = baseline.saturating_mul(failures).min(max_backoff);
    grown.max(selected)
}

#[derive(Debug, Clone)]
pub struct PollingPolicyState {
    policy: IntervalPolicy,
    configured_interval: Duration,
    failure_threshold: u32,
    max_backoff: Duration,
    counter: CallCounter,
    power: PowerState,
    current: Option<IntervalDecision>,
    last_call: Option<DateTime<FixedOffset>>,
    next_poll_at: Option<DateTime<FixedOffset>>,
    failures: u32,
}

impl PollingPolicyState {
    pub fn new(config: &PollerConfig, counter: CallCounter) -> Self {
        Self {
            policy: IntervalPolicy::from(config),
            configured_interval: config.configured_interval,
            failure_threshold: config.failure_threshold,
            max_backoff: config.max_backoff,
            counter,
            power: PowerState::Unknown,
            current: None,
            last_call: None,
            next_poll_at: None,
            failures: 0,
        }
    }

    /// A poll is due before the first cycle and once the wait has elapsed
    pub fn is_due(&self, now: DateTime<FixedOffset>) -> bool {
        self.next_poll_at.map(|at| now >= at).unwrap_or(true)
    }

    /// Account for `calls` API requests issued at `now`
    pub fn record_calls(&mut self, calls: u32, now: DateTime<FixedOffset>) {
        if calls == 0 {
            return;
        }
        self.counter.record(calls, now.with_timezone(&Utc));
        self.last_call = Some(now);
    }

    pub fn saturate_quota(&mut self, now: DateTime<FixedOffset>) {
        if !self.counter.is_exhausted() {
            tracing::warn!(
                "Husqvarna API rate limit hit after {} calls this month",
                self.counter.calls()
            );
        }
        self.counter.saturate(now.with_timezone(&Utc));
    }

    pub fn set_power(&mut self, power: PowerState) {
        self.power = power;
    }

    /// Evaluate the selector for `now` without changing the schedule
    pub fn evaluate(&mut self, now: DateTime<FixedOffset>) -> IntervalDecision {
        self.counter.roll_over(now.with_timezone(&Utc));
        select_interval(
            &self.policy,
            &PollingInputs {
                local_time: now.time(),
                power: self.power,
                calls_this_month: self.counter.calls(),
                configured_interval: self.configured_interval,
            },
        )
    }

    /// Schedule the next poll after a successful one
    ///
    /// Returns the decision when its rule differs from the previous one.
    pub fn record_success(&mut self, now: DateTime<FixedOffset>) -> Option<IntervalDecision> {
        self.failures = 0;
        let decision = self.evaluate(now);
        self.schedule(now, decision.interval);
        self.apply(decision)
    }

    /// Schedule the next poll after a failed one and return the wait
    pub fn record_failure(&mut self, now: DateTime<FixedOffset>) -> Duration {
        self.failures = self.failures.saturating_add(1);
        let decision = self.evaluate(now);
        let wait = failure_backoff(
            self.failures,
            self.failure_threshold,
            self.configured_interval.max(self.policy.min_interval),
            decision.interval,
            self.max_backoff,
        );

        if self.failures == self.failure_threshold + 1 {
            tracing::info!(
                "Reduce status update speed to {} minutes because of too many errors from Husqvarna Cloud",
                minutes(wait)
            );
        }

        self.schedule(now, wait);
        self.apply(decision);
        wait
    }

    /// Set the next poll `wait` after `now`, never further out than `max_backoff`
    fn schedule(&mut self, now: DateTime<FixedOffset>, wait: Duration) {
        let cap = chrono::Duration::from_std(self.max_backoff).unwrap_or_else(|_| chrono::Duration::hours(12));
        let wait = chrono::Duration::from_std(wait).map_or(cap, |w| w.min(cap));
        self.next_poll_at = now.checked_add_signed(wait).or(Some(now));
    }

    fn apply(&mut self, decision: IntervalDecision) -> Option<IntervalDecision> {
        let previous = self.current.replace(decision).map(|d| d.rule);
        if previous == Some(decision.rule) {
            return None;
        }

        match decision.rule {
            IntervalRule::Normal if previous.is_some() => tracing::info!(
                "Re-establish normal update speed to {} minutes",
                minutes(decision.interval)
            ),
            IntervalRule::Normal => tracing::debug!(
                "Polling every {} minutes",
                minutes(decision.interval)
            ),
            rule => tracing::info!(
                "Reduce status update speed to {} minutes as {}",
                minutes(decision.interval),
                rule.reason()
            ),
        }
        Some(decision)
    }

    pub fn counter(&self) -> &CallCounter {
        &self.counter
    }

    pub fn power(&self) -> PowerState {
        self.power
    }

    pub fn current_interval(&self) -> Option<Duration> {
        self.current.map(|d| d.interval)
    }

    pub fn current_rule(&self) -> Option<IntervalRule> {
        self.current.map(|d| d.rule)
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn last_call(&self) -> Option<DateTime<FixedOffset>> {
        self.last_call
    }

    pub fn next_poll_at(&self) -> Option<DateTime<FixedOffset>> {
        self.next_poll_at
    }
}

fn minutes(d: Duration) -> f64 {
    d.as_secs_f64() / 60.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use automower_api::{MowerActivity, MowerState};
    use chrono::TimeZone;

    fn local(hour: u32, minute: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 12, hour, minute, 0)
            .unwrap()
    }

    fn mower(state: MowerState) -> Mower {
        Mower {
            id: "m1".to_string(),
            name: "Front".to_string(),
            model: String::new(),
            battery_percent: 100,
            state,
            activity: MowerActivity::ParkedInCs,
            fault: None,
            position: None,
            cutting_height: None,
            connected: true,
        }
    }

    fn state_with(config: PollerConfig) -> PollingPolicyState {
        let counter = CallCounter::new(config.monthly_quota, local(0, 0).with_timezone(&Utc));
        PollingPolicyState::new(&config, counter)
    }

    #[test]
    fn test_huge_interval_is_capped_at_max_backoff() {
        let mut state = state_with(PollerConfig::with_interval_minutes(1e14));
        state.record_success(local(14, 0));
        assert_eq!(state.next_poll_at(), Some(local(14, 0) + chrono::Duration::hours(12)));

        let mut state = state_with(PollerConfig::with_interval_minutes(1e300));
        state.record_failure(local(14, 0));
        assert_eq!(state.next_poll_at(), Some(local(14, 0) + chrono::Duration::hours(12)));
    }

    #[test]
    fn test_power_aggregation() {
        assert_eq!(aggregate_power(&[]), PowerState::Unknown);
        assert_eq!(aggregate_power(&[mower(MowerState::Off)]), PowerState::Off);
        assert_eq!(
            aggregate_power(&[mower(MowerState::Off), mower(MowerState::Restricted)]),
            PowerState::On
        );
    }

    #[test]
    fn test_first_poll_is_due_immediately() {
        let state = state_with(PollerConfig::default());
        assert!(state.is_due(local(14, 0)));
        assert_eq!(state.current_rule(), None);
    }

    #[test]
    fn test_success_schedules_next_poll() {
        let mut state = state_with(PollerConfig::with_interval_minutes(10.0));
        state.set_power(PowerState::On);

        let changed = state.record_success(local(14, 0));
        assert_eq!(changed.map(|d| d.rule), Some(IntervalRule::Normal));
        assert_eq!(state.next_poll_at(), Some(local(14, 10)));
        assert!(!state.is_due(local(14, 9)));
        assert!(state.is_due(local(14, 10)));

        assert_eq!(state.record_success(local(14, 10)), None);
    }

    #[test]
    fn test_rule_change_is_reported() {
        let mut state = state_with(PollerConfig::default());
        state.record_success(local(14, 0));

        state.set_power(PowerState::Off);
        let changed = state.record_success(local(14, 5));
        assert_eq!(changed.map(|d| d.rule), Some(IntervalRule::MowerOff));
        assert_eq!(state.current_interval(), Some(Duration::from_secs(3600)));
    }

    #[test]
    fn test_quota_saturation_throttles() {
        let mut state = state_with(PollerConfig::default());
        state.record_calls(3, local(14, 0));
        state.saturate_quota(local(14, 0));

        let decision = state.record_success(local(14, 0)).unwrap();
        assert_eq!(decision.rule, IntervalRule::QuotaReached);
        assert_eq!(state.last_call(), Some(local(14, 0)));
    }

    #[test]
    fn test_failures_back_off_after_threshold() {
        let mut state = state_with(PollerConfig::with_interval_minutes(10.0));

        for _ in 0..5 {
            assert_eq!(state.record_failure(local(14, 0)), Duration::from_secs(600));
        }
        assert_eq!(state.record_failure(local(14, 0)), Duration::from_secs(6 * 600));
        assert_eq!(state.failures(), 6);

        state.record_success(local(15, 0));
        assert_eq!(state.failures(), 0);
    }

    #[test]
    fn test_backoff_is_capped() {
        let twelve_hours = Duration::from_secs(12 * 3600);
        let wait = failure_backoff(500, 5, Duration::from_secs(600), Duration::from_secs(600), twelve_hours);
        assert_eq!(wait, twelve_hours);

        let wait = failure_backoff(6, 5, Duration::from_secs(270), Duration::from_secs(3 * 3600), twelve_hours);
        assert_eq!(wait, Duration::from_secs(3 * 3600));
    }
}
