//! The poller core
//!
//! `MowerPoller` owns the API client, the polling policy state and the last
//! known mower status. It is driven from outside: the host's heartbeat calls
//! [`MowerPoller::poll_if_due`] and user commands go through
//! [`MowerPoller::execute`]. Results are queued as [`PollEvent`]s.

use automower_api::{ApiError, Mower, MowerApi};
use chrono::{DateTime, FixedOffset};

use crate::commands::{CommandKind, CommandTracker, ExecutionStatus, MowerCommand};
use crate::events::PollEvent;
use crate::policy::{aggregate_power, PollingPolicyState};
use crate::quota::{CallCounter, CallCounterSnapshot};
use crate::{PollerConfig, PollerError, Result};

pub struct MowerPoller<A: MowerApi> {
    api: A,
    config: PollerConfig,
    policy: PollingPolicyState,
    mowers: Vec<Mower>,
    listed_at: Option<DateTime<FixedOffset>>,
    authenticated: bool,
    commands: CommandTracker,
    events: Vec<PollEvent>,
}

impl<A: MowerApi> MowerPoller<A> {
    /// Create a poller; nothing is sent to the API until the first cycle
    pub fn new(api: A, config: PollerConfig, counter: CallCounter) -> Result<Self> {
        config.validate()?;
        let policy = PollingPolicyState::new(&config, counter);

        Ok(Self {
            api,
            config,
            policy,
            mowers: Vec::new(),
            listed_at: None,
            authenticated: false,
            commands: CommandTracker::new(),
            events: Vec::new(),
        })
    }

    /// Run a polling cycle when the policy says one is due
    ///
    /// Returns true when a cycle ran.
    pub fn poll_if_due(&mut self, now: DateTime<FixedOffset>) -> bool {
        if !self.policy.is_due(now) {
            return false;
        }
        self.run_cycle(now);
        true
    }

    /// Refresh every mower now and reschedule the next poll
    pub fn run_cycle(&mut self, now: DateTime<FixedOffset>) {
        match self.refresh(now) {
            Ok(()) => {
                self.after_request(None, now);
                self.policy.set_power(aggregate_power(&self.mowers));
                if let Some(decision) = self.policy.record_success(now) {
                    self.events.push(PollEvent::IntervalChanged {
                        interval: decision.interval,
                        rule: decision.rule,
                    });
                }
                self.events.push(PollEvent::MowersUpdated(self.mowers.clone()));
                self.retry_failed_commands(now);
            }
            Err(e) => self.poll_failed(e, now),
        }
    }

    /// Send a user command to a mower
    ///
    /// Commands for unknown or switched-off mowers are refused, as are start
    /// commands while the mower is charging. The outcome is also queued as an
    /// event. The new mower state shows up with the next regular poll.
    pub fn execute(&mut self, command: MowerCommand, now: DateTime<FixedOffset>) -> Result<()> {
        let Some(mower) = self.mowers.iter().find(|m| m.id == command.mower_id) else {
            return self.reject(command, PollerError::UnknownMower);
        };

        if mower.is_off() {
            let name = mower.name.clone();
            return self.reject(command, |_| PollerError::MowerOff(name));
        }

        let charging = command.is_start() && mower.is_charging();
        let name = mower.name.clone();
        self.commands.begin(command.clone());

        if charging {
            self.commands.finish(&command.mower_id, ExecutionStatus::Done);
            return self.reject(command, |_| PollerError::Charging(name));
        }

        if self.policy.counter().is_exhausted() {
            tracing::warn!(
                "Monthly API quota reached, sending {} to {} anyway",
                command.kind,
                name
            );
        }

        self.send(command, now)
    }

    fn reject(&mut self, command: MowerCommand, error: impl FnOnce(String) -> PollerError) -> Result<()> {
        let error = error(command.mower_id.clone());
        tracing::warn!("{}", error);
        self.events.push(PollEvent::CommandRejected {
            command,
            reason: error.to_string(),
        });
        Err(error)
    }

    fn send(&mut self, command: MowerCommand, now: DateTime<FixedOffset>) -> Result<()> {
        let result = self.dispatch(&command);
        self.after_request(result.as_ref().err(), now);

        match result {
            Ok(()) => {
                tracing::debug!("{} accepted for mower {}", command.kind, command.mower_id);
                self.commands.finish(&command.mower_id, ExecutionStatus::Done);
                self.events.push(PollEvent::CommandDone(command));
                Ok(())
            }
            Err(e) => {
                tracing::error!("Error executing {} on {}: {}", command.kind, command.mower_id, e);
                self.commands.finish(&command.mower_id, ExecutionStatus::Error);
                self.events.push(PollEvent::CommandFailed {
                    command,
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn dispatch(&mut self, command: &MowerCommand) -> Result<()> {
        self.ensure_authenticated()?;
        match command.kind {
            CommandKind::Action(action) => self.api.send_action(&command.mower_id, action)?,
            CommandKind::SetCuttingHeight(height) => {
                self.api.set_cutting_height(&command.mower_id, height)?
            }
        }
        Ok(())
    }

    fn retry_failed_commands(&mut self, now: DateTime<FixedOffset>) {
        for command in self.commands.take_retries(self.config.command_retries) {
            // Errors are already queued as events by `send`.
            let _ = self.send(command, now);
        }
    }

    fn ensure_authenticated(&mut self) -> Result<()> {
        if !self.authenticated {
            self.api.authenticate()?;
            self.authenticated = true;
            tracing::debug!("Successfully logged in to Husqvarna API");
        }
        Ok(())
    }

    fn list_is_stale(&self, now: DateTime<FixedOffset>) -> bool {
        match self.listed_at {
            None => true,
            Some(at) => (now - at)
                .to_std()
                .map(|age| age >= self.config.list_refresh)
                .unwrap_or(false),
        }
    }

    fn refresh(&mut self, now: DateTime<FixedOffset>) -> Result<()> {
        self.ensure_authenticated()?;

        if self.list_is_stale(now) {
            // The list documents carry the full status, no per-mower poll needed.
            self.mowers = self.api.list_mowers()?;
            self.listed_at = Some(now);

            let ids: Vec<&str> = self.mowers.iter().map(|m| m.id.as_str()).collect();
            self.commands.retain_mowers(&ids);
            tracing::debug!("Mower list refreshed: {} mower(s)", self.mowers.len());
        } else {
            for index in 0..self.mowers.len() {
                let id = self.mowers[index].id.clone();
                match self.api.mower_status(&id) {
                    Ok(mower) => self.mowers[index] = mower,
                    Err(ApiError::MowerNotFound(id)) => {
                        self.listed_at = None;
                        return Err(ApiError::MowerNotFound(id).into());
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        if self.mowers.is_empty() {
            return Err(PollerError::NoMowers);
        }
        Ok(())
    }

    fn poll_failed(&mut self, error: PollerError, now: DateTime<FixedOffset>) {
        self.after_request(Some(&error), now);
        let retry_in = self.policy.record_failure(now);

        tracing::error!(
            "Error getting status of mowers from Husqvarna Cloud: {} (retry in {}s)",
            error,
            retry_in.as_secs()
        );
        self.events.push(PollEvent::PollFailed {
            message: error.to_string(),
            retry_in,
        });
    }

    /// Book-keeping after any API interaction
    fn after_request(&mut self, error: Option<&PollerError>, now: DateTime<FixedOffset>) {
        let before = self.policy.counter().snapshot();
        let calls = self.api.take_request_count();
        self.policy.record_calls(calls, now);

        if let Some(error) = error {
            if error.is_rate_limited() {
                self.policy.saturate_quota(now);
            }
            if error.is_auth_error() {
                self.authenticated = false;
            }
        }

        self.account_changed(before);
    }

    fn account_changed(&mut self, before: CallCounterSnapshot) {
        let after = self.policy.counter().snapshot();
        if after != before {
            self.events.push(PollEvent::CallCounter(after));
        }
    }

    /// Drain the queued events
    pub fn take_events(&mut self) -> Vec<PollEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn mowers(&self) -> &[Mower] {
        &self.mowers
    }

    pub fn mower(&self, mower_id: &str) -> Option<&Mower> {
        self.mowers.iter().find(|m| m.id == mower_id)
    }

    pub fn policy(&self) -> &PollingPolicyState {
        &self.policy
    }

    pub fn commands(&self) -> &CommandTracker {
        &self.commands
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn counter_snapshot(&self) -> CallCounterSnapshot {
        self.policy.counter().snapshot()
    }
}
