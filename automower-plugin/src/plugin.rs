//! Plugin lifecycle
//!
//! `AutomowerPlugin` is what the host drives: `on_start` once, `on_heartbeat`
//! on every host tick, `on_command` when the user operates a unit and
//! `on_stop` on shutdown. API work runs on the poller worker thread; the
//! plugin applies the worker's events to the host devices.

use std::time::Duration;

use automower_api::{AutomowerClient, Mower, MowerApi};
use chrono::{DateTime, FixedOffset};
use mower_poller::{CallCounter, MowerCommand, MowerPoller, PollEvent, PollerHandle};

use crate::config::PluginConfig;
use crate::devices::{
    action_for_level, action_for_switch, device_specs, device_updates, height_for_level, DeviceCache,
    Unit,
};
use crate::host::HostPlatform;
use crate::logging::{init_once, LoggingMode};
use crate::{PluginError, Result};

/// Host command for the `Set Level` selector action
pub const SET_LEVEL: &str = "Set Level";

pub struct AutomowerPlugin<H: HostPlatform> {
    host: H,
    config: PluginConfig,
    worker: Option<PollerHandle>,
    mowers: Vec<Mower>,
    cache: DeviceCache,
    stop_requested: bool,
}

impl<H: HostPlatform> AutomowerPlugin<H> {
    pub fn new(host: H, config: PluginConfig) -> Self {
        Self {
            host,
            config,
            worker: None,
            mowers: Vec::new(),
            cache: DeviceCache::new(),
            stop_requested: false,
        }
    }

    /// Start polling the Automower Connect cloud with the configured credentials
    pub fn on_start(&mut self, counter: CallCounter, now: DateTime<FixedOffset>) -> Result<()> {
        let client = AutomowerClient::new(self.config.credentials.clone());
        self.start_with_api(client, counter, now)
    }

    /// Start polling through `api`
    pub fn start_with_api<A: MowerApi + 'static>(
        &mut self,
        api: A,
        counter: CallCounter,
        now: DateTime<FixedOffset>,
    ) -> Result<()> {
        if self.worker.is_some() {
            return Err(PluginError::Config("Plugin is already started".to_string()));
        }

        if let Err(e) = init_once(LoggingMode::from_debug_flag(self.config.debug)) {
            // Lost the race against another subscriber; keep using it.
            tracing::debug!("{}", e);
        }

        tracing::debug!(
            "Starting with interval {:?}, {} of {} calls used this month",
            self.config.poller.effective_interval(),
            counter.calls(),
            counter.quota()
        );

        let poller = MowerPoller::new(api, self.config.poller.clone(), counter)?;
        let worker = PollerHandle::spawn(poller)?;
        worker.heartbeat(now)?;

        self.worker = Some(worker);
        self.stop_requested = false;
        Ok(())
    }

    /// Host tick: let the worker poll when due and apply what it reported
    pub fn on_heartbeat(&mut self, now: DateTime<FixedOffset>) -> Result<()> {
        if self.stop_requested {
            return Ok(());
        }
        self.worker()?.heartbeat(now)?;
        self.process_events();
        Ok(())
    }

    /// A unit was operated in the host
    ///
    /// `device_id` is the mower name. `command` is `On`/`Off` for the run
    /// switch and [`SET_LEVEL`] for selectors. Unknown units and levels are
    /// ignored.
    pub fn on_command(
        &mut self,
        device_id: &str,
        unit: u8,
        command: &str,
        level: i32,
        now: DateTime<FixedOffset>,
    ) -> Result<()> {
        tracing::debug!(
            "on_command for {}/{}: {} (level {})",
            device_id,
            unit,
            command,
            level
        );

        if self.stop_requested {
            return Ok(());
        }
        if self.worker.is_none() {
            self.host.mark_timed_out(Some(device_id));
            return Err(PluginError::NotStarted);
        }

        let Some(mower) = self.mowers.iter().find(|m| m.name == device_id) else {
            tracing::error!("Mower {} not found in connected mowers", device_id);
            self.host.mark_timed_out(Some(device_id));
            return Err(PluginError::UnknownDevice(device_id.to_string()));
        };

        let command = match (Unit::from_id(unit), command) {
            (Some(Unit::Run), "On") => MowerCommand::action(&mower.id, action_for_switch(true)),
            (Some(Unit::Run), "Off") => MowerCommand::action(&mower.id, action_for_switch(false)),
            (Some(Unit::CuttingHeight), SET_LEVEL) => {
                MowerCommand::cutting_height(&mower.id, height_for_level(level)?)
            }
            (Some(Unit::Actions), SET_LEVEL) => match action_for_level(level) {
                Some(action) => MowerCommand::action(&mower.id, action),
                None => return Ok(()),
            },
            _ => return Ok(()),
        };

        self.worker()?.execute(command, now)?;
        Ok(())
    }

    /// Stop the worker, waiting up to `timeout`
    pub fn on_stop(&mut self, timeout: Duration) -> bool {
        self.stop_requested = true;
        let stopped = match self.worker.as_mut() {
            Some(worker) => worker.shutdown(timeout),
            None => true,
        };
        self.process_events();
        self.worker = None;
        stopped
    }

    /// Apply every event the worker has produced so far
    pub fn process_events(&mut self) -> usize {
        let events = match &self.worker {
            Some(worker) => worker.drain_events(),
            None => return 0,
        };
        let count = events.len();
        for event in events {
            self.apply(event);
        }
        count
    }

    /// Wait up to `timeout` for the worker, then apply everything it produced
    pub fn wait_for_events(&mut self, timeout: Duration) -> usize {
        let first = match &self.worker {
            Some(worker) => worker.recv_event_timeout(timeout),
            None => None,
        };
        match first {
            Some(event) => {
                self.apply(event);
                1 + self.process_events()
            }
            None => 0,
        }
    }

    fn apply(&mut self, event: PollEvent) {
        match event {
            PollEvent::MowersUpdated(mowers) => {
                for mower in &mowers {
                    self.update_mower_devices(mower);
                }
                self.mowers = mowers;
            }
            PollEvent::PollFailed { .. } => {
                self.host.mark_timed_out(None);
                self.cache.invalidate(None);
            }
            PollEvent::IntervalChanged { interval, rule } => {
                tracing::debug!("Polling every {:?} ({})", interval, rule);
            }
            PollEvent::CommandDone(command) => {
                tracing::debug!("{} done for {}", command.kind, command.mower_id);
            }
            PollEvent::CommandRejected { command, reason } => {
                tracing::info!("{} not sent to {}: {}", command.kind, command.mower_id, reason);
            }
            PollEvent::CommandFailed { command, .. } => {
                let name = self.mower_name(&command.mower_id);
                self.host.mark_timed_out(Some(&name));
                self.cache.invalidate(Some(&name));
            }
            PollEvent::CallCounter(snapshot) => {
                if let Err(e) = self.host.persist_call_counter(&snapshot) {
                    tracing::warn!("Failed to persist call counter: {}", e);
                }
            }
        }
    }

    fn update_mower_devices(&mut self, mower: &Mower) {
        if !self.host.device_exists(&mower.name) {
            tracing::info!("Creating devices for mower {}", mower.name);
            let specs = device_specs(&self.config.hardware_name, &mower.name, &self.config.advanced.height);
            for spec in &specs {
                if let Err(e) = self.host.create_device(spec) {
                    tracing::error!("Failed to create {} for {}: {}", spec.unit.label(), mower.name, e);
                }
            }
            self.cache.invalidate(Some(&mower.name));
        }

        let updates = device_updates(mower, self.config.advanced.zones());
        for update in self.cache.filter_changed(updates) {
            if let Err(e) = self.host.update_device(&update) {
                tracing::error!("Failed to update {} of {}: {}", update.unit.label(), mower.name, e);
            }
        }
    }

    fn mower_name(&self, mower_id: &str) -> String {
        self.mowers
            .iter()
            .find(|m| m.id == mower_id)
            .map(|m| m.name.clone())
            .unwrap_or_else(|| mower_id.to_string())
    }

    fn worker(&self) -> Result<&PollerHandle> {
        self.worker.as_ref().ok_or(PluginError::NotStarted)
    }

    pub fn mowers(&self) -> &[Mower] {
        &self.mowers
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().map(PollerHandle::is_running).unwrap_or(false)
    }
}
