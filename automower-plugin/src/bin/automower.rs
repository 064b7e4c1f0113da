use anyhow::{Context, Result};
use automower_plugin::counter_store::{default_counter_path, load_counter, save_counter};
use automower_plugin::{
    AutomowerPlugin, DeviceSpec, DeviceUpdate, HostPlatform, HostSettings, LoggingMode,
    PluginConfig, PluginParameters,
};
use chrono::{Local, Utc};
use clap::Parser;
use mower_poller::CallCounterSnapshot;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Standalone Automower runner
///
/// Runs the plugin outside a home-automation host and prints device updates
/// to stdout. Useful to check credentials and zone configuration.
#[derive(Parser, Debug)]
#[command(name = "automower")]
#[command(about = "Poll Husqvarna Automowers and print their device updates")]
#[command(version)]
pub struct Args {
    /// Application key from the Husqvarna developer portal
    #[arg(long, env = "AUTOMOWER_CLIENT_ID")]
    pub client_id: String,

    /// Application secret from the Husqvarna developer portal
    #[arg(long, env = "AUTOMOWER_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: String,

    /// Update interval in minutes (decimal comma accepted)
    #[arg(short, long, default_value = "5")]
    pub interval: String,

    /// Name prefixed to every device
    #[arg(long, default_value = "Husqvarna")]
    pub name: String,

    /// Folder holding husqvarna.json
    #[arg(long)]
    pub home: Option<PathBuf>,

    /// Default zone name
    #[arg(long, default_value = "Home")]
    pub title: String,

    /// Default zone location as "lat;lon"
    #[arg(long)]
    pub location: Option<String>,

    /// Where the monthly call counter is stored
    #[arg(long)]
    pub counter_file: Option<PathBuf>,

    /// Seconds between heartbeats
    #[arg(long, default_value = "10")]
    pub heartbeat: u64,

    /// Verbose logging
    #[arg(short, long)]
    pub debug: bool,
}

impl Args {
    pub fn validate(&self) -> Result<()> {
        if self.heartbeat == 0 {
            return Err(anyhow::anyhow!("Heartbeat must be at least 1 second"));
        }
        Ok(())
    }

    fn home(&self) -> PathBuf {
        self.home
            .clone()
            .or_else(|| dirs::config_dir().map(|d| d.join("automower")))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Host printing every device change
struct ConsoleHost {
    devices: HashSet<String>,
    counter_file: Option<PathBuf>,
}

impl HostPlatform for ConsoleHost {
    fn device_exists(&self, device_id: &str) -> bool {
        self.devices.contains(device_id)
    }

    fn create_device(&mut self, spec: &DeviceSpec) -> automower_plugin::Result<()> {
        self.devices.insert(spec.device_id.clone());
        println!("+ {} ({:?})", spec.name, spec.kind);
        Ok(())
    }

    fn update_device(&mut self, update: &DeviceUpdate) -> automower_plugin::Result<()> {
        println!(
            "{} / {}: {}",
            update.device_id,
            update.unit.label(),
            update.s_value.replace('\n', " | ")
        );
        Ok(())
    }

    fn mark_timed_out(&mut self, device_id: Option<&str>) {
        warn!("Devices timed out: {}", device_id.unwrap_or("all"));
    }

    fn persist_call_counter(&mut self, snapshot: &CallCounterSnapshot) -> automower_plugin::Result<()> {
        match &self.counter_file {
            Some(path) => save_counter(path, snapshot),
            None => Ok(()),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    args.validate()?;

    automower_plugin::init_logging(LoggingMode::from_debug_flag(args.debug))
        .context("Failed to initialize logging")?;

    let params = PluginParameters {
        client_id: args.client_id.clone(),
        client_secret: args.client_secret.clone(),
        update_interval: args.interval.clone(),
        debug: args.debug,
    };
    let settings = HostSettings {
        title: args.title.clone(),
        location: args.location.clone(),
    };
    let config = PluginConfig::from_host(args.name.clone(), &params, &settings, &args.home())
        .context("Invalid configuration")?;

    let counter_file = args.counter_file.clone().or_else(default_counter_path);
    let counter = match &counter_file {
        Some(path) => load_counter(path, config.poller.monthly_quota, Utc::now()),
        None => mower_poller::CallCounter::new(config.poller.monthly_quota, Utc::now()),
    };
    info!(
        "{} API calls used this month, {} left",
        counter.calls(),
        counter.remaining()
    );

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Failed to install Ctrl-C handler")?;

    let host = ConsoleHost {
        devices: HashSet::new(),
        counter_file,
    };
    let mut plugin = AutomowerPlugin::new(host, config);
    plugin
        .on_start(counter, Local::now().fixed_offset())
        .context("Failed to start plugin")?;

    let heartbeat = Duration::from_secs(args.heartbeat);
    while running.load(Ordering::SeqCst) {
        plugin.wait_for_events(heartbeat);
        plugin.on_heartbeat(Local::now().fixed_offset())?;
    }

    info!("Stopping");
    if !plugin.on_stop(Duration::from_secs(10)) {
        warn!("Poller did not stop in time");
    }
    Ok(())
}
