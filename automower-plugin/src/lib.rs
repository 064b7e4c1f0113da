//! # Automower plugin
//!
//! Exposes the mowers of a Husqvarna Automower Connect account as devices of
//! a home-automation host. The host implements [`HostPlatform`] and drives an
//! [`AutomowerPlugin`]:
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::time::Duration;
//! use automower_plugin::{
//!     AutomowerPlugin, HostPlatform, HostSettings, PluginConfig, PluginParameters,
//! };
//! use chrono::{Local, Utc};
//! use mower_poller::CallCounter;
//!
//! fn run<H: HostPlatform>(host: H) -> automower_plugin::Result<()> {
//!     let params = PluginParameters {
//!         client_id: "app-id".to_string(),
//!         client_secret: "app-secret".to_string(),
//!         update_interval: "5".to_string(),
//!         debug: false,
//!     };
//!     let config = PluginConfig::from_host("Husqvarna", &params, &HostSettings::default(), Path::new("."))?;
//!     let quota = config.poller.monthly_quota;
//!
//!     let mut plugin = AutomowerPlugin::new(host, config);
//!     plugin.on_start(CallCounter::new(quota, Utc::now()), Local::now().fixed_offset())?;
//!     plugin.on_heartbeat(Local::now().fixed_offset())?;
//!     plugin.on_stop(Duration::from_secs(5));
//!     Ok(())
//! }
//! ```
//!
//! ## Devices
//!
//! Each mower gets a device named after it with six units: state text, run
//! switch, battery level, actions selector, location (nearest configured
//! zone) and cutting height selector. See [`devices`].

pub mod config;
pub mod counter_store;
pub mod devices;
pub mod error;
pub mod host;
pub mod logging;
pub mod plugin;
pub mod zones;

pub use config::{AdvancedConfig, HeightRange, HostSettings, PluginConfig, PluginParameters};
pub use devices::{DeviceImage, DeviceKind, DeviceSpec, DeviceUpdate, Unit};
pub use error::{PluginError, Result};
pub use host::HostPlatform;
pub use logging::{init_logging, LoggingMode};
pub use plugin::{AutomowerPlugin, SET_LEVEL};
pub use zones::Zone;
