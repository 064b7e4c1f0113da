//! Quota-aware polling of Husqvarna Automower status
//!
//! The Automower Connect API allows one call per second and 10,000 calls a
//! month. This crate decides how often to poll under those limits and runs
//! the polling on a dedicated worker thread:
//!
//! - [`select_interval`]: the pure interval decision table
//! - [`CallCounter`]: calls used this month, persisted by the host
//! - [`PollingPolicyState`]: schedule, failures and power state between cycles
//! - [`MowerPoller`]: status refresh and command execution against a [`MowerApi`]
//! - [`PollerHandle`]: the worker thread the host talks to
//!
//! ```rust,no_run
//! use automower_api::{AutomowerClient, Credentials};
//! use chrono::{Local, Utc};
//! use mower_poller::{CallCounter, MowerPoller, PollerConfig, PollerHandle};
//!
//! let config = PollerConfig::with_interval_minutes(10.0);
//! let counter = CallCounter::new(config.monthly_quota, Utc::now());
//! let client = AutomowerClient::new(Credentials::new("app-id", "app-secret"));
//!
//! let mut handle = PollerHandle::spawn(MowerPoller::new(client, config, counter)?)?;
//! handle.heartbeat(Local::now().fixed_offset())?;
//! for event in handle.drain_events() {
//!     println!("{:?}", event);
//! }
//! handle.shutdown(std::time::Duration::from_secs(5));
//! # Ok::<(), mower_poller::PollerError>(())
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod policy;
pub mod poller;
pub mod quota;
pub mod selector;
pub mod worker;

pub use automower_api::MowerApi;
pub use commands::{CommandKind, CommandTracker, ExecutionState, ExecutionStatus, MowerCommand};
pub use config::PollerConfig;
pub use error::{PollerError, Result};
pub use events::PollEvent;
pub use policy::{aggregate_power, PollingPolicyState};
pub use poller::MowerPoller;
pub use quota::{CallCounter, CallCounterSnapshot};
pub use selector::{select_interval, IntervalDecision, IntervalPolicy, IntervalRule, PollingInputs, PowerState};
pub use worker::{spawn_poller_worker, PollerHandle, WorkerCommand};
