//! Typed API for the Husqvarna Automower Connect cloud
//!
//! This crate turns the JSON:API documents served by the Automower Connect
//! API into [`Mower`] values and the mower commands into typed
//! [`MowerAction`]s. It uses the private `husqvarna-client` crate for the
//! token handling and request pacing.
//!
//! ```rust,no_run
//! use automower_api::{AutomowerClient, Credentials, MowerAction, MowerApi, START_24H};
//!
//! let mut client = AutomowerClient::new(Credentials::new("app-id", "app-secret"));
//! client.authenticate()?;
//!
//! for mower in client.list_mowers()? {
//!     println!("{}: {} / {}", mower.name, mower.state, mower.activity);
//!     if !mower.is_off() {
//!         client.send_action(&mower.id, MowerAction::Start { duration: START_24H })?;
//!     }
//! }
//! # Ok::<(), automower_api::ApiError>(())
//! ```

pub mod action;
pub mod client;
pub mod error;
pub mod error_codes;
pub mod model;
pub mod mower;

pub use action::{CuttingHeight, MowerAction, START_24H, START_6H};
pub use client::{AutomowerClient, MowerApi};
pub use error::{ApiError, Result};
pub use husqvarna_client::{ClientConfig, Credentials};
pub use mower::{Mower, MowerActivity, MowerFault, MowerState, Position};
