//! Error types for the mower-poller crate

use automower_api::ApiError;

/// Errors raised by the poller and its worker
#[derive(Debug, thiserror::Error)]
pub enum PollerError {
    /// The Automower API call failed
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The command targets a mower that is not linked to the account
    #[error("Unknown mower: {0}")]
    UnknownMower(String),

    /// Commands are refused while the mower is switched off
    #[error("Mower {0} is switched off and cannot execute commands")]
    MowerOff(String),

    /// Start commands are refused while the mower is charging
    #[error("Mower {0} cannot be started as it is still charging")]
    Charging(String),

    /// The account has no mowers linked to it
    #[error("No Husqvarna mowers available from the Husqvarna Cloud")]
    NoMowers,

    /// The worker thread is gone
    #[error("Poller worker is not running")]
    WorkerStopped,

    #[error("Failed to spawn poller worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Type alias for results that can return a PollerError
pub type Result<T> = std::result::Result<T, PollerError>;

impl PollerError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, PollerError::Api(e) if e.is_rate_limited())
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, PollerError::Api(e) if e.is_auth_error())
    }

    /// Whether the command was refused before reaching the API
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            PollerError::UnknownMower(_) | PollerError::MowerOff(_) | PollerError::Charging(_)
        )
    }
}
