use mower_poller::PollerError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Poller error: {0}")]
    Poller(#[from] PollerError),

    #[error("API error: {0}")]
    Api(#[from] automower_api::ApiError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    #[error("Host error: {0}")]
    Host(String),

    #[error("Plugin is not started")]
    NotStarted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PluginError>;
