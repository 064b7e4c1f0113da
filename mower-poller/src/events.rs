//! Events emitted by the poller for the host side

use automower_api::Mower;
use std::time::Duration;

use crate::commands::MowerCommand;
use crate::quota::CallCounterSnapshot;
use crate::selector::IntervalRule;

#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    /// Fresh status of every mower on the account
    MowersUpdated(Vec<Mower>),

    /// A status poll failed; the next attempt is `retry_in` away
    PollFailed { message: String, retry_in: Duration },

    /// The interval rule changed
    IntervalChanged { interval: Duration, rule: IntervalRule },

    CommandDone(MowerCommand),

    /// The command was not sent, for instance because the mower is off
    CommandRejected { command: MowerCommand, reason: String },

    /// The command was sent but the API reported an error
    CommandFailed { command: MowerCommand, message: String },

    /// The call counter changed and should be persisted
    CallCounter(CallCounterSnapshot),
}

impl PollEvent {
    /// Mower the event relates to, when it targets a single one
    pub fn mower_id(&self) -> Option<&str> {
        match self {
            PollEvent::CommandDone(command)
            | PollEvent::CommandRejected { command, .. }
            | PollEvent::CommandFailed { command, .. } => Some(&command.mower_id),
            _ => None,
        }
    }
}
