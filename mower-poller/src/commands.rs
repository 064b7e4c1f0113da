//! Mower commands and their execution tracking

use automower_api::{CuttingHeight, MowerAction};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// What to do with a mower
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Action(MowerAction),
    SetCuttingHeight(CuttingHeight),
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKind::Action(action) => write!(f, "{}", action),
            CommandKind::SetCuttingHeight(height) => write!(f, "Set Cutting Height ({})", height.value()),
        }
    }
}

/// A command addressed to one mower
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MowerCommand {
    pub mower_id: String,
    pub kind: CommandKind,
}

impl MowerCommand {
    pub fn action(mower_id: impl Into<String>, action: MowerAction) -> Self {
        Self {
            mower_id: mower_id.into(),
            kind: CommandKind::Action(action),
        }
    }

    pub fn cutting_height(mower_id: impl Into<String>, height: CuttingHeight) -> Self {
        Self {
            mower_id: mower_id.into(),
            kind: CommandKind::SetCuttingHeight(height),
        }
    }

    pub fn is_start(&self) -> bool {
        matches!(self.kind, CommandKind::Action(action) if action.is_start())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Initiated,
    Done,
    Error,
}

/// Last command sent to a mower
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionState {
    pub command: MowerCommand,
    pub status: ExecutionStatus,
    pub retries: u32,
}

/// Last command per mower, used to retry failed commands on later cycles
#[derive(Debug, Default)]
pub struct CommandTracker {
    states: HashMap<String, ExecutionState>,
}

impl CommandTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new command from the user; resets the retry count
    pub fn begin(&mut self, command: MowerCommand) {
        self.states.insert(
            command.mower_id.clone(),
            ExecutionState {
                command,
                status: ExecutionStatus::Initiated,
                retries: 0,
            },
        );
    }

    pub fn finish(&mut self, mower_id: &str, status: ExecutionStatus) {
        if let Some(state) = self.states.get_mut(mower_id) {
            state.status = status;
        }
    }

    pub fn get(&self, mower_id: &str) -> Option<&ExecutionState> {
        self.states.get(mower_id)
    }

    /// Failed commands with retries left; each returned command is marked
    /// `Initiated` and its retry count bumped
    pub fn take_retries(&mut self, max_retries: u32) -> Vec<MowerCommand> {
        let mut retries: Vec<MowerCommand> = self
            .states
            .values_mut()
            .filter(|s| s.status == ExecutionStatus::Error && s.retries < max_retries)
            .map(|s| {
                s.status = ExecutionStatus::Initiated;
                s.retries += 1;
                tracing::info!(
                    "Retry {} for mower {} to launch command {}",
                    s.retries,
                    s.command.mower_id,
                    s.command.kind
                );
                s.command.clone()
            })
            .collect();
        retries.sort_by(|a, b| a.mower_id.cmp(&b.mower_id));
        retries
    }

    /// Forget mowers no longer linked to the account
    pub fn retain_mowers(&mut self, known: &[&str]) {
        self.states.retain(|id, _| known.contains(&id.as_str()));
    }
}
