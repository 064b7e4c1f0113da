//! Mower actions and settings sent with `POST`

use serde::Serialize;
use std::fmt;

use crate::{ApiError, Result};

/// Start duration used by the run switch, in minutes
pub const START_24H: u32 = 1440;

/// Start duration used by the actions selector, in minutes
pub const START_6H: u32 = 360;

/// An action accepted by `POST /mowers/{id}/actions`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MowerAction {
    /// Mow for `duration` minutes, overriding the schedule
    Start { duration: u32 },
    Pause,
    ResumeSchedule,
    ParkUntilNextSchedule,
    ParkUntilFurtherNotice,
}

impl MowerAction {
    /// JSON:API `type` of the action
    pub fn name(&self) -> &'static str {
        match self {
            MowerAction::Start { .. } => "Start",
            MowerAction::Pause => "Pause",
            MowerAction::ResumeSchedule => "ResumeSchedule",
            MowerAction::ParkUntilNextSchedule => "ParkUntilNextSchedule",
            MowerAction::ParkUntilFurtherNotice => "ParkUntilFurtherNotice",
        }
    }

    pub fn is_start(&self) -> bool {
        matches!(self, MowerAction::Start { .. })
    }

    pub fn document(&self) -> ActionDocument {
        let attributes = match self {
            MowerAction::Start { duration } => Some(ActionAttributes { duration: *duration }),
            _ => None,
        };

        ActionDocument {
            data: ActionData {
                action_type: self.name(),
                attributes,
            },
        }
    }
}

impl fmt::Display for MowerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MowerAction::Start { duration } => write!(f, "Start ({} min)", duration),
            other => f.write_str(other.name()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ActionDocument {
    pub data: ActionData,
}

#[derive(Debug, Serialize)]
pub struct ActionData {
    #[serde(rename = "type")]
    pub action_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<ActionAttributes>,
}

#[derive(Debug, Serialize)]
pub struct ActionAttributes {
    pub duration: u32,
}

/// Cutting height in the mower's own steps (1 to 9)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CuttingHeight(u8);

impl CuttingHeight {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 9;

    pub fn new(height: u8) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&height) {
            Ok(Self(height))
        } else {
            Err(ApiError::InvalidParameter(format!(
                "Cutting height must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                height
            )))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn document(&self) -> SettingsDocument {
        SettingsDocument {
            data: SettingsData {
                settings_type: "settings",
                attributes: SettingsAttributes {
                    cutting_height: self.0,
                },
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SettingsDocument {
    pub data: SettingsData,
}

#[derive(Debug, Serialize)]
pub struct SettingsData {
    #[serde(rename = "type")]
    pub settings_type: &'static str,
    pub attributes: SettingsAttributes,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsAttributes {
    pub cutting_height: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_start_document_has_duration() {
        let document = MowerAction::Start { duration: START_6H }.document();
        assert_eq!(
            serde_json::to_value(&document).unwrap(),
            json!({"data": {"type": "Start", "attributes": {"duration": 360}}})
        );
    }

    #[test]
    fn test_other_actions_have_no_attributes() {
        let document = MowerAction::ParkUntilFurtherNotice.document();
        assert_eq!(
            serde_json::to_value(&document).unwrap(),
            json!({"data": {"type": "ParkUntilFurtherNotice"}})
        );
    }

    #[test]
    fn test_cutting_height_bounds() {
        assert!(CuttingHeight::new(0).is_err());
        assert!(CuttingHeight::new(10).is_err());
        assert_eq!(CuttingHeight::new(9).unwrap().value(), 9);

        let document = CuttingHeight::new(4).unwrap().document();
        assert_eq!(
            serde_json::to_value(&document).unwrap(),
            json!({"data": {"type": "settings", "attributes": {"cuttingHeight": 4}}})
        );
    }

    #[test]
    fn test_action_display() {
        assert_eq!(MowerAction::Start { duration: START_24H }.to_string(), "Start (1440 min)");
        assert_eq!(MowerAction::Pause.to_string(), "Pause");
    }
}
