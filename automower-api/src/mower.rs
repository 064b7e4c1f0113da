//! Domain view of a mower built from the latest status document

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error_codes;
use crate::model::{MowerResource, PositionAttributes};

/// Operating state reported under `attributes.mower.state`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MowerState {
    NotApplicable,
    Paused,
    InOperation,
    WaitUpdating,
    WaitPowerUp,
    Restricted,
    Off,
    Stopped,
    Error,
    FatalError,
    ErrorAtPowerUp,
    #[default]
    #[serde(other)]
    Unknown,
}

impl MowerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MowerState::Unknown => "UNKNOWN",
            MowerState::NotApplicable => "NOT_APPLICABLE",
            MowerState::Paused => "PAUSED",
            MowerState::InOperation => "IN_OPERATION",
            MowerState::WaitUpdating => "WAIT_UPDATING",
            MowerState::WaitPowerUp => "WAIT_POWER_UP",
            MowerState::Restricted => "RESTRICTED",
            MowerState::Off => "OFF",
            MowerState::Stopped => "STOPPED",
            MowerState::Error => "ERROR",
            MowerState::FatalError => "FATAL_ERROR",
            MowerState::ErrorAtPowerUp => "ERROR_AT_POWER_UP",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            MowerState::Error | MowerState::FatalError | MowerState::ErrorAtPowerUp
        )
    }
}

impl fmt::Display for MowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Activity reported under `attributes.mower.activity`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MowerActivity {
    NotApplicable,
    Mowing,
    GoingHome,
    Charging,
    Leaving,
    ParkedInCs,
    StoppedInGarden,
    #[default]
    #[serde(other)]
    Unknown,
}

impl MowerActivity {
    pub fn as_str(&self) -> &'static str {
        match self {
            MowerActivity::Unknown => "UNKNOWN",
            MowerActivity::NotApplicable => "NOT_APPLICABLE",
            MowerActivity::Mowing => "MOWING",
            MowerActivity::GoingHome => "GOING_HOME",
            MowerActivity::Charging => "CHARGING",
            MowerActivity::Leaving => "LEAVING",
            MowerActivity::ParkedInCs => "PARKED_IN_CS",
            MowerActivity::StoppedInGarden => "STOPPED_IN_GARDEN",
        }
    }

    /// Activities during which the mower counts as running
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            MowerActivity::Leaving
                | MowerActivity::Mowing
                | MowerActivity::Charging
                | MowerActivity::GoingHome
        )
    }
}

impl fmt::Display for MowerActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fault attached to a mower in an error state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MowerFault {
    pub code: u16,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<PositionAttributes> for Position {
    fn from(p: PositionAttributes) -> Self {
        Self {
            latitude: p.latitude,
            longitude: p.longitude,
        }
    }
}

/// Latest known status of one mower
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mower {
    pub id: String,
    pub name: String,
    pub model: String,
    pub battery_percent: u8,
    pub state: MowerState,
    pub activity: MowerActivity,
    pub fault: Option<MowerFault>,
    /// Most recent GPS fix; the API lists positions newest first
    pub position: Option<Position>,
    pub cutting_height: Option<u8>,
    pub connected: bool,
}

impl Mower {
    pub fn is_off(&self) -> bool {
        self.state == MowerState::Off
    }

    pub fn is_charging(&self) -> bool {
        self.activity == MowerActivity::Charging
    }

    pub fn is_running(&self) -> bool {
        self.activity.is_running()
    }
}

impl From<MowerResource> for Mower {
    fn from(resource: MowerResource) -> Self {
        let attributes = resource.attributes;
        let status = attributes.mower;

        let fault = if status.state.is_error() {
            let code = status.error_code.unwrap_or(0);
            Some(MowerFault {
                code,
                description: error_codes::describe_or_unknown(code),
            })
        } else {
            None
        };

        Self {
            id: resource.id,
            name: attributes.system.name,
            model: attributes.system.model,
            battery_percent: attributes.battery.battery_percent,
            state: status.state,
            activity: status.activity,
            fault,
            position: attributes.positions.first().copied().map(Position::from),
            cutting_height: attributes.settings.cutting_height,
            connected: attributes.metadata.connected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MowerDocument;

    fn mower_from(body: &str) -> Mower {
        let document: MowerDocument = serde_json::from_str(body).unwrap();
        Mower::from(document.data)
    }

    #[test]
    fn test_unrecognised_values_map_to_unknown() {
        let state: MowerState = serde_json::from_str(r#""HIBERNATING""#).unwrap();
        assert_eq!(state, MowerState::Unknown);

        let activity: MowerActivity = serde_json::from_str(r#""SUNBATHING""#).unwrap();
        assert_eq!(activity, MowerActivity::Unknown);

        let state: MowerState = serde_json::from_str(r#""UNKNOWN""#).unwrap();
        assert_eq!(state, MowerState::Unknown);
        assert_eq!(serde_json::to_string(&MowerState::Unknown).unwrap(), r#""UNKNOWN""#);
        assert_eq!(serde_json::to_string(&MowerActivity::GoingHome).unwrap(), r#""GOING_HOME""#);
    }

    #[test]
    fn test_state_round_trips_through_text() {
        let state: MowerState = serde_json::from_str(r#""ERROR_AT_POWER_UP""#).unwrap();
        assert_eq!(state, MowerState::ErrorAtPowerUp);
        assert_eq!(state.to_string(), "ERROR_AT_POWER_UP");
        assert_eq!(MowerActivity::ParkedInCs.to_string(), "PARKED_IN_CS");
    }

    #[test]
    fn test_error_state_carries_fault() {
        let mower = mower_from(
            r#"{"data": {"id": "m1", "attributes": {
                "system": {"name": "Front"},
                "mower": {"state": "ERROR", "activity": "NOT_APPLICABLE", "errorCode": 9}
            }}}"#,
        );

        assert_eq!(
            mower.fault,
            Some(MowerFault { code: 9, description: "Trapped".to_string() })
        );
    }

    #[test]
    fn test_healthy_state_ignores_error_code() {
        let mower = mower_from(
            r#"{"data": {"id": "m1", "attributes": {
                "mower": {"state": "IN_OPERATION", "activity": "MOWING", "errorCode": 9}
            }}}"#,
        );

        assert_eq!(mower.fault, None);
        assert!(mower.is_running());
        assert!(!mower.is_off());
    }

    #[test]
    fn test_first_position_is_kept() {
        let mower = mower_from(
            r#"{"data": {"id": "m1", "attributes": {
                "positions": [
                    {"latitude": 50.85, "longitude": 4.35},
                    {"latitude": 50.84, "longitude": 4.34}
                ]
            }}}"#,
        );

        assert_eq!(mower.position, Some(Position { latitude: 50.85, longitude: 4.35 }));
    }

    #[test]
    fn test_running_activities() {
        assert!(MowerActivity::Leaving.is_running());
        assert!(MowerActivity::Charging.is_running());
        assert!(!MowerActivity::ParkedInCs.is_running());
        assert!(!MowerActivity::StoppedInGarden.is_running());
    }
}
