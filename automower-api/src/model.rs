//! JSON:API documents exchanged with the Automower Connect API
//!
//! Only the fields this workspace reads are modelled. Every nested object has
//! serde defaults so a mower that omits a block (no GPS, no settings) still
//! decodes.

use serde::Deserialize;

use crate::mower::{MowerActivity, MowerState};

/// `GET /mowers`
#[derive(Debug, Clone, Deserialize)]
pub struct MowerListDocument {
    #[serde(default)]
    pub data: Vec<MowerResource>,
}

/// `GET /mowers/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct MowerDocument {
    pub data: MowerResource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MowerResource {
    pub id: String,
    #[serde(default)]
    pub attributes: MowerAttributes,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MowerAttributes {
    pub system: SystemAttributes,
    pub battery: BatteryAttributes,
    pub mower: MowerStatusAttributes,
    pub positions: Vec<PositionAttributes>,
    pub settings: SettingsAttributes,
    pub metadata: MetadataAttributes,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemAttributes {
    pub name: String,
    pub model: String,
    pub serial_number: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatteryAttributes {
    pub battery_percent: u8,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MowerStatusAttributes {
    pub mode: Option<String>,
    pub activity: MowerActivity,
    pub state: MowerState,
    pub error_code: Option<u16>,
    pub error_code_timestamp: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct PositionAttributes {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsAttributes {
    pub cutting_height: Option<u8>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetadataAttributes {
    pub connected: bool,
    pub status_timestamp: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_full_status() {
        let body = r#"{
            "data": {
                "type": "mower",
                "id": "c7233734-b219-4287-a173-08e3643f89f0",
                "attributes": {
                    "system": {"name": "Lawn Ranger", "model": "HUSQVARNA AUTOMOWER® 450XH", "serialNumber": 123456},
                    "battery": {"batteryPercent": 77},
                    "mower": {
                        "mode": "MAIN_AREA",
                        "activity": "MOWING",
                        "state": "IN_OPERATION",
                        "errorCode": 0,
                        "errorCodeTimestamp": 0
                    },
                    "positions": [{"latitude": 57.70074, "longitude": 14.4787}],
                    "settings": {"cuttingHeight": 4, "headlight": {"mode": "EVENING_ONLY"}},
                    "metadata": {"connected": true, "statusTimestamp": 1700000000000}
                }
            }
        }"#;

        let document: MowerDocument = serde_json::from_str(body).unwrap();
        let attributes = document.data.attributes;
        assert_eq!(attributes.system.name, "Lawn Ranger");
        assert_eq!(attributes.battery.battery_percent, 77);
        assert_eq!(attributes.mower.activity, MowerActivity::Mowing);
        assert_eq!(attributes.mower.state, MowerState::InOperation);
        assert_eq!(attributes.positions.len(), 1);
        assert_eq!(attributes.settings.cutting_height, Some(4));
        assert!(attributes.metadata.connected);
    }

    #[test]
    fn test_decode_sparse_status() {
        let body = r#"{"data": {"id": "abc", "attributes": {"mower": {"state": "OFF"}}}}"#;

        let document: MowerDocument = serde_json::from_str(body).unwrap();
        let attributes = document.data.attributes;
        assert_eq!(attributes.mower.state, MowerState::Off);
        assert_eq!(attributes.mower.activity, MowerActivity::Unknown);
        assert!(attributes.positions.is_empty());
        assert_eq!(attributes.settings.cutting_height, None);
    }

    #[test]
    fn test_decode_empty_list() {
        let document: MowerListDocument = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(document.data.is_empty());
    }
}
