//! Mapping between mowers and host devices
//!
//! Every mower becomes one host device (keyed by the mower name) with six
//! units. This module builds the unit definitions, turns a [`Mower`] into unit
//! values and translates selector levels back into mower commands.

use automower_api::{ApiError, CuttingHeight, Mower, MowerAction, MowerActivity, START_24H, START_6H};
use std::collections::HashMap;

use crate::config::HeightRange;
use crate::zones::{zone_label, Zone};

/// Units of a mower device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Unit {
    State = 1,
    Run = 2,
    Battery = 3,
    Actions = 4,
    Location = 5,
    CuttingHeight = 6,
}

impl Unit {
    pub const ALL: [Unit; 6] = [
        Unit::State,
        Unit::Run,
        Unit::Battery,
        Unit::Actions,
        Unit::Location,
        Unit::CuttingHeight,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Unit> {
        Unit::ALL.into_iter().find(|u| u.id() == id)
    }

    pub fn label(self) -> &'static str {
        match self {
            Unit::State => "State",
            Unit::Run => "Run",
            Unit::Battery => "Battery Level",
            Unit::Actions => "Actions",
            Unit::Location => "Location",
            Unit::CuttingHeight => "Cutting Height (cm)",
        }
    }
}

/// Icon set shown by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceImage {
    Standard,
    Inverse,
    Off,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceKind {
    Text,
    Switch,
    /// Custom sensor with a `%` axis
    Percentage,
    /// Selector switch; level `10 × i` is named `level_names[i]`
    Selector { level_names: Vec<String> },
}

/// Definition of a unit to create in the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSpec {
    pub device_id: String,
    pub unit: Unit,
    pub name: String,
    pub kind: DeviceKind,
    /// Whether the unit shows up on the host dashboard
    pub used: bool,
}

/// Names of the actions selector levels 0, 10, 20, 30, 40, 50
pub const ACTION_LEVEL_NAMES: [&str; 6] = [
    "Off",
    "Start (6h)",
    "Pause",
    "Resume Schedule",
    "Park Until Further Notice",
    "Park Until Next Schedule",
];

/// Units to create for a newly seen mower
pub fn device_specs(hardware_name: &str, mower_name: &str, height: &HeightRange) -> Vec<DeviceSpec> {
    let spec = |unit: Unit, kind: DeviceKind, used: bool| DeviceSpec {
        device_id: mower_name.to_string(),
        unit,
        name: format!("{} - {} - {}", hardware_name, mower_name, unit.label()),
        kind,
        used,
    };

    vec![
        spec(Unit::State, DeviceKind::Text, true),
        spec(Unit::Run, DeviceKind::Switch, true),
        spec(Unit::Battery, DeviceKind::Percentage, false),
        spec(Unit::Location, DeviceKind::Text, true),
        spec(
            Unit::CuttingHeight,
            DeviceKind::Selector {
                level_names: height.level_names(),
            },
            true,
        ),
        spec(
            Unit::Actions,
            DeviceKind::Selector {
                level_names: ACTION_LEVEL_NAMES.iter().map(|s| s.to_string()).collect(),
            },
            true,
        ),
    ]
}

/// New value for one unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceUpdate {
    pub device_id: String,
    pub unit: Unit,
    pub n_value: i32,
    pub s_value: String,
    pub battery_level: Option<u8>,
    pub image: DeviceImage,
    /// Push even when unchanged
    pub force: bool,
}

/// State unit text: `STATE: ACTIVITY`, then the fault on its own line
pub fn state_text(mower: &Mower) -> String {
    let mut text = match mower.activity {
        MowerActivity::NotApplicable => mower.state.to_string(),
        activity => format!("{}: {}", mower.state, activity),
    };

    if let Some(fault) = &mower.fault {
        text.push('\n');
        text.push_str(fault.description.trim());
    }
    text
}

/// Selector level for a cutting height
pub fn cutting_level(height: u8) -> i32 {
    10 * (i32::from(height) - 1)
}

/// Cutting height for a selector level
pub fn height_for_level(level: i32) -> Result<CuttingHeight, ApiError> {
    let height = u8::try_from(level / 10 + 1)
        .map_err(|_| ApiError::InvalidParameter(format!("Invalid cutting height level {}", level)))?;
    CuttingHeight::new(height)
}

/// Action behind an actions selector level
pub fn action_for_level(level: i32) -> Option<MowerAction> {
    match level {
        10 => Some(MowerAction::Start { duration: START_6H }),
        20 => Some(MowerAction::Pause),
        30 => Some(MowerAction::ResumeSchedule),
        40 => Some(MowerAction::ParkUntilFurtherNotice),
        50 => Some(MowerAction::ParkUntilNextSchedule),
        _ => None,
    }
}

/// Action behind the run switch
pub fn action_for_switch(on: bool) -> MowerAction {
    if on {
        MowerAction::Start { duration: START_24H }
    } else {
        MowerAction::ParkUntilFurtherNotice
    }
}

/// Unit values reflecting the latest status of `mower`
pub fn device_updates(mower: &Mower, zones: &[Zone]) -> Vec<DeviceUpdate> {
    let image = if mower.is_off() {
        DeviceImage::Off
    } else {
        DeviceImage::Standard
    };
    let battery = mower.battery_percent;

    let update = |unit: Unit, n_value: i32, s_value: String| DeviceUpdate {
        device_id: mower.name.clone(),
        unit,
        n_value,
        s_value,
        battery_level: None,
        image,
        force: false,
    };

    let running = i32::from(mower.is_running());
    let mut updates = vec![
        update(Unit::State, 0, state_text(mower)),
        DeviceUpdate {
            battery_level: Some(battery),
            ..update(Unit::Run, running, running.to_string())
        },
        update(Unit::Battery, i32::from(battery), battery.to_string()),
        update(Unit::Location, 0, zone_label(mower.position, zones)),
    ];

    if let Some(height) = mower.cutting_height {
        updates.push(update(Unit::CuttingHeight, 2, cutting_level(height).to_string()));
    }

    // The actions selector is momentary: reset it on every status update.
    updates.push(DeviceUpdate {
        image: if mower.is_off() {
            DeviceImage::Off
        } else {
            DeviceImage::Inverse
        },
        force: true,
        ..update(Unit::Actions, 2, "0".to_string())
    });

    updates
}

/// Last values pushed to the host, to skip unchanged updates
#[derive(Debug, Default)]
pub struct DeviceCache {
    values: HashMap<(String, Unit), DeviceUpdate>,
}

impl DeviceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the updates that are forced or differ from the last pushed value
    pub fn filter_changed(&mut self, updates: Vec<DeviceUpdate>) -> Vec<DeviceUpdate> {
        updates
            .into_iter()
            .filter(|update| {
                let key = (update.device_id.clone(), update.unit);
                let changed = self.values.get(&key) != Some(update);
                if changed {
                    self.values.insert(key, update.clone());
                }
                changed || update.force
            })
            .collect()
    }

    /// Forget cached values so the next update is pushed again
    pub fn invalidate(&mut self, device_id: Option<&str>) {
        match device_id {
            Some(id) => self.values.retain(|(device, _), _| device != id),
            None => self.values.clear(),
        }
    }
}
