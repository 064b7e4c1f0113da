//! Plugin lifecycle against a scripted MowerApi and a recording host

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use automower_api::{
    ApiError, CuttingHeight, Mower, MowerAction, MowerActivity, MowerApi, MowerState, Position,
};
use automower_plugin::{
    AutomowerPlugin, DeviceSpec, DeviceUpdate, HostPlatform, HostSettings, PluginConfig,
    PluginError, PluginParameters, Unit, SET_LEVEL,
};
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use mower_poller::{CallCounter, CallCounterSnapshot};
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

#[derive(Default)]
struct FakeState {
    mowers: Vec<Mower>,
    failures: VecDeque<ApiError>,
    log: Vec<String>,
    requests: u32,
}

/// Scripted API; queued failures apply to counted requests only
#[derive(Clone, Default)]
struct FakeApi(Arc<Mutex<FakeState>>);

impl FakeApi {
    fn with_mowers(mowers: Vec<Mower>) -> Self {
        let api = Self::default();
        api.0.lock().unwrap().mowers = mowers;
        api
    }

    fn fail_next(&self, error: ApiError) {
        self.0.lock().unwrap().failures.push_back(error);
    }

    fn log(&self) -> Vec<String> {
        self.0.lock().unwrap().log.clone()
    }

    fn call(&self, entry: String) -> Result<(), ApiError> {
        let mut fake = self.0.lock().unwrap();
        fake.log.push(entry);
        fake.requests += 1;
        match fake.failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl MowerApi for FakeApi {
    fn authenticate(&mut self) -> automower_api::Result<()> {
        Ok(())
    }

    fn list_mowers(&mut self) -> automower_api::Result<Vec<Mower>> {
        self.call("list".to_string())?;
        Ok(self.0.lock().unwrap().mowers.clone())
    }

    fn mower_status(&mut self, mower_id: &str) -> automower_api::Result<Mower> {
        self.call(format!("status {}", mower_id))?;
        let fake = self.0.lock().unwrap();
        fake.mowers
            .iter()
            .find(|m| m.id == mower_id)
            .cloned()
            .ok_or_else(|| ApiError::MowerNotFound(mower_id.to_string()))
    }

    fn send_action(&mut self, mower_id: &str, action: MowerAction) -> automower_api::Result<()> {
        self.call(format!("action {} {}", mower_id, action))
    }

    fn set_cutting_height(&mut self, mower_id: &str, height: CuttingHeight) -> automower_api::Result<()> {
        self.call(format!("height {} {}", mower_id, height.value()))
    }

    fn take_request_count(&mut self) -> u32 {
        std::mem::take(&mut self.0.lock().unwrap().requests)
    }
}

#[derive(Default)]
struct RecordingHost {
    created: Vec<DeviceSpec>,
    updates: Vec<DeviceUpdate>,
    timed_out: Vec<Option<String>>,
    counters: Vec<CallCounterSnapshot>,
}

impl RecordingHost {
    fn last_update(&self, device_id: &str, unit: Unit) -> Option<&DeviceUpdate> {
        self.updates
            .iter()
            .rev()
            .find(|u| u.device_id == device_id && u.unit == unit)
    }
}

impl HostPlatform for RecordingHost {
    fn device_exists(&self, device_id: &str) -> bool {
        self.created.iter().any(|spec| spec.device_id == device_id)
    }

    fn create_device(&mut self, spec: &DeviceSpec) -> automower_plugin::Result<()> {
        self.created.push(spec.clone());
        Ok(())
    }

    fn update_device(&mut self, update: &DeviceUpdate) -> automower_plugin::Result<()> {
        self.updates.push(update.clone());
        Ok(())
    }

    fn mark_timed_out(&mut self, device_id: Option<&str>) {
        self.timed_out.push(device_id.map(str::to_string));
    }

    fn persist_call_counter(&mut self, snapshot: &CallCounterSnapshot) -> automower_plugin::Result<()> {
        self.counters.push(snapshot.clone());
        Ok(())
    }
}

fn mower(id: &str, name: &str, state: MowerState, activity: MowerActivity) -> Mower {
    Mower {
        id: id.to_string(),
        name: name.to_string(),
        model: "AUTOMOWER 430X".to_string(),
        battery_percent: 64,
        state,
        activity,
        fault: None,
        position: None,
        cutting_height: Some(5),
        connected: true,
    }
}

fn two_mowers() -> FakeApi {
    let mut front = mower("m1", "Front", MowerState::InOperation, MowerActivity::Mowing);
    front.position = Some(Position {
        latitude: 52.0001,
        longitude: 4.0001,
    });
    FakeApi::with_mowers(vec![
        front,
        mower("m2", "Back", MowerState::Off, MowerActivity::NotApplicable),
    ])
}

fn local(hour: u32, minute: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(2 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 6, 12, hour, minute, 0)
        .unwrap()
}

fn plugin_config(home: &TempDir) -> PluginConfig {
    let params = PluginParameters {
        client_id: "app-id".to_string(),
        client_secret: "app-secret".to_string(),
        update_interval: "5".to_string(),
        debug: false,
    };
    let settings = HostSettings {
        title: "Garden".to_string(),
        location: Some("52.0;4.0".to_string()),
    };
    PluginConfig::from_host("Husqvarna", &params, &settings, home.path()).unwrap()
}

/// Start a plugin on `api` and apply the first poll
fn started(api: &FakeApi) -> (AutomowerPlugin<RecordingHost>, TempDir) {
    let home = tempfile::tempdir().unwrap();
    let mut plugin = AutomowerPlugin::new(RecordingHost::default(), plugin_config(&home));
    let counter = CallCounter::new(10_000, Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
    plugin.start_with_api(api.clone(), counter, local(14, 0)).unwrap();
    pump_until(&mut plugin, |p| !p.mowers().is_empty());
    (plugin, home)
}

/// Apply worker events until `done` holds or two seconds pass
fn pump_until(plugin: &mut AutomowerPlugin<RecordingHost>, done: impl Fn(&AutomowerPlugin<RecordingHost>) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !done(plugin) && Instant::now() < deadline {
        plugin.wait_for_events(Duration::from_millis(50));
    }
    assert!(done(plugin), "condition not reached before deadline");
}

fn wait_for_log(api: &FakeApi, entry: &str) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !api.log().iter().any(|e| e == entry) && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(api.log().iter().any(|e| e == entry), "{:?} never sent: {:?}", entry, api.log());
}

// ============================================================================
// Devices
// ============================================================================

#[test]
fn test_first_poll_creates_units_for_every_mower() {
    let api = two_mowers();
    let (mut plugin, _home) = started(&api);

    let host = plugin.host();
    assert_eq!(host.created.len(), 12);
    for name in ["Front", "Back"] {
        let mut units: Vec<Unit> = host
            .created
            .iter()
            .filter(|s| s.device_id == name)
            .map(|s| s.unit)
            .collect();
        units.sort();
        assert_eq!(units, Unit::ALL.to_vec());
    }
    assert_eq!(host.created[0].name, "Husqvarna - Front - State");

    assert!(plugin.on_stop(Duration::from_secs(2)));
}

#[test]
fn test_status_values_are_pushed() {
    let api = two_mowers();
    let (mut plugin, _home) = started(&api);

    let host = plugin.host();
    assert_eq!(
        host.last_update("Front", Unit::State).unwrap().s_value,
        "IN_OPERATION: MOWING"
    );
    assert_eq!(host.last_update("Front", Unit::Run).unwrap().n_value, 1);
    assert_eq!(host.last_update("Front", Unit::Run).unwrap().battery_level, Some(64));
    assert_eq!(host.last_update("Front", Unit::Battery).unwrap().s_value, "64");
    assert_eq!(host.last_update("Front", Unit::Location).unwrap().s_value, "Garden");
    assert_eq!(host.last_update("Front", Unit::CuttingHeight).unwrap().s_value, "40");
    assert_eq!(host.last_update("Front", Unit::Actions).unwrap().s_value, "0");

    assert_eq!(host.last_update("Back", Unit::State).unwrap().s_value, "OFF");
    assert_eq!(host.last_update("Back", Unit::Run).unwrap().n_value, 0);
    assert_eq!(host.last_update("Back", Unit::Location).unwrap().s_value, "Unknown");

    plugin.on_stop(Duration::from_secs(2));
}

#[test]
fn test_unchanged_status_only_resets_actions() {
    let api = two_mowers();
    let (mut plugin, _home) = started(&api);
    let before = plugin.host().updates.len();

    plugin.on_heartbeat(local(14, 10)).unwrap();
    pump_until(&mut plugin, |p| p.host().updates.len() >= before + 2);
    plugin.wait_for_events(Duration::from_millis(100));

    let new_units: Vec<Unit> = plugin.host().updates[before..].iter().map(|u| u.unit).collect();
    assert_eq!(new_units, vec![Unit::Actions, Unit::Actions]);

    plugin.on_stop(Duration::from_secs(2));
}

#[test]
fn test_call_counter_is_persisted() {
    let api = two_mowers();
    let (mut plugin, _home) = started(&api);
    pump_until(&mut plugin, |p| !p.host().counters.is_empty());

    let snapshot = plugin.host().counters.last().unwrap();
    assert_eq!((snapshot.year, snapshot.month), (2024, 6));
    assert!(snapshot.calls >= 1);

    plugin.on_stop(Duration::from_secs(2));
}

#[test]
fn test_failed_poll_marks_devices_timed_out() {
    let api = two_mowers();
    let (mut plugin, _home) = started(&api);

    api.fail_next(ApiError::NetworkError("connection reset".to_string()));
    api.fail_next(ApiError::NetworkError("connection reset".to_string()));
    plugin.on_heartbeat(local(14, 10)).unwrap();
    pump_until(&mut plugin, |p| p.host().timed_out.contains(&None));

    plugin.on_stop(Duration::from_secs(2));
}

// ============================================================================
// Commands
// ============================================================================

#[test]
fn test_run_switch_starts_and_parks() {
    let api = two_mowers();
    let (mut plugin, _home) = started(&api);

    plugin.on_command("Front", Unit::Run.id(), "On", 0, local(14, 1)).unwrap();
    wait_for_log(&api, "action m1 Start (1440 min)");

    plugin.on_command("Front", Unit::Run.id(), "Off", 0, local(14, 2)).unwrap();
    wait_for_log(&api, "action m1 ParkUntilFurtherNotice");

    plugin.on_stop(Duration::from_secs(2));
}

#[test]
fn test_selectors_map_levels_to_commands() {
    let api = two_mowers();
    let (mut plugin, _home) = started(&api);

    plugin
        .on_command("Front", Unit::CuttingHeight.id(), SET_LEVEL, 30, local(14, 1))
        .unwrap();
    wait_for_log(&api, "height m1 4");

    plugin
        .on_command("Front", Unit::Actions.id(), SET_LEVEL, 20, local(14, 2))
        .unwrap();
    wait_for_log(&api, "action m1 Pause");

    // Level 0 is the idle position of the actions selector
    plugin
        .on_command("Front", Unit::Actions.id(), SET_LEVEL, 0, local(14, 3))
        .unwrap();

    plugin.on_stop(Duration::from_secs(2));
}

#[test]
fn test_invalid_cutting_level_is_rejected() {
    let api = two_mowers();
    let (mut plugin, _home) = started(&api);

    let result = plugin.on_command("Front", Unit::CuttingHeight.id(), SET_LEVEL, 90, local(14, 1));
    assert!(matches!(result, Err(PluginError::Api(ApiError::InvalidParameter(_)))));

    plugin.on_stop(Duration::from_secs(2));
}

#[test]
fn test_command_for_unknown_device() {
    let api = two_mowers();
    let (mut plugin, _home) = started(&api);

    let result = plugin.on_command("Ghost", Unit::Run.id(), "On", 0, local(14, 1));
    assert!(matches!(result, Err(PluginError::UnknownDevice(name)) if name == "Ghost"));
    assert_eq!(plugin.host().timed_out, vec![Some("Ghost".to_string())]);

    plugin.on_stop(Duration::from_secs(2));
}

#[test]
fn test_failed_command_marks_mower_timed_out() {
    let api = two_mowers();
    let (mut plugin, _home) = started(&api);

    api.fail_next(ApiError::HttpError {
        status: 500,
        message: "Internal Server Error".to_string(),
    });
    plugin.on_command("Front", Unit::Actions.id(), SET_LEVEL, 30, local(14, 1)).unwrap();
    pump_until(&mut plugin, |p| p.host().timed_out.contains(&Some("Front".to_string())));

    plugin.on_stop(Duration::from_secs(2));
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_command_before_start() {
    let home = tempfile::tempdir().unwrap();
    let mut plugin = AutomowerPlugin::new(RecordingHost::default(), plugin_config(&home));

    let result = plugin.on_command("Front", Unit::Run.id(), "On", 0, local(14, 0));
    assert!(matches!(result, Err(PluginError::NotStarted)));
    assert!(matches!(plugin.on_heartbeat(local(14, 0)), Err(PluginError::NotStarted)));
}

#[test]
fn test_start_installs_logging() {
    let api = two_mowers();
    let (mut plugin, _home) = started(&api);

    assert!(!plugin.config().debug);
    assert!(automower_plugin::logging::is_initialized());

    plugin.on_stop(Duration::from_secs(2));
}

#[test]
fn test_stop_joins_worker() {
    let api = two_mowers();
    let (mut plugin, _home) = started(&api);
    assert!(plugin.is_running());

    assert!(plugin.on_stop(Duration::from_secs(2)));
    assert!(!plugin.is_running());

    // Heartbeats after stop are ignored
    plugin.on_heartbeat(local(15, 0)).unwrap();
}
