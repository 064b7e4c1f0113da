//! JSON file persistence of the monthly call counter

use chrono::{DateTime, Utc};
use mower_poller::{CallCounter, CallCounterSnapshot};
use std::fs;
use std::path::{Path, PathBuf};

use crate::Result;

pub const COUNTER_FILE: &str = "call_counter.json";

/// Default location: `<data dir>/automower/call_counter.json`
pub fn default_counter_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("automower").join(COUNTER_FILE))
}

/// Read the counter at `path`, starting fresh when missing or unreadable
pub fn load_counter(path: &Path, quota: u32, now: DateTime<Utc>) -> CallCounter {
    let snapshot = fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|json| serde_json::from_str::<CallCounterSnapshot>(&json).map_err(|e| e.to_string()));

    match snapshot {
        Ok(snapshot) => CallCounter::restore(snapshot, quota, now),
        Err(e) => {
            tracing::debug!("No usable call counter at {}: {}", path.display(), e);
            CallCounter::new(quota, now)
        }
    }
}

pub fn save_counter(path: &Path, snapshot: &CallCounterSnapshot) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string(snapshot)?)?;
    Ok(())
}
