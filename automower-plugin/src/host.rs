//! Interface to the home-automation host

use mower_poller::CallCounterSnapshot;

use crate::devices::{DeviceSpec, DeviceUpdate};
use crate::Result;

/// What the plugin needs from the host platform
///
/// The host owns the devices; the plugin only creates units for new mowers
/// and pushes values. All calls happen on the host thread.
pub trait HostPlatform {
    /// Whether units already exist for `device_id`
    fn device_exists(&self, device_id: &str) -> bool;

    fn create_device(&mut self, spec: &DeviceSpec) -> Result<()>;

    fn update_device(&mut self, update: &DeviceUpdate) -> Result<()>;

    /// Flag the units of `device_id`, or of every mower when `None`, as not
    /// refreshed
    fn mark_timed_out(&mut self, device_id: Option<&str>);

    /// Store the monthly call counter so it survives restarts
    fn persist_call_counter(&mut self, _snapshot: &CallCounterSnapshot) -> Result<()> {
        Ok(())
    }
}
