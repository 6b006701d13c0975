//! Read-only views for presentation and diagnostics.

use serde::Serialize;

use crate::appl::{Application, RegisterParams};
use crate::device::{Device, DeviceState, Version};
use crate::stats::IoStatsSnapshot;
use crate::{ApplId, DeviceId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeviceSnapshot {
    pub id: DeviceId,
    pub manufacturer: String,
    pub serial: String,
    pub product: String,
    pub version: Version,
    pub state: DeviceState,
    pub refs: u32,
    pub stats: IoStatsSnapshot,
}

impl DeviceSnapshot {
    pub fn capture(device: &Device) -> Self {
        let info = device.info();
        Self {
            id: device.id(),
            manufacturer: info.manufacturer.clone(),
            serial: info.serial.clone(),
            product: info.product.clone(),
            version: info.version,
            state: device.state(),
            refs: device.refs(),
            stats: device.stats(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ApplSnapshot {
    pub id: ApplId,
    pub params: RegisterParams,
    pub bound: Vec<DeviceId>,
    /// Latched error code, 0 when none.
    pub latched: u16,
    pub stats: IoStatsSnapshot,
    pub queue_depth: usize,
}

impl ApplSnapshot {
    pub fn capture(appl: &Application) -> Self {
        Self {
            id: appl.id(),
            params: appl.params(),
            bound: appl.bound_devices().into_vec(),
            latched: appl.latched_error().map_or(0, |info| info.code()),
            stats: appl.stats(),
            queue_depth: appl.queue_len(),
        }
    }
}
