//! Device records and the driver contract.

use std::fmt;
use std::sync::Arc;

use capi_sync::{GuardRef, Guarded, LifecycleGuard};
use serde::Serialize;

use crate::appl::Application;
use crate::error::{DeviceError, DeviceResult};
use crate::info::{MessageInfo, RegisterInfo};
use crate::message::{Message, Traffic};
use crate::stats::{IoStats, IoStatsSnapshot};
use crate::DeviceId;

/// Size of the fixed manufacturer field, terminator included.
pub const MANUFACTURER_LEN: usize = 64;
/// Size of the fixed serial number field, terminator included.
pub const SERIAL_LEN: usize = 8;

/// CAPI and manufacturer version numbers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub manu_major: u32,
    pub manu_minor: u32,
}

/// Controller capability profile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Profile {
    /// Number of installed controllers; the core fills this in on queries.
    pub ncontroller: u16,
    /// Number of B channels.
    pub nbchannel: u16,
    pub global_options: u32,
    pub b1_protocols: u32,
    pub b2_protocols: u32,
    pub b3_protocols: u32,
    pub reserved: [u32; 6],
    pub manufacturer: [u32; 5],
}

/// Identity and capabilities a driver supplies when registering a device.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub manufacturer: String,
    pub serial: String,
    pub product: String,
    pub version: Version,
    pub profile: Profile,
}

impl DeviceInfo {
    /// Rejects records whose identity does not fit the fixed-size fields.
    pub fn validate(&self) -> DeviceResult<()> {
        if self.manufacturer.len() >= MANUFACTURER_LEN {
            return Err(DeviceError::InvalidDevice("manufacturer too long"));
        }
        if self.serial.len() >= SERIAL_LEN {
            return Err(DeviceError::InvalidDevice("serial number too long"));
        }
        Ok(())
    }
}

/// Callbacks a device driver provides to the core.
///
/// Every method may be invoked concurrently from several threads.
/// `put_message` is called from contexts that cannot block and must not
/// block itself. After `release` returns the driver must not enqueue to or
/// signal that application again.
pub trait Driver: Send + Sync {
    /// Registers `appl` with the device. An error leaves the pair unbound.
    fn register(&self, device: &Device, appl: &Arc<Application>) -> Result<(), RegisterInfo>;

    /// Unwinds a successful [`register`](Self::register).
    fn release(&self, device: &Device, appl: &Arc<Application>);

    /// Hands an outbound message to the device.
    ///
    /// `QueueFull` and `Busy` tell the application to retry once signalled.
    fn put_message(
        &self,
        device: &Device,
        appl: &Arc<Application>,
        msg: Message,
    ) -> Result<(), MessageInfo>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceState {
    Active,
    Retiring,
}

/// Counted reference to an installed device.
pub type DeviceRef = GuardRef<Device>;

/// An installed controller.
pub struct Device {
    id: DeviceId,
    info: DeviceInfo,
    driver: Arc<dyn Driver>,
    lifecycle: LifecycleGuard,
    stats: IoStats,
}

impl Device {
    pub(crate) fn new(id: DeviceId, info: DeviceInfo, driver: Arc<dyn Driver>) -> Self {
        Self {
            id,
            info,
            driver,
            lifecycle: LifecycleGuard::new(),
            stats: IoStats::new(),
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    pub fn state(&self) -> DeviceState {
        if self.lifecycle.is_retiring() {
            DeviceState::Retiring
        } else {
            DeviceState::Active
        }
    }

    /// Live counted references: one per bound application, one for the
    /// registry while active, plus any held by in-flight calls.
    pub fn refs(&self) -> u32 {
        self.lifecycle.refs()
    }

    pub fn stats(&self) -> IoStatsSnapshot {
        self.stats.snapshot()
    }

    /// Queues an inbound message for `appl`. Never blocks.
    ///
    /// Only queued messages count as device receive traffic; returns `false`
    /// when `appl` is being released and the message was dropped.
    pub fn deliver(&self, appl: &Application, msg: Message) -> bool {
        let traffic = msg.traffic();
        let queued = appl.enqueue(msg);
        if queued {
            self.stats.record_rx(traffic);
        }
        queued
    }

    pub(crate) fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    pub(crate) fn record_tx(&self, traffic: Traffic) {
        self.stats.record_tx(traffic);
    }
}

impl Guarded for Device {
    fn lifecycle(&self) -> &LifecycleGuard {
        &self.lifecycle
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id)
            .field("manufacturer", &self.info.manufacturer)
            .field("product", &self.info.product)
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}
