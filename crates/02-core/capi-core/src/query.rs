//! Identity and capability queries by controller number.
//!
//! Controller 0 answers for the core itself.

use std::sync::Arc;

use crate::device::{Device, Profile, Version};
use crate::info::MessageInfo;
use crate::{Capi, DeviceId};

pub const CORE_MANUFACTURER: &str = "capi-core";
pub const CORE_SERIAL: &str = "0";
pub const CORE_PRODUCT: &str = "capi-core";
/// CAPI 2.0, core revision 0.1.
pub const CORE_VERSION: Version = Version {
    major: 2,
    minor: 0,
    manu_major: 0,
    manu_minor: 1,
};

impl Capi {
    /// Returns `true` while at least one device is installed.
    pub fn is_installed(&self) -> bool {
        self.devices.installed() > 0
    }

    pub fn installed(&self) -> Result<(), MessageInfo> {
        if self.is_installed() {
            Ok(())
        } else {
            Err(MessageInfo::NotInstalled)
        }
    }

    pub fn manufacturer(&self, controller: u16) -> Result<String, MessageInfo> {
        self.query(controller, CORE_MANUFACTURER.to_owned(), |device| {
            device.info().manufacturer.clone()
        })
    }

    pub fn serial(&self, controller: u16) -> Result<String, MessageInfo> {
        self.query(controller, CORE_SERIAL.to_owned(), |device| {
            device.info().serial.clone()
        })
    }

    pub fn product(&self, controller: u16) -> Result<String, MessageInfo> {
        self.query(controller, CORE_PRODUCT.to_owned(), |device| {
            device.info().product.clone()
        })
    }

    pub fn version(&self, controller: u16) -> Result<Version, MessageInfo> {
        self.query(controller, CORE_VERSION, |device| device.info().version)
    }

    /// Capability profile; `ncontroller` always reports the installed count.
    pub fn profile(&self, controller: u16) -> Result<Profile, MessageInfo> {
        let mut profile = self.query(controller, Profile::default(), |device| {
            device.info().profile
        })?;
        profile.ncontroller = u16::try_from(self.devices.installed()).unwrap_or(u16::MAX);
        Ok(profile)
    }

    fn query<T>(
        &self,
        controller: u16,
        core: T,
        read: impl FnOnce(&Device) -> T,
    ) -> Result<T, MessageInfo> {
        let Some(id) = DeviceId::new(controller) else {
            return Ok(core);
        };
        let device: Arc<Device> = self.devices.get(id).ok_or(MessageInfo::OsResourceError)?;
        Ok(read(&device))
    }
}
