//! Registry limits.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default number of device slots (classic controller limit).
pub const DEFAULT_MAX_DEVICES: u16 = 32;
/// Default number of application slots (classic application limit).
pub const DEFAULT_MAX_APPLICATIONS: u16 = 240;

/// Controller numbers are carried in 7 bits of the message header.
pub const DEVICE_LIMIT: u16 = 0x7f;
/// Application ids are 16-bit; `u16::MAX` is kept out of range.
pub const APPLICATION_LIMIT: u16 = u16::MAX - 1;

/// Capacity limits for the device table and the application pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Number of device ids (`1..=max_devices`).
    pub max_devices: u16,
    /// Number of application ids (`1..=max_applications`).
    pub max_applications: u16,
}

impl CoreConfig {
    /// Checks both limits against what the wire format can address.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=DEVICE_LIMIT).contains(&self.max_devices) {
            return Err(ConfigError::DeviceLimit {
                requested: self.max_devices,
                max: DEVICE_LIMIT,
            });
        }
        if !(1..=APPLICATION_LIMIT).contains(&self.max_applications) {
            return Err(ConfigError::ApplicationLimit {
                requested: self.max_applications,
                max: APPLICATION_LIMIT,
            });
        }
        Ok(())
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            max_devices: DEFAULT_MAX_DEVICES,
            max_applications: DEFAULT_MAX_APPLICATIONS,
        }
    }
}
