use thiserror::Error;

use crate::DeviceId;

pub type DeviceResult<T> = Result<T, DeviceError>;

/// Errors surfaced to drivers by device registration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeviceError {
    #[error("invalid device record: {0}")]
    InvalidDevice(&'static str),

    #[error("device table full ({capacity} devices installed)")]
    TableFull { capacity: u16 },

    #[error("device {0} is not registered")]
    UnknownDevice(DeviceId),
}

impl DeviceError {
    /// Negative errno equivalent, as reported to C-style callers.
    pub fn errno(&self) -> i32 {
        const EINVAL: i32 = 22;
        const EMFILE: i32 = 24;
        const ENODEV: i32 = 19;
        match self {
            DeviceError::InvalidDevice(_) => -EINVAL,
            DeviceError::TableFull { .. } => -EMFILE,
            DeviceError::UnknownDevice(_) => -ENODEV,
        }
    }
}

/// Rejected [`CoreConfig`](crate::CoreConfig) values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_devices must be within 1..={max}, got {requested}")]
    DeviceLimit { requested: u16, max: u16 },

    #[error("max_applications must be within 1..={max}, got {requested}")]
    ApplicationLimit { requested: u16, max: u16 },
}
