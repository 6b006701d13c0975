//! CAPI status codes.
//!
//! Two families share the numeric space: registration-class codes (0x10xx)
//! returned by application registration, and messaging-class codes (0x11xx)
//! returned by message exchange. "No error" (0x0000) is represented by `Ok`.

use thiserror::Error;

/// Registration-class status (`CAPI_REGISTER` results).
#[repr(u16)]
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Hash)]
pub enum RegisterInfo {
    #[error("too many applications")]
    TooManyApplications = 0x1001,
    #[error("logical block size too small, must be at least 128 bytes")]
    LogicalBlockSizeTooSmall = 0x1002,
    #[error("buffer exceeds 64 kbytes")]
    BufferExceeds64k = 0x1003,
    #[error("message buffer size too small")]
    MessageBufferTooSmall = 0x1004,
    #[error("max. number of logical connections not supported")]
    ConnectionCountNotSupported = 0x1005,
    #[error("reserved")]
    Reserved = 0x1006,
    #[error("busy, try again later")]
    Busy = 0x1007,
    #[error("OS resource error")]
    OsResourceError = 0x1008,
    #[error("CAPI not installed")]
    NotInstalled = 0x1009,
    #[error("controller does not support external equipment")]
    ExternalEquipmentNotSupported = 0x100a,
    #[error("controller does only support external equipment")]
    OnlyExternalEquipmentSupported = 0x100b,
}

impl RegisterInfo {
    const ALL: [RegisterInfo; 11] = [
        RegisterInfo::TooManyApplications,
        RegisterInfo::LogicalBlockSizeTooSmall,
        RegisterInfo::BufferExceeds64k,
        RegisterInfo::MessageBufferTooSmall,
        RegisterInfo::ConnectionCountNotSupported,
        RegisterInfo::Reserved,
        RegisterInfo::Busy,
        RegisterInfo::OsResourceError,
        RegisterInfo::NotInstalled,
        RegisterInfo::ExternalEquipmentNotSupported,
        RegisterInfo::OnlyExternalEquipmentSupported,
    ];

    /// Numeric CAPI info value.
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Parses a non-zero registration-class code.
    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|info| info.code() == code)
    }
}

/// Messaging-class status (put/get/peek and driver-signalled errors).
#[repr(u16)]
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Hash)]
pub enum MessageInfo {
    #[error("illegal application number")]
    IllegalApplication = 0x1101,
    #[error("illegal command or subcommand or message length less than 12 bytes")]
    IllegalCommandOrMessageTooSmall = 0x1102,
    #[error("the message could not be accepted because of a queue full condition")]
    QueueFull = 0x1103,
    #[error("queue is empty")]
    QueueEmpty = 0x1104,
    #[error("queue overflow, a message was lost")]
    QueueOverflow = 0x1105,
    #[error("unknown notification parameter")]
    IllegalNotificationParameter = 0x1106,
    #[error("the message could not be accepted because of an internal busy condition")]
    Busy = 0x1107,
    #[error("OS resource error")]
    OsResourceError = 0x1108,
    #[error("CAPI not installed")]
    NotInstalled = 0x1109,
    #[error("controller does not support external equipment")]
    ExternalEquipmentNotSupported = 0x110a,
    #[error("controller does only support external equipment")]
    OnlyExternalEquipmentSupported = 0x110b,
}

impl MessageInfo {
    const ALL: [MessageInfo; 11] = [
        MessageInfo::IllegalApplication,
        MessageInfo::IllegalCommandOrMessageTooSmall,
        MessageInfo::QueueFull,
        MessageInfo::QueueEmpty,
        MessageInfo::QueueOverflow,
        MessageInfo::IllegalNotificationParameter,
        MessageInfo::Busy,
        MessageInfo::OsResourceError,
        MessageInfo::NotInstalled,
        MessageInfo::ExternalEquipmentNotSupported,
        MessageInfo::OnlyExternalEquipmentSupported,
    ];

    /// Numeric CAPI info value.
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Parses a non-zero messaging-class code.
    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|info| info.code() == code)
    }

    /// `true` for conditions the caller should retry after its signal fires.
    pub fn is_transient(self) -> bool {
        matches!(self, MessageInfo::QueueFull | MessageInfo::Busy)
    }
}

/// Collapses a registration result into its numeric code (0 on success).
pub fn register_code<T>(result: &Result<T, RegisterInfo>) -> u16 {
    result.as_ref().err().map_or(0, |info| info.code())
}

/// Collapses a messaging result into its numeric code (0 on success).
pub fn message_code<T>(result: &Result<T, MessageInfo>) -> u16 {
    result.as_ref().err().map_or(0, |info| info.code())
}
