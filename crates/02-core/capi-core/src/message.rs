//! CAPI 2.0 message buffers and the header fields the router inspects.
//!
//! Layout (little endian):
//!
//! | offset | size | field                      |
//! |--------|------|----------------------------|
//! | 0      | 2    | total message length       |
//! | 2      | 2    | application id             |
//! | 4      | 1    | command                    |
//! | 5      | 1    | sub-command                |
//! | 6      | 2    | message number             |
//! | 8      | 4    | controller / PLCI / NCCI   |
//! | 16     | 2    | DATA_B3 data length        |
//!
//! DATA_B3 payload bytes follow the message proper.

use std::fmt;
use std::sync::Arc;

/// Length of the base header preceding the addressing word.
pub const BASE_HEADER_LEN: usize = 8;
/// Shortest message the router accepts.
pub const MIN_MESSAGE_LEN: usize = BASE_HEADER_LEN + 4;

/// `DATA_B3` command byte.
pub const CMD_DATA_B3: u8 = 0x86;
/// Sub-command byte of a request.
pub const SUBCMD_REQ: u8 = 0x80;
/// Sub-command byte of a confirmation.
pub const SUBCMD_CONF: u8 = 0x81;
/// Sub-command byte of an indication.
pub const SUBCMD_IND: u8 = 0x82;
/// Sub-command byte of a response.
pub const SUBCMD_RESP: u8 = 0x83;

const CONTROLLER_MASK: u8 = 0x7f;
const DATA_LEN_OFFSET: usize = 16;

/// Immutable, cheaply clonable message buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct Message {
    bytes: Arc<[u8]>,
}

impl Message {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Builds a message from its header fields; `total_len` is filled in.
    ///
    /// `params` are the command-specific parameters that follow the
    /// addressing word and `data` is the appended DATA_B3 payload.
    pub fn build(
        appl: u16,
        command: u8,
        subcommand: u8,
        number: u16,
        address: u32,
        params: &[u8],
        data: &[u8],
    ) -> Self {
        let total = MIN_MESSAGE_LEN + params.len();
        let mut bytes = Vec::with_capacity(total + data.len());
        bytes.extend_from_slice(&(total as u16).to_le_bytes());
        bytes.extend_from_slice(&appl.to_le_bytes());
        bytes.push(command);
        bytes.push(subcommand);
        bytes.extend_from_slice(&number.to_le_bytes());
        bytes.extend_from_slice(&address.to_le_bytes());
        bytes.extend_from_slice(params);
        bytes.extend_from_slice(data);
        Self::new(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Header view, or `None` if the buffer is shorter than [`MIN_MESSAGE_LEN`].
    pub fn header(&self) -> Option<Header<'_>> {
        Header::parse(&self.bytes)
    }

    /// Bytes counted against I/O statistics for this message.
    pub fn traffic(&self) -> Traffic {
        self.header().map_or(
            Traffic {
                bytes: self.bytes.len() as u64,
                data_bytes: None,
            },
            |header| header.traffic(),
        )
    }
}

impl From<Vec<u8>> for Message {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.header() {
            Some(header) => f
                .debug_struct("Message")
                .field("len", &self.bytes.len())
                .field("appl", &header.appl_id())
                .field("command", &format_args!("{:#04x}", header.command()))
                .field("subcommand", &format_args!("{:#04x}", header.subcommand()))
                .field("controller", &header.controller())
                .finish(),
            None => f
                .debug_struct("Message")
                .field("len", &self.bytes.len())
                .finish_non_exhaustive(),
        }
    }
}

/// Borrowed view over a message header at least [`MIN_MESSAGE_LEN`] bytes long.
#[derive(Clone, Copy, Debug)]
pub struct Header<'a> {
    bytes: &'a [u8],
}

impl<'a> Header<'a> {
    pub fn parse(bytes: &'a [u8]) -> Option<Self> {
        (bytes.len() >= MIN_MESSAGE_LEN).then_some(Self { bytes })
    }

    /// Declared total length of the message (without DATA_B3 payload).
    pub fn total_len(&self) -> u16 {
        self.u16_at(0)
    }

    pub fn appl_id(&self) -> u16 {
        self.u16_at(2)
    }

    pub fn command(&self) -> u8 {
        self.bytes[4]
    }

    pub fn subcommand(&self) -> u8 {
        self.bytes[5]
    }

    pub fn number(&self) -> u16 {
        self.u16_at(6)
    }

    /// Controller, PLCI and NCCI packed into one word.
    pub fn address(&self) -> u32 {
        u32::from_le_bytes([self.bytes[8], self.bytes[9], self.bytes[10], self.bytes[11]])
    }

    /// Controller number addressed by this message (1 = first device).
    pub fn controller(&self) -> u8 {
        self.bytes[8] & CONTROLLER_MASK
    }

    pub fn is_data_b3(&self) -> bool {
        self.command() == CMD_DATA_B3
    }

    /// Length of the appended payload, for DATA_B3 messages that carry one.
    pub fn data_len(&self) -> Option<u16> {
        if !self.is_data_b3() || self.bytes.len() < DATA_LEN_OFFSET + 2 {
            return None;
        }
        Some(self.u16_at(DATA_LEN_OFFSET))
    }

    pub fn traffic(&self) -> Traffic {
        let data_bytes = self.data_len().map(u64::from);
        Traffic {
            bytes: u64::from(self.total_len()) + data_bytes.unwrap_or(0),
            data_bytes,
        }
    }

    fn u16_at(&self, offset: usize) -> u16 {
        u16::from_le_bytes([self.bytes[offset], self.bytes[offset + 1]])
    }
}

/// Accounting footprint of one message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Traffic {
    /// Declared length plus DATA_B3 payload.
    pub bytes: u64,
    /// DATA_B3 payload length; `None` for control messages.
    pub data_bytes: Option<u64>,
}
