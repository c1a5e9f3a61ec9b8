//! # CRSF Protocol Constants and Types
//!
//! Core protocol definitions for the receive side of a CRSF (Crossfire) link.
//!
//! Frame layout on the wire:
//!
//! ```text
//! [sync 0xC8][length][type][payload ...][crc]
//! ```
//!
//! `length` counts type + payload + crc, never the sync or length bytes.

use serde::Deserialize;

use super::crc::crc8_update;

/// CRSF frame sync byte (always 0xC8)
pub const CRSF_SYNC_BYTE: u8 = 0xC8;

/// RC Channels packet type
pub const CRSF_FRAMETYPE_RC_CHANNELS_PACKED: u8 = 0x16;

/// Link Statistics packet type (recognised on the wire, never decoded)
pub const CRSF_FRAMETYPE_LINK_STATISTICS: u8 = 0x14;

/// CRC-8-DVB-S2 polynomial used by CRSF
pub const CRSF_CRC_POLY: u8 = 0xD5;

/// Largest legal value of the length byte.
/// A frame is at most 64 bytes, the sync and length bytes are not counted.
pub const CRSF_MAX_FRAME_LENGTH: u8 = 62;

/// Smallest legal value of the length byte (type + crc)
pub const CRSF_MIN_FRAME_LENGTH: u8 = 2;

/// RC channels payload size (22 bytes for 16 channels × 11 bits)
pub const CRSF_RC_CHANNELS_PAYLOAD_SIZE: usize = 22;

/// RC channels frame length (type + payload + crc)
pub const CRSF_RC_CHANNELS_FRAME_LENGTH: u8 = 0x18; // 24 bytes

/// Captured packet size: type(1) + channel data(22) + crc(1)
pub const CRSF_PACKET_PAYLOAD_SIZE: usize = CRSF_RC_CHANNELS_FRAME_LENGTH as usize;

/// Full RC channels frame on the wire: sync + length + 24
pub const CRSF_RC_CHANNELS_FRAME_SIZE: usize = 2 + CRSF_PACKET_PAYLOAD_SIZE;

/// Number of RC channels
pub const CRSF_NUM_CHANNELS: usize = 16;

/// Bits per packed channel
pub const CRSF_CHANNEL_BITS: usize = 11;

/// Channel value range (11-bit: 0-2047)
pub const CRSF_CHANNEL_VALUE_MIN: u16 = 0;
pub const CRSF_CHANNEL_VALUE_MAX: u16 = 2047;
pub const CRSF_CHANNEL_VALUE_CENTER: u16 = 1024;

/// RC channels array type (16 channels, 11-bit values)
pub type RcChannels = [u16; CRSF_NUM_CHANNELS];

/// Conventional stick assignments for the first four channels.
/// The decoder does not enforce them, consumers pick their own mapping.
pub mod channels {
    pub const ROLL: usize = 0;
    pub const PITCH: usize = 1;
    pub const THROTTLE: usize = 2;
    pub const YAW: usize = 3;
}

/// Which bytes of a captured packet the CRC is checked over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrcSpan {
    /// Channel data + CRC (23 bytes). The frame type is not covered.
    #[default]
    PayloadAndCrc,

    /// Type + channel data + CRC (24 bytes), as ExpressLRS transmitters emit it.
    TypeAndPayload,
}

impl CrcSpan {
    /// Bytes after the length byte that the CRC skips
    pub fn skip(self) -> usize {
        match self {
            CrcSpan::PayloadAndCrc => 1,
            CrcSpan::TypeAndPayload => 0,
        }
    }
}

/// Wire format of the RC channels frames on a link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFormat {
    pub sync_byte: u8,
    pub frame_type: u8,
    pub crc_poly: u8,
    pub crc_span: CrcSpan,
}

impl Default for FrameFormat {
    fn default() -> Self {
        Self {
            sync_byte: CRSF_SYNC_BYTE,
            frame_type: CRSF_FRAMETYPE_RC_CHANNELS_PACKED,
            crc_poly: CRSF_CRC_POLY,
            crc_span: CrcSpan::default(),
        }
    }
}

/// Capture buffer for one accepted packet: type, 22 channel bytes, CRC.
///
/// Capture positions are counted from the type byte (0) to the CRC (23).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketPayload {
    frame_type: u8,
    data: [u8; CRSF_RC_CHANNELS_PAYLOAD_SIZE],
    crc: u8,
}

impl PacketPayload {
    /// Create a zeroed packet buffer
    pub const fn new() -> Self {
        Self {
            frame_type: 0,
            data: [0u8; CRSF_RC_CHANNELS_PAYLOAD_SIZE],
            crc: 0,
        }
    }

    /// Store `byte` at capture position `index`. Writes past the CRC are dropped.
    ///
    /// Returns whether the byte was stored.
    pub fn set(&mut self, index: usize, byte: u8) -> bool {
        match index {
            0 => self.frame_type = byte,
            i if i <= CRSF_RC_CHANNELS_PAYLOAD_SIZE => self.data[i - 1] = byte,
            i if i == CRSF_PACKET_PAYLOAD_SIZE - 1 => self.crc = byte,
            _ => return false,
        }
        true
    }

    /// Zero every byte
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    pub fn frame_type(&self) -> u8 {
        self.frame_type
    }

    /// The 22 packed channel bytes
    pub fn channel_data(&self) -> &[u8; CRSF_RC_CHANNELS_PAYLOAD_SIZE] {
        &self.data
    }

    pub fn crc(&self) -> u8 {
        self.crc
    }

    /// CRC of the bytes `span` covers, trailing CRC byte excluded
    pub fn expected_crc(&self, span: CrcSpan, poly: u8) -> u8 {
        let crc = match span {
            CrcSpan::TypeAndPayload => crc8_update(0, &[self.frame_type], poly),
            CrcSpan::PayloadAndCrc => 0,
        };
        crc8_update(crc, &self.data, poly)
    }

    /// Run the CRC over the whole span including the received CRC byte;
    /// the packet is intact when this is zero
    pub fn checksum(&self, span: CrcSpan, poly: u8) -> u8 {
        crc8_update(self.expected_crc(span, poly), &[self.crc], poly)
    }
}
