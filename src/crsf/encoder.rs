//! # CRSF Packet Encoder
//!
//! Builds RC channels frames as a transmitter would send them.
//! The receiver only needs this to feed the link simulator and tests.

use bytes::{BufMut, Bytes, BytesMut};

use super::channels::pack_channels;
use super::crc::crc8_for;
use super::protocol::*;

/// Encode RC channels into a complete CRSF frame
///
/// # Arguments
///
/// * `channels` - Array of 16 channel values (11-bit: 0-2047)
/// * `format` - Sync byte, frame type, polynomial and CRC span of the link
///
/// # Returns
///
/// * `Bytes` - Complete CRSF frame (26 bytes: sync + length + type + 22-byte payload + crc)
///
/// # Examples
///
/// ```
/// use crsf_rx::crsf::encoder::encode_rc_channels_frame;
/// use crsf_rx::crsf::protocol::FrameFormat;
///
/// let channels = [1024u16; 16]; // All channels at center
/// let frame = encode_rc_channels_frame(&channels, &FrameFormat::default());
/// assert_eq!(frame.len(), 26);
/// ```
pub fn encode_rc_channels_frame(channels: &RcChannels, format: &FrameFormat) -> Bytes {
    encode_frame(format, format.frame_type, &pack_channels(channels))
}

/// Encode an arbitrary frame in the link's format
///
/// Used directly to put non-channel traffic (e.g. link statistics) on a simulated link.
pub fn encode_frame(format: &FrameFormat, frame_type: u8, payload: &[u8]) -> Bytes {
    let mut frame = BytesMut::with_capacity(payload.len() + 4);
    frame.put_u8(format.sync_byte);
    frame.put_u8((payload.len() + 2) as u8);
    frame.put_u8(frame_type);
    frame.put_slice(payload);

    // Skip sync + length, then the type byte too when the span excludes it
    let crc = crc8_for(&frame[2 + format.crc_span.skip()..], format.crc_poly);
    frame.put_u8(crc);

    frame.freeze()
}
