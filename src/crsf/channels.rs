//! # RC Channel Packing
//!
//! 16 channels × 11 bits packed into 22 bytes as one continuous bitstream,
//! least significant bit first:
//!
//! ```text
//! Byte 0: Ch1[0:7]
//! Byte 1: Ch1[8:10] | Ch2[0:4]
//! Byte 2: Ch2[5:10] | Ch3[0:1]
//! ...
//! ```

use super::protocol::*;

/// Unpack 16 channel values from a 22-byte payload
///
/// Walks every bit of the stream: bit `p` belongs to channel `p / 11`
/// at offset `p % 11` and is read from byte `p / 8`, bit `p % 8`.
///
/// # Examples
///
/// ```
/// use crsf_rx::crsf::channels::unpack_channels;
///
/// let channels = unpack_channels(&[0xFF; 22]);
/// assert!(channels.iter().all(|&c| c == 2047));
/// ```
pub fn unpack_channels(payload: &[u8; CRSF_RC_CHANNELS_PAYLOAD_SIZE]) -> RcChannels {
    let mut channels: RcChannels = [0; CRSF_NUM_CHANNELS];

    for bit_index in 0..CRSF_NUM_CHANNELS * CRSF_CHANNEL_BITS {
        let channel = bit_index / CRSF_CHANNEL_BITS;
        let bit_offset = bit_index % CRSF_CHANNEL_BITS;
        let bit = (payload[bit_index / 8] >> (bit_index % 8)) & 1;

        channels[channel] |= (bit as u16) << bit_offset;
    }

    channels
}

/// Pack 16 channel values into a 22-byte payload
///
/// Values above 2047 are clamped.
pub fn pack_channels(channels: &RcChannels) -> [u8; CRSF_RC_CHANNELS_PAYLOAD_SIZE] {
    let mut payload = [0u8; CRSF_RC_CHANNELS_PAYLOAD_SIZE];
    let mut bit_index = 0;

    for &channel in channels.iter() {
        let value = clamp_channel_value(channel);

        for bit in 0..CRSF_CHANNEL_BITS {
            if (value >> bit) & 1 == 1 {
                payload[bit_index / 8] |= 1 << (bit_index % 8);
            }
            bit_index += 1;
        }
    }

    payload
}

/// Clamp a channel value to valid CRSF range (0-2047)
pub fn clamp_channel_value(value: u16) -> u16 {
    value.min(CRSF_CHANNEL_VALUE_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpack_all_zero() {
        assert_eq!(unpack_channels(&[0u8; 22]), [0u16; 16]);
    }

    #[test]
    fn test_unpack_first_channel_spans_two_bytes() {
        let mut payload = [0u8; 22];
        payload[0] = 0xFF;
        payload[1] = 0x07;

        let channels = unpack_channels(&payload);
        assert_eq!(channels[0], 2047);
        assert!(channels[1..].iter().all(|&c| c == 0));
    }

    #[test]
    fn test_unpack_channel_spanning_three_bytes() {
        // Channel 2 occupies bits 22..=32: byte 2 bits 6-7, byte 3, byte 4 bit 0
        let mut payload = [0u8; 22];
        payload[2] = 0xC0;
        payload[3] = 0xFF;
        payload[4] = 0x01;

        let channels = unpack_channels(&payload);
        assert_eq!(channels[2], 2047);
        assert_eq!(channels[1], 0);
        assert_eq!(channels[3], 0);
    }

    #[test]
    fn test_unpack_last_channel() {
        // Channel 15 occupies bits 165..=175: byte 20 bits 5-7 and byte 21
        let mut payload = [0u8; 22];
        payload[20] = 0xE0;
        payload[21] = 0xFF;

        let channels = unpack_channels(&payload);
        assert_eq!(channels[15], 2047);
        assert_eq!(channels[14], 0);
    }

    #[test]
    fn test_round_trip_extremes() {
        for value in [CRSF_CHANNEL_VALUE_MIN, CRSF_CHANNEL_VALUE_CENTER, CRSF_CHANNEL_VALUE_MAX] {
            let channels = [value; CRSF_NUM_CHANNELS];
            assert_eq!(unpack_channels(&pack_channels(&channels)), channels);
        }
    }

    #[test]
    fn test_round_trip_mixed_pattern() {
        // 0..15 scaled across the 11-bit range
        let channels: RcChannels = core::array::from_fn(|i| (i as u16) * 2047 / 15);
        assert_eq!(channels[15], 2047);
        assert_eq!(unpack_channels(&pack_channels(&channels)), channels);

        // Alternating bit patterns catch shifted or swapped neighbours
        let channels: RcChannels =
            core::array::from_fn(|i| if i % 2 == 0 { 0x555 } else { 0x2AA });
        assert_eq!(unpack_channels(&pack_channels(&channels)), channels);
    }

    #[test]
    fn test_pack_known_center_bytes() {
        let payload = pack_channels(&[CRSF_CHANNEL_VALUE_CENTER; CRSF_NUM_CHANNELS]);

        // 1024 = 0b100_0000_0000, only bit 10 of each channel is set
        assert_eq!(payload[0], 0x00);
        assert_eq!(payload[1], 0x04);
        assert_eq!(payload[2], 0x20);
    }

    #[test]
    fn test_pack_clamps_out_of_range() {
        let channels = [u16::MAX; CRSF_NUM_CHANNELS];
        let decoded = unpack_channels(&pack_channels(&channels));
        assert!(decoded.iter().all(|&c| c == CRSF_CHANNEL_VALUE_MAX));
    }

    #[test]
    fn test_clamp_channel_value() {
        assert_eq!(clamp_channel_value(0), 0);
        assert_eq!(clamp_channel_value(2047), 2047);
        assert_eq!(clamp_channel_value(2048), 2047);
    }
}
