//! # RC Link Decoder
//!
//! Owns everything the receive path used to keep in globals: the framing
//! state, the last validated channel array and a couple of diagnostic
//! counters. One `drain` call per tick turns an intake snapshot into at most
//! one fresh channel array.

use tracing::{debug, trace};

use crate::crsf::channels::unpack_channels;
use crate::crsf::parser::{FrameEvent, FrameParser, ParserOptions};
use crate::crsf::protocol::*;

/// Decoder settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    pub parser: ParserOptions,
    pub crc_poly: u8,
    pub crc_span: CrcSpan,
}

impl DecoderConfig {
    /// Wire format a sender must use for its frames to pass this decoder
    pub fn frame_format(&self) -> FrameFormat {
        FrameFormat {
            sync_byte: self.parser.sync_byte,
            frame_type: self.parser.accepted_type,
            crc_poly: self.crc_poly,
            crc_span: self.crc_span,
        }
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            parser: ParserOptions::default(),
            crc_poly: CRSF_CRC_POLY,
            crc_span: CrcSpan::default(),
        }
    }
}

/// Frame parser + CRC gate + channel unpacker
#[derive(Debug, Clone)]
pub struct RcDecoder {
    config: DecoderConfig,
    parser: FrameParser,
    channels: RcChannels,
    frames_accepted: u64,
    crc_errors: u64,
}

impl Default for RcDecoder {
    fn default() -> Self {
        Self::new(DecoderConfig::default())
    }
}

impl RcDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self {
            config,
            parser: FrameParser::new(config.parser),
            channels: [0; CRSF_NUM_CHANNELS],
            frames_accepted: 0,
            crc_errors: 0,
        }
    }

    /// Run a buffer snapshot through the parser
    ///
    /// Returns the newest validated channels when at least one frame in
    /// `bytes` passed its CRC, `None` otherwise. On `None` the previous
    /// channel values are kept and remain available via [`channels`].
    ///
    /// [`channels`]: RcDecoder::channels
    ///
    /// # Examples
    ///
    /// ```
    /// use crsf_rx::crsf::encoder::encode_rc_channels_frame;
    /// use crsf_rx::crsf::protocol::FrameFormat;
    /// use crsf_rx::decoder::RcDecoder;
    ///
    /// let mut decoder = RcDecoder::default();
    /// let frame = encode_rc_channels_frame(&[1500; 16], &FrameFormat::default());
    ///
    /// assert_eq!(decoder.drain(&frame), Some([1500; 16]));
    /// assert_eq!(decoder.drain(&[]), None);
    /// ```
    pub fn drain(&mut self, bytes: &[u8]) -> Option<RcChannels> {
        let mut fresh = false;

        for &byte in bytes {
            match self.parser.push(byte) {
                Some(FrameEvent::Accepted(packet)) => {
                    if self.validate(&packet) {
                        self.channels = unpack_channels(packet.channel_data());
                        self.frames_accepted += 1;
                        fresh = true;
                    }
                }
                Some(FrameEvent::Ignored { frame_type, length }) => {
                    trace!("Ignoring frame type 0x{:02X} ({} bytes)", frame_type, length);
                }
                None => {}
            }
        }

        fresh.then_some(self.channels)
    }

    /// Abandon any partial frame, e.g. after intake bytes were lost
    ///
    /// Channels and counters are kept.
    pub fn resync(&mut self) {
        self.parser.reset();
    }

    fn validate(&mut self, packet: &PacketPayload) -> bool {
        let DecoderConfig { crc_poly, crc_span, .. } = self.config;
        if packet.checksum(crc_span, crc_poly) == 0 {
            return true;
        }

        self.crc_errors += 1;
        debug!(
            "CRC mismatch on type 0x{:02X}: expected 0x{:02X}, got 0x{:02X}",
            packet.frame_type(),
            packet.expected_crc(crc_span, crc_poly),
            packet.crc()
        );
        false
    }

    /// Last validated channel values (all zero before the first good frame)
    pub fn channels(&self) -> &RcChannels {
        &self.channels
    }

    pub fn parser(&self) -> &FrameParser {
        &self.parser
    }

    /// Frames that passed the CRC gate
    pub fn frames_accepted(&self) -> u64 {
        self.frames_accepted
    }

    /// Accepted-type frames rejected by the CRC gate
    pub fn crc_errors(&self) -> u64 {
        self.crc_errors
    }
}
