//! Simulated receiver link
//!
//! Stands in for the serial port when no receiver is attached: emits RC
//! channel frames at a fixed rate with the sticks slowly sweeping, an
//! occasional link statistics frame, and optionally a corrupted CRC every
//! N frames so the reject path gets exercised too.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Buf, Bytes};
use tokio::time::{interval, Interval, MissedTickBehavior};

use super::port_trait::SerialPortIO;
use crate::crsf::encoder::{encode_frame, encode_rc_channels_frame};
use crate::crsf::protocol::*;

/// Link statistics are interleaved once per this many channel frames
const LINK_STATS_EVERY: u64 = 50;

/// Sweep step per frame, in channel units
const SWEEP_STEP: u16 = 8;

/// Simulated link settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedLinkConfig {
    pub frame_rate_hz: u32,

    /// Wire format to emit, normally the one the decoder expects
    pub format: FrameFormat,

    /// Corrupt the CRC of every Nth channel frame (0 = never)
    pub corrupt_every: u64,

    /// Stop after this many channel frames (None = run forever)
    pub max_frames: Option<u64>,
}

impl Default for SimulatedLinkConfig {
    fn default() -> Self {
        Self {
            frame_rate_hz: 150,
            format: FrameFormat::default(),
            corrupt_every: 0,
            max_frames: None,
        }
    }
}

/// Frame generator that reads like a serial port
#[derive(Debug)]
pub struct SimulatedLink {
    config: SimulatedLinkConfig,
    pacing: Interval,
    pending: Bytes,
    frames_sent: u64,
}

impl SimulatedLink {
    pub fn new(config: SimulatedLinkConfig) -> Self {
        let period = Duration::from_nanos(1_000_000_000 / u64::from(config.frame_rate_hz.max(1)));
        let mut pacing = interval(period);
        pacing.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self {
            config,
            pacing,
            pending: Bytes::new(),
            frames_sent: 0,
        }
    }

    /// Channel values for frame `n`: a triangle sweep per channel, phase shifted
    pub fn channels_for_frame(n: u64) -> RcChannels {
        let span = u64::from(CRSF_CHANNEL_VALUE_MAX) * 2;

        core::array::from_fn(|i| {
            let phase = (n * u64::from(SWEEP_STEP) + i as u64 * 128) % span;
            let value = if phase > u64::from(CRSF_CHANNEL_VALUE_MAX) {
                span - phase
            } else {
                phase
            };
            value as u16
        })
    }

    fn next_frame(&mut self) -> Bytes {
        let n = self.frames_sent;
        self.frames_sent += 1;

        let format = &self.config.format;
        let frame = encode_rc_channels_frame(&Self::channels_for_frame(n), format);
        let corrupt = self.config.corrupt_every > 0 && (n + 1) % self.config.corrupt_every == 0;

        let mut out = frame.to_vec();
        if corrupt {
            let last = out.len() - 1;
            out[last] ^= 0x5A;
        }
        if (n + 1) % LINK_STATS_EVERY == 0 {
            let stats = encode_frame(format, CRSF_FRAMETYPE_LINK_STATISTICS, &[0u8; 10]);
            out.extend_from_slice(&stats);
        }

        Bytes::from(out)
    }

    fn finished(&self) -> bool {
        self.config
            .max_frames
            .is_some_and(|max| self.frames_sent >= max)
    }
}

#[async_trait]
impl SerialPortIO for SimulatedLink {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            if self.finished() {
                return Ok(0);
            }
            self.pacing.tick().await;
            self.pending = self.next_frame();
        }

        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.advance(n);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::decoder::{DecoderConfig, RcDecoder};
    use crate::intake::intake_channel;
    use crate::serial::run_intake;

    #[test]
    fn test_channels_stay_in_range() {
        for n in 0..2000 {
            let channels = SimulatedLink::channels_for_frame(n);
            assert!(channels.iter().all(|&c| c <= CRSF_CHANNEL_VALUE_MAX));
        }
        assert_eq!(SimulatedLink::channels_for_frame(0)[0], 0);
        assert_eq!(SimulatedLink::channels_for_frame(1)[0], SWEEP_STEP);
    }

    #[tokio::test(start_paused = true)]
    async fn test_link_feeds_decoder() {
        let link = SimulatedLink::new(SimulatedLinkConfig {
            max_frames: Some(3),
            ..SimulatedLinkConfig::default()
        });

        let (producer, mut consumer) = intake_channel(256);
        let total = run_intake(link, producer).await.unwrap();
        assert_eq!(total, 3 * CRSF_RC_CHANNELS_FRAME_SIZE as u64);

        let mut decoder = RcDecoder::default();
        assert_eq!(
            decoder.drain(consumer.take().bytes),
            Some(SimulatedLink::channels_for_frame(2))
        );
        assert_eq!(decoder.frames_accepted(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_corrupted_frames_are_rejected() {
        let decoder_config = DecoderConfig {
            crc_span: CrcSpan::TypeAndPayload,
            ..DecoderConfig::default()
        };
        let link = SimulatedLink::new(SimulatedLinkConfig {
            corrupt_every: 2,
            max_frames: Some(LINK_STATS_EVERY),
            format: decoder_config.frame_format(),
            ..SimulatedLinkConfig::default()
        });

        let (producer, mut consumer) = intake_channel(4096);
        run_intake(link, producer).await.unwrap();

        let mut decoder = RcDecoder::new(decoder_config);
        decoder.drain(consumer.take().bytes);

        assert_eq!(decoder.frames_accepted(), LINK_STATS_EVERY / 2);
        assert_eq!(decoder.crc_errors(), LINK_STATS_EVERY / 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_link_follows_configured_wire_format() {
        let mut config = Config::default();
        config.serial.simulate = true;
        config.receiver.sync_byte = 0xEE;
        config.receiver.accepted_frame_type = 0x17;
        config.receiver.crc_poly = 0x07;
        config.receiver.crc_span = CrcSpan::TypeAndPayload;
        assert!(config.validate().is_ok());

        let link = SimulatedLink::new(SimulatedLinkConfig {
            max_frames: Some(5),
            ..config.simulated_link_config()
        });

        let (producer, mut consumer) = intake_channel(4096);
        run_intake(link, producer).await.unwrap();

        let mut decoder = RcDecoder::new(config.decoder_config());
        assert_eq!(
            decoder.drain(consumer.take().bytes),
            Some(SimulatedLink::channels_for_frame(4))
        );
        assert_eq!(decoder.frames_accepted(), 5);
        assert_eq!(decoder.crc_errors(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_link_with_only_poly_changed() {
        let mut config = Config::default();
        config.receiver.crc_poly = 0x07;

        let link = SimulatedLink::new(SimulatedLinkConfig {
            max_frames: Some(5),
            ..config.simulated_link_config()
        });

        let (producer, mut consumer) = intake_channel(4096);
        run_intake(link, producer).await.unwrap();

        let mut decoder = RcDecoder::new(config.decoder_config());
        decoder.drain(consumer.take().bytes);
        assert_eq!(decoder.frames_accepted(), 5);
        assert_eq!(decoder.crc_errors(), 0);
    }
}
