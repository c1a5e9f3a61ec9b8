//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::crsf::parser::ParserOptions;
use crate::crsf::protocol::*;
use crate::decoder::DecoderConfig;
use crate::error::{CrsfRxError, Result};
use crate::serial::sim::SimulatedLinkConfig;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    pub serial: SerialConfig,
    pub receiver: ReceiverConfig,
    pub scheduler: SchedulerConfig,
    pub logging: LoggingConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SerialConfig {
    /// Device path; empty means try the default paths in order
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Generate frames in-process instead of opening a port
    #[serde(default)]
    pub simulate: bool,

    #[serde(default = "default_sim_frame_rate_hz")]
    pub sim_frame_rate_hz: u32,

    /// Corrupt every Nth simulated frame (0 = never)
    #[serde(default)]
    pub sim_corrupt_every: u64,
}

/// Frame decoding configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ReceiverConfig {
    #[serde(default = "default_sync_byte")]
    pub sync_byte: u8,

    #[serde(default = "default_accepted_frame_type")]
    pub accepted_frame_type: u8,

    #[serde(default = "default_crc_poly")]
    pub crc_poly: u8,

    #[serde(default)]
    pub crc_span: CrcSpan,

    #[serde(default)]
    pub resync_on_sync_byte: bool,

    #[serde(default = "default_intake_capacity")]
    pub intake_capacity: usize,
}

/// Control loop timing
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SchedulerConfig {
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,

    #[serde(default = "default_status_interval_ms")]
    pub status_interval_ms: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Also write daily-rotated log files here; empty disables file output
    #[serde(default)]
    pub log_dir: String,
}

// Default value functions
fn default_serial_port() -> String { String::new() }
fn default_baud_rate() -> u32 { 420000 }
fn default_sim_frame_rate_hz() -> u32 { 150 }

fn default_sync_byte() -> u8 { CRSF_SYNC_BYTE }
fn default_accepted_frame_type() -> u8 { CRSF_FRAMETYPE_RC_CHANNELS_PACKED }
fn default_crc_poly() -> u8 { CRSF_CRC_POLY }
fn default_intake_capacity() -> usize { 512 }

fn default_tick_hz() -> u32 { 100 }
fn default_status_interval_ms() -> u64 { 1000 }

fn default_log_level() -> String { "info".to_string() }

/// Line rates ELRS receivers can be configured for
const SUPPORTED_BAUD_RATES: [u32; 6] = [115200, 400000, 420000, 921600, 1870000, 3750000];

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl Default for Config {
    fn default() -> Self {
        Self {
            serial: SerialConfig {
                port: default_serial_port(),
                baud_rate: default_baud_rate(),
                simulate: false,
                sim_frame_rate_hz: default_sim_frame_rate_hz(),
                sim_corrupt_every: 0,
            },
            receiver: ReceiverConfig {
                sync_byte: default_sync_byte(),
                accepted_frame_type: default_accepted_frame_type(),
                crc_poly: default_crc_poly(),
                crc_span: CrcSpan::default(),
                resync_on_sync_byte: false,
                intake_capacity: default_intake_capacity(),
            },
            scheduler: SchedulerConfig {
                tick_hz: default_tick_hz(),
                status_interval_ms: default_status_interval_ms(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
                log_dir: String::new(),
            },
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> CrsfRxError {
    CrsfRxError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use crsf_rx::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid(
                "baud_rate must be one of: 115200, 400000, 420000, 921600, 1870000, 3750000",
            ));
        }

        if self.serial.sim_frame_rate_hz == 0 || self.serial.sim_frame_rate_hz > 1000 {
            return Err(invalid("sim_frame_rate_hz must be between 1 and 1000"));
        }

        if self.receiver.crc_poly == 0 {
            return Err(invalid("crc_poly must be non-zero"));
        }

        if self.receiver.sync_byte == self.receiver.accepted_frame_type {
            return Err(invalid("sync_byte and accepted_frame_type must differ"));
        }

        if self.receiver.intake_capacity < CRSF_RC_CHANNELS_FRAME_SIZE
            || self.receiver.intake_capacity > 4096
        {
            return Err(invalid(format!(
                "intake_capacity must be between {} and 4096",
                CRSF_RC_CHANNELS_FRAME_SIZE
            )));
        }

        if self.scheduler.tick_hz == 0 || self.scheduler.tick_hz > 10000 {
            return Err(invalid("tick_hz must be between 1 and 10000"));
        }

        if self.scheduler.status_interval_ms == 0 || self.scheduler.status_interval_ms > 60000 {
            return Err(invalid("status_interval_ms must be between 1 and 60000"));
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(invalid(format!(
                "log level '{}' must be one of: {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }

    /// Bytes the link can deliver between two ticks (10 bits per byte on the wire)
    pub fn bytes_per_tick(&self) -> usize {
        (self.serial.baud_rate / 10 / self.scheduler.tick_hz.max(1)) as usize
    }

    /// Decoder settings derived from `[receiver]`
    pub fn decoder_config(&self) -> DecoderConfig {
        DecoderConfig {
            parser: ParserOptions {
                sync_byte: self.receiver.sync_byte,
                accepted_type: self.receiver.accepted_frame_type,
                resync_on_sync_byte: self.receiver.resync_on_sync_byte,
            },
            crc_poly: self.receiver.crc_poly,
            crc_span: self.receiver.crc_span,
        }
    }

    /// Simulator settings derived from `[serial]`
    pub fn simulated_link_config(&self) -> SimulatedLinkConfig {
        SimulatedLinkConfig {
            frame_rate_hz: self.serial.sim_frame_rate_hz,
            format: self.decoder_config().frame_format(),
            corrupt_every: self.serial.sim_corrupt_every,
            max_frames: None,
        }
    }
}
