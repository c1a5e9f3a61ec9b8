//! # Error Types
//!
//! Custom error types for CRSF RX using `thiserror`.
//!
//! Link noise (sync loss, CRC mismatch, intake overflow) is not an error here:
//! it is recovered locally by the decoder. These variants cover setup and I/O.

use thiserror::Error;

/// Main error type for CRSF RX
#[derive(Debug, Error)]
pub enum CrsfRxError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial devices could be opened
    #[error("No serial device found (tried: {0})")]
    SerialPortNotFound(String),
}

/// Result type alias for CRSF RX
pub type Result<T> = std::result::Result<T, CrsfRxError>;
