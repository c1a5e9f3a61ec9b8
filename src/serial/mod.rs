//! # Serial Communication Module
//!
//! Receive path from the ELRS receiver's UART.
//!
//! This module handles:
//! - Opening serial port at 420,000 baud, 8N1
//! - The intake task: every byte the port delivers is appended to the intake buffer
//! - A frame-generating simulator for running without hardware

pub mod port_trait;
pub mod sim;

use crate::error::{CrsfRxError, Result};
use crate::intake::IntakeProducer;
use port_trait::{SerialPortIO, TokioSerialPort};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

/// CRSF baud rate for ELRS (420,000 baud)
pub const CRSF_BAUD_RATE: u32 = 420_000;

/// Default receiver device paths to try (in order of preference)
pub const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyAMA0", // On-board UART (receiver wired to GPIO pins)
    "/dev/ttyUSB0", // USB-to-serial adapters
];

/// Read chunk size; one CRSF frame is at most 64 bytes
const READ_CHUNK_SIZE: usize = 64;

/// ELRS Receiver Serial Port Handler
pub struct ReceiverSerial {
    /// Serial port handle
    port: TokioSerialPort<tokio_serial::SerialStream>,
    /// Device path (e.g., /dev/ttyAMA0)
    device_path: String,
}

impl std::fmt::Debug for ReceiverSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiverSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl ReceiverSerial {
    /// Open connection to the receiver
    ///
    /// Auto-detects the device by trying common paths.
    ///
    /// # Errors
    ///
    /// Returns error if no device could be opened
    pub fn open(baud_rate: u32) -> Result<Self> {
        Self::open_with_paths(DEFAULT_DEVICE_PATHS, baud_rate)
    }

    /// Open connection to the receiver with custom device paths
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyAMA0"])
    /// * `baud_rate` - Line rate, 420,000 for stock CRSF
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use crsf_rx::serial::{ReceiverSerial, CRSF_BAUD_RATE};
    ///
    /// fn main() -> anyhow::Result<()> {
    ///     let serial = ReceiverSerial::open_with_paths(&["/dev/ttyUSB1"], CRSF_BAUD_RATE)?;
    ///     println!("Listening on {}", serial.device_path());
    ///     Ok(())
    /// }
    /// ```
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Successfully opened receiver at {} ({} baud)", path, baud_rate);
                    return Ok(Self {
                        port: TokioSerialPort::new(port),
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(CrsfRxError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific serial port with CRSF settings (8N1, no flow control)
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| CrsfRxError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Hand the port over to the intake task
    pub fn into_port(self) -> TokioSerialPort<tokio_serial::SerialStream> {
        self.port
    }
}

/// Receive loop: append every byte the port delivers to the intake buffer
///
/// Runs until the port reports end of stream. Each read is the equivalent of
/// one receive interrupt: drain what the hardware has, append, return.
///
/// # Returns
///
/// * `Result<u64>` - Total bytes received
///
/// # Errors
///
/// Returns error if a read fails
pub async fn run_intake<P>(mut port: P, producer: IntakeProducer) -> Result<u64>
where
    P: SerialPortIO,
{
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    let mut total: u64 = 0;

    loop {
        let n = port
            .read(&mut chunk)
            .await
            .map_err(|e| CrsfRxError::Serial(format!("Failed to read from receiver: {}", e)))?;

        if n == 0 {
            info!("Receiver link closed after {} bytes", total);
            return Ok(total);
        }

        producer.extend(&chunk[..n]);
        total += n as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crsf::encoder::encode_rc_channels_frame;
    use crate::crsf::protocol::{FrameFormat, CRSF_CHANNEL_VALUE_CENTER};
    use crate::decoder::RcDecoder;
    use crate::intake::intake_channel;

    #[test]
    fn test_constants() {
        assert_eq!(CRSF_BAUD_RATE, 420_000, "CRSF requires 420,000 baud");
        assert_eq!(DEFAULT_DEVICE_PATHS.len(), 2);
        assert_eq!(DEFAULT_DEVICE_PATHS[0], "/dev/ttyAMA0");
        assert_eq!(DEFAULT_DEVICE_PATHS[1], "/dev/ttyUSB0");
    }

    #[test]
    fn test_open_with_invalid_paths_returns_error() {
        let invalid_paths = &["/dev/nonexistent0", "/dev/nonexistent1"];
        let result = ReceiverSerial::open_with_paths(invalid_paths, CRSF_BAUD_RATE);

        match result.unwrap_err() {
            CrsfRxError::SerialPortNotFound(msg) => {
                assert!(msg.contains("/dev/nonexistent0"));
                assert!(msg.contains("/dev/nonexistent1"));
            }
            other => panic!("Expected SerialPortNotFound error, got: {:?}", other),
        }
    }

    #[test]
    fn test_open_with_empty_paths_returns_error() {
        let empty_paths: &[&str] = &[];
        let result = ReceiverSerial::open_with_paths(empty_paths, CRSF_BAUD_RATE);

        assert!(matches!(result, Err(CrsfRxError::SerialPortNotFound(_))));
    }

    #[test]
    fn test_open_port_with_invalid_path_returns_error() {
        let result =
            ReceiverSerial::open_port("/dev/nonexistent_serial_device_12345", CRSF_BAUD_RATE);

        match result.unwrap_err() {
            CrsfRxError::Serial(msg) => {
                assert!(msg.contains("/dev/nonexistent_serial_device_12345"));
                assert!(msg.contains("Failed to open"));
            }
            other => panic!("Expected Serial error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_intake_appends_all_reads() {
        let frame =
            encode_rc_channels_frame(&[CRSF_CHANNEL_VALUE_CENTER; 16], &FrameFormat::default());
        let mock = tokio_test::io::Builder::new()
            .read(&frame[..5])
            .read(&frame[5..20])
            .read(&frame[20..])
            .build();

        let (producer, mut consumer) = intake_channel(128);
        let total = run_intake(TokioSerialPort::new(mock), producer).await.unwrap();
        assert_eq!(total, 26);

        let mut decoder = RcDecoder::default();
        assert_eq!(
            decoder.drain(consumer.take().bytes),
            Some([CRSF_CHANNEL_VALUE_CENTER; 16])
        );
    }

    #[tokio::test]
    async fn test_run_intake_propagates_read_error() {
        let mock = tokio_test::io::Builder::new()
            .read(&[0xC8])
            .read_error(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "unplugged"))
            .build();

        let (producer, mut consumer) = intake_channel(128);
        let result = run_intake(TokioSerialPort::new(mock), producer).await;

        match result {
            Err(CrsfRxError::Serial(msg)) => assert!(msg.contains("unplugged")),
            other => panic!("Expected Serial error, got: {:?}", other),
        }
        // Bytes read before the failure were kept
        assert_eq!(consumer.take().bytes, &[0xC8]);
    }

    // Integration test - only runs if receiver hardware is connected
    #[tokio::test]
    #[ignore] // Run with: cargo test -- --ignored
    async fn test_receive_with_real_hardware() {
        let Ok(serial) = ReceiverSerial::open(CRSF_BAUD_RATE) else {
            println!("No receiver hardware detected (skipping)");
            return;
        };

        let (producer, mut consumer) = intake_channel(1024);
        let intake = tokio::spawn(run_intake(serial.into_port(), producer));
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        intake.abort();

        let mut decoder = RcDecoder::default();
        decoder.drain(consumer.take().bytes);
        println!("Decoded channels: {:?}", decoder.channels());
    }
}
