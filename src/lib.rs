//! # CRSF RX Library
//!
//! Receive side of an ExpressLRS / CRSF radio-control link.
//!
//! Bytes arriving on the receiver UART are appended to a bounded intake
//! buffer; a fixed-rate control loop drains that buffer through the frame
//! parser, CRC-checks RC channels frames and unpacks the 16 channel values
//! for whatever flight logic sits downstream.

pub mod config;
pub mod error;
pub mod crsf;
pub mod decoder;
pub mod intake;
pub mod scheduler;
pub mod serial;
