//! # CRSF Protocol Module
//!
//! Receive side of the Crossfire (CRSF) protocol used by ExpressLRS receivers.
//!
//! This module handles:
//! - Frame synchronization and length-driven payload extraction
//! - CRC8 (poly 0xD5) validation
//! - RC channels unpacking (16 channels, 11-bit resolution)
//! - Frame encoding for the link simulator

pub mod protocol;
pub mod crc;
pub mod channels;
pub mod parser;
pub mod encoder;
