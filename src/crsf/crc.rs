//! # CRC8 Implementation
//!
//! CRC-8 checksum calculation for the CRSF protocol.
//!
//! **Polynomial**: 0xD5 (x^8 + x^7 + x^6 + x^4 + x^2 + 1) for CRSF (CRC-8-DVB-S2)
//! **Initial Value**: 0x00, non-reflected
//!
//! A span that ends with its own CRC byte checksums to zero, which is how
//! received packets are validated.

use super::protocol::CRSF_CRC_POLY;

/// Precomputed CRC8-DVB-S2 lookup table for fast calculation
const CRC8_TABLE: [u8; 256] = generate_crc8_table(CRSF_CRC_POLY);

/// Generate a CRC8 lookup table at compile time
const fn generate_crc8_table(poly: u8) -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = i as u8;
        let mut j = 0;

        while j < 8 {
            if (crc & 0x80) != 0 {
                crc = (crc << 1) ^ poly;
            } else {
                crc <<= 1;
            }
            j += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
}

/// Continue a bit-serial CRC8 over `data` from a running value
///
/// Lets a checksum cover fields that are not contiguous in memory.
pub fn crc8_update(mut crc: u8, data: &[u8], poly: u8) -> u8 {
    for &byte in data {
        crc ^= byte;

        for _ in 0..8 {
            if (crc & 0x80) != 0 {
                crc = (crc << 1) ^ poly;
            } else {
                crc <<= 1;
            }
        }
    }

    crc
}

/// Calculate a CRC8 checksum bit by bit with an arbitrary polynomial
///
/// # Arguments
///
/// * `data` - Byte slice to calculate CRC for
/// * `poly` - Generator polynomial, top bit implicit
///
/// # Returns
///
/// * `u8` - Calculated CRC8 checksum
///
/// # Examples
///
/// ```
/// use crsf_rx::crsf::crc::crc8;
///
/// let mut data = vec![0x16, 0x00, 0x04];
/// let crc = crc8(&data, 0xD5);
/// data.push(crc);
/// assert_eq!(crc8(&data, 0xD5), 0);
/// ```
pub fn crc8(data: &[u8], poly: u8) -> u8 {
    crc8_update(0, data, poly)
}

/// Calculate CRC8-DVB-S2 checksum using lookup table (fast)
///
/// Same result as `crc8(data, 0xD5)`.
pub fn crc8_dvb_s2(data: &[u8]) -> u8 {
    let mut crc: u8 = 0;

    for &byte in data {
        crc = CRC8_TABLE[(crc ^ byte) as usize];
    }

    crc
}

/// CRC8 for any polynomial, taking the lookup table for the CRSF one
pub fn crc8_for(data: &[u8], poly: u8) -> u8 {
    if poly == CRSF_CRC_POLY {
        crc8_dvb_s2(data)
    } else {
        crc8(data, poly)
    }
}
