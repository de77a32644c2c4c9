//! CRC-16-CCITT (polynomial `0x1021`, initial value `0xFFFF`, no reflection,
//! no final XOR), used as the Frame Error Control Field on CCSDS transfer
//! frames.
//!
//! Bytes are processed MSB first: each input byte is XORed into the high
//! half of the running CRC, then shifted left eight times, XORing in the
//! polynomial whenever the bit shifted out of bit 15 was set.

use crate::error::{RelayError, Result};

const POLY: u16 = 0x1021;
const INIT: u16 = 0xFFFF;

/// Compute the CRC-16-CCITT of `data`.
pub fn calculate(data: &[u8]) -> u16 {
    let mut crc = INIT;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ POLY
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Append a big-endian CRC-16-CCITT of `data` to a copy of `data`.
pub fn append(data: &[u8]) -> Vec<u8> {
    let crc = calculate(data);
    let mut out = Vec::with_capacity(data.len() + 2);
    out.extend_from_slice(data);
    out.extend_from_slice(&crc.to_be_bytes());
    out
}

/// Verify that the last two bytes of `data` are the big-endian CRC-16-CCITT
/// of the bytes preceding them.
///
/// # Errors
/// Returns [`RelayError::TooShort`] if `data` is shorter than 2 bytes.
pub fn verify_appended(data: &[u8]) -> Result<bool> {
    if data.len() < 2 {
        return Err(RelayError::TooShort {
            needed: 2,
            got: data.len(),
        });
    }
    let (body, trailer) = data.split_at(data.len() - 2);
    let stored = u16::from_be_bytes([trailer[0], trailer[1]]);
    Ok(calculate(body) == stored)
}
