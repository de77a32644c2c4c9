//! CCSDS Transfer Frame builder and parser.
//!
//! TM and TC frames share the same six-byte primary header shape in this
//! system (a TC frame is distinguished only by its data-field status word).
//! Layout, MSB first within each 16-bit word:
//!
//! ```text
//! bytes 0-1: version(2) | spacecraft_id(10) | vcid(3) | reserved(1)
//! bytes 2-3: master-channel frame count(8) | virtual-channel frame count(8)
//! bytes 4-5: data-field status
//! bytes 6..frame_size-2: data field, zero-padded to fill
//! bytes frame_size-2..frame_size: CRC-16-CCITT FECF over bytes 0..frame_size-2
//! ```
//!
//! When an Operational Control Field carrying a CLCW is present, it occupies
//! the four bytes immediately before the FECF.

use crate::crc;
use crate::error::{RelayError, Result};

/// Minimum legal total frame size: 6-byte header + 2-byte FECF + 1 data byte.
pub const MIN_FRAME_SIZE: usize = 9;
/// Size in bytes of the primary header.
pub const HEADER_SIZE: usize = 6;
/// Size in bytes of the Frame Error Control Field.
pub const FECF_SIZE: usize = 2;
/// Size in bytes of the Operational Control Field, when present.
pub const OCF_SIZE: usize = 4;

/// Data-field status word this system's TC builder always writes.
///
/// Bit 15 set marks a command frame; the remaining bits are a local
/// convention rather than a CCSDS requirement, preserved here for
/// bug-compatibility (see DESIGN.md).
pub const TC_DATA_FIELD_STATUS: u16 = 0x8000;

/// Inputs to [`build_frame`].
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    /// Spacecraft identifier, 0..=1023.
    pub spacecraft_id: u16,
    /// Virtual channel identifier, 0..=7.
    pub vcid: u8,
    /// Master channel frame count, wrapped into the high byte of the frame count word.
    pub master_channel_count: u8,
    /// Virtual channel frame count, wrapped into the low byte of the frame count word.
    pub vc_count: u8,
    /// Data-field status word. TC frames should use [`TC_DATA_FIELD_STATUS`].
    pub data_field_status: u16,
    /// Payload bytes; right-padded with zero to fill the data field.
    pub data: Vec<u8>,
    /// Total output frame length; must be at least [`MIN_FRAME_SIZE`].
    pub frame_size: usize,
}

impl FrameBuilder {
    /// Construct a TM frame builder with caller-chosen data-field status.
    pub fn tm(spacecraft_id: u16, vcid: u8, frame_count: u16, data: Vec<u8>, frame_size: usize) -> Self {
        let [mc, vc] = frame_count.to_be_bytes();
        Self {
            spacecraft_id,
            vcid,
            master_channel_count: mc,
            vc_count: vc,
            data_field_status: 0,
            data,
            frame_size,
        }
    }

    /// Construct a TC frame builder, preset with [`TC_DATA_FIELD_STATUS`].
    pub fn tc(spacecraft_id: u16, vcid: u8, frame_count: u16, data: Vec<u8>, frame_size: usize) -> Self {
        let mut builder = Self::tm(spacecraft_id, vcid, frame_count, data, frame_size);
        builder.data_field_status = TC_DATA_FIELD_STATUS;
        builder
    }
}

/// Build a complete transfer frame from `request`, returning exactly
/// `request.frame_size` bytes.
///
/// # Errors
/// Returns [`RelayError::RangeError`] if `spacecraft_id > 1023` or
/// `vcid > 7`; returns [`RelayError::InvalidArgument`] if `frame_size` is
/// below [`MIN_FRAME_SIZE`] or too small to hold `request.data`.
pub fn build_frame(request: &FrameBuilder) -> Result<Vec<u8>> {
    if request.spacecraft_id > 0x3FF {
        return Err(RelayError::RangeError("spacecraft_id exceeds the 10-bit field"));
    }
    if request.vcid > 0x07 {
        return Err(RelayError::RangeError("vcid exceeds the 3-bit field"));
    }
    if request.frame_size < MIN_FRAME_SIZE {
        return Err(RelayError::InvalidArgument(
            "frame_size must be at least header + FECF + 1 data byte",
        ));
    }

    let data_field_len = request.frame_size - HEADER_SIZE - FECF_SIZE;
    if request.data.len() > data_field_len {
        return Err(RelayError::InvalidArgument(
            "data is longer than the frame's data field",
        ));
    }

    let mut frame = vec![0u8; request.frame_size];

    let word1 = ((0u16) << 14) | (request.spacecraft_id << 4) | (u16::from(request.vcid) << 1);
    frame[0..2].copy_from_slice(&word1.to_be_bytes());
    frame[2] = request.master_channel_count;
    frame[3] = request.vc_count;
    frame[4..6].copy_from_slice(&request.data_field_status.to_be_bytes());

    frame[HEADER_SIZE..HEADER_SIZE + request.data.len()].copy_from_slice(&request.data);

    let fecf_offset = request.frame_size - FECF_SIZE;
    let crc = crc::calculate(&frame[..fecf_offset]);
    frame[fecf_offset..].copy_from_slice(&crc.to_be_bytes());

    Ok(frame)
}

/// A parsed transfer-frame primary header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Transfer frame version number, 0..=3.
    pub version: u8,
    /// Spacecraft identifier, 0..=1023.
    pub spacecraft_id: u16,
    /// Virtual channel identifier, 0..=7.
    pub vcid: u8,
    /// Master channel frame count (byte 2).
    pub mc_frame_count: u8,
    /// Virtual channel frame count (byte 3).
    pub vc_frame_count: u8,
    /// Data-field status word (bytes 4-5).
    pub data_field_status: u16,
    /// Whether the data-field status word marks a command (TC) frame.
    pub is_command_frame: bool,
}

impl FrameHeader {
    /// 16-bit frame count combining the master- and virtual-channel bytes,
    /// high byte first (same encoding `build_frame` writes).
    pub fn combined_frame_count(&self) -> u16 {
        u16::from_be_bytes([self.mc_frame_count, self.vc_frame_count])
    }

    /// A parsed header is valid when its version and addressing fields are
    /// within their CCSDS-defined ranges.
    pub fn is_valid(&self) -> bool {
        self.version <= 3 && self.spacecraft_id <= 0x3FF && self.vcid <= 0x07
    }
}

/// Parse the primary header of a transfer frame.
///
/// # Errors
/// Returns [`RelayError::TooShort`] if fewer than [`HEADER_SIZE`] bytes are
/// supplied.
pub fn parse_header(frame: &[u8]) -> Result<FrameHeader> {
    if frame.len() < HEADER_SIZE {
        return Err(RelayError::TooShort {
            needed: HEADER_SIZE,
            got: frame.len(),
        });
    }

    let word1 = u16::from_be_bytes([frame[0], frame[1]]);
    let version = (word1 >> 14) as u8 & 0x03;
    let spacecraft_id = (word1 >> 4) & 0x3FF;
    let vcid = ((word1 >> 1) & 0x07) as u8;

    let data_field_status = u16::from_be_bytes([frame[4], frame[5]]);

    Ok(FrameHeader {
        version,
        spacecraft_id,
        vcid,
        mc_frame_count: frame[2],
        vc_frame_count: frame[3],
        data_field_status,
        is_command_frame: data_field_status & 0x8000 != 0,
    })
}

/// Pull the spacecraft ID straight out of the first header word, without
/// building a full [`FrameHeader`].
pub fn extract_spacecraft_id(word1: u16) -> u16 {
    (word1 >> 4) & 0x3FF
}

/// `true` if `frame` parses and its header fields are all within range.
pub fn is_valid_frame(frame: &[u8]) -> bool {
    parse_header(frame).map(|h| h.is_valid()).unwrap_or(false)
}

/// Recompute and compare the FECF of a complete frame against its stored
/// trailer.
///
/// # Errors
/// Returns [`RelayError::TooShort`] if `frame` is shorter than
/// `HEADER_SIZE + FECF_SIZE`.
pub fn verify_fecf(frame: &[u8]) -> Result<bool> {
    crc::verify_appended(frame)
}

/// Extract the four-byte Operational Control Field from a frame that
/// declares OCF presence, assuming it occupies the last four bytes before
/// the FECF (this system's convention).
///
/// # Errors
/// Returns [`RelayError::TooShort`] if `frame` is too short to contain an
/// OCF ahead of its FECF.
pub fn extract_ocf(frame: &[u8]) -> Result<[u8; OCF_SIZE]> {
    let needed = HEADER_SIZE + OCF_SIZE + FECF_SIZE;
    if frame.len() < needed {
        return Err(RelayError::TooShort {
            needed,
            got: frame.len(),
        });
    }
    let start = frame.len() - FECF_SIZE - OCF_SIZE;
    let mut ocf = [0u8; OCF_SIZE];
    ocf.copy_from_slice(&frame[start..start + OCF_SIZE]);
    Ok(ocf)
}
