//! CCSDS Day Segmented Time code (CDS), used to timestamp telemetry.
//!
//! Six bytes: a big-endian day count since the CCSDS epoch (1958-01-01
//! 00:00:00) and a big-endian millisecond-of-day count. An optional
//! two-byte suffix carries sub-millisecond precision in its upper ten bits.
//!
//! CCSDS epoch time is defined in TAI; this encoder follows the UTC
//! calendar date difference instead, which is the approximation this
//! system has always made (see DESIGN.md) and is preserved rather than
//! "fixed", per the open question in the design notes.

use chrono::{DateTime, NaiveDate, Timelike, Utc};

use crate::error::{RelayError, Result};

/// Seconds between the CCSDS epoch (1958-01-01) and the Unix epoch (1970-01-01).
const EPOCH_DELTA_SECS: i64 = 378_691_200;

const MILLIS_PER_DAY: u32 = 86_400_000;

/// A CCSDS Day Segmented Time code without the microsecond extension (6 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CdsTime {
    /// Days elapsed since the CCSDS epoch.
    pub days: u16,
    /// Milliseconds elapsed since midnight of `days`.
    pub millis_of_day: u32,
}

/// A CDS time code with the optional microsecond-precision suffix (8 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CdsTimeExtended {
    /// The base 6-byte time code.
    pub base: CdsTime,
    /// Microseconds within the current millisecond (0..=999).
    pub micros: u16,
}

impl CdsTime {
    /// Encoded length in bytes.
    pub const SIZE: usize = 6;

    /// Build a CDS time code from a UTC timestamp.
    ///
    /// # Errors
    /// Returns [`RelayError::RangeError`] if `timestamp` is before the
    /// CCSDS epoch or more than 65535 days after it.
    pub fn from_datetime(timestamp: DateTime<Utc>) -> Result<Self> {
        let epoch_secs = timestamp.timestamp() + EPOCH_DELTA_SECS;
        if epoch_secs < 0 {
            return Err(RelayError::RangeError("timestamp precedes the CCSDS epoch"));
        }

        let days_i64 = epoch_secs.div_euclid(86_400);
        let days = u16::try_from(days_i64)
            .map_err(|_| RelayError::RangeError("day count exceeds the 65535-day CDS window"))?;

        let secs_of_day = epoch_secs.rem_euclid(86_400) as u32;
        let millis_of_day = secs_of_day * 1000 + timestamp.timestamp_subsec_millis();

        Ok(Self { days, millis_of_day })
    }

    /// Recover a UTC timestamp from this time code (to millisecond precision).
    pub fn to_datetime(self) -> DateTime<Utc> {
        let epoch_secs = i64::from(self.days) * 86_400 + i64::from(self.millis_of_day / 1000);
        let millis = self.millis_of_day % 1000;
        let naive = NaiveDate::from_ymd_opt(1958, 1, 1)
            .expect("1958-01-01 is a valid calendar date")
            .and_hms_milli_opt(0, 0, 0, 0)
            .expect("midnight is a valid time")
            + chrono::Duration::seconds(epoch_secs)
            + chrono::Duration::milliseconds(i64::from(millis));
        DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc)
    }

    /// Encode to the 6-byte big-endian wire representation.
    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0..2].copy_from_slice(&self.days.to_be_bytes());
        out[2..6].copy_from_slice(&self.millis_of_day.to_be_bytes());
        out
    }

    /// Decode from a 6-byte big-endian wire representation.
    ///
    /// # Errors
    /// Returns [`RelayError::TooShort`] if fewer than 6 bytes are supplied.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(RelayError::TooShort {
                needed: Self::SIZE,
                got: bytes.len(),
            });
        }
        let days = u16::from_be_bytes([bytes[0], bytes[1]]);
        let millis_of_day = u32::from_be_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]);
        Ok(Self { days, millis_of_day })
    }
}

impl CdsTimeExtended {
    /// Encoded length in bytes.
    pub const SIZE: usize = 8;

    /// Build an extended CDS time code, adding microsecond precision.
    ///
    /// # Errors
    /// Returns [`RelayError::RangeError`] under the same conditions as
    /// [`CdsTime::from_datetime`].
    pub fn from_datetime(timestamp: DateTime<Utc>) -> Result<Self> {
        let base = CdsTime::from_datetime(timestamp)?;
        let micros = (timestamp.timestamp_subsec_micros() % 1000) as u16;
        Ok(Self { base, micros })
    }

    /// Encode to the 8-byte big-endian wire representation: the base 6
    /// bytes followed by microseconds packed into the upper 10 bits of the
    /// trailing 2-byte field (lower 6 bits spare, zeroed).
    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0..6].copy_from_slice(&self.base.to_bytes());
        let suffix = (self.micros & 0x03FF) << 6;
        out[6..8].copy_from_slice(&suffix.to_be_bytes());
        out
    }

    /// Decode from an 8-byte big-endian wire representation.
    ///
    /// # Errors
    /// Returns [`RelayError::TooShort`] if fewer than 8 bytes are supplied.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(RelayError::TooShort {
                needed: Self::SIZE,
                got: bytes.len(),
            });
        }
        let base = CdsTime::from_bytes(&bytes[0..6])?;
        let suffix = u16::from_be_bytes([bytes[6], bytes[7]]);
        let micros = (suffix >> 6) & 0x03FF;
        Ok(Self { base, micros })
    }
}

/// Exposes [`MILLIS_PER_DAY`] to tests that sanity-check it against
/// `24 * 60 * 60 * 1000`.
#[cfg(test)]
const fn millis_per_day() -> u32 {
    MILLIS_PER_DAY
}
