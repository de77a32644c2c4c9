//! Communications Link Control Word (CLCW), the 32-bit downlink status word
//! carried in a TM frame's Operational Control Field.
//!
//! Bit numbering follows the convention where bit 0 is the most significant
//! bit of the word:
//!
//! | Field | Bits | Width |
//! |---|---|---|
//! | Type | 0 | 1 |
//! | Version | 1-2 | 2 |
//! | Status | 3-5 | 3 |
//! | COP in effect | 6-7 | 2 |
//! | Virtual Channel ID | 8-13 | 6 |
//! | Spare | 14-15 | 2 |
//! | No RF Available | 16 | 1 |
//! | No Bit Lock | 17 | 1 |
//! | Lockout | 18 | 1 |
//! | Wait | 19 | 1 |
//! | Retransmit | 20 | 1 |
//! | FARM-B counter | 21-22 | 2 |
//! | Spare | 23 | 1 |
//! | Report Value | 24-31 | 8 |

use crate::error::{RelayError, Result};

/// Range-checked fields of a CLCW, defaulting to the all-zero/false word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClcwBuilder {
    status: u8,
    cop_in_effect: u8,
    vcid: u8,
    no_rf_available: bool,
    no_bit_lock: bool,
    lockout: bool,
    wait: bool,
    retransmit: bool,
    farm_b_counter: u8,
    report_value: u8,
}

impl Default for ClcwBuilder {
    fn default() -> Self {
        Self {
            status: 0,
            cop_in_effect: 0,
            vcid: 0,
            no_rf_available: false,
            no_bit_lock: false,
            lockout: false,
            wait: false,
            retransmit: false,
            farm_b_counter: 0,
            report_value: 0,
        }
    }
}

impl ClcwBuilder {
    /// Start a new builder with every field at its default (zero/false).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the Status field (0..=7).
    pub fn status(mut self, value: u8) -> Result<Self> {
        if value > 0x07 {
            return Err(RelayError::RangeError("CLCW status exceeds 3-bit field"));
        }
        self.status = value;
        Ok(self)
    }

    /// Set the COP-in-effect field (0..=3).
    pub fn cop_in_effect(mut self, value: u8) -> Result<Self> {
        if value > 0x03 {
            return Err(RelayError::RangeError("CLCW COP-in-effect exceeds 2-bit field"));
        }
        self.cop_in_effect = value;
        Ok(self)
    }

    /// Set the Virtual Channel ID field (0..=63).
    pub fn virtual_channel_id(mut self, value: u8) -> Result<Self> {
        if value > 0x3F {
            return Err(RelayError::RangeError("CLCW VCID exceeds 6-bit field"));
        }
        self.vcid = value;
        Ok(self)
    }

    /// Set the No RF Available flag.
    pub fn no_rf_available(mut self, value: bool) -> Self {
        self.no_rf_available = value;
        self
    }

    /// Set the No Bit Lock flag.
    pub fn no_bit_lock(mut self, value: bool) -> Self {
        self.no_bit_lock = value;
        self
    }

    /// Set the Lockout flag.
    pub fn lockout(mut self, value: bool) -> Self {
        self.lockout = value;
        self
    }

    /// Set the Wait flag.
    pub fn wait(mut self, value: bool) -> Self {
        self.wait = value;
        self
    }

    /// Set the Retransmit flag.
    pub fn retransmit(mut self, value: bool) -> Self {
        self.retransmit = value;
        self
    }

    /// Set the FARM-B counter field (0..=3).
    pub fn farm_b_counter(mut self, value: u8) -> Result<Self> {
        if value > 0x03 {
            return Err(RelayError::RangeError("CLCW FARM-B counter exceeds 2-bit field"));
        }
        self.farm_b_counter = value;
        Ok(self)
    }

    /// Set the Report Value field (0..=255).
    pub fn report_value(mut self, value: u8) -> Self {
        self.report_value = value;
        self
    }

    /// Compose the 32-bit CLCW word from the builder's fields.
    pub fn build(self) -> u32 {
        let mut word: u32 = 0;
        // Type = 0, Version = 0 (bits 0-2): nothing to OR in.
        word |= u32::from(self.status) << (31 - 5);
        word |= u32::from(self.cop_in_effect) << (31 - 7);
        word |= u32::from(self.vcid) << (31 - 13);
        word |= u32::from(self.no_rf_available) << (31 - 16);
        word |= u32::from(self.no_bit_lock) << (31 - 17);
        word |= u32::from(self.lockout) << (31 - 18);
        word |= u32::from(self.wait) << (31 - 19);
        word |= u32::from(self.retransmit) << (31 - 20);
        word |= u32::from(self.farm_b_counter) << (31 - 22);
        word |= u32::from(self.report_value);
        word
    }
}

/// Encode a CLCW with only the virtual channel ID and report value set,
/// every other field at its default.
///
/// # Errors
/// Returns [`RelayError::RangeError`] if `vcid > 63`.
pub fn encode(vcid: u8, report_value: u8) -> Result<u32> {
    Ok(ClcwBuilder::new()
        .virtual_channel_id(vcid)?
        .report_value(report_value)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector_matches_simple_encode() {
        // E3: CLCW.encode(vcid=5, report=42) == 0x0014_002A big-endian.
        let word = encode(5, 42).unwrap();
        assert_eq!(word, 0x0014_002A);
        assert_eq!(word.to_be_bytes(), [0x00, 0x14, 0x00, 0x2A]);
    }

    #[test]
    fn builder_matches_simple_encode_for_all_vcid_and_report_value() {
        for vcid in 0u8..=63 {
            for report in [0u8, 1, 42, 127, 255] {
                let via_builder = ClcwBuilder::new()
                    .virtual_channel_id(vcid)
                    .unwrap()
                    .report_value(report)
                    .build();
                let via_encode = encode(vcid, report).unwrap();
                assert_eq!(via_builder, via_encode);
            }
        }
    }

    #[test]
    fn encode_rejects_out_of_range_vcid() {
        assert!(matches!(encode(64, 0), Err(RelayError::RangeError(_))));
    }

    #[test]
    fn builder_rejects_out_of_range_fields() {
        assert!(ClcwBuilder::new().status(8).is_err());
        assert!(ClcwBuilder::new().cop_in_effect(4).is_err());
        assert!(ClcwBuilder::new().farm_b_counter(4).is_err());
    }

    #[test]
    fn default_builder_produces_zero_word() {
        assert_eq!(ClcwBuilder::new().build(), 0);
    }

    #[test]
    fn flags_occupy_expected_bit_positions() {
        let word = ClcwBuilder::new().no_rf_available(true).build();
        assert_eq!(word, 1 << 15);

        let word = ClcwBuilder::new().retransmit(true).build();
        assert_eq!(word, 1 << 11);
    }
}
