//! # Space Relay Shared Library
//!
//! Codecs shared by both sides of the ground-station relay: the CRC-16 and
//! CLTU/BCH codecs used for commanding, the CCSDS Transfer Frame and CLCW
//! codecs used for telemetry, the CDS time code, and the bounded hand-off
//! queue the relay engine uses to move frames and CLTUs between socket
//! threads.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![warn(trivial_casts, trivial_numeric_casts)]
#![warn(unused_qualifications)]

pub mod ccsds;
pub mod cltu;
pub mod crc;
pub mod error;
pub mod queue;
pub mod time;

pub use error::{RelayError, Result};
pub use queue::BoundedQueue;
