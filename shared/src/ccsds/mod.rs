//! CCSDS Transfer Frame and Operational Control Field codecs.

pub mod clcw;
pub mod frame;
