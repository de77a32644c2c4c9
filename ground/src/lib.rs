//! Relay engine internals, exposed as a library so integration tests can
//! drive [`relay::RelayEngine`] directly over loopback sockets.

pub mod config;
pub mod relay;
