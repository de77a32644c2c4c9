//! Error types for the CCSDS codecs and relay hand-off queues.
//!
//! Mirrors the abstract error kinds of the relay design: codec failures are
//! returned to the caller via `Result`, while [`RelayError::QueueFull`] and
//! [`RelayError::IoError`] are diagnostic-only per spec.md §7 — the relay
//! engine (`space_relay_ground::relay`) constructs them purely to log a
//! typed value, never to propagate a `Result` up the call stack.

use thiserror::Error;

/// Standard result type for codec operations.
pub type Result<T> = core::result::Result<T, RelayError>;

/// Errors produced by the CRC, CLTU, transfer-frame, CLCW, and time codecs,
/// plus the two relay-engine diagnostics (`QueueFull`, `IoError`) that are
/// logged but never returned from a codec call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// A null input or an out-of-range field value was supplied to a codec.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A byte slice was shorter than the minimum required length.
    #[error("input too short: need at least {needed} bytes, got {got}")]
    TooShort {
        /// Minimum number of bytes required.
        needed: usize,
        /// Number of bytes actually supplied.
        got: usize,
    },

    /// A CLTU did not begin with the `EB 90` start sequence.
    #[error("CLTU does not begin with the EB90 start sequence")]
    InvalidStart,

    /// No seven-byte `C5` tail sequence was found while decoding a CLTU.
    #[error("no CLTU tail sequence found")]
    TailNotFound,

    /// BCH parity recomputation did not match the stored parity byte.
    #[error("BCH parity mismatch in code block at byte offset {0}")]
    ParityError(usize),

    /// A timestamp fell outside the encodable range of a time code.
    #[error("value out of range: {0}")]
    RangeError(&'static str),

    /// A bounded hand-off queue was at capacity; the item named by `what`
    /// was dropped. Diagnostic only — never returned from a `Result`.
    #[error("queue full, dropped {what}")]
    QueueFull {
        /// Short description of the dropped item, e.g. `"a TM frame"`.
        what: &'static str,
    },

    /// A transient socket failure on an endpoint's accept/read/write path.
    /// Diagnostic only — recovered locally by closing the client, waiting,
    /// and re-accepting, never returned from a `Result`.
    #[error("I/O error on {endpoint}: {reason}")]
    IoError {
        /// Label of the endpoint that observed the failure.
        endpoint: &'static str,
        /// Textual description of the underlying `std::io::Error`.
        reason: String,
    },
}
