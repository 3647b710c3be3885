//! Error taxonomy for construction, command validation, and controller lifecycle.

use thiserror::Error;

/// Every fallible outcome the crate can produce.
///
/// Construction errors and out-of-range errors are synchronous: they are
/// returned to the caller before any state is touched. Controller lifecycle
/// errors can additionally surface from a blocked `wait`-style call if the
/// controller shuts down while the caller is waiting on a result.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MppError {
    /// A construction-time configuration is invalid (I3).
    #[error("invalid configuration: {reason}")]
    Config {
        /// Human-readable reason, kept `'static` so the error stays `Copy`.
        reason: &'static str,
    },

    /// A command parameter is out of range for the bound configuration.
    #[error("{field} out of range: {value} (bound {bound})")]
    OutOfRange {
        /// Name of the offending field (`"addr_a"`, `"chip"`, `"x"`, ...).
        field: &'static str,
        /// The rejected value.
        value: usize,
        /// The exclusive upper bound the value was checked against.
        bound: usize,
    },

    /// The controller has been stopped, or stopped while this call was
    /// waiting for a result.
    #[error("controller stopped")]
    ControllerStopped,

    /// Backing storage could not be allocated for the requested size.
    #[error("allocation failed for {words} words")]
    Allocation {
        /// Number of 64-bit words that could not be allocated.
        words: usize,
    },
}
