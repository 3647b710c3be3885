//! # mpp-sim
//!
//! A software emulator of a bit-serial Massively Parallel Processor (MPP)
//! array: a rectangular grid of 1-bit Processing Elements (PEs) packed 64
//! per chip, driven by a 3-input Boolean truth-table ALU, with a toroidal
//! NEWS router shifting a per-PE routing bit across the grid.
//!
//! The public surface is [`controller::Controller`]: start one, submit
//! commands against it, and it runs them in order on a single dedicated
//! worker thread. `mpp` and `router` are implementation detail — their
//! methods trust pre-validated indices (see SPEC_FULL.md §4.2) and are
//! reachable only through `Controller`, which validates every command's
//! parameters before it ever touches them.

pub mod alu;
pub mod command;
pub mod controller;
pub mod error;
pub(crate) mod mpp;
pub(crate) mod router;

pub use command::{Command, CommandOutput, GridConfig};
pub use controller::{Controller, DEFAULT_HEIGHT, DEFAULT_N_CHIPS, DEFAULT_WIDTH};
pub use error::MppError;
