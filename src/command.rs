//! The command catalog (§4.4): a closed sum type whose variants are
//! validated against a grid configuration *before* being handed to the
//! worker, and whose execution is a pure function of `(mpp, router,
//! payload) -> optional result` (§9 Design Notes).

use crate::error::MppError;
use crate::mpp::{Mpp, FLAG_COUNT};
use crate::router::Router;

/// One entry of the closed command catalog from spec §4.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Reset,
    LoadA { addr: usize, read_flag: u8, op_s: u8 },
    LoadB { addr: usize, context_flag: u8, op_c: u8 },
    Store { write_flag: u8, context_value: bool },
    Recv64 { chip: usize, value: u64 },
    Send64 { chip: usize },
    SendBulk,
    NewsN,
    NewsE,
    NewsW,
    NewsS,
    UnicastRecv { x: usize, y: usize, bit: bool },
    UnicastSend { x: usize, y: usize },
}

/// The union of everything a `Command` can hand back to its submitter.
/// Non-returning commands always produce `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    None,
    Word(u64),
    Bulk(Vec<u64>),
    Bit(bool),
}

/// The grid parameters a command is validated against: everything fixed at
/// controller construction time and never touched again (no Non-goal is
/// violated by holding a copy of these outside the worker — they are plain
/// `usize`s, not shared mutable state).
#[derive(Debug, Clone, Copy)]
pub struct GridConfig {
    pub address_size: usize,
    pub n_chips: usize,
    pub width: usize,
    pub height: usize,
}

#[inline]
fn bounded(field: &'static str, value: usize, bound: usize) -> Result<(), MppError> {
    if value < bound {
        Ok(())
    } else {
        Err(MppError::OutOfRange { field, value, bound })
    }
}

impl Command {
    /// Reject out-of-range parameters before the command is ever queued
    /// (§7's "rejected at enqueue time rather than on the worker").
    pub(crate) fn validate(&self, cfg: &GridConfig) -> Result<(), MppError> {
        match *self {
            Command::Reset | Command::SendBulk => Ok(()),
            Command::NewsN | Command::NewsE | Command::NewsW | Command::NewsS => Ok(()),
            Command::LoadA { addr, read_flag, .. } => {
                bounded("addr_a", addr, cfg.address_size)?;
                bounded("read_flag", read_flag as usize, FLAG_COUNT)
            }
            Command::LoadB { addr, context_flag, .. } => {
                bounded("addr_b", addr, cfg.address_size)?;
                bounded("context_flag", context_flag as usize, FLAG_COUNT)
            }
            Command::Store { write_flag, .. } => {
                bounded("write_flag", write_flag as usize, FLAG_COUNT)
            }
            Command::Recv64 { chip, .. } | Command::Send64 { chip } => {
                bounded("chip", chip, cfg.n_chips)
            }
            Command::UnicastRecv { x, y, .. } | Command::UnicastSend { x, y } => {
                bounded("x", x, cfg.width)?;
                bounded("y", y, cfg.height)
            }
        }
    }

    /// Run this command against the owned `Mpp`/`Router`. Called only by the
    /// worker, only after `validate` has already accepted the command.
    pub(crate) fn execute(self, mpp: &mut Mpp, router: &Router) -> CommandOutput {
        match self {
            Command::Reset => {
                mpp.reset();
                CommandOutput::None
            }
            Command::LoadA { addr, read_flag, op_s } => {
                mpp.load_a(addr, read_flag, op_s);
                CommandOutput::None
            }
            Command::LoadB { addr, context_flag, op_c } => {
                mpp.load_b(addr, context_flag, op_c);
                CommandOutput::None
            }
            Command::Store { write_flag, context_value } => {
                mpp.store(write_flag, context_value);
                CommandOutput::None
            }
            Command::Recv64 { chip, value } => {
                mpp.recv(chip, value);
                CommandOutput::None
            }
            Command::Send64 { chip } => CommandOutput::Word(mpp.send(chip)),
            Command::SendBulk => CommandOutput::Bulk(mpp.send_bulk()),
            Command::NewsN => {
                router.rotate_n(mpp);
                CommandOutput::None
            }
            Command::NewsE => {
                router.rotate_e(mpp);
                CommandOutput::None
            }
            Command::NewsW => {
                router.rotate_w(mpp);
                CommandOutput::None
            }
            Command::NewsS => {
                router.rotate_s(mpp);
                CommandOutput::None
            }
            Command::UnicastRecv { x, y, bit } => {
                router.unicast_recv(mpp, x, y, bit);
                CommandOutput::None
            }
            Command::UnicastSend { x, y } => CommandOutput::Bit(router.unicast_send(mpp, x, y)),
        }
    }
}
