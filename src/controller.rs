//! The command controller (C4): owns one `Mpp` and one `Router` for its
//! lifetime, runs them on a single dedicated worker thread, and exposes the
//! external command-submission surface (C5).
//!
//! The "unbounded FIFO queue, worker suspends when empty" requirement of §5
//! is realized directly as a `std::sync::mpsc` channel — no separate mutex
//! or condvar is layered on top of it, because `mpsc` already gives exactly
//! that ordering and blocking behavior. Each result-bearing command gets its
//! own one-shot `mpsc` pair for its completion slot (§9's design note, taken
//! literally).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;
use std::thread::JoinHandle;

use crate::command::{Command, CommandOutput, GridConfig};
use crate::error::MppError;
use crate::mpp::Mpp;
use crate::router::Router;

/// Canonical default grid width (§3).
pub const DEFAULT_WIDTH: usize = 256;
/// Canonical default grid height (§3).
pub const DEFAULT_HEIGHT: usize = 256;
/// Canonical default chip count, derived from `DEFAULT_WIDTH * DEFAULT_HEIGHT / 64`.
pub const DEFAULT_N_CHIPS: usize = DEFAULT_WIDTH * DEFAULT_HEIGHT / 64;

struct Job {
    command: Command,
    reply: Option<Sender<CommandOutput>>,
}

/// A handle to a running MPP controller.
///
/// Cloning a `Controller` is cheap and shares the same worker thread and
/// state: all clones submit onto the same queue. `stop` (or dropping the
/// last clone) shuts the worker down.
#[derive(Clone)]
pub struct Controller {
    inner: std::sync::Arc<Inner>,
}

struct Inner {
    config: GridConfig,
    sender: Mutex<Option<Sender<Job>>>,
    stopped: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Controller {
    /// Start a controller over the canonical default grid
    /// (`DEFAULT_WIDTH` × `DEFAULT_HEIGHT`, `DEFAULT_N_CHIPS` chips) with
    /// `address_size` memory words per PE.
    pub fn new(address_size: usize) -> Result<Self, MppError> {
        Self::with_grid(address_size, DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }

    /// Start a controller over a `width × height` grid (chip count derived
    /// as `width * height / 64`, so I3's product identity holds by
    /// construction). Dimensions are fixed for the controller's lifetime
    /// (no Non-goal of "dynamic reconfiguration" applies — there's simply
    /// no setter).
    pub fn with_grid(address_size: usize, width: usize, height: usize) -> Result<Self, MppError> {
        if width == 0 || height == 0 {
            return Err(MppError::Config { reason: "width and height must be positive" });
        }
        if width % 64 != 0 {
            return Err(MppError::Config { reason: "WIDTH must be a multiple of 64" });
        }
        let n_chips = width
            .checked_mul(height)
            .ok_or(MppError::Config { reason: "WIDTH*HEIGHT overflows" })?
            / 64;

        let mpp = Mpp::new(address_size, n_chips)?;
        let router = Router::new(&mpp, width, height)?;
        let config = GridConfig { address_size, n_chips, width, height };

        let (tx, rx) = mpsc::channel::<Job>();
        let worker = std::thread::spawn(move || run_worker(mpp, router, rx));
        log::info!(
            "mpp controller started: address_size={address_size} width={width} height={height} n_chips={n_chips}"
        );

        Ok(Controller {
            inner: std::sync::Arc::new(Inner {
                config,
                sender: Mutex::new(Some(tx)),
                stopped: AtomicBool::new(false),
                worker: Mutex::new(Some(worker)),
            }),
        })
    }

    /// Grid configuration this controller was constructed with.
    pub fn config(&self) -> GridConfig {
        self.inner.config
    }

    /// Stop the worker thread and release resources. Idempotent: a second
    /// call (or a call after the controller was already dropped elsewhere)
    /// is a no-op.
    pub fn stop(&self) {
        if self.inner.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        log::info!("mpp controller stopping");
        // Drop the sender so the worker's receive loop drains any buffered
        // jobs and then exits on disconnection (§9 Open Question 3).
        self.inner.sender.lock().unwrap().take();
        if let Some(handle) = self.inner.worker.lock().unwrap().take() {
            let _ = handle.join();
        }
    }

    fn submit(&self, command: Command, reply: Option<Sender<CommandOutput>>) -> Result<(), MppError> {
        command.validate(&self.inner.config).inspect_err(|err| {
            log::warn!("rejected {command:?}: {err}");
        })?;
        if self.inner.stopped.load(Ordering::SeqCst) {
            log::warn!("rejected {command:?}: controller stopped");
            return Err(MppError::ControllerStopped);
        }
        let guard = self.inner.sender.lock().unwrap();
        match guard.as_ref() {
            Some(sender) => sender
                .send(Job { command, reply })
                .map_err(|_| MppError::ControllerStopped),
            None => Err(MppError::ControllerStopped),
        }
    }

    fn submit_and_wait(&self, command: Command) -> Result<CommandOutput, MppError> {
        let (tx, rx) = mpsc::channel();
        self.submit(command, Some(tx))?;
        rx.recv().map_err(|_| MppError::ControllerStopped)
    }

    /// `Reset` — zero all flag planes (I1). Memory is untouched.
    pub fn reset(&self) -> Result<(), MppError> {
        self.submit(Command::Reset, None)
    }

    /// `LoadA` — latch the A-side operands for the next `store`.
    pub fn load_a(&self, addr: usize, read_flag: u8, op_s: u8) -> Result<(), MppError> {
        self.submit(Command::LoadA { addr, read_flag, op_s }, None)
    }

    /// `LoadB` — latch the B-side operands for the next `store`.
    pub fn load_b(&self, addr: usize, context_flag: u8, op_c: u8) -> Result<(), MppError> {
        self.submit(Command::LoadB { addr, context_flag, op_c }, None)
    }

    /// `Store` — apply the latched ALU operation across all PEs.
    pub fn store(&self, write_flag: u8, context_value: bool) -> Result<(), MppError> {
        self.submit(Command::Store { write_flag, context_value }, None)
    }

    /// `Recv64` — write the routing flag word for one chip.
    pub fn recv64(&self, chip: usize, value: u64) -> Result<(), MppError> {
        self.submit(Command::Recv64 { chip, value }, None)
    }

    /// `Send64` — read the routing flag word for one chip.
    pub fn send64(&self, chip: usize) -> Result<u64, MppError> {
        match self.submit_and_wait(Command::Send64 { chip })? {
            CommandOutput::Word(w) => Ok(w),
            other => unreachable!("Send64 produced {other:?}"),
        }
    }

    /// `SendBulk` — read the routing flag words for every chip, in order.
    pub fn send_bulk(&self) -> Result<Vec<u64>, MppError> {
        match self.submit_and_wait(Command::SendBulk)? {
            CommandOutput::Bulk(words) => Ok(words),
            other => unreachable!("SendBulk produced {other:?}"),
        }
    }

    /// `NewsN` — rotate the routing plane one row north (toroidal).
    pub fn news_n(&self) -> Result<(), MppError> {
        self.submit(Command::NewsN, None)
    }

    /// `NewsE` — rotate the routing plane one column east (toroidal).
    pub fn news_e(&self) -> Result<(), MppError> {
        self.submit(Command::NewsE, None)
    }

    /// `NewsW` — rotate the routing plane one column west (toroidal).
    pub fn news_w(&self) -> Result<(), MppError> {
        self.submit(Command::NewsW, None)
    }

    /// `NewsS` — rotate the routing plane one row south (toroidal).
    pub fn news_s(&self) -> Result<(), MppError> {
        self.submit(Command::NewsS, None)
    }

    /// `UnicastRecv` — set or clear exactly the PE bit at `(x, y)`.
    pub fn unicast_recv(&self, x: usize, y: usize, bit: bool) -> Result<(), MppError> {
        self.submit(Command::UnicastRecv { x, y, bit }, None)
    }

    /// `UnicastSend` — read the PE bit at `(x, y)`.
    pub fn unicast_send(&self, x: usize, y: usize) -> Result<bool, MppError> {
        match self.submit_and_wait(Command::UnicastSend { x, y })? {
            CommandOutput::Bit(b) => Ok(b),
            other => unreachable!("UnicastSend produced {other:?}"),
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            self.sender.lock().unwrap().take();
            if let Some(handle) = self.worker.lock().unwrap().take() {
                let _ = handle.join();
            }
        }
    }
}

fn run_worker(mut mpp: Mpp, router: Router, queue: Receiver<Job>) {
    for job in queue {
        let output = job.command.execute(&mut mpp, &router);
        if let Some(reply) = job.reply {
            // The submitter may have stopped waiting (it can't, with this
            // API — `submit_and_wait` always calls `recv`), but guard
            // against it anyway rather than panicking the worker on a
            // dropped receiver.
            let _ = reply.send(output);
        }
    }
    log::info!("mpp controller worker exiting");
}
