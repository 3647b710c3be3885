//! mpp-sim CLI
//!
//! Starts a controller over the canonical default grid, runs the "ALU as
//! COPY" scenario from spec.md §8, and prints the result. A smoke test for
//! the library, not a real front end — the command-submission surface is
//! the actual product (see `controller::Controller`).

use mpp_sim::alu::OP_F;
use mpp_sim::Controller;

fn main() {
    env_logger::init();

    println!("mpp-sim - bit-serial MPP array emulator");
    println!("========================================\n");

    let controller = Controller::new(2).expect("default grid is always valid");
    println!(
        "grid: {}x{} ({} chips of 64 PEs)",
        mpp_sim::DEFAULT_WIDTH,
        mpp_sim::DEFAULT_HEIGHT,
        mpp_sim::DEFAULT_N_CHIPS
    );

    controller.recv64(0, 0xDEAD_BEEF_CAFE_BABE).unwrap();
    controller.load_a(0, 63, 0).unwrap();
    controller.load_b(0, 0, OP_F).unwrap();
    controller.store(62, false).unwrap();

    let word = controller.send64(0).unwrap();
    println!("chip 0 routing word: {word:#018X}");

    controller.stop();
}
