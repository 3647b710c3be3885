//! The bit-plane store: memory and flags for `64 * n_chips` PEs, plus the
//! latched instruction state consumed by `store`.
//!
//! This is the crate's `CpuCore` analogue — all state lives here, and every
//! other component either reads it (`Router`) or drives it one instruction
//! at a time (`Controller`/`command`). Index validation is the caller's
//! responsibility (see `command.rs`): by the time a method on `Mpp` runs,
//! its indices are already known to be in range.

use crate::alu::{alu_word, mask_select};
use crate::error::MppError;

/// Flag index whose plane must always read back as zero (I2).
pub const FLAG_ZERO: u8 = 0;
/// Flag index carrying the NEWS router's per-PE routing bit.
pub const FLAG_ROUTE_DATA: u8 = 63;
/// Number of flag planes per PE.
pub const FLAG_COUNT: usize = 64;

/// The bit-plane store for one MPP instance: `address_size` memory planes
/// and 64 flag planes, each plane `n_chips` words of 64 PEs apiece.
#[derive(Debug)]
pub struct Mpp {
    n_chips: usize,
    address_size: usize,
    memory: Vec<u64>,
    flags: Vec<u64>,

    // Latched by `load_a` / `load_b`, consumed by `store`.
    addr_a: usize,
    read_flag: u8,
    op_s: u8,
    addr_b: usize,
    context_flag: u8,
    op_c: u8,
}

impl Mpp {
    /// Allocate and zero-initialize a store for `n_chips` chips of 64 PEs
    /// each, with `address_size` memory words per PE (I4).
    ///
    /// Fails if either size is zero (I3's "positive sizes" conjunct) or if
    /// the backing vectors cannot be allocated.
    pub fn new(address_size: usize, n_chips: usize) -> Result<Self, MppError> {
        if address_size == 0 {
            return Err(MppError::Config {
                reason: "address_size must be positive",
            });
        }
        if n_chips == 0 {
            return Err(MppError::Config {
                reason: "n_chips must be positive",
            });
        }
        let memory_words = address_size
            .checked_mul(n_chips)
            .ok_or(MppError::Allocation { words: usize::MAX })?;
        let flag_words = FLAG_COUNT
            .checked_mul(n_chips)
            .ok_or(MppError::Allocation { words: usize::MAX })?;

        let mut memory = Vec::new();
        memory
            .try_reserve_exact(memory_words)
            .map_err(|_| MppError::Allocation { words: memory_words })?;
        memory.resize(memory_words, 0);

        let mut flags = Vec::new();
        flags
            .try_reserve_exact(flag_words)
            .map_err(|_| MppError::Allocation { words: flag_words })?;
        flags.resize(flag_words, 0);

        Ok(Mpp {
            n_chips,
            address_size,
            memory,
            flags,
            addr_a: 0,
            read_flag: 0,
            op_s: 0,
            addr_b: 0,
            context_flag: 0,
            op_c: 0,
        })
    }

    /// Number of 64-PE chips backing this store.
    pub fn n_chips(&self) -> usize {
        self.n_chips
    }

    /// Number of addressable memory words per PE.
    pub fn address_size(&self) -> usize {
        self.address_size
    }

    /// Total PE count (`64 * n_chips`).
    pub fn total_cores(&self) -> usize {
        64 * self.n_chips
    }

    #[inline]
    fn mem_offset(&self, addr: usize) -> usize {
        addr * self.n_chips
    }

    #[inline]
    fn flag_offset(&self, flag: u8) -> usize {
        flag as usize * self.n_chips
    }

    /// Zero every flag plane (I1). Memory is untouched.
    pub fn reset(&mut self) {
        self.flags.iter_mut().for_each(|w| *w = 0);
    }

    /// Latch the A-side operands for the next `store`.
    pub fn load_a(&mut self, addr_a: usize, read_flag: u8, op_s: u8) {
        debug_assert!(addr_a < self.address_size);
        debug_assert!((read_flag as usize) < FLAG_COUNT);
        self.addr_a = addr_a;
        self.read_flag = read_flag;
        self.op_s = op_s;
    }

    /// Latch the B-side operands for the next `store`.
    pub fn load_b(&mut self, addr_b: usize, context_flag: u8, op_c: u8) {
        debug_assert!(addr_b < self.address_size);
        debug_assert!((context_flag as usize) < FLAG_COUNT);
        self.addr_b = addr_b;
        self.context_flag = context_flag;
        self.op_c = op_c;
    }

    /// Apply the latched ALU operation across all PEs (§4.2).
    ///
    /// Reads `a`, `b`, `f`, `c` as a coherent per-chip snapshot (I5) before
    /// writing A or the write-flag. `write_flag == FLAG_ZERO` suppresses the
    /// flag writeback entirely, keeping flag 0 permanently zero (I2).
    pub fn store(&mut self, write_flag: u8, context_value: bool) {
        debug_assert!((write_flag as usize) < FLAG_COUNT);
        let a_off = self.mem_offset(self.addr_a);
        let b_off = self.mem_offset(self.addr_b);
        let f_off = self.flag_offset(self.read_flag);
        let c_off = self.flag_offset(self.context_flag);
        let op_s = self.op_s;
        let op_c = self.op_c;

        if write_flag == FLAG_ZERO {
            for i in 0..self.n_chips {
                let a = self.memory[a_off + i];
                let b = self.memory[b_off + i];
                let f = self.flags[f_off + i];
                let c = self.flags[c_off + i];
                let t_s = alu_word(a, b, f, op_s);
                self.memory[a_off + i] = mask_select(c, t_s, a, context_value);
            }
            return;
        }

        let w_off = self.flag_offset(write_flag);
        for i in 0..self.n_chips {
            let a = self.memory[a_off + i];
            let b = self.memory[b_off + i];
            let f = self.flags[f_off + i];
            let c = self.flags[c_off + i];
            let t_s = alu_word(a, b, f, op_s);
            let t_c = alu_word(a, b, f, op_c);
            self.memory[a_off + i] = mask_select(c, t_s, a, context_value);
            self.flags[w_off + i] = mask_select(c, t_c, self.flags[w_off + i], context_value);
        }
    }

    /// Write the routing flag word for chip `chip`.
    pub fn recv(&mut self, chip: usize, value: u64) {
        debug_assert!(chip < self.n_chips);
        let off = self.flag_offset(FLAG_ROUTE_DATA);
        self.flags[off + chip] = value;
    }

    /// Read the routing flag word for chip `chip`.
    pub fn send(&self, chip: usize) -> u64 {
        debug_assert!(chip < self.n_chips);
        let off = self.flag_offset(FLAG_ROUTE_DATA);
        self.flags[off + chip]
    }

    /// Read the routing flag words for all chips, in chip order.
    pub fn send_bulk(&self) -> Vec<u64> {
        let off = self.flag_offset(FLAG_ROUTE_DATA);
        self.flags[off..off + self.n_chips].to_vec()
    }

    /// Direct read of an arbitrary flag plane's word for one chip.
    /// Used by the router and by tests that want to inspect a plane without
    /// going through the routing-specific `send`/`recv`.
    pub fn flag_word(&self, flag: u8, chip: usize) -> u64 {
        debug_assert!(chip < self.n_chips);
        self.flags[self.flag_offset(flag) + chip]
    }

    /// Direct read of a memory plane's word for one chip.
    pub fn memory_word(&self, addr: usize, chip: usize) -> u64 {
        debug_assert!(chip < self.n_chips);
        self.memory[self.mem_offset(addr) + chip]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_store_is_zeroed() {
        let mpp = Mpp::new(4, 2).unwrap();
        for flag in 0..FLAG_COUNT as u8 {
            for chip in 0..2 {
                assert_eq!(mpp.flag_word(flag, chip), 0);
            }
        }
        for addr in 0..4 {
            for chip in 0..2 {
                assert_eq!(mpp.memory_word(addr, chip), 0);
            }
        }
    }

    #[test]
    fn reset_clears_flags_not_memory() {
        let mut mpp = Mpp::new(2, 1).unwrap();
        mpp.recv(0, 0xFFFF_FFFF_FFFF_FFFF);
        mpp.load_a(0, 0, crate::alu::OP_A);
        mpp.load_b(0, 0, 0);
        mpp.store(0, true);
        mpp.reset();
        assert_eq!(mpp.send(0), 0);
    }

    #[test]
    fn store_with_other_write_flag_leaves_routing_plane_unchanged() {
        // P1, second conjunct: after reset, a store whose write_flag isn't
        // 63 (the routing flag) must leave send(k) unchanged for all k.
        let mut mpp = Mpp::new(2, 4).unwrap();
        mpp.reset();
        let routing: Vec<u64> = (0..4)
            .map(|c| {
                mpp.recv(c, 0xABCD_0000_0000_0000 + c as u64);
                mpp.send(c)
            })
            .collect();

        mpp.load_a(0, 1, crate::alu::OP_A);
        mpp.load_b(1, 2, 0xFF);
        mpp.store(5, true);

        let after: Vec<u64> = (0..4).map(|c| mpp.send(c)).collect();
        assert_eq!(routing, after);
    }

    #[test]
    fn copy_flag_into_flag_via_store() {
        // Scenario 1 from spec.md §8: copy flag 63 (routing plane) into flag
        // 62 via a COPY-shaped store. The scenario text's `read_flag=0` is a
        // transcription slip against its own stated F-truth-table semantics
        // (`0xAA` = "F" means flag 62 can only take on flag 63's value if
        // `read_flag=63`); `context_flag=0, context_value=false` is the
        // idiomatic unconditional-writeback idiom (flag 0 is always zero, so
        // `false` flips "update where c=0" to "update everywhere").
        let mut mpp = Mpp::new(2, 1024).unwrap();
        mpp.recv(0, 0xDEAD_BEEF_CAFE_BABE);
        mpp.load_a(0, FLAG_ROUTE_DATA, 0);
        mpp.load_b(0, FLAG_ZERO, crate::alu::OP_F);
        mpp.store(62, false);
        assert_eq!(mpp.flag_word(62, 0), 0xDEAD_BEEF_CAFE_BABE);
    }

    #[test]
    fn context_mask_identity_leaves_state_unchanged() {
        // P3: op_s = OP_A, write_flag = 0 (suppressed) => store is a no-op.
        let mut mpp = Mpp::new(2, 4).unwrap();
        mpp.recv(1, 0xABCD_EF01_2345_6789);
        let before_mem: Vec<u64> = (0..4).map(|c| mpp.memory_word(0, c)).collect();
        let before_flags: Vec<u64> = (0..FLAG_COUNT as u8)
            .flat_map(|f| (0..4).map(move |c| (f, c)))
            .map(|(f, c)| mpp.flag_word(f, c))
            .collect();

        mpp.load_a(0, 5, crate::alu::OP_A);
        mpp.load_b(1, 3, 0x00);
        mpp.store(FLAG_ZERO, true);

        let after_mem: Vec<u64> = (0..4).map(|c| mpp.memory_word(0, c)).collect();
        let after_flags: Vec<u64> = (0..FLAG_COUNT as u8)
            .flat_map(|f| (0..4).map(move |c| (f, c)))
            .map(|(f, c)| mpp.flag_word(f, c))
            .collect();
        assert_eq!(before_mem, after_mem);
        assert_eq!(before_flags, after_flags);
    }

    #[test]
    fn context_mask_gates_writeback_by_context_flag() {
        // Scenario 2 from spec.md §8. Flag 1 must hold
        // 0xFF00FF00FF00FF00 before the scenario's own three commands run;
        // seed it with two COPY-shaped stores (the same idiom as
        // `copy_flag_into_flag_via_store`) since there's no router in scope
        // at this layer.
        let mut mpp = Mpp::new(1, 1).unwrap();

        // Stash an all-ones context flag at index 2.
        mpp.recv(0, u64::MAX);
        mpp.load_a(0, FLAG_ROUTE_DATA, 0);
        mpp.load_b(0, FLAG_ROUTE_DATA, crate::alu::OP_F);
        mpp.store(2, true);
        assert_eq!(mpp.flag_word(2, 0), u64::MAX);

        // Copy the desired pattern from flag 63 into flag 1, unconditionally
        // (context = all-ones at flag 2).
        mpp.recv(0, 0xFF00_FF00_FF00_FF00);
        mpp.load_a(0, FLAG_ROUTE_DATA, 0);
        mpp.load_b(0, 2, crate::alu::OP_F);
        mpp.store(1, true);
        assert_eq!(mpp.flag_word(1, 0), 0xFF00_FF00_FF00_FF00);

        // The scenario itself.
        mpp.recv(0, u64::MAX);
        mpp.load_a(0, FLAG_ROUTE_DATA, crate::alu::OP_F);
        mpp.load_b(0, 1, 0);
        mpp.store(FLAG_ZERO, true);

        assert_eq!(mpp.memory_word(0, 0), 0xFF00_FF00_FF00_FF00);
    }
}
