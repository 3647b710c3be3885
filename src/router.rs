//! The 2-D toroidal NEWS router over the routing flag plane (flag 63).
//!
//! Mirrors `original_source/mpp_chip_cc.h`'s `Router`: a thin view over an
//! `Mpp`'s chip-group-addressed routing words, holding nothing but the grid
//! dimensions. All four rotations wrap around (toroidal); `rotate_e`/
//! `rotate_w` additionally carry a single bit across the word boundary
//! between adjacent 64-PE groups in the same row.

use crate::error::MppError;
use crate::mpp::Mpp;

/// A NEWS router bound to one `Mpp`'s routing plane and a `width × height` grid.
#[derive(Debug, Clone, Copy)]
pub struct Router {
    width: usize,
    height: usize,
    width64: usize,
}

impl Router {
    /// Bind a router to `mpp`'s grid. Validates `width % 64 == 0` and that
    /// `width * height` equals `mpp.total_cores()` (I3).
    pub fn new(mpp: &Mpp, width: usize, height: usize) -> Result<Self, MppError> {
        if width == 0 || height == 0 {
            return Err(MppError::Config {
                reason: "width and height must be positive",
            });
        }
        if width % 64 != 0 {
            return Err(MppError::Config {
                reason: "WIDTH must be a multiple of 64",
            });
        }
        let total = width
            .checked_mul(height)
            .ok_or(MppError::Config { reason: "WIDTH*HEIGHT overflows" })?;
        if total != mpp.total_cores() {
            return Err(MppError::Config {
                reason: "WIDTH*HEIGHT must equal the bound MPP's total PE count",
            });
        }
        Ok(Router {
            width,
            height,
            width64: width / 64,
        })
    }

    /// Grid width in PEs.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height in PEs.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Chip-group id for the 64-PE word containing `x`'s column in row `y`.
    #[inline]
    fn group(&self, x_word: usize, y: usize) -> usize {
        x_word + y * self.width64
    }

    /// Rotate the routing plane one row north (toward lower y), wrapping row
    /// 0 to `height - 1`: `new_row[y] = old_row[(y + 1) % height]`.
    pub fn rotate_n(&self, mpp: &mut Mpp) {
        for xw in 0..self.width64 {
            let first = mpp.send(self.group(xw, 0));
            let mut p = self.group(xw, 0);
            for y in 1..self.height {
                let next_group = self.group(xw, y);
                let data = mpp.send(next_group);
                mpp.recv(p, data);
                p = next_group;
            }
            mpp.recv(p, first);
        }
    }

    /// Rotate the routing plane one row south (toward higher y), wrapping
    /// row `height - 1` to row 0: `new_row[y] = old_row[(y - 1) % height]`.
    pub fn rotate_s(&self, mpp: &mut Mpp) {
        for xw in 0..self.width64 {
            let mut carry = mpp.send(self.group(xw, self.height - 1));
            for y in 0..self.height {
                let p = self.group(xw, y);
                let current = mpp.send(p);
                mpp.recv(p, carry);
                carry = current;
            }
        }
    }

    /// Rotate the routing plane one column east (toward higher x), wrapping
    /// the row around: bit 63 of the highest-x word flows into bit 0 of the
    /// lowest-x word of the same row.
    pub fn rotate_e(&self, mpp: &mut Mpp) {
        for y in 0..self.height {
            let mut carry = mpp.send(self.group(self.width64 - 1, y)) >> 63;
            for xw in 0..self.width64 {
                let p = self.group(xw, y);
                let data = mpp.send(p);
                let next_carry = data >> 63;
                mpp.recv(p, (data << 1) | carry);
                carry = next_carry;
            }
        }
    }

    /// Rotate the routing plane one column west (toward lower x), wrapping
    /// the row around: bit 0 of the lowest-x word flows into bit 63 of the
    /// highest-x word of the same row.
    pub fn rotate_w(&self, mpp: &mut Mpp) {
        for y in 0..self.height {
            let first = mpp.send(self.group(0, y));
            let mut data = first;
            for xw in 0..self.width64 - 1 {
                let next = mpp.send(self.group(xw + 1, y));
                let carry = next & 0x1;
                mpp.recv(self.group(xw, y), (carry << 63) | (data >> 1));
                data = next;
            }
            let carry = first & 0x1;
            mpp.recv(self.group(self.width64 - 1, y), (carry << 63) | (data >> 1));
        }
    }

    /// Set (`bit = true`) or clear (`bit = false`) exactly the PE bit at
    /// `(x, y)` in the routing plane, leaving the other 63 bits of that word
    /// unchanged.
    pub fn unicast_recv(&self, mpp: &mut Mpp, x: usize, y: usize, bit: bool) {
        let p = self.group(x / 64, y);
        let mask = 1u64 << (x % 64);
        let data = mpp.send(p);
        let updated = if bit { data | mask } else { data & !mask };
        mpp.recv(p, updated);
    }

    /// Read the PE bit at `(x, y)` from the routing plane.
    pub fn unicast_send(&self, mpp: &Mpp, x: usize, y: usize) -> bool {
        let p = self.group(x / 64, y);
        let mask = 1u64 << (x % 64);
        mpp.send(p) & mask != 0
    }
}
