// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # **Bitmask Module** - *Packed Validity Mask*
//!
//! Packed validity bitmask with 64-byte alignment.
//!
//! ## Purpose
//! - Null channel for optional arrays (1 = valid, 0 = null).
//!
//! ## Behaviour
//! - LSB corresponds to the first physical element of the data buffer.
//! - Trailing padding bits are always masked off.

use std::fmt::{Debug, Formatter, Result as FmtResult};

use vec64::Vec64;

/// # Bitmask
///
/// 64-byte–aligned packed bitmask.
///
/// Bits are indexed by the physical position in the data buffer they guard,
/// so strided and reversed views share one mask with their base.
///
/// # Example
/// ```rust
/// use ndufunc::Bitmask;
///
/// let mut m = Bitmask::new_set_all(10, true);
/// m.set(3, false);
/// assert!(!m.get(3) && m.get(4));
/// assert_eq!(m.count_zeros(), 1);
/// ```
#[derive(Clone)]
pub struct Bitmask {
    bits: Vec64<u8>,
    len: usize,
}

impl Bitmask {
    /// Create new mask, length = `len`, all bits set if `set` else cleared.
    #[inline]
    pub fn new_set_all(len: usize, set: bool) -> Self {
        let n_bytes = (len + 7) / 8;
        let mut data = Vec64::with_capacity(n_bytes);
        let fill = if set { 0xFF } else { 0 };
        data.resize(n_bytes, fill);
        let mut mask = Self { bits: data, len };
        mask.mask_trailing_bits();
        mask
    }

    /// Builds a mask from one flag per element.
    pub fn from_bools(flags: &[bool]) -> Self {
        let mut mask = Self::new_set_all(flags.len(), false);
        for (i, &valid) in flags.iter().enumerate() {
            if valid {
                mask.set(i, true);
            }
        }
        mask
    }

    /// Ensures all unused bits above self.len are zeroed.
    #[inline]
    fn mask_trailing_bits(&mut self) {
        if self.len == 0 || (self.len & 7) == 0 {
            return;
        }
        let last = self.bits.len() - 1;
        let mask = (1u8 << (self.len & 7)) - 1;
        self.bits[last] &= mask;
    }

    /// Returns the logical length of the bitmask
    ///
    /// *Excludes padding*
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns bit `idx`. Out of range bits read as `false`.
    #[inline]
    pub fn get(&self, idx: usize) -> bool {
        if idx >= self.len {
            return false;
        }
        (self.bits[idx >> 3] >> (idx & 7)) & 1 != 0
    }

    /// Set or clear bit at index `i`, growing the mask when `i` is past the end.
    #[inline]
    pub fn set(&mut self, i: usize, value: bool) {
        if i >= self.len {
            self.len = i + 1;
            self.bits.resize((self.len + 7) / 8, 0);
        }
        let byte = &mut self.bits[i >> 3];
        let bit = 1u8 << (i & 7);
        if value {
            *byte |= bit;
        } else {
            *byte &= !bit;
        }
    }

    /// Number of set bits.
    #[inline]
    pub fn count_ones(&self) -> usize {
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Number of cleared bits within the logical length.
    #[inline]
    pub fn count_zeros(&self) -> usize {
        self.len - self.count_ones()
    }

    /// Returns true if all bits set (i.e. no nulls).
    #[inline]
    pub fn all_set(&self) -> bool {
        self.count_ones() == self.len
    }

    /// Returns a ref slice to the raw u8 bytes
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }
}

impl PartialEq for Bitmask {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.as_bytes() == other.as_bytes()
    }
}

impl Debug for Bitmask {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "Bitmask(len={}, bits=[", self.len)?;
        for i in 0..self.len {
            f.write_str(if self.get(i) { "1" } else { "0" })?;
        }
        f.write_str("])")
    }
}
