// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Strategy Module
//!
//! Execution strategy tags attached to an [`ApplySpec`](crate::ApplySpec).
//!
//! [`ApplyFlags`] is the set of traversal strategies that are valid for a call.
//! [`Strategy`] is the single one the driver picks from it.

use std::fmt::{Display, Formatter};
use std::ops::{BitOr, BitOrAssign};

/// Set of applicable execution strategies.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct ApplyFlags(u8);

impl ApplyFlags {
    /// Outer loop over fully C-contiguous arguments with identical shapes.
    pub const OPT_Z: ApplyFlags = ApplyFlags(1 << 0);
    /// Outer loop over C-contiguous or zero-stride broadcast arguments.
    pub const OPT_C: ApplyFlags = ApplyFlags(1 << 1);
    /// Outer loop over fixed dimensions with arbitrary steps.
    pub const OPT_S: ApplyFlags = ApplyFlags(1 << 2);
    /// Inner parts are C-contiguous.
    pub const C: ApplyFlags = ApplyFlags(1 << 3);
    /// Inner parts are Fortran-contiguous.
    pub const FORTRAN: ApplyFlags = ApplyFlags(1 << 4);
    /// Inner parts are fixed dimensions.
    pub const STRIDED: ApplyFlags = ApplyFlags(1 << 5);
    /// Generic walk, valid for ragged data.
    pub const XND: ApplyFlags = ApplyFlags(1 << 6);

    pub const EMPTY: ApplyFlags = ApplyFlags(0);

    const NAMES: [(ApplyFlags, &'static str); 7] = [
        (Self::OPT_Z, "OptZ"),
        (Self::OPT_C, "OptC"),
        (Self::OPT_S, "OptS"),
        (Self::C, "C"),
        (Self::FORTRAN, "Fortran"),
        (Self::STRIDED, "Strided"),
        (Self::XND, "Xnd"),
    ];

    #[inline]
    pub fn contains(&self, other: ApplyFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn insert(&mut self, other: ApplyFlags) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn remove(&mut self, other: ApplyFlags) {
        self.0 &= !other.0;
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ApplyFlags {
    type Output = ApplyFlags;
    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        ApplyFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for ApplyFlags {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl Display for ApplyFlags {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        f.write_str(&names.join("|"))
    }
}

/// Traversal selected for one call, cheapest first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Strategy {
    /// No dimensions at all: one kernel invocation.
    Scalar,
    OptZ,
    OptC,
    OptS,
    C,
    Fortran,
    Strided,
    Xnd,
}

impl Strategy {
    /// Picks the cheapest strategy contained in `flags`.
    pub fn select(flags: ApplyFlags) -> Strategy {
        ApplyFlags::NAMES
            .iter()
            .zip([
                Strategy::OptZ,
                Strategy::OptC,
                Strategy::OptS,
                Strategy::C,
                Strategy::Fortran,
                Strategy::Strided,
                Strategy::Xnd,
            ])
            .find(|((flag, _), _)| flags.contains(*flag))
            .map(|(_, s)| s)
            .unwrap_or(Strategy::Xnd)
    }

    /// True for the strategies that walk a ragged index space.
    #[inline]
    pub fn is_ragged(&self) -> bool {
        matches!(self, Strategy::Xnd)
    }
}

impl Display for Strategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Strategy::Scalar => "Scalar",
            Strategy::OptZ => "OptZ",
            Strategy::OptC => "OptC",
            Strategy::OptS => "OptS",
            Strategy::C => "C",
            Strategy::Fortran => "Fortran",
            Strategy::Strided => "Strided",
            Strategy::Xnd => "Xnd",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_display() {
        let f = ApplyFlags::C | ApplyFlags::FORTRAN | ApplyFlags::STRIDED | ApplyFlags::XND;
        assert_eq!(f.to_string(), "C|Fortran|Strided|Xnd");
        assert_eq!(ApplyFlags::EMPTY.to_string(), "");
    }

    #[test]
    fn test_select_cheapest() {
        let mut f = ApplyFlags::OPT_S | ApplyFlags::C | ApplyFlags::XND;
        assert_eq!(Strategy::select(f), Strategy::OptS);
        f.remove(ApplyFlags::OPT_S);
        assert_eq!(Strategy::select(f), Strategy::C);
        assert_eq!(Strategy::select(ApplyFlags::XND), Strategy::Xnd);
    }
}
