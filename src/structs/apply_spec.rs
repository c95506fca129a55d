// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # ApplySpec Module
//!
//! Per-call dispatch plan summary: applicable strategies, number of outer
//! (broadcast) dimensions, arities and the concrete type of every argument.

use std::fmt::{Display, Formatter};

use crate::enums::strategy::{ApplyFlags, Strategy};
use crate::structs::ndt::Ndt;

/// # ApplySpec
///
/// Built fresh for every call by the plan builder and consumed by the driver.
///
/// `types` holds the inputs followed by the outputs, in call order.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplySpec {
    pub flags: ApplyFlags,
    pub outer_dims: usize,
    pub nin: usize,
    pub nout: usize,
    pub types: Vec<Ndt>,
}

impl ApplySpec {
    #[inline]
    pub fn nargs(&self) -> usize {
        self.nin + self.nout
    }

    /// Cheapest applicable strategy. A call without any dimensions is a single
    /// kernel invocation.
    pub fn strategy(&self) -> Strategy {
        if self.types.iter().all(|t| t.ndim() == 0) {
            return Strategy::Scalar;
        }
        Strategy::select(self.flags)
    }

    #[inline]
    pub fn inputs(&self) -> &[Ndt] {
        &self.types[..self.nin]
    }

    #[inline]
    pub fn outputs(&self) -> &[Ndt] {
        &self.types[self.nin..]
    }
}

impl Display for ApplySpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let types: Vec<String> = self.types.iter().map(|t| format!("'{t}'")).collect();
        write!(
            f,
            "ApplySpec(flags='{}', outer_dims={}, nin={}, nout={}, nargs={}, types=[{}])",
            self.flags,
            self.outer_dims,
            self.nin,
            self.nout,
            self.nargs(),
            types.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DType;

    #[test]
    fn test_display_and_strategy() {
        let spec = ApplySpec {
            flags: ApplyFlags::C | ApplyFlags::FORTRAN | ApplyFlags::STRIDED | ApplyFlags::XND,
            outer_dims: 0,
            nin: 1,
            nout: 1,
            types: vec![DType::UInt8.into(), DType::Float64.into()],
        };
        assert_eq!(spec.nargs(), 2);
        assert_eq!(spec.strategy(), Strategy::Scalar);
        assert_eq!(
            spec.to_string(),
            "ApplySpec(flags='C|Fortran|Strided|Xnd', outer_dims=0, nin=1, nout=1, nargs=2, types=['uint8', 'float64'])"
        );
    }
}
