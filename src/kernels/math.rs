// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Math Module
//!
//! Unary transcendental kernels: `sin cos tan asin acos atan sinh cosh tanh exp log sqrt`.
//!
//! Implemented for `float32`, `float64`, `complex64` and `complex128`. The half
//! precision and `complex32` rows are declared without a CPU kernel, so calls that
//! land on them exactly are `NotImplemented`. Integer arguments promote to the
//! narrowest float that holds them exactly; 64-bit integers have none.

use crate::aliases::{KernelResult, Result};
use crate::enums::dtype::DType;
use crate::enums::error::KernelError;
use crate::enums::scalar::Scalar;
use crate::kernels::registry::{Gufunc, Kernel};
use crate::map_same;

const IMPLEMENTED: [DType; 4] = [DType::Float32, DType::Float64, DType::Complex64, DType::Complex128];
const UNIMPLEMENTED: [DType; 3] = [DType::Float16, DType::BFloat16, DType::Complex32];

pub(crate) fn unsupported(function: &str, args: &[Scalar]) -> KernelError {
    let types: Vec<&str> = args.iter().map(|a| a.dtype().name()).collect();
    KernelError::UnsupportedValue(format!("{function}({})", types.join(", ")))
}

macro_rules! unary_math {
    ($($name:ident => $method:ident),+ $(,)?) => {
        $(
            fn $name(args: &[Scalar], out: &mut [Scalar]) -> KernelResult {
                out[0] = map_same!(args[0]; Float32 | Float64 | Complex64 | Complex128 => |x| x.$method())
                    .ok_or_else(|| unsupported(stringify!($name), args))?;
                Ok(())
            }
        )+

        const UNARY: &[(&str, fn(&[Scalar], &mut [Scalar]) -> KernelResult)] = &[
            $((stringify!($name), $name)),+
        ];
    };
}

unary_math! {
    sin => sin,
    cos => cos,
    tan => tan,
    asin => asin,
    acos => acos,
    atan => atan,
    sinh => sinh,
    cosh => cosh,
    tanh => tanh,
    exp => exp,
    log => ln,
    sqrt => sqrt,
}

/// Gufuncs of this module.
pub(crate) fn gufuncs() -> Result<Vec<Gufunc>> {
    UNARY
        .iter()
        .map(|&(name, f)| {
            let mut g = Gufunc::new(name, "... * T -> ... * T")?;
            for d in UNIMPLEMENTED {
                g = g.unimplemented_row(&[d], &[d]);
            }
            for d in IMPLEMENTED {
                g = g.row(&[d], &[d], Kernel::Elementwise(f));
            }
            Ok(g)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::complex::Complex;

    #[test]
    fn test_real_and_complex() {
        let mut out = [Scalar::Float64(0.0)];
        sqrt(&[Scalar::Float64(9.0)], &mut out).unwrap();
        assert_eq!(out[0], Scalar::Float64(3.0));

        let mut out = [Scalar::Complex128(Complex::new(0.0, 0.0))];
        exp(&[Scalar::Complex128(Complex::new(0.0, 0.0))], &mut out).unwrap();
        assert_eq!(out[0], Scalar::Complex128(Complex::new(1.0, 0.0)));
    }

    #[test]
    fn test_log_is_natural() {
        let mut out = [Scalar::Float32(0.0)];
        log(&[Scalar::Float32(1.0)], &mut out).unwrap();
        assert_eq!(out[0], Scalar::Float32(0.0));
    }

    #[test]
    fn test_uncovered_variant() {
        let mut out = [Scalar::Int64(0)];
        assert!(matches!(
            sin(&[Scalar::Int64(1)], &mut out),
            Err(KernelError::UnsupportedValue(_))
        ));
    }

    #[test]
    fn test_row_layout() {
        let all = gufuncs().unwrap();
        assert_eq!(all.len(), 12);
        let sin = &all[0];
        assert_eq!(sin.rows().iter().filter(|r| r.kernel.is_none()).count(), 3);
    }
}
