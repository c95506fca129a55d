// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Comparison Module
//!
//! Elementwise comparisons producing `bool`, for every dtype.
//!
//! Complex values order lexicographically by real then imaginary part.
//! `equaln` treats NaN as equal to NaN; for complex values each part is compared
//! on its own, so `(nan, 1.2)` equals `(nan, 1.2)` but not `(nan, nan)`.

use num_traits::Float;

use crate::aliases::{KernelResult, Result};
use crate::enums::dtype::DType;
use crate::enums::scalar::Scalar;
use crate::kernels::math::unsupported;
use crate::kernels::registry::{Gufunc, Kernel};
use crate::zip_to;

macro_rules! ordering {
    ($($name:ident => $op:tt);+ $(;)?) => {
        $(
            fn $name(args: &[Scalar], out: &mut [Scalar]) -> KernelResult {
                let (a, b) = (args[0], args[1]);
                out[0] = zip_to!(a, b, Scalar::Bool;
                    Bool | Int8 | Int16 | Int32 | Int64 | UInt8 | UInt16 | UInt32 | UInt64
                    | BFloat16 | Float16 | Float32 | Float64 => |x, y| x $op y)
                    .or_else(|| zip_to!(a, b, Scalar::Bool;
                        Complex32 | Complex64 | Complex128 => |x, y| (x.re, x.im) $op (y.re, y.im)))
                    .ok_or_else(|| unsupported(stringify!($name), args))?;
                Ok(())
            }
        )+
    };
}

ordering! {
    equal => ==;
    not_equal => !=;
    less => <;
    less_equal => <=;
    greater => >;
    greater_equal => >=;
}

#[inline]
fn same_or_nan<T: Float>(x: T, y: T) -> bool {
    x == y || (x.is_nan() && y.is_nan())
}

fn equaln(args: &[Scalar], out: &mut [Scalar]) -> KernelResult {
    let (a, b) = (args[0], args[1]);
    out[0] = zip_to!(a, b, Scalar::Bool;
        Bool | Int8 | Int16 | Int32 | Int64 | UInt8 | UInt16 | UInt32 | UInt64 => |x, y| x == y)
        .or_else(|| zip_to!(a, b, Scalar::Bool; BFloat16 | Float16 | Float32 | Float64 => |x, y| same_or_nan(x, y)))
        .or_else(|| zip_to!(a, b, Scalar::Bool; Complex32 | Complex64 | Complex128 => |x, y| x.eq_nan(&y)))
        .ok_or_else(|| unsupported("equaln", args))?;
    Ok(())
}

/// Gufuncs of this module.
pub(crate) fn gufuncs() -> Result<Vec<Gufunc>> {
    let table: [(&str, fn(&[Scalar], &mut [Scalar]) -> KernelResult); 7] = [
        ("equal", equal),
        ("not_equal", not_equal),
        ("less", less),
        ("less_equal", less_equal),
        ("greater", greater),
        ("greater_equal", greater_equal),
        ("equaln", equaln),
    ];
    table
        .into_iter()
        .map(|(name, f)| {
            let mut g = Gufunc::new(name, "... * T, ... * T -> ... * bool")?;
            for d in DType::ALL {
                g = g.row(&[d, d], &[DType::Bool], Kernel::Elementwise(f));
            }
            Ok(g)
        })
        .collect()
}
