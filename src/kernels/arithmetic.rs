// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Arithmetic Module
//!
//! Elementwise arithmetic kernels and their dtype rows.
//!
//! ## Functions
//! - `negative`, `copy`
//! - `add`, `subtract`, `multiply`: integers wrap on overflow
//! - `divide`: true division; 64-bit integer rows produce `float64`
//! - `bitwise_and`, `bitwise_or`, `bitwise_xor` over `bool` and integers
//! - `minimum`, `maximum`: NaN propagating, no complex rows
//! - `divmod`: floor division and remainder with the sign of the divisor
//!
//! Half precision and `complex32` rows are declared without a CPU kernel.

use num_traits::{Float, PrimInt};

use crate::aliases::{KernelResult, Result};
use crate::enums::dtype::DType;
use crate::enums::error::KernelError;
use crate::enums::scalar::Scalar;
use crate::kernels::math::unsupported;
use crate::kernels::registry::{Gufunc, Kernel};
use crate::{map_same, zip_same};

use DType::*;

pub(crate) const INTEGERS: [DType; 8] = [Int8, Int16, Int32, Int64, UInt8, UInt16, UInt32, UInt64];
pub(crate) const SIGNED: [DType; 4] = [Int8, Int16, Int32, Int64];
pub(crate) const INEXACT: [DType; 4] = [Float32, Float64, Complex64, Complex128];
pub(crate) const HALF: [DType; 3] = [Float16, BFloat16, Complex32];

const BINARY: &str = "... * T, ... * T -> ... * T";
const UNARY: &str = "... * T -> ... * T";

fn negative(args: &[Scalar], out: &mut [Scalar]) -> KernelResult {
    out[0] = map_same!(args[0]; Int8 | Int16 | Int32 | Int64 => |x| x.wrapping_neg())
        .or_else(|| map_same!(args[0]; Float32 | Float64 | Complex64 | Complex128 => |x| -x))
        .ok_or_else(|| unsupported("negative", args))?;
    Ok(())
}

fn copy(args: &[Scalar], out: &mut [Scalar]) -> KernelResult {
    out[0] = args[0];
    Ok(())
}

macro_rules! wrapping_binary {
    ($($name:ident => $int:ident, $op:tt);+ $(;)?) => {
        $(
            fn $name(args: &[Scalar], out: &mut [Scalar]) -> KernelResult {
                let (a, b) = (args[0], args[1]);
                out[0] = zip_same!(a, b; Int8 | Int16 | Int32 | Int64 | UInt8 | UInt16 | UInt32 | UInt64 => |x, y| x.$int(y))
                    .or_else(|| zip_same!(a, b; Float32 | Float64 | Complex64 | Complex128 => |x, y| x $op y))
                    .ok_or_else(|| unsupported(stringify!($name), args))?;
                Ok(())
            }
        )+
    };
}

wrapping_binary! {
    add => wrapping_add, +;
    subtract => wrapping_sub, -;
    multiply => wrapping_mul, *;
}

fn divide(args: &[Scalar], out: &mut [Scalar]) -> KernelResult {
    let (a, b) = (args[0], args[1]);
    out[0] = match (a, b) {
        (Scalar::Int64(x), Scalar::Int64(y)) => Scalar::Float64(x as f64 / y as f64),
        (Scalar::UInt64(x), Scalar::UInt64(y)) => Scalar::Float64(x as f64 / y as f64),
        _ => zip_same!(a, b; Float32 | Float64 | Complex64 | Complex128 => |x, y| x / y)
            .ok_or_else(|| unsupported("divide", args))?,
    };
    Ok(())
}

macro_rules! bitwise {
    ($($name:ident => $op:tt);+ $(;)?) => {
        $(
            fn $name(args: &[Scalar], out: &mut [Scalar]) -> KernelResult {
                out[0] = zip_same!(args[0], args[1];
                    Bool | Int8 | Int16 | Int32 | Int64 | UInt8 | UInt16 | UInt32 | UInt64 => |x, y| x $op y)
                    .ok_or_else(|| unsupported(stringify!($name), args))?;
                Ok(())
            }
        )+
    };
}

bitwise! {
    bitwise_and => &;
    bitwise_or => |;
    bitwise_xor => ^;
}

#[inline]
fn nan_min<T: Float>(x: T, y: T) -> T {
    if x.is_nan() || y.is_nan() { T::nan() } else { x.min(y) }
}

#[inline]
fn nan_max<T: Float>(x: T, y: T) -> T {
    if x.is_nan() || y.is_nan() { T::nan() } else { x.max(y) }
}

fn minimum(args: &[Scalar], out: &mut [Scalar]) -> KernelResult {
    let (a, b) = (args[0], args[1]);
    out[0] = zip_same!(a, b; Int8 | Int16 | Int32 | Int64 | UInt8 | UInt16 | UInt32 | UInt64 => |x, y| x.min(y))
        .or_else(|| zip_same!(a, b; Float32 | Float64 => |x, y| nan_min(x, y)))
        .ok_or_else(|| unsupported("minimum", args))?;
    Ok(())
}

fn maximum(args: &[Scalar], out: &mut [Scalar]) -> KernelResult {
    let (a, b) = (args[0], args[1]);
    out[0] = zip_same!(a, b; Int8 | Int16 | Int32 | Int64 | UInt8 | UInt16 | UInt32 | UInt64 => |x, y| x.max(y))
        .or_else(|| zip_same!(a, b; Float32 | Float64 => |x, y| nan_max(x, y)))
        .ok_or_else(|| unsupported("maximum", args))?;
    Ok(())
}

/// Floor division and remainder. The remainder takes the sign of the divisor.
fn int_divmod<T: PrimInt>(a: T, b: T) -> std::result::Result<(T, T), KernelError> {
    if b == T::zero() {
        return Err(KernelError::DivisionByZero);
    }
    // MIN / -1 wraps
    let Some(mut q) = a.checked_div(&b) else {
        return Ok((a, T::zero()));
    };
    let mut r = a % b;
    if r != T::zero() && (r < T::zero()) != (b < T::zero()) {
        r = r + b;
        q = q - T::one();
    }
    Ok((q, r))
}

fn float_divmod<T: Float>(a: T, b: T) -> std::result::Result<(T, T), KernelError> {
    if b == T::zero() {
        return Err(KernelError::DivisionByZero);
    }
    let mut r = a % b;
    if r != T::zero() && (r < T::zero()) != (b < T::zero()) {
        r = r + b;
    }
    Ok((((a - r) / b).round(), r))
}

macro_rules! divmod_arms {
    ($a:expr, $b:expr, $args:expr; $($v:ident => $f:ident),+ $(,)?) => {
        match ($a, $b) {
            $(
                (Scalar::$v(x), Scalar::$v(y)) => {
                    let (q, r) = $f(x, y)?;
                    (Scalar::$v(q), Scalar::$v(r))
                }
            )+
            _ => return Err(unsupported("divmod", $args)),
        }
    };
}

fn divmod(args: &[Scalar], out: &mut [Scalar]) -> KernelResult {
    let (q, r) = divmod_arms!(args[0], args[1], args;
        Int8 => int_divmod,
        Int16 => int_divmod,
        Int32 => int_divmod,
        Int64 => int_divmod,
        UInt8 => int_divmod,
        UInt16 => int_divmod,
        UInt32 => int_divmod,
        UInt64 => int_divmod,
        Float32 => float_divmod,
        Float64 => float_divmod,
    );
    out[0] = q;
    out[1] = r;
    Ok(())
}

fn same_rows(mut g: Gufunc, arity: usize, dtypes: &[DType], f: fn(&[Scalar], &mut [Scalar]) -> KernelResult) -> Gufunc {
    for &d in dtypes {
        g = g.row(&vec![d; arity], &[d], Kernel::Elementwise(f));
    }
    g
}

fn half_rows(mut g: Gufunc, arity: usize, dtypes: &[DType]) -> Gufunc {
    for &d in dtypes {
        g = g.unimplemented_row(&vec![d; arity], &[d]);
    }
    g
}

/// Gufuncs of this module.
pub(crate) fn gufuncs() -> Result<Vec<Gufunc>> {
    let mut all = Vec::new();

    let g = same_rows(Gufunc::new("negative", UNARY)?, 1, &SIGNED, negative);
    let g = same_rows(g, 1, &INEXACT, negative);
    all.push(half_rows(g, 1, &HALF));

    all.push(same_rows(Gufunc::new("copy", UNARY)?, 1, &DType::ALL, copy));

    for (name, f) in [("add", add as fn(&[Scalar], &mut [Scalar]) -> KernelResult), ("subtract", subtract), ("multiply", multiply)] {
        let g = same_rows(Gufunc::new(name, BINARY)?, 2, &INTEGERS, f);
        let g = same_rows(g, 2, &INEXACT, f);
        all.push(half_rows(g, 2, &HALF));
    }

    let g = same_rows(Gufunc::new("divide", BINARY)?, 2, &INEXACT, divide)
        .row(&[Int64, Int64], &[Float64], Kernel::Elementwise(divide))
        .row(&[UInt64, UInt64], &[Float64], Kernel::Elementwise(divide));
    all.push(half_rows(g, 2, &HALF));

    let logical = [&[Bool][..], &INTEGERS[..]].concat();
    for (name, f) in [
        ("bitwise_and", bitwise_and as fn(&[Scalar], &mut [Scalar]) -> KernelResult),
        ("bitwise_or", bitwise_or),
        ("bitwise_xor", bitwise_xor),
    ] {
        all.push(same_rows(Gufunc::new(name, BINARY)?, 2, &logical, f));
    }

    for (name, f) in [("minimum", minimum as fn(&[Scalar], &mut [Scalar]) -> KernelResult), ("maximum", maximum)] {
        let g = same_rows(Gufunc::new(name, BINARY)?, 2, &INTEGERS, f);
        let g = same_rows(g, 2, &[Float32, Float64], f);
        all.push(half_rows(g, 2, &[Float16, BFloat16]));
    }

    let mut g = Gufunc::new("divmod", "... * T, ... * T -> ... * T, ... * T")?;
    for d in INTEGERS.iter().chain(&[Float32, Float64]) {
        g = g.row(&[*d, *d], &[*d, *d], Kernel::Elementwise(divmod));
    }
    all.push(g);

    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn call2(f: fn(&[Scalar], &mut [Scalar]) -> KernelResult, a: Scalar, b: Scalar) -> Scalar {
        let mut out = [Scalar::zero(a.dtype())];
        f(&[a, b], &mut out).unwrap();
        out[0]
    }

    #[test]
    fn test_wrapping_integers() {
        assert_eq!(call2(add, Scalar::Int8(127), Scalar::Int8(1)), Scalar::Int8(-128));
        assert_eq!(call2(subtract, Scalar::UInt8(0), Scalar::UInt8(1)), Scalar::UInt8(255));
    }

    #[test]
    fn test_divide_int_rows() {
        let mut out = [Scalar::Float64(0.0)];
        divide(&[Scalar::Int64(7), Scalar::Int64(2)], &mut out).unwrap();
        assert_eq!(out[0], Scalar::Float64(3.5));
    }

    #[test]
    fn test_nan_propagating_min() {
        let r = call2(minimum, Scalar::Float64(f64::NAN), Scalar::Float64(1.0));
        assert!(r.is_nan());
        assert_eq!(call2(maximum, Scalar::Int32(-4), Scalar::Int32(2)), Scalar::Int32(2));
    }

    #[rstest]
    #[case(10, 7, 1, 3)]
    #[case(-7, 2, -4, 1)]
    #[case(7, -2, -4, -1)]
    #[case(-7, -2, 3, -1)]
    #[case(i64::MIN, -1, i64::MIN, 0)]
    fn test_int_divmod(#[case] a: i64, #[case] b: i64, #[case] q: i64, #[case] r: i64) {
        assert_eq!(int_divmod(a, b).unwrap(), (q, r));
    }

    #[test]
    fn test_float_divmod() {
        assert_eq!(float_divmod(-7.5f64, 2.0).unwrap(), (-4.0, 0.5));
        assert_eq!(float_divmod(1.0f64, 0.0), Err(KernelError::DivisionByZero));
        assert_eq!(int_divmod(1u8, 0), Err(KernelError::DivisionByZero));
    }

    #[test]
    fn test_bitwise_bool() {
        assert_eq!(call2(bitwise_xor, Scalar::Bool(true), Scalar::Bool(true)), Scalar::Bool(false));
        assert_eq!(call2(bitwise_or, Scalar::UInt16(0b01), Scalar::UInt16(0b10)), Scalar::UInt16(0b11));
    }
}
