// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Macros Module
//!
//! Pattern helpers for writing scalar kernels over the [`Scalar`](crate::Scalar)
//! variants. Each macro yields `Option<Scalar>`, `None` meaning the operand
//! variants are not covered by the listed arms.

/// Applies a unary closure-like body to the listed variants, keeping the variant.
///
/// ```rust
/// use ndufunc::{map_same, Scalar};
///
/// let r = map_same!(Scalar::Float64(4.0); Float32 | Float64 => |x| x.sqrt());
/// assert_eq!(r, Some(Scalar::Float64(2.0)));
/// ```
#[macro_export]
macro_rules! map_same {
    ($a:expr; $($v:ident)|+ => |$x:ident| $body:expr) => {
        match $a {
            $( $crate::Scalar::$v($x) => Some($crate::Scalar::$v($body)), )+
            #[allow(unreachable_patterns)]
            _ => None,
        }
    };
}

/// Applies a binary body when both operands hold the same listed variant,
/// producing that variant.
#[macro_export]
macro_rules! zip_same {
    ($a:expr, $b:expr; $($v:ident)|+ => |$x:ident, $y:ident| $body:expr) => {
        match ($a, $b) {
            $( ($crate::Scalar::$v($x), $crate::Scalar::$v($y)) => Some($crate::Scalar::$v($body)), )+
            #[allow(unreachable_patterns)]
            _ => None,
        }
    };
}

/// Like [`zip_same!`] but wraps the result with a fixed constructor, e.g.
/// `Scalar::Bool` for comparisons.
#[macro_export]
macro_rules! zip_to {
    ($a:expr, $b:expr, $out:path; $($v:ident)|+ => |$x:ident, $y:ident| $body:expr) => {
        match ($a, $b) {
            $( ($crate::Scalar::$v($x), $crate::Scalar::$v($y)) => Some($out($body)), )+
            #[allow(unreachable_patterns)]
            _ => None,
        }
    };
}
