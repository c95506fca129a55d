// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Type Unions Module
//!
//! Trait bounds tying Rust element types to their runtime [`DType`].

use std::fmt::Debug;

use half::{bf16, f16};
use vec64::Vec64;

use crate::enums::dtype::DType;
use crate::enums::scalar::Scalar;
use crate::structs::buffer::Buffer;
use crate::structs::complex::Complex;

/// Trait for types valid as array elements.
///
/// Useful when specifying `my_fn::<T: Element>() {}`.
///
/// Each implementor corresponds to exactly one [`DType`] and one [`Buffer`] variant.
pub trait Element: Copy + Default + PartialEq + Debug + Send + Sync + 'static {
    const DTYPE: DType;

    fn into_scalar(self) -> Scalar;

    /// Unwraps a scalar of exactly this dtype.
    fn from_scalar(value: Scalar) -> Option<Self>;

    fn into_buffer(values: Vec64<Self>) -> Buffer;

    /// Borrows the typed storage when `buffer` holds this dtype.
    fn slice(buffer: &Buffer) -> Option<&[Self]>;
}

macro_rules! impl_element {
    ($($t:ty => $variant:ident),+ $(,)?) => {
        $(
            impl Element for $t {
                const DTYPE: DType = DType::$variant;

                #[inline]
                fn into_scalar(self) -> Scalar {
                    Scalar::$variant(self)
                }

                #[inline]
                fn from_scalar(value: Scalar) -> Option<Self> {
                    match value {
                        Scalar::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                #[inline]
                fn into_buffer(values: Vec64<Self>) -> Buffer {
                    Buffer::$variant(values)
                }

                #[inline]
                fn slice(buffer: &Buffer) -> Option<&[Self]> {
                    match buffer {
                        Buffer::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }

            impl From<$t> for Scalar {
                #[inline]
                fn from(v: $t) -> Self {
                    Scalar::$variant(v)
                }
            }
        )+
    };
}

impl_element!(
    bool => Bool,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    bf16 => BFloat16,
    f16 => Float16,
    f32 => Float32,
    f64 => Float64,
    Complex<f16> => Complex32,
    Complex<f32> => Complex64,
    Complex<f64> => Complex128,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_dtypes() {
        assert_eq!(<u8 as Element>::DTYPE, DType::UInt8);
        assert_eq!(<Complex<f32> as Element>::DTYPE, DType::Complex64);
        assert_eq!(<bf16 as Element>::DTYPE, DType::BFloat16);
    }

    #[test]
    fn test_scalar_roundtrip() {
        let s = 7i16.into_scalar();
        assert_eq!(s, Scalar::Int16(7));
        assert_eq!(i16::from_scalar(s), Some(7));
        assert_eq!(i32::from_scalar(s), None);
    }
}
