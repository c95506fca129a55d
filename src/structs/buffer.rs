// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # **Buffer** - *Dtype-tagged element storage*
//!
//! Backs every [`NdArray`](crate::NdArray). One variant per [`DType`], each holding a
//! 64-byte aligned [`Vec64`].
//!
//! ## Behaviour
//! - Physical storage only: shape, strides and the logical origin live on the array type.
//! - Element access goes through [`Scalar`], so the dispatch layer can read and write
//!   any dtype without monomorphising per call site.

use std::fmt::{Debug, Formatter};

use half::{bf16, f16};
use vec64::Vec64;

use crate::enums::dtype::DType;
use crate::enums::scalar::Scalar;
use crate::structs::complex::Complex;
use crate::traits::type_unions::Element;

/// Dtype-tagged owned storage.
#[derive(Clone)]
pub enum Buffer {
    Bool(Vec64<bool>),
    Int8(Vec64<i8>),
    Int16(Vec64<i16>),
    Int32(Vec64<i32>),
    Int64(Vec64<i64>),
    UInt8(Vec64<u8>),
    UInt16(Vec64<u16>),
    UInt32(Vec64<u32>),
    UInt64(Vec64<u64>),
    BFloat16(Vec64<bf16>),
    Float16(Vec64<f16>),
    Float32(Vec64<f32>),
    Float64(Vec64<f64>),
    Complex32(Vec64<Complex<f16>>),
    Complex64(Vec64<Complex<f32>>),
    Complex128(Vec64<Complex<f64>>),
}

/// Expands `$body` once per variant with `$v` bound to the inner `Vec64`.
macro_rules! each_buffer {
    ($buf:expr, $v:ident => $body:expr) => {
        match $buf {
            Buffer::Bool($v) => $body,
            Buffer::Int8($v) => $body,
            Buffer::Int16($v) => $body,
            Buffer::Int32($v) => $body,
            Buffer::Int64($v) => $body,
            Buffer::UInt8($v) => $body,
            Buffer::UInt16($v) => $body,
            Buffer::UInt32($v) => $body,
            Buffer::UInt64($v) => $body,
            Buffer::BFloat16($v) => $body,
            Buffer::Float16($v) => $body,
            Buffer::Float32($v) => $body,
            Buffer::Float64($v) => $body,
            Buffer::Complex32($v) => $body,
            Buffer::Complex64($v) => $body,
            Buffer::Complex128($v) => $body,
        }
    };
}

fn filled<T: Element>(len: usize) -> Buffer {
    let mut v = Vec64::with_capacity(len);
    v.resize(len, T::default());
    T::into_buffer(v)
}

#[inline]
fn store<T: Element>(slot: &mut T, value: Scalar) {
    if let Some(x) = T::from_scalar(value.cast(T::DTYPE)) {
        *slot = x;
    }
}

impl Buffer {
    /// Zero-initialised buffer of `len` elements.
    pub fn zeros(dtype: DType, len: usize) -> Buffer {
        match dtype {
            DType::Bool => filled::<bool>(len),
            DType::Int8 => filled::<i8>(len),
            DType::Int16 => filled::<i16>(len),
            DType::Int32 => filled::<i32>(len),
            DType::Int64 => filled::<i64>(len),
            DType::UInt8 => filled::<u8>(len),
            DType::UInt16 => filled::<u16>(len),
            DType::UInt32 => filled::<u32>(len),
            DType::UInt64 => filled::<u64>(len),
            DType::BFloat16 => filled::<bf16>(len),
            DType::Float16 => filled::<f16>(len),
            DType::Float32 => filled::<f32>(len),
            DType::Float64 => filled::<f64>(len),
            DType::Complex32 => filled::<Complex<f16>>(len),
            DType::Complex64 => filled::<Complex<f32>>(len),
            DType::Complex128 => filled::<Complex<f64>>(len),
        }
    }

    /// Builds a buffer of `dtype` from scalars, casting each by convention.
    pub fn from_scalars(dtype: DType, values: &[Scalar]) -> Buffer {
        let mut buf = Buffer::zeros(dtype, values.len());
        for (i, v) in values.iter().enumerate() {
            buf.set(i, *v);
        }
        buf
    }

    #[inline]
    pub fn from_vec<T: Element>(values: Vec<T>) -> Buffer {
        T::into_buffer(Vec64::from(values))
    }

    pub fn dtype(&self) -> DType {
        match self {
            Buffer::Bool(_) => DType::Bool,
            Buffer::Int8(_) => DType::Int8,
            Buffer::Int16(_) => DType::Int16,
            Buffer::Int32(_) => DType::Int32,
            Buffer::Int64(_) => DType::Int64,
            Buffer::UInt8(_) => DType::UInt8,
            Buffer::UInt16(_) => DType::UInt16,
            Buffer::UInt32(_) => DType::UInt32,
            Buffer::UInt64(_) => DType::UInt64,
            Buffer::BFloat16(_) => DType::BFloat16,
            Buffer::Float16(_) => DType::Float16,
            Buffer::Float32(_) => DType::Float32,
            Buffer::Float64(_) => DType::Float64,
            Buffer::Complex32(_) => DType::Complex32,
            Buffer::Complex64(_) => DType::Complex64,
            Buffer::Complex128(_) => DType::Complex128,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        each_buffer!(self, v => v.len())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at physical position `i`.
    #[inline]
    pub fn get(&self, i: usize) -> Option<Scalar> {
        each_buffer!(self, v => v.get(i).map(|&x| x.into_scalar()))
    }

    /// Writes `value` at physical position `i`, converting it into the buffer dtype.
    /// Out of range writes are ignored.
    #[inline]
    pub fn set(&mut self, i: usize, value: Scalar) {
        each_buffer!(self, v => {
            if let Some(slot) = v.get_mut(i) {
                store(slot, value);
            }
        })
    }

    /// Typed view of the storage.
    #[inline]
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        T::slice(self)
    }
}

impl PartialEq for Buffer {
    fn eq(&self, other: &Self) -> bool {
        self.dtype() == other.dtype()
            && self.len() == other.len()
            && (0..self.len()).all(|i| self.get(i) == other.get(i))
    }
}

impl Debug for Buffer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        each_buffer!(self, v => f.debug_tuple("Buffer").field(&&v[..]).finish())
    }
}
