// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # **NdArray Module** - *Typed Strided And Ragged Arrays*
//!
//! An [`NdArray`] pairs a concrete [`Ndt`] with dtype-tagged storage.
//!
//! ## Layout
//! - Fixed dimensions address `offset + Σ index[i] * step[i]` in the data buffer, so
//!   reversed, strided and Fortran-order views need no copies.
//! - Ragged (`var`) dimensions address the leaf data through their offset arrays.
//! - Optional dtypes carry a [`Bitmask`] indexed by physical position (1 = valid).
//!   A missing mask means every element is valid.
//!
//! ## Example
//! ```rust
//! use ndufunc::{NdArray, Scalar};
//!
//! let a = NdArray::from_options(vec![Some(1.0f64), None, Some(3.0)]);
//! assert_eq!(a.ndt().to_string(), "3 * ?float64");
//! assert_eq!(a.values(), vec![Some(Scalar::Float64(1.0)), None, Some(Scalar::Float64(3.0))]);
//! ```

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::aliases::Result;
use crate::enums::dtype::DType;
use crate::enums::error::NdError;
use crate::enums::scalar::Scalar;
use crate::structs::bitmask::Bitmask;
use crate::structs::buffer::Buffer;
use crate::structs::ndt::{Dim, Ndt};
use crate::traits::type_unions::Element;
use crate::utils::{block_offsets, offset_of, span};

/// # NdArray
///
/// Owned typed array with shape, strides and an optional null channel.
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray {
    ndt: Ndt,
    data: Buffer,
    null_mask: Option<Bitmask>,
    offset: usize,
}

impl NdArray {
    /// One-dimensional C-contiguous array.
    pub fn from_vec<T: Element>(values: Vec<T>) -> NdArray {
        let ndt = Ndt::contiguous(&[values.len()], T::DTYPE, false);
        Self {
            ndt,
            data: Buffer::from_vec(values),
            null_mask: None,
            offset: 0,
        }
    }

    /// C-contiguous array of the given shape.
    pub fn from_shape_vec<T: Element>(shape: &[usize], values: Vec<T>) -> Result<NdArray> {
        let n: usize = shape.iter().product();
        if n != values.len() {
            return Err(NdError::value(format!(
                "shape {shape:?} needs {n} values, found {}",
                values.len()
            )));
        }
        Ok(Self {
            ndt: Ndt::contiguous(shape, T::DTYPE, false),
            data: Buffer::from_vec(values),
            null_mask: None,
            offset: 0,
        })
    }

    /// One-dimensional array of an optional dtype, `None` entries being null.
    pub fn from_options<T: Element>(values: Vec<Option<T>>) -> NdArray {
        let n = values.len();
        let (data, mask) = split_options(values);
        Self {
            ndt: Ndt::contiguous(&[n], T::DTYPE, true),
            data,
            null_mask: Some(mask),
            offset: 0,
        }
    }

    /// C-contiguous optional array of the given shape.
    pub fn from_shape_options<T: Element>(shape: &[usize], values: Vec<Option<T>>) -> Result<NdArray> {
        let n: usize = shape.iter().product();
        if n != values.len() {
            return Err(NdError::value(format!(
                "shape {shape:?} needs {n} values, found {}",
                values.len()
            )));
        }
        let (data, mask) = split_options(values);
        Ok(Self {
            ndt: Ndt::contiguous(shape, T::DTYPE, true),
            data,
            null_mask: Some(mask),
            offset: 0,
        })
    }

    /// Zero-dimensional array.
    pub fn scalar<T: Element>(value: T) -> NdArray {
        Self {
            ndt: Ndt::primitive(T::DTYPE),
            data: Buffer::from_vec(vec![value]),
            null_mask: None,
            offset: 0,
        }
    }

    /// Zero-dimensional missing value of `?dtype`.
    pub fn null(dtype: DType) -> NdArray {
        Self {
            ndt: Ndt::optional(dtype),
            data: Buffer::zeros(dtype, 1),
            null_mask: Some(Bitmask::new_set_all(1, false)),
            offset: 0,
        }
    }

    /// Ragged array `var * var * T` from a list of lists.
    pub fn from_lists<T: Element>(lists: Vec<Vec<T>>) -> NdArray {
        let mut inner = Vec::with_capacity(lists.len() + 1);
        inner.push(0);
        let mut values = Vec::new();
        for l in lists {
            values.extend(l);
            inner.push(values.len());
        }
        let outer = vec![0, inner.len() - 1];
        let ndt = Ndt::ragged(&[outer, inner], T::DTYPE, false);
        Self {
            ndt,
            data: Buffer::from_vec(values),
            null_mask: None,
            offset: 0,
        }
    }

    /// Ragged array from explicit offsets, outermost level first.
    ///
    /// Each level holds cumulative offsets into the next one; the last level
    /// indexes `values`. Offsets that do not partition the next level exactly fail
    /// with a value error.
    pub fn ragged<T: Element>(offsets: &[Vec<usize>], values: Vec<T>) -> Result<NdArray> {
        check_partition(offsets, values.len())?;
        Ok(Self {
            ndt: Ndt::ragged(offsets, T::DTYPE, false),
            data: Buffer::from_vec(values),
            null_mask: None,
            offset: 0,
        })
    }

    /// Ragged array of an optional dtype.
    pub fn ragged_options<T: Element>(offsets: &[Vec<usize>], values: Vec<Option<T>>) -> Result<NdArray> {
        check_partition(offsets, values.len())?;
        let (data, mask) = split_options(values);
        Ok(Self {
            ndt: Ndt::ragged(offsets, T::DTYPE, true),
            data,
            null_mask: Some(mask),
            offset: 0,
        })
    }

    /// Zero-filled array of a concrete type. Optional types start all valid.
    pub fn empty(ndt: Ndt) -> Result<NdArray> {
        let dtype = storage_dtype(&ndt)?;
        let (len, offset) = extent(&ndt);
        let null_mask = ndt.is_optional().then(|| Bitmask::new_set_all(len, true));
        Ok(Self {
            ndt,
            data: Buffer::zeros(dtype, len),
            null_mask,
            offset,
        })
    }

    /// Fills a fresh array of `ndt` with `values` in logical order.
    pub fn from_scalars(ndt: Ndt, values: &[Option<Scalar>]) -> Result<NdArray> {
        let mut out = NdArray::empty(ndt)?;
        let positions = out.positions();
        if positions.len() != values.len() {
            return Err(NdError::value(format!(
                "type '{}' holds {} values, found {}",
                out.ndt,
                positions.len(),
                values.len()
            )));
        }
        if values.iter().any(Option::is_none) && !out.ndt.is_optional() {
            return Err(NdError::value(format!("type '{}' cannot hold missing values", out.ndt)));
        }
        for (pos, v) in positions.into_iter().zip(values) {
            out.write(pos, *v);
        }
        Ok(out)
    }

    /// View over existing storage with an arbitrary concrete type.
    ///
    /// Fails with a value error when any addressed element lies outside `data`.
    pub fn strided(ndt: Ndt, data: Buffer, offset: usize, null_mask: Option<Bitmask>) -> Result<NdArray> {
        let dtype = storage_dtype(&ndt)?;
        if dtype != data.dtype() {
            return Err(NdError::value(format!(
                "type '{ndt}' does not match {} storage",
                data.dtype()
            )));
        }
        if null_mask.is_some() && !ndt.is_optional() {
            return Err(NdError::value(format!("type '{ndt}' cannot carry a null mask")));
        }
        let (needed, origin) = extent(&ndt);
        let fits = if ndt.is_var() {
            needed <= data.len()
        } else {
            let (lo, hi) = bounds(&ndt);
            ndt.nelems() == Some(0)
                || (offset as isize + lo >= 0 && ((offset as isize + hi) as usize) < data.len())
        };
        if !fits {
            return Err(NdError::value(format!(
                "type '{ndt}' at offset {offset} addresses elements outside a buffer of {}",
                data.len()
            )));
        }
        let offset = if ndt.is_var() { origin } else { offset };
        Ok(Self {
            ndt,
            data,
            null_mask,
            offset,
        })
    }

    #[inline]
    pub fn ndt(&self) -> &Ndt {
        &self.ndt
    }

    #[inline]
    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    #[inline]
    pub fn data(&self) -> &Buffer {
        &self.data
    }

    #[inline]
    pub fn null_mask(&self) -> Option<&Bitmask> {
        self.null_mask.as_ref()
    }

    /// Physical position of the logical origin.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn is_optional(&self) -> bool {
        self.ndt.is_optional()
    }

    /// Shape of a fixed-dimension array.
    #[inline]
    pub fn shape(&self) -> Option<Vec<usize>> {
        self.ndt.shape()
    }

    /// Number of logical elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.ndt.nelems().unwrap_or(0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Physical positions of all elements in logical order.
    pub(crate) fn positions(&self) -> Vec<usize> {
        if self.ndt.is_var() {
            let (lo, hi) = self.ndt.var_leaf_range().unwrap_or((0, 0));
            return (lo..hi).collect();
        }
        let shape = self.ndt.shape().unwrap_or_default();
        let steps = self.ndt.steps().unwrap_or_default();
        block_offsets(self.offset, &shape, &steps)
    }

    /// Element at a physical position, `None` when null.
    #[inline]
    pub(crate) fn read(&self, pos: usize) -> Option<Scalar> {
        if let Some(mask) = &self.null_mask {
            if !mask.get(pos) {
                return None;
            }
        }
        self.data.get(pos)
    }

    /// Writes an element at a physical position, `None` marking it null.
    #[inline]
    pub(crate) fn write(&mut self, pos: usize, value: Option<Scalar>) {
        match value {
            Some(v) => {
                self.data.set(pos, v);
                if let Some(mask) = &mut self.null_mask {
                    mask.set(pos, true);
                }
            }
            None => {
                let len = self.data.len();
                self.null_mask
                    .get_or_insert_with(|| Bitmask::new_set_all(len, true))
                    .set(pos, false);
            }
        }
    }

    /// All elements in logical order.
    pub fn values(&self) -> Vec<Option<Scalar>> {
        self.positions().into_iter().map(|p| self.read(p)).collect()
    }

    /// Typed elements in logical order, `None` entries being null.
    ///
    /// Returns `None` when `T` is not the array dtype.
    pub fn to_options<T: Element>(&self) -> Option<Vec<Option<T>>> {
        if T::DTYPE != self.dtype() {
            return None;
        }
        Some(self.values().into_iter().map(|v| v.and_then(T::from_scalar)).collect())
    }

    /// Typed elements in logical order. `None` for a dtype mismatch or any null.
    pub fn to_vec<T: Element>(&self) -> Option<Vec<T>> {
        self.to_options::<T>()?.into_iter().collect()
    }

    /// Number of missing elements.
    pub fn null_count(&self) -> usize {
        match &self.null_mask {
            None => 0,
            Some(_) => self.values().iter().filter(|v| v.is_none()).count(),
        }
    }

    /// Element at a multi-index.
    ///
    /// Fixed dimensions index by position; ragged dimensions descend through their
    /// offsets. Out of range indices are a value error.
    pub fn get(&self, index: &[usize]) -> Result<Option<Scalar>> {
        let dims = self.ndt.dims();
        if index.len() != dims.len() {
            return Err(NdError::value(format!(
                "index of length {} for an array of {} dimensions",
                index.len(),
                dims.len()
            )));
        }
        if self.ndt.is_var() {
            let mut entry = 0usize;
            for (level, (d, &i)) in dims.iter().zip(index).enumerate() {
                let Dim::Var { offsets: Some(o) } = d else {
                    return Err(NdError::value("unresolved var dimension"));
                };
                let (start, end) = match (o.get(entry), o.get(entry + 1)) {
                    (Some(&s), Some(&e)) => (s, e),
                    _ => return Err(NdError::value(format!("index {index:?} out of bounds"))),
                };
                if start + i >= end {
                    return Err(NdError::value(format!(
                        "index {i} out of bounds for dimension {level} of length {}",
                        end - start
                    )));
                }
                entry = start + i;
            }
            return Ok(self.read(entry));
        }
        let shape = self.ndt.shape().unwrap_or_default();
        let steps = self.ndt.steps().unwrap_or_default();
        for (level, (&i, &n)) in index.iter().zip(&shape).enumerate() {
            if i >= n {
                return Err(NdError::value(format!(
                    "index {i} out of bounds for dimension {level} of length {n}"
                )));
            }
        }
        Ok(self.read(offset_of(self.offset, index, &steps)))
    }

    /// Innermost lists of a ragged array in order.
    pub fn var_lists(&self) -> Option<Vec<Vec<Option<Scalar>>>> {
        let dims = self.ndt.dims();
        let mut entries = (0usize, 1usize);
        let mut last: Option<Arc<[usize]>> = None;
        for (level, d) in dims.iter().enumerate() {
            let Dim::Var { offsets: Some(o) } = d else {
                return None;
            };
            if level == 0 {
                entries = (0, o.len() - 1);
            } else if let Some(prev) = &last {
                entries = (prev[entries.0], prev[entries.1]);
            }
            last = Some(o.clone());
        }
        let o = last?;
        Some(
            (entries.0..entries.1)
                .map(|e| (o[e]..o[e + 1]).map(|p| self.read(p)).collect())
                .collect(),
        )
    }
}

fn split_options<T: Element>(values: Vec<Option<T>>) -> (Buffer, Bitmask) {
    let flags: Vec<bool> = values.iter().map(Option::is_some).collect();
    let data: Vec<T> = values.into_iter().map(Option::unwrap_or_default).collect();
    (Buffer::from_vec(data), Bitmask::from_bools(&flags))
}

/// Offsets must start at 0, be non-decreasing, and each level must end where the next one has
/// entries, with the innermost level ending at the number of values.
fn check_partition(offsets: &[Vec<usize>], nvalues: usize) -> Result<()> {
    if offsets.is_empty() {
        return Err(NdError::value("a ragged array needs at least one offset level"));
    }
    for (level, o) in offsets.iter().enumerate() {
        if o.is_empty() || o.windows(2).any(|w| w[1] < w[0]) {
            return Err(NdError::value(format!("offsets {o:?} at level {level} are not monotonic")));
        }
        if o[0] != 0 {
            return Err(NdError::value(format!("offsets {o:?} at level {level} do not start at 0")));
        }
        let last = o[o.len() - 1];
        let expected = match offsets.get(level + 1) {
            Some(next) => next.len().saturating_sub(1),
            None => nvalues,
        };
        if last != expected {
            return Err(NdError::value(format!(
                "offsets at level {level} end at {last} but the next level has {expected} entries"
            )));
        }
    }
    Ok(())
}

fn storage_dtype(ndt: &Ndt) -> Result<DType> {
    if !ndt.is_concrete() {
        return Err(NdError::value(format!("cannot allocate abstract type '{ndt}'")));
    }
    ndt.dtype().ok_or_else(|| NdError::NotImplemented {
        function: "NdArray".to_string(),
        signature: format!("storage of '{}'", ndt.leaf()),
    })
}

/// Smallest and largest step displacement of a fixed-dimension type.
fn bounds(ndt: &Ndt) -> (isize, isize) {
    let shape = ndt.shape().unwrap_or_default();
    let steps = ndt.steps().unwrap_or_default();
    span(&shape, &steps)
}

/// Number of storage elements a type needs, and the physical origin.
fn extent(ndt: &Ndt) -> (usize, usize) {
    if ndt.is_var() {
        return (ndt.var_leaf_range().map(|r| r.1).unwrap_or(0), 0);
    }
    if ndt.nelems() == Some(0) {
        return (0, 0);
    }
    let (lo, hi) = bounds(ndt);
    ((hi - lo + 1) as usize, (-lo) as usize)
}

impl Display for NdArray {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        fn cell(v: Option<Scalar>) -> String {
            v.map(|s| s.to_string()).unwrap_or_else(|| "None".to_string())
        }
        if let Some(lists) = self.var_lists() {
            let parts: Vec<String> = lists
                .into_iter()
                .map(|l| format!("[{}]", l.into_iter().map(cell).collect::<Vec<_>>().join(", ")))
                .collect();
            return write!(f, "[{}]", parts.join(", "));
        }
        let shape = self.shape().unwrap_or_default();
        let values: Vec<String> = self.values().into_iter().map(cell).collect();
        if shape.is_empty() {
            return f.write_str(values.first().map(String::as_str).unwrap_or(""));
        }
        let mut out = String::new();
        nest(&mut out, &shape, &values);
        f.write_str(&out)
    }
}

/// Writes C-order `values` as nested brackets.
fn nest(out: &mut String, shape: &[usize], values: &[String]) {
    out.push('[');
    if shape.len() == 1 {
        out.push_str(&values.join(", "));
    } else {
        let chunk = values.len() / shape[0].max(1);
        for i in 0..shape[0] {
            if i > 0 {
                out.push_str(", ");
            }
            nest(out, &shape[1..], &values[i * chunk..(i + 1) * chunk]);
        }
    }
    out.push(']');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_from_shape_vec() {
        let a = NdArray::from_shape_vec(&[2, 3], vec![1i32, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(a.ndt().to_string(), "2 * 3 * int32");
        assert_eq!(a.get(&[1, 0]).unwrap(), Some(Scalar::Int32(4)));
        assert_eq!(a.to_string(), "[[1, 2, 3], [4, 5, 6]]");
        assert!(NdArray::from_shape_vec(&[2, 2], vec![1i32]).is_err());
    }

    #[test]
    fn test_strided_reversed_view() {
        let ndt: Ndt = "fixed(shape=3, step=-1) * int64".parse().unwrap();
        let a = NdArray::strided(ndt, Buffer::from_vec(vec![1i64, 2, 3]), 2, None).unwrap();
        assert_eq!(a.to_vec::<i64>(), Some(vec![3, 2, 1]));
    }

    #[test]
    fn test_strided_out_of_bounds() {
        let ndt: Ndt = "fixed(shape=2, step=10) * uint8".parse().unwrap();
        let e = NdArray::strided(ndt, Buffer::from_vec(vec![0u8; 5]), 0, None).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Value);
    }

    #[test]
    fn test_empty_fortran() {
        let a = NdArray::empty("!2 * 3 * float32".parse().unwrap()).unwrap();
        assert_eq!(a.data().len(), 6);
        assert_eq!(a.len(), 6);
    }

    #[test]
    fn test_ragged() {
        let a = NdArray::from_lists(vec![vec![1.0f64, 2.0], vec![], vec![3.0]]);
        assert_eq!(a.ndt().to_string(), "var(offsets=[0, 3]) * var(offsets=[0, 2, 2, 3]) * float64");
        assert_eq!(a.get(&[2, 0]).unwrap(), Some(Scalar::Float64(3.0)));
        assert!(a.get(&[1, 0]).is_err());
        assert_eq!(a.to_string(), "[[1, 2], [], [3]]");
    }

    #[test]
    fn test_ragged_mismatch_is_value_error() {
        let e = NdArray::ragged(&[vec![0, 2], vec![0, 1, 5]], vec![1i8, 2, 3]).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Value);
        let e = NdArray::ragged(&[vec![0, 3], vec![0, 1, 3]], vec![1i8, 2, 3]).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Value);
    }

    #[test]
    fn test_options_and_nulls() {
        let mut a = NdArray::from_options(vec![Some(1u16), None, Some(3)]);
        assert_eq!(a.null_count(), 1);
        a.write(1, Some(Scalar::UInt16(2)));
        assert_eq!(a.to_vec::<u16>(), Some(vec![1, 2, 3]));
        assert_eq!(NdArray::null(DType::Int8).values(), vec![None]);
    }
}
