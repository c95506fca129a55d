// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Reduce Module
//!
//! Folds a binary elementwise function over the outermost axis of a fixed array.
//!
//! ## Null handling
//! Each reducible function has a [`ReduceOp`] entry deciding whether a missing
//! element makes the whole result missing ([`NullRule::Propagate`]) or is left out
//! ([`NullRule::Skip`]). A fold over zero usable elements yields the identity of the
//! operator when it has one and a missing value otherwise.
//!
//! ## Accumulator dtype
//! Without an explicit dtype the input dtype is widened through the registry's
//! [`CastTable`](crate::CastTable), then resolved against the function's rows like
//! any elementwise call. An explicit dtype the input cannot be cast to safely is
//! a value error.

use log::debug;

use crate::aliases::Result;
use crate::enums::dtype::DType;
use crate::enums::error::NdError;
use crate::enums::scalar::Scalar;
use crate::kernels::registry::{Kernel, KernelRegistry};
use crate::kernels::routing::cast::resolve;
use crate::structs::ndarray::NdArray;
use crate::structs::ndt::Ndt;
use crate::utils::{offset_of, unravel};

/// Missing-value rule of a reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullRule {
    /// Any missing element makes the result missing.
    Propagate,
    /// Missing elements are ignored.
    Skip,
}

/// Identity element of a reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    Zero,
    One,
}

/// Reduction behaviour of one binary function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReduceOp {
    pub name: &'static str,
    pub identity: Option<Identity>,
    pub nulls: NullRule,
}

pub const REDUCE_OPS: [ReduceOp; 5] = [
    ReduceOp { name: "add", identity: Some(Identity::Zero), nulls: NullRule::Propagate },
    ReduceOp { name: "multiply", identity: Some(Identity::One), nulls: NullRule::Propagate },
    ReduceOp { name: "subtract", identity: None, nulls: NullRule::Propagate },
    ReduceOp { name: "minimum", identity: None, nulls: NullRule::Skip },
    ReduceOp { name: "maximum", identity: None, nulls: NullRule::Skip },
];

impl ReduceOp {
    /// Looks up the reduction entry of `name`.
    pub fn find(name: &str) -> Option<&'static ReduceOp> {
        REDUCE_OPS.iter().find(|op| op.name == name)
    }
}

/// Reduces `array` along axis 0 with the binary function `name`.
///
/// ```rust
/// use ndufunc::{reduce, KernelRegistry, NdArray};
///
/// let a = NdArray::from_shape_vec(&[2, 3], vec![1i32, 2, 3, 4, 5, 6]).unwrap();
/// let r = reduce(KernelRegistry::global(), "add", &a, None).unwrap();
/// assert_eq!(r.to_vec::<i64>(), Some(vec![5, 7, 9]));
/// ```
pub fn reduce(registry: &KernelRegistry, name: &str, array: &NdArray, dtype: Option<DType>) -> Result<NdArray> {
    let op = ReduceOp::find(name).ok_or_else(|| NdError::value(format!("'{name}' is not a reduction")))?;
    let g = registry.get(name)?;
    if array.ndt().is_var() {
        return Err(NdError::NotImplemented {
            function: name.to_string(),
            signature: format!("reduction over '{}'", array.ndt()),
        });
    }
    let (Some(shape), Some(steps)) = (array.ndt().shape(), array.ndt().steps()) else {
        return Err(NdError::value(format!("cannot reduce abstract type '{}'", array.ndt())));
    };
    if shape.is_empty() {
        return Err(NdError::Shape {
            arg: 0,
            expected: "N * ...".to_string(),
            found: array.ndt().to_string(),
        });
    }

    let acc = dtype.unwrap_or_else(|| registry.casts().target(array.dtype()));
    if !array.dtype().can_cast_safely(&acc) {
        return Err(NdError::value(format!(
            "{name}: cannot reduce {} with a {} accumulator without losing values",
            array.dtype().name(),
            acc.name()
        )));
    }
    let res = resolve(g, &[Ndt::primitive(acc), Ndt::primitive(acc)])?;
    let Kernel::Elementwise(f) = res.kernel else {
        return Err(NdError::type_error(name, "reduction needs an elementwise kernel"));
    };
    let out_dtype = res.outputs[0];

    let n = shape[0];
    let rest = &shape[1..];
    let optional = array.is_optional() || (op.identity.is_none() && n == 0);
    debug!(
        "reduce {name}: {n} rows of {rest:?}, accumulator {}, row {}",
        out_dtype.name(),
        g.rows()[res.row].describe()
    );

    let count: usize = rest.iter().product();
    let mut index = vec![0usize; shape.len()];
    let mut values = Vec::with_capacity(count);
    for flat in 0..count {
        unravel(flat, rest, &mut index[1..]);
        let mut total = op.identity.map(|id| match id {
            Identity::Zero => Scalar::zero(out_dtype),
            Identity::One => Scalar::one(out_dtype),
        });
        let mut missing = false;
        for i in 0..n {
            index[0] = i;
            let Some(v) = array.read(offset_of(array.offset(), &index, &steps)) else {
                match op.nulls {
                    NullRule::Propagate => {
                        missing = true;
                        break;
                    }
                    NullRule::Skip => continue,
                }
            };
            total = Some(match total {
                None => v.cast(out_dtype),
                Some(t) => {
                    let mut out = [Scalar::zero(out_dtype)];
                    f(&[t.cast(res.inputs[0]), v.cast(res.inputs[1])], &mut out)?;
                    out[0]
                }
            });
        }
        values.push(if missing { None } else { total });
    }
    let optional = optional || values.iter().any(Option::is_none);
    NdArray::from_scalars(Ndt::contiguous(rest, out_dtype, optional), &values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn global() -> &'static KernelRegistry {
        KernelRegistry::global()
    }

    #[test]
    fn test_nulls_propagate() {
        let a = NdArray::from_options(vec![Some(1i64), None, Some(2)]);
        for name in ["add", "multiply", "subtract"] {
            let r = reduce(global(), name, &a, None).unwrap();
            assert_eq!(r.values(), vec![None], "{name}");
        }
    }

    #[test]
    fn test_nulls_skip() {
        let a = NdArray::from_options(vec![Some(4i64), None, Some(2)]);
        let r = reduce(global(), "minimum", &a, None).unwrap();
        assert_eq!(r.values(), vec![Some(Scalar::Int64(2))]);
    }

    #[test]
    fn test_empty_identity() {
        let a = NdArray::from_options(Vec::<Option<i32>>::new());
        let r = reduce(global(), "add", &a, None).unwrap();
        assert_eq!(r.values(), vec![Some(Scalar::Int64(0))]);

        let r = reduce(global(), "maximum", &NdArray::from_vec(Vec::<f64>::new()), None).unwrap();
        assert_eq!(r.values(), vec![None]);
        assert!(r.is_optional());
    }

    #[test]
    fn test_explicit_dtype() {
        let a = NdArray::from_vec(vec![1.5f32, 2.0, 4.0]);
        let r = reduce(global(), "multiply", &a, Some(DType::Float32)).unwrap();
        assert_eq!(r.values(), vec![Some(Scalar::Float32(12.0))]);
        assert_eq!(r.ndt().to_string(), "float32");
    }

    #[test]
    fn test_narrowing_dtype_rejected() {
        let a = NdArray::from_vec(vec![300i64, 1]);
        assert_eq!(reduce(global(), "add", &a, Some(DType::Int8)).unwrap_err().kind(), ErrorKind::Value);
        let a = NdArray::from_vec(vec![1.75f64, 2.75]);
        assert_eq!(reduce(global(), "add", &a, Some(DType::Int64)).unwrap_err().kind(), ErrorKind::Value);

        let a = NdArray::from_vec(vec![100i8, 100]);
        let r = reduce(global(), "add", &a, Some(DType::Int16)).unwrap();
        assert_eq!(r.values(), vec![Some(Scalar::Int16(200))]);
    }

    #[test]
    fn test_subtract_folds_left() {
        let a = NdArray::from_vec(vec![10i64, 3, 2]);
        let r = reduce(global(), "subtract", &a, None).unwrap();
        assert_eq!(r.values(), vec![Some(Scalar::Int64(5))]);
    }

    #[test]
    fn test_rejections() {
        let s = NdArray::scalar(1i64);
        assert_eq!(reduce(global(), "add", &s, None).unwrap_err().kind(), ErrorKind::Shape);
        let v = NdArray::from_lists(vec![vec![1i64], vec![2, 3]]);
        assert_eq!(reduce(global(), "add", &v, None).unwrap_err().kind(), ErrorKind::NotImplemented);
        let a = NdArray::from_vec(vec![1.0f64]);
        assert_eq!(reduce(global(), "sin", &a, None).unwrap_err().kind(), ErrorKind::Value);
    }
}
