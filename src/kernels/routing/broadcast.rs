// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Broadcast Module
//!
//! Combines the outer dimensions bound by each argument's ellipsis into one
//! iteration space, and classifies which execution strategies apply to it.
//!
//! ## Fixed outer dimensions
//! Shapes align on the right. Two extents are compatible when equal or when one of
//! them is 1, which is then stretched with step 0. Missing leading dims stretch too.
//!
//! ## Ragged outer dimensions
//! Ragged arguments must share the exact same offsets. Any other argument must be
//! a scalar or consist of size-1 fixed dims only, so it is repeated for every leaf.

use crate::aliases::Result;
use crate::enums::error::NdError;
use crate::enums::strategy::ApplyFlags;
use crate::structs::ndt::{Dim, Ndt, run_c_steps, run_f_steps};

/// Iteration space over the outer dimensions of a call.
#[derive(Debug, Clone, PartialEq)]
pub enum OuterSpace {
    Fixed {
        shape: Vec<usize>,
        /// Per argument, the step of every outer dim. Stretched dims have step 0.
        steps: Vec<Vec<isize>>,
        /// Per argument, whether its own outer shape equals `shape`.
        exact: Vec<bool>,
    },
    Ragged {
        dims: Vec<Dim>,
        /// Leaf index range addressed by `dims`.
        range: (usize, usize),
        /// Per argument, whether it walks the ragged leaves or repeats one element.
        ragged: Vec<bool>,
    },
}

impl OuterSpace {
    /// Number of outer positions.
    pub fn len(&self) -> usize {
        match self {
            OuterSpace::Fixed { shape, .. } => shape.iter().product(),
            OuterSpace::Ragged { range, .. } => range.1 - range.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ndim(&self) -> usize {
        match self {
            OuterSpace::Fixed { shape, .. } => shape.len(),
            OuterSpace::Ragged { dims, .. } => dims.len(),
        }
    }

    #[inline]
    pub fn is_ragged(&self) -> bool {
        matches!(self, OuterSpace::Ragged { .. })
    }

    /// Outer dims of a freshly allocated output, before its core dims are added.
    pub fn shape(&self) -> Option<&[usize]> {
        match self {
            OuterSpace::Fixed { shape, .. } => Some(shape),
            OuterSpace::Ragged { .. } => None,
        }
    }

    /// Registers the outer dims of an output argument, which must already match
    /// the space exactly.
    pub fn push_output(&mut self, outer: &[Dim]) {
        match self {
            OuterSpace::Fixed { steps, exact, .. } => {
                steps.push(outer.iter().map(dim_step).collect());
                exact.push(true);
            }
            OuterSpace::Ragged { ragged, .. } => ragged.push(true),
        }
    }
}

#[inline]
fn dim_step(d: &Dim) -> isize {
    match d {
        Dim::Fixed { step, .. } => *step,
        _ => 0,
    }
}

fn dims_text(dims: &[Dim]) -> String {
    dims.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(" * ")
}

/// Leaf index range of a run of concrete var dims.
pub(crate) fn leaf_range(dims: &[Dim]) -> Option<(usize, usize)> {
    let mut range: Option<(usize, usize)> = None;
    for d in dims {
        let Dim::Var { offsets: Some(o) } = d else {
            return None;
        };
        let (lo, hi) = range.unwrap_or((0, o.len().checked_sub(1)?));
        range = Some((*o.get(lo)?, *o.get(hi)?));
    }
    range
}

/// Builds the iteration space from the outer dims of every input.
pub fn broadcast(outer: &[Vec<Dim>]) -> Result<OuterSpace> {
    if let Some(reference) = outer.iter().find(|dims| dims.iter().any(Dim::is_var)) {
        return broadcast_ragged(outer, reference);
    }

    let ndim = outer.iter().map(Vec::len).max().unwrap_or(0);
    let mut shape = vec![1usize; ndim];
    for (arg, dims) in outer.iter().enumerate() {
        let pad = ndim - dims.len();
        for (j, d) in dims.iter().enumerate() {
            let n = d.len().unwrap_or(0);
            let slot = &mut shape[pad + j];
            if *slot == 1 {
                *slot = n;
            } else if n != 1 && n != *slot {
                return Err(NdError::Shape {
                    arg,
                    expected: format!("dimension {} of size {}", pad + j, slot),
                    found: dims_text(dims),
                });
            }
        }
    }

    let mut steps = Vec::with_capacity(outer.len());
    let mut exact = Vec::with_capacity(outer.len());
    for dims in outer {
        let pad = ndim - dims.len();
        let mut s = vec![0isize; ndim];
        for (j, d) in dims.iter().enumerate() {
            if d.len() == Some(shape[pad + j]) {
                s[pad + j] = dim_step(d);
            }
        }
        steps.push(s);
        exact.push(pad == 0 && dims.iter().zip(&shape).all(|(d, &n)| d.len() == Some(n)));
    }
    Ok(OuterSpace::Fixed { shape, steps, exact })
}

fn broadcast_ragged(outer: &[Vec<Dim>], reference: &[Dim]) -> Result<OuterSpace> {
    let mut ragged = Vec::with_capacity(outer.len());
    for (arg, dims) in outer.iter().enumerate() {
        if dims.iter().any(Dim::is_var) {
            if dims.as_slice() != reference {
                return Err(NdError::value(format!(
                    "argument {arg}: ragged dimensions '{}' do not match '{}'",
                    dims_text(dims),
                    dims_text(reference)
                )));
            }
            ragged.push(true);
        } else if dims.iter().all(|d| d.len() == Some(1)) {
            ragged.push(false);
        } else {
            return Err(NdError::value(format!(
                "argument {arg}: cannot broadcast '{}' against ragged '{}'",
                dims_text(dims),
                dims_text(reference)
            )));
        }
    }
    let range = leaf_range(reference).ok_or_else(|| NdError::value("unresolved ragged dimension"))?;
    Ok(OuterSpace::Ragged {
        dims: reference.to_vec(),
        range,
        ragged,
    })
}

fn inner_matches(inner: &[Dim], defaults: fn(&[usize]) -> Vec<isize>) -> bool {
    let shape: Option<Vec<usize>> = inner
        .iter()
        .map(|d| match d {
            Dim::Fixed { shape, .. } => Some(*shape),
            _ => None,
        })
        .collect();
    let Some(shape) = shape else {
        return false;
    };
    inner
        .iter()
        .zip(&shape)
        .zip(defaults(&shape))
        .all(|((d, &n), want)| n <= 1 || dim_step(d) == want)
}

/// Applicable strategies for a call.
///
/// `types` lists inputs then outputs; `inner` holds the core dims of each of them.
pub fn classify(space: &OuterSpace, types: &[Ndt], inner: &[Vec<Dim>]) -> ApplyFlags {
    let mut flags = ApplyFlags::XND;
    let OuterSpace::Fixed { steps, exact, .. } = space else {
        return flags;
    };
    if inner.iter().all(|dims| dims.iter().all(|d| matches!(d, Dim::Fixed { .. }))) {
        flags |= ApplyFlags::STRIDED;
        if inner.iter().all(|dims| inner_matches(dims, run_c_steps)) {
            flags |= ApplyFlags::C;
        }
        if inner.iter().all(|dims| inner_matches(dims, run_f_steps)) {
            flags |= ApplyFlags::FORTRAN;
        }
    }
    if space.ndim() > 0 && flags.contains(ApplyFlags::STRIDED) {
        flags |= ApplyFlags::OPT_S;
        let contiguous = types.iter().all(Ndt::is_c_contiguous);
        let zero_or_exact = steps
            .iter()
            .zip(exact)
            .all(|(s, &e)| e || s.iter().all(|&x| x == 0));
        if contiguous && zero_or_exact {
            flags |= ApplyFlags::OPT_C;
            if exact.iter().all(|&e| e) {
                flags |= ApplyFlags::OPT_Z;
            }
        }
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn outer_of(s: &str) -> Vec<Dim> {
        s.parse::<Ndt>().unwrap().dims()
    }

    #[test]
    fn test_right_aligned_broadcast() {
        let space = broadcast(&[outer_of("2 * 3 * int8"), outer_of("3 * int8"), outer_of("int8")]).unwrap();
        let OuterSpace::Fixed { shape, steps, exact } = space else {
            panic!("expected fixed space");
        };
        assert_eq!(shape, vec![2, 3]);
        assert_eq!(steps, vec![vec![3, 1], vec![0, 1], vec![0, 0]]);
        assert_eq!(exact, vec![true, false, false]);
    }

    #[test]
    fn test_size_one_stretch() {
        let space = broadcast(&[outer_of("2 * 1 * int8"), outer_of("1 * 4 * int8")]).unwrap();
        assert_eq!(space.shape(), Some(&[2usize, 4][..]));
        assert_eq!(space.len(), 8);
    }

    #[test]
    fn test_mismatch_is_shape_error() {
        let e = broadcast(&[outer_of("2 * int8"), outer_of("3 * int8")]).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Shape);
    }

    #[test]
    fn test_ragged_rules() {
        let v = outer_of("var(offsets=[0, 2]) * var(offsets=[0, 1, 3]) * int8");
        let space = broadcast(&[v.clone(), vec![]]).unwrap();
        assert_eq!(space.len(), 3);
        assert!(space.is_ragged());
        let e = broadcast(&[v.clone(), outer_of("3 * int8")]).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Value);
        let w = outer_of("var(offsets=[0, 2]) * var(offsets=[0, 2, 3]) * int8");
        assert_eq!(broadcast(&[v, w]).unwrap_err().kind(), ErrorKind::Value);
    }

    #[test]
    fn test_broadcast_identity_is_contiguous() {
        let a: Ndt = "4 * 5 * float32".parse().unwrap();
        let space = broadcast(&[a.dims(), a.dims()]).unwrap();
        assert_eq!(space.shape(), Some(&[4usize, 5][..]));
        let flags = classify(&space, &[a.clone(), a.clone()], &[vec![], vec![]]);
        assert!(flags.contains(ApplyFlags::OPT_Z | ApplyFlags::C));
    }
}
