// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Cast Module - *Dtype Row Resolution*
//!
//! Picks the kernel row for a set of argument leaves.
//!
//! ## Resolution order
//! 1. An exact row wins. If it has no kernel the call is not implemented.
//! 2. Under [`CastPolicy::Exact`] nothing else matches.
//! 3. Otherwise every row the arguments reach through safe casts is a candidate,
//!    ranked by the widest input in promotion order, then by the sum of input
//!    positions, then by row order. The cheapest implemented candidate wins.
//! 4. Failing that: only unimplemented candidates is `NotImplemented`, a row that is
//!    reachable only by rounding integers into floats is a value error, and
//!    anything else is a type error.
//!
//! Optionality is orthogonal: the result is optional when any argument is.
//!
//! [`CastTable`] holds the default promotion of each dtype to the widest member of
//! its family, used when reducing without an explicit dtype.

use log::trace;

use crate::aliases::Result;
use crate::enums::dtype::{DType, DTypeKind, PROMOTION_ORDER};
use crate::enums::error::NdError;
use crate::kernels::registry::{CastPolicy, Gufunc, Kernel, KernelRow};
use crate::structs::ndt::Ndt;

/// Selected row with the dtypes arguments are cast into.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub row: usize,
    pub kernel: Kernel,
    pub inputs: Vec<DType>,
    pub outputs: Vec<DType>,
    /// At least one argument leaf is optional.
    pub optional: bool,
}

fn rank(row: &KernelRow) -> (usize, usize) {
    let pos = |d: &DType| PROMOTION_ORDER.iter().position(|p| p == d).unwrap_or(PROMOTION_ORDER.len());
    let widest = row.inputs.iter().map(pos).max().unwrap_or(0);
    let total = row.inputs.iter().map(pos).sum();
    (widest, total)
}

fn not_implemented(g: &Gufunc, args: &[DType]) -> NdError {
    NdError::NotImplemented {
        function: g.name().to_string(),
        signature: args.iter().map(|d| d.name()).collect::<Vec<_>>().join(", "),
    }
}

/// Resolves the kernel row of `g` for the argument `leaves`.
pub fn resolve(g: &Gufunc, leaves: &[Ndt]) -> Result<Resolution> {
    let mut args = Vec::with_capacity(leaves.len());
    for (i, leaf) in leaves.iter().enumerate() {
        let d = leaf.dtype().ok_or_else(|| {
            NdError::type_error(g.name(), format!("argument {i} has non-numeric item type '{leaf}'"))
        })?;
        args.push(d);
    }
    let optional = leaves.iter().any(Ndt::is_optional);
    let select = |index: usize, row: &KernelRow, kernel: Kernel| Resolution {
        row: index,
        kernel,
        inputs: row.inputs.clone(),
        outputs: row.outputs.clone(),
        optional,
    };

    let rows = g.rows();
    if let Some((index, row)) = rows.iter().enumerate().find(|(_, r)| r.inputs == args) {
        return match row.kernel {
            Some(k) => Ok(select(index, row, k)),
            None => Err(not_implemented(g, &args)),
        };
    }

    let describe = || args.iter().map(|d| d.name()).collect::<Vec<_>>().join(", ");
    if g.cast_policy() == CastPolicy::Exact {
        return Err(NdError::type_error(g.name(), format!("no kernel for ({})", describe())));
    }

    let arity_ok = |r: &&KernelRow| r.inputs.len() == args.len();
    let mut reachable: Vec<(usize, &KernelRow)> = rows
        .iter()
        .enumerate()
        .filter(|(_, r)| arity_ok(r))
        .filter(|(_, r)| args.iter().zip(&r.inputs).all(|(a, want)| a.can_cast_safely(want)))
        .collect();
    reachable.sort_by_key(|(i, r)| (rank(r), *i));

    if let Some((index, row, k)) = reachable
        .iter()
        .find_map(|(i, r)| r.kernel.map(|k| (*i, *r, k)))
    {
        for (skipped, r) in reachable.iter().take_while(|(i, _)| *i != index) {
            trace!("{}: row {skipped} ({}) has no kernel", g.name(), r.describe());
        }
        return Ok(select(index, row, k));
    }
    if !reachable.is_empty() {
        return Err(not_implemented(g, &args));
    }

    let inexact = rows.iter().filter(arity_ok).any(|r| {
        r.kernel.is_some()
            && args
                .iter()
                .zip(&r.inputs)
                .all(|(a, want)| a.can_cast_safely(want) || a.is_inexact_cast(want))
    });
    if inexact {
        return Err(NdError::value(format!(
            "'{}' of ({}) would need an inexact integer to float cast",
            g.name(),
            describe()
        )));
    }
    Err(NdError::type_error(g.name(), format!("no kernel for ({})", describe())))
}

/// # CastTable
///
/// Default promotion target of every dtype, preserving optionality.
#[derive(Debug, Clone, PartialEq)]
pub struct CastTable {
    targets: Vec<(DType, DType)>,
}

impl CastTable {
    /// Widest member of each family: signed to `int64`, unsigned to `uint64`,
    /// floats to `float64`, complex to `complex128`. `bool` stays `bool`.
    pub fn maxcast() -> Self {
        let targets = DType::ALL
            .iter()
            .map(|&d| {
                let to = match d.kind() {
                    DTypeKind::Bool => DType::Bool,
                    DTypeKind::Signed => DType::Int64,
                    DTypeKind::Unsigned => DType::UInt64,
                    DTypeKind::Float => DType::Float64,
                    DTypeKind::Complex => DType::Complex128,
                };
                (d, to)
            })
            .collect();
        Self { targets }
    }

    /// Table with explicit targets; dtypes not listed map to themselves.
    pub fn from_pairs(pairs: &[(DType, DType)]) -> Self {
        Self { targets: pairs.to_vec() }
    }

    pub fn target(&self, d: DType) -> DType {
        self.targets
            .iter()
            .find(|(from, _)| *from == d)
            .map(|(_, to)| *to)
            .unwrap_or(d)
    }

    /// Promotes the dtype of a primitive leaf, keeping `?`.
    pub fn promote(&self, t: &Ndt) -> Result<Ndt> {
        let d = t
            .dtype()
            .ok_or_else(|| NdError::value(format!("cannot promote non-numeric type '{t}'")))?;
        let to = self.target(d);
        Ok(if t.is_optional() { Ndt::optional(to) } else { Ndt::primitive(to) })
    }
}
