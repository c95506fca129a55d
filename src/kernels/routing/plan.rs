// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Plan Module
//!
//! Builds the executable [`Plan`] for one call:
//! match → resolve → check → derive → broadcast → output types → `out=` validation.
//!
//! Every step is pure; the first violated contract is returned as the error.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;

use crate::aliases::Result;
use crate::enums::dtype::DType;
use crate::enums::error::NdError;
use crate::kernels::registry::{Gufunc, Kernel};
use crate::kernels::routing::broadcast::{OuterSpace, broadcast, classify};
use crate::kernels::routing::cast::resolve;
use crate::kernels::routing::matcher::{Bindings, LeafMode, match_inputs};
use crate::structs::apply_spec::ApplySpec;
use crate::structs::ndt::{Dim, NodeKind, Ndt};
use crate::structs::signature::Signature;

/// Shape and element steps of the core dims of one argument.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreLayout {
    pub shape: Vec<usize>,
    pub steps: Vec<isize>,
}

/// Everything the driver needs to run one call.
#[derive(Debug, Clone)]
pub struct Plan {
    pub spec: ApplySpec,
    pub kernel: Kernel,
    /// Index of the selected row in the function table.
    pub row: usize,
    /// Dtypes inputs are cast into before the kernel sees them.
    pub in_dtypes: Vec<DType>,
    pub out_dtypes: Vec<DType>,
    pub outer: OuterSpace,
    /// Core layout of every argument, inputs then outputs.
    pub cores: Vec<CoreLayout>,
    pub optional: bool,
    /// Nothing to compute: the outer space or an output is empty.
    pub empty: bool,
}

/// Plans a call of `g` on arguments of the given types.
///
/// With `out`, those types become the output types after validation against the
/// computed ones; otherwise fresh C-contiguous outputs are planned.
pub fn build(g: &Gufunc, inputs: &[Ndt], out: Option<&[Ndt]>) -> Result<Plan> {
    let sig = g.signature();
    let bindings = match_inputs(g.name(), sig, inputs, LeafMode::DimsOnly)?;
    let res = resolve(g, &bindings.leaves)?;
    if let Some(check) = g.checker() {
        check(&bindings)?;
    }
    let mut symbols = bindings.symbols.clone();
    if let Some(derive) = g.deriver() {
        symbols.extend(derive(&bindings)?);
    }

    let leaves: Vec<Ndt> = res
        .outputs
        .iter()
        .map(|&d| if res.optional { Ndt::optional(d) } else { Ndt::primitive(d) })
        .collect();
    let assembled = assemble(g.name(), sig, inputs, &bindings, &symbols, &leaves, out)?;

    let cores = assembled
        .inner
        .iter()
        .map(|dims| core_layout(g.name(), dims))
        .collect::<Result<Vec<_>>>()?;
    let empty = assembled.outer.is_empty()
        || assembled.spec.outputs().iter().any(|t| t.nelems() == Some(0));

    debug!(
        "{}: row {} ({}), strategy {}, {}",
        g.name(),
        res.row,
        g.rows()[res.row].describe(),
        assembled.spec.strategy(),
        assembled.spec
    );
    Ok(Plan {
        spec: assembled.spec,
        kernel: res.kernel,
        row: res.row,
        in_dtypes: res.inputs,
        out_dtypes: res.outputs,
        outer: assembled.outer,
        cores,
        optional: res.optional,
        empty,
    })
}

/// [`ApplySpec`] of a signature applied to concrete argument types.
///
/// Leaves must match the signature exactly (dtype variables bind), and output
/// leaves come from the signature with variables substituted.
///
/// ```rust
/// use ndufunc::{apply_spec, Ndt, Strategy};
///
/// let spec = apply_spec("... * uint8 -> ... * float64", &["2 * uint8".parse::<Ndt>().unwrap()]).unwrap();
/// assert_eq!(spec.outer_dims, 1);
/// assert_eq!(spec.types[1].to_string(), "2 * float64");
/// assert_eq!(spec.strategy(), Strategy::OptZ);
/// ```
pub fn apply_spec(signature: &str, args: &[Ndt]) -> Result<ApplySpec> {
    let sig = Signature::parse(signature)?;
    let bindings = match_inputs("apply_spec", &sig, args, LeafMode::Exact)?;
    let optional = bindings.leaves.iter().any(Ndt::is_optional);
    let leaves = sig
        .outputs()
        .iter()
        .map(|o| {
            let leaf = o.leaf().strip_optional();
            let value = match leaf.kind() {
                NodeKind::TypeVar(name) => bindings
                    .typevars
                    .get(name)
                    .cloned()
                    .ok_or_else(|| NdError::value(format!("output type variable '{name}' is not bound")))?,
                _ => leaf,
            };
            if optional || o.is_optional() { value.to_optional() } else { Ok(value) }
        })
        .collect::<Result<Vec<_>>>()?;
    let assembled = assemble("apply_spec", &sig, args, &bindings, &bindings.symbols, &leaves, None)?;
    Ok(assembled.spec)
}

struct Assembled {
    spec: ApplySpec,
    outer: OuterSpace,
    /// Core dims of every argument, inputs then outputs.
    inner: Vec<Vec<Dim>>,
}

fn assemble(
    function: &str,
    sig: &Signature,
    inputs: &[Ndt],
    bindings: &Bindings,
    symbols: &BTreeMap<Arc<str>, usize>,
    leaves: &[Ndt],
    out: Option<&[Ndt]>,
) -> Result<Assembled> {
    let mut outer = broadcast(&bindings.outer)?;
    let k = outer.ndim();

    let mut types: Vec<Ndt> = inputs.to_vec();
    let mut inner = bindings.inner.clone();
    if let Some(given) = out {
        if given.len() != sig.nout() {
            return Err(NdError::argument(format!(
                "'{function}' has {} outputs, {} given",
                sig.nout(),
                given.len()
            )));
        }
    }

    for (j, (pattern, leaf)) in sig.outputs().iter().zip(leaves).enumerate() {
        let fresh = output_type(function, pattern, leaf, &outer, symbols)?;
        let t = match out.map(|o| &o[j]) {
            Some(given) => {
                validate_out(function, j, given, &fresh)?;
                given.clone()
            }
            None => fresh,
        };
        let dims = t.dims();
        let split = if matches!(pattern.dims().first(), Some(Dim::Ellipsis { .. })) { k } else { 0 };
        outer.push_output(&dims[..split]);
        inner.push(dims[split..].to_vec());
        types.push(t);
    }

    let flags = classify(&outer, &types, &inner);
    let spec = ApplySpec {
        flags,
        outer_dims: k,
        nin: sig.nin(),
        nout: sig.nout(),
        types,
    };
    Ok(Assembled { spec, outer, inner })
}

fn output_type(
    function: &str,
    pattern: &Ndt,
    leaf: &Ndt,
    outer: &OuterSpace,
    symbols: &BTreeMap<Arc<str>, usize>,
) -> Result<Ndt> {
    let pdims = pattern.dims();
    let (with_outer, core) = match pdims.split_first() {
        Some((Dim::Ellipsis { .. }, rest)) => (true, rest),
        _ => (false, &pdims[..]),
    };
    let mut core_shape = Vec::with_capacity(core.len());
    for d in core {
        match d {
            Dim::Fixed { shape, .. } => core_shape.push(*shape),
            Dim::Symbolic(name) => core_shape.push(
                *symbols
                    .get(name)
                    .ok_or_else(|| NdError::value(format!("output dimension '{name}' is not bound")))?,
            ),
            _ => {
                return Err(NdError::NotImplemented {
                    function: function.to_string(),
                    signature: format!("ragged output core '{pattern}'"),
                });
            }
        }
    }
    match (with_outer, outer) {
        (true, OuterSpace::Ragged { dims, .. }) => {
            if !core_shape.is_empty() {
                return Err(NdError::NotImplemented {
                    function: function.to_string(),
                    signature: format!("fixed core dims below ragged dims in '{pattern}'"),
                });
            }
            Ndt::from_dims(dims, leaf)
        }
        (true, OuterSpace::Fixed { shape, .. }) => {
            let full: Vec<usize> = shape.iter().chain(&core_shape).copied().collect();
            Ndt::fixed(&full, leaf)
        }
        (false, _) if outer.ndim() > 0 => Err(NdError::type_error(
            function,
            format!("output '{pattern}' has no '...' to carry {} broadcast dims", outer.ndim()),
        )),
        (false, _) => Ndt::fixed(&core_shape, leaf),
    }
}

/// `out=` must match the planned shape, or ragged dims, and the leaf exactly.
fn validate_out(function: &str, j: usize, given: &Ndt, fresh: &Ndt) -> Result<()> {
    let same_dims = if fresh.is_var() {
        given.dims() == fresh.dims()
    } else {
        given.is_concrete() && given.shape().is_some() && given.shape() == fresh.shape()
    };
    if !same_dims || given.leaf() != fresh.leaf() {
        return Err(NdError::argument(format!(
            "'{function}' output {j}: expected '{fresh}', given '{given}'"
        )));
    }
    Ok(())
}

fn core_layout(function: &str, dims: &[Dim]) -> Result<CoreLayout> {
    let mut shape = Vec::with_capacity(dims.len());
    let mut steps = Vec::with_capacity(dims.len());
    for d in dims {
        match d {
            Dim::Fixed { shape: n, step } => {
                shape.push(*n);
                steps.push(*step);
            }
            _ => {
                return Err(NdError::NotImplemented {
                    function: function.to_string(),
                    signature: format!("ragged core dimension '{d}'"),
                });
            }
        }
    }
    Ok(CoreLayout { shape, steps })
}
