// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Pairwise Distance
//!
//! `euclidian_pdist`: the condensed Euclidean distance vector between the rows of
//! an `N * M` matrix, ordered `(0,1), (0,2) .. (1,2) ..`.
//!
//! Exact dtype policy: only `float64` is accepted, other dtypes are a type error.
//! Rows must have at least one column. The output length `P = N(N-1)/2` is derived
//! from the bound `N`.

use std::sync::Arc;

use crate::aliases::{KernelResult, Result};
use crate::enums::dtype::DType;
use crate::enums::error::{KernelError, NdError};
use crate::enums::scalar::Scalar;
use crate::kernels::registry::{CastPolicy, CoreBlock, Gufunc, Kernel};
use crate::kernels::routing::matcher::Bindings;

fn check(b: &Bindings) -> Result<()> {
    match b.symbol("M") {
        Some(0) => Err(NdError::value("euclidian_pdist needs at least one column")),
        _ => Ok(()),
    }
}

fn derive(b: &Bindings) -> Result<Vec<(Arc<str>, usize)>> {
    let n = b.symbol("N").unwrap_or(0);
    Ok(vec![(Arc::from("P"), n * n.saturating_sub(1) / 2)])
}

fn euclidian_pdist(inputs: &[CoreBlock], outputs: &mut [CoreBlock]) -> KernelResult {
    let x = &inputs[0];
    let (n, m) = match x.shape[..] {
        [n, m] => (n, m),
        _ => return Err(KernelError::Failed(format!("expected a matrix, found shape {:?}", x.shape))),
    };
    let rows: Vec<Vec<f64>> = x.values.chunks(m).map(|r| r.iter().map(Scalar::to_f64).collect()).collect();
    let out = &mut outputs[0].values;
    let mut k = 0;
    for i in 0..n {
        for j in i + 1..n {
            let d: f64 = rows[i].iter().zip(&rows[j]).map(|(a, b)| (a - b) * (a - b)).sum();
            out[k] = Scalar::Float64(d.sqrt());
            k += 1;
        }
    }
    Ok(())
}

pub(crate) fn gufunc() -> Result<Gufunc> {
    Ok(Gufunc::new("euclidian_pdist", "N * M * float64 -> P * float64")?
        .row(&[DType::Float64], &[DType::Float64], Kernel::Core(euclidian_pdist))
        .policy(CastPolicy::Exact)
        .check(check)
        .derive(derive))
}
