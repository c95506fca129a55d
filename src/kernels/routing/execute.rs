// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Execute Module - *Kernel Driver*
//!
//! Walks the outer iteration space of a [`Plan`] and invokes the selected kernel.
//!
//! ## Null propagation
//! Kernels never see missing values. When any input element (or any element of an
//! input core block) is null, every output of that position is null and the kernel
//! is skipped.
//!
//! ## Commit
//! Results are computed into a staging area first and written to the output
//! buffers only once every position succeeded, so a failing kernel leaves
//! caller-provided outputs untouched.
//!
//! ## Addressing
//! Under [`Strategy::OptZ`] every argument is dense and equally shaped, so the base
//! of outer position `p` is `origin + p * block`. Every other strategy unravels `p`
//! and applies the broadcast steps.
//!
//! With the `parallel_proc` feature the outer positions are split into near-equal
//! contiguous chunks evaluated on the rayon pool. Every position writes only its
//! own output elements.

use log::debug;
#[cfg(feature = "parallel_proc")]
use rayon::prelude::*;

use crate::aliases::Result;
use crate::enums::scalar::Scalar;
use crate::enums::strategy::Strategy;
use crate::kernels::registry::{CoreBlock, Kernel, KernelRegistry};
use crate::kernels::routing::broadcast::OuterSpace;
use crate::kernels::routing::plan::{Plan, build};
use crate::structs::ndarray::NdArray;
use crate::structs::ndt::Ndt;
use crate::utils::{block_offsets, unravel};

/// Output index, physical position and value of one computed element.
type Staged = (usize, usize, Option<Scalar>);

/// Applies the function `name` to `inputs`, allocating fresh outputs.
///
/// ```rust
/// use ndufunc::{apply, KernelRegistry, NdArray};
///
/// let a = NdArray::from_vec(vec![1i32, 2, 3]);
/// let b = NdArray::from_vec(vec![10i32, 20, 30]);
/// let out = apply(KernelRegistry::global(), "add", &[&a, &b]).unwrap();
/// assert_eq!(out[0].to_vec::<i32>(), Some(vec![11, 22, 33]));
/// ```
pub fn apply(registry: &KernelRegistry, name: &str, inputs: &[&NdArray]) -> Result<Vec<NdArray>> {
    let g = registry.get(name)?;
    let types: Vec<Ndt> = inputs.iter().map(|a| a.ndt().clone()).collect();
    let plan = build(g, &types, None)?;
    let mut outputs = plan
        .spec
        .outputs()
        .iter()
        .cloned()
        .map(NdArray::empty)
        .collect::<Result<Vec<_>>>()?;
    {
        let mut refs: Vec<&mut NdArray> = outputs.iter_mut().collect();
        run(&plan, inputs, &mut refs)?;
    }
    Ok(outputs)
}

/// Applies the function `name` writing into caller-provided outputs.
///
/// The outputs must match the planned shapes and dtypes exactly, otherwise an
/// argument error is returned before anything is written. On success the same
/// references are handed back.
pub fn apply_out<'o>(
    registry: &KernelRegistry,
    name: &str,
    inputs: &[&NdArray],
    mut out: Vec<&'o mut NdArray>,
) -> Result<Vec<&'o mut NdArray>> {
    let g = registry.get(name)?;
    let types: Vec<Ndt> = inputs.iter().map(|a| a.ndt().clone()).collect();
    let out_types: Vec<Ndt> = out.iter().map(|a| a.ndt().clone()).collect();
    let plan = build(g, &types, Some(&out_types))?;
    run(&plan, inputs, &mut out)?;
    Ok(out)
}

/// Runs a plan over borrowed inputs and outputs.
///
/// `OptZ` plans address every argument as one flat run. `OptC`, `OptS`, `C`,
/// `Fortran`, `Strided` and `Xnd` plans share the stepped walker.
pub fn run(plan: &Plan, inputs: &[&NdArray], outputs: &mut [&mut NdArray]) -> Result<()> {
    if plan.empty {
        debug!("empty iteration space, kernel not invoked");
        return Ok(());
    }
    let origins: Vec<usize> = inputs
        .iter()
        .map(|a| a.offset())
        .chain(outputs.iter().map(|a| a.offset()))
        .collect();
    let positions = plan.outer.len();
    let blocks: Option<Vec<usize>> = (plan.spec.strategy() == Strategy::OptZ)
        .then(|| plan.cores.iter().map(|c| c.shape.iter().product()).collect());
    let walker = Walker {
        plan,
        inputs,
        origins: &origins,
        blocks: blocks.as_deref(),
    };

    #[cfg(feature = "parallel_proc")]
    let staged = {
        let chunk = positions.div_ceil(rayon::current_num_threads().max(1)).max(1);
        debug!("strategy {}: {positions} positions in chunks of {chunk}", plan.spec.strategy());
        (0..positions.div_ceil(chunk))
            .into_par_iter()
            .map(|c| -> Result<Vec<Staged>> {
                let end = ((c + 1) * chunk).min(positions);
                let mut part = Vec::new();
                for p in c * chunk..end {
                    walker.position(p, &mut part)?;
                }
                Ok(part)
            })
            .collect::<Result<Vec<Vec<Staged>>>>()?
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
    };

    #[cfg(not(feature = "parallel_proc"))]
    let staged = {
        debug!("strategy {}: {positions} positions", plan.spec.strategy());
        let mut all = Vec::with_capacity(positions * plan.spec.nout);
        for p in 0..positions {
            walker.position(p, &mut all)?;
        }
        all
    };

    for (j, pos, value) in staged {
        outputs[j].write(pos, value);
    }
    Ok(())
}

struct Walker<'a> {
    plan: &'a Plan,
    inputs: &'a [&'a NdArray],
    origins: &'a [usize],
    /// Elements per outer position of each argument, set for dense plans.
    blocks: Option<&'a [usize]>,
}

impl Walker<'_> {
    /// Physical base position of every argument at outer position `p`.
    fn bases(&self, p: usize) -> Vec<usize> {
        if let Some(blocks) = self.blocks {
            return self.origins.iter().zip(blocks).map(|(&origin, &b)| origin + p * b).collect();
        }
        match &self.plan.outer {
            OuterSpace::Fixed { shape, steps, .. } => {
                let mut index = vec![0usize; shape.len()];
                unravel(p, shape, &mut index);
                steps
                    .iter()
                    .zip(self.origins)
                    .map(|(s, &origin)| {
                        let d: isize = index.iter().zip(s).map(|(&i, &st)| i as isize * st).sum();
                        (origin as isize + d) as usize
                    })
                    .collect()
            }
            OuterSpace::Ragged { range, ragged, .. } => ragged
                .iter()
                .zip(self.origins)
                .map(|(&r, &origin)| if r { range.0 + p } else { origin })
                .collect(),
        }
    }

    fn position(&self, p: usize, staged: &mut Vec<Staged>) -> Result<()> {
        let plan = self.plan;
        let nin = self.inputs.len();
        let bases = self.bases(p);
        match plan.kernel {
            Kernel::Elementwise(f) => {
                let mut args = Vec::with_capacity(nin);
                for (i, a) in self.inputs.iter().enumerate() {
                    match a.read(bases[i]) {
                        Some(v) => args.push(v.cast(plan.in_dtypes[i])),
                        None => {
                            for j in 0..plan.out_dtypes.len() {
                                staged.push((j, bases[nin + j], None));
                            }
                            return Ok(());
                        }
                    }
                }
                let mut outs: Vec<Scalar> = plan.out_dtypes.iter().map(|&d| Scalar::zero(d)).collect();
                f(&args, &mut outs)?;
                for (j, v) in outs.into_iter().enumerate() {
                    staged.push((j, bases[nin + j], Some(v)));
                }
            }
            Kernel::Core(f) => {
                let out_offsets: Vec<Vec<usize>> = (0..plan.out_dtypes.len())
                    .map(|j| {
                        let core = &plan.cores[nin + j];
                        block_offsets(bases[nin + j], &core.shape, &core.steps)
                    })
                    .collect();
                let mut blocks = Vec::with_capacity(nin);
                for (i, a) in self.inputs.iter().enumerate() {
                    let core = &plan.cores[i];
                    let values: Option<Vec<Scalar>> = block_offsets(bases[i], &core.shape, &core.steps)
                        .into_iter()
                        .map(|pos| a.read(pos).map(|v| v.cast(plan.in_dtypes[i])))
                        .collect();
                    let Some(values) = values else {
                        for (j, offsets) in out_offsets.iter().enumerate() {
                            staged.extend(offsets.iter().map(|&pos| (j, pos, None)));
                        }
                        return Ok(());
                    };
                    blocks.push(CoreBlock {
                        shape: core.shape.clone(),
                        values,
                    });
                }
                let mut outs: Vec<CoreBlock> = out_offsets
                    .iter()
                    .zip(&plan.out_dtypes)
                    .enumerate()
                    .map(|(j, (offsets, &d))| CoreBlock {
                        shape: plan.cores[nin + j].shape.clone(),
                        values: vec![Scalar::zero(d); offsets.len()],
                    })
                    .collect();
                f(&blocks, &mut outs)?;
                for (j, (block, offsets)) in outs.into_iter().zip(&out_offsets).enumerate() {
                    staged.extend(offsets.iter().zip(block.values).map(|(&pos, v)| (j, pos, Some(v))));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, KernelError};

    #[test]
    fn test_unary_null_propagation() {
        let a = NdArray::from_options(vec![Some(0.0f64), None, Some(2.0)]);
        let out = apply(KernelRegistry::global(), "sin", &[&a]).unwrap();
        assert_eq!(
            out[0].to_options::<f64>(),
            Some(vec![Some(0.0f64.sin()), None, Some(2.0f64.sin())])
        );
    }

    #[test]
    fn test_failed_kernel_leaves_out_untouched() {
        let a = NdArray::from_vec(vec![1i64, 2, 3]);
        let b = NdArray::from_vec(vec![1i64, 0, 1]);
        let mut q = NdArray::from_vec(vec![-1i64; 3]);
        let mut r = NdArray::from_vec(vec![-1i64; 3]);
        let e = apply_out(KernelRegistry::global(), "divmod", &[&a, &b], vec![&mut q, &mut r]).unwrap_err();
        assert_eq!(e, crate::NdError::Kernel(KernelError::DivisionByZero));
        assert_eq!(e.kind(), ErrorKind::Kernel);
        assert_eq!(q.to_vec::<i64>(), Some(vec![-1, -1, -1]));
    }

    #[test]
    fn test_reversed_input() {
        let ndt: Ndt = "fixed(shape=3, step=-1) * float32".parse().unwrap();
        let a = NdArray::strided(ndt, crate::Buffer::from_vec(vec![1.0f32, 4.0, 9.0]), 2, None).unwrap();
        let out = apply(KernelRegistry::global(), "sqrt", &[&a]).unwrap();
        assert_eq!(out[0].to_vec::<f32>(), Some(vec![3.0, 2.0, 1.0]));
    }

    #[test]
    fn test_dense_plan_with_offset() {
        let ndt: Ndt = "2 * 2 * int64".parse().unwrap();
        let a = NdArray::strided(ndt, crate::Buffer::from_vec(vec![0i64, 0, 1, 2, 3, 4]), 2, None).unwrap();
        let b = NdArray::from_shape_vec(&[2, 2], vec![10i64, 20, 30, 40]).unwrap();
        let plan = build(KernelRegistry::global().get("add").unwrap(), &[a.ndt().clone(), b.ndt().clone()], None)
            .unwrap();
        assert_eq!(plan.spec.strategy(), Strategy::OptZ);
        let out = apply(KernelRegistry::global(), "add", &[&a, &b]).unwrap();
        assert_eq!(out[0].to_vec::<i64>(), Some(vec![11, 22, 33, 44]));
    }
}
