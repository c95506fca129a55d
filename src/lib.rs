// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # ndufunc
//!
//! Typed, shape-polymorphic array function dispatch.
//!
//! A function is registered as a *gufunc*: a datashape signature such as
//! `... * N * uint8 -> ... * N * float64` plus a table of dtype rows, each with a
//! kernel. Calling it on concrete arrays:
//!
//! 1. matches the argument types against the signature, binding `...`, `N` and
//!    dtype variables,
//! 2. resolves the kernel row, promoting dtypes through safe casts,
//! 3. broadcasts the outer dimensions, fixed or ragged,
//! 4. assembles an [`ApplySpec`] and validates any `out=` arrays,
//! 5. runs the kernel over the outer space, propagating missing values.
//!
//! ```rust
//! use ndufunc::{apply, KernelRegistry, NdArray};
//!
//! let x = NdArray::from_options(vec![Some(1.0f64), None, Some(4.0)]);
//! let y = apply(KernelRegistry::global(), "sqrt", &[&x]).unwrap();
//! assert_eq!(y[0].to_string(), "[1, None, 2]");
//! ```
//!
//! ## Features
//! - `parallel_proc`: splits the outer iteration space across the rayon pool.
//! - `fast_hash`: `ahash` maps in the kernel registry.

pub mod enums {
    pub mod dtype;
    pub mod error;
    pub mod scalar;
    pub mod strategy;
}

pub mod structs {
    pub mod apply_spec;
    pub mod bitmask;
    pub mod buffer;
    pub mod complex;
    pub mod graph;
    pub mod ndarray;
    pub mod ndt;
    pub mod parser;
    pub mod signature;
}

pub mod kernels {
    pub mod arithmetic;
    pub mod comparison;
    pub mod math;
    pub mod pdist;
    pub mod reduce;
    pub mod registry;
    pub mod routing;
}

pub mod traits {
    pub mod type_unions;
}

pub mod aliases;
pub mod macros;
pub mod utils;

pub use enums::dtype::{DType, DTypeKind, PROMOTION_ORDER};
pub use enums::error::{ErrorKind, KernelError, NdError};
pub use enums::scalar::Scalar;
pub use enums::strategy::{ApplyFlags, Strategy};
pub use structs::apply_spec::ApplySpec;
pub use structs::bitmask::Bitmask;
pub use structs::buffer::Buffer;
pub use structs::complex::Complex;
pub use structs::graph::Graph;
pub use structs::ndarray::NdArray;
pub use structs::ndt::{Dim, Field, NodeKind, Ndt, NdtBuilder};
pub use structs::signature::Signature;
pub use traits::type_unions::Element;

pub use kernels::reduce::{NullRule, ReduceOp, reduce};
pub use kernels::registry::{CastPolicy, CoreBlock, Gufunc, Kernel, KernelRegistry, KernelRow, RegistryBuilder};
pub use kernels::routing::{CastTable, apply, apply_out, apply_spec};
