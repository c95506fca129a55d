// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Registry Module - *Kernel Tables*
//!
//! Maps function names to a [`Gufunc`]: a [`Signature`] describing the dimension
//! pattern, plus the table of implemented dtype rows consulted by the cast resolver.
//!
//! ## Overview
//! - [`KernelRegistry::global`] is the process-wide registry, built once on first use
//!   and never mutated afterwards.
//! - [`KernelRegistry::builder`] assembles a custom registry, optionally starting
//!   from the built-in kernels.
//!
//! ## Example
//! ```rust
//! use ndufunc::{DType, Gufunc, Kernel, KernelRegistry, Scalar};
//!
//! fn twice(args: &[Scalar], out: &mut [Scalar]) -> ndufunc::aliases::KernelResult {
//!     if let Scalar::Int64(v) = args[0] {
//!         out[0] = Scalar::Int64(v * 2);
//!     }
//!     Ok(())
//! }
//!
//! let g = Gufunc::new("twice", "... * int64 -> ... * int64")
//!     .unwrap()
//!     .row(&[DType::Int64], &[DType::Int64], Kernel::Elementwise(twice));
//! let registry = KernelRegistry::builder().register(g).build();
//! assert!(registry.get("twice").is_ok());
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::aliases::{FnMap, KernelResult, Result};
use crate::enums::dtype::DType;
use crate::enums::error::NdError;
use crate::enums::scalar::Scalar;
use crate::kernels::routing::cast::CastTable;
use crate::kernels::routing::matcher::Bindings;
use crate::structs::signature::Signature;

/// Per-element kernel: one value per input in, one slot per output to fill.
pub type ElementwiseFn = fn(&[Scalar], &mut [Scalar]) -> KernelResult;

/// Kernel over whole core blocks: the dimensions below the broadcast prefix.
pub type CoreFn = fn(&[CoreBlock], &mut [CoreBlock]) -> KernelResult;

/// Validates bound dimensions before anything is allocated.
pub type CheckFn = fn(&Bindings) -> Result<()>;

/// Computes output dimension variables that no input binds.
pub type DeriveFn = fn(&Bindings) -> Result<Vec<(Arc<str>, usize)>>;

/// C-ordered core block handed to a [`CoreFn`].
#[derive(Debug, Clone, PartialEq)]
pub struct CoreBlock {
    pub shape: Vec<usize>,
    pub values: Vec<Scalar>,
}

impl CoreBlock {
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Kernel entry point.
#[derive(Copy, Clone)]
pub enum Kernel {
    Elementwise(ElementwiseFn),
    Core(CoreFn),
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kernel::Elementwise(_) => f.write_str("Kernel::Elementwise"),
            Kernel::Core(_) => f.write_str("Kernel::Core"),
        }
    }
}

/// One implemented dtype signature. `kernel == None` marks a row that exists but
/// has no CPU implementation.
#[derive(Clone, Debug)]
pub struct KernelRow {
    pub inputs: Vec<DType>,
    pub outputs: Vec<DType>,
    pub kernel: Option<Kernel>,
}

impl KernelRow {
    /// `int64, int64 -> float64`
    pub fn describe(&self) -> String {
        let join = |ds: &[DType]| ds.iter().map(|d| d.name()).collect::<Vec<_>>().join(", ");
        format!("{} -> {}", join(&self.inputs), join(&self.outputs))
    }
}

/// How argument dtypes without an exact row are handled.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum CastPolicy {
    /// Safe casts into the cheapest implemented row.
    #[default]
    Promote,
    /// Only exact rows match.
    Exact,
}

/// # Gufunc
///
/// Generalised function: a dimension signature plus its dtype rows.
#[derive(Clone)]
pub struct Gufunc {
    name: Arc<str>,
    signature: Signature,
    rows: Vec<KernelRow>,
    policy: CastPolicy,
    check: Option<CheckFn>,
    derive: Option<DeriveFn>,
}

impl Gufunc {
    /// Parses `signature`. Dtypes in the signature leaves are informational; the
    /// rows decide which dtypes are accepted.
    pub fn new(name: &str, signature: &str) -> Result<Self> {
        Ok(Self {
            name: Arc::from(name),
            signature: Signature::parse(signature)?,
            rows: Vec::new(),
            policy: CastPolicy::default(),
            check: None,
            derive: None,
        })
    }

    pub fn row(mut self, inputs: &[DType], outputs: &[DType], kernel: Kernel) -> Self {
        self.rows.push(KernelRow {
            inputs: inputs.to_vec(),
            outputs: outputs.to_vec(),
            kernel: Some(kernel),
        });
        self
    }

    /// Declares a row without a CPU kernel.
    pub fn unimplemented_row(mut self, inputs: &[DType], outputs: &[DType]) -> Self {
        self.rows.push(KernelRow {
            inputs: inputs.to_vec(),
            outputs: outputs.to_vec(),
            kernel: None,
        });
        self
    }

    pub fn policy(mut self, policy: CastPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn check(mut self, f: CheckFn) -> Self {
        self.check = Some(f);
        self
    }

    pub fn derive(mut self, f: DeriveFn) -> Self {
        self.derive = Some(f);
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    #[inline]
    pub fn rows(&self) -> &[KernelRow] {
        &self.rows
    }

    #[inline]
    pub fn cast_policy(&self) -> CastPolicy {
        self.policy
    }

    #[inline]
    pub(crate) fn checker(&self) -> Option<CheckFn> {
        self.check
    }

    #[inline]
    pub(crate) fn deriver(&self) -> Option<DeriveFn> {
        self.derive
    }
}

impl fmt::Debug for Gufunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gufunc")
            .field("name", &self.name)
            .field("signature", &self.signature.to_string())
            .field("rows", &self.rows)
            .field("policy", &self.policy)
            .finish()
    }
}

/// # KernelRegistry
///
/// Immutable function table plus the promotion table used for reductions.
#[derive(Debug)]
pub struct KernelRegistry {
    functions: FnMap<String, Gufunc>,
    casts: CastTable,
}

static GLOBAL: OnceLock<KernelRegistry> = OnceLock::new();

impl KernelRegistry {
    /// Registry with every built-in kernel, created on first call.
    pub fn global() -> &'static KernelRegistry {
        GLOBAL.get_or_init(|| {
            KernelRegistry::builder()
                .with_defaults()
                .expect("built-in kernel signatures are well formed")
                .build()
        })
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder {
            functions: FnMap::default(),
            casts: CastTable::maxcast(),
        }
    }

    /// Looks up a function. Unknown names are a value error.
    pub fn get(&self, name: &str) -> Result<&Gufunc> {
        self.functions
            .get(name)
            .ok_or_else(|| NdError::value(format!("no function named '{name}'")))
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    #[inline]
    pub fn casts(&self) -> &CastTable {
        &self.casts
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Assembles a [`KernelRegistry`].
pub struct RegistryBuilder {
    functions: FnMap<String, Gufunc>,
    casts: CastTable,
}

impl RegistryBuilder {
    /// Adds or replaces a function.
    pub fn register(mut self, g: Gufunc) -> Self {
        self.functions.insert(g.name().to_string(), g);
        self
    }

    /// Adds every built-in kernel.
    pub fn with_defaults(mut self) -> Result<Self> {
        let mut all = Vec::new();
        all.extend(crate::kernels::math::gufuncs()?);
        all.extend(crate::kernels::arithmetic::gufuncs()?);
        all.extend(crate::kernels::comparison::gufuncs()?);
        all.push(crate::kernels::pdist::gufunc()?);
        for g in all {
            self = self.register(g);
        }
        Ok(self)
    }

    pub fn casts(mut self, casts: CastTable) -> Self {
        self.casts = casts;
        self
    }

    pub fn build(self) -> KernelRegistry {
        KernelRegistry {
            functions: self.functions,
            casts: self.casts,
        }
    }
}
