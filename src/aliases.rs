// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Aliases Module
//!
//! Crate-wide type aliases.

use crate::enums::error::{KernelError, NdError};

/// Result type returned throughout the crate.
pub type Result<T> = std::result::Result<T, NdError>;

/// Result type returned by kernels.
pub type KernelResult = std::result::Result<(), KernelError>;

/// Map used by the kernel registry.
///
/// Uses `ahash` when the `fast_hash` feature is enabled.
#[cfg(feature = "fast_hash")]
pub type FnMap<K, V> = ahash::AHashMap<K, V>;

/// Map used by the kernel registry.
///
/// Uses `ahash` when the `fast_hash` feature is enabled.
#[cfg(not(feature = "fast_hash"))]
pub type FnMap<K, V> = std::collections::HashMap<K, V>;
