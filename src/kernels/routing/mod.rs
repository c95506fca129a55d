// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Routing Module
//!
//! Signature dispatch for kernel calls: matching argument types against a
//! signature, dtype row resolution, broadcasting, plan assembly and execution.

pub mod broadcast;
pub mod cast;
pub mod execute;
pub mod matcher;
pub mod plan;

pub use broadcast::{OuterSpace, broadcast, classify};
pub use cast::{CastTable, Resolution, resolve};
pub use execute::{apply, apply_out, run};
pub use matcher::{Bindings, LeafMode, match_inputs};
pub use plan::{CoreLayout, Plan, apply_spec, build};
