// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Signature Module
//!
//! Function types of the form `inputs -> outputs`, e.g.
//! `... * N * M * float64 -> ... * P * float64`.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use crate::aliases::Result;
use crate::enums::error::NdError;
use crate::structs::ndt::{Dim, Ndt};
use crate::structs::parser;

/// Input and output type patterns of a function.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    inputs: Vec<Ndt>,
    outputs: Vec<Ndt>,
}

impl Signature {
    /// Validates and wraps the given patterns.
    ///
    /// An ellipsis must be the outermost dimension, and outputs may only use an
    /// ellipsis when some input has one.
    pub fn new(inputs: Vec<Ndt>, outputs: Vec<Ndt>) -> Result<Self> {
        if outputs.is_empty() {
            return Err(NdError::constraint("a signature needs at least one output"));
        }
        for t in inputs.iter().chain(&outputs) {
            let dims = t.dims();
            if dims.iter().skip(1).any(|d| matches!(d, Dim::Ellipsis { .. })) {
                return Err(NdError::constraint(format!("ellipsis must be the outermost dimension in '{t}'")));
            }
        }
        let sig = Self { inputs, outputs };
        if sig.outputs.iter().any(has_ellipsis) && !sig.inputs.iter().any(has_ellipsis) {
            return Err(NdError::constraint("output ellipsis is not bound by any input"));
        }
        Ok(sig)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let (inputs, outputs) = parser::parse_signature(text)?;
        Self::new(inputs, outputs)
    }

    #[inline]
    pub fn inputs(&self) -> &[Ndt] {
        &self.inputs
    }

    #[inline]
    pub fn outputs(&self) -> &[Ndt] {
        &self.outputs
    }

    #[inline]
    pub fn nin(&self) -> usize {
        self.inputs.len()
    }

    #[inline]
    pub fn nout(&self) -> usize {
        self.outputs.len()
    }

    /// True when any input is matched against a leading ellipsis.
    pub fn has_ellipsis(&self) -> bool {
        self.inputs.iter().any(has_ellipsis)
    }

    /// Symbolic dimensions used by outputs but bound by no input.
    pub fn free_symbols(&self) -> Vec<Arc<str>> {
        let bound: BTreeSet<Arc<str>> = self.inputs.iter().flat_map(symbols).collect();
        let free: BTreeSet<Arc<str>> = self
            .outputs
            .iter()
            .flat_map(symbols)
            .filter(|s| !bound.contains(s))
            .collect();
        free.into_iter().collect()
    }
}

fn has_ellipsis(t: &Ndt) -> bool {
    matches!(t.dims().first(), Some(Dim::Ellipsis { .. }))
}

fn symbols(t: &Ndt) -> Vec<Arc<str>> {
    t.dims()
        .into_iter()
        .filter_map(|d| match d {
            Dim::Symbolic(n) => Some(n),
            _ => None,
        })
        .collect()
}

impl Display for Signature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let join = |ts: &[Ndt]| ts.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", ");
        write!(f, "{} -> {}", join(&self.inputs), join(&self.outputs))
    }
}

impl FromStr for Signature {
    type Err = NdError;

    fn from_str(s: &str) -> Result<Self> {
        Signature::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_parse_and_display() {
        let s: Signature = "... * N * uint8, ... * N * uint8 -> ... * N * float64".parse().unwrap();
        assert_eq!(s.nin(), 2);
        assert_eq!(s.nout(), 1);
        assert!(s.has_ellipsis());
        assert_eq!(s.to_string(), "... * N * uint8, ... * N * uint8 -> ... * N * float64");
    }

    #[test]
    fn test_free_symbols() {
        let s = Signature::parse("N * M * float64 -> P * float64").unwrap();
        assert_eq!(s.free_symbols(), vec![Arc::<str>::from("P")]);
    }

    #[test]
    fn test_rejects_unbound_output_ellipsis() {
        let e = Signature::parse("uint8 -> ... * float64").unwrap_err();
        assert_eq!(e.kind(), ErrorKind::TypeConstraint);
        let e = Signature::parse("N * ... * uint8 -> float64").unwrap_err();
        assert_eq!(e.kind(), ErrorKind::TypeConstraint);
    }
}
