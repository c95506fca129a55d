// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Matcher Module
//!
//! Matches concrete argument types against the input patterns of a [`Signature`],
//! binding ellipses, dimension variables and dtype variables.
//!
//! Dimensions are compared from the outermost inward. A leading ellipsis takes
//! whatever prefix is left once the core dims of the pattern are accounted for;
//! these prefixes are the *outer* dimensions the broadcast planner works on.
//!
//! Errors report the first failing argument and never return partial bindings.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::trace;

use crate::aliases::Result;
use crate::enums::error::NdError;
use crate::structs::ndt::{Dim, NodeKind, Ndt};
use crate::structs::signature::Signature;

/// How dtype leaves are compared.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LeafMode {
    /// Leaves are left to the cast resolver.
    DimsOnly,
    /// Leaves must equal the pattern, binding dtype variables such as `T`.
    Exact,
}

/// Result of a successful match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    /// Dimension variables such as `N`.
    pub symbols: BTreeMap<Arc<str>, usize>,
    /// Dtype variables such as `T`, without any `?`.
    pub typevars: BTreeMap<Arc<str>, Ndt>,
    /// Named ellipses such as `Dims...`.
    pub ellipses: BTreeMap<Arc<str>, Vec<Dim>>,
    /// Per input, the dims taken by its leading ellipsis.
    pub outer: Vec<Vec<Dim>>,
    /// Per input, the dims matched by the core of the pattern.
    pub inner: Vec<Vec<Dim>>,
    /// Per input, the leaf type.
    pub leaves: Vec<Ndt>,
}

impl Bindings {
    /// Size bound to a dimension variable.
    #[inline]
    pub fn symbol(&self, name: &str) -> Option<usize> {
        self.symbols.get(name).copied()
    }
}

fn shape_error(arg: usize, pattern: &Ndt, found: &Ndt) -> NdError {
    NdError::Shape {
        arg,
        expected: pattern.to_string(),
        found: found.to_string(),
    }
}

/// Matches `args` against the inputs of `sig`.
pub fn match_inputs(function: &str, sig: &Signature, args: &[Ndt], mode: LeafMode) -> Result<Bindings> {
    if args.len() != sig.nin() {
        return Err(NdError::type_error(
            function,
            format!("expected {} arguments, got {}", sig.nin(), args.len()),
        ));
    }
    let mut b = Bindings::default();
    for (i, (pattern, arg)) in sig.inputs().iter().zip(args).enumerate() {
        if !arg.is_concrete() {
            return Err(NdError::value(format!("argument {i} has abstract type '{arg}'")));
        }
        match_one(function, i, pattern, arg, mode, &mut b).inspect_err(|e| {
            trace!("{function}: argument {i} '{arg}' rejected by '{pattern}': {e}");
        })?;
    }
    Ok(b)
}

fn match_one(function: &str, i: usize, pattern: &Ndt, arg: &Ndt, mode: LeafMode, b: &mut Bindings) -> Result<()> {
    let pdims = pattern.dims();
    let adims = arg.dims();

    let (ellipsis, core) = match pdims.split_first() {
        Some((Dim::Ellipsis { name, var }, rest)) => (Some((name.clone(), *var)), rest),
        _ => (None, &pdims[..]),
    };

    let split = match &ellipsis {
        Some(_) if adims.len() < core.len() => return Err(shape_error(i, pattern, arg)),
        Some(_) => adims.len() - core.len(),
        None if adims.len() != core.len() => return Err(shape_error(i, pattern, arg)),
        None => 0,
    };
    let (outer, inner) = adims.split_at(split);

    if let Some((name, var)) = &ellipsis {
        if *var && outer.iter().any(|d| !d.is_var()) {
            return Err(shape_error(i, pattern, arg));
        }
        if let Some(name) = name {
            match b.ellipses.get(name) {
                Some(bound) if bound.as_slice() != outer => return Err(shape_error(i, pattern, arg)),
                Some(_) => {}
                None => {
                    b.ellipses.insert(name.clone(), outer.to_vec());
                }
            }
        }
    }

    for (p, a) in core.iter().zip(inner) {
        match (p, a) {
            (Dim::Fixed { shape: want, .. }, Dim::Fixed { shape: got, .. }) if want == got => {}
            (Dim::Symbolic(name), Dim::Fixed { shape, .. }) => match b.symbols.get(name) {
                Some(&bound) if bound != *shape => {
                    return Err(NdError::DimensionMismatch {
                        arg: i,
                        symbol: name.to_string(),
                        bound,
                        found: *shape,
                    });
                }
                Some(_) => {}
                None => {
                    b.symbols.insert(name.clone(), *shape);
                }
            },
            (Dim::Var { .. }, Dim::Var { .. }) => {}
            _ => return Err(shape_error(i, pattern, arg)),
        }
    }

    let leaf = arg.leaf();
    if mode == LeafMode::Exact {
        match_leaf(function, i, &pattern.leaf(), &leaf, b)?;
    }

    b.outer.push(outer.to_vec());
    b.inner.push(inner.to_vec());
    b.leaves.push(leaf);
    Ok(())
}

fn match_leaf(function: &str, i: usize, pattern: &Ndt, leaf: &Ndt, b: &mut Bindings) -> Result<()> {
    let value = leaf.strip_optional();
    let want = pattern.strip_optional();
    if let NodeKind::TypeVar(name) = want.kind() {
        return match b.typevars.get(name) {
            Some(bound) if *bound != value => Err(NdError::type_error(
                function,
                format!("argument {i}: '{name}' is bound to '{bound}' but found '{value}'"),
            )),
            Some(_) => Ok(()),
            None => {
                b.typevars.insert(name.clone(), value);
                Ok(())
            }
        };
    }
    if want != value {
        return Err(NdError::type_error(
            function,
            format!("argument {i}: expected '{want}', found '{value}'"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn sig(s: &str) -> Signature {
        Signature::parse(s).unwrap()
    }

    fn t(s: &str) -> Ndt {
        s.parse().unwrap()
    }

    #[test]
    fn test_ellipsis_takes_prefix() {
        let s = sig("... * N * float64 -> ... * float64");
        let b = match_inputs("f", &s, &[t("2 * 3 * 4 * float64")], LeafMode::DimsOnly).unwrap();
        assert_eq!(b.symbol("N"), Some(4));
        assert_eq!(b.outer[0].len(), 2);
        assert_eq!(b.inner[0].len(), 1);
    }

    #[test]
    fn test_symbol_unification() {
        let s = sig("N * float64, N * float64 -> float64");
        let e = match_inputs("dot", &s, &[t("3 * float64"), t("4 * float64")], LeafMode::DimsOnly).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::DimensionMismatch);
        assert!(e.is_shape_error());
    }

    #[test]
    fn test_var_against_fixed_pattern() {
        let s = sig("N * M * float64 -> P * float64");
        let e = match_inputs("f", &s, &[t("var(offsets=[0, 2]) * var(offsets=[0, 1, 3]) * float64")], LeafMode::DimsOnly)
            .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Shape);
    }

    #[test]
    fn test_var_ellipsis_requires_var() {
        let s = sig("var... * float64 -> var... * float64");
        assert!(match_inputs("f", &s, &[t("2 * float64")], LeafMode::DimsOnly).is_err());
        assert!(match_inputs("f", &s, &[t("var(offsets=[0, 2]) * float64")], LeafMode::DimsOnly).is_ok());
    }

    #[test]
    fn test_arity_and_abstract_args() {
        let s = sig("int8 -> int8");
        let e = match_inputs("f", &s, &[], LeafMode::DimsOnly).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Type);
        let e = match_inputs("f", &s, &[t("N * int8")], LeafMode::DimsOnly).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Value);
    }

    #[test]
    fn test_exact_leaves_bind_typevars() {
        let s = sig("... * T, ... * T -> ... * T");
        let b = match_inputs("f", &s, &[t("2 * ?int8"), t("int8")], LeafMode::Exact).unwrap();
        assert_eq!(b.typevars.get("T"), Some(&t("int8")));
        let e = match_inputs("f", &s, &[t("2 * int8"), t("int16")], LeafMode::Exact).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Type);
    }
}
