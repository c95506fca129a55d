// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! Integration tests for plan inspection through `apply_spec`

use ndufunc::{ApplyFlags, ErrorKind, Ndt, Strategy, apply_spec};
use rstest::rstest;

fn t(s: &str) -> Ndt {
    s.parse().unwrap()
}

#[rstest]
#[case("uint8 -> float64", "uint8", "C|Fortran|Strided|Xnd", 0, "float64")]
#[case("... * uint8 -> ... * float64", "2 * uint8", "OptZ|OptC|OptS|C|Fortran|Strided|Xnd", 1, "2 * float64")]
#[case("... * uint8 -> ... * float64", "!2 * 3 * uint8", "OptS|C|Fortran|Strided|Xnd", 2, "2 * 3 * float64")]
#[case(
    "... * uint8 -> ... * float64",
    "fixed(shape=2, step=10) * uint8",
    "OptS|C|Fortran|Strided|Xnd",
    1,
    "2 * float64"
)]
#[case(
    "... * N * uint8 -> ... * N * float64",
    "2 * 3 * uint8",
    "OptZ|OptC|OptS|C|Fortran|Strided|Xnd",
    1,
    "2 * 3 * float64"
)]
#[case("... * N * M * uint8 -> ... * N * M * float64", "2 * 3 * uint8", "C|Strided|Xnd", 0, "2 * 3 * float64")]
#[case(
    "var... * float64 -> var... * float64",
    "var(offsets=[0,2]) * var(offsets=[0,4,11]) * float64",
    "Xnd",
    2,
    "var(offsets=[0,2]) * var(offsets=[0,4,11]) * float64"
)]
fn test_unary_table(
    #[case] sig: &str,
    #[case] arg: &str,
    #[case] flags: &str,
    #[case] outer_dims: usize,
    #[case] out: &str,
) {
    let spec = apply_spec(sig, &[t(arg)]).unwrap();
    assert_eq!(spec.flags.to_string(), flags);
    assert_eq!(spec.outer_dims, outer_dims);
    assert_eq!((spec.nin, spec.nout, spec.nargs()), (1, 1, 2));
    assert_eq!(spec.types, vec![t(arg), t(out)]);
}

#[test]
fn test_scalar_call_is_degenerate() {
    let spec = apply_spec("uint8 -> float64", &[t("uint8")]).unwrap();
    assert_eq!(spec.strategy(), Strategy::Scalar);
    assert_eq!(
        spec.to_string(),
        "ApplySpec(flags='C|Fortran|Strided|Xnd', outer_dims=0, nin=1, nout=1, nargs=2, types=['uint8', 'float64'])"
    );
}

#[test]
fn test_strategy_precedence() {
    let contiguous = apply_spec("... * uint8 -> ... * float64", &[t("2 * uint8")]).unwrap();
    assert_eq!(contiguous.strategy(), Strategy::OptZ);
    let strided = apply_spec("... * uint8 -> ... * float64", &[t("fixed(shape=2, step=10) * uint8")]).unwrap();
    assert_eq!(strided.strategy(), Strategy::OptS);
    let core = apply_spec("... * N * M * uint8 -> ... * N * M * float64", &[t("2 * 3 * uint8")]).unwrap();
    assert_eq!(core.strategy(), Strategy::C);
    let ragged = apply_spec("var... * float64 -> var... * float64", &[t("var(offsets=[0,1]) * float64")]).unwrap();
    assert_eq!(ragged.strategy(), Strategy::Xnd);
}

#[test]
fn test_binary_broadcast() {
    let spec = apply_spec("... * T, ... * T -> ... * T", &[t("4 * 3 * int32"), t("3 * int32")]).unwrap();
    assert_eq!(spec.outer_dims, 2);
    assert_eq!(spec.outputs(), &[t("4 * 3 * int32")]);
    assert!(spec.flags.contains(ApplyFlags::OPT_S));
    assert!(!spec.flags.contains(ApplyFlags::OPT_C));

    let scalar = apply_spec("... * T, ... * T -> ... * T", &[t("4 * 3 * int32"), t("int32")]).unwrap();
    assert!(scalar.flags.contains(ApplyFlags::OPT_C));
    assert!(!scalar.flags.contains(ApplyFlags::OPT_Z));

    let same = apply_spec("... * T, ... * T -> ... * T", &[t("3 * int32"), t("3 * int32")]).unwrap();
    assert!(same.flags.contains(ApplyFlags::OPT_Z));
}

#[test]
fn test_optional_leaf_propagates() {
    let spec = apply_spec("... * T -> ... * T", &[t("2 * ?int16")]).unwrap();
    assert_eq!(spec.outputs(), &[t("2 * ?int16")]);
    let spec = apply_spec("... * int8, ... * int8 -> ... * float32", &[t("2 * ?int8"), t("2 * int8")]).unwrap();
    assert_eq!(spec.outputs(), &[t("2 * ?float32")]);
}

#[test]
fn test_plan_errors() {
    let e = apply_spec("... * uint8 -> ... * float64", &[t("2 * int8")]).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Type);

    let e = apply_spec("N * T, N * T -> N * T", &[t("2 * int8"), t("3 * int8")]).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::DimensionMismatch);
    assert!(e.is_shape_error());

    let e = apply_spec("... * T, ... * T -> ... * T", &[t("2 * int8"), t("3 * int8")]).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Shape);

    let e = apply_spec("N * M * T -> T", &[t("3 * int8")]).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Shape);

    let e = apply_spec("... * T -> ... * T", &[t("... * int8")]).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Value);

    let e = apply_spec("T, T -> T", &[t("int8")]).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Type);
}
