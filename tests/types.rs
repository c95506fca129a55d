// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! Integration tests for the type algebra, promotion table and array construction

use ndufunc::{CastTable, DType, ErrorKind, Field, Graph, NdArray, Ndt, NdtBuilder, Signature};
use rstest::rstest;

#[rstest]
#[case("int64")]
#[case("?float32")]
#[case("2 * 3 * uint8")]
#[case("!2 * 3 * float64")]
#[case("fixed(shape=2, step=10) * uint8")]
#[case("3 * ?complex128")]
#[case("var(offsets=[0, 2]) * var(offsets=[0, 4, 11]) * float64")]
#[case("var * var * int8")]
#[case("... * N * M * T")]
#[case("var... * float64")]
#[case("(int8, int64, pack=1)")]
#[case("(uint16, (complex64), align=8)")]
#[case("{a : int8, b : 2 * float32}")]
#[case("&int32")]
#[case("Pair((int8, int8))")]
#[case("string")]
fn test_serialization_round_trip(#[case] text: &str) {
    let t: Ndt = text.parse().unwrap();
    let back = Ndt::deserialize(&t.serialize()).unwrap();
    assert_eq!(back, t);
    assert_eq!(back.serialize(), t.serialize());
}

#[test]
fn test_promotion_preserves_optional() {
    let casts = CastTable::maxcast();
    for d in DType::ALL {
        let plain = casts.promote(&Ndt::primitive(d)).unwrap();
        let opt = casts.promote(&Ndt::optional(d)).unwrap();
        assert_eq!(opt, plain.to_optional().unwrap(), "{d}");
        assert_eq!(casts.promote(&plain).unwrap(), plain, "{d}");
    }
    assert_eq!(casts.target(DType::Int8), DType::Int64);
    assert_eq!(casts.target(DType::UInt16), DType::UInt64);
    assert_eq!(casts.target(DType::BFloat16), DType::Float64);
    assert_eq!(casts.target(DType::Complex32), DType::Complex128);
    assert_eq!(casts.promote(&"?int8".parse().unwrap()).unwrap().to_string(), "?int64");
}

#[rstest]
#[case("3 *", ErrorKind::TypeSyntax)]
#[case("int7", ErrorKind::TypeSyntax)]
#[case("(int8, int64, pack=1, align=16)", ErrorKind::TypeConstraint)]
#[case("var(offsets=[0, 3]) * var(offsets=[0, 4, 11]) * float64", ErrorKind::TypeConstraint)]
#[case("2 * var * float64", ErrorKind::TypeConstraint)]
#[case("var(offsets=[1, 2]) * var(offsets=[0, 3, 5]) * int8", ErrorKind::TypeConstraint)]
#[case("var(offsets=[0, 2]) * var(offsets=[1, 3, 5]) * int8", ErrorKind::TypeConstraint)]
#[case("9223372036854775807 * 9223372036854775807 * int64", ErrorKind::TypeConstraint)]
#[case("fixed(shape=4, step=9223372036854775807) * int64", ErrorKind::TypeConstraint)]
#[case("3 * 4611686018427387904 * int8", ErrorKind::TypeConstraint)]
#[case("99999999999999999999 * int8", ErrorKind::TypeSyntax)]
fn test_type_errors(#[case] text: &str, #[case] kind: ErrorKind) {
    assert_eq!(text.parse::<Ndt>().unwrap_err().kind(), kind);
}

#[test]
fn test_signature_display() {
    let sig: Signature = "... * N * uint8, ... * N * uint8 -> ... * float64".parse().unwrap();
    assert_eq!((sig.nin(), sig.nout()), (2, 1));
    assert_eq!(sig.to_string(), "... * N * uint8, ... * N * uint8 -> ... * float64");
}

#[test]
fn test_ragged_partition() {
    let ok = NdArray::ragged(&[vec![0, 2], vec![0, 3, 5]], vec![1u8, 2, 3, 4, 5]).unwrap();
    assert_eq!(ok.to_string(), "[[1, 2, 3], [4, 5]]");
    assert_eq!(ok.var_lists().map(|l| l.len()), Some(2));

    let e = NdArray::ragged(&[vec![0, 2], vec![0, 3, 6]], vec![1u8, 2, 3, 4, 5]).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Value);
    let e = NdArray::ragged(&[vec![0, 3], vec![0, 3, 5]], vec![1u8, 2, 3, 4, 5]).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Value);
}

#[test]
fn test_graph_paths() {
    let g = Graph::new(&[vec![(1, 1.2), (2, 4.4)], vec![(2, 2.2)], vec![(1, 2.3)]]).unwrap();
    let expected = ["[[0], [0, 1], [0, 1, 2]]", "[[], [1], [1, 2]]", "[[], [2, 1], [2]]"];
    for (start, want) in expected.iter().enumerate() {
        let paths = g.shortest_paths(start).unwrap();
        assert_eq!(paths.to_string(), *want);
        assert!(paths.ndt().is_var());
        assert_eq!(paths.dtype(), DType::Int64);
    }

    let e = Graph::new(&[vec![(0, 1.2)], vec![(2, 2.2), (1, 0.1)]]).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Value);
}

#[test]
fn test_huge_abstract_extents_parse() {
    let t: Ndt = "9223372036854775807 * 9223372036854775807 * T".parse().unwrap();
    assert!(!t.is_concrete());
    let t: Ndt = "4611686018427387903 * int8".parse().unwrap();
    assert_eq!(t.datasize(), 4611686018427387903);
}

#[test]
fn test_record_field_names() {
    let mut b = NdtBuilder::new();
    let a = b.scalar(DType::Int8);
    let c = b.scalar(DType::Float32);
    let id = b
        .record(vec![Field::new(Some("a_1"), a, None), Field::new(Some("_b"), c, None)], None, None)
        .unwrap();
    let t = b.finish(id);
    assert_eq!(Ndt::deserialize(&t.serialize()).unwrap(), t);

    for bad in ["a b", "", "1a", "x-y"] {
        let mut b = NdtBuilder::new();
        let a = b.scalar(DType::Int8);
        let e = b.record(vec![Field::new(Some(bad), a, None)], None, None).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::TypeConstraint, "{bad:?}");
    }
}
