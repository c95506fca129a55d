// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! Integration tests for kernel calls through the default registry

use half::f16;
use ndufunc::aliases::KernelResult;
use ndufunc::{
    Complex, CoreBlock, DType, ErrorKind, Gufunc, Kernel, KernelRegistry, NdArray, Scalar, apply, apply_out,
    reduce,
};

fn global() -> &'static KernelRegistry {
    KernelRegistry::global()
}

fn assert_close(got: &[f64], want: &[f64]) {
    assert_eq!(got.len(), want.len());
    for (g, w) in got.iter().zip(want) {
        assert!((g - w).abs() < 1e-9, "{got:?} != {want:?}");
    }
}

#[test]
fn test_unary_nulls() {
    let x = NdArray::from_options(vec![Some(0.0f64), None, Some(2.0)]);
    let y = apply(global(), "cos", &[&x]).unwrap();
    assert_eq!(y[0].to_options::<f64>(), Some(vec![Some(1.0), None, Some(2.0f64.cos())]));
    assert_eq!(y[0].null_count(), 1);
}

#[test]
fn test_binary_nulls() {
    let a = NdArray::from_options(vec![Some(3i64), None, Some(3)]);
    let b = NdArray::from_options(vec![Some(100i64), Some(1), None]);
    let y = apply(global(), "add", &[&a, &b]).unwrap();
    assert_eq!(y[0].to_options::<i64>(), Some(vec![Some(103), None, None]));
}

#[test]
fn test_integer_promotion() {
    let x = NdArray::from_vec(vec![0i8, 1]);
    let y = apply(global(), "sin", &[&x]).unwrap();
    assert_eq!(y[0].dtype(), DType::Float32);
    assert_eq!(y[0].to_vec::<f32>(), Some(vec![0.0, 1.0f32.sin()]));

    let a = NdArray::from_vec(vec![200u8, 100]);
    let b = NdArray::from_vec(vec![-1i16, 1000]);
    let y = apply(global(), "add", &[&a, &b]).unwrap();
    assert_eq!(y[0].to_vec::<i16>(), Some(vec![199, 1100]));
}

#[test]
fn test_broadcast_add() {
    let a = NdArray::from_shape_vec(&[2, 3], vec![1i32, 2, 3, 4, 5, 6]).unwrap();
    let b = NdArray::from_vec(vec![10i32, 20, 30]);
    let y = apply(global(), "add", &[&a, &b]).unwrap();
    assert_eq!(y[0].ndt().to_string(), "2 * 3 * int32");
    assert_eq!(y[0].to_string(), "[[11, 22, 33], [14, 25, 36]]");

    let s = NdArray::scalar(2i32);
    let y = apply(global(), "multiply", &[&s, &a]).unwrap();
    assert_eq!(y[0].to_vec::<i32>(), Some(vec![2, 4, 6, 8, 10, 12]));
}

#[test]
fn test_shape_mismatch() {
    let a = NdArray::from_vec(vec![1.0f64, 2.0]);
    let b = NdArray::from_vec(vec![1.0f64, 2.0, 3.0]);
    assert_eq!(apply(global(), "add", &[&a, &b]).unwrap_err().kind(), ErrorKind::Shape);
}

#[test]
fn test_equaln() {
    let a = NdArray::from_vec(vec![f64::NAN, 1.0, 2.0]);
    let b = NdArray::from_vec(vec![f64::NAN, 1.0, 3.0]);
    let y = apply(global(), "equaln", &[&a, &b]).unwrap();
    assert_eq!(y[0].to_vec::<bool>(), Some(vec![true, true, false]));
    let y = apply(global(), "equal", &[&a, &b]).unwrap();
    assert_eq!(y[0].to_vec::<bool>(), Some(vec![false, true, false]));

    let h = NdArray::from_vec(vec![f16::NAN]);
    let y = apply(global(), "equaln", &[&h, &h]).unwrap();
    assert_eq!(y[0].to_vec::<bool>(), Some(vec![true]));
}

#[test]
fn test_equaln_complex() {
    let nan = f64::NAN;
    let a = NdArray::from_vec(vec![Complex::new(nan, 1.2), Complex::new(nan, 1.2), Complex::new(nan, nan)]);
    let b = NdArray::from_vec(vec![Complex::new(nan, 1.2), Complex::new(nan, 1.0), Complex::new(nan, 1.2)]);
    let y = apply(global(), "equaln", &[&a, &b]).unwrap();
    assert_eq!(y[0].to_vec::<bool>(), Some(vec![true, false, false]));
}

#[test]
fn test_divmod() {
    let a = NdArray::from_vec(vec![10i64, 20, 30]);
    let b = NdArray::from_vec(vec![7i64, 8, 9]);
    let y = apply(global(), "divmod", &[&a, &b]).unwrap();
    assert_eq!(y.len(), 2);
    assert_eq!(y[0].to_vec::<i64>(), Some(vec![1, 2, 3]));
    assert_eq!(y[1].to_vec::<i64>(), Some(vec![3, 4, 3]));

    let b = NdArray::from_vec(vec![3i64]);
    let y = apply(global(), "divmod", &[&a, &b]).unwrap();
    assert_eq!(y[0].to_vec::<i64>(), Some(vec![3, 6, 10]));
    assert_eq!(y[1].to_vec::<i64>(), Some(vec![1, 2, 0]));
}

#[test]
fn test_out_identity() {
    let x = NdArray::from_vec(vec![1.0f64, 4.0, 9.0]);
    let mut out = NdArray::from_vec(vec![0.0f64; 3]);
    let target: *const NdArray = &out;
    let returned = apply_out(global(), "sqrt", &[&x], vec![&mut out]).unwrap();
    assert_eq!(returned.len(), 1);
    assert!(std::ptr::eq(&*returned[0], target));
    drop(returned);
    assert_eq!(out.to_vec::<f64>(), Some(vec![1.0, 2.0, 3.0]));
}

#[test]
fn test_out_mismatch() {
    let x = NdArray::from_vec(vec![1.0f64, 4.0, 9.0]);
    let mut short = NdArray::from_vec(vec![0.0f64; 2]);
    let e = apply_out(global(), "sqrt", &[&x], vec![&mut short]).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Argument);

    let mut narrow = NdArray::from_vec(vec![0.0f32; 3]);
    let e = apply_out(global(), "sqrt", &[&x], vec![&mut narrow]).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Argument);

    let a = NdArray::from_vec(vec![10i64, 20]);
    let mut q = NdArray::from_vec(vec![0i64; 2]);
    let e = apply_out(global(), "divmod", &[&a, &a], vec![&mut q]).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Argument);
    assert_eq!(q.to_vec::<i64>(), Some(vec![0, 0]));
}

#[test]
fn test_reductions() {
    let x = NdArray::from_options(vec![Some(1i64), None, Some(2)]);
    for name in ["add", "multiply", "subtract"] {
        let r = reduce(global(), name, &x, None).unwrap();
        assert_eq!(r.values(), vec![None], "{name}");
    }
    let r = reduce(global(), "maximum", &x, None).unwrap();
    assert_eq!(r.values(), vec![Some(Scalar::Int64(2))]);

    let empty = NdArray::from_options(Vec::<Option<i16>>::new());
    let r = reduce(global(), "add", &empty, None).unwrap();
    assert_eq!(r.values(), vec![Some(Scalar::Int64(0))]);
    let r = reduce(global(), "multiply", &empty, None).unwrap();
    assert_eq!(r.values(), vec![Some(Scalar::Int64(1))]);
}

#[test]
fn test_reduce_columns() {
    let x = NdArray::from_shape_vec(&[3, 2], vec![1.0f32, 6.0, 5.0, 2.0, 3.0, 4.0]).unwrap();
    let r = reduce(global(), "minimum", &x, None).unwrap();
    assert_eq!(r.ndt().to_string(), "2 * float64");
    assert_eq!(r.to_vec::<f64>(), Some(vec![1.0, 2.0]));
}

#[test]
fn test_pdist() {
    let x = NdArray::from_shape_vec(
        &[3, 4],
        vec![-1.22, -100.5, 20.125, 30.123, 2.22, 2.272, -122.84, 122.333, 2.1, -25.0, 100.2, -99.5],
    )
    .unwrap();
    let y = apply(global(), "euclidian_pdist", &[&x]).unwrap();
    assert_eq!(y[0].ndt().to_string(), "3 * float64");
    assert_close(
        &y[0].to_vec::<f64>().unwrap(),
        &[198.78529349275314, 170.0746899276903, 315.75385646576035],
    );

    let one = NdArray::from_shape_vec(&[1, 1], vec![1.0f64]).unwrap();
    let y = apply(global(), "euclidian_pdist", &[&one]).unwrap();
    assert_eq!(y[0].to_vec::<f64>(), Some(vec![]));

    let row = NdArray::from_shape_vec(&[1, 3], vec![1.0f64, 2.0, 3.0]).unwrap();
    let y = apply(global(), "euclidian_pdist", &[&row]).unwrap();
    assert_eq!(y[0].len(), 0);
}

#[test]
fn test_pdist_errors() {
    let ints = NdArray::from_shape_vec(&[2, 1], vec![1i64, 1]).unwrap();
    let e = apply(global(), "euclidian_pdist", &[&ints]).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Type);

    let flat = NdArray::from_vec(vec![1.0f64, 2.0]);
    let e = apply(global(), "euclidian_pdist", &[&flat]).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Shape);

    let no_columns = NdArray::from_shape_vec(&[1, 0], Vec::<f64>::new()).unwrap();
    let e = apply(global(), "euclidian_pdist", &[&no_columns]).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Value);
}

#[test]
fn test_ragged_unary() {
    let x = NdArray::ragged(&[vec![0, 2], vec![0, 2, 3]], vec![0.0f64, 1.0, 4.0]).unwrap();
    let y = apply(global(), "sqrt", &[&x]).unwrap();
    assert_eq!(y[0].ndt().to_string(), x.ndt().to_string());
    assert_eq!(y[0].to_string(), "[[0, 1], [2]]");
}

#[test]
fn test_ragged_binary() {
    let a = NdArray::ragged(&[vec![0, 3], vec![0, 1, 1, 3]], vec![1i64, 2, 3]).unwrap();
    let b = NdArray::ragged(&[vec![0, 3], vec![0, 1, 1, 3]], vec![10i64, 20, 30]).unwrap();
    let y = apply(global(), "add", &[&a, &b]).unwrap();
    assert_eq!(y[0].to_string(), "[[11], [], [22, 33]]");

    let s = NdArray::scalar(100i64);
    let y = apply(global(), "subtract", &[&a, &s]).unwrap();
    assert_eq!(y[0].to_vec::<i64>(), Some(vec![-99, -98, -97]));

    let other = NdArray::ragged(&[vec![0, 3], vec![0, 2, 2, 3]], vec![10i64, 20, 30]).unwrap();
    assert_eq!(apply(global(), "add", &[&a, &other]).unwrap_err().kind(), ErrorKind::Value);

    let fixed = NdArray::from_vec(vec![1i64, 2, 3]);
    assert_eq!(apply(global(), "add", &[&a, &fixed]).unwrap_err().kind(), ErrorKind::Value);
}

#[test]
fn test_ragged_nulls() {
    let x = NdArray::ragged_options(&[vec![0, 2], vec![0, 1, 3]], vec![Some(4.0f64), None, Some(0.0)]).unwrap();
    let y = apply(global(), "sqrt", &[&x]).unwrap();
    assert_eq!(y[0].to_string(), "[[2], [None, 0]]");
}

fn twice(args: &[Scalar], out: &mut [Scalar]) -> KernelResult {
    if let Scalar::Int64(v) = args[0] {
        out[0] = Scalar::Int64(v * 2);
    }
    Ok(())
}

#[test]
fn test_custom_registry() {
    let g = Gufunc::new("twice", "... * T -> ... * T")
        .unwrap()
        .row(&[DType::Int64], &[DType::Int64], Kernel::Elementwise(twice));
    let registry = KernelRegistry::builder().register(g).build();
    assert!(registry.contains("twice"));
    assert!(!registry.contains("sin"));

    let x = NdArray::from_vec(vec![1i32, -4]);
    let y = apply(&registry, "twice", &[&x]).unwrap();
    assert_eq!(y[0].to_vec::<i64>(), Some(vec![2, -8]));
    assert_eq!(apply(&registry, "sin", &[&x]).unwrap_err().kind(), ErrorKind::Value);
}

fn row_sum(inputs: &[CoreBlock], outputs: &mut [CoreBlock]) -> KernelResult {
    let total = inputs[0]
        .values
        .iter()
        .map(|v| if let Scalar::Int64(x) = v { *x } else { 0 })
        .sum();
    outputs[0].values[0] = Scalar::Int64(total);
    Ok(())
}

#[test]
fn test_output_without_ellipsis() {
    let dropped = Gufunc::new("row_sum", "... * N * int64 -> int64")
        .unwrap()
        .row(&[DType::Int64], &[DType::Int64], Kernel::Core(row_sum));
    let kept = Gufunc::new("row_sums", "... * N * int64 -> ... * int64")
        .unwrap()
        .row(&[DType::Int64], &[DType::Int64], Kernel::Core(row_sum));
    let registry = KernelRegistry::builder().register(dropped).register(kept).build();

    let m = NdArray::from_shape_vec(&[2, 3], vec![1i64, 2, 3, 10, 20, 30]).unwrap();
    let e = apply(&registry, "row_sum", &[&m]).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Type);

    let v = NdArray::from_vec(vec![1i64, 2, 3]);
    let y = apply(&registry, "row_sum", &[&v]).unwrap();
    assert_eq!(y[0].to_vec::<i64>(), Some(vec![6]));

    let y = apply(&registry, "row_sums", &[&m]).unwrap();
    assert_eq!(y[0].to_vec::<i64>(), Some(vec![6, 60]));
}

#[test]
fn test_reduce_rejects_narrowing() {
    let big = NdArray::from_vec(vec![300i64, 1]);
    let e = reduce(global(), "add", &big, Some(DType::Int8)).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Value);

    let frac = NdArray::from_vec(vec![1.75f64, 2.75]);
    let e = reduce(global(), "add", &frac, Some(DType::Int64)).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Value);

    let e = reduce(global(), "maximum", &frac, Some(DType::Float32)).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Value);
}

#[test]
fn test_ragged_offsets_start_at_zero() {
    let e = NdArray::ragged(&[vec![1, 2], vec![0, 3, 5]], vec![1u8, 2, 3, 4, 5]).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Value);
    let e = NdArray::ragged(&[vec![0, 2], vec![2, 3, 5]], vec![1u8, 2, 3, 4, 5]).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Value);
}
