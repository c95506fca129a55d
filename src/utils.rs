// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Utilities - *Internal Index Helpers*
//!
//! Index arithmetic shared by the broadcast planner, the execution driver and
//! array accessors.

/// Converts a flat C-order index into a multi-index over `shape`.
#[inline]
pub fn unravel(mut flat: usize, shape: &[usize], out: &mut [usize]) {
    for i in (0..shape.len()).rev() {
        let n = shape[i].max(1);
        out[i] = flat % n;
        flat /= n;
    }
}

/// Physical element position of `index` given a base position and per-dimension steps.
#[inline]
pub fn offset_of(base: usize, index: &[usize], steps: &[isize]) -> usize {
    let delta: isize = index.iter().zip(steps).map(|(&i, &s)| i as isize * s).sum();
    (base as isize + delta) as usize
}

/// Physical positions of every element of a strided block, in C order.
pub fn block_offsets(base: usize, shape: &[usize], steps: &[isize]) -> Vec<usize> {
    let n: usize = shape.iter().product();
    let mut idx = vec![0usize; shape.len()];
    let mut out = Vec::with_capacity(n);
    for flat in 0..n {
        unravel(flat, shape, &mut idx);
        out.push(offset_of(base, &idx, steps));
    }
    out
}

/// Smallest and largest step-weighted displacement reachable in a strided block.
pub fn span(shape: &[usize], steps: &[isize]) -> (isize, isize) {
    let (mut lo, mut hi) = (0isize, 0isize);
    for (&n, &s) in shape.iter().zip(steps) {
        if n == 0 {
            return (0, 0);
        }
        let reach = (n as isize - 1) * s;
        if reach < 0 {
            lo += reach;
        } else {
            hi += reach;
        }
    }
    (lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unravel() {
        let mut idx = [0usize; 3];
        unravel(5, &[2, 3, 1], &mut idx);
        assert_eq!(idx, [1, 2, 0]);
    }

    #[test]
    fn test_block_offsets_fortran() {
        assert_eq!(block_offsets(0, &[2, 3], &[1, 2]), vec![0, 2, 4, 1, 3, 5]);
        assert_eq!(block_offsets(4, &[3], &[-2]), vec![4, 2, 0]);
    }

    #[test]
    fn test_span() {
        assert_eq!(span(&[2, 3], &[3, 1]), (0, 5));
        assert_eq!(span(&[3], &[-2]), (-4, 0));
        assert_eq!(span(&[0, 3], &[3, 1]), (0, 0));
    }
}
