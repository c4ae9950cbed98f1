/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use std::ops::Range;

use trmm_utils::buffers::fill_value;

/// Compute rows `rows` of `C = tril(A) * B`.
///
/// * `a`: rows `rows` of `A`, each of length `m0`.
/// * `b`: all of `B`, `m0 x n0`.
/// * `c`: the destination for rows `rows` of `C`. Overwritten.
///
/// Row `i` accumulates `A[i, k] * B[k, :]` for `k` in `0..=i` in increasing `k`, which is
/// the same summation order as the straight triple loop.
pub(crate) fn multiply_rows(
    rows: Range<usize>,
    m0: usize,
    n0: usize,
    a: &[f32],
    b: &[f32],
    c: &mut [f32],
) {
    debug_assert!(rows.end <= m0);
    debug_assert_eq!(a.len(), rows.len() * m0);
    debug_assert_eq!(b.len(), m0 * n0);
    debug_assert_eq!(c.len(), rows.len() * n0);

    fill_value(c, 0.0);
    for (local, i) in rows.enumerate() {
        let a_row = &a[local * m0..(local + 1) * m0];
        let c_row = &mut c[local * n0..(local + 1) * n0];
        for (k, &aik) in a_row[..=i].iter().enumerate() {
            let b_row = &b[k * n0..(k + 1) * n0];
            std::iter::zip(c_row.iter_mut(), b_row).for_each(|(c, &b)| *c += aik * b);
        }
    }
}

///////////
// Tests //
///////////
