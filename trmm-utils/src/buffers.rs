/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Filling and comparing numeric buffers.
//!
//! These are pure functions with no distributed state. They are used by the coordinator
//! to generate benchmark inputs and by the verifier to compare outputs.

use rand::{
    distr::{Distribution, StandardUniform},
    Rng,
};

use crate::views::MatrixView;

/// Fill `buffer` with values drawn uniformly from `[0, 1)`.
pub fn fill_random<R>(buffer: &mut [f32], rng: &mut R)
where
    R: Rng + ?Sized,
{
    buffer
        .iter_mut()
        .for_each(|x| *x = StandardUniform.sample(rng));
}

/// Fill `buffer` with copies of `value`.
pub fn fill_value<T: Copy>(buffer: &mut [T], value: T) {
    buffer.fill(value);
}

/// The normalized difference `|x - y| / (|x| + |y|)`.
///
/// Returns 0 if both values are zero and `NaN` if either value is `NaN`. The result is
/// symmetric in its arguments and lies in `[0, 1]` for finite inputs.
pub fn relative_difference(x: f32, y: f32) -> f32 {
    let sum = x.abs() + y.abs();
    if sum == 0.0 {
        0.0
    } else {
        (x - y).abs() / sum
    }
}

/// Return the largest [`relative_difference`] between corresponding elements of `x` and
/// `y`.
///
/// A `NaN` difference is sticky and propagates to the result so that non-finite outputs
/// can never compare as "close". Returns 0 for empty matrices.
///
/// # Panics
///
/// Panics if `x` and `y` do not have the same shape.
pub fn max_pairwise_difference(x: MatrixView<'_, f32>, y: MatrixView<'_, f32>) -> f32 {
    assert_eq!(
        x.shape(),
        y.shape(),
        "cannot compare a {}x{} matrix with a {}x{} matrix",
        x.nrows(),
        x.ncols(),
        y.nrows(),
        y.ncols(),
    );

    std::iter::zip(x.as_slice(), y.as_slice()).fold(0.0f32, |worst, (&a, &b)| {
        let d = relative_difference(a, b);
        if worst.is_nan() || d.is_nan() {
            f32::NAN
        } else {
            worst.max(d)
        }
    })
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};
    use rstest::rstest;

    use super::*;
    use crate::views::Matrix;

    #[test]
    fn test_fill_random_range_and_determinism() {
        let mut a = vec![0.0f32; 1000];
        let mut b = vec![0.0f32; 1000];
        fill_random(&mut a, &mut StdRng::seed_from_u64(7));
        fill_random(&mut b, &mut StdRng::seed_from_u64(7));

        assert_eq!(a, b);
        assert!(a.iter().all(|&x| (0.0..1.0).contains(&x)));
        // Not all the same value.
        assert!(a.iter().any(|&x| x != a[0]));
    }

    #[test]
    fn test_fill_value() {
        let mut a = vec![1.0f32; 5];
        fill_value(&mut a, 0.0);
        assert_eq!(a, vec![0.0; 5]);
    }

    #[rstest]
    #[case(1.0, 1.0, 0.0)]
    #[case(0.0, 0.0, 0.0)]
    #[case(1.0, -1.0, 1.0)]
    #[case(3.0, 1.0, 0.5)]
    #[case(0.0, 2.0, 1.0)]
    fn test_relative_difference(#[case] x: f32, #[case] y: f32, #[case] expected: f32) {
        assert_relative_eq!(relative_difference(x, y), expected);
        assert_relative_eq!(relative_difference(y, x), expected);
    }

    #[test]
    fn test_reflexive() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut x = Matrix::try_filled(0.0f32, 17, 9).unwrap();
        fill_random(x.as_mut_slice(), &mut rng);
        // Include exact zeros to exercise the zero-denominator path.
        x.row_mut(3).fill(0.0);

        assert_eq!(max_pairwise_difference(x.as_view(), x.as_view()), 0.0);
    }

    #[test]
    fn test_symmetric() {
        let mut rng = StdRng::seed_from_u64(0xc0ffee);
        let mut x = Matrix::try_filled(0.0f32, 8, 8).unwrap();
        let mut y = Matrix::try_filled(0.0f32, 8, 8).unwrap();
        fill_random(x.as_mut_slice(), &mut rng);
        fill_random(y.as_mut_slice(), &mut rng);

        let xy = max_pairwise_difference(x.as_view(), y.as_view());
        let yx = max_pairwise_difference(y.as_view(), x.as_view());
        assert!(xy > 0.0);
        assert_eq!(xy, yx);
    }

    #[test]
    fn test_worst_case_is_reported() {
        let xdata = [1.0f32, 2.0, 4.0, 0.0];
        let ydata = [1.0f32, 2.002, 2.0, 0.0];
        let x = MatrixView::try_from(&xdata[..], 2, 2).unwrap();
        let y = MatrixView::try_from(&ydata[..], 2, 2).unwrap();
        assert_relative_eq!(max_pairwise_difference(x, y), 2.0 / 6.0);
    }

    #[rstest]
    #[case(f32::NAN, 1.0)]
    #[case(0.0, f32::NAN)]
    #[case(f32::NAN, f32::NAN)]
    fn test_relative_difference_nan(#[case] x: f32, #[case] y: f32) {
        assert!(relative_difference(x, y).is_nan());
        assert!(relative_difference(y, x).is_nan());
    }

    #[test]
    fn test_nan_is_sticky() {
        let xdata = [f32::NAN, 1.0];
        let ydata = [1.0f32, 1.0];
        let x = MatrixView::try_from(&xdata[..], 1, 2).unwrap();
        let y = MatrixView::try_from(&ydata[..], 1, 2).unwrap();
        assert!(max_pairwise_difference(x, y).is_nan());
        assert!(max_pairwise_difference(y, x).is_nan());

        let xdata = [1.0f32, 0.0, f32::NAN];
        let ydata = [1.0f32, 5.0, 0.0];
        let x = MatrixView::try_from(&xdata[..], 3, 1).unwrap();
        let y = MatrixView::try_from(&ydata[..], 3, 1).unwrap();
        assert!(max_pairwise_difference(x, y).is_nan());
    }

    #[test]
    fn test_empty() {
        let x = Matrix::<f32>::try_filled(0.0, 0, 4).unwrap();
        assert_eq!(max_pairwise_difference(x.as_view(), x.as_view()), 0.0);
    }

    #[test]
    #[should_panic(expected = "cannot compare a 2x1 matrix with a 1x2 matrix")]
    fn test_shape_mismatch() {
        let data = [1.0f32, 2.0];
        let x = MatrixView::try_from(&data[..], 2, 1).unwrap();
        let y = MatrixView::try_from(&data[..], 1, 2).unwrap();
        max_pairwise_difference(x, y);
    }
}
