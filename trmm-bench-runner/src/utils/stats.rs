/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::NanoSeconds;

#[derive(Debug, Error)]
#[error("input slice cannot be empty")]
pub struct CannotBeEmpty;

/// Descriptive statistics of a set of trial times.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    pub min: NanoSeconds,
    pub max: NanoSeconds,
    pub mean: f64,
    pub median: f64,
}

pub fn mean(x: &[NanoSeconds]) -> Result<f64, CannotBeEmpty> {
    if x.is_empty() {
        return Err(CannotBeEmpty);
    }
    let sum: u128 = x.iter().map(|t| u128::from(t.as_nanos())).sum();
    Ok(sum as f64 / x.len() as f64)
}

/// Summarize `x`.
///
/// The median is computed on a sorted copy. `x` itself is left in trial order.
pub fn summarize(x: &[NanoSeconds]) -> Result<Summary, CannotBeEmpty> {
    let mean = mean(x)?;

    let mut sorted = x.to_vec();
    sorted.sort_unstable();
    let len = sorted.len();
    let half = len / 2;
    let median = if len % 2 == 1 {
        sorted[half].as_f64()
    } else {
        (sorted[half - 1].as_f64() + sorted[half].as_f64()) / 2.0
    };

    Ok(Summary {
        min: sorted[0],
        max: sorted[len - 1],
        mean,
        median,
    })
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn ns(x: &[u64]) -> Vec<NanoSeconds> {
        x.iter().copied().map(NanoSeconds::new).collect()
    }

    #[test]
    fn test_mean() {
        assert!(mean(&[]).is_err());
        assert_relative_eq!(mean(&ns(&[1, 2, 4])).unwrap(), 7.0 / 3.0);

        // No overflow when summing large times.
        let big = ns(&[u64::MAX, u64::MAX]);
        assert_relative_eq!(mean(&big).unwrap(), u64::MAX as f64);
    }

    #[test]
    fn test_summarize() {
        let x = ns(&[50, 30, 40]);
        let s = summarize(&x).unwrap();
        assert_eq!(
            s,
            Summary {
                min: NanoSeconds::new(30),
                max: NanoSeconds::new(50),
                mean: 40.0,
                median: 40.0,
            }
        );
        // Trial order is preserved.
        assert_eq!(x, ns(&[50, 30, 40]));

        let s = summarize(&ns(&[4, 1, 3, 2])).unwrap();
        assert_eq!(s.median, 2.5);
        assert!(summarize(&[]).is_err());
    }
}
