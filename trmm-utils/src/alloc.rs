/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use std::collections::TryReserveError;

use thiserror::Error;

/// Memory for a buffer could not be obtained.
///
/// Benchmarks cannot proceed with a partially allocated problem, so callers are expected
/// to treat this as fatal for the whole run. It is returned rather than aborting so the
/// harness can observe the failure before any collective communication is issued.
#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("a {nrows}x{ncols} buffer has more elements than the address space allows")]
    Overflow { nrows: usize, ncols: usize },
    #[error("failed to reserve {bytes} bytes for {elements} elements")]
    Reserve {
        elements: usize,
        bytes: usize,
        #[source]
        source: TryReserveError,
    },
}

/// Return the number of elements in a `nrows x ncols` buffer, or an error if the product
/// overflows.
pub fn checked_len(nrows: usize, ncols: usize) -> Result<usize, AllocationError> {
    nrows
        .checked_mul(ncols)
        .ok_or(AllocationError::Overflow { nrows, ncols })
}

/// Fallibly allocate a vector of `len` copies of `value`.
///
/// Unlike `vec![value; len]`, an allocation failure is reported as an error instead of
/// aborting the process.
pub fn try_vec<T: Clone>(value: T, len: usize) -> Result<Vec<T>, AllocationError> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|source| AllocationError::Reserve {
            elements: len,
            bytes: len.saturating_mul(std::mem::size_of::<T>()),
            source,
        })?;
    data.resize(len, value);
    Ok(data)
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_len() {
        assert_eq!(checked_len(3, 4).unwrap(), 12);
        assert_eq!(checked_len(0, usize::MAX).unwrap(), 0);
        assert!(matches!(
            checked_len(usize::MAX, 2).unwrap_err(),
            AllocationError::Overflow {
                nrows: usize::MAX,
                ncols: 2
            }
        ));
    }

    #[test]
    fn test_try_vec() {
        let v = try_vec(1.5f32, 7).unwrap();
        assert_eq!(v, vec![1.5f32; 7]);

        let empty = try_vec(0u8, 0).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_try_vec_failure() {
        // More bytes than `isize::MAX` can never be reserved.
        let err = try_vec(0.0f32, usize::MAX / 2).unwrap_err();
        match err {
            AllocationError::Reserve {
                elements, bytes, ..
            } => {
                assert_eq!(elements, usize::MAX / 2);
                assert_eq!(bytes, usize::MAX);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
