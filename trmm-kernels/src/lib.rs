/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Variants of the triangular matrix multiply `C = tril(A) * B`.
//!
//! `A` is an `m0 x m0` lower-triangular matrix and `B` and `C` are `m0 x n0`. Element
//! `C[i, j]` is the sum of `A[i, k] * B[k, j]` over `k <= i`. Entries of `A` above the
//! diagonal never contribute.
//!
//! Every variant implements the five-step [`Variant`] contract. The harness drives the
//! steps in order on every rank of a process group, and each variant is free to choose
//! how data is laid out and which ranks do the work.

use std::fmt;

use thiserror::Error;
use trmm_comm::CommError;
use trmm_utils::AllocationError;

mod buffers;
pub use buffers::{Distributed, Sequential};

mod kernel;

pub mod partition;
pub use partition::RowPartition;

mod variant;
pub use variant::{Strategy, Variant};

pub mod baseline;
pub mod blocked;
pub mod row_partitioned;
pub mod row_sharded;

pub use baseline::Baseline;
pub use blocked::Blocked;
pub use row_partitioned::RowPartitioned;
pub use row_sharded::RowSharded;

/// The dimensions of one problem instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProblemSize {
    /// Rows of `A`, `B` and `C`, and columns of `A`.
    pub m0: usize,
    /// Columns of `B` and `C`.
    pub n0: usize,
}

impl ProblemSize {
    pub fn new(m0: usize, n0: usize) -> Self {
        Self { m0, n0 }
    }

    /// The nominal floating point operation count `2 * m0^2 * n0`.
    ///
    /// This counts the full square product even though only the lower triangle
    /// contributes, so throughput figures are comparable with dense multiplies.
    pub fn flops(&self) -> f64 {
        let m0 = self.m0 as f64;
        2.0 * m0 * m0 * self.n0 as f64
    }
}

impl fmt::Display for ProblemSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.m0, self.n0)
    }
}

/// Errors returned by the [`Variant`] operations.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("could not allocate buffers for a {size} problem")]
    Allocation {
        size: ProblemSize,
        #[source]
        source: AllocationError,
    },
    #[error("collective operation failed")]
    Comm(#[from] CommError),
    #[error("the coordinator must provide sequential buffers to {0}")]
    MissingSequential(&'static str),
    #[error("{what} has shape {got:?} but {expected:?} was expected")]
    Shape {
        what: &'static str,
        expected: (usize, usize),
        got: (usize, usize),
    },
}

impl KernelError {
    /// Return `true` if this error reports a failure to obtain memory.
    pub fn is_allocation(&self) -> bool {
        matches!(self, Self::Allocation { .. })
    }

    pub(crate) fn allocation(size: ProblemSize) -> impl FnOnce(AllocationError) -> Self {
        move |source| Self::Allocation { size, source }
    }
}

pub(crate) fn check_shape(
    what: &'static str,
    expected: (usize, usize),
    got: (usize, usize),
) -> Result<(), KernelError> {
    if expected == got {
        Ok(())
    } else {
        Err(KernelError::Shape {
            what,
            expected,
            got,
        })
    }
}

/// Return every variant provided by this crate.
pub fn all() -> Vec<Box<dyn Variant>> {
    vec![
        Box::new(Baseline),
        Box::new(Blocked::default()),
        Box::new(RowPartitioned),
        Box::new(RowSharded),
    ]
}


///////////
// Tests //
///////////
