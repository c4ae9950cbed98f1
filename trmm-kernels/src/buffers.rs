/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use rand::Rng;
use trmm_utils::{buffers::fill_random, views::Matrix};

use crate::{KernelError, ProblemSize};

/// Full-size problem buffers owned by the coordinator.
///
/// Only the coordinator holds a `Sequential`. Other ranks pass `None` wherever sequential
/// buffers are expected.
#[derive(Debug, Clone)]
pub struct Sequential {
    /// The `m0 x m0` lower-triangular input.
    pub a: Matrix<f32>,
    /// The `m0 x n0` dense input.
    pub b: Matrix<f32>,
    /// The `m0 x n0` output.
    pub c: Matrix<f32>,
}

impl Sequential {
    /// Allocate zeroed buffers for `size`.
    pub fn zeroed(size: ProblemSize) -> Result<Self, KernelError> {
        let zeros = |nrows, ncols| {
            Matrix::try_filled(0.0f32, nrows, ncols).map_err(KernelError::allocation(size))
        };
        Ok(Self {
            a: zeros(size.m0, size.m0)?,
            b: zeros(size.m0, size.n0)?,
            c: zeros(size.m0, size.n0)?,
        })
    }

    /// Allocate buffers for `size` with random inputs in `[0, 1)`.
    ///
    /// Entries of `A` above the diagonal are zero and `C` is zero.
    pub fn random<R>(size: ProblemSize, rng: &mut R) -> Result<Self, KernelError>
    where
        R: Rng + ?Sized,
    {
        let mut this = Self::zeroed(size)?;
        for i in 0..size.m0 {
            fill_random(&mut this.a.row_mut(i)[..=i], rng);
        }
        fill_random(this.b.as_mut_slice(), rng);
        Ok(this)
    }

    /// Allocate a zeroed matrix shaped like `C`.
    pub fn output(size: ProblemSize) -> Result<Matrix<f32>, KernelError> {
        Matrix::try_filled(0.0f32, size.m0, size.n0).map_err(KernelError::allocation(size))
    }
}

/// The working buffers of one rank for one variant.
///
/// The shape of each buffer is chosen by the variant that allocated it. Buffers a
/// variant does not use on a given rank are empty.
#[derive(Debug)]
pub struct Distributed {
    pub a: Matrix<f32>,
    pub b: Matrix<f32>,
    pub c: Matrix<f32>,
    /// Variant-private storage for the rows computed by this rank.
    pub scratch: Matrix<f32>,
}

impl Distributed {
    /// Buffers that hold nothing.
    pub fn empty() -> Self {
        Self {
            a: Matrix::empty(),
            b: Matrix::empty(),
            c: Matrix::empty(),
            scratch: Matrix::empty(),
        }
    }

    /// Allocate zeroed buffers of the given `(nrows, ncols)` shapes.
    ///
    /// Allocation stops at the first failure. Buffers allocated up to that point are
    /// released before returning.
    pub fn zeroed(
        size: ProblemSize,
        a: (usize, usize),
        b: (usize, usize),
        c: (usize, usize),
        scratch: (usize, usize),
    ) -> Result<Self, KernelError> {
        let zeros = |(nrows, ncols): (usize, usize)| {
            Matrix::try_filled(0.0f32, nrows, ncols).map_err(KernelError::allocation(size))
        };
        Ok(Self {
            a: zeros(a)?,
            b: zeros(b)?,
            c: zeros(c)?,
            scratch: zeros(scratch)?,
        })
    }

    /// The total number of elements held by this rank.
    pub fn len(&self) -> usize {
        self.a.len() + self.b.len() + self.c.len() + self.scratch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

///////////
// Tests //
///////////
