/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use std::fmt;

use trmm_comm::Context;
use trmm_utils::views::Matrix;

use crate::{Distributed, KernelError, ProblemSize, Sequential};

/// How a variant moves the coordinator's inputs onto the ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// The coordinator keeps all data and does all the work. Nothing is sent.
    CoordinatorOnly,
    /// Every rank receives full copies of `A` and `B` by broadcast.
    Replicated,
    /// Rows of `A` are scattered by the row partition and `B` is broadcast.
    RowSharded,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CoordinatorOnly => "coordinator-only",
            Self::Replicated => "replicated",
            Self::RowSharded => "row-sharded",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An implementation of the triangular multiply.
///
/// The harness invokes the operations in order on every rank of the group, with the
/// same `size` throughout:
///
/// 1. [`Variant::allocate`] once.
/// 2. [`Variant::distribute`] once.
/// 3. [`Variant::compute`] any number of times. Each call must fully define the result
///    regardless of what earlier calls left behind.
/// 4. [`Variant::collect`] once.
/// 5. [`Variant::free`] once, or the buffers are dropped on an error path.
///
/// Operations that issue collectives must be called on every rank. Only the coordinator
/// passes sequential buffers.
pub trait Variant: Send + Sync {
    /// The name used to select this variant on the command line.
    fn name(&self) -> &'static str;

    fn strategy(&self) -> Strategy;

    /// A one-line description for listings.
    fn description(&self) -> &'static str;

    /// Allocate zeroed working buffers for this rank.
    ///
    /// Allocation failure is returned as [`KernelError::Allocation`] before any
    /// collective is issued.
    fn allocate(&self, ctx: Context<'_>, size: ProblemSize) -> Result<Distributed, KernelError>;

    /// Populate the working buffers of every rank from the coordinator's inputs.
    fn distribute(
        &self,
        ctx: Context<'_>,
        size: ProblemSize,
        seq: Option<&Sequential>,
        dist: &mut Distributed,
    ) -> Result<(), KernelError>;

    /// Compute `C = tril(A) * B` into the working buffers.
    fn compute(
        &self,
        ctx: Context<'_>,
        size: ProblemSize,
        dist: &mut Distributed,
    ) -> Result<(), KernelError>;

    /// Copy the result into the coordinator's output. Does nothing on other ranks.
    fn collect(
        &self,
        ctx: Context<'_>,
        size: ProblemSize,
        c_seq: Option<&mut Matrix<f32>>,
        dist: &Distributed,
    ) -> Result<(), KernelError>;

    /// Release the working buffers.
    fn free(&self, dist: Distributed) {
        drop(dist)
    }
}

/// Copy `A` and `B` from the coordinator's inputs into the working buffers.
///
/// Only called on the coordinator.
pub(crate) fn copy_inputs(
    op: &'static str,
    size: ProblemSize,
    seq: Option<&Sequential>,
    dist: &mut Distributed,
) -> Result<(), KernelError> {
    let seq = seq.ok_or(KernelError::MissingSequential(op))?;
    crate::check_shape("sequential A", (size.m0, size.m0), seq.a.shape())?;
    crate::check_shape("sequential B", (size.m0, size.n0), seq.b.shape())?;
    dist.a.as_mut_slice().copy_from_slice(seq.a.as_slice());
    dist.b.as_mut_slice().copy_from_slice(seq.b.as_slice());
    Ok(())
}

/// Copy the coordinator's working `C` into its output.
pub(crate) fn copy_output(
    size: ProblemSize,
    c_seq: Option<&mut Matrix<f32>>,
    dist: &Distributed,
) -> Result<(), KernelError> {
    let c_seq = c_seq.ok_or(KernelError::MissingSequential("collect"))?;
    crate::check_shape("sequential C", (size.m0, size.n0), c_seq.shape())?;
    c_seq.as_mut_slice().copy_from_slice(dist.c.as_slice());
    Ok(())
}
