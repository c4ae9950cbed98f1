/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Row-sharded inputs.
//!
//! Each rank only receives the rows of `A` it needs, scattered by [`RowPartition`].
//! `B` is broadcast in full since every output row may depend on any of its rows. The
//! computed rows are gathered into the coordinator's `C`.

use trmm_comm::Context;
use trmm_utils::views::Matrix;

use crate::{
    check_shape, kernel::multiply_rows, variant::copy_output, Distributed, KernelError,
    ProblemSize, RowPartition, Sequential, Strategy, Variant,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct RowSharded;

impl Variant for RowSharded {
    fn name(&self) -> &'static str {
        "row-sharded"
    }

    fn strategy(&self) -> Strategy {
        Strategy::RowSharded
    }

    fn description(&self) -> &'static str {
        "scatter rows of A, broadcast B, compute owned rows, gather C"
    }

    fn allocate(&self, ctx: Context<'_>, size: ProblemSize) -> Result<Distributed, KernelError> {
        let (m0, n0) = (size.m0, size.n0);
        let rows = RowPartition::new(m0, ctx.num_ranks()).len(ctx.rank());
        let c = if ctx.is_root() { (m0, n0) } else { (0, 0) };
        Distributed::zeroed(size, (rows, m0), (m0, n0), c, (rows, n0))
    }

    fn distribute(
        &self,
        ctx: Context<'_>,
        size: ProblemSize,
        seq: Option<&Sequential>,
        dist: &mut Distributed,
    ) -> Result<(), KernelError> {
        let partition = RowPartition::new(size.m0, ctx.num_ranks());
        tracing::debug!(
            rank = ctx.rank(),
            rows = ?partition.range(ctx.rank()),
            "scattering rows of A"
        );

        if ctx.is_root() {
            let seq = seq.ok_or(KernelError::MissingSequential("distribute"))?;
            check_shape("sequential A", (size.m0, size.m0), seq.a.shape())?;
            check_shape("sequential B", (size.m0, size.n0), seq.b.shape())?;

            let layout = partition.layout(size.m0);
            ctx.scatter_varcount(Some((seq.a.as_slice(), &layout)), dist.a.as_mut_slice())?;
            dist.b.as_mut_slice().copy_from_slice(seq.b.as_slice());
        } else {
            ctx.scatter_varcount(None, dist.a.as_mut_slice())?;
        }
        ctx.broadcast(dist.b.as_mut_slice())?;
        Ok(())
    }

    fn compute(
        &self,
        ctx: Context<'_>,
        size: ProblemSize,
        dist: &mut Distributed,
    ) -> Result<(), KernelError> {
        let (m0, n0) = (size.m0, size.n0);
        let partition = RowPartition::new(m0, ctx.num_ranks());

        let Distributed { a, b, c, scratch } = dist;
        multiply_rows(
            partition.range(ctx.rank()),
            m0,
            n0,
            a.as_slice(),
            b.as_slice(),
            scratch.as_mut_slice(),
        );

        if ctx.is_root() {
            let layout = partition.layout(n0);
            ctx.gather_varcount(scratch.as_slice(), Some((c.as_mut_slice(), &layout)))?;
        } else {
            ctx.gather_varcount(scratch.as_slice(), None)?;
        }
        Ok(())
    }

    fn collect(
        &self,
        ctx: Context<'_>,
        size: ProblemSize,
        c_seq: Option<&mut Matrix<f32>>,
        dist: &Distributed,
    ) -> Result<(), KernelError> {
        if ctx.is_root() {
            copy_output(size, c_seq, dist)?;
        }
        Ok(())
    }
}

///////////
// Tests //
///////////
