/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Replicated inputs with row-partitioned work.
//!
//! The coordinator broadcasts all of `A` and `B`. Each rank computes the rows of `C`
//! assigned to it by [`RowPartition`] into a private shard, and the shards are gathered
//! back into the coordinator's `C`.

use trmm_comm::Context;
use trmm_utils::views::Matrix;

use crate::{
    kernel::multiply_rows,
    variant::{copy_inputs, copy_output},
    Distributed, KernelError, ProblemSize, RowPartition, Sequential, Strategy, Variant,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct RowPartitioned;

impl Variant for RowPartitioned {
    fn name(&self) -> &'static str {
        "row-partitioned"
    }

    fn strategy(&self) -> Strategy {
        Strategy::Replicated
    }

    fn description(&self) -> &'static str {
        "broadcast A and B, compute a row range per rank, gather C"
    }

    fn allocate(&self, ctx: Context<'_>, size: ProblemSize) -> Result<Distributed, KernelError> {
        let (m0, n0) = (size.m0, size.n0);
        let rows = RowPartition::new(m0, ctx.num_ranks()).len(ctx.rank());
        let c = if ctx.is_root() { (m0, n0) } else { (0, 0) };
        Distributed::zeroed(size, (m0, m0), (m0, n0), c, (rows, n0))
    }

    fn distribute(
        &self,
        ctx: Context<'_>,
        size: ProblemSize,
        seq: Option<&Sequential>,
        dist: &mut Distributed,
    ) -> Result<(), KernelError> {
        if ctx.is_root() {
            copy_inputs("distribute", size, seq, dist)?;
        }
        tracing::debug!(rank = ctx.rank(), %size, "broadcasting A and B");
        ctx.broadcast(dist.a.as_mut_slice())?;
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
        let rows = partition.range(ctx.rank());

        let Distributed { a, b, c, scratch } = dist;
        multiply_rows(
            rows.clone(),
            m0,
            n0,
            a.rows(rows),
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
