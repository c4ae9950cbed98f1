/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Cache-blocked multiply on the coordinator.
//!
//! The `k` and `j` loops are tiled so that a `block x block` tile of `B` is reused across
//! every row of `C` before moving on. Tiles of `A` that lie entirely above the diagonal
//! are skipped.

use trmm_comm::Context;
use trmm_utils::{buffers::fill_value, views::Matrix};

use crate::{
    variant::{copy_inputs, copy_output},
    Distributed, KernelError, ProblemSize, Sequential, Strategy, Variant,
};

/// The default tile edge in elements.
pub const DEFAULT_BLOCK: usize = 16;

#[derive(Debug, Clone, Copy)]
pub struct Blocked {
    block: usize,
}

impl Blocked {
    /// # Panics
    ///
    /// Panics if `block == 0`.
    pub fn new(block: usize) -> Self {
        assert_ne!(block, 0, "the tile size must be positive");
        Self { block }
    }

    pub fn block(&self) -> usize {
        self.block
    }
}

impl Default for Blocked {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK)
    }
}

impl Variant for Blocked {
    fn name(&self) -> &'static str {
        "blocked"
    }

    fn strategy(&self) -> Strategy {
        Strategy::CoordinatorOnly
    }

    fn description(&self) -> &'static str {
        "16x16 tiling over k and j on the coordinator"
    }

    fn allocate(&self, ctx: Context<'_>, size: ProblemSize) -> Result<Distributed, KernelError> {
        if !ctx.is_root() {
            return Ok(Distributed::empty());
        }
        let (m0, n0) = (size.m0, size.n0);
        Distributed::zeroed(size, (m0, m0), (m0, n0), (m0, n0), (0, 0))
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
        Ok(())
    }

    fn compute(
        &self,
        ctx: Context<'_>,
        size: ProblemSize,
        dist: &mut Distributed,
    ) -> Result<(), KernelError> {
        if !ctx.is_root() {
            return Ok(());
        }

        let (m0, n0, block) = (size.m0, size.n0, self.block);
        let a = dist.a.as_slice();
        let b = dist.b.as_slice();
        let c = dist.c.as_mut_slice();

        // Accumulates across tiles.
        fill_value(c, 0.0);
        for kk in (0..m0).step_by(block) {
            let k_end = (kk + block).min(m0);
            for jj in (0..n0).step_by(block) {
                let j_end = (jj + block).min(n0);
                // Rows above `kk` only see columns of `A` above the diagonal.
                for i in kk..m0 {
                    let c_row = &mut c[i * n0 + jj..i * n0 + j_end];
                    for k in kk..k_end.min(i + 1) {
                        let aik = a[i * m0 + k];
                        let b_row = &b[k * n0 + jj..k * n0 + j_end];
                        std::iter::zip(c_row.iter_mut(), b_row).for_each(|(c, &b)| *c += aik * b);
                    }
                }
            }
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
