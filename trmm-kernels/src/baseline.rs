/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! The straight triple loop on the coordinator. Used as the reference for verification.

use trmm_comm::Context;
use trmm_utils::views::Matrix;

use crate::{
    variant::{copy_inputs, copy_output},
    Distributed, KernelError, ProblemSize, Sequential, Strategy, Variant,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct Baseline;

impl Variant for Baseline {
    fn name(&self) -> &'static str {
        "baseline"
    }

    fn strategy(&self) -> Strategy {
        Strategy::CoordinatorOnly
    }

    fn description(&self) -> &'static str {
        "triple loop over i, j and k <= i on the coordinator"
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

        let (m0, n0) = (size.m0, size.n0);
        let a = dist.a.as_slice();
        let b = dist.b.as_slice();
        let c = dist.c.as_mut_slice();
        for i in 0..m0 {
            for j in 0..n0 {
                let mut sum = 0.0;
                for k in 0..=i {
                    sum += a[i * m0 + k] * b[k * n0 + j];
                }
                c[i * n0 + j] = sum;
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

#[cfg(test)]
mod tests {
    use trmm_comm::{testing::Recording, SingleProcess};

    use super::*;
    use crate::test_utils::run_variant;

    #[test]
    fn test_exact_small_case() {
        let size = ProblemSize::new(3, 2);
        let comm = SingleProcess;
        let ctx = Context::new(&comm);

        let mut seq = Sequential::zeroed(size).unwrap();
        seq.a
            .as_mut_slice()
            .copy_from_slice(&[1.0, 0.0, 0.0, 2.0, 3.0, 0.0, 4.0, 5.0, 6.0]);
        seq.b.as_mut_slice().fill(1.0);

        let mut dist = Baseline.allocate(ctx, size).unwrap();
        Baseline.distribute(ctx, size, Some(&seq), &mut dist).unwrap();
        Baseline.compute(ctx, size, &mut dist).unwrap();
        Baseline
            .collect(ctx, size, Some(&mut seq.c), &dist)
            .unwrap();

        assert_eq!(seq.c.as_slice(), &[1.0, 1.0, 5.0, 5.0, 15.0, 15.0]);
    }

    #[test]
    fn test_upper_triangle_is_ignored() {
        let size = ProblemSize::new(3, 1);
        let comm = SingleProcess;
        let ctx = Context::new(&comm);

        let mut seq = Sequential::zeroed(size).unwrap();
        seq.a.as_mut_slice().fill(1.0);
        seq.b.as_mut_slice().fill(1.0);

        let mut dist = Baseline.allocate(ctx, size).unwrap();
        Baseline.distribute(ctx, size, Some(&seq), &mut dist).unwrap();
        Baseline.compute(ctx, size, &mut dist).unwrap();
        assert_eq!(dist.c.as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_coordinator_sends_nothing() {
        let comm = Recording::new(SingleProcess);
        let ctx = Context::new(&comm);
        let size = ProblemSize::new(4, 4);
        let seq = Sequential::zeroed(size).unwrap();

        let mut dist = Baseline.allocate(ctx, size).unwrap();
        Baseline.distribute(ctx, size, Some(&seq), &mut dist).unwrap();
        Baseline.compute(ctx, size, &mut dist).unwrap();
        assert_eq!(comm.calls().total(), 0);
    }

    #[test]
    fn test_missing_sequential() {
        let comm = SingleProcess;
        let ctx = Context::new(&comm);
        let size = ProblemSize::new(2, 2);

        let mut dist = Baseline.allocate(ctx, size).unwrap();
        let err = Baseline.distribute(ctx, size, None, &mut dist).unwrap_err();
        assert!(matches!(err, KernelError::MissingSequential("distribute")));
    }

    #[test]
    fn test_multiple_ranks() {
        let output = run_variant(&Baseline, ProblemSize::new(5, 2), 3, 11).unwrap();
        assert_eq!(output.shape(), (5, 2));
    }
}
