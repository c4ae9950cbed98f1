/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! The verifier harness.
//!
//! A reference and a candidate variant are run on the same coordinator inputs, each into
//! its own output. The outputs are compared with the worst-case normalized difference
//! `|r - c| / (|r| + |c|)` and the comparison passes if it does not exceed [`THRESHOLD`].

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use trmm_comm::Context;
use trmm_kernels::{KernelError, ProblemSize, Sequential, Variant};
use trmm_utils::{buffers::max_pairwise_difference, views::Matrix};

/// The largest normalized difference that still passes.
pub const THRESHOLD: f32 = 1.0e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    /// Classify a worst-case difference. `NaN` fails.
    pub fn classify(max_difference: f32) -> Self {
        if max_difference <= THRESHOLD {
            Self::Pass
        } else {
            Self::Fail
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The coordinator's result for one problem size.
#[derive(Debug, Clone, Serialize)]
pub struct Verification {
    pub num_ranks: usize,
    pub m0: usize,
    pub n0: usize,
    pub max_difference: f32,
    pub verdict: Verdict,
}

/// Compare `candidate` against `reference` on one problem size.
///
/// Must be called on every rank. Returns the outcome on the coordinator and `None`
/// elsewhere. A failed comparison is not an error.
pub fn verify<R>(
    ctx: Context<'_>,
    reference: &dyn Variant,
    candidate: &dyn Variant,
    size: ProblemSize,
    rng: &mut R,
) -> anyhow::Result<Option<Verification>>
where
    R: Rng + ?Sized,
{
    let (seq, mut expected, mut got) = if ctx.is_root() {
        (
            Some(Sequential::random(size, rng)?),
            Some(Sequential::output(size)?),
            Some(Sequential::output(size)?),
        )
    } else {
        (None, None, None)
    };

    run_cycle(ctx, reference, size, seq.as_ref(), expected.as_mut())?;
    run_cycle(ctx, candidate, size, seq.as_ref(), got.as_mut())?;

    let (Some(expected), Some(got)) = (expected, got) else {
        return Ok(None);
    };

    let max_difference = max_pairwise_difference(expected.as_view(), got.as_view());
    let verdict = Verdict::classify(max_difference);
    if verdict == Verdict::Fail {
        tracing::warn!(
            reference = reference.name(),
            candidate = candidate.name(),
            %size,
            max_difference,
            "verification failed"
        );
    }

    Ok(Some(Verification {
        num_ranks: ctx.num_ranks(),
        m0: size.m0,
        n0: size.n0,
        max_difference,
        verdict,
    }))
}

fn run_cycle(
    ctx: Context<'_>,
    variant: &dyn Variant,
    size: ProblemSize,
    seq: Option<&Sequential>,
    output: Option<&mut Matrix<f32>>,
) -> Result<(), KernelError> {
    tracing::debug!(variant = variant.name(), %size, "running");
    let mut dist = variant.allocate(ctx, size)?;
    variant.distribute(ctx, size, seq, &mut dist)?;
    variant.compute(ctx, size, &mut dist)?;
    variant.collect(ctx, size, output, &dist)?;
    variant.free(dist);
    Ok(())
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use rand::{rngs::StdRng, SeedableRng};
    use rstest::rstest;
    use trmm_comm::{LocalGroup, SingleProcess};
    use trmm_kernels::{Baseline, Blocked, Distributed, RowPartitioned, RowSharded, Strategy};

    use super::*;

    /// Applies a function to every element of `tril(A) * B`.
    struct Perturbed(fn(f32) -> f32);

    const OFF_BY_ONE: Perturbed = Perturbed(|x| x + 1.0);
    const NAN_OUTPUT: Perturbed = Perturbed(|_| f32::NAN);

    impl Variant for Perturbed {
        fn name(&self) -> &'static str {
            "perturbed"
        }

        fn strategy(&self) -> Strategy {
            Strategy::CoordinatorOnly
        }

        fn description(&self) -> &'static str {
            "perturbs every output"
        }

        fn allocate(
            &self,
            ctx: Context<'_>,
            size: ProblemSize,
        ) -> Result<Distributed, KernelError> {
            Baseline.allocate(ctx, size)
        }

        fn distribute(
            &self,
            ctx: Context<'_>,
            size: ProblemSize,
            seq: Option<&Sequential>,
            dist: &mut Distributed,
        ) -> Result<(), KernelError> {
            Baseline.distribute(ctx, size, seq, dist)
        }

        fn compute(
            &self,
            ctx: Context<'_>,
            size: ProblemSize,
            dist: &mut Distributed,
        ) -> Result<(), KernelError> {
            Baseline.compute(ctx, size, dist)?;
            dist.c.as_mut_slice().iter_mut().for_each(|x| *x = (self.0)(*x));
            Ok(())
        }

        fn collect(
            &self,
            ctx: Context<'_>,
            size: ProblemSize,
            c_seq: Option<&mut Matrix<f32>>,
            dist: &Distributed,
        ) -> Result<(), KernelError> {
            Baseline.collect(ctx, size, c_seq, dist)
        }
    }

    fn verify_single(
        reference: &dyn Variant,
        candidate: &dyn Variant,
        size: ProblemSize,
    ) -> Verification {
        let comm = SingleProcess;
        let mut rng = StdRng::seed_from_u64(0x5eed);
        verify(Context::new(&comm), reference, candidate, size, &mut rng)
            .unwrap()
            .unwrap()
    }

    #[rstest]
    #[case(0.0, Verdict::Pass)]
    #[case(1.0e-3, Verdict::Pass)]
    #[case(1.1e-3, Verdict::Fail)]
    #[case(1.0, Verdict::Fail)]
    #[case(f32::NAN, Verdict::Fail)]
    fn test_classify(#[case] difference: f32, #[case] expected: Verdict) {
        assert_eq!(Verdict::classify(difference), expected);
    }

    #[test]
    fn test_verdict_format() {
        assert_eq!(Verdict::Pass.to_string(), "PASS");
        assert_eq!(Verdict::Fail.to_string(), "FAIL");
        assert_eq!(serde_json::to_string(&Verdict::Fail).unwrap(), "\"FAIL\"");
    }

    #[test]
    fn test_reflexive() {
        let size = ProblemSize::new(24, 5);
        let outcome = verify_single(&Baseline, &Baseline, size);
        assert_eq!(outcome.max_difference, 0.0);
        assert_eq!(outcome.verdict, Verdict::Pass);
        assert_eq!((outcome.num_ranks, outcome.m0, outcome.n0), (1, 24, 5));
    }

    #[test]
    fn test_symmetric() {
        let _guard = crate::logging::init_test_subscriber();
        let size = ProblemSize::new(19, 7);
        let blocked = Blocked::default();
        let forward = verify_single(&blocked, &OFF_BY_ONE, size);
        let backward = verify_single(&OFF_BY_ONE, &blocked, size);
        assert_eq!(forward.max_difference, backward.max_difference);
        assert_eq!(forward.verdict, Verdict::Fail);
        assert_eq!(backward.verdict, Verdict::Fail);
    }

    #[test]
    fn test_nan_output_fails() {
        let size = ProblemSize::new(8, 4);
        let outcome = verify_single(&Baseline, &NAN_OUTPUT, size);
        assert!(outcome.max_difference.is_nan());
        assert_eq!(outcome.verdict, Verdict::Fail);

        let outcome = verify_single(&NAN_OUTPUT, &Baseline, size);
        assert_eq!(outcome.verdict, Verdict::Fail);
    }

    #[test]
    fn test_zero_sized() {
        for dims in [(0, 0), (0, 3), (3, 0)] {
            let size = ProblemSize::new(dims.0, dims.1);
            let outcome = verify_single(&Baseline, &RowSharded, size);
            assert_eq!(outcome.verdict, Verdict::Pass);
        }
    }

    #[rstest]
    fn test_distributed_variants_pass(#[values(1, 2, 3, 4)] num_ranks: usize) {
        let group = LocalGroup::new(NonZeroUsize::new(num_ranks).unwrap());
        let size = ProblemSize::new(13, 6);
        let candidates: [&dyn Variant; 2] = [&RowPartitioned, &RowSharded];

        for candidate in candidates {
            let outcomes = group
                .run(|ctx| {
                    let mut rng = StdRng::seed_from_u64(11);
                    verify(ctx, &Baseline, candidate, size, &mut rng)
                })
                .unwrap();

            let root = outcomes[0].as_ref().unwrap();
            assert_eq!(root.verdict, Verdict::Pass, "{}", candidate.name());
            assert_eq!(root.num_ranks, num_ranks);
            assert!(outcomes[1..].iter().all(Option::is_none));
        }
    }
}
