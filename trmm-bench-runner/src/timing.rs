/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! The timing harness.
//!
//! Every rank enters [`time_compute`] together. After a barrier, a timer warm-up and a
//! single cache flush, each trial invokes [`Variant::compute`] a fixed number of times and
//! the slowest rank's elapsed time for that trial is reduced to the coordinator. The
//! representative time of a problem size is the minimum over trials.

use std::{hint::black_box, num::NonZeroUsize, time::Instant};

use anyhow::Context as _;
use rand::Rng;
use serde::{Deserialize, Serialize};
use trmm_comm::Context;
use trmm_kernels::{Distributed, ProblemSize, Sequential, Variant};
use trmm_utils::{alloc::try_vec, AllocationError};

use crate::utils::{
    stats::{self, CannotBeEmpty, Summary},
    NanoSeconds,
};

pub const DEFAULT_TRIALS: NonZeroUsize = match NonZeroUsize::new(10) {
    Some(n) => n,
    None => unreachable!(),
};

pub const DEFAULT_RUNS: NonZeroUsize = NonZeroUsize::MIN;

/// Larger than the last level cache of the machines we run on.
pub const DEFAULT_FLUSH_BYTES: usize = 32 << 20;

const WARMUP_READS: usize = 16;

/// Parameters of the timing harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// The number of measured trials.
    pub trials: NonZeroUsize,
    /// Invocations of `compute` per trial.
    pub runs: NonZeroUsize,
    /// The size of the buffer streamed through the cache before the first trial.
    pub flush_bytes: usize,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            trials: DEFAULT_TRIALS,
            runs: DEFAULT_RUNS,
            flush_bytes: DEFAULT_FLUSH_BYTES,
        }
    }
}

/// Read the clock a few times so the first measured read is not also the first read.
pub fn warmup_timer() {
    let start = Instant::now();
    for _ in 0..WARMUP_READS {
        black_box(start.elapsed());
    }
}

/// Write and then read back a buffer of `bytes` bytes, evicting the problem data from
/// the caches.
///
/// Returns a checksum of the buffer so the traffic cannot be elided.
pub fn flush_cache(bytes: usize) -> Result<i32, AllocationError> {
    let mut buffer = try_vec(0i32, bytes / std::mem::size_of::<i32>())?;
    for (i, x) in buffer.iter_mut().enumerate() {
        *x = i as i32;
    }
    let buffer = black_box(buffer);
    let sum = buffer.iter().fold(0i32, |acc, &x| acc.wrapping_add(x));
    Ok(black_box(sum))
}

/// Per-trial elapsed times, already reduced across ranks, in trial order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialResults {
    times: Vec<NanoSeconds>,
    summary: Summary,
}

impl TrialResults {
    pub fn new(times: Vec<NanoSeconds>) -> Result<Self, CannotBeEmpty> {
        let summary = stats::summarize(&times)?;
        Ok(Self { times, summary })
    }

    pub fn times(&self) -> &[NanoSeconds] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// The representative time.
    pub fn min(&self) -> NanoSeconds {
        self.summary.min
    }

    pub fn max(&self) -> NanoSeconds {
        self.summary.max
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }
}

/// Measure `variant.compute` on already distributed buffers.
///
/// Must be called on every rank. Returns the trial times on the coordinator and `None`
/// elsewhere.
pub fn time_compute(
    ctx: Context<'_>,
    variant: &dyn Variant,
    size: ProblemSize,
    dist: &mut Distributed,
    config: &TimingConfig,
) -> anyhow::Result<Option<TrialResults>> {
    ctx.barrier()?;
    warmup_timer();
    flush_cache(config.flush_bytes).context("could not allocate the cache flush buffer")?;

    let trials = config.trials.get();
    let mut times = ctx.is_root().then(|| Vec::with_capacity(trials));
    for _ in 0..trials {
        let start = Instant::now();
        for _ in 0..config.runs.get() {
            variant.compute(ctx, size, dist)?;
        }
        let elapsed = NanoSeconds::from(start.elapsed());

        let slowest = ctx.reduce_max(elapsed.as_nanos())?;
        if let (Some(times), Some(slowest)) = (times.as_mut(), slowest) {
            times.push(NanoSeconds::new(slowest));
        }
    }

    Ok(times.map(TrialResults::new).transpose()?)
}

/// The throughput of one problem in GFLOP/s given its fastest trial.
///
/// A zero time reports zero throughput.
pub fn throughput_gflops(size: ProblemSize, min: NanoSeconds) -> f64 {
    if min == NanoSeconds::ZERO {
        0.0
    } else {
        // One flop per nanosecond is one GFLOP/s.
        size.flops() / min.as_f64()
    }
}

/// The coordinator's result for one problem size.
#[derive(Debug, Clone, Serialize)]
pub struct TimingRecord {
    pub num_ranks: usize,
    pub m0: usize,
    pub n0: usize,
    pub gflops: f64,
    pub trials: TrialResults,
}

/// Time `variant` on one problem size.
///
/// The coordinator draws fresh inputs from `rng`. After timing, the output is collected
/// to the coordinator and the buffers of the variant are released. Returns the record on the coordinator and `None`
/// elsewhere.
pub fn run_timing<R>(
    ctx: Context<'_>,
    variant: &dyn Variant,
    size: ProblemSize,
    config: &TimingConfig,
    rng: &mut R,
) -> anyhow::Result<Option<TimingRecord>>
where
    R: Rng + ?Sized,
{
    let mut seq = if ctx.is_root() {
        Some(Sequential::random(size, rng)?)
    } else {
        None
    };

    let mut dist = variant.allocate(ctx, size)?;
    variant.distribute(ctx, size, seq.as_ref(), &mut dist)?;
    let trials = time_compute(ctx, variant, size, &mut dist, config)?;
    variant.collect(ctx, size, seq.as_mut().map(|s| &mut s.c), &dist)?;
    variant.free(dist);

    Ok(trials.map(|trials| TimingRecord {
        num_ranks: ctx.num_ranks(),
        m0: size.m0,
        n0: size.n0,
        gflops: throughput_gflops(size, trials.min()),
        trials,
    }))
}

///////////
// Tests //
///////////
