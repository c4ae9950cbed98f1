/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Assignment of matrix rows to ranks.

use std::ops::Range;

use trmm_comm::Layout;

/// Splits `nrows` rows into contiguous ranges, one per rank.
///
/// Every rank receives `nrows / num_ranks` rows and the first `nrows % num_ranks` ranks
/// receive one more. The ranges are disjoint, in rank order, and cover `0..nrows`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowPartition {
    nrows: usize,
    num_ranks: usize,
}

impl RowPartition {
    /// # Panics
    ///
    /// Panics if `num_ranks == 0`.
    pub fn new(nrows: usize, num_ranks: usize) -> Self {
        assert_ne!(num_ranks, 0, "cannot partition rows over zero ranks");
        Self { nrows, num_ranks }
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn num_ranks(&self) -> usize {
        self.num_ranks
    }

    /// The number of rows owned by `rank`.
    pub fn len(&self, rank: usize) -> usize {
        let base = self.nrows / self.num_ranks;
        base + usize::from(rank < self.nrows % self.num_ranks)
    }

    /// The rows owned by `rank`.
    pub fn range(&self, rank: usize) -> Range<usize> {
        let base = self.nrows / self.num_ranks;
        let start = rank * base + rank.min(self.nrows % self.num_ranks);
        start..start + self.len(rank)
    }

    /// The row ranges of all ranks in rank order.
    pub fn ranges(&self) -> impl ExactSizeIterator<Item = Range<usize>> + '_ {
        (0..self.num_ranks).map(|rank| self.range(rank))
    }

    /// The collective layout of a row-major buffer with `ncols` columns split by this
    /// partition.
    pub fn layout(&self, ncols: usize) -> Layout {
        Layout::packed((0..self.num_ranks).map(|rank| self.len(rank) * ncols))
    }
}

///////////
// Tests //
///////////
