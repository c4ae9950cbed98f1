/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use std::ops::Range;

use thiserror::Error;

/// Per-rank element counts and displacements for variable-count collectives.
///
/// Block `r` covers `displacement(r)..displacement(r) + count(r)` of the root's buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    counts: Box<[usize]>,
    displacements: Box<[usize]>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("{counts} counts were given with {displacements} displacements")]
    Mismatched { counts: usize, displacements: usize },
    #[error("the layout describes {got} blocks for a group of {expected} ranks")]
    RankCount { expected: usize, got: usize },
    #[error("block {rank} spans {start}..{end}, past the end of a buffer of length {len}")]
    OutOfBounds {
        rank: usize,
        start: usize,
        end: usize,
        len: usize,
    },
    #[error("blocks {first} and {second} overlap")]
    Overlap { first: usize, second: usize },
    #[error("the blocks cover {total} elements but the buffer holds {len}")]
    Total { total: usize, len: usize },
}

impl Layout {
    /// Construct a layout from explicit counts and displacements.
    pub fn new(counts: Vec<usize>, displacements: Vec<usize>) -> Result<Self, LayoutError> {
        if counts.len() != displacements.len() {
            return Err(LayoutError::Mismatched {
                counts: counts.len(),
                displacements: displacements.len(),
            });
        }
        Ok(Self {
            counts: counts.into(),
            displacements: displacements.into(),
        })
    }

    /// Construct a layout that places the blocks back to back in rank order.
    pub fn packed<I>(counts: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        let counts: Box<[usize]> = counts.into_iter().collect();
        let displacements = counts
            .iter()
            .scan(0usize, |offset, &count| {
                let this = *offset;
                *offset += count;
                Some(this)
            })
            .collect();
        Self {
            counts,
            displacements,
        }
    }

    /// The number of blocks.
    pub fn num_blocks(&self) -> usize {
        self.counts.len()
    }

    /// The element counts of each block.
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// The starting offset of each block.
    pub fn displacements(&self) -> &[usize] {
        &self.displacements
    }

    /// The number of elements in block `rank`.
    ///
    /// # Panics
    ///
    /// Panics if `rank >= self.num_blocks()`.
    pub fn count(&self, rank: usize) -> usize {
        self.counts[rank]
    }

    /// The span of block `rank` within the root's buffer.
    ///
    /// # Panics
    ///
    /// Panics if `rank >= self.num_blocks()`.
    pub fn range(&self, rank: usize) -> Range<usize> {
        let start = self.displacements[rank];
        start..start + self.counts[rank]
    }

    /// The total number of elements covered by all blocks.
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Verify that this layout exactly tiles a buffer of `len` elements for a group of
    /// `num_ranks` ranks.
    ///
    /// The blocks must be in bounds, pairwise disjoint, and their counts must sum to
    /// `len`. A layout that fails this check would silently corrupt the reassembled
    /// buffer, so collectives refuse it before any data moves.
    pub fn check(&self, num_ranks: usize, len: usize) -> Result<(), LayoutError> {
        if self.num_blocks() != num_ranks {
            return Err(LayoutError::RankCount {
                expected: num_ranks,
                got: self.num_blocks(),
            });
        }

        for rank in 0..self.num_blocks() {
            let start = self.displacements[rank];
            let end = start.checked_add(self.counts[rank]);
            match end {
                Some(end) if end <= len => {}
                _ => {
                    return Err(LayoutError::OutOfBounds {
                        rank,
                        start,
                        end: end.unwrap_or(usize::MAX),
                        len,
                    })
                }
            }
        }

        // Order the non-empty blocks by their starting offset and look for overlap
        // between neighbors.
        let mut order: Vec<usize> = (0..self.num_blocks())
            .filter(|&r| self.counts[r] != 0)
            .collect();
        order.sort_by_key(|&r| self.displacements[r]);
        for pair in order.windows(2) {
            if self.range(pair[0]).end > self.displacements[pair[1]] {
                return Err(LayoutError::Overlap {
                    first: pair[0],
                    second: pair[1],
                });
            }
        }

        let total = self.total();
        if total != len {
            return Err(LayoutError::Total { total, len });
        }
        Ok(())
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed() {
        let layout = Layout::packed([4, 3, 3]);
        assert_eq!(layout.counts(), &[4, 3, 3]);
        assert_eq!(layout.displacements(), &[0, 4, 7]);
        assert_eq!(layout.range(1), 4..7);
        assert_eq!(layout.total(), 10);
        assert!(layout.check(3, 10).is_ok());

        let empty = Layout::packed([0, 0]);
        assert!(empty.check(2, 0).is_ok());
    }

    #[test]
    fn test_new() {
        let layout = Layout::new(vec![2, 2], vec![2, 0]).unwrap();
        assert_eq!(layout.range(0), 2..4);
        assert!(layout.check(2, 4).is_ok());

        assert_eq!(
            Layout::new(vec![1, 2], vec![0]).unwrap_err(),
            LayoutError::Mismatched {
                counts: 2,
                displacements: 1
            }
        );
    }

    #[test]
    fn test_check_failures() {
        let layout = Layout::packed([4, 3, 3]);
        assert_eq!(
            layout.check(2, 10).unwrap_err(),
            LayoutError::RankCount {
                expected: 2,
                got: 3
            }
        );
        assert_eq!(
            layout.check(3, 9).unwrap_err(),
            LayoutError::OutOfBounds {
                rank: 2,
                start: 7,
                end: 10,
                len: 9
            }
        );
        assert_eq!(
            layout.check(3, 12).unwrap_err(),
            LayoutError::Total { total: 10, len: 12 }
        );

        let overlapping = Layout::new(vec![3, 3], vec![0, 2]).unwrap();
        assert_eq!(
            overlapping.check(2, 6).unwrap_err(),
            LayoutError::Overlap {
                first: 0,
                second: 1
            }
        );

        let overflowing = Layout::new(vec![usize::MAX], vec![1]).unwrap();
        assert!(matches!(
            overflowing.check(1, 4).unwrap_err(),
            LayoutError::OutOfBounds { rank: 0, .. }
        ));
    }
}
