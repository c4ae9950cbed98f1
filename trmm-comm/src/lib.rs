/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Collective communication for lock-step process groups.
//!
//! Every rank of a group executes the same sequence of collective operations. A rank that
//! issues a collective blocks until all ranks have issued the matching call. This is the
//! only form of synchronization between ranks.
//!
//! The [`Communicator`] trait abstracts over the transport:
//!
//! * [`SingleProcess`]: a group of one. Collectives reduce to local copies.
//! * [`LocalGroup`]: an in-process group with one thread per rank. Used to simulate
//!   arbitrary process counts without a distributed runtime.
//! * `mpi::MpiWorld` (feature `mpi`): the MPI world communicator.
//!
//! Operations are reached through a [`Context`], which pairs a communicator with the
//! designated coordinator (root) rank.

use thiserror::Error;

mod context;
pub use context::Context;

pub mod layout;
pub use layout::{Layout, LayoutError};

pub mod local;
pub use local::LocalGroup;

mod single;
pub use single::SingleProcess;

#[cfg(feature = "mpi")]
pub mod mpi;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Errors reported by collective operations.
#[derive(Debug, Error)]
pub enum CommError {
    #[error("root rank {root} is out of range for a group of {num_ranks} ranks")]
    InvalidRoot { root: usize, num_ranks: usize },
    #[error("invalid collective layout")]
    Layout(#[from] LayoutError),
    #[error("the root rank must provide a receive layout for {0}")]
    MissingLayout(&'static str),
    #[error("{op} on rank {rank} expected {expected} elements but got {got}")]
    LengthMismatch {
        op: &'static str,
        rank: usize,
        expected: usize,
        got: usize,
    },
    #[error("the process group was aborted after rank {0} failed")]
    Aborted(usize),
    #[error("rank {0} left the group while a collective operation was pending")]
    Departed(usize),
    #[error("communication backend failure: {0}")]
    Backend(String),
}

/// A group of ranks executing collective operations in lock-step.
///
/// Every method that moves data is a collective: all ranks of the group must call it in
/// the same order with the same `root`. Only the root supplies a [`Layout`] for the
/// variable-count operations. Non-root ranks pass `None`.
pub trait Communicator {
    /// The zero-based index of the calling rank.
    fn rank(&self) -> usize;

    /// The number of ranks in the group.
    fn num_ranks(&self) -> usize;

    /// Block until every rank has entered the barrier.
    fn barrier(&self) -> Result<(), CommError>;

    /// Copy `buffer` on `root` into `buffer` on every other rank.
    ///
    /// All ranks must pass buffers of the same length.
    fn broadcast(&self, root: usize, buffer: &mut [f32]) -> Result<(), CommError>;

    /// Distribute blocks of the root's `send` buffer to every rank.
    ///
    /// Rank `r` receives `send[layout.range(r)]` into `recv`, whose length must equal
    /// `layout.count(r)`. The root passes `Some((send, layout))`.
    fn scatter_varcount(
        &self,
        root: usize,
        send: Option<(&[f32], &Layout)>,
        recv: &mut [f32],
    ) -> Result<(), CommError>;

    /// Reassemble the `send` buffers of every rank on the root.
    ///
    /// The contribution of rank `r` lands in `recv[layout.range(r)]`. The root passes
    /// `Some((recv, layout))`.
    fn gather_varcount(
        &self,
        root: usize,
        send: &[f32],
        recv: Option<(&mut [f32], &Layout)>,
    ) -> Result<(), CommError>;

    /// Reduce `value` across all ranks by taking the maximum.
    ///
    /// Returns `Some(max)` on the root and `None` elsewhere.
    fn reduce_max(&self, root: usize, value: u64) -> Result<Option<u64>, CommError>;

    /// Terminate every rank of the group immediately.
    fn abort(&self, code: i32) -> !;
}

impl<C> Communicator for &C
where
    C: Communicator + ?Sized,
{
    fn rank(&self) -> usize {
        (**self).rank()
    }

    fn num_ranks(&self) -> usize {
        (**self).num_ranks()
    }

    fn barrier(&self) -> Result<(), CommError> {
        (**self).barrier()
    }

    fn broadcast(&self, root: usize, buffer: &mut [f32]) -> Result<(), CommError> {
        (**self).broadcast(root, buffer)
    }

    fn scatter_varcount(
        &self,
        root: usize,
        send: Option<(&[f32], &Layout)>,
        recv: &mut [f32],
    ) -> Result<(), CommError> {
        (**self).scatter_varcount(root, send, recv)
    }

    fn gather_varcount(
        &self,
        root: usize,
        send: &[f32],
        recv: Option<(&mut [f32], &Layout)>,
    ) -> Result<(), CommError> {
        (**self).gather_varcount(root, send, recv)
    }

    fn reduce_max(&self, root: usize, value: u64) -> Result<Option<u64>, CommError> {
        (**self).reduce_max(root, value)
    }

    fn abort(&self, code: i32) -> ! {
        (**self).abort(code)
    }
}

/// Check that `root` names a rank of `comm`.
pub(crate) fn check_root(comm: &dyn Communicator, root: usize) -> Result<(), CommError> {
    let num_ranks = comm.num_ranks();
    if root < num_ranks {
        Ok(())
    } else {
        Err(CommError::InvalidRoot { root, num_ranks })
    }
}

/// Check the length of a buffer participating in `op`.
pub(crate) fn check_len(
    op: &'static str,
    rank: usize,
    expected: usize,
    got: usize,
) -> Result<(), CommError> {
    if expected == got {
        Ok(())
    } else {
        Err(CommError::LengthMismatch {
            op,
            rank,
            expected,
            got,
        })
    }
}
