/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use crate::{CommError, Communicator, Layout};

/// The execution context handed to every harness and kernel operation.
///
/// Bundles the calling rank's communicator with the coordinator rank, which owns the
/// sequential buffers and performs all I/O. Rooted collectives issued through a context
/// always use the coordinator as their root.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    comm: &'a dyn Communicator,
    root: usize,
}

impl<'a> Context<'a> {
    /// Construct a context with rank 0 as the coordinator.
    pub fn new(comm: &'a dyn Communicator) -> Self {
        Self { comm, root: 0 }
    }

    /// The communicator backing this context.
    pub fn comm(&self) -> &'a dyn Communicator {
        self.comm
    }

    /// The rank of the calling process.
    pub fn rank(&self) -> usize {
        self.comm.rank()
    }

    /// The number of processes in the group.
    pub fn num_ranks(&self) -> usize {
        self.comm.num_ranks()
    }

    /// The coordinator rank.
    pub fn root(&self) -> usize {
        self.root
    }

    /// Return `true` if the calling process is the coordinator.
    pub fn is_root(&self) -> bool {
        self.rank() == self.root
    }

    pub fn barrier(&self) -> Result<(), CommError> {
        tracing::debug!(rank = self.rank(), "barrier");
        self.comm.barrier()
    }

    /// Broadcast `buffer` from the coordinator to every rank.
    pub fn broadcast(&self, buffer: &mut [f32]) -> Result<(), CommError> {
        tracing::debug!(rank = self.rank(), len = buffer.len(), "broadcast");
        self.comm.broadcast(self.root, buffer)
    }

    /// Scatter blocks of the coordinator's buffer. See
    /// [`Communicator::scatter_varcount`].
    pub fn scatter_varcount(
        &self,
        send: Option<(&[f32], &Layout)>,
        recv: &mut [f32],
    ) -> Result<(), CommError> {
        tracing::debug!(rank = self.rank(), len = recv.len(), "scatter");
        self.comm.scatter_varcount(self.root, send, recv)
    }

    /// Gather blocks onto the coordinator's buffer. See
    /// [`Communicator::gather_varcount`].
    pub fn gather_varcount(
        &self,
        send: &[f32],
        recv: Option<(&mut [f32], &Layout)>,
    ) -> Result<(), CommError> {
        tracing::debug!(rank = self.rank(), len = send.len(), "gather");
        self.comm.gather_varcount(self.root, send, recv)
    }

    /// Reduce `value` to its maximum across ranks. Returns `Some` on the coordinator.
    pub fn reduce_max(&self, value: u64) -> Result<Option<u64>, CommError> {
        self.comm.reduce_max(self.root, value)
    }
}

impl std::fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("rank", &self.rank())
            .field("num_ranks", &self.num_ranks())
            .field("root", &self.root)
            .finish()
    }
}
