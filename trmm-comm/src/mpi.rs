/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! The MPI world communicator.

use mpi::{
    collective::SystemOperation,
    datatype::{Partition, PartitionMut},
    environment::Universe,
    topology::SimpleCommunicator,
    traits::{Communicator as _, *},
    Count,
};

use crate::{check_len, check_root, CommError, Communicator, Layout};

/// All processes launched by the MPI runtime.
///
/// MPI is initialized on construction and finalized when this value is dropped.
pub struct MpiWorld {
    world: SimpleCommunicator,
    // Dropped last so that the world communicator is released before finalization.
    _universe: Universe,
}

impl MpiWorld {
    pub fn initialize() -> Result<Self, CommError> {
        let universe = mpi::initialize()
            .ok_or_else(|| CommError::Backend("MPI has already been initialized".into()))?;
        let world = universe.world();
        Ok(Self {
            world,
            _universe: universe,
        })
    }

    fn counts(layout: &Layout) -> Result<(Vec<Count>, Vec<Count>), CommError> {
        let convert = |values: &[usize]| -> Result<Vec<Count>, CommError> {
            values
                .iter()
                .map(|&v| {
                    Count::try_from(v).map_err(|_| {
                        CommError::Backend(format!(
                            "{} elements exceeds the MPI count limit of {}",
                            v,
                            Count::MAX
                        ))
                    })
                })
                .collect()
        };
        Ok((convert(layout.counts())?, convert(layout.displacements())?))
    }

    fn root_rank(&self, root: usize) -> Result<Count, CommError> {
        check_root(self, root)?;
        Count::try_from(root).map_err(|_| CommError::InvalidRoot {
            root,
            num_ranks: self.num_ranks(),
        })
    }
}

impl std::fmt::Debug for MpiWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MpiWorld")
            .field("rank", &self.rank())
            .field("num_ranks", &self.num_ranks())
            .finish()
    }
}

impl Communicator for MpiWorld {
    fn rank(&self) -> usize {
        self.world.rank() as usize
    }

    fn num_ranks(&self) -> usize {
        self.world.size() as usize
    }

    fn barrier(&self) -> Result<(), CommError> {
        self.world.barrier();
        Ok(())
    }

    fn broadcast(&self, root: usize, buffer: &mut [f32]) -> Result<(), CommError> {
        let process = self.world.process_at_rank(self.root_rank(root)?);
        process.broadcast_into(buffer);
        Ok(())
    }

    fn scatter_varcount(
        &self,
        root: usize,
        send: Option<(&[f32], &Layout)>,
        recv: &mut [f32],
    ) -> Result<(), CommError> {
        let process = self.world.process_at_rank(self.root_rank(root)?);
        if self.rank() == root {
            let (send, layout) = send.ok_or(CommError::MissingLayout("scatter"))?;
            layout.check(self.num_ranks(), send.len())?;
            check_len("scatter", root, layout.count(root), recv.len())?;
            let (counts, displacements) = Self::counts(layout)?;
            let partition = Partition::new(send, counts, displacements);
            process.scatter_varcount_into_root(&partition, recv);
        } else {
            process.scatter_varcount_into(recv);
        }
        Ok(())
    }

    fn gather_varcount(
        &self,
        root: usize,
        send: &[f32],
        recv: Option<(&mut [f32], &Layout)>,
    ) -> Result<(), CommError> {
        let process = self.world.process_at_rank(self.root_rank(root)?);
        if self.rank() == root {
            let (recv, layout) = recv.ok_or(CommError::MissingLayout("gather"))?;
            layout.check(self.num_ranks(), recv.len())?;
            check_len("gather", root, layout.count(root), send.len())?;
            let (counts, displacements) = Self::counts(layout)?;
            let mut partition = PartitionMut::new(recv, counts, displacements);
            process.gather_varcount_into_root(send, &mut partition);
        } else {
            process.gather_varcount_into(send);
        }
        Ok(())
    }

    fn reduce_max(&self, root: usize, value: u64) -> Result<Option<u64>, CommError> {
        let process = self.world.process_at_rank(self.root_rank(root)?);
        if self.rank() == root {
            let mut max = 0u64;
            process.reduce_into_root(&value, &mut max, SystemOperation::max());
            Ok(Some(max))
        } else {
            process.reduce_into(&value, SystemOperation::max());
            Ok(None)
        }
    }

    fn abort(&self, code: i32) -> ! {
        self.world.abort(code)
    }
}
