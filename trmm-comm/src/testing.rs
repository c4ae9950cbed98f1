/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Test helpers for observing the collective traffic of a rank.

use std::cell::Cell;

use crate::{CommError, Communicator, Layout};

/// The number of collective operations issued through a [`Recording`] communicator.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Calls {
    pub barrier: usize,
    pub broadcast: usize,
    pub scatter: usize,
    pub gather: usize,
    pub reduce: usize,
}

impl Calls {
    pub fn total(&self) -> usize {
        self.barrier + self.broadcast + self.scatter + self.gather + self.reduce
    }
}

/// A communicator that forwards to `C` while counting every collective issued.
#[derive(Debug, Default)]
pub struct Recording<C> {
    inner: C,
    calls: Cell<Calls>,
}

impl<C> Recording<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            calls: Cell::new(Calls::default()),
        }
    }

    pub fn calls(&self) -> Calls {
        self.calls.get()
    }

    fn record(&self, f: impl FnOnce(&mut Calls)) {
        let mut calls = self.calls.get();
        f(&mut calls);
        self.calls.set(calls);
    }
}

impl<C: Communicator> Communicator for Recording<C> {
    fn rank(&self) -> usize {
        self.inner.rank()
    }

    fn num_ranks(&self) -> usize {
        self.inner.num_ranks()
    }

    fn barrier(&self) -> Result<(), CommError> {
        self.record(|c| c.barrier += 1);
        self.inner.barrier()
    }

    fn broadcast(&self, root: usize, buffer: &mut [f32]) -> Result<(), CommError> {
        self.record(|c| c.broadcast += 1);
        self.inner.broadcast(root, buffer)
    }

    fn scatter_varcount(
        &self,
        root: usize,
        send: Option<(&[f32], &Layout)>,
        recv: &mut [f32],
    ) -> Result<(), CommError> {
        self.record(|c| c.scatter += 1);
        self.inner.scatter_varcount(root, send, recv)
    }

    fn gather_varcount(
        &self,
        root: usize,
        send: &[f32],
        recv: Option<(&mut [f32], &Layout)>,
    ) -> Result<(), CommError> {
        self.record(|c| c.gather += 1);
        self.inner.gather_varcount(root, send, recv)
    }

    fn reduce_max(&self, root: usize, value: u64) -> Result<Option<u64>, CommError> {
        self.record(|c| c.reduce += 1);
        self.inner.reduce_max(root, value)
    }

    fn abort(&self, code: i32) -> ! {
        self.inner.abort(code)
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Context, SingleProcess};

    #[test]
    fn test_counts() {
        let comm = Recording::new(SingleProcess);
        let ctx = Context::new(&comm);
        ctx.barrier().unwrap();
        ctx.broadcast(&mut [0.0]).unwrap();
        ctx.reduce_max(3).unwrap();

        let calls = comm.calls();
        assert_eq!(calls.barrier, 1);
        assert_eq!(calls.broadcast, 1);
        assert_eq!(calls.reduce, 1);
        assert_eq!(calls.total(), 3);
    }
}
