/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! An in-process process group backed by one thread per rank.
//!
//! Collectives rendezvous through a shared generation counter. Each data-moving collective
//! runs in two phases: contributions are deposited into per-rank slots before the first
//! rendezvous and consumed before the second. The last rank to reach the second rendezvous
//! clears every slot, so the next collective always starts from empty slots.
//!
//! If a rank returns an error or panics, the group is marked as failed and every rank
//! blocked in (or later entering) a collective receives [`CommError::Aborted`]. A rank that
//! returns successfully while others still wait on it releases them with
//! [`CommError::Departed`]. Neither situation can deadlock.

use std::{
    num::NonZeroUsize,
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
};

use crate::{check_len, check_root, CommError, Communicator, Context, Layout};

/// A group of `num_ranks` ranks simulated by scoped threads.
#[derive(Debug, Clone, Copy)]
pub struct LocalGroup {
    num_ranks: NonZeroUsize,
}

impl LocalGroup {
    pub fn new(num_ranks: NonZeroUsize) -> Self {
        Self { num_ranks }
    }

    pub fn num_ranks(&self) -> usize {
        self.num_ranks.get()
    }

    /// Run `f` once on every rank of the group and return the per-rank results in rank
    /// order.
    ///
    /// If any rank fails, the error of the first rank to fail is returned. Errors observed
    /// by other ranks as a consequence (typically [`CommError::Aborted`]) are discarded.
    ///
    /// # Panics
    ///
    /// Resumes the panic of a rank that panicked, after all ranks have exited.
    pub fn run<F, T, E>(&self, f: F) -> Result<Vec<T>, E>
    where
        F: Fn(Context<'_>) -> Result<T, E> + Sync,
        T: Send,
        E: From<CommError> + Send,
    {
        let num_ranks = self.num_ranks();
        let shared = Shared::new(num_ranks);

        let (outcomes, spawn_error) = std::thread::scope(|scope| {
            let mut handles = Vec::with_capacity(num_ranks);
            let mut spawn_error = None;
            for rank in 0..num_ranks {
                let shared = &shared;
                let f = &f;
                let spawned = std::thread::Builder::new()
                    .name(format!("rank-{}", rank))
                    .spawn_scoped(scope, move || {
                        let member = Member { rank, shared };
                        let mut guard = FailOnDrop {
                            rank,
                            shared,
                            armed: true,
                        };
                        let result = f(Context::new(&member));
                        if result.is_ok() {
                            guard.armed = false;
                            shared.depart(rank);
                        }
                        result
                    });

                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(err) => {
                        // Release the ranks that did start.
                        shared.fail(rank);
                        spawn_error = Some(CommError::Backend(format!(
                            "could not start a thread for rank {}: {}",
                            rank, err
                        )));
                        break;
                    }
                }
            }

            let outcomes: Vec<_> = handles.into_iter().map(|h| h.join()).collect();
            (outcomes, spawn_error)
        });

        let mut values = Vec::with_capacity(num_ranks);
        let mut errors = Vec::new();
        let mut panicked = None;
        for (rank, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(Ok(value)) => values.push(value),
                Ok(Err(err)) => errors.push((rank, err)),
                Err(payload) => {
                    panicked.get_or_insert(payload);
                }
            }
        }

        if let Some(payload) = panicked {
            std::panic::resume_unwind(payload);
        }
        if let Some(err) = spawn_error {
            return Err(err.into());
        }
        if !errors.is_empty() {
            let culprit = shared.lock().failed;
            let index = errors
                .iter()
                .position(|(rank, _)| Some(*rank) == culprit)
                .unwrap_or(0);
            return Err(errors.swap_remove(index).1);
        }
        Ok(values)
    }
}

/// Data deposited by a rank for the current collective.
#[derive(Debug, Default)]
enum Slot {
    #[default]
    Empty,
    Data(Vec<f32>),
    Value(u64),
}

impl Slot {
    fn into_data(self, op: &'static str, rank: usize) -> Result<Vec<f32>, CommError> {
        match self {
            Self::Data(data) => Ok(data),
            _ => Err(mismatched(op, rank)),
        }
    }

    fn into_value(self, op: &'static str, rank: usize) -> Result<u64, CommError> {
        match self {
            Self::Value(value) => Ok(value),
            _ => Err(mismatched(op, rank)),
        }
    }
}

fn mismatched(op: &'static str, rank: usize) -> CommError {
    CommError::Backend(format!(
        "rank {} did not contribute to {}; collective calls are out of order",
        rank, op
    ))
}

#[derive(Debug)]
struct State {
    generation: u64,
    arrived: usize,
    slots: Vec<Slot>,
    failed: Option<usize>,
    departed: Option<usize>,
}

impl State {
    fn check(&self) -> Result<(), CommError> {
        if let Some(rank) = self.failed {
            return Err(CommError::Aborted(rank));
        }
        if let Some(rank) = self.departed {
            return Err(CommError::Departed(rank));
        }
        Ok(())
    }

    fn take(&mut self, rank: usize) -> Slot {
        std::mem::take(&mut self.slots[rank])
    }
}

#[derive(Debug)]
struct Shared {
    num_ranks: usize,
    state: Mutex<State>,
    wake: Condvar,
}

impl Shared {
    fn new(num_ranks: usize) -> Self {
        Self {
            num_ranks,
            state: Mutex::new(State {
                generation: 0,
                arrived: 0,
                slots: (0..num_ranks).map(|_| Slot::Empty).collect(),
                failed: None,
                departed: None,
            }),
            wake: Condvar::new(),
        }
    }

    // A panicking rank never holds the lock while the state is inconsistent, so a
    // poisoned lock is safe to reuse.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fail(&self, rank: usize) {
        let mut state = self.lock();
        state.failed.get_or_insert(rank);
        self.wake.notify_all();
    }

    fn depart(&self, rank: usize) {
        let mut state = self.lock();
        state.departed.get_or_insert(rank);
        self.wake.notify_all();
    }

    fn enter(&self) -> Result<MutexGuard<'_, State>, CommError> {
        let state = self.lock();
        state.check()?;
        Ok(state)
    }

    /// Block until every rank has arrived at the current generation.
    fn arrive<'a>(
        &'a self,
        state: MutexGuard<'a, State>,
    ) -> Result<MutexGuard<'a, State>, CommError> {
        self.rendezvous(state, false)
    }

    /// Like [`Self::arrive`], but the last rank to arrive clears all slots.
    fn finish(&self, state: MutexGuard<'_, State>) -> Result<(), CommError> {
        self.rendezvous(state, true).map(drop)
    }

    fn rendezvous<'a>(
        &'a self,
        mut state: MutexGuard<'a, State>,
        clear: bool,
    ) -> Result<MutexGuard<'a, State>, CommError> {
        state.check()?;
        let generation = state.generation;
        state.arrived += 1;
        if state.arrived == self.num_ranks {
            if clear {
                state.slots.iter_mut().for_each(|s| *s = Slot::Empty);
            }
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            self.wake.notify_all();
            return Ok(state);
        }

        loop {
            state = self
                .wake
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
            if state.generation != generation {
                return Ok(state);
            }
            state.check()?;
        }
    }
}

/// Marks the group as failed unless disarmed, including when a rank unwinds.
struct FailOnDrop<'a> {
    rank: usize,
    shared: &'a Shared,
    armed: bool,
}

impl Drop for FailOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.shared.fail(self.rank);
        }
    }
}

/// The communicator seen by a single rank of a [`LocalGroup`].
struct Member<'a> {
    rank: usize,
    shared: &'a Shared,
}

impl Communicator for Member<'_> {
    fn rank(&self) -> usize {
        self.rank
    }

    fn num_ranks(&self) -> usize {
        self.shared.num_ranks
    }

    fn barrier(&self) -> Result<(), CommError> {
        let state = self.shared.enter()?;
        self.shared.finish(state)
    }

    fn broadcast(&self, root: usize, buffer: &mut [f32]) -> Result<(), CommError> {
        check_root(self, root)?;
        let mut state = self.shared.enter()?;
        if self.rank == root {
            state.slots[root] = Slot::Data(buffer.to_vec());
        }

        let state = self.shared.arrive(state)?;
        if self.rank != root {
            match &state.slots[root] {
                Slot::Data(data) => {
                    check_len("broadcast", self.rank, buffer.len(), data.len())?;
                    buffer.copy_from_slice(data);
                }
                _ => return Err(mismatched("broadcast", root)),
            }
        }
        self.shared.finish(state)
    }

    fn scatter_varcount(
        &self,
        root: usize,
        send: Option<(&[f32], &Layout)>,
        recv: &mut [f32],
    ) -> Result<(), CommError> {
        check_root(self, root)?;
        let send = if self.rank == root {
            let (send, layout) = send.ok_or(CommError::MissingLayout("scatter"))?;
            layout.check(self.num_ranks(), send.len())?;
            check_len("scatter", root, layout.count(root), recv.len())?;
            Some((send, layout))
        } else {
            None
        };

        let mut state = self.shared.enter()?;
        if let Some((send, layout)) = send {
            for rank in (0..self.num_ranks()).filter(|&r| r != root) {
                state.slots[rank] = Slot::Data(send[layout.range(rank)].to_vec());
            }
            recv.copy_from_slice(&send[layout.range(root)]);
        }

        let mut state = self.shared.arrive(state)?;
        if self.rank != root {
            let data = state.take(self.rank).into_data("scatter", self.rank)?;
            check_len("scatter", self.rank, recv.len(), data.len())?;
            recv.copy_from_slice(&data);
        }
        self.shared.finish(state)
    }

    fn gather_varcount(
        &self,
        root: usize,
        send: &[f32],
        recv: Option<(&mut [f32], &Layout)>,
    ) -> Result<(), CommError> {
        check_root(self, root)?;
        let recv = if self.rank == root {
            let (recv, layout) = recv.ok_or(CommError::MissingLayout("gather"))?;
            layout.check(self.num_ranks(), recv.len())?;
            check_len("gather", root, layout.count(root), send.len())?;
            Some((recv, layout))
        } else {
            None
        };

        let mut state = self.shared.enter()?;
        if self.rank != root {
            state.slots[self.rank] = Slot::Data(send.to_vec());
        }

        let mut state = self.shared.arrive(state)?;
        if let Some((recv, layout)) = recv {
            recv[layout.range(root)].copy_from_slice(send);
            for rank in (0..self.num_ranks()).filter(|&r| r != root) {
                let data = state.take(rank).into_data("gather", rank)?;
                check_len("gather", rank, layout.count(rank), data.len())?;
                recv[layout.range(rank)].copy_from_slice(&data);
            }
        }
        self.shared.finish(state)
    }

    fn reduce_max(&self, root: usize, value: u64) -> Result<Option<u64>, CommError> {
        check_root(self, root)?;
        let mut state = self.shared.enter()?;
        if self.rank != root {
            state.slots[self.rank] = Slot::Value(value);
        }

        let mut state = self.shared.arrive(state)?;
        let mut max = None;
        if self.rank == root {
            let mut current = value;
            for rank in (0..self.num_ranks()).filter(|&r| r != root) {
                current = current.max(state.take(rank).into_value("reduce", rank)?);
            }
            max = Some(current);
        }
        self.shared.finish(state)?;
        Ok(max)
    }

    fn abort(&self, code: i32) -> ! {
        self.shared.fail(self.rank);
        std::process::exit(code)
    }
}

///////////
// Tests //
///////////
