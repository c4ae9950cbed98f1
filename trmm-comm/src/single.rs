/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use crate::{check_len, check_root, CommError, Communicator, Layout};

/// A process group containing only the calling process.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleProcess;

impl Communicator for SingleProcess {
    fn rank(&self) -> usize {
        0
    }

    fn num_ranks(&self) -> usize {
        1
    }

    fn barrier(&self) -> Result<(), CommError> {
        Ok(())
    }

    fn broadcast(&self, root: usize, _buffer: &mut [f32]) -> Result<(), CommError> {
        check_root(self, root)
    }

    fn scatter_varcount(
        &self,
        root: usize,
        send: Option<(&[f32], &Layout)>,
        recv: &mut [f32],
    ) -> Result<(), CommError> {
        check_root(self, root)?;
        let (send, layout) = send.ok_or(CommError::MissingLayout("scatter"))?;
        layout.check(1, send.len())?;
        check_len("scatter", 0, layout.count(0), recv.len())?;
        recv.copy_from_slice(&send[layout.range(0)]);
        Ok(())
    }

    fn gather_varcount(
        &self,
        root: usize,
        send: &[f32],
        recv: Option<(&mut [f32], &Layout)>,
    ) -> Result<(), CommError> {
        check_root(self, root)?;
        let (recv, layout) = recv.ok_or(CommError::MissingLayout("gather"))?;
        layout.check(1, recv.len())?;
        check_len("gather", 0, layout.count(0), send.len())?;
        recv[layout.range(0)].copy_from_slice(send);
        Ok(())
    }

    fn reduce_max(&self, root: usize, value: u64) -> Result<Option<u64>, CommError> {
        check_root(self, root)?;
        Ok(Some(value))
    }

    fn abort(&self, code: i32) -> ! {
        std::process::exit(code)
    }
}

///////////
// Tests //
///////////
