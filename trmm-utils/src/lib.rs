/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Dense row-major buffers shared by the triangular multiply kernels and harnesses.

pub mod alloc;
pub use alloc::AllocationError;

pub mod buffers;

// Views
pub mod views;
