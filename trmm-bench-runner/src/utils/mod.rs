/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

pub mod fmt;
pub mod nanoseconds;
pub mod stats;

pub use nanoseconds::NanoSeconds;
