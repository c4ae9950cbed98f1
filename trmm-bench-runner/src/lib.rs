/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Harnesses and a command line driver for benchmarking triangular multiply variants.
//!
//! The [`timing`] harness measures the throughput of a single variant. The [`verify`]
//! harness compares a candidate variant against a reference on identical inputs. Both
//! are driven over a [`sweep`] of problem sizes by the [`App`], which reports one CSV
//! row per size through the [`report`] module.

pub mod app;
pub mod logging;
pub mod output;
pub mod registry;
pub mod report;
pub mod sweep;
pub mod timing;
pub mod utils;
pub mod verify;

pub use app::App;
pub use output::Output;
pub use registry::Variants;
