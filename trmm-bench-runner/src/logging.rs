/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

fn filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy()
}

/// Install a global subscriber logging to `stderr` and respecting the `RUST_LOG`
/// environment variable.
///
/// Reports go to `stdout`, so logging must stay off it. If `RUST_LOG` is not set, the
/// "info" level is used.
pub fn init_subscriber() {
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter())
        .with(fmt_layer)
        .init();
}

/// Create a subscriber for tests.
///
/// The subscriber is only installed on the current thread until the returned guard is
/// dropped, so test threads do not conflict.
pub fn init_test_subscriber() -> tracing::subscriber::DefaultGuard {
    let fmt_layer = fmt::layer().with_target(true).with_test_writer();

    tracing_subscriber::registry()
        .with(filter())
        .with(fmt_layer)
        .set_default()
}
