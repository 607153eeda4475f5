/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use tracing_subscriber::{EnvFilter, filter::LevelFilter, fmt, prelude::*};

fn env_filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy()
}

/// Install a subscriber logging to `stdout` that honors `RUST_LOG`, falling back to the
/// "info" level when the variable is not set.
pub fn init_subscriber() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_target(true))
        .init();
}

/// Install a subscriber for the current thread only, so that tests running in parallel
/// do not fight over the global default. Logging stops when the guard is dropped.
pub fn init_test_subscriber() -> tracing::subscriber::DefaultGuard {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_target(true).with_test_writer())
        .set_default()
}
