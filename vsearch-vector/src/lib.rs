/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */
//! # vector
//!
//! Distance kernels over slices of primitive numbers. All kernels widen their inputs to
//! `f64` and return `f64`, where smaller values mean closer vectors.
#![cfg_attr(
    not(test),
    warn(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::undocumented_unsafe_blocks
    )
)]

mod traits;
pub use traits::{DistanceFunction, PureDistanceFunction};

pub mod distance;
