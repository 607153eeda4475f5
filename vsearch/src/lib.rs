/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Exact and partitioned nearest neighbor search over dense matrices.

pub mod error;
pub mod neighbor;
pub mod result;
pub mod utils;

// Search kernels
pub mod flat;
pub mod ivf;
pub mod recall;

// Top level exports.
pub use error::{VSError, VSErrorKind, VSResult};
pub use result::TopKResult;
