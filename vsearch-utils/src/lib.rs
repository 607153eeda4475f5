/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

// Views
pub mod vector;
pub mod views;

pub mod dtype;
pub use dtype::{DataType, Scalar, UnsupportedDtype};

pub mod io;
