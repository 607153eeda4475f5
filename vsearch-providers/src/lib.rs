/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Where matrices live: storage providers, `.bin` files, memory maps and tiled arrays.

pub mod storage;

pub mod array;
pub use array::{AnyMatrix, ArraySchema, load_matrix, read_matrix, read_matrix_any};
