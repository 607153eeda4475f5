/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

pub mod rayon_util;
pub use rayon_util::{
    AsThreadPool, OwnedPool, ParallelIteratorInPool, RayonThreadPool, create_thread_pool,
    create_thread_pool_for_test,
};
