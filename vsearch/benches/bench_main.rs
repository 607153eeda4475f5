/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use benchmarks::{
    flat_bench::benchmark_flat_search,
    queue_bench::benchmark_top_k_queue_insert,
};
use criterion::{criterion_group, criterion_main};
mod benchmarks;

criterion_group!(
    benches,
    benchmark_flat_search,
    benchmark_top_k_queue_insert
);

criterion_main!(benches);
