/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */
use std::time::Instant;

use clap::Parser;
use vsearch::flat::{FlatParams, Strategy};
use vsearch_providers::storage::FileStorageProvider;
use vsearch_tools::{
    utils::{CMDResult, DataType, compute_ground_truth_from_datafiles, init_subscriber},
    with_data_type,
};
use vsearch_vector::distance::Metric;

fn main() -> CMDResult<()> {
    init_subscriber();
    let start = Instant::now();

    let args = ComputeGroundTruthArgs::parse();
    tracing::info!("Computing ground truth file");

    let params = FlatParams::new(args.recall_at)?
        .with_metric(args.distance_function)
        .with_strategy(args.strategy);
    let storage_provider = FileStorageProvider;

    let result = with_data_type!(args.data_type, T => {
        compute_ground_truth_from_datafiles::<T, _>(
            &storage_provider,
            &args.base_file,
            &args.query_file,
            &args.ground_truth_file,
            &params,
            args.num_threads,
        )
    });

    match result {
        Ok(_) => {
            tracing::info!(
                "Compute ground-truth completed successfully in {:?}",
                start.elapsed()
            );
            Ok(())
        }
        Err(err) => {
            tracing::error!("Error: {}", err);
            Err(err)
        }
    }
}

#[derive(Debug, Parser)]
struct ComputeGroundTruthArgs {
    /// Element type of the base and query vectors.
    #[arg(long = "data_type", default_value = "float")]
    pub data_type: DataType,

    /// Distance function to use.
    #[arg(long = "dist_fn", default_value = "l2")]
    pub distance_function: Metric,

    /// Base vectors: a `.bin` file or an array prefix.
    #[arg(long = "base_file", short, required = true)]
    pub base_file: String,

    /// Query vectors: a `.bin` file or an array prefix.
    #[arg(long = "query_file", short, required = true)]
    pub query_file: String,

    /// Path of the ground truth file to write.
    #[arg(long = "gt_file", short, required = true)]
    pub ground_truth_file: String,

    /// Number of ground truth nearest neighbors to compute.
    #[arg(long = "recall_at", short = 'K', default_value = "100")]
    pub recall_at: usize,

    /// Number of worker threads.
    #[arg(long = "num_threads", short = 'T', default_value = "1")]
    pub num_threads: usize,

    /// Parallelize over queries or over blocks of the base vectors.
    #[arg(long = "strategy", default_value = "query")]
    pub strategy: Strategy,
}
