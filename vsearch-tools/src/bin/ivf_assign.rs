/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */
use clap::Parser;
use vsearch::flat::FlatParams;
use vsearch_providers::storage::FileStorageProvider;
use vsearch_tools::{
    utils::{CMDResult, DataType, assign_from_datafiles, init_subscriber},
    with_data_type,
};
use vsearch_vector::distance::Metric;

fn main() -> CMDResult<()> {
    init_subscriber();
    let args = IvfAssignArgs::parse();

    let params = FlatParams::new(args.num_probes)?.with_metric(args.distance_function);
    let storage_provider = FileStorageProvider;

    let summary = with_data_type!(args.data_type, T => {
        assign_from_datafiles::<T, _>(
            &storage_provider,
            &args.centroids_file,
            &args.vectors_file,
            args.assignment_file.as_deref(),
            &params,
            args.num_threads,
        )
    })
    .inspect_err(|err| tracing::error!("Error: {}", err))?;

    println!("{:>10} {:>10}", "Partition", "Size");
    for (p, size) in summary.partition_sizes.iter().enumerate() {
        println!("{p:>10} {size:>10}");
    }
    Ok(())
}

#[derive(Debug, Parser)]
struct IvfAssignArgs {
    /// Element type of the centroids and vectors.
    #[arg(long = "data_type", default_value = "float")]
    pub data_type: DataType,

    /// Distance function to use.
    #[arg(long = "dist_fn", default_value = "l2")]
    pub distance_function: Metric,

    /// Centroids: a `.bin` file or an array prefix.
    #[arg(long = "centroids_file", required = true)]
    pub centroids_file: String,

    /// Vectors to assign: a `.bin` file or an array prefix.
    #[arg(long = "vectors_file", required = true)]
    pub vectors_file: String,

    /// Where to write the assigned centroid ids and distances, in the ground truth format.
    #[arg(long = "assignment_file")]
    pub assignment_file: Option<String>,

    /// Number of nearest centroids to record per vector.
    #[arg(long = "num_probes", short = 'K', default_value = "1")]
    pub num_probes: usize,

    /// Number of worker threads.
    #[arg(long = "num_threads", short = 'T', default_value = "1")]
    pub num_threads: usize,
}
