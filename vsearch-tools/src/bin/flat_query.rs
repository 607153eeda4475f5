/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */
use clap::Parser;
use vsearch::flat::{FlatParams, Strategy};
use vsearch_providers::storage::FileStorageProvider;
use vsearch_tools::{
    utils::{CMDResult, DataType, FlatQueryFiles, flat_query_from_datafiles, init_subscriber},
    with_data_type,
};
use vsearch_vector::distance::Metric;

fn main() -> CMDResult<()> {
    init_subscriber();
    let args = FlatQueryArgs::parse();

    let params = FlatParams::new(args.recall_at)?
        .with_metric(args.distance_function)
        .with_strategy(args.strategy);
    let files = FlatQueryFiles {
        base_file: &args.base_file,
        query_file: &args.query_file,
        ground_truth_file: args.ground_truth_file.as_deref(),
        result_file: args.result_file.as_deref(),
    };
    let storage_provider = FileStorageProvider;

    let report = with_data_type!(args.data_type, T => {
        flat_query_from_datafiles::<T, _>(&storage_provider, files, &params, args.num_threads)
    })
    .inspect_err(|err| tracing::error!("Error: {}", err))?;

    let qps = report.result.nqueries() as f64 / report.elapsed.as_secs_f64().max(f64::EPSILON);
    println!("{:>8} {:>12} {:>12}", "Threads", "QPS", "Recall");
    println!(
        "{:>8} {:>12.1} {:>12}",
        args.num_threads,
        qps,
        report
            .recall
            .as_ref()
            .map_or_else(|| "-".to_owned(), |r| format!("{:.4}", r.average)),
    );
    if report.valid == Some(false) {
        tracing::warn!("results differ from the first {} ground truth ids", params.k());
    }
    Ok(())
}

#[derive(Debug, Parser)]
struct FlatQueryArgs {
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

    /// Ground truth to compute recall against.
    #[arg(long = "gt_file", short)]
    pub ground_truth_file: Option<String>,

    /// Where to write the results, in the ground truth format.
    #[arg(long = "result_file", short)]
    pub result_file: Option<String>,

    /// Number of neighbors to return per query.
    #[arg(long = "recall_at", short = 'K', default_value = "10")]
    pub recall_at: usize,

    /// Number of worker threads.
    #[arg(long = "num_threads", short = 'T', default_value = "1")]
    pub num_threads: usize,

    /// Parallelize over queries or over blocks of the base vectors.
    #[arg(long = "strategy", default_value = "query")]
    pub strategy: Strategy,
}
