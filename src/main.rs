use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use taproot_impute::{ImputeConfig, StopRule};
use taproot_io::{ResultWriter, RunName, SampleTable, TableReader};
use taproot_mds::classical_mds;
use taproot_rf::{ForestConfig, MtryRule, MtrySearch, ProximityMode, TrainedModel};

#[derive(Parser)]
#[command(name = "taproot")]
#[command(about = "Random-forest profiling of plant compartment metabolomes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Input table and output location, shared by every subcommand.
#[derive(Args, Debug, Clone)]
struct DataArgs {
    /// Path to the input TSV file
    #[arg(long)]
    data: PathBuf,

    /// Header name of the class label column
    #[arg(long, default_value = "Factor")]
    label_column: String,

    /// Comma-separated class names; their order fixes the class indices
    #[arg(long, value_delimiter = ',', default_value = "leaf,root,rhizosphere")]
    classes: Vec<String>,

    /// Run name for output files (must match [a-zA-Z0-9_-]+)
    #[arg(long, default_value = "metabolome")]
    run: String,

    /// Output directory for result files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

/// Forest parameters shared by train and tune.
#[derive(Args, Debug, Clone)]
struct ForestArgs {
    /// Number of trees in the forest
    #[arg(long, default_value_t = 1000)]
    trees: usize,

    /// Features drawn per split (rounded square root of the feature
    /// count if not set); for tune this is the starting width
    #[arg(long)]
    mtry: Option<usize>,
}

/// Imputation parameters for tables with missing cells.
#[derive(Args, Debug, Clone)]
struct ImputeArgs {
    /// Refinement iterations for the proximity imputer
    #[arg(long, default_value_t = 10)]
    impute_iterations: usize,

    /// Trees per preliminary imputation forest
    #[arg(long, default_value_t = 300)]
    impute_trees: usize,

    /// Stop refining once the relative OOB change drops below this
    /// threshold instead of always running every iteration
    #[arg(long)]
    converge_epsilon: Option<f64>,
}

#[derive(Subcommand)]
enum Command {
    /// Impute missing cells, train the forest, and write every artifact
    Train {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        forest: ForestArgs,

        #[command(flatten)]
        impute: ImputeArgs,

        /// Number of top-ranked features to highlight
        #[arg(long, default_value_t = 10)]
        top_k: usize,
    },

    /// Search per-split widths around the default and report the best
    Tune {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        forest: ForestArgs,

        #[command(flatten)]
        impute: ImputeArgs,

        /// Multiplicative step between successive widths
        #[arg(long, default_value_t = 1.5)]
        step_factor: f64,

        /// Minimum relative OOB improvement to keep stepping
        #[arg(long, default_value_t = 1e-5)]
        improve: f64,

        /// Maximum widths tried per direction
        #[arg(long, default_value_t = 10)]
        max_steps: usize,
    },

    /// Fill missing cells and write the completed table
    Impute {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        impute: ImputeArgs,

        /// Features drawn per split in the preliminary forests
        #[arg(long)]
        mtry: Option<usize>,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct TrainOutput {
    run: String,
    n_samples: usize,
    n_features: usize,
    n_missing: usize,
    n_trees: usize,
    mtry: usize,
    oob_error: f64,
    class_errors: Vec<Option<f64>>,
    top_features: Vec<String>,
}

#[derive(Serialize)]
struct TuneOutput {
    run: String,
    n_samples: usize,
    n_features: usize,
    start_mtry: usize,
    best_mtry: usize,
    best_error: f64,
    n_trials: usize,
}

#[derive(Serialize)]
struct ImputeOutput {
    run: String,
    n_samples: usize,
    n_features: usize,
    n_missing: usize,
    n_filled: usize,
    iterations_run: usize,
    stopped_early: bool,
}

fn build_mtry(mtry: Option<usize>) -> MtryRule {
    match mtry {
        Some(width) => MtryRule::Fixed(width),
        None => MtryRule::Sqrt,
    }
}

fn build_stop_rule(impute: &ImputeArgs) -> StopRule {
    match impute.converge_epsilon {
        Some(epsilon) => StopRule::OobStabilized {
            epsilon,
            max_iterations: impute.impute_iterations,
        },
        None => StopRule::FixedIterations(impute.impute_iterations),
    }
}

fn load_table(data: &DataArgs) -> Result<SampleTable> {
    let table = TableReader::new(&data.data, &data.label_column, &data.classes)
        .read()
        .context("failed to read input TSV")?;
    info!(
        n_samples = table.n_samples(),
        n_features = table.n_features(),
        n_missing = table.n_missing(),
        "table loaded"
    );
    Ok(table)
}

/// Return the table as a dense matrix, imputing first when any cell
/// is missing.
fn complete_matrix(
    table: &SampleTable,
    impute: &ImputeArgs,
    mtry: MtryRule,
    seed: u64,
) -> Result<Vec<Vec<f64>>> {
    if let Some(complete) = table.to_complete() {
        info!("no missing cells, imputation skipped");
        return Ok(complete);
    }
    let outcome = ImputeConfig::new()
        .with_trees(impute.impute_trees)
        .with_mtry(mtry)
        .with_stop_rule(build_stop_rule(impute))
        .with_seed(seed)
        .run(table.values(), table.labels(), table.feature_names())
        .context("imputation failed")?;
    Ok(outcome.into_matrix().into_rows())
}

fn write_training_artifacts(
    writer: &ResultWriter,
    table: &SampleTable,
    model: &TrainedModel,
    top_k: usize,
) -> Result<()> {
    let meta = model.metadata();
    let class_metrics: Vec<(f64, f64, f64, usize)> = model
        .confusion()
        .class_metrics()
        .iter()
        .map(|m| (m.precision, m.recall, m.f1, m.support))
        .collect();
    writer.write_training(
        meta.n_trees,
        meta.mtry,
        meta.n_samples,
        meta.n_features,
        table.class_names(),
        model.oob().error(),
        model.oob().class_errors(),
        model.confusion().as_rows(),
        &class_metrics,
    )?;

    let curve: Vec<(usize, Option<f64>, Vec<Option<f64>>)> = model
        .oob()
        .curve()
        .iter()
        .map(|p| (p.n_trees, p.overall, p.per_class.clone()))
        .collect();
    writer.write_oob_curve(table.class_names(), &curve)?;

    let names: Vec<String> = model.importances().iter().map(|f| f.name.clone()).collect();
    let importances: Vec<f64> = model.importances().iter().map(|f| f.importance).collect();
    let ranks: Vec<usize> = model.importances().iter().map(|f| f.rank).collect();
    writer.write_importance(&names, &importances, &ranks, top_k)?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Train {
            data,
            forest,
            impute,
            top_k,
        } => {
            let run_name = RunName::new(data.run.clone())?;
            let table = load_table(&data)?;
            let n_missing = table.n_missing();

            // 1. Complete the matrix
            let matrix = complete_matrix(&table, &impute, build_mtry(forest.mtry), cli.seed)?;

            // 2. Train with proximity for the ordination
            let model = ForestConfig::new(forest.trees)?
                .with_mtry(build_mtry(forest.mtry))
                .with_proximity(ProximityMode::Enabled)
                .with_n_classes(table.n_classes())
                .with_seed(cli.seed)
                .fit(&matrix, table.labels(), table.feature_names())
                .context("training failed")?;
            info!(oob_error = model.oob().error(), "model trained");

            // 3. Project 1 - proximity into two ordination axes
            let proximity = model
                .proximity()
                .context("proximity missing from trained model")?;
            let embedding = classical_mds(
                &proximity.condensed_distances(),
                table.n_samples(),
                2,
            )
            .context("ordination failed")?;

            // 4. Write JSON artifacts
            let writer = ResultWriter::new(&data.output_dir, run_name)?;
            write_training_artifacts(&writer, &table, &model, top_k)?;
            writer.write_embedding(
                table.sample_ids(),
                table.class_names(),
                table.labels(),
                embedding.coordinates(),
                embedding.eigenvalues(),
                embedding.proportion_explained(),
            )?;

            // 5. Print summary
            let meta = model.metadata();
            let output = TrainOutput {
                run: data.run,
                n_samples: meta.n_samples,
                n_features: meta.n_features,
                n_missing,
                n_trees: meta.n_trees,
                mtry: meta.mtry,
                oob_error: model.oob().error(),
                class_errors: model.oob().class_errors().to_vec(),
                top_features: model
                    .top_features(top_k)
                    .iter()
                    .map(|f| f.name.clone())
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Tune {
            data,
            forest,
            impute,
            step_factor,
            improve,
            max_steps,
        } => {
            let run_name = RunName::new(data.run.clone())?;
            let table = load_table(&data)?;

            // 1. Complete the matrix
            let matrix = complete_matrix(&table, &impute, MtryRule::Sqrt, cli.seed)?;

            // 2. Step the width in both directions from the start
            let base = ForestConfig::new(forest.trees)?
                .with_mtry(build_mtry(forest.mtry))
                .with_n_classes(table.n_classes())
                .with_seed(cli.seed);
            let result = MtrySearch::new()
                .with_step_factor(step_factor)
                .with_improve(improve)
                .with_max_steps(max_steps)
                .search(&base, &matrix, table.labels(), table.feature_names())
                .context("width search failed")?;
            info!(
                best_mtry = result.best_mtry(),
                best_error = result.best_error(),
                "width search complete"
            );

            // 3. Write JSON artifact
            let writer = ResultWriter::new(&data.output_dir, run_name)?;
            let trials: Vec<(usize, f64)> = result
                .trials()
                .iter()
                .map(|t| (t.mtry, t.oob_error))
                .collect();
            writer.write_tuning(
                result.start_mtry(),
                result.best_mtry(),
                result.best_error(),
                &trials,
            )?;

            // 4. Print summary
            let output = TuneOutput {
                run: data.run,
                n_samples: table.n_samples(),
                n_features: table.n_features(),
                start_mtry: result.start_mtry(),
                best_mtry: result.best_mtry(),
                best_error: result.best_error(),
                n_trials: result.trials().len(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Impute { data, impute, mtry } => {
            let run_name = RunName::new(data.run.clone())?;
            let table = load_table(&data)?;

            // 1. Fill missing cells (a complete table passes through)
            let outcome = ImputeConfig::new()
                .with_trees(impute.impute_trees)
                .with_mtry(build_mtry(mtry))
                .with_stop_rule(build_stop_rule(&impute))
                .with_seed(cli.seed)
                .run(table.values(), table.labels(), table.feature_names())
                .context("imputation failed")?;
            info!(
                n_filled = outcome.n_filled(),
                iterations = outcome.iterations().len(),
                "imputation complete"
            );

            // 2. Write artifacts
            let writer = ResultWriter::new(&data.output_dir, run_name)?;
            let stats: Vec<(usize, f64)> = outcome
                .iterations()
                .iter()
                .map(|s| (s.iteration, s.oob_error))
                .collect();
            writer.write_impute_stats(
                table.n_samples(),
                table.n_features(),
                table.n_missing(),
                outcome.n_filled(),
                outcome.stopped_early(),
                &stats,
            )?;
            writer.write_imputed_table(&table, outcome.matrix().rows())?;

            // 3. Print summary
            let output = ImputeOutput {
                run: data.run,
                n_samples: table.n_samples(),
                n_features: table.n_features(),
                n_missing: table.n_missing(),
                n_filled: outcome.n_filled(),
                iterations_run: outcome.iterations().len(),
                stopped_early: outcome.stopped_early(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
