use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use forest::{Algo, ClassificationModel, ForestParams, MaxFeatures, RegressionModel};
use pipeline::{ArtifactStore, BinMode, ModelMetadata, ModelMode, TrainingConfig, TrainingMetrics};
use server::{LoadedModel, PredictRequest, Prediction};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// movie-score - Movie audience score model
#[derive(Parser)]
#[command(name = "movie-score")]
#[command(about = "Train and query the movie audience score model", long_about = None)]
struct Cli {
    /// Directory holding model, metadata and metrics files
    #[arg(short, long, default_value = "artifacts", global = true)]
    artifacts: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model on a movie metadata CSV and save its artifacts
    Train(TrainArgs),

    /// Predict the score of one movie with a saved model
    Predict(PredictArgs),

    /// Show the metadata and metrics of a saved model
    Inspect {
        /// Which saved model to show
        #[arg(long, default_value = "regression")]
        mode: ModelMode,
    },
}

#[derive(Args)]
struct TrainArgs {
    /// Path to the movie metadata CSV
    #[arg(long)]
    data: PathBuf,

    /// regression or multiclass
    #[arg(long, default_value = "regression")]
    mode: ModelMode,

    /// random_forest or decision_tree
    #[arg(long, default_value = "random_forest")]
    algo: Algo,

    /// quantile or fixed (multiclass only)
    #[arg(long, default_value = "quantile")]
    bin_mode: BinMode,

    /// Requested number of classes (multiclass only)
    #[arg(long, default_value = "5")]
    n_classes: usize,

    /// Comma-separated bin edges for fixed mode, e.g. 0,5,6.5,7.5,8.5,10
    #[arg(long, value_delimiter = ',')]
    fixed_edges: Option<Vec<f64>>,

    /// Size cap of the genre vocabulary
    #[arg(long, default_value = "30")]
    top_genres: usize,

    /// Fraction of rows held out for validation
    #[arg(long, default_value = "0.2")]
    test_size: f64,

    #[arg(long, default_value = "42")]
    random_state: u64,

    /// Trees in the forest
    #[arg(long, default_value = "100")]
    n_trees: usize,

    #[arg(long)]
    max_depth: Option<usize>,

    #[arg(long, default_value = "2")]
    min_samples_split: usize,

    #[arg(long, default_value = "1")]
    min_samples_leaf: usize,

    /// all, sqrt or a fraction; defaults to all for regression and sqrt for multiclass
    #[arg(long)]
    max_features: Option<MaxFeatures>,
}

#[derive(Args)]
struct PredictArgs {
    /// Which saved model to use
    #[arg(long, default_value = "regression")]
    mode: ModelMode,

    /// Runtime in minutes
    #[arg(long)]
    duration: i64,

    #[arg(long)]
    budget: i64,

    #[arg(long)]
    title_year: i64,

    #[arg(long)]
    content_rating: String,

    /// Pipe-delimited genres, e.g. "Action|Drama"
    #[arg(long, default_value = "")]
    genres: String,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train(args) => handle_train(&cli.artifacts, args)?,
        Commands::Predict(args) => handle_predict(&cli.artifacts, args)?,
        Commands::Inspect { mode } => handle_inspect(&cli.artifacts, mode)?,
    }

    Ok(())
}

/// Handle the 'train' command
fn handle_train(artifacts: &Path, args: TrainArgs) -> Result<()> {
    println!("Loading movie metadata from {}...", args.data.display());
    let start = Instant::now();
    let dataset = data_loader::load_movies(&args.data)
        .with_context(|| format!("Failed to load {}", args.data.display()))?;
    println!(
        "{} Loaded {} movies in {:?}",
        "✓".green(),
        dataset.len(),
        start.elapsed()
    );

    let params = forest_params(&args);
    params.validate().context("Invalid forest parameters")?;

    let defaults = TrainingConfig::default();
    let config = TrainingConfig {
        mode: args.mode,
        algo: args.algo.to_string(),
        bin_mode: args.bin_mode,
        n_classes: args.n_classes,
        fixed_edges: args.fixed_edges.unwrap_or(defaults.fixed_edges),
        top_genres: args.top_genres,
        test_size: args.test_size,
        random_state: args.random_state,
    };

    let store = ArtifactStore::open(artifacts);
    let start = Instant::now();
    let (metadata, metrics, paths) = match config.mode {
        ModelMode::Regression => {
            let model = RegressionModel::new(args.algo, params);
            let trained = pipeline::train_regression(&dataset, &config, model).context("Training failed")?;
            let paths = store.save(&trained.pipeline, &trained.metadata, &trained.metrics)?;
            (trained.metadata, trained.metrics, paths)
        }
        ModelMode::Multiclass => {
            let model = ClassificationModel::new(args.algo, params);
            let trained =
                pipeline::train_classification(&dataset, &config, model).context("Training failed")?;
            let paths = store.save(&trained.pipeline, &trained.metadata, &trained.metrics)?;
            (trained.metadata, trained.metrics, paths)
        }
    };
    println!(
        "{} Trained {} {} model in {:?}",
        "✓".green(),
        config.mode,
        config.algo,
        start.elapsed()
    );

    print_metadata(&metadata);
    print_metrics(&metrics);

    println!("{}", "Saved:".bold());
    for path in [&paths.model, &paths.metadata, &paths.metrics] {
        println!("  - {}", path.display());
    }
    Ok(())
}

fn forest_params(args: &TrainArgs) -> ForestParams {
    let mut params = match args.mode {
        ModelMode::Regression => ForestParams::default(),
        ModelMode::Multiclass => ForestParams::classification(),
    };
    params.n_trees = args.n_trees;
    params.random_state = args.random_state;
    params.tree.max_depth = args.max_depth;
    params.tree.min_samples_split = args.min_samples_split;
    params.tree.min_samples_leaf = args.min_samples_leaf;
    if let Some(max_features) = args.max_features {
        params.tree.max_features = max_features;
    }
    params
}

/// Handle the 'predict' command
fn handle_predict(artifacts: &Path, args: PredictArgs) -> Result<()> {
    let store = ArtifactStore::open(artifacts);
    let model = LoadedModel::load(&store, args.mode)
        .with_context(|| format!("Failed to load {} artifacts from {}", args.mode, artifacts.display()))?;

    let request = PredictRequest {
        duration: args.duration,
        budget: args.budget,
        title_year: args.title_year,
        genres: args.genres.split('|').map(str::to_string).collect(),
        content_rating: args.content_rating,
    };
    let prediction = model.handle(&request)?;

    match prediction {
        Prediction::Regression(outcome) => {
            println!(
                "{} {:.2} (confidence {:.2})",
                "Predicted score:".bold().blue(),
                outcome.predicted_score,
                outcome.confidence
            );
            println!("  {}", outcome.explanation);
        }
        Prediction::Classification(outcome) => {
            println!("{} {}", "Predicted class:".bold().blue(), outcome.predicted_class.green());
            for (label, p) in &outcome.class_probabilities {
                println!("  {:<14} {:.3}", label, p);
            }
        }
    }
    Ok(())
}

/// Handle the 'inspect' command
fn handle_inspect(artifacts: &Path, mode: ModelMode) -> Result<()> {
    let store = ArtifactStore::open(artifacts);
    let metadata = store
        .load_metadata(mode)
        .with_context(|| format!("Failed to read {} metadata from {}", mode, artifacts.display()))?;
    print_metadata(&metadata);

    match store.load_metrics(mode)? {
        Some(metrics) => {
            print_metrics(&metrics);
            println!("{}", serde_json::to_string_pretty(&metrics)?);
        }
        None => println!("{}", "No metrics recorded".yellow()),
    }
    Ok(())
}

fn print_metadata(metadata: &ModelMetadata) {
    println!("{}", format!("Model: {} ({})", metadata.mode, metadata.algo).bold().blue());
    println!(
        "{}Content ratings: {}",
        "• ".green(),
        metadata.sorted_content_ratings().join(", ")
    );
    println!(
        "{}Genres ({}): {}",
        "• ".green(),
        metadata.genres_vocab.len(),
        metadata.genres_vocab.join(", ")
    );
    for (field, [lo, hi]) in &metadata.numeric_ranges {
        println!("{}{}: {} .. {}", "• ".green(), field, lo, hi);
    }
    if let Some([lo, hi]) = metadata.target_range_observed {
        println!("{}Observed score range: {:.1} .. {:.1}", "• ".green(), lo, hi);
    }
    if let Some(labels) = &metadata.class_labels {
        println!("{}Classes ({}): {}", "• ".green(), labels.len(), labels.join(" "));
    }
}

fn print_metrics(metrics: &TrainingMetrics) {
    println!(
        "{}",
        format!("Metrics ({} train / {} valid):", metrics.n_train, metrics.n_valid).bold()
    );
    if let Some(report) = &metrics.regression {
        println!("{}RMSE  train {:.3} | valid {:.3}", "• ".cyan(), report.train_rmse, report.valid_rmse);
        println!("{}MAE   train {:.3} | valid {:.3}", "• ".cyan(), report.train_mae, report.valid_mae);
        println!("{}R2    train {:.3} | valid {:.3}", "• ".cyan(), report.train_r2, report.valid_r2);
    }
    if let Some(report) = &metrics.classification {
        println!(
            "{}Accuracy  train {:.3} | valid {:.3}",
            "• ".cyan(),
            report.train_accuracy,
            report.valid_accuracy
        );
        println!(
            "{}Macro-F1  train {:.3} | valid {:.3}",
            "• ".cyan(),
            report.train_macro_f1,
            report.valid_macro_f1
        );
        for (label, count) in &report.class_distribution_train {
            println!("  {:<14} {}", label, count);
        }
    }
}
