//! Command-line front-end: `train`, `predict`, and `cv` subcommands.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::process;

use clap::{Args, Parser, Subcommand};

use histboost::{BoostError, DataMatrix, GBDTConfig, Metric, Result, Task, GBDT};

#[derive(Parser)]
#[command(
    name = "histboost",
    version,
    about = "Histogram-based gradient boosted decision trees"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train a model on a CSV dataset
    Train(TrainArgs),
    /// Predict with a saved model
    Predict(PredictArgs),
    /// Run k-fold cross-validation
    Cv(CvArgs),
}

/// Configuration options shared by `train` and `cv`.
#[derive(Args)]
struct ConfigArgs {
    /// Task type (reg = regression, binary = binary classification)
    #[arg(long = "task", default_value = "reg")]
    task: String,

    /// Number of boosting rounds
    #[arg(long = "nrounds", default_value_t = 100)]
    nrounds: u32,

    /// Learning rate
    #[arg(long = "lr", default_value_t = 0.1)]
    lr: f32,

    /// Maximum depth of trees
    #[arg(long = "max_depth", default_value_t = 6)]
    max_depth: u32,

    /// Minimum sum of instance weight in a child
    #[arg(long = "min_child_weight", default_value_t = 1.0)]
    min_child_weight: f32,

    /// Minimum number of instances in a leaf
    #[arg(long = "min_data_in_leaf", default_value_t = 20)]
    min_data_in_leaf: u32,

    /// L2 regularization
    #[arg(long = "reg_lambda", default_value_t = 1.0)]
    reg_lambda: f32,

    /// Row subsample ratio
    #[arg(long = "subsample", default_value_t = 1.0)]
    subsample: f32,

    /// Column sample ratio per tree
    #[arg(long = "colsample", default_value_t = 1.0)]
    colsample: f32,

    /// Number of histogram bins
    #[arg(long = "nbins", default_value_t = 256)]
    nbins: u32,

    /// Evaluation metric (rmse, mae, logloss, auc); defaults per task
    #[arg(long = "metric")]
    metric: Option<String>,

    /// Random seed
    #[arg(long = "seed", default_value_t = 0)]
    seed: u64,

    /// Number of threads (-1 = all)
    #[arg(long = "nthreads", default_value_t = -1, allow_hyphen_values = true)]
    nthreads: i32,
}

impl ConfigArgs {
    fn to_config(&self) -> Result<GBDTConfig> {
        let task = match self.task.as_str() {
            "reg" => Task::Regression,
            "binary" => Task::Binary,
            other => {
                return Err(BoostError::InvalidConfig(format!(
                    "invalid task {other:?}, expected 'reg' or 'binary'"
                )))
            }
        };

        let metric = match &self.metric {
            Some(name) => {
                Metric::from_name(name).ok_or_else(|| {
                    BoostError::InvalidConfig(format!(
                        "unknown metric {name:?}, expected one of {}",
                        Metric::available().join(", ")
                    ))
                })?;
                name.clone()
            }
            None => task.default_metric().to_string(),
        };

        Ok(GBDTConfig {
            task,
            n_rounds: self.nrounds,
            learning_rate: self.lr,
            max_depth: self.max_depth,
            min_data_in_leaf: self.min_data_in_leaf,
            min_child_weight: self.min_child_weight,
            reg_lambda: self.reg_lambda,
            n_bins: self.nbins,
            subsample: self.subsample,
            colsample: self.colsample,
            seed: self.seed,
            n_threads: self.nthreads,
            metric,
        })
    }
}

#[derive(Args)]
struct TrainArgs {
    /// Input data file (CSV format)
    #[arg(long = "data")]
    data: String,

    /// Column index of the label (0-based)
    #[arg(long = "label", default_value_t = -1, allow_hyphen_values = true)]
    label: i32,

    /// Output model file path
    #[arg(long = "out")]
    out: String,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Args)]
struct PredictArgs {
    /// Input data file (CSV format, no label column)
    #[arg(long = "data")]
    data: String,

    /// Trained model file path
    #[arg(long = "model")]
    model: String,

    /// Output predictions file path (one value per line)
    #[arg(long = "out")]
    out: String,

    /// Number of threads (-1 = all)
    #[arg(long = "nthreads", default_value_t = -1, allow_hyphen_values = true)]
    nthreads: i32,
}

#[derive(Args)]
struct CvArgs {
    /// Input data file (CSV format)
    #[arg(long = "data")]
    data: String,

    /// Column index of the label (0-based)
    #[arg(long = "label", default_value_t = -1, allow_hyphen_values = true)]
    label: i32,

    /// Number of folds
    #[arg(long = "folds", default_value_t = 5)]
    folds: u32,

    #[command(flatten)]
    config: ConfigArgs,
}

fn train_main(args: &TrainArgs) -> Result<()> {
    let config = args.config.to_config()?;
    let data = DataMatrix::from_csv(&args.data, args.label)?;
    println!(
        "Loaded {} rows and {} columns from {}",
        data.n_rows(),
        data.n_cols(),
        args.data
    );

    let mut model = GBDT::new(config)?;
    model.train(&data)?;
    model.save_model(&args.out)?;
    println!("Model saved to {}", args.out);
    Ok(())
}

fn predict_main(args: &PredictArgs) -> Result<()> {
    let model = GBDT::load_model(&args.model)?;
    println!("Model loaded from {}", args.model);

    let data = DataMatrix::from_csv(&args.data, -1)?;
    let predictions = histboost::run_with_threads(args.nthreads, || model.predict(&data))?;

    let mut out = BufWriter::new(File::create(&args.out)?);
    for pred in &predictions {
        writeln!(out, "{pred}")?;
    }
    out.flush()?;
    println!("Saved {} predictions to {}", predictions.len(), args.out);
    Ok(())
}

fn cv_main(args: &CvArgs) -> Result<()> {
    if args.folds < 2 {
        return Err(BoostError::InvalidConfig(
            "--folds must be at least 2".to_string(),
        ));
    }
    let config = args.config.to_config()?;
    let metric_name = config.metric.clone();
    let data = DataMatrix::from_csv(&args.data, args.label)?;
    println!(
        "Running {}-fold cross-validation with {} rounds",
        args.folds, config.n_rounds
    );

    let model = GBDT::new(config)?;
    let results = model.cv(&data, args.folds)?;

    println!("Rounds\t{metric_name}");
    for (round, value) in results.iter().enumerate() {
        println!("{round}\t{value}");
    }
    Ok(())
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match &cli.command {
        Command::Train(args) => train_main(args),
        Command::Predict(args) => predict_main(args),
        Command::Cv(args) => cv_main(args),
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}
