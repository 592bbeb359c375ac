mod dataset;
mod metrics;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use clap::Parser;
use log::info;
use taxi_demand::features::N_FEATURES;
use taxi_demand::model::{DemandModel, TrainOptions};

use crate::metrics::{regression_metrics, RegressionMetrics};

/// Train the taxi demand model from daily demand and daily weather tables.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// CSV with `date,demand`
    #[arg(long, default_value = "data/taxis_dailydemand.csv")]
    demand: PathBuf,
    /// CSV with `date` and the daily forecast columns
    #[arg(long, default_value = "data/weather_daily.csv")]
    weather: PathBuf,
    #[arg(short, long, default_value = "taxi_demand_model.bin")]
    output: PathBuf,
    /// Fraction of rows held out for evaluation
    #[arg(long, default_value_t = 0.2)]
    test_size: f64,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    #[arg(long, default_value_t = 100)]
    n_estimators: usize,
    #[arg(long, default_value_t = 0.1)]
    learning_rate: f64,
    #[arg(long, default_value_t = 6)]
    max_depth: usize,
    #[arg(long, default_value_t = 20)]
    min_examples_leaf: usize,
}

impl Args {
    fn train_options(&self) -> TrainOptions {
        TrainOptions {
            n_estimators: self.n_estimators,
            learning_rate: self.learning_rate,
            max_depth: self.max_depth,
            min_examples_leaf: self.min_examples_leaf,
        }
    }
}

fn open(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("cannot open {}", path.display()))
}

fn evaluate(model: &DemandModel, x_test: &[[f64; N_FEATURES]], y_test: &[f64]) -> RegressionMetrics {
    regression_metrics(&model.predict_rows(x_test), y_test)
}

fn save_model(model: &DemandModel, path: &Path) -> Result<()> {
    let out_file =
        File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    let mut writer = BufWriter::new(out_file);
    bincode::serialize_into(&mut writer, model)?;
    writer.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    ensure!(
        args.test_size > 0.0 && args.test_size < 1.0,
        "--test-size must be between 0 and 1, got {}",
        args.test_size
    );

    let demand = dataset::read_demand(open(&args.demand)?)?;
    let weather = dataset::read_weather(open(&args.weather)?)?;
    let examples = dataset::merge(&demand, &weather)?;
    info!(
        "{} demand rows, {} weather rows, {} merged examples",
        demand.len(),
        weather.len(),
        examples.len()
    );
    for example in examples.iter().take(5) {
        println!("{} {:?} demand={}", example.date, example.features, example.demand);
    }

    let (train, test) = dataset::train_test_split(examples, args.test_size, args.seed);
    ensure!(
        !train.is_empty() && !test.is_empty(),
        "need at least two merged rows to split into train and test sets"
    );
    let (x_train, y_train) = dataset::to_arrays(&train);
    let (x_test, y_test) = dataset::to_arrays(&test);

    let model = DemandModel::fit(&x_train, &y_train, &args.train_options());
    let metrics = evaluate(&model, &x_test, &y_test);

    println!("Mean Squared Error: {}", metrics.mse);
    println!("R^2 Score: {}", metrics.r2);
    info!("test rmse {:.1}, mae {:.1}", metrics.rmse, metrics.mae);

    save_model(&model, &args.output)?;
    println!("Model saved to {}", args.output.display());

    Ok(())
}
