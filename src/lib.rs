//! Training runs of exact GP regression models with a bilateral kernel on UCI datasets.
//!
//! A run loads the train and test partitions of a dataset, standardizes them using
//! training statistics, builds an [ExactGp](bigp_gp::ExactGp) and trains its hyperparameters
//! with Adam for a fixed number of epochs, recording the training loss and the test RMSE
//! of every epoch.
//!
//! Run outputs are written in the run directory:
//! * `config.json`: the resolved configuration,
//! * `metrics.jsonl`: one JSON object per recorded scalar,
//! * `summary.json`: final hyperparameters and losses, see [RunSummary].
//!
//! ```no_run
//! use bigp::config::TrainConfig;
//!
//! let config = TrainConfig {
//!     dataset: Some("pol".to_string()),
//!     epochs: 50,
//!     ..TrainConfig::default()
//! };
//! let summary = bigp::run(&config.resolve()?)?;
//! println!("final test rmse = {:?}", summary.history.final_rmse());
//! # Ok::<(), bigp::RunError>(())
//! ```
#![warn(missing_docs)]
pub mod config;
pub mod dataset;
mod errors;
pub mod sink;

pub use errors::*;

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use bigp_gp::kernels::BilateralKernel;
use bigp_gp::{ExactGp, Standardizer, Trainer, TrainingHistory};
use log::info;
use serde::Serialize;

use crate::config::ResolvedConfig;
use crate::dataset::{Mode, UciDataset};
use crate::sink::{RunRecorder, METRICS_FILE};

/// Environment variable used to set the log level
pub const BIGP_LOG: &str = "BIGP_LOG";
/// Name of the configuration file within a run directory
pub const CONFIG_FILE: &str = "config.json";
/// Name of the summary file within a run directory
pub const SUMMARY_FILE: &str = "summary.json";

/// Outcome of a training run
#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    /// Dataset name
    pub dataset: String,
    /// Input dimension
    pub ndims: usize,
    /// Number of training samples
    pub train_size: usize,
    /// Number of test samples
    pub test_size: usize,
    /// Hyperparameter values (constrained) at the end of training
    pub hyperparameters: Vec<(String, f64)>,
    /// Per epoch losses and RMSEs with final raw parameters
    pub history: TrainingHistory<f64>,
    /// Run output directory
    pub log_dir: PathBuf,
}

/// Train a GP as configured and write run outputs in `config.log_dir`
pub fn run(config: &ResolvedConfig) -> Result<RunSummary> {
    let train = UciDataset::create(
        &config.dataset,
        &config.data_dir,
        Mode::Train,
        config.device,
        &config.seeds,
    )?;
    let test = UciDataset::create(
        &config.dataset,
        &config.data_dir,
        Mode::Test,
        config.device,
        &config.seeds,
    )?;
    println!(
        "\"{}\": D = {}, Train N = {}, Test N = {}",
        config.dataset,
        train.ndims(),
        train.nsamples(),
        test.nsamples()
    );

    let standardizer = Standardizer::fit_split(&train)?;
    let train = standardizer.transform(&train)?;
    let test = standardizer.transform(&test)?;
    let (ndims, train_size, test_size) = (train.ndims(), train.nsamples(), test.nsamples());

    let kernel = if config.ard {
        BilateralKernel::ard(ndims)
    } else {
        BilateralKernel::new()
    };
    let mut gp = ExactGp::params(kernel)
        .device(config.device)
        .build(train)?;
    info!("{gp}");

    std::fs::create_dir_all(&config.log_dir)?;
    serde_json::to_writer_pretty(
        BufWriter::new(File::create(config.log_dir.join(CONFIG_FILE))?),
        config,
    )?;
    let mut recorder = RunRecorder::create(config.log_dir.join(METRICS_FILE))?;
    info!("Recording metrics in {}", recorder.path().display());

    let history = Trainer::new(config.epochs, config.lr)
        .log_every(config.log_int)
        .fit(&mut gp, &test, &mut recorder)?;

    let summary = RunSummary {
        dataset: config.dataset.clone(),
        ndims,
        train_size,
        test_size,
        hyperparameters: gp.hyperparameters(),
        history,
        log_dir: config.log_dir.clone(),
    };
    serde_json::to_writer_pretty(
        BufWriter::new(File::create(config.log_dir.join(SUMMARY_FILE))?),
        &summary,
    )?;
    info!(
        "{} epochs done, loss = {:?}, test rmse = {:?}",
        summary.history.epochs(),
        summary.history.final_loss(),
        summary.history.final_rmse()
    );
    Ok(summary)
}
