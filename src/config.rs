//! Configuration of a training run.
//!
//! [TrainConfig] is the command line surface, it is resolved into a
//! [ResolvedConfig] where defaults depending on the environment are filled
//! and values are validated.
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use bigp_gp::{Device, SeedConfig, DEFAULT_EPOCHS, DEFAULT_LR};
use clap::Parser;
use serde::Serialize;

use crate::errors::{Result, RunError};

/// Environment variable giving the root data directory, UCI datasets being
/// looked for in its `uci` sub directory
pub const DATADIR_ENV: &str = "DATADIR";

/// Default number of epochs between two progress log lines
pub const DEFAULT_LOG_INT: usize = 10;

/// Train an exact GP with a bilateral kernel on a UCI regression dataset
#[derive(Parser, Clone, Debug, PartialEq)]
#[command(author, version, about, long_about = None)]
pub struct TrainConfig {
    /// Dataset name, a sub directory of the data directory
    #[arg(long)]
    pub dataset: Option<String>,
    /// Directory of UCI datasets [default: $DATADIR/uci]
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    /// Number of training epochs
    #[arg(long, default_value_t = DEFAULT_EPOCHS)]
    pub epochs: usize,
    /// Adam learning rate
    #[arg(long, default_value_t = DEFAULT_LR)]
    pub lr: f64,
    /// Number of epochs between two progress log lines (metrics are recorded every epoch)
    #[arg(long, default_value_t = DEFAULT_LOG_INT)]
    pub log_int: usize,
    /// Seed of the train/test row permutation of single file datasets (pre-split
    /// datasets are used as is)
    #[arg(long)]
    pub seed: Option<u64>,
    /// Run output directory [default: runs/<dataset>-<unix time>]
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
    /// Compute device (cpu or cuda:<ordinal>)
    #[arg(long, default_value = "cpu")]
    pub device: String,
    /// Use one kernel lengthscale per input dimension
    #[arg(long, default_value_t = false)]
    pub ard: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            dataset: None,
            data_dir: None,
            epochs: DEFAULT_EPOCHS,
            lr: DEFAULT_LR,
            log_int: DEFAULT_LOG_INT,
            seed: None,
            log_dir: None,
            device: Device::Cpu.to_string(),
            ard: false,
        }
    }
}

/// Validated run configuration
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResolvedConfig {
    /// Dataset name
    pub dataset: String,
    /// Directory holding the dataset sub directory
    pub data_dir: PathBuf,
    /// Number of training epochs
    pub epochs: usize,
    /// Adam learning rate
    pub lr: f64,
    /// Number of epochs between two progress log lines
    pub log_int: usize,
    /// Seeding policy
    pub seeds: SeedConfig,
    /// Run output directory
    pub log_dir: PathBuf,
    /// Compute device
    pub device: Device,
    /// Per dimension lengthscales
    pub ard: bool,
}

impl TrainConfig {
    /// Resolve configuration using the process environment
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.resolve_with(std::env::var(DATADIR_ENV).ok())
    }

    /// Resolve configuration given the `DATADIR` environment value
    pub fn resolve_with(&self, datadir: Option<String>) -> Result<ResolvedConfig> {
        let data_dir = self
            .data_dir
            .clone()
            .or_else(|| datadir.map(|dir| PathBuf::from(dir).join("uci")));
        let dataset = self.dataset.clone().ok_or_else(|| {
            RunError::ConfigurationError(match &data_dir {
                Some(dir) => format!("Select a dataset from \"{}\"", dir.display()),
                None => "Select a dataset with --dataset".to_string(),
            })
        })?;
        let data_dir = data_dir.ok_or_else(|| {
            RunError::ConfigurationError(format!(
                "No data directory: use --data-dir or set {DATADIR_ENV}"
            ))
        })?;

        if !self.lr.is_finite() || self.lr < 0. {
            return Err(RunError::ConfigurationError(format!(
                "Learning rate should be a non negative number, got {}",
                self.lr
            )));
        }
        let device: Device = self
            .device
            .parse()
            .map_err(|err| RunError::ConfigurationError(format!("{err}")))?;
        if !device.is_available() {
            return Err(RunError::ConfigurationError(format!(
                "Device {device} is not available, use {}",
                Device::select()
            )));
        }

        let log_dir = self.log_dir.clone().unwrap_or_else(|| {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default();
            PathBuf::from("runs").join(format!("{dataset}-{now}"))
        });

        Ok(ResolvedConfig {
            dataset,
            data_dir,
            epochs: self.epochs,
            lr: self.lr,
            log_int: self.log_int,
            seeds: SeedConfig::new(self.seed),
            log_dir,
            device,
            ard: self.ard,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let config = TrainConfig::parse_from(["bigp-train", "--dataset", "pol"]);
        assert_eq!(
            config,
            TrainConfig {
                dataset: Some("pol".to_string()),
                ..TrainConfig::default()
            }
        );
    }

    #[test]
    fn test_cli_options() {
        let config = TrainConfig::parse_from([
            "bigp-train",
            "--dataset",
            "elevators",
            "--data-dir",
            "/data/uci",
            "--epochs",
            "5",
            "--lr",
            "0.01",
            "--seed",
            "42",
            "--ard",
        ]);
        assert_eq!(config.epochs, 5);
        assert_eq!(config.lr, 0.01);
        assert_eq!(config.seed, Some(42));
        assert!(config.ard);
        let resolved = config.resolve_with(None).unwrap();
        assert_eq!(resolved.data_dir, PathBuf::from("/data/uci"));
        assert_eq!(resolved.seeds.seed(), Some(42));
        assert!(resolved.log_dir.starts_with("runs"));
    }

    #[test]
    fn test_data_dir_from_environment() {
        let config = TrainConfig {
            dataset: Some("pol".to_string()),
            ..TrainConfig::default()
        };
        let resolved = config.resolve_with(Some("/datasets".to_string())).unwrap();
        assert_eq!(resolved.data_dir, PathBuf::from("/datasets/uci"));
        assert!(matches!(
            config.resolve_with(None),
            Err(RunError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_missing_dataset() {
        let err = TrainConfig::default()
            .resolve_with(Some("/datasets".to_string()))
            .unwrap_err();
        assert_eq!(err.kind(), "ConfigurationError");
        assert!(err.to_string().contains("/datasets/uci"));
    }

    #[test]
    fn test_invalid_values() {
        let base = TrainConfig {
            dataset: Some("pol".to_string()),
            data_dir: Some(PathBuf::from("/data")),
            ..TrainConfig::default()
        };
        let cuda = TrainConfig {
            device: "cuda:0".to_string(),
            ..base.clone()
        };
        assert!(matches!(
            cuda.resolve_with(None),
            Err(RunError::ConfigurationError(_))
        ));
        let unknown = TrainConfig {
            device: "tpu".to_string(),
            ..base.clone()
        };
        assert!(unknown.resolve_with(None).is_err());
        let negative_lr = TrainConfig { lr: -0.1, ..base };
        assert!(negative_lr.resolve_with(None).is_err());
    }
}
