use std::path::PathBuf;

use bigp::config::{ResolvedConfig, TrainConfig};
use bigp::sink::METRICS_FILE;
use bigp::{run, RunError, CONFIG_FILE, SUMMARY_FILE};
use ndarray::{Array1, Array2, Axis};
use ndarray_npy::write_npy;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::{rand_distr::Uniform, RandomExt};
use rand_xoshiro::Xoshiro256Plus;

const DATA_DIR: &str = "target/tests/uci";

fn target(x: &Array2<f64>) -> Array1<f64> {
    x.map_axis(Axis(1), |row| (3. * row[0]).sin() + 0.5 * row[1] * row[1])
}

/// Write a single file dataset: inputs in the first columns, target in the last one
fn write_dataset(name: &str, nrows: usize) -> PathBuf {
    let dir = PathBuf::from(DATA_DIR).join(name);
    std::fs::create_dir_all(&dir).unwrap();
    let mut rng = Xoshiro256Plus::seed_from_u64(42);
    let x = Array2::random_using((nrows, 2), Uniform::new(-1., 1.), &mut rng);
    let y = target(&x);
    let data = ndarray::concatenate(Axis(1), &[x.view(), y.insert_axis(Axis(1)).view()]).unwrap();
    write_npy(dir.join(format!("{name}.npy")), &data).unwrap();
    PathBuf::from(DATA_DIR)
}

fn config(name: &str, epochs: usize, lr: f64, seed: Option<u64>) -> ResolvedConfig {
    TrainConfig {
        dataset: Some(name.to_string()),
        data_dir: Some(write_dataset(name, 60)),
        epochs,
        lr,
        seed,
        log_dir: Some(PathBuf::from("target/tests/runs").join(name)),
        ..TrainConfig::default()
    }
    .resolve_with(None)
    .unwrap()
}

#[test]
fn test_run_writes_outputs() {
    let config = config("toy", 10, 0.1, Some(0));
    let summary = run(&config).unwrap();

    assert_eq!(summary.ndims, 2);
    assert_eq!(summary.train_size, 54);
    assert_eq!(summary.test_size, 6);
    assert_eq!(summary.history.epochs(), 10);
    assert_eq!(summary.history.rmses.len(), 10);
    assert!(summary.history.losses.iter().all(|l| l.is_finite()));
    assert!(summary.history.final_loss().unwrap() < summary.history.losses[0]);
    assert_eq!(summary.hyperparameters.len(), 4);

    let metrics = std::fs::read_to_string(config.log_dir.join(METRICS_FILE)).unwrap();
    assert_eq!(metrics.lines().count(), 20);
    let first: serde_json::Value = serde_json::from_str(metrics.lines().next().unwrap()).unwrap();
    assert_eq!(first["name"], "train/loss");
    assert_eq!(first["step"], 1);

    let saved: serde_json::Value =
        serde_json::from_reader(std::fs::File::open(config.log_dir.join(CONFIG_FILE)).unwrap())
            .unwrap();
    assert_eq!(saved["dataset"], "toy");
    assert_eq!(saved["epochs"], 10);
    assert!(config.log_dir.join(SUMMARY_FILE).is_file());
}

#[test]
fn test_run_is_deterministic() {
    let first = run(&config("toy_det_a", 5, 0.1, Some(7))).unwrap();
    let second = run(&config("toy_det_b", 5, 0.1, Some(7))).unwrap();
    assert_eq!(first.history.losses, second.history.losses);
    assert_eq!(first.history.rmses, second.history.rmses);
    assert_eq!(first.history.raw_parameters, second.history.raw_parameters);
}

#[test]
fn test_run_with_zero_learning_rate() {
    let summary = run(&config("toy_frozen", 3, 0., None)).unwrap();
    assert!(summary.history.raw_parameters.iter().all(|&p| p == 0.));
    let losses = &summary.history.losses;
    assert!(losses.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn test_run_with_ard_kernel() {
    let mut config = config("toy_ard", 2, 0.1, Some(1));
    config.ard = true;
    let summary = run(&config).unwrap();
    // noise, constant, outputscale and one lengthscale per dimension
    assert_eq!(summary.history.raw_parameters.len(), 5);
    assert_eq!(summary.hyperparameters.len(), 5);
}

#[test]
fn test_missing_dataset() {
    let err = TrainConfig {
        data_dir: Some(PathBuf::from(DATA_DIR)),
        ..TrainConfig::default()
    }
    .resolve_with(None)
    .unwrap_err();
    assert!(matches!(err, RunError::ConfigurationError(_)));

    let unknown = TrainConfig {
        dataset: Some("unknown".to_string()),
        data_dir: Some(PathBuf::from(DATA_DIR)),
        log_dir: Some(PathBuf::from("target/tests/runs/unknown")),
        ..TrainConfig::default()
    }
    .resolve_with(None)
    .unwrap();
    assert!(matches!(run(&unknown), Err(RunError::ConfigurationError(_))));
}
