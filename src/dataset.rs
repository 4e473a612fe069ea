//! UCI regression datasets stored as npy files.
//!
//! A dataset named `name` lives in `<data_dir>/<name>/` either as four pre-split
//! files `train_x.npy`, `train_y.npy`, `test_x.npy`, `test_y.npy` or as a single
//! `<name>.npy` matrix whose last column is the target. In the latter case rows
//! are split between train and test with a seeded permutation.
use std::fmt;
use std::path::{Path, PathBuf};

use bigp_gp::{DataSplit, Device, GpError, SeedConfig};
use log::debug;
use ndarray::{s, Array1, Array2, ArrayD, Axis, Ix1, Ix2};
use ndarray_npy::read_npy;
use ndarray_rand::rand::seq::SliceRandom;

use crate::errors::{Result, RunError};

/// Fraction of rows used for training when a dataset is not pre-split
pub const TRAIN_FRACTION: f64 = 0.9;

/// Dataset partition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Training rows
    Train,
    /// Test rows
    Test,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Mode::Train => write!(f, "train"),
            Mode::Test => write!(f, "test"),
        }
    }
}

/// Loader of UCI regression datasets
pub struct UciDataset;

impl UciDataset {
    /// Load the `mode` partition of dataset `name` from `data_dir`, placed on `device`.
    ///
    /// Both partitions loaded with the same `seeds` are disjoint.
    pub fn create(
        name: &str,
        data_dir: &Path,
        mode: Mode,
        device: Device,
        seeds: &SeedConfig,
    ) -> Result<DataSplit<f64>> {
        let dir = data_dir.join(name);
        if !dir.is_dir() {
            return Err(RunError::ConfigurationError(format!(
                "Dataset \"{name}\" not found in \"{}\"",
                data_dir.display()
            )));
        }

        let (x, y) = if dir.join(Self::file_name(mode, "x")).is_file() {
            debug!("Read pre-split {mode} data of {name}");
            let x: Array2<f64> = read_npy(dir.join(Self::file_name(mode, "x")))?;
            let y = read_target(dir.join(Self::file_name(mode, "y")))?;
            (x, y)
        } else {
            let path = dir.join(format!("{name}.npy"));
            if !path.is_file() {
                return Err(RunError::ConfigurationError(format!(
                    "No data file for dataset \"{name}\" in \"{}\"",
                    dir.display()
                )));
            }
            debug!("Split {mode} data from {}", path.display());
            let data: Array2<f64> = read_npy(path)?;
            split_rows(&data, mode, seeds)?
        };
        Ok(DataSplit::new(x, y, device)?)
    }

    fn file_name(mode: Mode, var: &str) -> String {
        format!("{mode}_{var}.npy")
    }
}

/// Read a target stored either as a vector or as a one-column matrix
fn read_target(path: PathBuf) -> Result<Array1<f64>> {
    let y: ArrayD<f64> = read_npy(&path)?;
    let shape = y.shape().to_vec();
    match shape.as_slice() {
        [_] => Ok(y.into_dimensionality::<Ix1>().map_err(shape_error)?),
        [_, 1] => Ok(y
            .into_dimensionality::<Ix2>()
            .map_err(shape_error)?
            .column(0)
            .to_owned()),
        _ => Err(GpError::InvalidInputError(format!(
            "Target in \"{}\" should be a vector, got shape {shape:?}",
            path.display()
        ))
        .into()),
    }
}

fn shape_error(err: ndarray::ShapeError) -> RunError {
    GpError::InvalidInputError(err.to_string()).into()
}

/// Select the `mode` rows of a seeded permutation of `data` rows and split
/// them into inputs and target (last column)
fn split_rows(
    data: &Array2<f64>,
    mode: Mode,
    seeds: &SeedConfig,
) -> Result<(Array2<f64>, Array1<f64>)> {
    let (nrows, ncols) = data.dim();
    if nrows < 2 || ncols < 2 {
        return Err(GpError::InvalidInputError(format!(
            "Dataset should have at least 2 rows and 2 columns, got {nrows}x{ncols}"
        ))
        .into());
    }
    let mut indices: Vec<usize> = (0..nrows).collect();
    indices.shuffle(&mut seeds.split_rng());
    let ntrain = ((TRAIN_FRACTION * nrows as f64).round() as usize).clamp(1, nrows - 1);
    let selected = match mode {
        Mode::Train => &indices[..ntrain],
        Mode::Test => &indices[ntrain..],
    };
    let rows = data.select(Axis(0), selected);
    let x = rows.slice(s![.., ..ncols - 1]).to_owned();
    let y = rows.column(ncols - 1).to_owned();
    Ok((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use bigp_gp::DEFAULT_SPLIT_SEED;
    use ndarray::{array, Array};
    use ndarray_npy::write_npy;

    fn dataset_dir(name: &str) -> PathBuf {
        let root = PathBuf::from("target/tests/dataset");
        std::fs::create_dir_all(root.join(name)).unwrap();
        root
    }

    #[test]
    fn test_mode() {
        assert_eq!(Mode::Train.to_string(), "train");
        assert_eq!(UciDataset::file_name(Mode::Test, "y"), "test_y.npy");
    }

    #[test]
    fn test_split_single_file() {
        let root = dataset_dir("single");
        let data = Array::range(0., 60., 1.).into_shape((20, 3)).unwrap();
        write_npy(root.join("single/single.npy"), &data).unwrap();

        let seeds = SeedConfig::default();
        let train = UciDataset::create("single", &root, Mode::Train, Device::Cpu, &seeds).unwrap();
        let test = UciDataset::create("single", &root, Mode::Test, Device::Cpu, &seeds).unwrap();
        assert_eq!(train.nsamples(), 18);
        assert_eq!(test.nsamples(), 2);
        assert_eq!(train.ndims(), 2);

        // each row is [3i, 3i+1, 3i+2], target is the last column
        for split in [&train, &test] {
            assert_abs_diff_eq!(split.y(), &(split.x().column(0).to_owned() + 2.));
        }
        let mut targets: Vec<f64> = train.y().iter().chain(test.y().iter()).copied().collect();
        targets.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(targets, data.column(2).to_vec());

        let again = UciDataset::create("single", &root, Mode::Train, Device::Cpu, &seeds).unwrap();
        assert_eq!(train, again);
    }

    #[test]
    fn test_seed_changes_single_file_split() {
        let root = dataset_dir("reseeded");
        let data = Array::range(0., 300., 1.).into_shape((100, 3)).unwrap();
        write_npy(root.join("reseeded/reseeded.npy"), &data).unwrap();

        let test_rows = |seed| {
            UciDataset::create("reseeded", &root, Mode::Test, Device::Cpu, &SeedConfig::new(seed))
                .unwrap()
                .y()
                .to_vec()
        };
        assert_eq!(test_rows(None), test_rows(Some(DEFAULT_SPLIT_SEED)));
        assert_eq!(test_rows(Some(5)), test_rows(Some(5)));
        assert_ne!(test_rows(Some(5)), test_rows(Some(6)));
    }

    #[test]
    fn test_pre_split_files() {
        let root = dataset_dir("presplit");
        let dir = root.join("presplit");
        write_npy(dir.join("train_x.npy"), &array![[0., 1.], [1., 0.], [2., 2.]]).unwrap();
        write_npy(dir.join("train_y.npy"), &array![[1.], [2.], [3.]]).unwrap();
        write_npy(dir.join("test_x.npy"), &array![[0.5, 0.5]]).unwrap();
        write_npy(dir.join("test_y.npy"), &array![1.5]).unwrap();

        let seeds = SeedConfig::new(Some(3));
        let train = UciDataset::create("presplit", &root, Mode::Train, Device::Cpu, &seeds).unwrap();
        let test = UciDataset::create("presplit", &root, Mode::Test, Device::Cpu, &seeds).unwrap();
        assert_eq!(train.y(), &array![1., 2., 3.]);
        assert_eq!(test.x(), &array![[0.5, 0.5]]);
        assert_eq!(test.y(), &array![1.5]);
    }

    #[test]
    fn test_invalid_target() {
        let root = dataset_dir("badtarget");
        let dir = root.join("badtarget");
        write_npy(dir.join("train_x.npy"), &array![[0.], [1.]]).unwrap();
        write_npy(dir.join("train_y.npy"), &array![[1., 2.], [3., 4.]]).unwrap();
        let err = UciDataset::create("badtarget", &root, Mode::Train, Device::Cpu, &SeedConfig::default())
            .unwrap_err();
        assert_eq!(err.kind(), "InvalidInputError");
    }

    #[test]
    fn test_unknown_dataset() {
        let err = UciDataset::create(
            "missing",
            Path::new("target/tests/dataset"),
            Mode::Train,
            Device::Cpu,
            &SeedConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RunError::ConfigurationError(_)));
    }
}
