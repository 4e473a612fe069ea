use std::fmt;
use std::str::FromStr;

use linfa::Float;
use ndarray::{Array1, Array2};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

use crate::errors::{GpError, Result};

/// Compute device on which data and model parameters are placed.
///
/// Dense linear algebra is implemented for the CPU only, accelerator devices
/// are kept as tags so that placement mismatches are detected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum Device {
    /// Main processor
    #[default]
    Cpu,
    /// Accelerator identified by its ordinal
    Cuda(usize),
}

impl Device {
    /// Device used for a run: the first accelerator when available, the CPU otherwise
    pub fn select() -> Device {
        let accelerator = Device::Cuda(0);
        if accelerator.is_available() {
            accelerator
        } else {
            Device::Cpu
        }
    }

    /// Whether computations can be run on this device
    pub fn is_available(&self) -> bool {
        matches!(self, Device::Cpu)
    }

    /// Check that `other` is the same device as `self`
    pub fn check_same(&self, other: Device, what: &str) -> Result<()> {
        if *self != other {
            return Err(GpError::DeviceMismatchError(format!(
                "{what} placed on {other} while model is on {self}"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(ordinal) => write!(f, "cuda:{ordinal}"),
        }
    }
}

impl FromStr for Device {
    type Err = GpError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "cpu" => Ok(Device::Cpu),
            "cuda" => Ok(Device::Cuda(0)),
            other => other
                .strip_prefix("cuda:")
                .and_then(|ordinal| ordinal.parse::<usize>().ok())
                .map(Device::Cuda)
                .ok_or_else(|| {
                    GpError::InvalidValueError(format!(
                        "Unknown device '{s}', expected 'cpu' or 'cuda:<ordinal>'"
                    ))
                }),
        }
    }
}

/// A set of (x, y) samples placed on a [Device].
///
/// `x` is a (nsamples, ndims) matrix, `y` the corresponding targets.
#[derive(Clone, Debug, PartialEq)]
pub struct DataSplit<F: Float> {
    x: Array2<F>,
    y: Array1<F>,
    device: Device,
}

impl<F: Float> DataSplit<F> {
    /// Constructor checking that `x` and `y` describe the same non empty set of samples
    pub fn new(x: Array2<F>, y: Array1<F>, device: Device) -> Result<Self> {
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(GpError::InvalidInputError(format!(
                "Empty data: x has shape ({}, {})",
                x.nrows(),
                x.ncols()
            )));
        }
        if x.nrows() != y.len() {
            return Err(GpError::InvalidInputError(format!(
                "x has {} rows while y has {} values",
                x.nrows(),
                y.len()
            )));
        }
        Ok(DataSplit { x, y, device })
    }

    /// Inputs
    pub fn x(&self) -> &Array2<F> {
        &self.x
    }

    /// Targets
    pub fn y(&self) -> &Array1<F> {
        &self.y
    }

    /// Device on which samples are placed
    pub fn device(&self) -> Device {
        self.device
    }

    /// Number of samples
    pub fn nsamples(&self) -> usize {
        self.x.nrows()
    }

    /// Input dimension
    pub fn ndims(&self) -> usize {
        self.x.ncols()
    }

    /// Consume the split returning inputs and targets
    pub fn into_parts(self) -> (Array2<F>, Array1<F>) {
        (self.x, self.y)
    }
}
