use crate::device::{DataSplit, Device};
use crate::errors::{GpError, Result};
use crate::kernels::{BilateralKernel, Kernel};
use crate::likelihood::NOISE_LOWER_BOUND;
use crate::ExactGp;
use linfa::{Float, ParamGuard};

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// A set of validated exact GP parameters.
///
/// Initial hyperparameters are given as constrained values, `None` means the
/// value obtained from a zero raw parameter.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(
        serialize = "F: Serialize, K: Serialize",
        deserialize = "F: Deserialize<'de>, K: Deserialize<'de>"
    ))
)]
pub struct ExactGpValidParams<F: Float, K: Kernel<F>> {
    /// Base kernel, scaled by a trainable outputscale in the model
    pub(crate) kernel: K,
    /// Initial value of the constant mean
    pub(crate) mean_init: F,
    /// Initial outputscale
    pub(crate) outputscale_init: Option<F>,
    /// Initial noise variance
    pub(crate) noise_init: Option<F>,
    /// Device on which the model is placed
    pub(crate) device: Device,
}

impl<F: Float, K: Kernel<F>> ExactGpValidParams<F, K> {
    /// Get base kernel
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Get initial constant mean
    pub fn mean_init(&self) -> F {
        self.mean_init
    }

    /// Get initial outputscale if specified
    pub fn outputscale_init(&self) -> Option<F> {
        self.outputscale_init
    }

    /// Get initial noise variance if specified
    pub fn noise_init(&self) -> Option<F> {
        self.noise_init
    }

    /// Get model device
    pub fn device(&self) -> Device {
        self.device
    }

    /// Build the GP model conditioned on `train` data
    pub fn build(&self, train: DataSplit<F>) -> Result<ExactGp<F, K>> {
        ExactGp::new(self, train)
    }
}

#[derive(Clone, Debug)]
/// The set of hyperparameters that can be specified for the execution of
/// the [exact GP algorithm](struct.ExactGp.html).
pub struct ExactGpParams<F: Float, K: Kernel<F>>(ExactGpValidParams<F, K>);

impl<F: Float> Default for ExactGpParams<F, BilateralKernel<F>> {
    fn default() -> Self {
        Self::new(BilateralKernel::new())
    }
}

impl<F: Float, K: Kernel<F>> ExactGpParams<F, K> {
    /// A constructor for GP parameters given the base kernel
    pub fn new(kernel: K) -> ExactGpParams<F, K> {
        Self(ExactGpValidParams {
            kernel,
            mean_init: F::zero(),
            outputscale_init: None,
            noise_init: None,
            device: Device::Cpu,
        })
    }

    /// A constructor for GP parameters from validated parameters
    pub fn new_from_valid(params: &ExactGpValidParams<F, K>) -> Self {
        Self(params.clone())
    }

    /// Set base kernel.
    pub fn kernel(mut self, kernel: K) -> Self {
        self.0.kernel = kernel;
        self
    }

    /// Set initial constant mean.
    pub fn mean_init(mut self, constant: F) -> Self {
        self.0.mean_init = constant;
        self
    }

    /// Set initial outputscale, has to be positive.
    pub fn outputscale_init(mut self, outputscale: F) -> Self {
        self.0.outputscale_init = Some(outputscale);
        self
    }

    /// Set initial noise variance, has to be greater than [NOISE_LOWER_BOUND].
    pub fn noise_init(mut self, noise: F) -> Self {
        self.0.noise_init = Some(noise);
        self
    }

    /// Set the device the model is placed on.
    pub fn device(mut self, device: Device) -> Self {
        self.0.device = device;
        self
    }

    /// Check parameters then build the GP model conditioned on `train` data
    pub fn build(self, train: DataSplit<F>) -> Result<ExactGp<F, K>> {
        self.check()?.build(train)
    }
}

impl<F: Float, K: Kernel<F>> From<ExactGpValidParams<F, K>> for ExactGpParams<F, K> {
    fn from(valid: ExactGpValidParams<F, K>) -> Self {
        ExactGpParams(valid)
    }
}

impl<F: Float, K: Kernel<F>> ParamGuard for ExactGpParams<F, K> {
    type Checked = ExactGpValidParams<F, K>;
    type Error = GpError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        if !self.0.mean_init.is_finite() {
            return Err(GpError::InvalidValueError(format!(
                "Initial constant mean should be finite, got {}",
                self.0.mean_init
            )));
        }
        if let Some(outputscale) = self.0.outputscale_init {
            if !outputscale.is_finite() || outputscale <= F::zero() {
                return Err(GpError::InvalidValueError(format!(
                    "Initial outputscale should be positive, got {outputscale}"
                )));
            }
        }
        if let Some(noise) = self.0.noise_init {
            if !noise.is_finite() || noise <= F::cast(NOISE_LOWER_BOUND) {
                return Err(GpError::InvalidValueError(format!(
                    "Initial noise should be greater than {NOISE_LOWER_BOUND}, got {noise}"
                )));
            }
        }
        if !self.0.device.is_available() {
            return Err(GpError::InvalidValueError(format!(
                "Device {} is not available",
                self.0.device
            )));
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
