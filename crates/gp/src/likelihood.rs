//! Observation model of the GP regression.
use linfa::Float;
use ndarray::{Array1, Array2};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constraints::Positive;
use crate::distribution::MultivariateNormal;
use crate::errors::Result;

/// Lower bound of the observation noise variance
pub const NOISE_LOWER_BOUND: f64 = 1e-4;

/// Homoskedastic Gaussian likelihood `y = f(x) + e` with `e ~ N(0, noise)`.
///
/// The noise variance is a trainable hyperparameter constrained to be greater
/// than [NOISE_LOWER_BOUND].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct GaussianLikelihood<F: Float> {
    raw_noise: F,
    constraint: Positive<F>,
}

impl<F: Float> Default for GaussianLikelihood<F> {
    fn default() -> Self {
        GaussianLikelihood {
            raw_noise: F::zero(),
            constraint: Positive::greater_than(F::cast(NOISE_LOWER_BOUND)),
        }
    }
}

impl<F: Float> GaussianLikelihood<F> {
    /// Likelihood with noise variance `1e-4 + softplus(0)`
    pub fn new() -> Self {
        Self::default()
    }

    /// Set initial noise variance
    pub fn with_noise(mut self, noise: F) -> Result<Self> {
        self.raw_noise = self.constraint.inverse_transform(noise)?;
        Ok(self)
    }

    /// Noise variance
    pub fn noise(&self) -> F {
        self.constraint.transform(self.raw_noise)
    }

    /// Raw noise hyperparameter
    pub fn raw_noise(&self) -> F {
        self.raw_noise
    }

    /// Set raw noise hyperparameter
    pub fn set_raw_noise(&mut self, raw_noise: F) {
        self.raw_noise = raw_noise
    }

    /// Derivative of the noise variance wrt the raw noise
    pub fn noise_derivative(&self) -> F {
        self.constraint.derivative(self.raw_noise)
    }

    /// Distribution of observations given the distribution of the latent function
    pub fn marginal(&self, latent: &MultivariateNormal<F>) -> Result<MultivariateNormal<F>> {
        let noise = Array2::eye(latent.len()) * self.noise();
        MultivariateNormal::new(latent.mean().to_owned(), latent.covariance() + &noise)
    }

    /// Variances of observations given the latent variances
    pub fn marginal_variance(&self, latent_variance: &Array1<F>) -> Array1<F> {
        latent_variance.mapv(|v| v + self.noise())
    }
}

impl<F: Float> fmt::Display for GaussianLikelihood<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "GaussianLikelihood(noise={})", self.noise())
    }
}
