//! Multivariate normal distribution returned by the GP model.
use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, Data, Ix1};
use std::f64::consts::PI;

use crate::errors::{GpError, Result};
use crate::utils::{cholesky_factor, cholesky_solve};

/// Multivariate normal distribution described by its mean vector and covariance matrix
#[derive(Clone, Debug, PartialEq)]
pub struct MultivariateNormal<F: Float> {
    mean: Array1<F>,
    covariance: Array2<F>,
}

impl<F: Float> MultivariateNormal<F> {
    /// Constructor, `covariance` has to be a (n, n) matrix where n is the `mean` length
    pub fn new(mean: Array1<F>, covariance: Array2<F>) -> Result<Self> {
        if covariance.dim() != (mean.len(), mean.len()) {
            return Err(GpError::InvalidInputError(format!(
                "Covariance of shape {:?} does not match mean of length {}",
                covariance.dim(),
                mean.len()
            )));
        }
        Ok(MultivariateNormal { mean, covariance })
    }

    /// Number of variables
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    /// Whether the distribution has no variable
    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Mean vector
    pub fn mean(&self) -> &Array1<F> {
        &self.mean
    }

    /// Covariance matrix
    pub fn covariance(&self) -> &Array2<F> {
        &self.covariance
    }

    /// Marginal variances, the covariance diagonal
    pub fn variance(&self) -> Array1<F> {
        self.covariance.diag().to_owned()
    }

    /// Log density at `y`, fails when the covariance is not positive definite
    pub fn log_prob(&self, y: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Result<F> {
        if y.len() != self.len() {
            return Err(GpError::InvalidInputError(format!(
                "Cannot evaluate density of {} variables at a point of length {}",
                self.len(),
                y.len()
            )));
        }
        let chol = cholesky_factor(&self.covariance)?;
        let r = (y - &self.mean).insert_axis(ndarray::Axis(1));
        let alpha = cholesky_solve(&chol, &r)?;
        let data_fit = r.t().dot(&alpha)[[0, 0]];
        let log_det = chol.diag().mapv(|v| v.ln()).sum() * F::cast(2.);
        let n = F::cast(self.len());
        Ok(F::cast(-0.5) * (data_fit + log_det + n * F::cast((2. * PI).ln())))
    }
}
