use linfa::Float;
use linfa_linalg::{cholesky::*, triangular::*};
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

use crate::device::DataSplit;
use crate::errors::{GpError, Result};

/// Floor added to standard deviations so that constant features stay finite once scaled
pub const STD_FLOOR: f64 = 1e-6;

/// Statistics used to standardize inputs and targets of a regression problem.
///
/// Statistics are computed once from training data (unbiased standard deviation
/// plus [STD_FLOOR]) then applied to both train and test data.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Standardizer<F: Float> {
    /// mean vector of inputs
    x_mean: Array1<F>,
    /// standard deviation vector of inputs
    x_std: Array1<F>,
    /// mean of targets
    y_mean: F,
    /// standard deviation of targets
    y_std: F,
}

impl<F: Float> Standardizer<F> {
    /// Compute statistics from (nsamples, ndims) inputs `x` and their targets `y`
    pub fn fit(
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Result<Standardizer<F>> {
        if x.nrows() != y.len() {
            return Err(GpError::InvalidInputError(format!(
                "Cannot standardize {} inputs with {} targets",
                x.nrows(),
                y.len()
            )));
        }
        if x.nrows() < 2 {
            return Err(GpError::InvalidInputError(format!(
                "At least 2 samples are required to standardize data, got {}",
                x.nrows()
            )));
        }
        let eps = F::cast(STD_FLOOR);
        let x_mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| GpError::InvalidInputError("Empty inputs".to_string()))?;
        let x_std = x.std_axis(Axis(0), F::one()).mapv(|v| v + eps);
        let y = y.view().insert_axis(Axis(1));
        let y_mean = y
            .mean_axis(Axis(0))
            .ok_or_else(|| GpError::InvalidInputError("Empty targets".to_string()))?[0];
        let y_std = y.std_axis(Axis(0), F::one())[0] + eps;
        Ok(Standardizer {
            x_mean,
            x_std,
            y_mean,
            y_std,
        })
    }

    /// Compute statistics from a training split
    pub fn fit_split(train: &DataSplit<F>) -> Result<Standardizer<F>> {
        Self::fit(train.x(), train.y())
    }

    /// Input dimension
    pub fn ndims(&self) -> usize {
        self.x_mean.len()
    }

    /// Mean of inputs
    pub fn x_mean(&self) -> &Array1<F> {
        &self.x_mean
    }

    /// Standard deviation of inputs (floored)
    pub fn x_std(&self) -> &Array1<F> {
        &self.x_std
    }

    /// Mean of targets
    pub fn y_mean(&self) -> F {
        self.y_mean
    }

    /// Standard deviation of targets (floored)
    pub fn y_std(&self) -> F {
        self.y_std
    }

    fn check_ndims(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<()> {
        if x.ncols() != self.ndims() {
            return Err(GpError::InvalidInputError(format!(
                "Standardizer fitted on {} features, got {}",
                self.ndims(),
                x.ncols()
            )));
        }
        Ok(())
    }

    /// `(x - mean) / std`
    pub fn transform_x(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        self.check_ndims(x)?;
        Ok((x - &self.x_mean) / &self.x_std)
    }

    /// `(y - mean) / std`
    pub fn transform_y(&self, y: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Array1<F> {
        y.mapv(|v| (v - self.y_mean) / self.y_std)
    }

    /// Standardize both inputs and targets of a split, keeping its device
    pub fn transform(&self, split: &DataSplit<F>) -> Result<DataSplit<F>> {
        let x = self.transform_x(split.x())?;
        let y = self.transform_y(split.y());
        DataSplit::new(x, y, split.device())
    }

    /// `x * std + mean`
    pub fn inverse_transform_x(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Array2<F>> {
        self.check_ndims(x)?;
        Ok(x * &self.x_std + &self.x_mean)
    }

    /// `y * std + mean`
    pub fn inverse_transform_y(&self, y: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Array1<F> {
        y.mapv(|v| v * self.y_std + self.y_mean)
    }
}

/// Lower triangular Cholesky factor of a covariance matrix.
///
/// Non finite entries are rejected upfront as they would otherwise go through
/// the factorization unnoticed.
pub(crate) fn cholesky_factor<F: Float>(cov: &Array2<F>) -> Result<Array2<F>> {
    if cov.iter().any(|v| !v.is_finite()) {
        return Err(GpError::NumericalInstabilityError(
            "covariance matrix has non finite values".to_string(),
        ));
    }
    Ok(cov.cholesky()?)
}

/// Solve `L.Lt z = b` given the lower factor `L`
pub(crate) fn cholesky_solve<F: Float>(
    chol: &Array2<F>,
    b: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Result<Array2<F>> {
    let z = chol.solve_triangular(b, UPLO::Lower)?;
    Ok(chol.t().solve_triangular_into(z, UPLO::Upper)?)
}

/// Squared differences `(x_i[dim] - x_j[dim])^2` between all pairs of rows of `x`,
/// summed over every dimension when `dim` is `None`.
pub(crate) fn pairwise_sq_differences<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    dim: Option<usize>,
) -> Array2<F> {
    let n = x.nrows();
    let mut result = Array2::zeros((n, n));
    let dims = match dim {
        Some(d) => d..d + 1,
        None => 0..x.ncols(),
    };
    for d in dims {
        let col = x.column(d);
        let diff = &col.insert_axis(Axis(1)) - &col.insert_axis(Axis(0));
        result += &(&diff * &diff);
    }
    result
}
