//! A module for covariance kernels of the GP model.
//!
//! Kernels hold their hyperparameters as raw (unconstrained) values mapped to
//! positive values through a [Positive] constraint. Besides covariance matrices,
//! a kernel gives the derivatives of its covariance matrix wrt each raw value,
//! from which the marginal likelihood gradient is computed.
//!
//! The following kernels are implemented:
//! * bilateral (Gaussian filter over the inputs, one shared or one per dimension lengthscale),
//! * scale (outputscale times a base kernel).

use crate::constraints::Positive;
use crate::errors::{GpError, Result};
use crate::utils::pairwise_sq_differences;
use linfa::Float;
use ndarray::{s, Array1, Array2, ArrayBase, ArrayView1, Data, Ix2, Zip};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// A trait for using a covariance kernel in GP regression
pub trait Kernel<F: Float>: Clone + fmt::Display + Sync {
    /// Number of raw hyperparameters
    fn n_params(&self) -> usize;

    /// Raw hyperparameters values
    fn raw_params(&self) -> Array1<F>;

    /// Set raw hyperparameters, `raw` length has to be [Kernel::n_params]
    fn set_raw_params(&mut self, raw: &ArrayView1<F>) -> Result<()>;

    /// Constrained hyperparameters values, in the same order as raw ones
    fn params(&self) -> Array1<F>;

    /// Hyperparameters names, in the same order as raw ones
    fn param_names(&self) -> Vec<String>;

    /// Check the kernel can be evaluated on inputs of dimension `ndims`
    fn check_ndims(&self, _ndims: usize) -> Result<()> {
        Ok(())
    }

    /// Covariance matrix `k(x1, x2)` of shape (n1, n2) between (n1, ndims) points `x1`
    /// and (n2, ndims) points `x2`
    fn value(
        &self,
        x1: &ArrayBase<impl Data<Elem = F>, Ix2>,
        x2: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Array2<F>;

    /// Diagonal of `k(x, x)`
    fn diag(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F> {
        self.value(x, x).diag().to_owned()
    }

    /// Derivatives of `k(x, x)` wrt each raw hyperparameter
    fn raw_gradients(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Vec<Array2<F>>;
}

fn check_raw_len(expected: usize, raw: &ArrayView1<impl Float>) -> Result<()> {
    if raw.len() != expected {
        return Err(GpError::InvalidInputError(format!(
            "Expected {} raw hyperparameters, got {}",
            expected,
            raw.len()
        )));
    }
    Ok(())
}

/// Bilateral kernel, the Gaussian filter `exp(-|(x - x') / lengthscale|^2 / 2)`.
///
/// A single lengthscale is shared by every input dimension unless built with
/// [BilateralKernel::ard] which uses one lengthscale per dimension.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct BilateralKernel<F: Float> {
    raw_lengthscale: Array1<F>,
    constraint: Positive<F>,
}

impl<F: Float> Default for BilateralKernel<F> {
    fn default() -> Self {
        BilateralKernel {
            raw_lengthscale: Array1::zeros(1),
            constraint: Positive::new(),
        }
    }
}

impl<F: Float> BilateralKernel<F> {
    /// Kernel with a single lengthscale
    pub fn new() -> Self {
        Self::default()
    }

    /// Kernel with one lengthscale per input dimension
    pub fn ard(ndims: usize) -> Self {
        BilateralKernel {
            raw_lengthscale: Array1::zeros(ndims.max(1)),
            ..Self::default()
        }
    }

    /// Set initial lengthscales, one value or one per dimension for ARD kernel
    pub fn with_lengthscale(mut self, lengthscale: &[F]) -> Result<Self> {
        check_raw_len(self.raw_lengthscale.len(), &ArrayView1::from(lengthscale))?;
        for (raw, l) in self.raw_lengthscale.iter_mut().zip(lengthscale) {
            *raw = self.constraint.inverse_transform(*l)?;
        }
        Ok(self)
    }

    /// Current lengthscales
    pub fn lengthscale(&self) -> Array1<F> {
        self.raw_lengthscale.mapv(|r| self.constraint.transform(r))
    }

    fn inverse_lengthscales(&self, ndims: usize) -> Array1<F> {
        let ls = self.lengthscale();
        if ls.len() == 1 {
            Array1::from_elem(ndims, F::one() / ls[0])
        } else {
            ls.mapv(|l| F::one() / l)
        }
    }
}

impl<F: Float> Kernel<F> for BilateralKernel<F> {
    fn n_params(&self) -> usize {
        self.raw_lengthscale.len()
    }

    fn raw_params(&self) -> Array1<F> {
        self.raw_lengthscale.to_owned()
    }

    fn set_raw_params(&mut self, raw: &ArrayView1<F>) -> Result<()> {
        check_raw_len(self.n_params(), raw)?;
        self.raw_lengthscale.assign(raw);
        Ok(())
    }

    fn params(&self) -> Array1<F> {
        self.lengthscale()
    }

    fn param_names(&self) -> Vec<String> {
        if self.raw_lengthscale.len() == 1 {
            vec!["lengthscale".to_string()]
        } else {
            (0..self.raw_lengthscale.len())
                .map(|i| format!("lengthscale[{i}]"))
                .collect()
        }
    }

    fn check_ndims(&self, ndims: usize) -> Result<()> {
        let n = self.raw_lengthscale.len();
        if n != 1 && n != ndims {
            return Err(GpError::InvalidInputError(format!(
                "Kernel has {n} lengthscales, inputs have {ndims} dimensions"
            )));
        }
        Ok(())
    }

    fn value(
        &self,
        x1: &ArrayBase<impl Data<Elem = F>, Ix2>,
        x2: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Array2<F> {
        let inv_ls = self.inverse_lengthscales(x1.ncols());
        let (x1, x2) = (x1.view(), x2.view());
        let mut k = Array2::zeros((x1.nrows(), x2.nrows()));
        Zip::from(k.rows_mut())
            .and(x1.rows())
            .par_for_each(|mut k_row, xi| {
                Zip::from(&mut k_row).and(x2.rows()).for_each(|k_ij, xj| {
                    let r2 = Zip::from(&xi)
                        .and(&xj)
                        .and(&inv_ls)
                        .fold(F::zero(), |acc, &a, &b, &l| {
                            let z = (a - b) * l;
                            acc + z * z
                        });
                    *k_ij = (F::cast(-0.5) * r2).exp();
                });
            });
        k
    }

    fn diag(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F> {
        Array1::ones(x.nrows())
    }

    fn raw_gradients(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Vec<Array2<F>> {
        let k = self.value(x, x);
        let dims: Vec<Option<usize>> = if self.raw_lengthscale.len() == 1 {
            vec![None]
        } else {
            (0..self.raw_lengthscale.len()).map(Some).collect()
        };
        // dk/dl = k * d^2 / l^3
        dims.into_iter()
            .zip(self.raw_lengthscale.iter())
            .map(|(dim, &raw)| {
                let l = self.constraint.transform(raw);
                let factor = self.constraint.derivative(raw) / (l * l * l);
                let mut grad = pairwise_sq_differences(x, dim);
                Zip::from(&mut grad)
                    .and(&k)
                    .for_each(|g, &kv| *g = *g * kv * factor);
                grad
            })
            .collect()
    }
}

impl<F: Float> fmt::Display for BilateralKernel<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "BilateralKernel(lengthscale={})", self.lengthscale())
    }
}

/// Scales a base kernel by a trainable positive outputscale `s`: `s * k(x, x')`
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct ScaleKernel<F: Float, K: Kernel<F>> {
    base: K,
    raw_outputscale: F,
    constraint: Positive<F>,
}

impl<F: Float, K: Kernel<F>> ScaleKernel<F, K> {
    /// Wrap `base` with an outputscale of `softplus(0)`
    pub fn new(base: K) -> Self {
        ScaleKernel {
            base,
            raw_outputscale: F::zero(),
            constraint: Positive::new(),
        }
    }

    /// Set initial outputscale
    pub fn with_outputscale(mut self, outputscale: F) -> Result<Self> {
        self.raw_outputscale = self.constraint.inverse_transform(outputscale)?;
        Ok(self)
    }

    /// Current outputscale
    pub fn outputscale(&self) -> F {
        self.constraint.transform(self.raw_outputscale)
    }

    /// Scaled kernel
    pub fn base(&self) -> &K {
        &self.base
    }
}

impl<F: Float, K: Kernel<F>> Kernel<F> for ScaleKernel<F, K> {
    fn n_params(&self) -> usize {
        1 + self.base.n_params()
    }

    fn raw_params(&self) -> Array1<F> {
        let mut raw = Array1::zeros(self.n_params());
        raw[0] = self.raw_outputscale;
        raw.slice_mut(s![1..]).assign(&self.base.raw_params());
        raw
    }

    fn set_raw_params(&mut self, raw: &ArrayView1<F>) -> Result<()> {
        check_raw_len(self.n_params(), raw)?;
        self.base.set_raw_params(&raw.slice(s![1..]))?;
        self.raw_outputscale = raw[0];
        Ok(())
    }

    fn params(&self) -> Array1<F> {
        let mut params = Array1::zeros(self.n_params());
        params[0] = self.outputscale();
        params.slice_mut(s![1..]).assign(&self.base.params());
        params
    }

    fn param_names(&self) -> Vec<String> {
        std::iter::once("outputscale".to_string())
            .chain(self.base.param_names())
            .collect()
    }

    fn check_ndims(&self, ndims: usize) -> Result<()> {
        self.base.check_ndims(ndims)
    }

    fn value(
        &self,
        x1: &ArrayBase<impl Data<Elem = F>, Ix2>,
        x2: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Array2<F> {
        self.base.value(x1, x2) * self.outputscale()
    }

    fn diag(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F> {
        self.base.diag(x) * self.outputscale()
    }

    fn raw_gradients(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Vec<Array2<F>> {
        let scale = self.outputscale();
        let dscale = self.constraint.derivative(self.raw_outputscale);
        std::iter::once(self.base.value(x, x) * dscale)
            .chain(
                self.base
                    .raw_gradients(x)
                    .into_iter()
                    .map(|grad| grad * scale),
            )
            .collect()
    }
}

impl<F: Float, K: Kernel<F>> fmt::Display for ScaleKernel<F, K> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "ScaleKernel(outputscale={}, base={})",
            self.outputscale(),
            self.base
        )
    }
}
