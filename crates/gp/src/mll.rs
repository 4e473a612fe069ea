use crate::algorithm::ExactGp;
use crate::errors::{GpError, Result};
use crate::kernels::Kernel;
use crate::utils::cholesky_solve;

use linfa::Float;
use ndarray::{Array1, Array2, Axis, Zip};
use std::f64::consts::PI;

/// Log marginal likelihood of the training targets
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MllOutput<F: Float> {
    /// `log p(y)` summed over the training samples
    pub log_likelihood: F,
    /// Number of training samples
    pub nsamples: usize,
}

impl<F: Float> MllOutput<F> {
    /// Per-sample log marginal likelihood
    pub fn per_sample(&self) -> F {
        self.log_likelihood / F::cast(self.nsamples)
    }

    /// Training loss, the negated per-sample log marginal likelihood
    pub fn loss(&self) -> F {
        -self.per_sample()
    }
}

/// Exact marginal log likelihood of a GP model given its training data:
///
/// `log p(y) = -1/2 (y - c)' K^-1 (y - c) - 1/2 log|K| - n/2 log(2 pi)`
///
/// where `K = s * k(X, X) + noise * I`.
///
/// Gradients wrt raw hyperparameters `t` are computed analytically with
/// `d log p / dt = 1/2 tr((alpha alpha' - K^-1) dK/dt)` where `alpha = K^-1 (y - c)`
/// and `d log p / dc = sum(alpha)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExactMarginalLogLikelihood;

impl ExactMarginalLogLikelihood {
    /// Constructor
    pub fn new() -> Self {
        ExactMarginalLogLikelihood
    }

    /// Log marginal likelihood of the model training targets
    pub fn evaluate<F: Float, K: Kernel<F>>(&self, model: &ExactGp<F, K>) -> Result<MllOutput<F>> {
        let train = model.train_data();
        let log_likelihood = model.train_marginal()?.log_prob(train.y())?;
        let output = MllOutput {
            log_likelihood,
            nsamples: train.nsamples(),
        };
        check_finite(output.loss(), "loss")?;
        Ok(output)
    }

    /// Training loss (negated per-sample log marginal likelihood) and its gradient
    /// wrt the model raw parameters.
    pub fn loss_and_grad<F: Float, K: Kernel<F>>(
        &self,
        model: &ExactGp<F, K>,
    ) -> Result<(F, Array1<F>)> {
        let train = model.train_data();
        let n = train.nsamples();
        let (chol, alpha) = model.conditioning()?;

        let residuals = train
            .y()
            .mapv(|v| v - model.mean_module().constant())
            .insert_axis(Axis(1));
        let data_fit = residuals.t().dot(&alpha)[[0, 0]];
        let log_det = chol.diag().mapv(|v| v.ln()).sum() * F::cast(2.);
        let log_likelihood =
            F::cast(-0.5) * (data_fit + log_det + F::cast(n) * F::cast((2. * PI).ln()));
        let output = MllOutput {
            log_likelihood,
            nsamples: n,
        };
        check_finite(output.loss(), "loss")?;

        // w = alpha.alpha' - K^-1
        let k_inv = cholesky_solve(&chol, &Array2::<F>::eye(n))?;
        let w = alpha.dot(&alpha.t()) - k_inv;
        let half = F::cast(0.5);

        let mut grad = Array1::zeros(model.n_params());
        grad[0] = half * w.diag().sum() * model.likelihood().noise_derivative();
        grad[1] = alpha.sum();
        for (i, dk) in model
            .kernel()
            .raw_gradients(train.x())
            .iter()
            .enumerate()
        {
            let trace = Zip::from(&w)
                .and(dk)
                .fold(F::zero(), |acc, &a, &b| acc + a * b);
            grad[2 + i] = half * trace;
        }
        let scale = -F::one() / F::cast(n);
        grad.mapv_inplace(|g| g * scale);
        if grad.iter().any(|g| !g.is_finite()) {
            return Err(GpError::NumericalInstabilityError(format!(
                "Non finite loss gradient {grad}"
            )));
        }
        Ok((output.loss(), grad))
    }
}

fn check_finite<F: Float>(value: F, what: &str) -> Result<()> {
    if !value.is_finite() {
        return Err(GpError::NumericalInstabilityError(format!(
            "Non finite {what} ({value})"
        )));
    }
    Ok(())
}
