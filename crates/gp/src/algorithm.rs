use crate::device::{DataSplit, Device};
use crate::distribution::MultivariateNormal;
use crate::errors::{GpError, Result};
use crate::kernels::{Kernel, ScaleKernel};
use crate::likelihood::GaussianLikelihood;
use crate::mean_models::ConstantMean;
use crate::parameters::{ExactGpParams, ExactGpValidParams};
use crate::utils::{cholesky_factor, cholesky_solve};

use linfa::Float;
use linfa_linalg::triangular::*;
use log::debug;
use ndarray::{s, Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2};
use std::fmt;

/// Exact Gaussian Process regression model
///
/// A GP is a distribution over functions `f(x) ~ GP(m(x), k(x, x'))` where:
/// * `m(x) = c` is a constant mean,
/// * `k(x, x') = s * kb(x, x')` is a base kernel `kb` scaled by an outputscale `s`,
///
/// and observations are `y = f(x) + e` with a Gaussian noise `e ~ N(0, noise)`
/// (see [GaussianLikelihood]).
///
/// The model keeps its training data. Hyperparameters `c`, `s`, `noise` and
/// the base kernel ones are handled as a vector of raw values (see
/// [ExactGp::raw_parameters]) in the order:
/// 1. raw noise,
/// 2. constant mean,
/// 3. raw outputscale,
/// 4. base kernel raw values.
///
/// Two evaluation modes are available:
/// * [ExactGp::forward] gives the prior distribution of the latent function,
///   used to compute the marginal likelihood of training data,
/// * [ExactGp::posterior] and [ExactGp::predict] give the posterior distribution
///   conditioned on training data.
///
/// # Example
///
/// ```no_run
/// use bigp_gp::{kernels::BilateralKernel, DataSplit, Device, ExactGp};
/// use ndarray::{arr1, arr2};
///
/// let xt = arr2(&[[0.0], [5.0], [10.0], [15.0], [18.0], [20.0], [25.0]]);
/// let yt = arr1(&[-0.31, 1.06, 0.34, 0.62, -0.65, 0.99, -0.35]);
/// let train = DataSplit::new(xt, yt, Device::Cpu).expect("training data");
///
/// let gp = ExactGp::params(BilateralKernel::new())
///     .build(train)
///     .expect("GP built");
///
/// let xtest = arr2(&[[1.0], [12.0]]);
/// let (mean, variance) = gp.predict(&xtest).expect("GP prediction");
/// ```
#[derive(Clone, Debug)]
pub struct ExactGp<F: Float, K: Kernel<F>> {
    mean: ConstantMean<F>,
    kernel: ScaleKernel<F, K>,
    likelihood: GaussianLikelihood<F>,
    train: DataSplit<F>,
    device: Device,
}

/// Number of raw parameters preceding the kernel ones (noise and constant mean)
const N_LEADING_PARAMS: usize = 2;

impl<F: Float, K: Kernel<F>> ExactGp<F, K> {
    /// Gp parameters contructor
    pub fn params(kernel: K) -> ExactGpParams<F, K> {
        ExactGpParams::new(kernel)
    }

    pub(crate) fn new(params: &ExactGpValidParams<F, K>, train: DataSplit<F>) -> Result<Self> {
        params.device().check_same(train.device(), "training data")?;
        params.kernel().check_ndims(train.ndims())?;

        let mut kernel = ScaleKernel::new(params.kernel().clone());
        if let Some(outputscale) = params.outputscale_init() {
            kernel = kernel.with_outputscale(outputscale)?;
        }
        let mut likelihood = GaussianLikelihood::new();
        if let Some(noise) = params.noise_init() {
            likelihood = likelihood.with_noise(noise)?;
        }
        let gp = ExactGp {
            mean: ConstantMean::new(params.mean_init()),
            kernel,
            likelihood,
            train,
            device: params.device(),
        };
        debug!("GP built: {}", gp);
        Ok(gp)
    }

    /// Constant mean function
    pub fn mean_module(&self) -> &ConstantMean<F> {
        &self.mean
    }

    /// Scaled kernel
    pub fn kernel(&self) -> &ScaleKernel<F, K> {
        &self.kernel
    }

    /// Observation likelihood
    pub fn likelihood(&self) -> &GaussianLikelihood<F> {
        &self.likelihood
    }

    /// Training data the model is conditioned on
    pub fn train_data(&self) -> &DataSplit<F> {
        &self.train
    }

    /// Device the model is placed on
    pub fn device(&self) -> Device {
        self.device
    }

    /// Input dimension
    pub fn dims(&self) -> usize {
        self.train.ndims()
    }

    /// Number of raw hyperparameters
    pub fn n_params(&self) -> usize {
        N_LEADING_PARAMS + self.kernel.n_params()
    }

    /// Raw hyperparameters vector
    pub fn raw_parameters(&self) -> Array1<F> {
        let mut raw = Array1::zeros(self.n_params());
        raw[0] = self.likelihood.raw_noise();
        raw[1] = self.mean.constant();
        raw.slice_mut(s![N_LEADING_PARAMS..])
            .assign(&self.kernel.raw_params());
        raw
    }

    /// Set raw hyperparameters vector, see [ExactGp::raw_parameters] for the layout
    pub fn set_raw_parameters(&mut self, raw: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Result<()> {
        if raw.len() != self.n_params() {
            return Err(GpError::InvalidInputError(format!(
                "Expected {} raw parameters, got {}",
                self.n_params(),
                raw.len()
            )));
        }
        self.kernel
            .set_raw_params(&raw.slice(s![N_LEADING_PARAMS..]))?;
        self.likelihood.set_raw_noise(raw[0]);
        self.mean.set_constant(raw[1]);
        Ok(())
    }

    /// Names of hyperparameters, in raw parameters order
    pub fn parameter_names(&self) -> Vec<String> {
        ["likelihood.noise".to_string(), "mean.constant".to_string()]
            .into_iter()
            .chain(
                self.kernel
                    .param_names()
                    .into_iter()
                    .map(|name| format!("kernel.{name}")),
            )
            .collect()
    }

    /// Named constrained hyperparameters values, in raw parameters order
    pub fn hyperparameters(&self) -> Vec<(String, F)> {
        let values = [self.likelihood.noise(), self.mean.constant()]
            .into_iter()
            .chain(self.kernel.params().to_vec());
        self.parameter_names().into_iter().zip(values).collect()
    }

    fn check_input(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<()> {
        if x.nrows() == 0 {
            return Err(GpError::InvalidInputError(
                "Cannot evaluate GP at zero points".to_string(),
            ));
        }
        if x.ncols() != self.dims() {
            return Err(GpError::InvalidInputError(format!(
                "GP trained with {}-dimensional inputs, got {} dimensions",
                self.dims(),
                x.ncols()
            )));
        }
        Ok(())
    }

    /// Prior distribution of the latent function at `x` points
    pub fn forward(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<MultivariateNormal<F>> {
        self.check_input(x)?;
        MultivariateNormal::new(self.mean.value(x), self.kernel.value(x, x))
    }

    /// Prior distribution of the observations at training points
    pub fn train_marginal(&self) -> Result<MultivariateNormal<F>> {
        let prior = self.forward(self.train.x())?;
        self.likelihood.marginal(&prior)
    }

    /// Cholesky factor of the training marginal covariance and `alpha = K^-1 (y - c)` as (n, 1) column
    pub(crate) fn conditioning(&self) -> Result<(Array2<F>, Array2<F>)> {
        let marginal = self.train_marginal()?;
        let chol = cholesky_factor(marginal.covariance())?;
        let residuals = (self.train.y() - marginal.mean()).insert_axis(Axis(1));
        let alpha = cholesky_solve(&chol, &residuals)?;
        Ok((chol, alpha))
    }

    /// Posterior mean at `x` and `L^-1 k(xt, x)` where `L` is the training Cholesky factor
    fn posterior_terms(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<(Array1<F>, Array2<F>)> {
        self.check_input(x)?;
        let (chol, alpha) = self.conditioning()?;
        let k_star = self.kernel.value(self.train.x(), x);
        let mean = k_star.t().dot(&alpha).remove_axis(Axis(1)) + self.mean.value(x);
        let v = chol.solve_triangular_into(k_star, UPLO::Lower)?;
        Ok((mean, v))
    }

    /// Posterior distribution of the latent function at `x` points
    /// given the training data.
    pub fn posterior(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<MultivariateNormal<F>> {
        let (mean, v) = self.posterior_terms(x)?;
        let covariance = self.kernel.value(x, x) - v.t().dot(&v);
        MultivariateNormal::new(mean, covariance)
    }

    /// Predictive mean and variance of observations at `x` points
    /// given the training data.
    ///
    /// Variances are the diagonal of the posterior covariance, clipped to zero
    /// against round-off, plus the noise variance.
    pub fn predict(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<(Array1<F>, Array1<F>)> {
        let (mean, v) = self.posterior_terms(x)?;
        let latent_var = (self.kernel.diag(x) - (&v * &v).sum_axis(Axis(0)))
            .mapv(|var| if var < F::zero() { F::zero() } else { var });
        Ok((mean, self.likelihood.marginal_variance(&latent_var)))
    }

    /// Predictive mean and variance at `split` inputs, which has to be on the model device
    pub fn predict_split(&self, split: &DataSplit<F>) -> Result<(Array1<F>, Array1<F>)> {
        self.device.check_same(split.device(), "evaluation data")?;
        self.predict(split.x())
    }
}

impl<F: Float, K: Kernel<F>> fmt::Display for ExactGp<F, K> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "ExactGp(mean={}, kernel={}, likelihood={}, device={})",
            self.mean, self.kernel, self.likelihood, self.device
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::BilateralKernel;
    use approx::assert_abs_diff_eq;
    use ndarray::{arr1, arr2, array, Array};
    use ndarray_rand::{rand::SeedableRng, rand_distr::Uniform, RandomExt};
    use rand_xoshiro::Xoshiro256Plus;

    fn training_data() -> DataSplit<f64> {
        let xt = arr2(&[[0.0], [5.0], [10.0], [15.0], [18.0], [20.0], [25.0]]) / 10.;
        let yt = arr1(&[-0.31, 1.06, 0.34, 0.62, -0.65, 0.99, -0.35]);
        DataSplit::new(xt, yt, Device::Cpu).unwrap()
    }

    fn gp() -> ExactGp<f64, BilateralKernel<f64>> {
        ExactGp::params(BilateralKernel::new())
            .build(training_data())
            .unwrap()
    }

    #[test]
    fn test_default_hyperparameters() {
        let gp = gp();
        assert_eq!(gp.raw_parameters(), Array1::zeros(4));
        let hyper = gp.hyperparameters();
        let names: Vec<&str> = hyper.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec!["likelihood.noise", "mean.constant", "kernel.outputscale", "kernel.lengthscale"]
        );
        let ln2 = std::f64::consts::LN_2;
        assert_abs_diff_eq!(hyper[0].1, 1e-4 + ln2, epsilon = 1e-15);
        assert_abs_diff_eq!(hyper[1].1, 0.);
        assert_abs_diff_eq!(hyper[2].1, ln2, epsilon = 1e-15);
        assert_abs_diff_eq!(hyper[3].1, ln2, epsilon = 1e-15);
    }

    #[test]
    fn test_set_raw_parameters() {
        let mut gp = gp();
        gp.set_raw_parameters(&array![0.1, 0.2, 0.3, 0.4]).unwrap();
        assert_eq!(gp.raw_parameters(), array![0.1, 0.2, 0.3, 0.4]);
        assert_eq!(gp.mean_module().constant(), 0.2);
        assert!(matches!(
            gp.set_raw_parameters(&array![0.1, 0.2]),
            Err(GpError::InvalidInputError(_))
        ));
    }

    #[test]
    fn test_forward_is_prior() {
        let gp = ExactGp::params(BilateralKernel::new())
            .mean_init(0.5)
            .outputscale_init(2.)
            .build(training_data())
            .unwrap();
        let x = array![[0.], [1.]];
        let prior = gp.forward(&x).unwrap();
        assert_eq!(prior.mean(), &array![0.5, 0.5]);
        let k01 = 2. * (-0.5 / (std::f64::consts::LN_2 * std::f64::consts::LN_2)).exp();
        assert_abs_diff_eq!(
            prior.covariance(),
            &array![[2., k01], [k01, 2.]],
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_posterior_interpolates_with_small_noise() {
        let train = training_data();
        let gp = ExactGp::params(BilateralKernel::new().with_lengthscale(&[0.3]).unwrap())
            .noise_init(1.1e-4)
            .build(train.clone())
            .unwrap();
        let (mean, variance) = gp.predict(train.x()).unwrap();
        assert_abs_diff_eq!(&mean, train.y(), epsilon = 1e-2);
        assert!(variance.iter().all(|v| *v >= 1e-4 && *v < 1e-2));

        let posterior = gp.posterior(train.x()).unwrap();
        assert_abs_diff_eq!(posterior.mean(), &mean, epsilon = 1e-12);
        assert_abs_diff_eq!(
            gp.likelihood().marginal_variance(&posterior.variance().mapv(|v| v.max(0.))),
            variance,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_far_predictions_revert_to_prior() {
        let gp = gp();
        let (mean, variance) = gp.predict(&array![[100.]]).unwrap();
        assert_abs_diff_eq!(mean[0], 0., epsilon = 1e-12);
        assert_abs_diff_eq!(
            variance[0],
            gp.kernel().outputscale() + gp.likelihood().noise(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_predictive_variance_is_non_negative() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let xt = Array::random_using((30, 2), Uniform::new(-1f64, 1.), &mut rng);
        let yt = xt.map_axis(Axis(1), |row| row[0].sin() + row[1]);
        let gp = ExactGp::params(BilateralKernel::ard(2))
            .build(DataSplit::new(xt, yt, Device::Cpu).unwrap())
            .unwrap();
        let x = Array::random_using((50, 2), Uniform::new(-2., 2.), &mut rng);
        let (mean, variance) = gp.predict(&x).unwrap();
        assert_eq!(mean.len(), 50);
        assert!(variance.iter().all(|v| *v >= gp.likelihood().noise()));
    }

    #[test]
    fn test_invalid_inputs() {
        let gp = gp();
        assert!(matches!(
            gp.predict(&Array2::<f64>::zeros((3, 2))),
            Err(GpError::InvalidInputError(_))
        ));
        assert!(matches!(
            gp.forward(&Array2::<f64>::zeros((0, 1))),
            Err(GpError::InvalidInputError(_))
        ));
        let err = ExactGp::params(BilateralKernel::ard(3))
            .build(training_data())
            .unwrap_err();
        assert!(matches!(err, GpError::InvalidInputError(_)));
    }

    #[test]
    fn test_device_mismatch() {
        let (xt, yt) = training_data().into_parts();
        let on_gpu = DataSplit::new(xt.clone(), yt.clone(), Device::Cuda(0)).unwrap();
        let err = ExactGp::params(BilateralKernel::new())
            .build(on_gpu.clone())
            .unwrap_err();
        assert!(matches!(err, GpError::DeviceMismatchError(_)));

        let gp = gp();
        assert!(matches!(
            gp.predict_split(&on_gpu),
            Err(GpError::DeviceMismatchError(_))
        ));
        let on_cpu = DataSplit::new(xt, yt, Device::Cpu).unwrap();
        assert!(gp.predict_split(&on_cpu).is_ok());
    }
}
