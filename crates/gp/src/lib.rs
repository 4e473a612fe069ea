//! This library implements exact [Gaussian Process](https://en.wikipedia.org/wiki/Gaussian_process) regression
//! whose hyperparameters are trained by gradient descent on the negative marginal log likelihood.
//!
//! The GP model is made of a constant mean, a scaled kernel (by default the bilateral kernel,
//! a Gaussian filter over the inputs) and a Gaussian observation likelihood. Hyperparameters are
//! handled as unconstrained raw values and optimized with Adam using analytic gradients.
//!
//! GP model is implemented by [ExactGp] parameterized by [ExactGpParams],
//! its training loop by [Trainer] which alternates, at each epoch, an optimization step
//! on training data and the evaluation of the prediction error on test data.
//!
//! Data are expected to be standardized beforehand, see [Standardizer].
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod algorithm;
pub mod constraints;
mod device;
pub mod distribution;
mod errors;
pub mod kernels;
pub mod likelihood;
pub mod mean_models;
pub mod metrics;
mod mll;
mod optimization;
mod parameters;
mod seed;
mod trainer;
mod utils;

pub use algorithm::*;
pub use device::*;
pub use errors::*;
pub use mll::*;
pub use optimization::*;
pub use parameters::*;
pub use seed::*;
pub use trainer::*;
pub use utils::{Standardizer, STD_FLOOR};
