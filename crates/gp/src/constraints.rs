//! Constraints mapping raw (unconstrained) hyperparameters to admissible values.
//!
//! Hyperparameters are optimized in raw space where any real value is valid, model
//! computations use the transformed value.
use linfa::Float;
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

use crate::errors::{GpError, Result};

/// Numerically stable `log(1 + exp(x))`
pub fn softplus<F: Float>(x: F) -> F {
    // exp(x) overflows long before, while softplus(x) == x at working precision
    if x > F::cast(20.) {
        x
    } else {
        x.exp().ln_1p()
    }
}

/// Inverse of [softplus], `y` has to be positive
pub fn inverse_softplus<F: Float>(y: F) -> F {
    if y > F::cast(20.) {
        y
    } else {
        y.exp_m1().ln()
    }
}

/// Logistic function, derivative of [softplus]
pub fn sigmoid<F: Float>(x: F) -> F {
    F::one() / (F::one() + (-x).exp())
}

/// Constrains a value to `(lower_bound, +inf)` using `lower_bound + softplus(raw)`
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Positive<F: Float> {
    lower_bound: F,
}

impl<F: Float> Default for Positive<F> {
    fn default() -> Self {
        Positive {
            lower_bound: F::zero(),
        }
    }
}

impl<F: Float> Positive<F> {
    /// Values strictly greater than zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Values strictly greater than `lower_bound`
    pub fn greater_than(lower_bound: F) -> Self {
        Positive { lower_bound }
    }

    /// Lower bound of admissible values
    pub fn lower_bound(&self) -> F {
        self.lower_bound
    }

    /// Constrained value of `raw`
    pub fn transform(&self, raw: F) -> F {
        self.lower_bound + softplus(raw)
    }

    /// Raw value giving `value` once transformed
    pub fn inverse_transform(&self, value: F) -> Result<F> {
        if !value.is_finite() || value <= self.lower_bound {
            return Err(GpError::InvalidValueError(format!(
                "{} is not greater than {}",
                value, self.lower_bound
            )));
        }
        Ok(inverse_softplus(value - self.lower_bound))
    }

    /// Derivative of the constrained value wrt `raw`
    pub fn derivative(&self, raw: F) -> F {
        sigmoid(raw)
    }
}
