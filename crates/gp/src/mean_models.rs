//! A module for mean functions of the GP prior.
//!
//! The following mean functions are implemented:
//! * constant (trainable constant value)
use linfa::Float;
use ndarray::{Array1, ArrayBase, Data, Ix2};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// A constant function as mean of the GP, its value is a hyperparameter
/// optimized along the kernel ones.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct ConstantMean<F: Float> {
    constant: F,
}

impl<F: Float> ConstantMean<F> {
    /// Constructor
    pub fn new(constant: F) -> Self {
        ConstantMean { constant }
    }

    /// Current constant value
    pub fn constant(&self) -> F {
        self.constant
    }

    /// Update the constant value
    pub fn set_constant(&mut self, constant: F) {
        self.constant = constant
    }

    /// Mean values at the given (nsamples, ndims) points
    pub fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F> {
        Array1::from_elem(x.nrows(), self.constant)
    }
}

impl<F: Float> fmt::Display for ConstantMean<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ConstantMean(constant={})", self.constant)
    }
}
