use linfa_linalg::LinalgError;
use thiserror::Error;

use crate::trainer::Phase;

/// A result type for GP regression algorithm
pub type Result<T> = std::result::Result<T, GpError>;

/// An error when building, training or evaluating an [`ExactGp`](crate::ExactGp)
#[derive(Error, Debug)]
pub enum GpError {
    /// When input data are empty or have inconsistent shapes
    #[error("Invalid input: {0}")]
    InvalidInputError(String),
    /// When a covariance matrix is not positive definite or a value is not finite
    #[error("Numerical instability: {0}")]
    NumericalInstabilityError(String),
    /// When data and model are not placed on the same device
    #[error("Device mismatch: {0}")]
    DeviceMismatchError(String),
    /// When error due to a bad value
    #[error("InvalidValue error: {0}")]
    InvalidValueError(String),
    /// When metrics cannot be recorded
    #[error("Metrics sink error: {0}")]
    MetricsSinkError(String),
    /// When an epoch of the training loop fails
    #[error("Epoch {epoch} failed while {phase}: {source}")]
    EpochError {
        /// 1-based index of the failing epoch, the step of its recorded metrics
        epoch: usize,
        /// Phase of the epoch in which the error occured
        phase: Phase,
        /// Underlying error
        #[source]
        source: Box<GpError>,
    },
}

impl GpError {
    /// Name of the error kind, the one of the underlying error for an [GpError::EpochError]
    pub fn kind(&self) -> &'static str {
        match self {
            GpError::InvalidInputError(_) => "InvalidInputError",
            GpError::NumericalInstabilityError(_) => "NumericalInstabilityError",
            GpError::DeviceMismatchError(_) => "DeviceMismatchError",
            GpError::InvalidValueError(_) => "InvalidValueError",
            GpError::MetricsSinkError(_) => "MetricsSinkError",
            GpError::EpochError { source, .. } => source.kind(),
        }
    }

    /// Innermost error, skipping epoch context
    pub fn root_cause(&self) -> &GpError {
        match self {
            GpError::EpochError { source, .. } => source.root_cause(),
            err => err,
        }
    }
}

impl From<LinalgError> for GpError {
    fn from(err: LinalgError) -> Self {
        match err {
            LinalgError::NotPositiveDefinite | LinalgError::NonInvertible => {
                GpError::NumericalInstabilityError(format!("covariance factorization failed ({err})"))
            }
            _ => GpError::InvalidInputError(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linalg_error_mapping() {
        let err: GpError = LinalgError::NotPositiveDefinite.into();
        assert!(matches!(err, GpError::NumericalInstabilityError(_)));
        let err: GpError = LinalgError::NotSquare { rows: 2, cols: 3 }.into();
        assert!(matches!(err, GpError::InvalidInputError(_)));
    }

    #[test]
    fn test_epoch_error_kind() {
        let err = GpError::EpochError {
            epoch: 3,
            phase: Phase::Evaluating,
            source: Box::new(GpError::DeviceMismatchError("cpu vs cuda:0".to_string())),
        };
        assert_eq!(err.kind(), "DeviceMismatchError");
        assert!(matches!(err.root_cause(), GpError::DeviceMismatchError(_)));
        assert_eq!(
            err.to_string(),
            "Epoch 3 failed while evaluating: Device mismatch: cpu vs cuda:0"
        );
    }
}
