//! A module for metrics used to monitor GP training.
//!
//! It provides the root mean square error of predictions and the [MetricsSink]
//! trait through which the training loop reports scalar values.

use linfa::Float;
use ndarray::{Array, ArrayBase, Axis, Data, Dimension, RemoveAxis, Zip};

use crate::errors::{GpError, Result};

/// Name of the training loss metric
pub const TRAIN_LOSS: &str = "train/loss";
/// Name of the test root mean square error metric
pub const TEST_RMSE: &str = "test/rmse";

/// Root mean square error between predictions and targets, averaged over
/// the first (samples) axis only.
///
/// For 1-D arrays the result is a 0-d array, for (n, m) arrays the m values
/// of the error per output.
pub fn rmse<F: Float, D: Dimension + RemoveAxis>(
    pred: &ArrayBase<impl Data<Elem = F>, D>,
    target: &ArrayBase<impl Data<Elem = F>, D>,
) -> Result<Array<F, D::Smaller>> {
    if pred.shape() != target.shape() {
        return Err(GpError::InvalidInputError(format!(
            "Predictions of shape {:?} compared to targets of shape {:?}",
            pred.shape(),
            target.shape()
        )));
    }
    let mut sq_err = Array::zeros(pred.raw_dim());
    Zip::from(&mut sq_err)
        .and(pred)
        .and(target)
        .for_each(|e, &p, &t| *e = (p - t) * (p - t));
    let mse = sq_err.mean_axis(Axis(0)).ok_or_else(|| {
        GpError::InvalidInputError("Cannot compute rmse without samples".to_string())
    })?;
    Ok(mse.mapv(|v| v.sqrt()))
}

/// A trait for recording named scalar values indexed by step
pub trait MetricsSink {
    /// Record `value` of metric `name` at `step`
    fn log_scalar(&mut self, name: &str, value: f64, step: usize) -> Result<()>;
}

impl<S: MetricsSink + ?Sized> MetricsSink for &mut S {
    fn log_scalar(&mut self, name: &str, value: f64, step: usize) -> Result<()> {
        (**self).log_scalar(name, value, step)
    }
}

/// A recorded scalar value
#[derive(Clone, Debug, PartialEq)]
pub struct ScalarRecord {
    /// metric name
    pub name: String,
    /// metric value
    pub value: f64,
    /// step at which the value was recorded
    pub step: usize,
}

/// Sink keeping records in memory
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    records: Vec<ScalarRecord>,
}

impl MemorySink {
    /// Empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// All records in logging order
    pub fn records(&self) -> &[ScalarRecord] {
        &self.records
    }

    /// Values of metric `name` in logging order
    pub fn values(&self, name: &str) -> Vec<f64> {
        self.records
            .iter()
            .filter(|r| r.name == name)
            .map(|r| r.value)
            .collect()
    }

    /// Steps of metric `name` in logging order
    pub fn steps(&self, name: &str) -> Vec<usize> {
        self.records
            .iter()
            .filter(|r| r.name == name)
            .map(|r| r.step)
            .collect()
    }
}

impl MetricsSink for MemorySink {
    fn log_scalar(&mut self, name: &str, value: f64, step: usize) -> Result<()> {
        self.records.push(ScalarRecord {
            name: name.to_string(),
            value,
            step,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array1};

    #[test]
    fn test_rmse_1d() {
        let pred = array![1., 2., 3., 4.];
        let target = array![1., 0., 3., 6.];
        let err = rmse(&pred, &target).unwrap();
        assert_eq!(err.ndim(), 0);
        assert_abs_diff_eq!(err[()], 2f64.sqrt(), epsilon = 1e-15);
        assert_eq!(rmse(&pred, &pred).unwrap()[()], 0.);
    }

    #[test]
    fn test_rmse_reduces_first_axis_only() {
        let pred = array![[1., 0.], [3., 0.]];
        let target = array![[0., 0.], [0., 2.]];
        let err = rmse(&pred, &target).unwrap();
        assert_abs_diff_eq!(err, array![5f64.sqrt(), 2f64.sqrt()], epsilon = 1e-15);
    }

    #[test]
    fn test_rmse_invalid_inputs() {
        assert!(rmse(&array![1., 2.], &array![1.]).is_err());
        assert!(rmse(&Array1::<f64>::zeros(0), &Array1::zeros(0)).is_err());
    }

    fn log_first_step<S: MetricsSink>(mut sink: S) {
        sink.log_scalar(TRAIN_LOSS, 1.5, 1).unwrap();
        sink.log_scalar(TEST_RMSE, 0.5, 1).unwrap();
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemorySink::new();
        log_first_step(&mut sink);
        sink.log_scalar(TRAIN_LOSS, 1.2, 2).unwrap();
        assert_eq!(sink.records().len(), 3);
        assert_eq!(sink.values(TRAIN_LOSS), vec![1.5, 1.2]);
        assert_eq!(sink.steps(TRAIN_LOSS), vec![1, 2]);
        assert_eq!(sink.values(TEST_RMSE), vec![0.5]);
    }
}
