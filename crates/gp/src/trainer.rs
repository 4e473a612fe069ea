use crate::algorithm::ExactGp;
use crate::device::DataSplit;
use crate::errors::{GpError, Result};
use crate::kernels::Kernel;
use crate::metrics::{rmse, MetricsSink, TEST_RMSE, TRAIN_LOSS};
use crate::mll::ExactMarginalLogLikelihood;
use crate::optimization::Adam;

use linfa::Float;
use log::{debug, info};
use ndarray::Array1;
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of training epochs
pub const DEFAULT_EPOCHS: usize = 100;
/// Default Adam learning rate
pub const DEFAULT_LR: f64 = 0.1;

/// Phase of a training epoch
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum Phase {
    /// Loss evaluation and optimizer step on training data
    Training,
    /// Prediction error evaluation on test data
    Evaluating,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Phase::Training => write!(f, "training"),
            Phase::Evaluating => write!(f, "evaluating"),
        }
    }
}

/// Values recorded along the training loop
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct TrainingHistory<F: Float> {
    /// Training loss of each epoch, evaluated before the optimizer step
    pub losses: Vec<F>,
    /// Test RMSE of each epoch, evaluated after the optimizer step
    pub rmses: Vec<F>,
    /// Raw model parameters at the end of training
    pub raw_parameters: Array1<F>,
}

impl<F: Float> TrainingHistory<F> {
    /// Number of completed epochs
    pub fn epochs(&self) -> usize {
        self.losses.len()
    }

    /// Loss of the last epoch
    pub fn final_loss(&self) -> Option<F> {
        self.losses.last().copied()
    }

    /// Test RMSE of the last epoch
    pub fn final_rmse(&self) -> Option<F> {
        self.rmses.last().copied()
    }
}

/// Exact GP hyperparameters training loop.
///
/// Each epoch runs two phases:
/// 1. [Phase::Training]: the negated marginal log likelihood of training data
///    and its gradient are computed and model parameters are updated with one
///    Adam step, the loss is recorded as `train/loss`,
/// 2. [Phase::Evaluating]: the predictive mean at test inputs is computed and
///    the RMSE wrt test targets is recorded as `test/rmse`.
///
/// Values of epoch `i` are recorded at step `i + 1`. Training runs all epochs
/// and stops at the first error which is reported as [GpError::EpochError]
/// with that same step.
#[derive(Clone, Debug, PartialEq)]
pub struct Trainer<F: Float> {
    epochs: usize,
    lr: F,
    log_every: Option<usize>,
}

impl<F: Float> Default for Trainer<F> {
    fn default() -> Self {
        Trainer {
            epochs: DEFAULT_EPOCHS,
            lr: F::cast(DEFAULT_LR),
            log_every: None,
        }
    }
}

impl<F: Float> Trainer<F> {
    /// Constructor
    pub fn new(epochs: usize, lr: F) -> Self {
        Trainer {
            epochs,
            lr,
            log_every: None,
        }
    }

    /// Log progress at info level every `n` epochs (`0` disables it)
    pub fn log_every(mut self, n: usize) -> Self {
        self.log_every = if n == 0 { None } else { Some(n) };
        self
    }

    /// Number of epochs
    pub fn epochs(&self) -> usize {
        self.epochs
    }

    /// Learning rate
    pub fn lr(&self) -> F {
        self.lr
    }

    /// Train `model` hyperparameters on its training data, reporting losses and
    /// test RMSE to `sink`.
    pub fn fit<K: Kernel<F>, S: MetricsSink>(
        &self,
        model: &mut ExactGp<F, K>,
        test: &DataSplit<F>,
        mut sink: S,
    ) -> Result<TrainingHistory<F>> {
        model.device().check_same(test.device(), "test data")?;
        if test.ndims() != model.dims() {
            return Err(GpError::InvalidInputError(format!(
                "Test data has {} dimensions while training data has {}",
                test.ndims(),
                model.dims()
            )));
        }
        let mll = ExactMarginalLogLikelihood::new();
        let mut optimizer = Adam::new(self.lr)?;
        let mut params = model.raw_parameters();
        let mut losses = Vec::with_capacity(self.epochs);
        let mut rmses = Vec::with_capacity(self.epochs);

        info!(
            "Training {} hyperparameters for {} epochs (lr={})",
            model.n_params(),
            self.epochs,
            self.lr
        );
        for epoch in 0..self.epochs {
            let step = epoch + 1;

            let loss = self
                .train_step(model, &mll, &mut optimizer, &mut params, &mut sink, step)
                .map_err(|err| epoch_error(step, Phase::Training, err))?;
            let rmse = self
                .eval_step(model, test, &mut sink, step)
                .map_err(|err| epoch_error(step, Phase::Evaluating, err))?;

            debug!("Epoch {step}/{}: loss={loss} rmse={rmse}", self.epochs);
            if self.log_every.is_some_and(|n| step % n == 0) {
                info!("Epoch {step}/{}: loss={loss} rmse={rmse}", self.epochs);
            }
            losses.push(loss);
            rmses.push(rmse);
        }
        info!("Training done: {}", model);

        Ok(TrainingHistory {
            losses,
            rmses,
            raw_parameters: params,
        })
    }

    fn train_step<K: Kernel<F>>(
        &self,
        model: &mut ExactGp<F, K>,
        mll: &ExactMarginalLogLikelihood,
        optimizer: &mut Adam<F>,
        params: &mut Array1<F>,
        sink: &mut impl MetricsSink,
        step: usize,
    ) -> Result<F> {
        let (loss, grad) = mll.loss_and_grad(model)?;
        optimizer.step(params, &grad)?;
        model.set_raw_parameters(&*params)?;
        sink.log_scalar(TRAIN_LOSS, to_f64(loss), step)?;
        Ok(loss)
    }

    fn eval_step<K: Kernel<F>>(
        &self,
        model: &ExactGp<F, K>,
        test: &DataSplit<F>,
        sink: &mut impl MetricsSink,
        step: usize,
    ) -> Result<F> {
        let (mean, _) = model.predict_split(test)?;
        let rmse = rmse(&mean, test.y())?[()];
        sink.log_scalar(TEST_RMSE, to_f64(rmse), step)?;
        Ok(rmse)
    }
}

fn epoch_error(epoch: usize, phase: Phase, err: GpError) -> GpError {
    GpError::EpochError {
        epoch,
        phase,
        source: Box::new(err),
    }
}

fn to_f64<F: Float>(value: F) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}
