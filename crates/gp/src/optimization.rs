use crate::errors::{GpError, Result};

use linfa::Float;
use ndarray::{Array1, ArrayBase, Data, Ix1, Zip};

/// Default exponential decay rate of the first moment estimates
pub const ADAM_BETA1: f64 = 0.9;
/// Default exponential decay rate of the second moment estimates
pub const ADAM_BETA2: f64 = 0.999;
/// Default term added to the denominator of parameter updates
pub const ADAM_EPSILON: f64 = 1e-8;

/// Adam optimizer (Kingma and Ba, 2015) with bias corrected moment estimates
/// and a fixed learning rate.
#[derive(Clone, Debug, PartialEq)]
pub struct Adam<F: Float> {
    lr: F,
    beta1: F,
    beta2: F,
    epsilon: F,
    step: usize,
    m: Array1<F>,
    v: Array1<F>,
}

impl<F: Float> Adam<F> {
    /// Adam with default decay rates and the given learning rate, which has to be
    /// finite and non negative.
    pub fn new(lr: F) -> Result<Self> {
        if !lr.is_finite() || lr < F::zero() {
            return Err(GpError::InvalidValueError(format!(
                "Learning rate should be a non negative number, got {lr}"
            )));
        }
        Ok(Adam {
            lr,
            beta1: F::cast(ADAM_BETA1),
            beta2: F::cast(ADAM_BETA2),
            epsilon: F::cast(ADAM_EPSILON),
            step: 0,
            m: Array1::zeros(0),
            v: Array1::zeros(0),
        })
    }

    /// Learning rate
    pub fn lr(&self) -> F {
        self.lr
    }

    /// Number of steps done
    pub fn steps(&self) -> usize {
        self.step
    }

    /// Update `params` in place given the loss gradient `grad` at `params`
    pub fn step(
        &mut self,
        params: &mut Array1<F>,
        grad: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Result<()> {
        if params.len() != grad.len() {
            return Err(GpError::InvalidInputError(format!(
                "{} parameters for a gradient of length {}",
                params.len(),
                grad.len()
            )));
        }
        if self.step == 0 {
            self.m = Array1::zeros(params.len());
            self.v = Array1::zeros(params.len());
        } else if self.m.len() != params.len() {
            return Err(GpError::InvalidInputError(format!(
                "Optimizer state has {} parameters, got {}",
                self.m.len(),
                params.len()
            )));
        }
        self.step += 1;

        let (beta1, beta2) = (self.beta1, self.beta2);
        Zip::from(&mut self.m)
            .and(&mut self.v)
            .and(grad)
            .for_each(|m, v, &g| {
                *m = beta1 * *m + (F::one() - beta1) * g;
                *v = beta2 * *v + (F::one() - beta2) * g * g;
            });
        if self.lr == F::zero() {
            return Ok(());
        }

        let t = self.step as i32;
        let bias_correction1 = F::one() - beta1.powi(t);
        let bias_correction2_sqrt = (F::one() - beta2.powi(t)).sqrt();
        let step_size = self.lr / bias_correction1;
        let epsilon = self.epsilon;
        Zip::from(params)
            .and(&self.m)
            .and(&self.v)
            .for_each(|p, &m, &v| {
                *p -= step_size * m / (v.sqrt() / bias_correction2_sqrt + epsilon);
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_first_step_moves_by_lr() {
        // bias corrected first step is lr * sign(g)
        let mut adam = Adam::new(0.1).unwrap();
        let mut p = array![1., -2., 3.];
        adam.step(&mut p, &array![0.5, -4., 1e-3]).unwrap();
        assert_abs_diff_eq!(p, array![0.9, -1.9, 2.9], epsilon = 1e-5);
        assert_eq!(adam.steps(), 1);
    }

    #[test]
    fn test_zero_lr_is_noop() {
        let mut adam = Adam::new(0.).unwrap();
        let p0 = array![0.3, -0.0, 12.];
        let mut p = p0.clone();
        for _ in 0..3 {
            adam.step(&mut p, &array![1., -1., 0.5]).unwrap();
        }
        assert_eq!(
            p.mapv(f64::to_bits),
            p0.mapv(f64::to_bits)
        );
    }

    #[test]
    fn test_minimizes_quadratic() {
        let mut adam = Adam::new(0.05).unwrap();
        let target = array![1., -3.];
        let mut p = array![0., 0.];
        for _ in 0..2000 {
            let grad = (&p - &target) * 2.;
            adam.step(&mut p, &grad).unwrap();
        }
        assert_abs_diff_eq!(p, target, epsilon = 1e-2);
    }

    #[test]
    fn test_invalid_settings() {
        assert!(Adam::new(-0.1).is_err());
        assert!(Adam::new(f64::NAN).is_err());
        let mut adam = Adam::new(0.1).unwrap();
        assert!(adam.step(&mut array![1., 2.], &array![1.]).is_err());
        adam.step(&mut array![1., 2.], &array![1., 1.]).unwrap();
        assert!(adam.step(&mut array![1.], &array![1.]).is_err());
    }
}
