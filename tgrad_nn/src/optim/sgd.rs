//! Plain stochastic gradient descent.

use log::trace;
use tgrad_tensor::prelude::*;

/// Updates parameters in place with `p <- p - lr * grad`.
///
/// Parameters without an accumulated gradient are skipped, so a model
/// with frozen or unused parameters still steps cleanly.
pub struct Sgd<E: FloatElement> {
    params: Vec<Tensor<E>>,
    lr: E,
}

impl<E: FloatElement> Sgd<E> {
    pub fn new(params: Vec<Tensor<E>>, lr: E) -> Self {
        Sgd { params, lr }
    }

    pub fn learning_rate(&self) -> E {
        self.lr
    }

    /// Applies one descent step. Every parameter is validated before any
    /// is written, so an error leaves the model untouched.
    pub fn step(&self) -> Result<()> {
        let mut updates = Vec::with_capacity(self.params.len());
        for (index, param) in self.params.iter().enumerate() {
            if !param.is_leaf() {
                return Err(Error::Backward(format!(
                    "sgd parameter {index} is not a leaf tensor"
                )));
            }
            let grad = match param.grad() {
                Some(g) => g,
                None => {
                    trace!("sgd: parameter {index} has no gradient, skipping");
                    continue;
                }
            };
            // adjoints are folded onto the owner's shape before they land
            // in grad, so the two buffers always have equal length
            let updated: Vec<E> = param
                .to_vec()
                .iter()
                .zip(grad.to_vec())
                .map(|(&p, g)| p - self.lr * g)
                .collect();
            updates.push((index, updated));
        }
        for (index, data) in updates {
            self.params[index].set_data(data)?;
        }
        Ok(())
    }

    /// Clears every parameter's accumulated gradient.
    pub fn zero_grad(&self) {
        for param in &self.params {
            param.zero_grad();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_moves_against_the_gradient() {
        let w = Tensor::new(vec![1.0f64, -2.0], vec![2], true).unwrap();
        // loss = sum(w * c) has gradient c
        let c = Tensor::new(vec![3.0f64, 4.0], vec![2], false).unwrap();
        w.mul(&c).unwrap().sum(None, false).unwrap().backward().unwrap();

        let opt = Sgd::new(vec![w.clone()], 0.1);
        opt.step().unwrap();
        let v = w.to_vec();
        assert!((v[0] - 0.7).abs() < 1e-12);
        assert!((v[1] + 2.4).abs() < 1e-12);
    }

    #[test]
    fn parameters_without_gradients_are_skipped() {
        let w = Tensor::new(vec![1.0f64], vec![1], true).unwrap();
        let opt = Sgd::new(vec![w.clone()], 0.5);
        opt.step().unwrap();
        assert_eq!(w.to_vec(), vec![1.0]);
    }

    #[test]
    fn step_with_a_non_leaf_parameter_mutates_nothing() {
        let w = Tensor::new(vec![1.0f64], vec![1], true).unwrap();
        let y = w.mul_scalar(2.0);
        y.mul_scalar(3.0).sum(None, false).unwrap().backward().unwrap();
        assert!(w.grad().is_some());
        assert!(y.grad().is_some());

        let opt = Sgd::new(vec![w.clone(), y.clone()], 0.1);
        assert!(matches!(opt.step(), Err(Error::Backward(_))));
        assert_eq!(w.to_vec(), vec![1.0]);
        assert_eq!(y.to_vec(), vec![2.0]);
    }

    #[test]
    fn zero_grad_clears_all_parameters() {
        let w = Tensor::new(vec![2.0f64], vec![1], true).unwrap();
        w.mul_scalar(3.0).backward().unwrap();
        assert!(w.grad().is_some());
        let opt = Sgd::new(vec![w.clone()], 0.1);
        opt.zero_grad();
        assert!(w.grad().is_none());
    }

    #[test]
    fn repeated_steps_descend_a_quadratic() {
        // minimize (w - 5)^2
        let w = Tensor::new(vec![0.0f64], vec![1], true).unwrap();
        let opt = Sgd::new(vec![w.clone()], 0.1);
        let mut last = f64::INFINITY;
        for _ in 0..50 {
            opt.zero_grad();
            let diff = w.sub_scalar(5.0);
            let loss = diff.mul(&diff).unwrap().sum(None, false).unwrap();
            let value = loss.item().unwrap();
            assert!(value <= last, "loss increased: {value} > {last}");
            last = value;
            loss.backward().unwrap();
            opt.step().unwrap();
        }
        assert!((w.to_vec()[0] - 5.0).abs() < 1e-3);
    }
}
