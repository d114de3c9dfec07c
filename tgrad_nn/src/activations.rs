//! Standalone activation modules.
//!
//! These are thin parameterless wrappers over the tensor ops, so they
//! can sit inside a [`crate::module::Sequential`] next to layers that
//! do own parameters.

use tgrad_tensor::prelude::*;

use crate::module::Module;

/// Elementwise logistic sigmoid, `1 / (1 + e^-x)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sigmoid;

impl Sigmoid {
    pub fn new() -> Self {
        Sigmoid
    }
}

impl<E: FloatElement> Module<E> for Sigmoid {
    fn forward(&self, input: &Tensor<E>) -> Result<Tensor<E>> {
        Ok(input.sigmoid())
    }
}

/// Elementwise hyperbolic tangent.
#[derive(Debug, Default, Clone, Copy)]
pub struct Tanh;

impl Tanh {
    pub fn new() -> Self {
        Tanh
    }
}

impl<E: FloatElement> Module<E> for Tanh {
    fn forward(&self, input: &Tensor<E>) -> Result<Tensor<E>> {
        Ok(input.tanh())
    }
}

/// Softmax along one axis. Defaults to the last axis, which normalizes
/// each row of a `[batch, classes]` tensor into a distribution.
#[derive(Debug, Clone, Copy)]
pub struct Softmax {
    axis: isize,
}

impl Softmax {
    pub fn new() -> Self {
        Softmax { axis: -1 }
    }

    pub fn along(axis: isize) -> Self {
        Softmax { axis }
    }

    pub fn axis(&self) -> isize {
        self.axis
    }
}

impl Default for Softmax {
    fn default() -> Self {
        Softmax::new()
    }
}

impl<E: FloatElement> Module<E> for Softmax {
    fn forward(&self, input: &Tensor<E>) -> Result<Tensor<E>> {
        input.softmax(self.axis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sigmoid_squashes_into_the_unit_interval() {
        let x = Tensor::new(vec![-100.0f64, 0.0, 100.0], vec![3], false).unwrap();
        let y = Module::<f64>::forward(&Sigmoid::new(), &x).unwrap();
        let v = y.to_vec();
        assert!(v[0] < 1e-12);
        assert_relative_eq!(v[1], 0.5, epsilon = 1e-12);
        assert!(v[2] > 1.0 - 1e-12);
    }

    #[test]
    fn tanh_is_odd_and_bounded() {
        let x = Tensor::new(vec![-2.0f64, 0.0, 2.0], vec![3], false).unwrap();
        let y = Module::<f64>::forward(&Tanh::new(), &x).unwrap();
        let v = y.to_vec();
        assert_relative_eq!(v[0], -v[2], epsilon = 1e-12);
        assert_relative_eq!(v[1], 0.0, epsilon = 1e-12);
        assert!(v.iter().all(|&t| t.abs() < 1.0));
    }

    #[test]
    fn softmax_rows_are_distributions_even_for_large_logits() {
        let x = Tensor::new(
            vec![1.0f64, 2.0, 3.0, 500.0, 501.0, 502.0],
            vec![2, 3],
            false,
        )
        .unwrap();
        let y = Module::<f64>::forward(&Softmax::new(), &x).unwrap();
        let v = y.to_vec();
        for row in 0..2 {
            let sum: f64 = v[row * 3..(row + 1) * 3].iter().sum();
            assert_relative_eq!(sum, 1.0, epsilon = 1e-12);
        }
        // the shifted rows produce identical distributions
        for i in 0..3 {
            assert_relative_eq!(v[i], v[3 + i], epsilon = 1e-12);
        }
        assert!(v.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn softmax_axis_is_configurable() {
        let x = Tensor::new(vec![1.0f64, 2.0, 3.0, 4.0], vec![2, 2], false).unwrap();
        let cols = Module::<f64>::forward(&Softmax::along(0), &x).unwrap();
        let v = cols.to_vec();
        assert_relative_eq!(v[0] + v[2], 1.0, epsilon = 1e-12);
        assert_relative_eq!(v[1] + v[3], 1.0, epsilon = 1e-12);

        let bad = Module::<f64>::forward(&Softmax::along(5), &x);
        assert!(bad.is_err());
    }
}
