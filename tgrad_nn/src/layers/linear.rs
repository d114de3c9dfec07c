//! Fully connected layer with optional fused activation.

use std::str::FromStr;

use log::debug;
use rand_distr::{Distribution, Normal};
use tgrad_tensor::prelude::*;

use crate::module::Module;

/// Activation fused into a [`Linear`] layer's forward pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Tanh,
    Relu,
}

impl FromStr for Activation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tanh" => Ok(Activation::Tanh),
            "relu" => Ok(Activation::Relu),
            other => Err(Error::Config(format!("unknown activation '{other}'"))),
        }
    }
}

/// `y = x W^T + b` over a batch of row vectors.
///
/// The weight is stored as `[out_features, in_features]` and the bias as
/// `[out_features]`, broadcast across the batch.
#[derive(Debug)]
pub struct Linear<E: FloatElement> {
    weight: Tensor<E>,
    bias: Tensor<E>,
    activation: Option<Activation>,
}

impl<E: FloatElement> Linear<E> {
    /// He-normal initialized layer: weights drawn from a zero-mean
    /// normal with variance `2 / in_features`, bias zeroed.
    pub fn new(in_features: usize, out_features: usize) -> Result<Self> {
        Self::init(in_features, out_features, None)
    }

    pub fn with_activation(
        in_features: usize,
        out_features: usize,
        activation: Activation,
    ) -> Result<Self> {
        Self::init(in_features, out_features, Some(activation))
    }

    fn init(
        in_features: usize,
        out_features: usize,
        activation: Option<Activation>,
    ) -> Result<Self> {
        if in_features == 0 || out_features == 0 {
            return Err(Error::Shape("dimension must be positive".into()));
        }
        let std_dev = (2.0 / in_features as f64).sqrt();
        let normal = Normal::new(0.0, std_dev)
            .map_err(|e| Error::Config(format!("weight initialization: {e}")))?;
        let mut rng = rand::thread_rng();
        let weight_data: Vec<E> = (0..out_features * in_features)
            .map(|_| E::from_f64_trunc(normal.sample(&mut rng)))
            .collect();
        let weight = Tensor::new(weight_data, vec![out_features, in_features], true)?;
        let bias = Tensor::zeros(vec![out_features])?;
        bias.set_requires_grad(true)?;
        debug!("initialized Linear({in_features}, {out_features}), activation {activation:?}");
        Ok(Linear {
            weight,
            bias,
            activation,
        })
    }

    /// Builds a layer around existing parameters, marking both as
    /// trainable. The weight must be `[out_features, in_features]` and
    /// the bias `[out_features]`.
    pub fn from_parameters(weight: Tensor<E>, bias: Tensor<E>) -> Result<Self> {
        if weight.rank() != 2 {
            return Err(Error::Shape(
                "weight must be 2-D, [out_features, in_features]".into(),
            ));
        }
        if bias.rank() != 1 || bias.shape().dim(0) != weight.shape().dim(0) {
            return Err(Error::ShapeMismatch {
                expected: vec![weight.shape().dim(0)],
                got: bias.shape().dims().to_vec(),
            });
        }
        weight.set_requires_grad(true)?;
        bias.set_requires_grad(true)?;
        Ok(Linear {
            weight,
            bias,
            activation: None,
        })
    }

    pub fn in_features(&self) -> usize {
        self.weight.shape().dim(1)
    }

    pub fn out_features(&self) -> usize {
        self.weight.shape().dim(0)
    }

    pub fn weight(&self) -> &Tensor<E> {
        &self.weight
    }

    pub fn bias(&self) -> &Tensor<E> {
        &self.bias
    }

    pub fn activation(&self) -> Option<Activation> {
        self.activation
    }

    pub fn forward(&self, input: &Tensor<E>) -> Result<Tensor<E>> {
        if input.rank() != 2 || input.shape().dim(1) != self.in_features() {
            return Err(Error::Shape(format!(
                "linear layer expects input of shape [batch, {}], got {}",
                self.in_features(),
                input.shape()
            )));
        }
        let pre = input.matmul(&self.weight.t()?)?.add(&self.bias)?;
        Ok(match self.activation {
            Some(Activation::Tanh) => pre.tanh(),
            Some(Activation::Relu) => pre.relu(),
            None => pre,
        })
    }
}

impl<E: FloatElement> Module<E> for Linear<E> {
    fn forward(&self, input: &Tensor<E>) -> Result<Tensor<E>> {
        Linear::forward(self, input)
    }

    fn parameters(&self) -> Vec<Tensor<E>> {
        vec![self.weight.clone(), self.bias.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_matches_a_hand_computed_affine_map() {
        // weight [2, 3], bias [2]
        let layer = Linear::from_parameters(
            Tensor::new(vec![1.0f64, 0.0, -1.0, 2.0, 1.0, 0.0], vec![2, 3], false).unwrap(),
            Tensor::new(vec![0.5f64, -0.5], vec![2], false).unwrap(),
        )
        .unwrap();
        let x = Tensor::new(vec![1.0f64, 2.0, 3.0], vec![1, 3], false).unwrap();
        let y = layer.forward(&x).unwrap();
        assert_eq!(y.shape().dims(), &[1, 2]);
        // row . [1,0,-1] + 0.5 = -1.5, row . [2,1,0] - 0.5 = 3.5
        assert_eq!(y.to_vec(), vec![-1.5, 3.5]);
    }

    #[test]
    fn rejects_mismatched_inputs_and_parameters() {
        let layer = Linear::<f64>::new(3, 2).unwrap();
        let bad = Tensor::new(vec![1.0f64, 2.0], vec![1, 2], false).unwrap();
        assert!(layer.forward(&bad).is_err());
        let not_matrix = Tensor::new(vec![1.0f64, 2.0, 3.0], vec![3], false).unwrap();
        assert!(layer.forward(&not_matrix).is_err());

        assert!(Linear::<f64>::new(0, 2).is_err());
        let w = Tensor::new(vec![1.0f64; 6], vec![2, 3], false).unwrap();
        let b = Tensor::new(vec![1.0f64; 3], vec![3], false).unwrap();
        assert!(Linear::from_parameters(w, b).is_err());
    }

    #[test]
    fn initialization_spread_tracks_fan_in() {
        let layer = Linear::<f64>::new(50, 40).unwrap();
        let w = layer.weight().to_vec();
        let mean: f64 = w.iter().sum::<f64>() / w.len() as f64;
        let var: f64 = w.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / w.len() as f64;
        // He-normal targets variance 2 / fan_in = 0.04
        assert!(mean.abs() < 0.05, "mean {mean} too far from zero");
        assert!(var > 0.01 && var < 0.09, "variance {var} out of range");
        assert!(layer.bias().to_vec().iter().all(|&b| b == 0.0));
        assert!(layer.weight().requires_grad());
        assert!(layer.bias().requires_grad());
    }

    #[test]
    fn fused_activation_applies_after_the_affine_map() {
        let layer = Linear::<f64>::with_activation(2, 2, Activation::Relu).unwrap();
        assert_eq!(layer.activation(), Some(Activation::Relu));
        let x = Tensor::new(vec![1.0f64, -1.0], vec![1, 2], false).unwrap();
        let y = layer.forward(&x).unwrap();
        assert!(y.to_vec().iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn activation_names_parse() {
        assert_eq!("tanh".parse::<Activation>().unwrap(), Activation::Tanh);
        assert_eq!("relu".parse::<Activation>().unwrap(), Activation::Relu);
        assert!(matches!(
            "gelu".parse::<Activation>(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn gradients_flow_into_both_parameters() {
        let layer = Linear::from_parameters(
            Tensor::new(vec![1.0f64, 2.0], vec![1, 2], false).unwrap(),
            Tensor::new(vec![0.0f64], vec![1], false).unwrap(),
        )
        .unwrap();
        let x = Tensor::new(vec![3.0f64, 4.0, 5.0, 6.0], vec![2, 2], false).unwrap();
        let out = layer.forward(&x).unwrap();
        out.sum(None, false).unwrap().backward().unwrap();
        // dW = sum of input rows, db = batch size
        assert_eq!(layer.weight().grad().unwrap().to_vec(), vec![8.0, 10.0]);
        assert_eq!(layer.bias().grad().unwrap().to_vec(), vec![2.0]);
    }
}
