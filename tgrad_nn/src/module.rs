//! The module abstraction and sequential composition.

use tgrad_tensor::prelude::*;

use crate::activations::{Sigmoid, Softmax, Tanh};
use crate::layers::Linear;

/// A network building block: something that maps a tensor to a tensor
/// and may own trainable parameters.
pub trait Module<E: FloatElement> {
    fn forward(&self, input: &Tensor<E>) -> Result<Tensor<E>>;

    /// Trainable parameters in a stable order. Parameterless modules
    /// return nothing.
    fn parameters(&self) -> Vec<Tensor<E>> {
        Vec::new()
    }
}

/// The closed set of layers a [`Sequential`] can hold.
#[derive(Debug)]
pub enum Layer<E: FloatElement> {
    Linear(Linear<E>),
    Sigmoid(Sigmoid),
    Tanh(Tanh),
    Softmax(Softmax),
}

impl<E: FloatElement> Module<E> for Layer<E> {
    fn forward(&self, input: &Tensor<E>) -> Result<Tensor<E>> {
        match self {
            Layer::Linear(layer) => layer.forward(input),
            Layer::Sigmoid(act) => Module::<E>::forward(act, input),
            Layer::Tanh(act) => Module::<E>::forward(act, input),
            Layer::Softmax(act) => Module::<E>::forward(act, input),
        }
    }

    fn parameters(&self) -> Vec<Tensor<E>> {
        match self {
            Layer::Linear(layer) => layer.parameters(),
            _ => Vec::new(),
        }
    }
}

impl<E: FloatElement> From<Linear<E>> for Layer<E> {
    fn from(layer: Linear<E>) -> Self {
        Layer::Linear(layer)
    }
}

impl<E: FloatElement> From<Sigmoid> for Layer<E> {
    fn from(act: Sigmoid) -> Self {
        Layer::Sigmoid(act)
    }
}

impl<E: FloatElement> From<Tanh> for Layer<E> {
    fn from(act: Tanh) -> Self {
        Layer::Tanh(act)
    }
}

impl<E: FloatElement> From<Softmax> for Layer<E> {
    fn from(act: Softmax) -> Self {
        Layer::Softmax(act)
    }
}

/// Runs layers in order, feeding each output into the next layer.
#[derive(Debug, Default)]
pub struct Sequential<E: FloatElement> {
    layers: Vec<Layer<E>>,
}

impl<E: FloatElement> Sequential<E> {
    pub fn new(layers: Vec<Layer<E>>) -> Self {
        Sequential { layers }
    }

    pub fn push(&mut self, layer: impl Into<Layer<E>>) {
        self.layers.push(layer.into());
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[Layer<E>] {
        &self.layers
    }
}

impl<E: FloatElement> Module<E> for Sequential<E> {
    fn forward(&self, input: &Tensor<E>) -> Result<Tensor<E>> {
        let mut current = input.clone();
        for layer in &self.layers {
            current = layer.forward(&current)?;
        }
        Ok(current)
    }

    fn parameters(&self) -> Vec<Tensor<E>> {
        self.layers.iter().flat_map(|layer| layer.parameters()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sequential_is_the_identity() {
        let model = Sequential::<f64>::default();
        let x = Tensor::new(vec![1.0, 2.0], vec![1, 2], false).unwrap();
        let y = model.forward(&x).unwrap();
        assert_eq!(y.to_vec(), vec![1.0, 2.0]);
        assert!(model.parameters().is_empty());
    }

    #[test]
    fn sequential_threads_layers_in_order() {
        let mut model = Sequential::new(vec![]);
        model.push(Linear::from_parameters(
            Tensor::new(vec![2.0, 0.0, 0.0, 2.0], vec![2, 2], false).unwrap(),
            Tensor::new(vec![1.0, 1.0], vec![2], false).unwrap(),
        )
        .unwrap());
        model.push(Sigmoid::new());
        assert_eq!(model.len(), 2);

        let x = Tensor::new(vec![0.0, 0.0], vec![1, 2], false).unwrap();
        let y = model.forward(&x).unwrap();
        // linear maps to [1, 1], sigmoid squashes
        let expected = 1.0 / (1.0 + (-1.0f64).exp());
        assert!((y.to_vec()[0] - expected).abs() < 1e-12);
        assert!((y.to_vec()[1] - expected).abs() < 1e-12);
    }

    #[test]
    fn parameters_come_back_in_layer_order() {
        let mut model: Sequential<f64> = Sequential::default();
        model.push(Linear::new(3, 4).unwrap());
        model.push(Tanh::new());
        model.push(Linear::new(4, 2).unwrap());
        let params = model.parameters();
        assert_eq!(params.len(), 4);
        assert_eq!(params[0].shape().dims(), &[4, 3]);
        assert_eq!(params[1].shape().dims(), &[4]);
        assert_eq!(params[2].shape().dims(), &[2, 4]);
        assert_eq!(params[3].shape().dims(), &[2]);
        assert!(params.iter().all(|p| p.requires_grad()));
    }
}
