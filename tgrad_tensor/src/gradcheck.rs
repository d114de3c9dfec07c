//! Centered finite-difference gradient estimation.
//!
//! Used by the test suite to validate analytic gradients against a
//! numerical reference, and exported because downstream layers want the
//! same check for their own compositions.

use crate::dtype::{Element, FloatElement};
use crate::error::Result;
use crate::node::Tensor;

/// Estimates the gradient of `f` with respect to every element of every
/// input, via `(f(x + eps) - f(x - eps)) / (2 * eps)`.
///
/// `f` receives fresh leaf tensors on every evaluation and must return a
/// size-1 tensor. The outer vector follows the input order, the inner
/// vector is the flattened gradient for that input.
pub fn finite_diff_grad<E, F>(f: F, inputs: &[Tensor<E>], eps: f64) -> Result<Vec<Vec<f64>>>
where
    E: FloatElement,
    F: Fn(&[Tensor<E>]) -> Result<Tensor<E>>,
{
    let mut grads = Vec::with_capacity(inputs.len());
    for (which, input) in inputs.iter().enumerate() {
        let len = input.size();
        let mut grad = Vec::with_capacity(len);
        for elem in 0..len {
            let eval = |delta: f64| -> Result<f64> {
                let probes = inputs
                    .iter()
                    .enumerate()
                    .map(|(i, t)| {
                        let mut data = t.to_vec();
                        if i == which {
                            data[elem] = data[elem] + E::from_f64_trunc(delta);
                        }
                        Tensor::new(data, t.shape().clone(), false)
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(f(&probes)?.item()?.as_f64())
            };
            grad.push((eval(eps)? - eval(-eps)?) / (2.0 * eps));
        }
        grads.push(grad);
    }
    Ok(grads)
}
