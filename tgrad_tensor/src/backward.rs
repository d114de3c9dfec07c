//! Reverse-mode gradient computation over the tensor graph.
//!
//! The pass walks the graph in reverse topological order, accumulating
//! adjoints keyed by node id. Local gradients are computed per operation;
//! contributions to broadcast operands are folded back to the operand's
//! shape before they accumulate, so a parameter always receives a
//! gradient of its own shape.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use crate::dtype::FloatElement;
use crate::error::{Error, Result};
use crate::node::{NodeId, Op, Tensor};
use crate::shape::Shape;
use crate::storage::Storage;

pub(crate) fn run_backward<E: FloatElement>(root: &Tensor<E>) -> Result<()> {
    if root.size() != 1 {
        return Err(Error::Shape(format!(
            "backward requires a scalar output, got shape {}",
            root.shape()
        )));
    }
    if root.is_freed() {
        return Err(Error::Backward(
            "this graph was already consumed by backward; run a new forward pass".into(),
        ));
    }
    if !root.requires_grad() {
        return Err(Error::Backward(
            "backward called on a tensor that does not require gradients".into(),
        ));
    }

    let order = topological_order(root);
    log::debug!("backward pass over {} nodes", order.len());

    let mut adjoints: HashMap<NodeId, Storage<E>> = HashMap::new();
    adjoints.insert(root.id(), Storage::ones(root.shape().clone())?);

    for tensor in order.iter().rev() {
        let adjoint = match adjoints.get(&tensor.id()) {
            Some(a) => a.clone(),
            None => continue,
        };
        let parents = tensor.parents();
        if parents.is_empty() {
            continue;
        }
        let contributions = local_gradients(tensor, &adjoint, &parents)?;
        for (parent, contribution) in parents.iter().zip(contributions) {
            let Some(contribution) = contribution else {
                continue;
            };
            let folded = contribution.sum_to(parent.shape())?;
            match adjoints.entry(parent.id()) {
                Entry::Occupied(mut slot) => slot.get_mut().accumulate(&folded),
                Entry::Vacant(slot) => {
                    slot.insert(folded);
                }
            }
        }
    }

    for tensor in &order {
        if tensor.requires_grad() {
            if let Some(adjoint) = adjoints.get(&tensor.id()) {
                tensor.accumulate_grad(adjoint);
            }
        }
    }

    // the graph is one-shot: drop interior edges so intermediates free up
    for tensor in &order {
        if !tensor.is_leaf() {
            tensor.release();
        }
    }
    Ok(())
}

/// Parents-before-children ordering via depth-first traversal.
fn topological_order<E: FloatElement>(root: &Tensor<E>) -> Vec<Tensor<E>> {
    fn visit<E: FloatElement>(
        tensor: &Tensor<E>,
        seen: &mut HashSet<NodeId>,
        order: &mut Vec<Tensor<E>>,
    ) {
        if !seen.insert(tensor.id()) {
            return;
        }
        for parent in tensor.parents() {
            visit(&parent, seen, order);
        }
        order.push(tensor.clone());
    }

    let mut seen = HashSet::new();
    let mut order = Vec::new();
    visit(root, &mut seen, &mut order);
    order
}

/// Per-parent gradient contributions at the output's shape. `None` marks
/// a parent that tracks no gradients, so the work is skipped entirely.
fn local_gradients<E: FloatElement>(
    tensor: &Tensor<E>,
    upstream: &Storage<E>,
    parents: &[Tensor<E>],
) -> Result<Vec<Option<Storage<E>>>> {
    let wants = |i: usize| parents[i].requires_grad();

    match tensor.op() {
        Op::Leaf => Ok(Vec::new()),

        Op::Add => Ok(vec![
            wants(0).then(|| upstream.clone()),
            wants(1).then(|| upstream.clone()),
        ]),

        Op::Sub => Ok(vec![
            wants(0).then(|| upstream.clone()),
            wants(1).then(|| upstream.map(|v| -v)),
        ]),

        Op::Mul => {
            let a = parents[0].value();
            let b = parents[1].value();
            let ga = if wants(0) {
                Some(upstream.mul(&b)?)
            } else {
                None
            };
            let gb = if wants(1) {
                Some(upstream.mul(&a)?)
            } else {
                None
            };
            Ok(vec![ga, gb])
        }

        Op::Div => {
            // the forward pass guarantees b has no zeros
            let a = parents[0].value();
            let b = parents[1].value();
            let ga = if wants(0) {
                Some(upstream.zip(&b, |g, bv| g / bv)?)
            } else {
                None
            };
            let gb = if wants(1) {
                let ratio = a.zip(&b, |av, bv| -(av / (bv * bv)))?;
                Some(upstream.mul(&ratio)?)
            } else {
                None
            };
            Ok(vec![ga, gb])
        }

        Op::AddScalar(_) | Op::SubScalar(_) => Ok(vec![wants(0).then(|| upstream.clone())]),

        Op::RsubScalar(_) => Ok(vec![wants(0).then(|| upstream.map(|v| -v))]),

        Op::MulScalar(s) => {
            let s = *s;
            Ok(vec![wants(0).then(|| upstream.map(|v| v * s))])
        }

        Op::DivScalar(s) => {
            let s = *s;
            Ok(vec![wants(0).then(|| upstream.map(|v| v / s))])
        }

        Op::RdivScalar(s) => {
            let s = *s;
            let x = parents[0].value();
            let g = if wants(0) {
                Some(upstream.zip(&x, |g, xv| -(s / (xv * xv)) * g)?)
            } else {
                None
            };
            Ok(vec![g])
        }

        Op::MatMul => {
            let a = parents[0].value();
            let b = parents[1].value();
            let ga = if wants(0) {
                Some(upstream.matmul(&b.transpose2d()?)?)
            } else {
                None
            };
            let gb = if wants(1) {
                Some(a.transpose2d()?.matmul(upstream)?)
            } else {
                None
            };
            Ok(vec![ga, gb])
        }

        Op::Transpose => Ok(vec![if wants(0) {
            Some(upstream.transpose2d()?)
        } else {
            None
        }]),

        Op::Neg => Ok(vec![wants(0).then(|| upstream.map(|v| -v))]),

        Op::Abs => {
            let x = parents[0].value();
            let g = if wants(0) {
                // subgradient zero at the kink
                Some(upstream.zip(&x, |g, v| {
                    if v.is_zero() {
                        E::zero()
                    } else {
                        g * num_traits::Signed::signum(&v)
                    }
                })?)
            } else {
                None
            };
            Ok(vec![g])
        }

        Op::Relu => {
            let x = parents[0].value();
            let g = if wants(0) {
                Some(upstream.zip(&x, |g, v| if v > E::zero() { g } else { E::zero() })?)
            } else {
                None
            };
            Ok(vec![g])
        }

        Op::Pow(exponent) => {
            let k = *exponent;
            let x = parents[0].value();
            let g = if wants(0) {
                Some(upstream.zip(&x, |g, v| {
                    g * k * num_traits::Float::powf(v, k - E::one())
                })?)
            } else {
                None
            };
            Ok(vec![g])
        }

        Op::Sqrt => {
            let y = tensor.value();
            let half = E::from_f64_trunc(0.5);
            let g = if wants(0) {
                Some(upstream.zip(&y, |g, yv| g * (half / yv))?)
            } else {
                None
            };
            Ok(vec![g])
        }

        Op::Log => {
            let x = parents[0].value();
            let g = if wants(0) {
                Some(upstream.zip(&x, |g, v| g / v)?)
            } else {
                None
            };
            Ok(vec![g])
        }

        Op::Exp => {
            let y = tensor.value();
            let g = if wants(0) { Some(upstream.mul(&y)?) } else { None };
            Ok(vec![g])
        }

        Op::Sin => {
            let x = parents[0].value();
            let g = if wants(0) {
                Some(upstream.zip(&x, |g, v| g * num_traits::Float::cos(v))?)
            } else {
                None
            };
            Ok(vec![g])
        }

        Op::Cos => {
            let x = parents[0].value();
            let g = if wants(0) {
                Some(upstream.zip(&x, |g, v| -(g * num_traits::Float::sin(v)))?)
            } else {
                None
            };
            Ok(vec![g])
        }

        Op::Tan => {
            // d tan/dx = 1 + tan^2, recovered from the output
            let y = tensor.value();
            let g = if wants(0) {
                Some(upstream.zip(&y, |g, yv| g * (E::one() + yv * yv))?)
            } else {
                None
            };
            Ok(vec![g])
        }

        Op::Sigmoid => {
            let y = tensor.value();
            let g = if wants(0) {
                Some(upstream.zip(&y, |g, yv| g * yv * (E::one() - yv))?)
            } else {
                None
            };
            Ok(vec![g])
        }

        Op::Tanh => {
            let y = tensor.value();
            let g = if wants(0) {
                Some(upstream.zip(&y, |g, yv| g * (E::one() - yv * yv))?)
            } else {
                None
            };
            Ok(vec![g])
        }

        Op::Softmax { axis } => {
            // dx = y * (g - sum(g * y, axis))
            let axis = *axis;
            let g = if wants(0) {
                let y = tensor.value();
                let gy = upstream.mul(&y)?;
                let lane_sums = gy.sum_axes(Some(&[axis]), true)?;
                let spread = lane_sums.broadcast_to(y.shape())?;
                let centered = upstream.sub(&spread)?;
                Some(centered.mul(&y)?)
            } else {
                None
            };
            Ok(vec![g])
        }

        Op::Sum { axes, keepdims } => {
            let g = if wants(0) {
                Some(expand_adjoint(
                    upstream,
                    parents[0].shape(),
                    axes.as_deref(),
                    *keepdims,
                )?)
            } else {
                None
            };
            Ok(vec![g])
        }

        Op::Mean { axes, keepdims } => {
            let g = if wants(0) {
                let input = parents[0].shape();
                let count = E::from_f64_trunc(input.reduced_count(axes.as_deref()) as f64);
                let expanded = expand_adjoint(upstream, input, axes.as_deref(), *keepdims)?;
                Some(expanded.map(|v| v / count))
            } else {
                None
            };
            Ok(vec![g])
        }
    }
}

/// Stretches a reduction's adjoint back over the reduced input shape.
fn expand_adjoint<E: FloatElement>(
    upstream: &Storage<E>,
    input: &Shape,
    axes: Option<&[usize]>,
    keepdims: bool,
) -> Result<Storage<E>> {
    if keepdims {
        return upstream.broadcast_to(input);
    }
    match axes {
        // a full reduction is shape [1], which broadcasts anywhere
        None => upstream.broadcast_to(input),
        Some(axes) => {
            let mut dims = input.dims().to_vec();
            for &a in axes {
                dims[a] = 1;
            }
            upstream.reshape(&Shape::new(dims))?.broadcast_to(input)
        }
    }
}
