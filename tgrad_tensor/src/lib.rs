//! A dense tensor engine with reverse-mode automatic differentiation.
//!
//! Tensors are generic over their element type ([`i32`], [`f32`] or
//! [`f64`]), so mixed-dtype arithmetic is rejected at compile time.
//! Operations on tensors record a computation graph; calling
//! [`Tensor::backward`] on a scalar result walks that graph in reverse
//! and deposits gradients on every tensor marked with `requires_grad`.
//!
//! ```ignore
//! use tgrad_tensor::prelude::*;
//!
//! let x = Tensor::new(vec![1.0f64, 2.0, 3.0], vec![3], true)?;
//! let y = Tensor::new(vec![4.0f64, 5.0, 6.0], vec![3], true)?;
//! let loss = (&x * &y).sum(None, false)?;
//! loss.backward()?;
//!
//! assert_eq!(x.grad().unwrap().to_vec(), vec![4.0, 5.0, 6.0]);
//! assert_eq!(y.grad().unwrap().to_vec(), vec![1.0, 2.0, 3.0]);
//! ```
//!
//! Graphs are single-use: backward tears down the edges it traversed,
//! and each training step is expected to run a fresh forward pass.
//! Everything here is single-threaded; handles are reference-counted
//! with [`std::rc::Rc`] and are not `Send`.

mod backward;
pub mod dtype;
pub mod error;
pub mod gradcheck;
pub mod math;
pub mod node;
pub mod shape;
pub mod storage;

pub use dtype::{DType, Element, FloatElement};
pub use error::{Error, Result};
pub use node::{NodeId, Op, Tensor};
pub use shape::{Shape, Strides};
pub use storage::Storage;

/// Everything needed to build and differentiate tensor expressions.
pub mod prelude {
    pub use crate::dtype::{DType, Element, FloatElement};
    pub use crate::error::{Error, Result};
    pub use crate::gradcheck::finite_diff_grad;
    pub use crate::node::{NodeId, Op, Tensor};
    pub use crate::shape::{Shape, Strides};
    pub use crate::storage::Storage;
}
