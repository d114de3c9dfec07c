//! Neural network building blocks on top of [`tgrad_tensor`].
//!
//! Layers, activations, losses and optimizers compose through the
//! [`module::Module`] trait. A training step is: forward through a
//! model, score with a loss, `backward()`, then `Sgd::step()`.
//!
//! ```ignore
//! use tgrad_nn::prelude::*;
//!
//! let model = Sequential::new(vec![
//!     Linear::new(4, 8)?.into(),
//!     Tanh::new().into(),
//!     Linear::new(8, 3)?.into(),
//!     Softmax::new().into(),
//! ]);
//! let opt = Sgd::new(model.parameters(), 0.01);
//!
//! let probs = model.forward(&batch)?;
//! let loss = loss::mse(&targets, &probs)?;
//! loss.backward()?;
//! opt.step()?;
//! opt.zero_grad();
//! ```

pub mod activations;
pub mod layers;
pub mod loss;
pub mod module;
pub mod optim;

pub use activations::{Sigmoid, Softmax, Tanh};
pub use layers::{Activation, Linear};
pub use module::{Layer, Module, Sequential};
pub use optim::Sgd;

/// Everything needed to assemble and train a model.
pub mod prelude {
    pub use crate::activations::{Sigmoid, Softmax, Tanh};
    pub use crate::layers::{Activation, Linear};
    pub use crate::loss;
    pub use crate::module::{Layer, Module, Sequential};
    pub use crate::optim::Sgd;
    pub use tgrad_tensor::prelude::*;
}
