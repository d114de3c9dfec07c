//! Parameterized layers.

mod linear;

pub use linear::{Activation, Linear};
