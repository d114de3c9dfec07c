//! Free-function forms of the floating-point math operations.
//!
//! These mirror the inherent methods on [`Tensor`] for call sites that
//! read better in function style, e.g. `math::sqrt(&x)?`.

use crate::dtype::FloatElement;
use crate::error::Result;
use crate::node::Tensor;

pub fn sqrt<E: FloatElement>(t: &Tensor<E>) -> Result<Tensor<E>> {
    t.sqrt()
}

pub fn log<E: FloatElement>(t: &Tensor<E>) -> Result<Tensor<E>> {
    t.log()
}

pub fn exp<E: FloatElement>(t: &Tensor<E>) -> Tensor<E> {
    t.exp()
}

pub fn sin<E: FloatElement>(t: &Tensor<E>) -> Tensor<E> {
    t.sin()
}

pub fn cos<E: FloatElement>(t: &Tensor<E>) -> Tensor<E> {
    t.cos()
}

pub fn tan<E: FloatElement>(t: &Tensor<E>) -> Tensor<E> {
    t.tan()
}

pub fn pow<E: FloatElement>(t: &Tensor<E>, exponent: E) -> Tensor<E> {
    t.powf(exponent)
}
