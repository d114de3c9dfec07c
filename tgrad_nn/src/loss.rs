//! Loss functions.
//!
//! All losses take the target first, `loss(y, y_hat)`, return a scalar
//! tensor, and are built from graph primitives so their gradients come
//! out of the chain rule rather than hand-derived formulas.

use tgrad_tensor::prelude::*;

fn check_same_shape<E: FloatElement>(y: &Tensor<E>, y_hat: &Tensor<E>) -> Result<()> {
    if y.shape() != y_hat.shape() {
        return Err(Error::ShapeMismatch {
            expected: y.shape().dims().to_vec(),
            got: y_hat.shape().dims().to_vec(),
        });
    }
    Ok(())
}

/// Mean squared error, `mean((y_hat - y)^2)`.
pub fn mse<E: FloatElement>(y: &Tensor<E>, y_hat: &Tensor<E>) -> Result<Tensor<E>> {
    check_same_shape(y, y_hat)?;
    let diff = y_hat.sub(y)?;
    diff.mul(&diff)?.mean(None, false)
}

/// Mean absolute error, `mean(|y_hat - y|)`.
pub fn mae<E: FloatElement>(y: &Tensor<E>, y_hat: &Tensor<E>) -> Result<Tensor<E>> {
    check_same_shape(y, y_hat)?;
    y_hat.sub(y)?.abs().mean(None, false)
}

/// Binary cross-entropy over probabilities.
///
/// Predictions must lie strictly inside `(0, 1)` and targets in
/// `[0, 1]`; anything else is a domain error instead of an infinite or
/// undefined loss.
pub fn bce<E: FloatElement>(y: &Tensor<E>, y_hat: &Tensor<E>) -> Result<Tensor<E>> {
    check_same_shape(y, y_hat)?;
    let zero = E::zero();
    let one = E::one();
    if y_hat.to_vec().iter().any(|&p| p <= zero || p >= one) {
        return Err(Error::Domain(
            "BCE predictions must lie strictly inside (0, 1)".into(),
        ));
    }
    if y.to_vec().iter().any(|&t| t < zero || t > one) {
        return Err(Error::Domain("BCE targets must lie in [0, 1]".into()));
    }
    let log_p = y_hat.log()?;
    let log_not_p = y_hat.rsub_scalar(one).log()?;
    let likelihood = y
        .mul(&log_p)?
        .add(&y.rsub_scalar(one).mul(&log_not_p)?)?;
    Ok(likelihood.mean(None, false)?.neg())
}
