//! Dense row-major storage and the numeric kernels that operate on it.
//!
//! [`Storage`] is the value half of a graph node: a flat buffer plus its
//! shape and derived strides. Kernels here are shape-checked; the graph
//! layer in [`crate::node`] wires them into differentiable operations.

use crate::dtype::{DType, Element, FloatElement};
use crate::error::{Error, Result};
use crate::shape::{Shape, Strides};

#[derive(Clone, Debug, PartialEq)]
pub struct Storage<E: Element> {
    data: Vec<E>,
    shape: Shape,
    strides: Strides,
}

impl<E: Element> Storage<E> {
    pub fn new(data: Vec<E>, shape: Shape) -> Result<Self> {
        shape.validate()?;
        if data.len() != shape.size() {
            return Err(Error::Shape(format!(
                "data length {} does not match shape {} ({} elements)",
                data.len(),
                shape,
                shape.size()
            )));
        }
        let strides = shape.strides();
        Ok(Storage {
            data,
            shape,
            strides,
        })
    }

    pub fn full(shape: Shape, value: E) -> Result<Self> {
        shape.validate()?;
        let data = vec![value; shape.size()];
        let strides = shape.strides();
        Ok(Storage {
            data,
            shape,
            strides,
        })
    }

    pub fn zeros(shape: Shape) -> Result<Self> {
        Self::full(shape, E::zero())
    }

    pub fn ones(shape: Shape) -> Result<Self> {
        Self::full(shape, E::one())
    }

    pub fn scalar(value: E) -> Self {
        let shape = Shape::scalar();
        let strides = shape.strides();
        Storage {
            data: vec![value],
            shape,
            strides,
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn strides(&self) -> &Strides {
        &self.strides
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[E] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [E] {
        &mut self.data
    }

    pub fn dtype(&self) -> DType {
        E::DTYPE
    }

    /// The single element of a size-1 storage.
    pub fn item(&self) -> Result<E> {
        if self.data.len() != 1 {
            return Err(Error::Shape(format!(
                "item() requires a tensor of size 1, got shape {}",
                self.shape
            )));
        }
        Ok(self.data[0])
    }

    /// Elementwise map producing a same-shaped result.
    pub fn map(&self, f: impl Fn(E) -> E) -> Storage<E> {
        Storage {
            data: self.data.iter().map(|&v| f(v)).collect(),
            shape: self.shape.clone(),
            strides: self.strides.clone(),
        }
    }

    /// Elementwise map whose kernel can fail, used for domain checks.
    pub fn try_map(&self, f: impl Fn(E) -> Result<E>) -> Result<Storage<E>> {
        let mut data = Vec::with_capacity(self.data.len());
        for &v in &self.data {
            data.push(f(v)?);
        }
        Ok(Storage {
            data,
            shape: self.shape.clone(),
            strides: self.strides.clone(),
        })
    }

    /// Binary elementwise kernel with numpy-style broadcasting.
    pub fn zip(&self, other: &Storage<E>, f: impl Fn(E, E) -> E) -> Result<Storage<E>> {
        let out_shape = self.shape.broadcast_with(&other.shape).ok_or_else(|| {
            Error::ShapeMismatch {
                expected: self.shape.dims().to_vec(),
                got: other.shape.dims().to_vec(),
            }
        })?;
        let a = self.broadcast_to(&out_shape)?;
        let b = other.broadcast_to(&out_shape)?;
        let data = a
            .data
            .iter()
            .zip(&b.data)
            .map(|(&x, &y)| f(x, y))
            .collect();
        let strides = out_shape.strides();
        Ok(Storage {
            data,
            shape: out_shape,
            strides,
        })
    }

    pub fn add(&self, other: &Storage<E>) -> Result<Storage<E>> {
        self.zip(other, |a, b| a + b)
    }

    pub fn sub(&self, other: &Storage<E>) -> Result<Storage<E>> {
        self.zip(other, |a, b| a - b)
    }

    pub fn mul(&self, other: &Storage<E>) -> Result<Storage<E>> {
        self.zip(other, |a, b| a * b)
    }

    /// Elementwise division. An exact zero anywhere in the divisor is an
    /// error rather than a silent `inf` or panic.
    pub fn div(&self, other: &Storage<E>) -> Result<Storage<E>> {
        if other.data.iter().any(|v| v.is_zero()) {
            return Err(Error::DivisionByZero);
        }
        self.zip(other, |a, b| a / b)
    }

    pub fn add_scalar(&self, scalar: E) -> Storage<E> {
        self.map(|v| v + scalar)
    }

    pub fn sub_scalar(&self, scalar: E) -> Storage<E> {
        self.map(|v| v - scalar)
    }

    /// `scalar - self`, elementwise.
    pub fn rsub_scalar(&self, scalar: E) -> Storage<E> {
        self.map(|v| scalar - v)
    }

    pub fn mul_scalar(&self, scalar: E) -> Storage<E> {
        self.map(|v| v * scalar)
    }

    pub fn div_scalar(&self, scalar: E) -> Result<Storage<E>> {
        if scalar.is_zero() {
            return Err(Error::DivisionByZero);
        }
        Ok(self.map(|v| v / scalar))
    }

    /// `scalar / self`, elementwise.
    pub fn rdiv_scalar(&self, scalar: E) -> Result<Storage<E>> {
        if self.data.iter().any(|v| v.is_zero()) {
            return Err(Error::DivisionByZero);
        }
        Ok(self.map(|v| scalar / v))
    }

    /// In-place `self += other`. Shapes must already match.
    pub fn accumulate(&mut self, other: &Storage<E>) {
        debug_assert_eq!(self.shape, other.shape);
        for (dst, src) in self.data.iter_mut().zip(&other.data) {
            *dst += *src;
        }
    }

    /// Materializes this storage at a broadcast-compatible target shape.
    pub fn broadcast_to(&self, target: &Shape) -> Result<Storage<E>> {
        if &self.shape == target {
            return Ok(self.clone());
        }
        let compatible = self
            .shape
            .broadcast_with(target)
            .map_or(false, |s| &s == target);
        if !compatible {
            return Err(Error::ShapeMismatch {
                expected: target.dims().to_vec(),
                got: self.shape.dims().to_vec(),
            });
        }
        let src_rank = self.shape.rank();
        let offset = target.rank() - src_rank;
        let target_strides = target.strides();
        let mut data = vec![E::zero(); target.size()];
        let mut src_index = vec![0usize; src_rank];
        for index in target.index_iter() {
            for i in 0..src_rank {
                src_index[i] = if self.shape.dim(i) == 1 {
                    0
                } else {
                    index[offset + i]
                };
            }
            data[target_strides.offset(&index)] = self.data[self.strides.offset(&src_index)];
        }
        Ok(Storage {
            data,
            shape: target.clone(),
            strides: target_strides,
        })
    }

    /// Elementwise conversion into another element type.
    pub fn cast<T: Element>(&self, f: impl Fn(E) -> T) -> Storage<T> {
        Storage {
            data: self.data.iter().map(|&v| f(v)).collect(),
            shape: self.shape.clone(),
            strides: self.strides.clone(),
        }
    }

    /// Same buffer under a new shape of equal size.
    pub fn reshape(&self, target: &Shape) -> Result<Storage<E>> {
        target.validate()?;
        if self.data.len() != target.size() {
            return Err(Error::Shape(format!(
                "cannot reshape {} into {}",
                self.shape, target
            )));
        }
        Ok(Storage {
            data: self.data.clone(),
            shape: target.clone(),
            strides: target.strides(),
        })
    }

    /// Sum over `axes` (`None` sums everything down to a scalar).
    pub fn sum_axes(&self, axes: Option<&[usize]>, keepdims: bool) -> Result<Storage<E>> {
        self.reduce(axes, keepdims, |acc, v| acc + v)
    }

    fn reduce(
        &self,
        axes: Option<&[usize]>,
        keepdims: bool,
        f: impl Fn(E, E) -> E,
    ) -> Result<Storage<E>> {
        let rank = self.shape.rank();
        if let Some(axes) = axes {
            for (i, &a) in axes.iter().enumerate() {
                if a >= rank {
                    return Err(Error::Shape(format!(
                        "axis {a} is out of range for rank {rank}"
                    )));
                }
                if axes[..i].contains(&a) {
                    return Err(Error::Shape(format!("duplicate reduction axis {a}")));
                }
            }
        }
        let reduced: Vec<usize> = match axes {
            Some(axes) => axes.to_vec(),
            None => (0..rank).collect(),
        };
        let out_dims: Vec<usize> = (0..rank)
            .filter_map(|i| {
                if reduced.contains(&i) {
                    keepdims.then_some(1)
                } else {
                    Some(self.shape.dim(i))
                }
            })
            .collect();
        let out_shape = if out_dims.is_empty() {
            Shape::scalar()
        } else {
            Shape::new(out_dims)
        };
        let out_strides = out_shape.strides();
        let mut data = vec![E::zero(); out_shape.size()];
        let mut out_index = Vec::with_capacity(rank);
        for index in self.shape.index_iter() {
            out_index.clear();
            for i in 0..rank {
                if reduced.contains(&i) {
                    if keepdims {
                        out_index.push(0);
                    }
                } else {
                    out_index.push(index[i]);
                }
            }
            let dst = if out_index.is_empty() {
                0
            } else {
                out_strides.offset(&out_index)
            };
            let src = self.strides.offset(&index);
            data[dst] = f(data[dst], self.data[src]);
        }
        Ok(Storage {
            data,
            shape: out_shape,
            strides: out_strides,
        })
    }

    /// Reduces a broadcast result back down to `target` by summing over
    /// the stretched axes. Used to fold gradients onto their operands.
    pub fn sum_to(&self, target: &Shape) -> Result<Storage<E>> {
        if &self.shape == target {
            return Ok(self.clone());
        }
        let rank = self.shape.rank();
        if target.rank() > rank {
            return Err(Error::ShapeMismatch {
                expected: target.dims().to_vec(),
                got: self.shape.dims().to_vec(),
            });
        }
        let offset = rank - target.rank();
        let mut axes: Vec<usize> = (0..offset).collect();
        for i in 0..target.rank() {
            if target.dim(i) == 1 && self.shape.dim(offset + i) > 1 {
                axes.push(offset + i);
            }
        }
        if axes.is_empty() {
            return self.reshape(target);
        }
        let summed = self.reduce(Some(&axes), false, |acc, v| acc + v)?;
        summed.reshape(target)
    }

    /// 2-D matrix product.
    pub fn matmul(&self, other: &Storage<E>) -> Result<Storage<E>> {
        if self.shape.rank() != 2 || other.shape.rank() != 2 {
            return Err(Error::Shape("matmul requires 2-D operands".into()));
        }
        let (m, k) = (self.shape.dim(0), self.shape.dim(1));
        let (k2, n) = (other.shape.dim(0), other.shape.dim(1));
        if k != k2 {
            return Err(Error::Shape(format!(
                "cannot multiply a {m}x{k} matrix by a {k2}x{n} matrix"
            )));
        }
        let mut data = vec![E::zero(); m * n];
        for i in 0..m {
            for l in 0..k {
                let a = self.data[i * k + l];
                for j in 0..n {
                    data[i * n + j] += a * other.data[l * n + j];
                }
            }
        }
        Storage::new(data, Shape::from(vec![m, n]))
    }

    /// 2-D transpose.
    pub fn transpose2d(&self) -> Result<Storage<E>> {
        if self.shape.rank() != 2 {
            return Err(Error::Shape("transpose requires a 2-D tensor".into()));
        }
        let (rows, cols) = (self.shape.dim(0), self.shape.dim(1));
        let mut data = vec![E::zero(); rows * cols];
        for r in 0..rows {
            for c in 0..cols {
                data[c * rows + r] = self.data[r * cols + c];
            }
        }
        Storage::new(data, Shape::from(vec![cols, rows]))
    }
}

impl<E: FloatElement> Storage<E> {
    /// Numerically stable softmax along `axis`: shift each lane by its
    /// maximum before exponentiating.
    pub fn softmax(&self, axis: usize) -> Result<Storage<E>> {
        let dims = self.shape.dims();
        if axis >= dims.len() {
            return Err(Error::Shape(format!(
                "axis {axis} is out of range for rank {}",
                dims.len()
            )));
        }
        let lane = dims[axis];
        let inner: usize = dims[axis + 1..].iter().product();
        let outer = self.data.len() / (lane * inner);
        let mut data = self.data.clone();
        for o in 0..outer {
            for i in 0..inner {
                let base = o * lane * inner + i;
                let mut max = data[base];
                for d in 1..lane {
                    let v = data[base + d * inner];
                    if v > max {
                        max = v;
                    }
                }
                let mut sum = E::zero();
                for d in 0..lane {
                    let e = num_traits::Float::exp(data[base + d * inner] - max);
                    data[base + d * inner] = e;
                    sum += e;
                }
                for d in 0..lane {
                    data[base + d * inner] = data[base + d * inner] / sum;
                }
            }
        }
        Ok(Storage {
            data,
            shape: self.shape.clone(),
            strides: self.strides.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn storage(data: Vec<f64>, dims: Vec<usize>) -> Storage<f64> {
        Storage::new(data, Shape::from(dims)).unwrap()
    }

    #[test]
    fn construction_checks_sizes() {
        assert!(Storage::new(vec![1.0, 2.0], Shape::from(vec![3])).is_err());
        assert!(Storage::new(vec![1.0; 6], Shape::from(vec![2, 3])).is_ok());
        assert!(Storage::<f64>::zeros(Shape::from(vec![0])).is_err());
    }

    #[test]
    fn broadcast_add_row_onto_matrix() {
        let a = storage(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
        let b = storage(vec![10.0, 20.0, 30.0], vec![3]);
        let c = a.add(&b).unwrap();
        assert_eq!(c.shape().dims(), &[2, 3]);
        assert_eq!(c.data(), &[11.0, 22.0, 33.0, 14.0, 25.0, 36.0]);
    }

    #[test]
    fn broadcast_column_against_row() {
        let a = storage(vec![1.0, 2.0], vec![2, 1]);
        let b = storage(vec![10.0, 20.0, 30.0], vec![1, 3]);
        let c = a.mul(&b).unwrap();
        assert_eq!(c.shape().dims(), &[2, 3]);
        assert_eq!(c.data(), &[10.0, 20.0, 30.0, 20.0, 40.0, 60.0]);
    }

    #[test]
    fn division_by_exact_zero_is_an_error() {
        let a = storage(vec![1.0, 2.0], vec![2]);
        let b = storage(vec![2.0, 0.0], vec![2]);
        assert_eq!(a.div(&b), Err(Error::DivisionByZero));
        assert_eq!(a.div_scalar(0.0), Err(Error::DivisionByZero));
        let with_zero = storage(vec![1.0, 0.0], vec![2]);
        assert_eq!(with_zero.rdiv_scalar(1.0), Err(Error::DivisionByZero));
    }

    #[test]
    fn matmul_small_known_product() {
        let a = storage(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
        let b = storage(vec![7.0, 8.0, 9.0, 10.0, 11.0, 12.0], vec![3, 2]);
        let c = a.matmul(&b).unwrap();
        assert_eq!(c.shape().dims(), &[2, 2]);
        assert_eq!(c.data(), &[58.0, 64.0, 139.0, 154.0]);
    }

    #[test]
    fn matmul_rejects_bad_shapes() {
        let a = storage(vec![1.0, 2.0, 3.0], vec![3]);
        let b = storage(vec![1.0, 2.0, 3.0], vec![3]);
        assert!(a.matmul(&b).is_err());
        let a = storage(vec![1.0; 6], vec![2, 3]);
        let b = storage(vec![1.0; 4], vec![2, 2]);
        assert!(a.matmul(&b).is_err());
    }

    #[test]
    fn transpose_flips_a_matrix() {
        let a = storage(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
        let t = a.transpose2d().unwrap();
        assert_eq!(t.shape().dims(), &[3, 2]);
        assert_eq!(t.data(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn sum_over_axes_with_and_without_keepdims() {
        let a = storage(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
        let rows = a.sum_axes(Some(&[1]), false).unwrap();
        assert_eq!(rows.shape().dims(), &[2]);
        assert_eq!(rows.data(), &[6.0, 15.0]);

        let kept = a.sum_axes(Some(&[0]), true).unwrap();
        assert_eq!(kept.shape().dims(), &[1, 3]);
        assert_eq!(kept.data(), &[5.0, 7.0, 9.0]);

        let total = a.sum_axes(None, false).unwrap();
        assert_eq!(total.shape().dims(), &[1]);
        assert_eq!(total.data(), &[21.0]);
    }

    #[test]
    fn reductions_reject_bad_axis_lists() {
        let a = storage(vec![1.0; 6], vec![2, 3]);
        assert!(matches!(
            a.sum_axes(Some(&[2]), false),
            Err(Error::Shape(_))
        ));
        assert!(matches!(
            a.sum_axes(Some(&[1, 1]), false),
            Err(Error::Shape(_))
        ));
    }

    #[test]
    fn item_requires_exactly_one_element() {
        let one = Storage::scalar(7.0f64);
        assert_eq!(one.item().unwrap(), 7.0);
        let two = storage(vec![1.0, 2.0], vec![2]);
        assert!(matches!(two.item(), Err(Error::Shape(_))));
    }

    #[test]
    fn sum_to_undoes_broadcasting() {
        let big = storage(vec![1.0; 6], vec![2, 3]);
        let row = big.sum_to(&Shape::from(vec![3])).unwrap();
        assert_eq!(row.shape().dims(), &[3]);
        assert_eq!(row.data(), &[2.0, 2.0, 2.0]);

        let one = big.sum_to(&Shape::from(vec![1])).unwrap();
        assert_eq!(one.data(), &[6.0]);

        let kept = big.sum_to(&Shape::from(vec![1, 3])).unwrap();
        assert_eq!(kept.shape().dims(), &[1, 3]);
    }

    #[test]
    fn softmax_lanes_sum_to_one() {
        let a = Storage::<f64>::new(
            vec![1.0, 2.0, 3.0, 1000.0, 1001.0, 1002.0],
            Shape::from(vec![2, 3]),
        )
        .unwrap();
        let s = a.softmax(1).unwrap();
        for row in 0..2 {
            let sum: f64 = s.data()[row * 3..(row + 1) * 3].iter().sum();
            assert_relative_eq!(sum, 1.0, epsilon = 1e-12);
        }
        // both rows shift to the same relative values
        for i in 0..3 {
            assert_relative_eq!(s.data()[i], s.data()[3 + i], epsilon = 1e-12);
        }
        assert!(matches!(a.softmax(2), Err(Error::Shape(_))));
    }

    #[test]
    fn integer_kernels_work_too() {
        let a = Storage::new(vec![1i32, 2, 3, 4], Shape::from(vec![2, 2])).unwrap();
        let b = Storage::new(vec![5i32, 6, 7, 8], Shape::from(vec![2, 2])).unwrap();
        assert_eq!(a.add(&b).unwrap().data(), &[6, 8, 10, 12]);
        assert_eq!(a.matmul(&b).unwrap().data(), &[19, 22, 43, 50]);
        let zero = Storage::new(vec![1i32, 0], Shape::from(vec![2])).unwrap();
        assert_eq!(a.sum_to(&Shape::from(vec![2])).unwrap().data(), &[4, 6]);
        assert!(matches!(
            Storage::new(vec![1i32, 1], Shape::from(vec![2])).unwrap().div(&zero),
            Err(Error::DivisionByZero)
        ));
    }
}
