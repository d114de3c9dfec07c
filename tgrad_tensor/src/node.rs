//! Computation-graph nodes and the user-facing [`Tensor`] handle.
//!
//! A `Tensor` is a cheap reference-counted handle to a graph node. Nodes
//! built from operations keep strong references to their operands, so a
//! handle to the output keeps the whole expression alive. Calling
//! [`Tensor::backward`] consumes the graph: interior edges are dropped
//! afterwards and the structure cannot be differentiated twice.

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::dtype::{DType, Element, FloatElement};
use crate::error::{Error, Result};
use crate::shape::{Shape, Strides};
use crate::storage::Storage;

static NODE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique identity of a graph node, used as the key for adjoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

fn next_node_id() -> NodeId {
    NodeId(NODE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// The operation that produced a tensor.
///
/// Scalar operands are stored inline rather than as extra graph nodes,
/// so `x + 3.0` has a single parent.
#[derive(Debug, Clone, PartialEq)]
pub enum Op<E: Element> {
    /// User-constructed tensor or parameter. Gradients accumulate here.
    Leaf,
    Add,
    Sub,
    Mul,
    Div,
    AddScalar(E),
    SubScalar(E),
    /// `scalar - tensor`
    RsubScalar(E),
    MulScalar(E),
    DivScalar(E),
    /// `scalar / tensor`
    RdivScalar(E),
    MatMul,
    Transpose,
    Neg,
    Abs,
    Relu,
    Pow(E),
    Sqrt,
    Log,
    Exp,
    Sin,
    Cos,
    Tan,
    Sigmoid,
    Tanh,
    Softmax {
        axis: usize,
    },
    Sum {
        axes: Option<Vec<usize>>,
        keepdims: bool,
    },
    Mean {
        axes: Option<Vec<usize>>,
        keepdims: bool,
    },
}

pub(crate) struct TensorNode<E: Element> {
    id: NodeId,
    op: Op<E>,
    shape: Shape,
    value: RefCell<Storage<E>>,
    requires_grad: Cell<bool>,
    grad: RefCell<Option<Storage<E>>>,
    parents: RefCell<Vec<Tensor<E>>>,
    freed: Cell<bool>,
}

/// A dense tensor and its position in the computation graph.
///
/// Cloning is cheap and yields another handle to the same node.
pub struct Tensor<E: Element>(Rc<TensorNode<E>>);

impl<E: Element> Clone for Tensor<E> {
    fn clone(&self) -> Self {
        Tensor(Rc::clone(&self.0))
    }
}

impl<E: Element> Tensor<E> {
    fn from_storage(
        op: Op<E>,
        value: Storage<E>,
        parents: Vec<Tensor<E>>,
        requires_grad: bool,
    ) -> Self {
        let shape = value.shape().clone();
        Tensor(Rc::new(TensorNode {
            id: next_node_id(),
            op,
            shape,
            value: RefCell::new(value),
            requires_grad: Cell::new(requires_grad),
            grad: RefCell::new(None),
            parents: RefCell::new(parents),
            freed: Cell::new(false),
        }))
    }

    /// Wraps an operation result. When no operand tracks gradients the
    /// result degrades to a constant leaf and records no parents.
    fn from_op(op: Op<E>, value: Storage<E>, operands: &[&Tensor<E>]) -> Self {
        let requires_grad = operands.iter().any(|t| t.requires_grad());
        if !requires_grad {
            return Self::from_storage(Op::Leaf, value, Vec::new(), false);
        }
        for operand in operands {
            if operand.is_freed() {
                log::warn!(
                    "building an op on a tensor whose graph was already consumed by backward; \
                     gradients will not flow past it"
                );
            }
        }
        let parents = operands.iter().map(|t| (*t).clone()).collect();
        Self::from_storage(op, value, parents, true)
    }

    fn check_grad_dtype() -> Result<()> {
        if !E::DTYPE.is_float() {
            return Err(Error::Dtype(format!(
                "gradients require a floating-point dtype, got {}",
                E::DTYPE
            )));
        }
        Ok(())
    }

    pub fn new(data: Vec<E>, shape: impl Into<Shape>, requires_grad: bool) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::Shape("data cannot be empty".into()));
        }
        if requires_grad {
            Self::check_grad_dtype()?;
        }
        let storage = Storage::new(data, shape.into())?;
        Ok(Self::from_storage(Op::Leaf, storage, Vec::new(), requires_grad))
    }

    /// 1-D tensor from a flat vector.
    pub fn from_vec(data: Vec<E>) -> Result<Self> {
        let len = data.len();
        Self::new(data, vec![len], false)
    }

    /// Scalar constant with shape `[1]`.
    pub fn scalar(value: E) -> Self {
        Self::from_storage(Op::Leaf, Storage::scalar(value), Vec::new(), false)
    }

    pub fn zeros(shape: impl Into<Shape>) -> Result<Self> {
        Ok(Self::from_storage(
            Op::Leaf,
            Storage::zeros(shape.into())?,
            Vec::new(),
            false,
        ))
    }

    pub fn ones(shape: impl Into<Shape>) -> Result<Self> {
        Ok(Self::from_storage(
            Op::Leaf,
            Storage::ones(shape.into())?,
            Vec::new(),
            false,
        ))
    }

    pub fn full(shape: impl Into<Shape>, value: E) -> Result<Self> {
        Ok(Self::from_storage(
            Op::Leaf,
            Storage::full(shape.into(), value)?,
            Vec::new(),
            false,
        ))
    }

    /// Builds a tensor from `f64` values, failing on any value the
    /// element type cannot represent (fractional or overflowing values
    /// for `int32`).
    pub fn from_f64s(data: &[f64], shape: impl Into<Shape>) -> Result<Self> {
        let mut converted = Vec::with_capacity(data.len());
        for &v in data {
            converted.push(E::from_f64_exact(v).ok_or_else(|| {
                Error::Dtype(format!(
                    "value {v} cannot be represented as {} without explicit truncation",
                    E::DTYPE
                ))
            })?);
        }
        Self::new(converted, shape, false)
    }

    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub fn op(&self) -> &Op<E> {
        &self.0.op
    }

    pub fn shape(&self) -> &Shape {
        &self.0.shape
    }

    pub fn strides(&self) -> Strides {
        self.0.shape.strides()
    }

    pub fn rank(&self) -> usize {
        self.0.shape.rank()
    }

    pub fn size(&self) -> usize {
        self.0.shape.size()
    }

    pub fn dtype(&self) -> DType {
        E::DTYPE
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.0.op, Op::Leaf)
    }

    pub fn requires_grad(&self) -> bool {
        self.0.requires_grad.get()
    }

    /// Marks or unmarks a leaf as a differentiation target. Non-leaf
    /// tensors derive this from their operands and cannot be toggled.
    pub fn set_requires_grad(&self, requires_grad: bool) -> Result<()> {
        if !self.is_leaf() {
            log::warn!("attempted to toggle requires_grad on a non-leaf tensor");
            return Err(Error::Backward(
                "requires_grad can only be set on a leaf tensor".into(),
            ));
        }
        if requires_grad {
            Self::check_grad_dtype()?;
        }
        self.0.requires_grad.set(requires_grad);
        Ok(())
    }

    /// Copies the elements out in row-major order.
    pub fn to_vec(&self) -> Vec<E> {
        self.0.value.borrow().data().to_vec()
    }

    /// The single element of a size-1 tensor.
    pub fn item(&self) -> Result<E> {
        self.0.value.borrow().item()
    }

    pub(crate) fn value(&self) -> Ref<'_, Storage<E>> {
        self.0.value.borrow()
    }

    pub(crate) fn parents(&self) -> Vec<Tensor<E>> {
        self.0.parents.borrow().clone()
    }

    pub(crate) fn is_freed(&self) -> bool {
        self.0.freed.get()
    }

    /// Drops the edges into this node. Backward calls this once the
    /// adjoints have been distributed.
    pub(crate) fn release(&self) {
        self.0.parents.borrow_mut().clear();
        self.0.freed.set(true);
    }

    pub(crate) fn accumulate_grad(&self, adjoint: &Storage<E>) {
        let mut slot = self.0.grad.borrow_mut();
        match slot.as_mut() {
            Some(existing) => existing.accumulate(adjoint),
            None => *slot = Some(adjoint.clone()),
        }
    }

    /// The accumulated gradient, if a backward pass has produced one.
    /// Returned as a detached constant tensor of the same shape.
    pub fn grad(&self) -> Option<Tensor<E>> {
        self.0
            .grad
            .borrow()
            .as_ref()
            .map(|g| Self::from_storage(Op::Leaf, g.clone(), Vec::new(), false))
    }

    /// Clears the accumulated gradient. A no-op when none is present.
    pub fn zero_grad(&self) {
        *self.0.grad.borrow_mut() = None;
    }

    /// Replaces a leaf tensor's contents in place, preserving the shape.
    /// This is how optimizers update parameters without rebuilding them.
    pub fn set_data(&self, data: Vec<E>) -> Result<()> {
        if !self.is_leaf() {
            return Err(Error::Backward(
                "set_data is only valid on leaf tensors".into(),
            ));
        }
        if data.len() != self.size() {
            return Err(Error::Shape(format!(
                "data length {} does not match tensor of shape {}",
                data.len(),
                self.shape()
            )));
        }
        self.0.value.borrow_mut().data_mut().copy_from_slice(&data);
        Ok(())
    }

    pub fn add(&self, rhs: &Tensor<E>) -> Result<Tensor<E>> {
        let value = self.value().add(&rhs.value())?;
        Ok(Self::from_op(Op::Add, value, &[self, rhs]))
    }

    pub fn sub(&self, rhs: &Tensor<E>) -> Result<Tensor<E>> {
        let value = self.value().sub(&rhs.value())?;
        Ok(Self::from_op(Op::Sub, value, &[self, rhs]))
    }

    pub fn mul(&self, rhs: &Tensor<E>) -> Result<Tensor<E>> {
        let value = self.value().mul(&rhs.value())?;
        Ok(Self::from_op(Op::Mul, value, &[self, rhs]))
    }

    pub fn div(&self, rhs: &Tensor<E>) -> Result<Tensor<E>> {
        let value = self.value().div(&rhs.value())?;
        Ok(Self::from_op(Op::Div, value, &[self, rhs]))
    }

    pub fn add_scalar(&self, scalar: E) -> Tensor<E> {
        Self::from_op(Op::AddScalar(scalar), self.value().add_scalar(scalar), &[self])
    }

    pub fn sub_scalar(&self, scalar: E) -> Tensor<E> {
        Self::from_op(Op::SubScalar(scalar), self.value().sub_scalar(scalar), &[self])
    }

    /// `scalar - self`, elementwise.
    pub fn rsub_scalar(&self, scalar: E) -> Tensor<E> {
        Self::from_op(Op::RsubScalar(scalar), self.value().rsub_scalar(scalar), &[self])
    }

    pub fn mul_scalar(&self, scalar: E) -> Tensor<E> {
        Self::from_op(Op::MulScalar(scalar), self.value().mul_scalar(scalar), &[self])
    }

    pub fn div_scalar(&self, scalar: E) -> Result<Tensor<E>> {
        let value = self.value().div_scalar(scalar)?;
        Ok(Self::from_op(Op::DivScalar(scalar), value, &[self]))
    }

    /// `scalar / self`, elementwise.
    pub fn rdiv_scalar(&self, scalar: E) -> Result<Tensor<E>> {
        let value = self.value().rdiv_scalar(scalar)?;
        Ok(Self::from_op(Op::RdivScalar(scalar), value, &[self]))
    }

    pub fn neg(&self) -> Tensor<E> {
        Self::from_op(Op::Neg, self.value().map(|v| -v), &[self])
    }

    pub fn abs(&self) -> Tensor<E> {
        Self::from_op(Op::Abs, self.value().map(|v| num_traits::Signed::abs(&v)), &[self])
    }

    /// 2-D matrix product.
    pub fn matmul(&self, rhs: &Tensor<E>) -> Result<Tensor<E>> {
        let value = self.value().matmul(&rhs.value())?;
        Ok(Self::from_op(Op::MatMul, value, &[self, rhs]))
    }

    /// 2-D transpose.
    pub fn t(&self) -> Result<Tensor<E>> {
        let value = self.value().transpose2d()?;
        Ok(Self::from_op(Op::Transpose, value, &[self]))
    }

    /// Sum over `axes`; `None` collapses everything to shape `[1]`.
    pub fn sum(&self, axes: Option<&[usize]>, keepdims: bool) -> Result<Tensor<E>> {
        let value = self.value().sum_axes(axes, keepdims)?;
        let op = Op::Sum {
            axes: axes.map(<[usize]>::to_vec),
            keepdims,
        };
        Ok(Self::from_op(op, value, &[self]))
    }

    /// Detached copy of the values as `float32`. Gradients do not flow
    /// through casts.
    pub fn to_f32(&self) -> Tensor<f32> {
        let storage = self.value().cast(|v| v.as_f64() as f32);
        Tensor::from_storage(Op::Leaf, storage, Vec::new(), false)
    }

    /// Detached copy of the values as `float64`.
    pub fn to_f64(&self) -> Tensor<f64> {
        let storage = self.value().cast(Element::as_f64);
        Tensor::from_storage(Op::Leaf, storage, Vec::new(), false)
    }
}

impl<E: FloatElement> Tensor<E> {
    /// Elementwise square root. Negative inputs are a domain error.
    pub fn sqrt(&self) -> Result<Tensor<E>> {
        let value = self.value().try_map(|v| {
            if v < E::zero() {
                Err(Error::Domain(
                    "cannot take the square root of a negative number".into(),
                ))
            } else {
                Ok(num_traits::Float::sqrt(v))
            }
        })?;
        Ok(Self::from_op(Op::Sqrt, value, &[self]))
    }

    /// Elementwise natural logarithm. Non-positive inputs are a domain
    /// error rather than `-inf`/`NaN`.
    pub fn log(&self) -> Result<Tensor<E>> {
        let value = self.value().try_map(|v| {
            if v <= E::zero() {
                Err(Error::Domain(
                    "cannot take the log of a non-positive number".into(),
                ))
            } else {
                Ok(num_traits::Float::ln(v))
            }
        })?;
        Ok(Self::from_op(Op::Log, value, &[self]))
    }

    pub fn exp(&self) -> Tensor<E> {
        Self::from_op(Op::Exp, self.value().map(num_traits::Float::exp), &[self])
    }

    pub fn sin(&self) -> Tensor<E> {
        Self::from_op(Op::Sin, self.value().map(num_traits::Float::sin), &[self])
    }

    pub fn cos(&self) -> Tensor<E> {
        Self::from_op(Op::Cos, self.value().map(num_traits::Float::cos), &[self])
    }

    pub fn tan(&self) -> Tensor<E> {
        Self::from_op(Op::Tan, self.value().map(num_traits::Float::tan), &[self])
    }

    /// Elementwise power with a constant exponent.
    pub fn powf(&self, exponent: E) -> Tensor<E> {
        let value = self.value().map(|v| num_traits::Float::powf(v, exponent));
        Self::from_op(Op::Pow(exponent), value, &[self])
    }

    pub fn relu(&self) -> Tensor<E> {
        let value = self.value().map(|v| if v > E::zero() { v } else { E::zero() });
        Self::from_op(Op::Relu, value, &[self])
    }

    /// Logistic sigmoid, `1 / (1 + e^-x)`.
    pub fn sigmoid(&self) -> Tensor<E> {
        let one = E::one();
        let value = self
            .value()
            .map(|v| one / (one + num_traits::Float::exp(-v)));
        Self::from_op(Op::Sigmoid, value, &[self])
    }

    pub fn tanh(&self) -> Tensor<E> {
        Self::from_op(Op::Tanh, self.value().map(num_traits::Float::tanh), &[self])
    }

    /// Numerically stable softmax along `axis`. Negative axes count from
    /// the back.
    pub fn softmax(&self, axis: isize) -> Result<Tensor<E>> {
        let axis = self.shape().normalize_axis(axis)?;
        let value = self.value().softmax(axis)?;
        Ok(Self::from_op(Op::Softmax { axis }, value, &[self]))
    }

    /// Arithmetic mean over `axes`; `None` averages everything.
    pub fn mean(&self, axes: Option<&[usize]>, keepdims: bool) -> Result<Tensor<E>> {
        let summed = self.value().sum_axes(axes, keepdims)?;
        let count = E::from_f64_trunc(self.shape().reduced_count(axes) as f64);
        let value = summed.map(|v| v / count);
        let op = Op::Mean {
            axes: axes.map(<[usize]>::to_vec),
            keepdims,
        };
        Ok(Self::from_op(op, value, &[self]))
    }

    /// Reverse-mode differentiation from this scalar, filling the `grad`
    /// buffers of every reachable tensor with `requires_grad` set. The
    /// traversed graph is torn down afterwards; a fresh forward pass is
    /// needed before differentiating again.
    pub fn backward(&self) -> Result<()> {
        crate::backward::run_backward(self)
    }
}

impl<E: Element> fmt::Debug for Tensor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("id", &self.0.id)
            .field("op", &self.0.op)
            .field("shape", &self.0.shape)
            .field("dtype", &E::DTYPE)
            .field("requires_grad", &self.requires_grad())
            .finish()
    }
}

impl<E: Element> TryFrom<Vec<E>> for Tensor<E> {
    type Error = Error;

    fn try_from(data: Vec<E>) -> Result<Self> {
        Self::from_vec(data)
    }
}

impl<E: Element> TryFrom<Vec<Vec<E>>> for Tensor<E> {
    type Error = Error;

    fn try_from(rows: Vec<Vec<E>>) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::Shape("data cannot be empty".into()));
        }
        let cols = rows[0].len();
        if rows.iter().any(|r| r.len() != cols) {
            return Err(Error::Shape(
                "elements in a dimension must agree in shape".into(),
            ));
        }
        let shape = vec![rows.len(), cols];
        let data: Vec<E> = rows.into_iter().flatten().collect();
        Self::new(data, shape, false)
    }
}

impl<E: Element> TryFrom<Vec<Vec<Vec<E>>>> for Tensor<E> {
    type Error = Error;

    fn try_from(blocks: Vec<Vec<Vec<E>>>) -> Result<Self> {
        if blocks.is_empty() {
            return Err(Error::Shape("data cannot be empty".into()));
        }
        let rows = blocks[0].len();
        let cols = blocks.first().and_then(|b| b.first()).map_or(0, Vec::len);
        for block in &blocks {
            if block.len() != rows || block.iter().any(|r| r.len() != cols) {
                return Err(Error::Shape(
                    "elements in a dimension must agree in shape".into(),
                ));
            }
        }
        let shape = vec![blocks.len(), rows, cols];
        let data: Vec<E> = blocks.into_iter().flatten().flatten().collect();
        Self::new(data, shape, false)
    }
}

fn panic_on<T>(result: Result<T>, op: &str) -> T {
    match result {
        Ok(v) => v,
        Err(e) => panic!("tensor `{op}` failed: {e}"),
    }
}

// Operator overloads for all owned/borrowed combinations. They delegate
// to the checked methods and panic with the underlying error, matching
// how indexing a slice out of bounds behaves; use the named methods to
// handle failures gracefully.
macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $sym:literal) => {
        impl<E: Element> std::ops::$trait<&Tensor<E>> for &Tensor<E> {
            type Output = Tensor<E>;

            fn $method(self, rhs: &Tensor<E>) -> Tensor<E> {
                panic_on(Tensor::$method(self, rhs), $sym)
            }
        }

        impl<E: Element> std::ops::$trait<Tensor<E>> for &Tensor<E> {
            type Output = Tensor<E>;

            fn $method(self, rhs: Tensor<E>) -> Tensor<E> {
                panic_on(Tensor::$method(self, &rhs), $sym)
            }
        }

        impl<E: Element> std::ops::$trait<&Tensor<E>> for Tensor<E> {
            type Output = Tensor<E>;

            fn $method(self, rhs: &Tensor<E>) -> Tensor<E> {
                panic_on(Tensor::$method(&self, rhs), $sym)
            }
        }

        impl<E: Element> std::ops::$trait<Tensor<E>> for Tensor<E> {
            type Output = Tensor<E>;

            fn $method(self, rhs: Tensor<E>) -> Tensor<E> {
                panic_on(Tensor::$method(&self, &rhs), $sym)
            }
        }
    };
}

impl_binary_op!(Add, add, "+");
impl_binary_op!(Sub, sub, "-");
impl_binary_op!(Mul, mul, "*");
impl_binary_op!(Div, div, "/");

impl<E: Element> std::ops::Neg for &Tensor<E> {
    type Output = Tensor<E>;

    fn neg(self) -> Tensor<E> {
        Tensor::neg(self)
    }
}

impl<E: Element> std::ops::Neg for Tensor<E> {
    type Output = Tensor<E>;

    fn neg(self) -> Tensor<E> {
        Tensor::neg(&self)
    }
}

// Mixed tensor/scalar operators. Coherence requires one block per
// concrete element type for the scalar-on-the-left forms.
macro_rules! impl_scalar_ops {
    ($elem:ty) => {
        impl std::ops::Add<$elem> for &Tensor<$elem> {
            type Output = Tensor<$elem>;
            fn add(self, scalar: $elem) -> Tensor<$elem> {
                self.add_scalar(scalar)
            }
        }

        impl std::ops::Add<$elem> for Tensor<$elem> {
            type Output = Tensor<$elem>;
            fn add(self, scalar: $elem) -> Tensor<$elem> {
                self.add_scalar(scalar)
            }
        }

        impl std::ops::Add<&Tensor<$elem>> for $elem {
            type Output = Tensor<$elem>;
            fn add(self, tensor: &Tensor<$elem>) -> Tensor<$elem> {
                tensor.add_scalar(self)
            }
        }

        impl std::ops::Add<Tensor<$elem>> for $elem {
            type Output = Tensor<$elem>;
            fn add(self, tensor: Tensor<$elem>) -> Tensor<$elem> {
                tensor.add_scalar(self)
            }
        }

        impl std::ops::Sub<$elem> for &Tensor<$elem> {
            type Output = Tensor<$elem>;
            fn sub(self, scalar: $elem) -> Tensor<$elem> {
                self.sub_scalar(scalar)
            }
        }

        impl std::ops::Sub<$elem> for Tensor<$elem> {
            type Output = Tensor<$elem>;
            fn sub(self, scalar: $elem) -> Tensor<$elem> {
                self.sub_scalar(scalar)
            }
        }

        impl std::ops::Sub<&Tensor<$elem>> for $elem {
            type Output = Tensor<$elem>;
            fn sub(self, tensor: &Tensor<$elem>) -> Tensor<$elem> {
                tensor.rsub_scalar(self)
            }
        }

        impl std::ops::Sub<Tensor<$elem>> for $elem {
            type Output = Tensor<$elem>;
            fn sub(self, tensor: Tensor<$elem>) -> Tensor<$elem> {
                tensor.rsub_scalar(self)
            }
        }

        impl std::ops::Mul<$elem> for &Tensor<$elem> {
            type Output = Tensor<$elem>;
            fn mul(self, scalar: $elem) -> Tensor<$elem> {
                self.mul_scalar(scalar)
            }
        }

        impl std::ops::Mul<$elem> for Tensor<$elem> {
            type Output = Tensor<$elem>;
            fn mul(self, scalar: $elem) -> Tensor<$elem> {
                self.mul_scalar(scalar)
            }
        }

        impl std::ops::Mul<&Tensor<$elem>> for $elem {
            type Output = Tensor<$elem>;
            fn mul(self, tensor: &Tensor<$elem>) -> Tensor<$elem> {
                tensor.mul_scalar(self)
            }
        }

        impl std::ops::Mul<Tensor<$elem>> for $elem {
            type Output = Tensor<$elem>;
            fn mul(self, tensor: Tensor<$elem>) -> Tensor<$elem> {
                tensor.mul_scalar(self)
            }
        }

        impl std::ops::Div<$elem> for &Tensor<$elem> {
            type Output = Tensor<$elem>;
            fn div(self, scalar: $elem) -> Tensor<$elem> {
                panic_on(self.div_scalar(scalar), "/")
            }
        }

        impl std::ops::Div<$elem> for Tensor<$elem> {
            type Output = Tensor<$elem>;
            fn div(self, scalar: $elem) -> Tensor<$elem> {
                panic_on(self.div_scalar(scalar), "/")
            }
        }

        impl std::ops::Div<&Tensor<$elem>> for $elem {
            type Output = Tensor<$elem>;
            fn div(self, tensor: &Tensor<$elem>) -> Tensor<$elem> {
                panic_on(tensor.rdiv_scalar(self), "/")
            }
        }

        impl std::ops::Div<Tensor<$elem>> for $elem {
            type Output = Tensor<$elem>;
            fn div(self, tensor: Tensor<$elem>) -> Tensor<$elem> {
                panic_on(tensor.rdiv_scalar(self), "/")
            }
        }
    };
}

impl_scalar_ops!(i32);
impl_scalar_ops!(f32);
impl_scalar_ops!(f64);
