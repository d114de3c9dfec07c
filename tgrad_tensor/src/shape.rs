//! Shape and stride machinery for dense row-major tensors.
//!
//! Shapes never have rank zero here: scalars are represented as `[1]`,
//! and every dimension must be positive.

use std::fmt;

use crate::error::{Error, Result};

/// Dimension sizes of a tensor.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Shape(Vec<usize>);

impl Shape {
    pub fn new(dims: Vec<usize>) -> Self {
        Shape(dims)
    }

    /// The canonical scalar shape, `[1]`.
    pub fn scalar() -> Self {
        Shape(vec![1])
    }

    /// Rejects empty shapes and zero-size dimensions.
    pub fn validate(&self) -> Result<()> {
        if self.0.is_empty() {
            return Err(Error::Shape("shape cannot be empty".into()));
        }
        if self.0.iter().any(|&d| d == 0) {
            return Err(Error::Shape("dimension must be positive".into()));
        }
        Ok(())
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    pub fn dim(&self, axis: usize) -> usize {
        self.0[axis]
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Total number of elements.
    pub fn size(&self) -> usize {
        self.0.iter().product()
    }

    /// Row-major strides derived from the dimensions.
    pub fn strides(&self) -> Strides {
        let mut strides = vec![1usize; self.0.len()];
        let mut acc = 1usize;
        for i in (0..self.0.len()).rev() {
            strides[i] = acc;
            acc *= self.0[i];
        }
        Strides(strides)
    }

    /// Resolves a possibly negative axis index against this shape's rank.
    pub fn normalize_axis(&self, axis: isize) -> Result<usize> {
        let rank = self.rank() as isize;
        let resolved = if axis < 0 { axis + rank } else { axis };
        if resolved < 0 || resolved >= rank {
            return Err(Error::Shape(format!(
                "axis {axis} is out of range for rank {}",
                self.rank()
            )));
        }
        Ok(resolved as usize)
    }

    /// Numpy-style broadcast of two shapes: align trailing dimensions,
    /// a dimension of 1 stretches to match. `None` when incompatible.
    pub fn broadcast_with(&self, other: &Shape) -> Option<Shape> {
        let rank = self.rank().max(other.rank());
        let mut dims = vec![0usize; rank];
        for i in 0..rank {
            let a = if i < rank - self.rank() {
                1
            } else {
                self.0[i - (rank - self.rank())]
            };
            let b = if i < rank - other.rank() {
                1
            } else {
                other.0[i - (rank - other.rank())]
            };
            dims[i] = if a == b || b == 1 {
                a
            } else if a == 1 {
                b
            } else {
                return None;
            };
        }
        Some(Shape(dims))
    }

    /// Number of elements folded together when reducing over `axes`
    /// (`None` reduces everything).
    pub fn reduced_count(&self, axes: Option<&[usize]>) -> usize {
        match axes {
            None => self.size(),
            Some(axes) => axes.iter().map(|&a| self.dim(a)).product(),
        }
    }

    /// Iterates over every index tuple in row-major order.
    pub fn index_iter(&self) -> IndexIter<'_> {
        IndexIter::new(self)
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape(dims.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Shape(dims.to_vec())
    }
}

/// Row-major strides paired with a [`Shape`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Strides(Vec<usize>);

impl Strides {
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Flat buffer offset of an index tuple.
    pub fn offset(&self, index: &[usize]) -> usize {
        index
            .iter()
            .zip(&self.0)
            .map(|(&i, &s)| i * s)
            .sum()
    }
}

/// Odometer-style iterator over the index tuples of a shape.
pub struct IndexIter<'a> {
    dims: &'a [usize],
    current: Vec<usize>,
    done: bool,
}

impl<'a> IndexIter<'a> {
    fn new(shape: &'a Shape) -> Self {
        let dims = shape.dims();
        IndexIter {
            dims,
            current: vec![0; dims.len()],
            done: dims.is_empty() || dims.iter().any(|&d| d == 0),
        }
    }
}

impl Iterator for IndexIter<'_> {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        if self.done {
            return None;
        }
        let item = self.current.clone();
        // advance the rightmost digit, carrying leftwards
        for axis in (0..self.dims.len()).rev() {
            self.current[axis] += 1;
            if self.current[axis] < self.dims[axis] {
                return Some(item);
            }
            self.current[axis] = 0;
        }
        self.done = true;
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strides_are_row_major() {
        let shape = Shape::from(vec![2, 3, 4]);
        assert_eq!(shape.strides().as_slice(), &[12, 4, 1]);
        assert_eq!(shape.size(), 24);
    }

    #[test]
    fn offsets_enumerate_the_buffer_in_order() {
        let shape = Shape::from(vec![2, 3, 4]);
        let strides = shape.strides();
        for (flat, index) in shape.index_iter().enumerate() {
            assert_eq!(strides.offset(&index), flat);
        }
        assert_eq!(shape.index_iter().count(), shape.size());
    }

    #[test]
    fn rejects_empty_and_zero_dims() {
        assert!(Shape::from(vec![]).validate().is_err());
        assert!(Shape::from(vec![2, 0]).validate().is_err());
        assert!(Shape::from(vec![1]).validate().is_ok());
    }

    #[test]
    fn broadcasting_aligns_trailing_dims() {
        let a = Shape::from(vec![2, 3]);
        let b = Shape::from(vec![3]);
        assert_eq!(a.broadcast_with(&b).unwrap().dims(), &[2, 3]);

        let a = Shape::from(vec![4, 1]);
        let b = Shape::from(vec![1, 5]);
        assert_eq!(a.broadcast_with(&b).unwrap().dims(), &[4, 5]);

        let a = Shape::from(vec![1]);
        let b = Shape::from(vec![2, 3]);
        assert_eq!(a.broadcast_with(&b).unwrap().dims(), &[2, 3]);

        let a = Shape::from(vec![2, 3]);
        let b = Shape::from(vec![2, 4]);
        assert!(a.broadcast_with(&b).is_none());
    }

    #[test]
    fn negative_axes_count_from_the_back() {
        let shape = Shape::from(vec![2, 3, 4]);
        assert_eq!(shape.normalize_axis(-1).unwrap(), 2);
        assert_eq!(shape.normalize_axis(0).unwrap(), 0);
        assert!(shape.normalize_axis(3).is_err());
        assert!(shape.normalize_axis(-4).is_err());
    }

    #[test]
    fn reduced_count_over_axes() {
        let shape = Shape::from(vec![2, 3, 4]);
        assert_eq!(shape.reduced_count(None), 24);
        assert_eq!(shape.reduced_count(Some(&[0, 2])), 8);
        assert_eq!(shape.reduced_count(Some(&[])), 1);
    }
}
