use std::fmt;

use serde::{Deserialize, Serialize};

// Shape — N-dimensional shape representation
//
// A Shape describes the size of each dimension of a tensor. All Kestrel
// tensors are dense and row-major (C order), so a shape alone determines the
// memory layout.
//
// Operators that reduce along an axis take a signed axis: -1 is the last
// dimension, -rank the first. `normalize_axis` resolves that once, and
// `split_at_axis` gives the (outer, axis, inner) extents that axis-wise
// kernels loop over.

/// N-dimensional shape of a tensor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape(Vec<usize>);

impl Shape {
    /// Create a new shape from a vector of dimension sizes.
    pub fn new(dims: Vec<usize>) -> Self {
        Shape(dims)
    }

    /// The dimension sizes as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Number of dimensions (0 for scalar, 1 for vector, 2 for matrix, etc.).
    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// Total number of elements (product of all dimensions).
    /// A scalar shape [] has 1 element; any zero dimension gives 0.
    pub fn elem_count(&self) -> usize {
        self.0.iter().product::<usize>()
    }

    /// Size of a specific dimension.
    pub fn dim(&self, d: usize) -> crate::Result<usize> {
        self.0.get(d).copied().ok_or(crate::Error::DimOutOfRange {
            dim: d as i64,
            rank: self.rank(),
        })
    }

    /// Resolve a possibly negative axis against this shape's rank.
    ///
    /// Valid axes lie in `[-rank, rank)`. A scalar has no valid axis.
    pub fn normalize_axis(&self, axis: i64) -> crate::Result<usize> {
        let rank = self.rank() as i64;
        let resolved = if axis < 0 { axis + rank } else { axis };
        if resolved < 0 || resolved >= rank {
            return Err(crate::Error::DimOutOfRange {
                dim: axis,
                rank: self.rank(),
            });
        }
        Ok(resolved as usize)
    }

    /// Split the shape around `axis` into `(outer, axis_len, inner)` extents.
    ///
    /// Element `(o, a, i)` lives at flat index `(o * axis_len + a) * inner + i`.
    pub fn split_at_axis(&self, axis: usize) -> crate::Result<(usize, usize, usize)> {
        let axis_len = self.dim(axis)?;
        let outer = self.0[..axis].iter().product::<usize>();
        let inner = self.0[axis + 1..].iter().product::<usize>();
        Ok((outer, axis_len, inner))
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, "]")
    }
}

// Convenient From implementations
// These let you write: Shape::from((3, 4)) instead of Shape::new(vec![3, 4])

impl From<()> for Shape {
    /// Scalar shape (0 dimensions).
    fn from(_: ()) -> Self {
        Shape(vec![])
    }
}

impl From<usize> for Shape {
    fn from(d: usize) -> Self {
        Shape(vec![d])
    }
}

impl From<(usize,)> for Shape {
    fn from((d0,): (usize,)) -> Self {
        Shape(vec![d0])
    }
}

impl From<(usize, usize)> for Shape {
    fn from((d0, d1): (usize, usize)) -> Self {
        Shape(vec![d0, d1])
    }
}

impl From<(usize, usize, usize)> for Shape {
    fn from((d0, d1, d2): (usize, usize, usize)) -> Self {
        Shape(vec![d0, d1, d2])
    }
}

impl From<(usize, usize, usize, usize)> for Shape {
    fn from((d0, d1, d2, d3): (usize, usize, usize, usize)) -> Self {
        Shape(vec![d0, d1, d2, d3])
    }
}

impl From<Vec<usize>> for Shape {
    fn from(v: Vec<usize>) -> Self {
        Shape(v)
    }
}

impl From<&[usize]> for Shape {
    fn from(s: &[usize]) -> Self {
        Shape(s.to_vec())
    }
}

impl From<&Shape> for Shape {
    fn from(s: &Shape) -> Self {
        s.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_and_empty() {
        assert_eq!(Shape::from(()).elem_count(), 1);
        assert_eq!(Shape::from((3, 0)).elem_count(), 0);
    }

    #[test]
    fn test_3d_elem_count() {
        let s = Shape::from((2, 3, 4));
        assert_eq!(s.rank(), 3);
        assert_eq!(s.elem_count(), 24);
    }

    #[test]
    fn test_normalize_axis() {
        let s = Shape::from((2, 3, 4));
        assert_eq!(s.normalize_axis(-1).unwrap(), 2);
        assert_eq!(s.normalize_axis(-3).unwrap(), 0);
        assert_eq!(s.normalize_axis(1).unwrap(), 1);
        assert!(matches!(
            s.normalize_axis(3),
            Err(crate::Error::DimOutOfRange { dim: 3, rank: 3 })
        ));
        assert!(s.normalize_axis(-4).is_err());
        assert!(Shape::from(()).normalize_axis(-1).is_err());
    }

    #[test]
    fn test_split_at_axis() {
        let s = Shape::from((2, 3, 4));
        assert_eq!(s.split_at_axis(0).unwrap(), (1, 2, 12));
        assert_eq!(s.split_at_axis(1).unwrap(), (2, 3, 4));
        assert_eq!(s.split_at_axis(2).unwrap(), (6, 4, 1));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Shape::from((3, 4))), "[3, 4]");
    }
}
