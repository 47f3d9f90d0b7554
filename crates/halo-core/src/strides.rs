use crate::{rvec, MajorOrder, Padding, RVec, Shape};
use serde::{Deserialize, Serialize};

/// Per-dimension element strides (not bytes).
#[derive(Clone, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct Strides(RVec<isize>);

impl Strides {
    pub fn new(strides: RVec<isize>) -> Self {
        Self(strides)
    }

    /// Derives strides from the padded extents of each dimension.
    ///
    /// Row major gives the last dimension stride 1, column major the first.
    /// Padding must already have the same rank as `shape`.
    pub fn compute(shape: &Shape, padding: &Padding, order: MajorOrder) -> Self {
        let rank = shape.rank();
        let mut strides = rvec![1isize; rank];
        if rank < 2 {
            return Self(strides);
        }
        let padded = |i: usize| padding[i].padded(shape[i]) as isize;
        match order {
            MajorOrder::RowMajor => {
                for i in (0..rank - 1).rev() {
                    strides[i] = strides[i + 1] * padded(i + 1);
                }
            }
            MajorOrder::ColMajor => {
                for i in 1..rank {
                    strides[i] = strides[i - 1] * padded(i - 1);
                }
            }
        }
        Self(strides)
    }

    pub fn inner(&self) -> &RVec<isize> {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &isize> {
        self.0.iter()
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    pub fn to_vec(&self) -> Vec<isize> {
        self.0.to_vec()
    }
}

impl std::fmt::Debug for Strides {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut shape = format!("[{}", self.0.first().unwrap_or(&0));
        for dim in self.0.iter().skip(1) {
            shape.push_str(&format!("x{}", dim));
        }
        write!(f, "{}]", shape)
    }
}

impl std::ops::Index<usize> for Strides {
    type Output = isize;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

/// Unpadded row-major strides.
impl From<&Shape> for Strides {
    fn from(shape: &Shape) -> Self {
        let mut strides = rvec![];
        let mut stride = 1;
        for size in shape.inner().iter().rev() {
            strides.push(stride);
            stride *= *size as isize;
        }
        strides.reverse();
        Self(strides)
    }
}

impl From<Vec<isize>> for Strides {
    fn from(strides: Vec<isize>) -> Self {
        Self(strides.into())
    }
}

impl From<&[isize]> for Strides {
    fn from(strides: &[isize]) -> Self {
        Self(strides.into())
    }
}

impl<const N: usize> From<[isize; N]> for Strides {
    fn from(strides: [isize; N]) -> Self {
        Self(strides.iter().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{padding, shape};

    #[test]
    fn test_strides() {
        let shape = shape![2, 3, 4];
        let strides = Strides::from(&shape);
        assert_eq!(strides.to_vec(), vec![12, 4, 1]);
    }

    #[test]
    fn test_row_major_matches_unpadded() {
        let shape = shape![2, 3, 4];
        let strides = Strides::compute(&shape, &Padding::zeros(3), MajorOrder::RowMajor);
        assert_eq!(strides, Strides::from(&shape));
    }

    #[test]
    fn test_col_major_padded() {
        let shape = shape![2, 3];
        let padding = padding![(1, 2), (3, 1)];
        let strides = Strides::compute(&shape, &padding, MajorOrder::ColMajor);
        assert_eq!(strides.to_vec(), vec![1, 5]);

        let strides = Strides::compute(&shape, &padding, MajorOrder::RowMajor);
        assert_eq!(strides.to_vec(), vec![7, 1]);
    }

    #[test]
    fn test_low_rank() {
        for order in [MajorOrder::RowMajor, MajorOrder::ColMajor] {
            let one = Strides::compute(&shape![5], &padding![(2, 2)], order);
            assert_eq!(one.to_vec(), vec![1]);
            let zero = Strides::compute(&shape![], &Padding::zeros(0), order);
            assert_eq!(zero.rank(), 0);
        }
    }

    #[test]
    fn test_five_dims_padded() {
        let shape = shape![2, 3, 4, 2, 2];
        let padding = padding![(1, 2), (3, 1), (0, 1), (0, 0), (1, 0)];
        let col = Strides::compute(&shape, &padding, MajorOrder::ColMajor);
        assert_eq!(col.to_vec(), vec![1, 5, 35, 175, 350]);
        let row = Strides::compute(&shape, &padding, MajorOrder::RowMajor);
        assert_eq!(row.to_vec(), vec![210, 30, 6, 3, 1]);
    }
}
