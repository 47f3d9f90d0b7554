use crate::RVec;
use serde::{Deserialize, Serialize};
use std::ops::RangeTo;

/// Logical extents of a view, one entry per dimension.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Shape(RVec<usize>);

impl Shape {
    pub fn new(shape: RVec<usize>) -> Self {
        Self(shape)
    }

    pub fn inner(&self) -> &RVec<usize> {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<&usize> {
        self.0.get(index)
    }

    /// Number of logical elements. A rank 0 shape holds a single element.
    pub fn numel(&self) -> usize {
        self.0.iter().product()
    }

    pub fn to_vec(&self) -> Vec<usize> {
        self.0.to_vec()
    }

    pub fn iter(&self) -> impl Iterator<Item = &usize> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rank(&self) -> usize {
        self.len()
    }

    /// True if any extent is zero, i.e. there are no logical elements.
    pub fn has_zero_extent(&self) -> bool {
        self.0.iter().any(|&d| d == 0)
    }
}

impl std::fmt::Debug for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut shape = format!("[{}", self.0.first().unwrap_or(&0));
        for dim in self.0.iter().skip(1) {
            shape.push_str(&format!("x{}", dim));
        }
        write!(f, "{}]", shape)
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl std::ops::Index<usize> for Shape {
    type Output = usize;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl std::ops::Index<RangeTo<usize>> for Shape {
    type Output = [usize];

    fn index(&self, index: RangeTo<usize>) -> &Self::Output {
        &self.0[index]
    }
}

impl From<Vec<usize>> for Shape {
    fn from(shape: Vec<usize>) -> Self {
        Self(shape.into())
    }
}

impl From<&[usize]> for Shape {
    fn from(slice: &[usize]) -> Self {
        Shape(slice.into())
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Shape(dims.iter().copied().collect())
    }
}

macro_rules! impl_try_into_for_shape {
    ($($N:expr),*) => {
        $(
            impl TryInto<[usize; $N]> for &Shape {
                type Error = anyhow::Error;

                fn try_into(self) -> Result<[usize; $N], Self::Error> {
                    if self.0.len() == $N {
                        let mut arr = [0; $N];
                        for (i, &item) in self.0.iter().enumerate().take($N) {
                            arr[i] = item;
                        }
                        Ok(arr)
                    } else {
                        Err(anyhow::anyhow!("Shape has length {} but expected {}", self.0.len(), $N))
                    }
                }
            }
        )*
    };
}

impl_try_into_for_shape!(0, 1, 2, 3, 4, 5);

#[cfg(test)]
mod tests {
    use crate::{shape, Shape};

    #[test]
    fn test_numel() {
        assert_eq!(shape![2, 3, 4].numel(), 24);
        assert_eq!(shape![].numel(), 1);
        assert_eq!(shape![3, 0, 2].numel(), 0);
        assert!(shape![3, 0, 2].has_zero_extent());
        assert_eq!(Shape::from([2, 3]), shape![2, 3]);
    }

    #[test]
    fn test_try_into_array() {
        let dims: [usize; 3] = (&shape![2, 3, 4]).try_into().unwrap();
        assert_eq!(dims, [2, 3, 4]);
        let wrong: anyhow::Result<[usize; 2]> = (&shape![2, 3, 4]).try_into();
        assert!(wrong.is_err());
    }

    #[test]
    fn test_debug_format() {
        assert_eq!(format!("{:?}", shape![2, 3, 4]), "[2x3x4]");
        assert_eq!(format!("{}", shape![2, 3]), "[2, 3]");
    }
}
