use crate::{rvec, RVec};
use derive_new::new;
use serde::{Deserialize, Serialize};

/// Halo cells allocated before (`left`) and after (`right`) the logical
/// extent of one dimension.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Pad {
    pub left: usize,
    pub right: usize,
}

impl Pad {
    pub fn is_zero(&self) -> bool {
        self.left == 0 && self.right == 0
    }

    /// Allocated extent of a dimension with logical extent `extent`.
    #[inline]
    pub fn padded(&self, extent: usize) -> usize {
        self.left + extent + self.right
    }
}

impl From<(usize, usize)> for Pad {
    fn from((left, right): (usize, usize)) -> Self {
        Self { left, right }
    }
}

/// Per-dimension halo widths of a view.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Padding(RVec<Pad>);

impl Padding {
    pub fn new(padding: RVec<Pad>) -> Self {
        Self(padding)
    }

    /// All-zero padding for `rank` dimensions.
    pub fn zeros(rank: usize) -> Self {
        Self(rvec![Pad::default(); rank])
    }

    pub fn inner(&self) -> &RVec<Pad> {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pad> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(Pad::is_zero)
    }

    pub fn to_vec(&self) -> Vec<(usize, usize)> {
        self.0.iter().map(|p| (p.left, p.right)).collect()
    }
}

impl std::fmt::Debug for Padding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for pad in self.0.iter() {
            write!(f, " [{},{}]", pad.left, pad.right)?;
        }
        write!(f, " }}")
    }
}

impl std::ops::Index<usize> for Padding {
    type Output = Pad;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl From<Vec<(usize, usize)>> for Padding {
    fn from(pairs: Vec<(usize, usize)>) -> Self {
        Self(pairs.into_iter().map(Pad::from).collect())
    }
}

impl From<&[(usize, usize)]> for Padding {
    fn from(pairs: &[(usize, usize)]) -> Self {
        Self(pairs.iter().copied().map(Pad::from).collect())
    }
}

impl<const N: usize> From<[(usize, usize); N]> for Padding {
    fn from(pairs: [(usize, usize); N]) -> Self {
        Self(pairs.iter().copied().map(Pad::from).collect())
    }
}
