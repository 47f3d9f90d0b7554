use serde::{Deserialize, Serialize};

use crate::{Padding, Shape, Strides};

#[cfg(test)]
use test_strategy::Arbitrary;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("Invalid layout: rank mismatch between shape ({shape}), padding ({padding}) and strides ({strides}).")]
    InvalidLayout {
        shape: usize,
        padding: usize,
        strides: usize,
    },
    #[error("Layout {shape:?} with padding {padding:?} addresses more elements than fit in isize.")]
    Overflow { shape: Shape, padding: Padding },
}

/// Which dimension varies fastest in linear memory.
#[cfg_attr(test, derive(Arbitrary))]
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumIter,
)]
pub enum MajorOrder {
    /// Stride 1 in the last dimension.
    #[default]
    RowMajor,
    /// Stride 1 in the first dimension.
    ColMajor,
}

/// # Layout
///
/// Shape, halo padding and strides of a strided buffer. All three always have
/// the same rank, and every allocated cell has an element offset that fits in
/// `isize`. Deserialized layouts are checked the same way.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawLayout")]
pub struct Layout {
    shape: Shape,
    padding: Padding,
    strides: Strides,
    order: Option<MajorOrder>,
}

#[derive(Deserialize)]
struct RawLayout {
    shape: Shape,
    padding: Padding,
    strides: Strides,
    order: Option<MajorOrder>,
}

impl TryFrom<RawLayout> for Layout {
    type Error = LayoutError;

    fn try_from(raw: RawLayout) -> Result<Self, Self::Error> {
        Self::check_rank(&raw.shape, &raw.padding, raw.strides.rank())?;
        Self::check_span(&raw.shape, &raw.padding, &raw.strides)?;
        Ok(Self {
            shape: raw.shape,
            padding: raw.padding,
            strides: raw.strides,
            order: raw.order,
        })
    }
}

impl Layout {
    /// Builds a layout whose strides are derived from the padded extents.
    pub fn new(shape: Shape, padding: Padding, order: MajorOrder) -> Result<Self, LayoutError> {
        Self::check_rank(&shape, &padding, shape.rank())?;
        // Derived strides are partial products of the non-zero padded extents.
        shape
            .iter()
            .zip(padding.iter())
            .try_fold(1usize, |acc, (&extent, pad)| {
                let padded = pad.left.checked_add(extent)?.checked_add(pad.right)?;
                acc.checked_mul(padded.max(1))
            })
            .filter(|&n| n <= isize::MAX as usize)
            .ok_or_else(|| Self::overflow(&shape, &padding))?;
        let strides = Strides::compute(&shape, &padding, order);
        Self::check_span(&shape, &padding, &strides)?;
        Ok(Self {
            shape,
            padding,
            strides,
            order: Some(order),
        })
    }

    pub fn unpadded(shape: Shape, order: MajorOrder) -> Result<Self, LayoutError> {
        let padding = Padding::zeros(shape.rank());
        Self::new(shape, padding, order)
    }

    /// Builds a layout from strides already known to the buffer's owner.
    /// The strides are stored as given.
    pub fn from_parts(
        shape: Shape,
        strides: Strides,
        padding: Padding,
    ) -> Result<Self, LayoutError> {
        Self::check_rank(&shape, &padding, strides.rank())?;
        Self::check_span(&shape, &padding, &strides)?;
        Ok(Self {
            shape,
            padding,
            strides,
            order: None,
        })
    }

    fn check_rank(shape: &Shape, padding: &Padding, strides: usize) -> Result<(), LayoutError> {
        if shape.rank() != padding.len() || shape.rank() != strides {
            let err = LayoutError::InvalidLayout {
                shape: shape.rank(),
                padding: padding.len(),
                strides,
            };
            log::debug!("Rejected layout {:?} / {:?}: {}", shape, padding, err);
            return Err(err);
        }
        Ok(())
    }

    fn overflow(shape: &Shape, padding: &Padding) -> LayoutError {
        let err = LayoutError::Overflow {
            shape: shape.clone(),
            padding: padding.clone(),
        };
        log::debug!("Rejected layout: {}", err);
        err
    }

    fn checked_allocated_size(shape: &Shape, padding: &Padding) -> Option<usize> {
        shape.iter().zip(padding.iter()).try_fold(1usize, |acc, (&extent, pad)| {
            let padded = pad.left.checked_add(extent)?.checked_add(pad.right)?;
            acc.checked_mul(padded)
        })
    }

    /// The allocated size and the distance between the lowest and highest
    /// allocated offsets must both fit in `isize`.
    fn check_span(shape: &Shape, padding: &Padding, strides: &Strides) -> Result<(), LayoutError> {
        let span = shape
            .iter()
            .zip(padding.iter())
            .zip(strides.iter())
            .try_fold(0usize, |acc, ((&extent, pad), &stride)| {
                let padded = pad.left.checked_add(extent)?.checked_add(pad.right)?;
                let reach = padded.saturating_sub(1).checked_mul(stride.unsigned_abs())?;
                acc.checked_add(reach)
            });
        let allocated = Self::checked_allocated_size(shape, padding);
        match (span, allocated) {
            (Some(span), Some(n)) if span < isize::MAX as usize && n <= isize::MAX as usize => {
                Ok(())
            }
            _ => Err(Self::overflow(shape, padding)),
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn padding(&self) -> &Padding {
        &self.padding
    }

    pub fn strides(&self) -> &Strides {
        &self.strides
    }

    /// The order the strides were derived from, `None` for owner supplied strides.
    pub fn major_order(&self) -> Option<MajorOrder> {
        self.order
    }

    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    pub fn logical_size(&self) -> usize {
        self.shape.numel()
    }

    pub fn allocated_size(&self) -> usize {
        self.padded_extents().product()
    }

    pub fn padded_extents(&self) -> impl Iterator<Item = usize> + '_ {
        self.shape
            .iter()
            .zip(self.padding.iter())
            .map(|(&extent, pad)| pad.padded(extent))
    }

    /// Elements a backing buffer needs so that every allocated cell is in bounds.
    ///
    /// Counts the span between the lowest and highest offset, so with negative
    /// strides the buffer must also extend before the base pointer.
    pub fn required_len(&self) -> usize {
        match self.offset_bounds() {
            Some((lo, hi)) => (hi - lo) as usize + 1,
            None => 0,
        }
    }

    /// Lowest and highest element offset of any allocated cell, relative to
    /// the base pointer. `None` when some padded extent is zero.
    pub fn offset_bounds(&self) -> Option<(isize, isize)> {
        let (mut lo, mut hi) = (0isize, 0isize);
        for (extent, &stride) in self.padded_extents().zip(self.strides.iter()) {
            if extent == 0 {
                return None;
            }
            let reach = (extent - 1) as isize * stride;
            if reach < 0 {
                lo += reach;
            } else {
                hi += reach;
            }
        }
        Some((lo, hi))
    }

    /// Physical element offset of a logical multi-index.
    ///
    /// Indices are not bounds checked.
    #[inline]
    pub fn offset_of(&self, index: &[usize]) -> isize {
        debug_assert_eq!(index.len(), self.rank());
        index
            .iter()
            .zip(self.padding.iter())
            .zip(self.strides.iter())
            .map(|((&i, pad), &stride)| (pad.left + i) as isize * stride)
            .sum()
    }

    /// Offset of the first logical element.
    pub fn origin_offset(&self) -> isize {
        self.padding
            .iter()
            .zip(self.strides.iter())
            .map(|(pad, &stride)| pad.left as isize * stride)
            .sum()
    }

    /// Dimensions ordered from fastest to slowest varying in memory.
    ///
    /// Sorted by ascending stride magnitude; equal strides keep the lower
    /// dimension first.
    pub fn storage_order(&self) -> crate::RVec<usize> {
        let mut dims: crate::RVec<usize> = (0..self.rank()).collect();
        dims.sort_by_key(|&d| self.strides[d].unsigned_abs());
        dims
    }

    /// True if the logical elements occupy one gap free run of memory.
    pub fn is_contiguous(&self) -> bool {
        if self.shape.has_zero_extent() {
            return true;
        }
        // Dimensions of extent 1 never move the cursor, whatever their halo.
        let dims = self
            .storage_order()
            .into_iter()
            .filter(|&d| self.shape[d] > 1)
            .collect::<crate::RVec<usize>>();
        let Some((&outer, inner)) = dims.split_last() else {
            return true;
        };

        let mut expected = 1isize;
        for &d in inner {
            if !self.padding[d].is_zero() || self.strides[d] != expected {
                return false;
            }
            expected *= self.shape[d] as isize;
        }
        // Outer padding only shifts the start of the block or trails it.
        self.strides[outer] == expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{padding, shape};
    use strum::IntoEnumIterator;

    #[test]
    fn test_rank_mismatch() {
        let err = Layout::new(shape![2, 3], padding![(1, 1)], MajorOrder::RowMajor).unwrap_err();
        assert_eq!(
            err,
            LayoutError::InvalidLayout {
                shape: 2,
                padding: 1,
                strides: 2
            }
        );

        let err = Layout::from_parts(shape![2, 3], Strides::from([1]), Padding::zeros(2));
        assert!(err.is_err());
    }

    #[test]
    fn test_sizes() {
        let layout = Layout::new(
            shape![2, 3],
            padding![(1, 2), (3, 1)],
            MajorOrder::ColMajor,
        )
        .unwrap();
        assert_eq!(layout.logical_size(), 6);
        assert_eq!(layout.allocated_size(), 5 * 7);
        assert_eq!(layout.required_len(), 35);

        let unpadded = Layout::unpadded(shape![2, 3, 4], MajorOrder::RowMajor).unwrap();
        assert_eq!(unpadded.logical_size(), unpadded.allocated_size());

        let scalar = Layout::unpadded(shape![], MajorOrder::ColMajor).unwrap();
        assert_eq!(scalar.logical_size(), 1);
        assert_eq!(scalar.allocated_size(), 1);
        assert_eq!(scalar.required_len(), 1);
    }

    #[test]
    fn test_offset_of() {
        let layout = Layout::new(
            shape![2, 3],
            padding![(1, 2), (3, 1)],
            MajorOrder::ColMajor,
        )
        .unwrap();
        assert_eq!(layout.strides().to_vec(), vec![1, 5]);
        assert_eq!(layout.offset_of(&[0, 0]), 16);
        assert_eq!(layout.origin_offset(), 16);
        assert_eq!(layout.offset_of(&[1, 2]), 2 + 5 * 5);
    }

    #[test]
    fn test_storage_order() {
        let row = Layout::unpadded(shape![2, 3, 4], MajorOrder::RowMajor).unwrap();
        assert_eq!(row.storage_order().to_vec(), vec![2, 1, 0]);
        let col = Layout::unpadded(shape![2, 3, 4], MajorOrder::ColMajor).unwrap();
        assert_eq!(col.storage_order().to_vec(), vec![0, 1, 2]);
    }

    #[test]
    fn test_unpadded_is_contiguous() {
        for order in MajorOrder::iter() {
            for shape in [shape![], shape![2], shape![2, 3], shape![3, 1], shape![2, 3, 4]] {
                assert!(Layout::unpadded(shape, order).unwrap().is_contiguous());
            }
        }
    }

    #[test]
    fn test_inner_padding_breaks_contiguity() {
        let col = Layout::new(
            shape![2, 3],
            padding![(1, 2), (3, 1)],
            MajorOrder::ColMajor,
        )
        .unwrap();
        assert!(!col.is_contiguous());

        let row = Layout::new(shape![2, 3], padding![(0, 0), (0, 1)], MajorOrder::RowMajor)
            .unwrap();
        assert!(!row.is_contiguous());
    }

    #[test]
    fn test_outer_padding_keeps_contiguity() {
        let one = Layout::new(shape![2], padding![(1, 2)], MajorOrder::ColMajor).unwrap();
        assert!(one.is_contiguous());

        let row = Layout::new(shape![2, 3], padding![(1, 2), (0, 0)], MajorOrder::RowMajor)
            .unwrap();
        assert!(row.is_contiguous());

        let col = Layout::new(shape![2, 3], padding![(0, 0), (3, 1)], MajorOrder::ColMajor)
            .unwrap();
        assert!(col.is_contiguous());
    }

    #[test]
    fn test_foreign_strides() {
        // Every other element of a 1-D buffer.
        let strided =
            Layout::from_parts(shape![4], Strides::from([2]), Padding::zeros(1)).unwrap();
        assert!(!strided.is_contiguous());
        assert_eq!(strided.required_len(), 7);
        assert_eq!(strided.major_order(), None);
    }

    #[test]
    fn test_unit_extent_padding_keeps_contiguity() {
        // Dim 0 has the largest stride and a halo-free extent of 1; the halo on
        // dim 1 sits outside the single logical run.
        let layout = Layout::new(shape![1, 2], padding![(0, 0), (1, 1)], MajorOrder::RowMajor)
            .unwrap();
        assert_eq!(layout.strides().to_vec(), vec![4, 1]);
        assert!(layout.is_contiguous());
        assert_eq!(layout.offset_of(&[0, 1]), layout.offset_of(&[0, 0]) + 1);

        let halo_outer =
            Layout::new(shape![1, 2], padding![(2, 1), (0, 0)], MajorOrder::RowMajor).unwrap();
        assert!(halo_outer.is_contiguous());
    }

    #[test]
    fn test_overflow_is_rejected() {
        let err = Layout::new(shape![usize::MAX / 2, 4], Padding::zeros(2), MajorOrder::RowMajor)
            .unwrap_err();
        assert!(matches!(err, LayoutError::Overflow { .. }));

        // A zero extent does not hide overflowing partial strides.
        let err = Layout::new(
            shape![0, usize::MAX / 2, 4],
            Padding::zeros(3),
            MajorOrder::RowMajor,
        );
        assert!(matches!(err, Err(LayoutError::Overflow { .. })));

        let err = Layout::new(shape![2], padding![(usize::MAX, 1)], MajorOrder::ColMajor);
        assert!(matches!(err, Err(LayoutError::Overflow { .. })));

        let err = Layout::from_parts(shape![3], Strides::from([isize::MAX]), Padding::zeros(1));
        assert!(matches!(err, Err(LayoutError::Overflow { .. })));
    }

    #[test]
    fn test_negative_stride_bounds() {
        let reversed =
            Layout::from_parts(shape![4, 2], Strides::from([-2, 1]), Padding::zeros(2)).unwrap();
        assert_eq!(reversed.offset_bounds(), Some((-6, 1)));
        assert_eq!(reversed.required_len(), 8);
        assert!(!reversed.is_contiguous());

        let empty = Layout::unpadded(shape![3, 0], MajorOrder::RowMajor).unwrap();
        assert_eq!(empty.offset_bounds(), None);
        assert_eq!(empty.required_len(), 0);
    }

    #[test]
    fn test_deserialize_checks_rank() {
        let json = r#"{"shape":[2,3],"padding":[{"left":0,"right":0}],"strides":[1,1],"order":null}"#;
        let err = serde_json::from_str::<Layout>(json).unwrap_err();
        assert!(err.to_string().contains("rank mismatch"));

        let json = r#"{"shape":[3],"padding":[{"left":0,"right":0}],"strides":[9223372036854775807],"order":null}"#;
        assert!(serde_json::from_str::<Layout>(json).is_err());

        let json = r#"{"shape":[2,3],"padding":[{"left":0,"right":0},{"left":0,"right":0}],"strides":[3,1],"order":"RowMajor"}"#;
        let layout: Layout = serde_json::from_str(json).unwrap();
        assert_eq!(layout, Layout::unpadded(shape![2, 3], MajorOrder::RowMajor).unwrap());
    }
}
