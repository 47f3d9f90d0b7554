use std::iter::FusedIterator;

use crate::{rvec, RVec, StorageView};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Position {
    At { coords: RVec<usize>, offset: isize },
    End,
}

/// # StorageViewIter
///
/// Cursor over the logical elements of a [`StorageView`] in storage order:
/// the dimension with the smallest stride varies fastest, so a row major view
/// is walked last dimension first and a column major view first dimension
/// first. Padding cells are never visited.
///
/// Two cursors are equal when they point into the *same* view object at the
/// same position. Moving the cursor updates the offset incrementally.
#[derive(Debug, Clone)]
pub struct StorageViewIter<'v, 'a> {
    view: &'v StorageView<'a>,
    order: RVec<usize>,
    pos: Position,
    index: usize,
    numel: usize,
}

impl<'v, 'a> StorageViewIter<'v, 'a> {
    /// Positioned at the first logical element, or at the end of an empty view.
    pub fn begin(view: &'v StorageView<'a>) -> Self {
        let layout = view.layout();
        let numel = view.numel();
        let pos = if numel == 0 {
            Position::End
        } else {
            Position::At {
                coords: rvec![0; layout.rank()],
                offset: layout.origin_offset(),
            }
        };
        Self {
            view,
            order: layout.storage_order(),
            pos,
            index: 0,
            numel,
        }
    }

    /// One past the last logical element.
    pub fn end(view: &'v StorageView<'a>) -> Self {
        let numel = view.numel();
        Self {
            view,
            order: view.layout().storage_order(),
            pos: Position::End,
            index: numel,
            numel,
        }
    }

    pub fn view(&self) -> &'v StorageView<'a> {
        self.view
    }

    pub fn is_end(&self) -> bool {
        matches!(self.pos, Position::End)
    }

    /// Logical multi-index of the current element.
    pub fn coords(&self) -> Option<&[usize]> {
        match &self.pos {
            Position::At { coords, .. } => Some(coords),
            Position::End => None,
        }
    }

    /// Physical element offset of the current element, padding included.
    pub fn offset(&self) -> Option<isize> {
        match self.pos {
            Position::At { offset, .. } => Some(offset),
            Position::End => None,
        }
    }

    /// Address of the current element; null at the end.
    pub fn ptr(&self) -> *mut u8 {
        match self.pos {
            Position::At { offset, .. } => self.view.byte_ptr(offset),
            Position::End => std::ptr::null_mut(),
        }
    }

    /// Steps to the next logical element, carrying into slower dimensions.
    /// Does nothing at the end.
    pub fn advance(&mut self) {
        let Position::At { coords, offset } = &mut self.pos else {
            return;
        };
        let layout = self.view.layout();
        self.index += 1;
        for &d in self.order.iter() {
            let stride = layout.strides()[d];
            if coords[d] + 1 < layout.shape()[d] {
                coords[d] += 1;
                *offset += stride;
                return;
            }
            *offset -= coords[d] as isize * stride;
            coords[d] = 0;
        }
        self.pos = Position::End;
    }

    /// Steps to the previous logical element. From the end this is the last
    /// element; at the first element it does nothing.
    pub fn retreat(&mut self) {
        if self.index == 0 {
            return;
        }
        let layout = self.view.layout();
        self.index -= 1;
        if self.is_end() {
            let coords: RVec<usize> = layout.shape().iter().map(|&e| e - 1).collect();
            let offset = layout.offset_of(&coords);
            self.pos = Position::At { coords, offset };
            return;
        }
        let Position::At { coords, offset } = &mut self.pos else {
            return;
        };
        for &d in self.order.iter() {
            let stride = layout.strides()[d];
            if coords[d] > 0 {
                coords[d] -= 1;
                *offset -= stride;
                return;
            }
            let last = layout.shape()[d] - 1;
            coords[d] = last;
            *offset += last as isize * stride;
        }
    }

    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }
}

impl PartialEq for StorageViewIter<'_, '_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.view, other.view) && self.pos == other.pos
    }
}

impl Eq for StorageViewIter<'_, '_> {}

impl Iterator for StorageViewIter<'_, '_> {
    type Item = *mut u8;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_end() {
            return None;
        }
        let ptr = self.ptr();
        self.advance();
        Some(ptr)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.numel - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for StorageViewIter<'_, '_> {}

impl FusedIterator for StorageViewIter<'_, '_> {}
