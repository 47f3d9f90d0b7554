use std::ptr::NonNull;

use crate::{Layout, LayoutError, MajorOrder, Padding, Shape, StorageView, ViewDType};

/// Owning padded buffer, the kind of external array a [`StorageView`] is
/// normally built over. Used for testing.
#[derive(Debug, Clone, PartialEq)]
pub struct Storage<T: ViewDType> {
    data: Vec<T>,
    layout: Layout,
}

impl<T: ViewDType> Storage<T> {
    pub fn zeros(shape: Shape, padding: Padding, order: MajorOrder) -> Result<Self, LayoutError> {
        let layout = Layout::new(shape, padding, order)?;
        let data = vec![T::zero(); layout.allocated_size()];
        Ok(Self { data, layout })
    }

    pub fn unpadded(shape: Shape, order: MajorOrder) -> Result<Self, LayoutError> {
        Self::zeros(shape.clone(), Padding::zeros(shape.rank()), order)
    }

    /// Fills every allocated cell, halo included, with its linear position.
    pub fn sequential(mut self) -> Self
    where
        T: num_traits::FromPrimitive,
    {
        for (i, x) in self.data.iter_mut().enumerate() {
            *x = T::from_usize(i).unwrap_or_else(T::zero);
        }
        self
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Element at a logical index. Panics if the index lands outside the buffer.
    pub fn at(&self, index: &[usize]) -> &T {
        &self.data[self.layout.offset_of(index) as usize]
    }

    pub fn at_mut(&mut self, index: &[usize]) -> &mut T {
        let offset = self.layout.offset_of(index) as usize;
        &mut self.data[offset]
    }

    /// First logical element, past the left halo of every dimension.
    pub fn origin_ptr(&self) -> *const T {
        self.data
            .as_ptr()
            .wrapping_offset(self.layout.origin_offset())
    }

    pub fn view(&mut self) -> StorageView<'_> {
        let ptr = NonNull::from(self.data.as_mut_slice()).cast::<u8>();
        // SAFETY: derived strides make the allocation exactly `required_len` elements
        // and the view borrows `self` mutably for its lifetime.
        unsafe { StorageView::from_raw_parts(ptr, T::dt(), self.layout.clone()) }
    }
}
