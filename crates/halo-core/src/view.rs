use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::{
    DType, Layout, LayoutError, MajorOrder, Padding, Shape, StorageViewIter, Strides, ViewDType,
};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("Buffer holds {actual} elements, layout requires {required}.")]
    BufferTooSmall { required: usize, actual: usize },
    #[error("Layout reaches offset {offset}, before the start of the buffer.")]
    NegativeOffset { offset: isize },
    #[error("{dt} elements are {expected} bytes wide, the buffer's element type is {actual}.")]
    ElementSize {
        dt: DType,
        expected: usize,
        actual: usize,
    },
    #[error("DType mismatch, expected {expected:?}, got {actual:?}.")]
    DTypeMismatch { expected: DType, actual: DType },
    #[error("Byte length mismatch, view holds {expected} bytes, buffer has {actual}.")]
    ByteLengthMismatch { expected: usize, actual: usize },
    #[error("Expected {expected} indices, got {actual}.")]
    IndexRank { expected: usize, actual: usize },
    #[error("Index {index} out of range for dim {dim} of extent {extent}.")]
    IndexOutOfRange {
        dim: usize,
        index: usize,
        extent: usize,
    },
}

/// # StorageView
///
/// A non-owning handle onto a strided, possibly padded buffer.
///
/// The pointer addresses the first *allocated* element, left padding
/// included. The view never allocates or frees it; the buffer must outlive
/// the view and every [`StorageViewIter`] derived from it.
#[derive(Clone)]
pub struct StorageView<'a> {
    ptr: NonNull<u8>,
    dt: DType,
    layout: Layout,
    _buffer: PhantomData<&'a mut [u8]>,
}

impl<'a> StorageView<'a> {
    /// Views a typed buffer owned elsewhere.
    ///
    /// The slice start is the base pointer, so every allocated cell of
    /// `layout` must land inside `data`. Layouts with negative strides need
    /// [`from_raw_parts`](Self::from_raw_parts) and a base inside the buffer.
    pub fn new<T: ViewDType>(data: &'a mut [T], layout: Layout) -> Result<Self, ViewError> {
        let dt = T::dt();
        if dt.size_of() != std::mem::size_of::<T>() {
            return Err(ViewError::ElementSize {
                dt,
                expected: dt.size_of(),
                actual: std::mem::size_of::<T>(),
            });
        }
        if let Some((lo, hi)) = layout.offset_bounds() {
            if lo < 0 {
                return Err(ViewError::NegativeOffset { offset: lo });
            }
            let required = hi as usize + 1;
            if data.len() < required {
                return Err(ViewError::BufferTooSmall {
                    required,
                    actual: data.len(),
                });
            }
        }
        Ok(Self {
            ptr: NonNull::from(data).cast::<u8>(),
            dt,
            layout,
            _buffer: PhantomData,
        })
    }

    /// Views a typed buffer, deriving strides from `order` and the padded extents.
    pub fn from_shape<T: ViewDType>(
        data: &'a mut [T],
        shape: Shape,
        padding: Padding,
        order: MajorOrder,
    ) -> Result<Self, ViewError> {
        let layout = Layout::new(shape, padding, order)?;
        Self::new(data, layout)
    }

    /// Views memory described only by a pointer and its owner's metadata.
    ///
    /// # Safety
    /// For the whole lifetime `'a`, every element offset in
    /// `layout.offset_bounds()` from `ptr` must be valid for reads and writes
    /// of one `dt` element.
    pub unsafe fn from_raw_parts(ptr: NonNull<u8>, dt: DType, layout: Layout) -> Self {
        Self {
            ptr,
            dt,
            layout,
            _buffer: PhantomData,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn shape(&self) -> &Shape {
        self.layout.shape()
    }

    pub fn strides(&self) -> &Strides {
        self.layout.strides()
    }

    pub fn padding(&self) -> &Padding {
        self.layout.padding()
    }

    pub fn dt(&self) -> DType {
        self.dt
    }

    pub fn rank(&self) -> usize {
        self.layout.rank()
    }

    /// Pointer passed at construction, not adjusted for padding.
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    pub fn as_mut_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Number of logical elements.
    pub fn numel(&self) -> usize {
        self.layout.logical_size()
    }

    pub fn bytes_per_element(&self) -> usize {
        self.dt.size_of()
    }

    pub fn num_bytes(&self) -> usize {
        self.numel() * self.bytes_per_element()
    }

    /// Physical element offset of `index`, padding included. Unchecked.
    #[inline]
    pub fn offset_of(&self, index: &[usize]) -> isize {
        self.layout.offset_of(index)
    }

    pub fn try_offset_of(&self, index: &[usize]) -> Result<isize, ViewError> {
        if index.len() != self.rank() {
            return Err(ViewError::IndexRank {
                expected: self.rank(),
                actual: index.len(),
            });
        }
        for (dim, (&index, &extent)) in index.iter().zip(self.shape().iter()).enumerate() {
            if index >= extent {
                return Err(ViewError::IndexOutOfRange { dim, index, extent });
            }
        }
        Ok(self.offset_of(index))
    }

    /// Address of the logical element at `index`. Unchecked.
    #[inline]
    pub fn ptr_at(&self, index: &[usize]) -> *mut u8 {
        self.byte_ptr(self.offset_of(index))
    }

    /// Address of the first logical element.
    pub fn first_logical_ptr(&self) -> *mut u8 {
        self.byte_ptr(self.layout.origin_offset())
    }

    #[inline]
    pub(crate) fn byte_ptr(&self, offset: isize) -> *mut u8 {
        self.ptr
            .as_ptr()
            .wrapping_offset(offset * self.bytes_per_element() as isize)
    }

    /// True if the logical elements form a single run in memory, so the
    /// whole view can be moved with one copy starting at
    /// [`first_logical_ptr`](Self::first_logical_ptr).
    pub fn is_mem_copyable(&self) -> bool {
        self.layout.is_contiguous()
    }

    pub fn begin(&self) -> StorageViewIter<'_, 'a> {
        StorageViewIter::begin(self)
    }

    pub fn end(&self) -> StorageViewIter<'_, 'a> {
        StorageViewIter::end(self)
    }

    /// Element addresses in storage order.
    pub fn iter(&self) -> StorageViewIter<'_, 'a> {
        self.begin()
    }

    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }

    fn check_bytes(&self, actual: usize) -> Result<(), ViewError> {
        let expected = self.num_bytes();
        if expected != actual {
            return Err(ViewError::ByteLengthMismatch { expected, actual });
        }
        Ok(())
    }

    fn check_dtype<T: ViewDType>(&self) -> Result<(), ViewError> {
        if T::dt() != self.dt {
            return Err(ViewError::DTypeMismatch {
                expected: self.dt,
                actual: T::dt(),
            });
        }
        Ok(())
    }

    /// Scatters densely packed elements, given in storage order, into the view.
    pub fn copy_from_bytes(&mut self, src: &[u8]) -> Result<(), ViewError> {
        self.check_bytes(src.len())?;
        if src.is_empty() {
            return Ok(());
        }
        if self.is_mem_copyable() {
            log::trace!("Bulk copy of {} bytes into {}", src.len(), self);
            // SAFETY: the logical block is one run of num_bytes() bytes inside the buffer.
            unsafe {
                std::ptr::copy_nonoverlapping(src.as_ptr(), self.first_logical_ptr(), src.len())
            };
            return Ok(());
        }
        log::trace!("Element-wise copy of {} bytes into {}", src.len(), self);
        let bpe = self.bytes_per_element();
        for (dst, chunk) in self.iter().zip(src.chunks_exact(bpe)) {
            // SAFETY: every cursor address is a logical element inside the buffer.
            unsafe { std::ptr::copy_nonoverlapping(chunk.as_ptr(), dst, bpe) };
        }
        Ok(())
    }

    /// Gathers the logical elements, in storage order, into a dense buffer.
    pub fn copy_to_bytes(&self, dst: &mut [u8]) -> Result<(), ViewError> {
        self.check_bytes(dst.len())?;
        if dst.is_empty() {
            return Ok(());
        }
        if self.is_mem_copyable() {
            log::trace!("Bulk copy of {} bytes out of {}", dst.len(), self);
            // SAFETY: the logical block is one run of num_bytes() bytes inside the buffer.
            unsafe {
                std::ptr::copy_nonoverlapping(self.first_logical_ptr(), dst.as_mut_ptr(), dst.len())
            };
            return Ok(());
        }
        log::trace!("Element-wise copy of {} bytes out of {}", dst.len(), self);
        let bpe = self.bytes_per_element();
        for (src, chunk) in self.iter().zip(dst.chunks_exact_mut(bpe)) {
            // SAFETY: every cursor address is a logical element inside the buffer.
            unsafe { std::ptr::copy_nonoverlapping(src, chunk.as_mut_ptr(), bpe) };
        }
        Ok(())
    }

    pub fn copy_from_slice<T: ViewDType>(&mut self, src: &[T]) -> Result<(), ViewError> {
        self.check_dtype::<T>()?;
        self.copy_from_bytes(bytemuck::cast_slice(src))
    }

    pub fn to_vec<T: ViewDType>(&self) -> Result<Vec<T>, ViewError> {
        self.check_dtype::<T>()?;
        let mut out = vec![T::zero(); self.numel()];
        self.copy_to_bytes(bytemuck::cast_slice_mut(&mut out))?;
        Ok(out)
    }
}

impl PartialEq for StorageView<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
            && self.dt == other.dt
            && self.shape() == other.shape()
            && self.strides() == other.strides()
            && self.padding() == other.padding()
    }
}

impl Eq for StorageView<'_> {}

impl std::fmt::Debug for StorageView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageView")
            .field("data", &self.ptr)
            .field("dt", &self.dt)
            .field("shape", self.shape())
            .field("strides", self.strides())
            .field("padding", self.padding())
            .finish()
    }
}

impl std::fmt::Display for StorageView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "StorageView<{}>{:?} strides={:?} padding={:?}",
            self.dt,
            self.shape(),
            self.strides(),
            self.padding()
        )
    }
}
