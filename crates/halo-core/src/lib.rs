//! Strided, padded views over externally owned multi-dimensional buffers.
//!
//! A [`StorageView`] pairs a raw pointer with a [`Layout`] (shape, halo padding
//! and strides) and a [`DType`] tag. It never owns or allocates the memory it
//! points at. Logical elements can be addressed with [`StorageView::offset_of`],
//! walked in storage order with [`StorageViewIter`], or moved in one block when
//! [`StorageView::is_mem_copyable`] holds.
mod dtype;
mod iter;
mod layout;
mod padding;
mod shape;
#[cfg(any(test, feature = "testing"))]
mod storage;
mod strides;
mod view;

pub use dtype::*;
pub use iter::*;
pub use layout::*;
pub use padding::*;
pub use shape::*;
#[cfg(any(test, feature = "testing"))]
pub use storage::*;
pub use strides::*;
pub use view::*;

use smallvec::SmallVec;
pub type RVec<T> = SmallVec<[T; 4]>;

//https://github.com/sonos/tract/blob/main/data/src/macros.rs#L2
#[macro_export]
macro_rules! rvec {
    (@one $x:expr) => (1usize);
    ($elem:expr; $n:expr) => ({
        $crate::RVec::from_elem($elem, $n)
    });
    ($($x:expr),*$(,)*) => ({
        let count = 0usize $(+ rvec![@one $x])*;
        #[allow(unused_mut)]
        let mut vec = $crate::RVec::new();
        if count <= vec.inline_size() {
            $(vec.push($x);)*
            vec
        } else {
            $crate::RVec::from_vec(vec![$($x,)*])
        }
    });
}

#[macro_export]
macro_rules! shape {
    ($($x:expr),*$(,)*) => ({
        use $crate::rvec;
        $crate::Shape::new(rvec![$($x,)*])
    });
}

/// Builds a [`Padding`] from `(left, right)` pairs.
#[macro_export]
macro_rules! padding {
    ($(($l:expr, $r:expr)),*$(,)*) => ({
        use $crate::rvec;
        $crate::Padding::new(rvec![$($crate::Pad::new($l, $r),)*])
    });
}

pub mod prelude {
    pub use crate::{
        padding, rvec, shape, DType, Layout, MajorOrder, Pad, Padding, Shape, StorageView,
        Strides, ViewDType,
    };
}
