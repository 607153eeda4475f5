/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! One dimensional strided views.
//!
//! A [`VectorBase`] is what a matrix hands out for a single row or column. Along the
//! contiguous axis of the matrix the stride is 1; along the other axis the stride is the
//! length of the contiguous axis:
//!
//! ```text
//!   row-major 3x4             column 1 (stride 4)
//!   +-------------+
//!   | a0 a1 a2 a3 |             a1
//!   | b0 b1 b2 b3 |   ---->     b1
//!   | c0 c1 c2 c3 |             c1
//!   +-------------+
//! ```

use std::ops::{Index, IndexMut};

use thiserror::Error;

use crate::views::{CopyError, DenseData, MutDenseData};

/// Return the length of the slice underlying a vector with `len` elements spaced `stride`
/// apart.
pub fn linear_length(len: usize, stride: usize) -> usize {
    if len == 0 { 0 } else { (len - 1) * stride + 1 }
}

#[derive(Debug, Clone, Copy)]
pub struct VectorBase<T>
where
    T: DenseData,
{
    data: T,
    len: usize,
    // Distance between consecutive elements. Always at least 1.
    stride: usize,
}

#[derive(Debug, Error)]
#[non_exhaustive]
#[error(
    "tried to construct a vector of length {len} with stride {stride} over a slice of \
     length {data_len} (expected {})", linear_length(*len, *stride)
)]
pub struct TryFromError {
    data_len: usize,
    len: usize,
    stride: usize,
}

impl<T> VectorBase<T>
where
    T: DenseData,
{
    /// Construct a vector with `len` elements spaced `stride` apart.
    ///
    /// The slice must have exactly `linear_length(len, stride)` elements and `stride`
    /// must be non-zero.
    pub fn try_from(data: T, len: usize, stride: usize) -> Result<Self, TryFromError> {
        let data_len = data.as_slice().len();
        if stride == 0 || data_len != linear_length(len, stride) {
            Err(TryFromError {
                data_len,
                len,
                stride,
            })
        } else {
            Ok(Self { data, len, stride })
        }
    }

    /// Construct a contiguous vector over all of `data`.
    pub fn contiguous(data: T) -> Self {
        let len = data.as_slice().len();
        Self {
            data,
            len,
            stride: 1,
        }
    }

    pub(crate) fn from_parts(data: T, len: usize, stride: usize) -> Self {
        debug_assert!(stride != 0);
        debug_assert_eq!(data.as_slice().len(), linear_length(len, stride));
        Self { data, len, stride }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Return `true` if the vector does not own its memory.
    pub fn is_view(&self) -> bool {
        self.data.is_view()
    }

    /// Return the elements as a slice if they are adjacent in memory.
    pub fn as_contiguous(&self) -> Option<&[T::Elem]> {
        (self.stride == 1 || self.len <= 1).then(|| self.data.as_slice())
    }

    pub fn get(&self, i: usize) -> Option<&T::Elem> {
        if i < self.len {
            self.data.as_slice().get(i * self.stride)
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, i: usize) -> Option<&mut T::Elem>
    where
        T: MutDenseData,
    {
        if i < self.len {
            self.data.as_mut_slice().get_mut(i * self.stride)
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &T::Elem> {
        let slice = self.data.as_slice();
        let stride = self.stride;
        (0..self.len).map(move |i| &slice[i * stride])
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T::Elem>
    where
        T: MutDenseData,
    {
        let stride = self.stride;
        self.data.as_mut_slice().iter_mut().step_by(stride)
    }

    /// Copy the elements into `dst`, which must have exactly `self.len()` entries.
    pub fn copy_to(&self, dst: &mut [T::Elem]) -> Result<(), CopyError>
    where
        T::Elem: Clone,
    {
        if dst.len() != self.len {
            return Err(CopyError {
                len: self.len,
                dst: dst.len(),
            });
        }
        dst.iter_mut()
            .zip(self.iter())
            .for_each(|(d, s)| d.clone_from(s));
        Ok(())
    }

    pub fn to_vec(&self) -> Vec<T::Elem>
    where
        T::Elem: Clone,
    {
        self.iter().cloned().collect()
    }
}

impl<T> Index<usize> for VectorBase<T>
where
    T: DenseData,
{
    type Output = T::Elem;

    fn index(&self, i: usize) -> &Self::Output {
        assert!(i < self.len, "index {i} is out of bounds (max: {})", self.len);
        &self.data.as_slice()[i * self.stride]
    }
}

impl<T> IndexMut<usize> for VectorBase<T>
where
    T: MutDenseData,
{
    fn index_mut(&mut self, i: usize) -> &mut Self::Output {
        assert!(i < self.len, "index {i} is out of bounds (max: {})", self.len);
        let stride = self.stride;
        &mut self.data.as_mut_slice()[i * stride]
    }
}

/// An owned contiguous vector.
pub type Vector<T> = VectorBase<Box<[T]>>;

/// A borrowed, possibly strided, vector.
pub type VectorView<'a, T> = VectorBase<&'a [T]>;

/// A mutably borrowed, possibly strided, vector.
pub type MutVectorView<'a, T> = VectorBase<&'a mut [T]>;

impl<T> From<Vec<T>> for Vector<T> {
    fn from(data: Vec<T>) -> Self {
        Self::contiguous(data.into_boxed_slice())
    }
}
