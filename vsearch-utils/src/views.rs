/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use std::{
    borrow::Cow,
    fmt,
    ops::{Index, IndexMut},
};

#[cfg(feature = "rayon")]
use rayon::prelude::{IndexedParallelIterator, ParallelIterator, ParallelSlice, ParallelSliceMut};
use thiserror::Error;

use crate::vector::{self, MutVectorView, VectorView};

/// View types (such as [`MatrixView`]) give semantic meaning to blobs of data and need
/// immutable, mutable and owning variants.
///
/// This trait is implemented by every backing store a matrix can sit on top of, allowing
/// a single code path for all of them. Call sites only observe the dense slice; whether
/// the storage is owned or borrowed is reported by [`DenseData::is_view`].
///
/// # Safety
///
/// This trait is unsafe because it requires `as_slice` to be idempotent (and unsafe code
/// relies on this).
///
/// In other words: `as_slice` must **always** return the same slice with the same length.
pub unsafe trait DenseData {
    type Elem;

    /// Return the underlying data as a slice.
    fn as_slice(&self) -> &[Self::Elem];

    /// Return `true` if the memory is owned by someone else.
    fn is_view(&self) -> bool {
        true
    }
}

/// A mutable companion to `DenseData`.
///
/// # Safety
///
/// This trait is unsafe because it requires `as_mut_slice` to be idempotent and to span
/// the exact same memory as `as_slice`.
pub unsafe trait MutDenseData: DenseData {
    fn as_mut_slice(&mut self) -> &mut [Self::Elem];
}

// SAFETY: This fulfills the idempotency requirement.
unsafe impl<T> DenseData for &[T] {
    type Elem = T;
    fn as_slice(&self) -> &[Self::Elem] {
        self
    }
}

// SAFETY: This fulfills the idempotency requirement.
unsafe impl<T> DenseData for &mut [T] {
    type Elem = T;
    fn as_slice(&self) -> &[Self::Elem] {
        self
    }
}

// SAFETY: This fulfills the idempotency requirement and returns a slice spanning the same
// range as `as_slice`.
unsafe impl<T> MutDenseData for &mut [T] {
    fn as_mut_slice(&mut self) -> &mut [Self::Elem] {
        self
    }
}

// SAFETY: This fulfills the idempotency requirement.
unsafe impl<T> DenseData for Box<[T]> {
    type Elem = T;
    fn as_slice(&self) -> &[Self::Elem] {
        self
    }
    fn is_view(&self) -> bool {
        false
    }
}

// SAFETY: This fulfills the idempotency requirement and returns a slice spanning the same
// memory as `as_slice`.
unsafe impl<T> MutDenseData for Box<[T]> {
    fn as_mut_slice(&mut self) -> &mut [Self::Elem] {
        self
    }
}

// SAFETY: A `Cow` never changes variant behind a shared reference, so this is idempotent.
unsafe impl<T: Clone> DenseData for Cow<'_, [T]> {
    type Elem = T;
    fn as_slice(&self) -> &[Self::Elem] {
        self
    }
    fn is_view(&self) -> bool {
        matches!(self, Cow::Borrowed(_))
    }
}

/////////////
// Storage //
/////////////

/// Backing storage that is either owned by the matrix or borrowed from the caller.
///
/// This is the explicit ownership tag for matrices whose ownership is only known at
/// runtime (for example, a matrix that is sometimes read from disk and sometimes wraps a
/// buffer handed to us by a caller).
#[derive(Debug)]
pub enum Storage<'a, T> {
    Owned(Box<[T]>),
    Borrowed(&'a mut [T]),
}

// SAFETY: The variant never changes behind a shared reference.
unsafe impl<T> DenseData for Storage<'_, T> {
    type Elem = T;
    fn as_slice(&self) -> &[T] {
        match self {
            Self::Owned(data) => data,
            Self::Borrowed(data) => data,
        }
    }
    fn is_view(&self) -> bool {
        matches!(self, Self::Borrowed(_))
    }
}

// SAFETY: Both arms return the same memory as `as_slice`.
unsafe impl<T> MutDenseData for Storage<'_, T> {
    fn as_mut_slice(&mut self) -> &mut [T] {
        match self {
            Self::Owned(data) => data,
            Self::Borrowed(data) => data,
        }
    }
}

impl<T> From<Box<[T]>> for Storage<'_, T> {
    fn from(data: Box<[T]>) -> Self {
        Self::Owned(data)
    }
}

impl<T> From<Vec<T>> for Storage<'_, T> {
    fn from(data: Vec<T>) -> Self {
        Self::Owned(data.into_boxed_slice())
    }
}

impl<'a, T> From<&'a mut [T]> for Storage<'a, T> {
    fn from(data: &'a mut [T]) -> Self {
        Self::Borrowed(data)
    }
}

////////////
// Layout //
////////////

/// The order in which the elements of a matrix are laid out in memory.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layout {
    /// Consecutive elements of a row are adjacent.
    #[default]
    RowMajor,
    /// Consecutive elements of a column are adjacent.
    ColumnMajor,
}

impl Layout {
    /// Return the linear offset of `(row, col)` in a `nrows x ncols` matrix.
    #[inline]
    pub fn offset(self, row: usize, col: usize, nrows: usize, ncols: usize) -> usize {
        match self {
            Self::RowMajor => row * ncols + col,
            Self::ColumnMajor => col * nrows + row,
        }
    }

    /// Return the opposite layout.
    pub fn transpose(self) -> Self {
        match self {
            Self::RowMajor => Self::ColumnMajor,
            Self::ColumnMajor => Self::RowMajor,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::RowMajor => "row-major",
            Self::ColumnMajor => "col-major",
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

////////////
// Matrix //
////////////

/// A view over a dense chunk of memory, interpreting that memory as a 2-dimensional
/// matrix in either row-major or column-major order.
///
/// The layout is fixed at construction. Accessors that hand out contiguous row slices
/// ([`row`](Self::row), [`row_iter`](Self::row_iter), [`window_iter`](Self::window_iter))
/// require a row-major matrix; use [`as_row_major`](Self::as_row_major) or the strided
/// [`row_view`](Self::row_view) for column-major data.
///
/// When this type views immutable memory, it is `Copy`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixBase<T>
where
    T: DenseData,
{
    data: T,
    nrows: usize,
    ncols: usize,
    layout: Layout,
}

#[derive(Debug, Error)]
#[non_exhaustive]
#[error(
    "tried to construct a matrix view with {nrows} rows and {ncols} columns over a slice \
     of length {len}"
)]
pub struct TryFromErrorLight {
    len: usize,
    nrows: usize,
    ncols: usize,
}

#[derive(Error)]
#[non_exhaustive]
#[error(
    "tried to construct a matrix view with {nrows} rows and {ncols} columns over a slice \
     of length {}", data.as_slice().len()
)]
pub struct TryFromError<T: DenseData> {
    data: T,
    nrows: usize,
    ncols: usize,
}

// Manually implement `fmt::Debug` so we don't require `T::Debug`.
impl<T: DenseData> fmt::Debug for TryFromError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TryFromError")
            .field("data_len", &self.data.as_slice().len())
            .field("nrows", &self.nrows)
            .field("ncols", &self.ncols)
            .finish()
    }
}

impl<T: DenseData> TryFromError<T> {
    /// Consume the error and return the base data.
    pub fn into_inner(self) -> T {
        self.data
    }

    /// Return a variation of `Self` that is guaranteed to be `'static` by removing the
    /// data that was passed to the original constructor.
    pub fn as_static(&self) -> TryFromErrorLight {
        TryFromErrorLight {
            len: self.data.as_slice().len(),
            nrows: self.nrows,
            ncols: self.ncols,
        }
    }
}

/// Element access outside of the matrix bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("index ({row}, {col}) is out of range for a {nrows}x{ncols} matrix")]
pub struct OutOfRange {
    pub row: usize,
    pub col: usize,
    pub nrows: usize,
    pub ncols: usize,
}

/// A bulk copy into a destination of the wrong length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot copy {len} elements into a destination of length {dst}")]
pub struct CopyError {
    pub len: usize,
    pub dst: usize,
}

/// A generator for initializing the entries in a matrix via `Matrix::new`.
pub trait Generator<T> {
    fn generate(&mut self) -> T;
}

impl<T> Generator<T> for T
where
    T: Clone,
{
    fn generate(&mut self) -> T {
        self.clone()
    }
}

/// A matrix initializer that invokes the provided lambda to initialize each element.
pub struct Init<F>(pub F);

impl<T, F> Generator<T> for Init<F>
where
    F: FnMut() -> T,
{
    fn generate(&mut self) -> T {
        (self.0)()
    }
}

impl<T> MatrixBase<Box<[T]>> {
    /// Construct a new row-major Matrix initialized with the contents of the generator.
    ///
    /// Elements are initialized in memory order.
    pub fn new<U>(generator: U, nrows: usize, ncols: usize) -> Self
    where
        U: Generator<T>,
    {
        Self::with_layout(generator, nrows, ncols, Layout::RowMajor)
    }

    /// Construct a new Matrix with the given layout, initialized in memory order.
    pub fn with_layout<U>(mut generator: U, nrows: usize, ncols: usize, layout: Layout) -> Self
    where
        U: Generator<T>,
    {
        let data: Box<[T]> = (0..nrows * ncols).map(|_| generator.generate()).collect();
        debug_assert_eq!(data.len(), nrows * ncols);
        Self {
            data,
            nrows,
            ncols,
            layout,
        }
    }

    /// Allocate a default-initialized (zero for numeric types) matrix.
    pub fn zeros(nrows: usize, ncols: usize, layout: Layout) -> Self
    where
        T: Default + Clone,
    {
        Self::with_layout(T::default(), nrows, ncols, layout)
    }
}

impl<'a, T> MatrixBase<Storage<'a, T>> {
    /// Take ownership of `matrix`.
    pub fn owned(matrix: Matrix<T>) -> Self {
        let MatrixBase {
            data,
            nrows,
            ncols,
            layout,
        } = matrix;
        Self {
            data: Storage::Owned(data),
            nrows,
            ncols,
            layout,
        }
    }

    /// Wrap a caller-owned buffer without copying.
    pub fn borrowed(view: MutMatrixView<'a, T>) -> Self {
        let MatrixBase {
            data,
            nrows,
            ncols,
            layout,
        } = view;
        Self {
            data: Storage::Borrowed(data),
            nrows,
            ncols,
            layout,
        }
    }

    /// Construct a view over memory managed outside of Rust.
    ///
    /// # Safety
    ///
    /// * `ptr` must be non-null, aligned and valid for reads and writes of
    ///   `nrows * ncols` initialized elements of `T` for the lifetime `'a`.
    /// * The memory must not be accessed through any other pointer while the returned
    ///   matrix is alive.
    pub unsafe fn from_raw_parts(ptr: *mut T, nrows: usize, ncols: usize, layout: Layout) -> Self {
        // SAFETY: Forwarded to the caller.
        let data = unsafe { std::slice::from_raw_parts_mut(ptr, nrows * ncols) };
        Self {
            data: Storage::Borrowed(data),
            nrows,
            ncols,
            layout,
        }
    }
}

impl<T> MatrixBase<T>
where
    T: DenseData,
{
    /// Try to construct a row-major `MatrixBase` over the provided base. If the size of
    /// the base is incorrect, return a `TryFromError` containing the base.
    ///
    /// The length of the base must be equal to `nrows * ncols`.
    pub fn try_from(data: T, nrows: usize, ncols: usize) -> Result<Self, TryFromError<T>> {
        Self::try_from_layout(data, nrows, ncols, Layout::RowMajor)
    }

    /// Like [`try_from`](Self::try_from) but with an explicit layout.
    pub fn try_from_layout(
        data: T,
        nrows: usize,
        ncols: usize,
        layout: Layout,
    ) -> Result<Self, TryFromError<T>> {
        let len = data.as_slice().len();
        match nrows.checked_mul(ncols) {
            Some(expected) if expected == len => Ok(Self {
                data,
                nrows,
                ncols,
                layout,
            }),
            _ => Err(TryFromError { data, nrows, ncols }),
        }
    }

    /// Return the number of columns in the matrix.
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Return the number of rows in the matrix.
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Return `(nrows, ncols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    /// Return the total number of elements.
    pub fn len(&self) -> usize {
        self.nrows * self.ncols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Return `true` if the backing memory is not owned by this matrix.
    pub fn is_view(&self) -> bool {
        self.data.is_view()
    }

    /// Return the underlying data as a slice, in storage order.
    pub fn as_slice(&self) -> &[T::Elem] {
        self.data.as_slice()
    }

    /// Return the underlying data as a mutable slice, in storage order.
    pub fn as_mut_slice(&mut self) -> &mut [T::Elem]
    where
        T: MutDenseData,
    {
        self.data.as_mut_slice()
    }

    #[inline]
    fn assert_row_major(&self, what: &str) {
        assert!(
            self.layout == Layout::RowMajor,
            "{what} requires a row-major matrix, found {}",
            self.layout
        );
    }

    /// Return row `row` as a contiguous slice.
    ///
    /// # Panics
    ///
    /// Panics if `row >= self.nrows()` or if the matrix is not row-major.
    pub fn row(&self, row: usize) -> &[T::Elem] {
        self.assert_row_major("row");
        assert!(
            row < self.nrows(),
            "tried to access row {row} of a matrix with {} rows",
            self.nrows()
        );

        // SAFETY: `row` is in-bounds and the layout was checked.
        unsafe { self.get_row_unchecked(row) }
    }

    /// Return row `row` if `row < self.nrows()` and the matrix is row-major. Otherwise,
    /// return `None`.
    pub fn get_row(&self, row: usize) -> Option<&[T::Elem]> {
        if row < self.nrows() && self.layout == Layout::RowMajor {
            // SAFETY: `row` is in-bounds and the layout was checked.
            Some(unsafe { self.get_row_unchecked(row) })
        } else {
            None
        }
    }

    /// Returns the requested row without boundschecking.
    ///
    /// # Safety
    ///
    /// The following conditions must hold to avoid undefined behavior:
    /// * `row < self.nrows()`.
    /// * `self.layout() == Layout::RowMajor`.
    pub unsafe fn get_row_unchecked(&self, row: usize) -> &[T::Elem] {
        debug_assert!(row < self.nrows);
        debug_assert_eq!(self.layout, Layout::RowMajor);
        let ncols = self.ncols;
        let start = row * ncols;

        debug_assert!(start + ncols <= self.as_slice().len());
        // SAFETY: The idempotency requirement of `as_slice` and our audited constructors
        // mean that `self.as_slice()` has a length of `self.nrows * self.ncols`.
        unsafe { self.as_slice().get_unchecked(start..start + ncols) }
    }

    /// Return row `row` as a mutable slice.
    ///
    /// # Panics
    ///
    /// Panics if `row >= self.nrows()` or if the matrix is not row-major.
    pub fn row_mut(&mut self, row: usize) -> &mut [T::Elem]
    where
        T: MutDenseData,
    {
        self.assert_row_major("row_mut");
        assert!(
            row < self.nrows(),
            "tried to access row {row} of a matrix with {} rows",
            self.nrows()
        );
        let ncols = self.ncols;
        let start = row * ncols;
        &mut self.data.as_mut_slice()[start..start + ncols]
    }

    /// Return `(start, len, stride)` of the elements of row `index` (when `by_row`) or of
    /// column `index`.
    fn lane(&self, index: usize, by_row: bool) -> (usize, usize, usize) {
        match (self.layout, by_row) {
            (Layout::RowMajor, true) => (index * self.ncols, self.ncols, 1),
            (Layout::RowMajor, false) => (index, self.nrows, self.ncols),
            (Layout::ColumnMajor, true) => (index, self.ncols, self.nrows),
            (Layout::ColumnMajor, false) => (index * self.nrows, self.nrows, 1),
        }
    }

    fn lane_view(&self, index: usize, by_row: bool) -> VectorView<'_, T::Elem> {
        let (start, len, stride) = self.lane(index, by_row);
        let data: &[T::Elem] = if len == 0 {
            &[]
        } else {
            &self.as_slice()[start..start + vector::linear_length(len, stride)]
        };
        VectorView::from_parts(data, len, stride)
    }

    fn lane_view_mut(&mut self, index: usize, by_row: bool) -> MutVectorView<'_, T::Elem>
    where
        T: MutDenseData,
    {
        let (start, len, stride) = self.lane(index, by_row);
        let data: &mut [T::Elem] = if len == 0 {
            &mut []
        } else {
            &mut self.as_mut_slice()[start..start + vector::linear_length(len, stride)]
        };
        MutVectorView::from_parts(data, len, stride)
    }

    /// Return row `row` as a (possibly strided) vector view. Works for either layout.
    ///
    /// # Panics
    ///
    /// Panics if `row >= self.nrows()`.
    pub fn row_view(&self, row: usize) -> VectorView<'_, T::Elem> {
        assert!(
            row < self.nrows(),
            "tried to access row {row} of a matrix with {} rows",
            self.nrows()
        );
        self.lane_view(row, true)
    }

    /// Return column `col` as a (possibly strided) vector view. Works for either layout.
    ///
    /// # Panics
    ///
    /// Panics if `col >= self.ncols()`.
    pub fn column_view(&self, col: usize) -> VectorView<'_, T::Elem> {
        assert!(
            col < self.ncols(),
            "tried to access column {col} of a matrix with {} columns",
            self.ncols()
        );
        self.lane_view(col, false)
    }

    /// Mutable counterpart of [`row_view`](Self::row_view).
    pub fn row_view_mut(&mut self, row: usize) -> MutVectorView<'_, T::Elem>
    where
        T: MutDenseData,
    {
        assert!(
            row < self.nrows(),
            "tried to access row {row} of a matrix with {} rows",
            self.nrows()
        );
        self.lane_view_mut(row, true)
    }

    /// Mutable counterpart of [`column_view`](Self::column_view).
    pub fn column_view_mut(&mut self, col: usize) -> MutVectorView<'_, T::Elem>
    where
        T: MutDenseData,
    {
        assert!(
            col < self.ncols(),
            "tried to access column {col} of a matrix with {} columns",
            self.ncols()
        );
        self.lane_view_mut(col, false)
    }

    /// Return a iterator over all rows in a row-major matrix.
    ///
    /// Rows are yielded sequentially beginning with row 0.
    ///
    /// # Panics
    ///
    /// Panics if the matrix is not row-major.
    pub fn row_iter(&self) -> impl ExactSizeIterator<Item = &[T::Elem]> {
        self.assert_row_major("row_iter");
        // SAFETY: Every `row` is in-bounds and the layout was checked.
        (0..self.nrows()).map(move |row| unsafe { self.get_row_unchecked(row) })
    }

    /// Return a mutable iterator over all rows in a row-major matrix.
    ///
    /// # Panics
    ///
    /// Panics if the matrix is not row-major or has zero columns.
    pub fn row_iter_mut(&mut self) -> impl ExactSizeIterator<Item = &mut [T::Elem]>
    where
        T: MutDenseData,
    {
        self.assert_row_major("row_iter_mut");
        let ncols = self.ncols();
        self.data.as_mut_slice().chunks_exact_mut(ncols)
    }

    /// Return an iterator that divides a row-major matrix into sub-matrices with (up to)
    /// `batchsize` rows with `self.ncols()` columns.
    ///
    /// # Panics
    ///
    /// Panics if `batchsize = 0`, the matrix has no columns or is not row-major.
    pub fn window_iter(&self, batchsize: usize) -> impl Iterator<Item = MatrixView<'_, T::Elem>>
    where
        T::Elem: Sync,
    {
        assert!(batchsize != 0, "window_iter batchsize cannot be zero");
        self.assert_row_major("window_iter");
        let ncols = self.ncols();
        self.data
            .as_slice()
            .chunks(ncols * batchsize)
            .map(move |data| {
                let blobsize = data.len();
                let nrows = blobsize / ncols;
                assert_eq!(blobsize % ncols, 0);
                MatrixView {
                    data,
                    nrows,
                    ncols,
                    layout: Layout::RowMajor,
                }
            })
    }

    /// Return a parallel iterator that divides a row-major matrix into sub-matrices with
    /// (up to) `batchsize` rows with `self.ncols()` columns.
    ///
    /// It is possible for yielded sub-matrices to have fewer than `batchsize` rows if the
    /// number of rows in the parent matrix is not evenly divisible by `batchsize`.
    ///
    /// # Panics
    ///
    /// Panics if `batchsize = 0`, the matrix has no columns or is not row-major.
    #[cfg(feature = "rayon")]
    pub fn par_window_iter(
        &self,
        batchsize: usize,
    ) -> impl IndexedParallelIterator<Item = MatrixView<'_, T::Elem>>
    where
        T::Elem: Sync,
    {
        assert!(batchsize != 0, "par_window_iter batchsize cannot be zero");
        self.assert_row_major("par_window_iter");
        let ncols = self.ncols();
        self.data
            .as_slice()
            .par_chunks(ncols * batchsize)
            .map(move |data| {
                let blobsize = data.len();
                let nrows = blobsize / ncols;
                assert_eq!(blobsize % ncols, 0);
                MatrixView {
                    data,
                    nrows,
                    ncols,
                    layout: Layout::RowMajor,
                }
            })
    }

    /// Return a parallel iterator that divides a row-major matrix into mutable
    /// sub-matrices with (up to) `batchsize` rows. The sub-matrices are disjoint, so
    /// workers can write their results without synchronization.
    ///
    /// # Panics
    ///
    /// Panics if `batchsize = 0`, the matrix has no columns or is not row-major.
    #[cfg(feature = "rayon")]
    pub fn par_window_iter_mut(
        &mut self,
        batchsize: usize,
    ) -> impl IndexedParallelIterator<Item = MutMatrixView<'_, T::Elem>>
    where
        T: MutDenseData,
        T::Elem: Send,
    {
        assert!(
            batchsize != 0,
            "par_window_iter_mut batchsize cannot be zero"
        );
        self.assert_row_major("par_window_iter_mut");
        let ncols = self.ncols();
        self.data
            .as_mut_slice()
            .par_chunks_mut(ncols * batchsize)
            .map(move |data| {
                let blobsize = data.len();
                let nrows = blobsize / ncols;
                assert_eq!(blobsize % ncols, 0);
                MutMatrixView {
                    data,
                    nrows,
                    ncols,
                    layout: Layout::RowMajor,
                }
            })
    }

    /// Consume the matrix, returning the inner representation.
    ///
    /// This loses the information about the number of rows, columns and layout.
    pub fn into_inner(self) -> T {
        self.data
    }

    /// Return a reference to the backing storage.
    pub fn inner(&self) -> &T {
        &self.data
    }

    /// Return a view over the matrix.
    pub fn as_view(&self) -> MatrixView<'_, T::Elem> {
        MatrixBase {
            data: self.as_slice(),
            nrows: self.nrows,
            ncols: self.ncols,
            layout: self.layout,
        }
    }

    /// Return a mutable view over the matrix.
    pub fn as_mut_view(&mut self) -> MutMatrixView<'_, T::Elem>
    where
        T: MutDenseData,
    {
        let (nrows, ncols, layout) = (self.nrows, self.ncols, self.layout);
        MatrixBase {
            data: self.as_mut_slice(),
            nrows,
            ncols,
            layout,
        }
    }

    /// Return a row-major version of this matrix, borrowing when the layout already
    /// matches and transposing into a fresh allocation otherwise. `self` is unchanged.
    pub fn as_row_major(&self) -> MatrixBase<Cow<'_, [T::Elem]>>
    where
        T::Elem: Clone,
    {
        let data = match self.layout {
            Layout::RowMajor => Cow::Borrowed(self.as_slice()),
            Layout::ColumnMajor => Cow::Owned(self.collect_in(Layout::RowMajor)),
        };
        MatrixBase {
            data,
            nrows: self.nrows,
            ncols: self.ncols,
            layout: Layout::RowMajor,
        }
    }

    /// Return an owned copy of this matrix with the requested layout.
    pub fn to_layout(&self, layout: Layout) -> Matrix<T::Elem>
    where
        T::Elem: Clone,
    {
        Matrix {
            data: self.collect_in(layout).into(),
            nrows: self.nrows,
            ncols: self.ncols,
            layout,
        }
    }

    fn collect_in(&self, layout: Layout) -> Vec<T::Elem>
    where
        T::Elem: Clone,
    {
        if layout == self.layout {
            return self.as_slice().to_vec();
        }
        let mut data = Vec::with_capacity(self.len());
        match layout {
            Layout::RowMajor => {
                (0..self.nrows).for_each(|r| data.extend(self.row_view(r).iter().cloned()))
            }
            Layout::ColumnMajor => {
                (0..self.ncols).for_each(|c| data.extend(self.column_view(c).iter().cloned()))
            }
        }
        data
    }

    /// Copy every element into `dst` in storage order.
    pub fn copy_to(&self, dst: &mut [T::Elem]) -> Result<(), CopyError>
    where
        T::Elem: Clone,
    {
        let src = self.as_slice();
        if src.len() != dst.len() {
            return Err(CopyError {
                len: src.len(),
                dst: dst.len(),
            });
        }
        dst.clone_from_slice(src);
        Ok(())
    }

    /// Return a pointer to the base of the matrix.
    pub fn as_ptr(&self) -> *const T::Elem {
        self.as_slice().as_ptr()
    }

    /// Return a pointer to the base of the matrix.
    pub fn as_mut_ptr(&mut self) -> *mut T::Elem
    where
        T: MutDenseData,
    {
        self.as_mut_slice().as_mut_ptr()
    }

    #[inline]
    fn check(&self, row: usize, col: usize) -> Result<usize, OutOfRange> {
        if row < self.nrows && col < self.ncols {
            Ok(self.layout.offset(row, col, self.nrows, self.ncols))
        } else {
            Err(OutOfRange {
                row,
                col,
                nrows: self.nrows,
                ncols: self.ncols,
            })
        }
    }

    /// Return a reference to element `(row, col)`.
    pub fn try_get(&self, row: usize, col: usize) -> Result<&T::Elem, OutOfRange> {
        let offset = self.check(row, col)?;
        Ok(&self.as_slice()[offset])
    }

    /// Return a mutable reference to element `(row, col)`.
    pub fn try_get_mut(&mut self, row: usize, col: usize) -> Result<&mut T::Elem, OutOfRange>
    where
        T: MutDenseData,
    {
        let offset = self.check(row, col)?;
        Ok(&mut self.as_mut_slice()[offset])
    }

    /// Overwrite element `(row, col)` with `value`.
    pub fn set(&mut self, row: usize, col: usize, value: T::Elem) -> Result<(), OutOfRange>
    where
        T: MutDenseData,
    {
        *self.try_get_mut(row, col)? = value;
        Ok(())
    }

    /// Returns a reference to an element without boundschecking.
    ///
    /// # Safety
    ///
    /// The following conditions must hold to avoid undefined behavior:
    /// * `row < self.nrows()`.
    /// * `col < self.ncols()`.
    pub unsafe fn get_unchecked(&self, row: usize, col: usize) -> &T::Elem {
        debug_assert!(row < self.nrows);
        debug_assert!(col < self.ncols);
        let offset = self.layout.offset(row, col, self.nrows, self.ncols);
        // SAFETY: In-bounds by the caller's contract.
        unsafe { self.as_slice().get_unchecked(offset) }
    }

    /// Returns a mutable reference to an element without boundschecking.
    ///
    /// # Safety
    ///
    /// The following conditions must hold to avoid undefined behavior:
    /// * `row < self.nrows()`.
    /// * `col < self.ncols()`.
    pub unsafe fn get_unchecked_mut(&mut self, row: usize, col: usize) -> &mut T::Elem
    where
        T: MutDenseData,
    {
        debug_assert!(row < self.nrows);
        debug_assert!(col < self.ncols);
        let offset = self.layout.offset(row, col, self.nrows, self.ncols);
        // SAFETY: In-bounds by the caller's contract.
        unsafe { self.as_mut_slice().get_unchecked_mut(offset) }
    }

    /// Return an owned copy with the same layout.
    pub fn to_owned(&self) -> Matrix<T::Elem>
    where
        T::Elem: Clone,
    {
        Matrix {
            data: self.data.as_slice().into(),
            nrows: self.nrows,
            ncols: self.ncols,
            layout: self.layout,
        }
    }
}

/// Represents an owning, 2-dimensional view of a contiguous block of memory.
pub type Matrix<T> = MatrixBase<Box<[T]>>;

/// Represents a non-owning, 2-dimensional view of a contiguous block of memory.
///
/// Functions that only read matrix data accept a `MatrixView` so they work with owned
/// matrices, views and mapped files alike.
pub type MatrixView<'a, T> = MatrixBase<&'a [T]>;

/// Represents a mutable non-owning, 2-dimensional view of a contiguous block of memory.
pub type MutMatrixView<'a, T> = MatrixBase<&'a mut [T]>;

/// A matrix whose ownership is decided at runtime. See [`Storage`].
pub type StoredMatrix<'a, T> = MatrixBase<Storage<'a, T>>;

/// Allow matrix views to be converted directly to slices.
impl<'a, T> From<MatrixView<'a, T>> for &'a [T] {
    fn from(view: MatrixView<'a, T>) -> Self {
        view.data
    }
}

/// Return a reference to the item at entry `(row, col)` in the matrix.
///
/// # Panics
///
/// Panics if `row >= self.nrows()` or `col >= self.ncols()`.
impl<T> Index<(usize, usize)> for MatrixBase<T>
where
    T: DenseData,
{
    type Output = T::Elem;

    fn index(&self, (row, col): (usize, usize)) -> &Self::Output {
        assert!(
            row < self.nrows(),
            "row {row} is out of bounds (max: {})",
            self.nrows()
        );
        assert!(
            col < self.ncols(),
            "col {col} is out of bounds (max: {})",
            self.ncols()
        );

        // SAFETY: We have checked that `row` and `col` are in-bounds.
        unsafe { self.get_unchecked(row, col) }
    }
}

/// Return a mutable reference to the item at entry `(row, col)` in the matrix.
///
/// # Panics
///
/// Panics if `row >= self.nrows()` or `col >= self.ncols()`.
impl<T> IndexMut<(usize, usize)> for MatrixBase<T>
where
    T: MutDenseData,
{
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut Self::Output {
        assert!(
            row < self.nrows(),
            "row {row} is out of bounds (max: {})",
            self.nrows()
        );
        assert!(
            col < self.ncols(),
            "col {col} is out of bounds (max: {})",
            self.ncols()
        );

        // SAFETY: We have checked that `row` and `col` are in-bounds.
        unsafe { self.get_unchecked_mut(row, col) }
    }
}

///////////
// Tests //
///////////
