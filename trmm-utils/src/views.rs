/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use std::ops::{Index, IndexMut, Range};

use thiserror::Error;

use crate::alloc::{checked_len, try_vec, AllocationError};

/// Storage that can be viewed as a dense slice.
///
/// Implemented for borrowed slices and boxed slices so owned matrices and views share a
/// single implementation. `as_slice` must always return the same slice.
pub trait DenseData {
    type Elem;

    /// Return the underlying data as a slice.
    fn as_slice(&self) -> &[Self::Elem];
}

/// A mutable companion to [`DenseData`].
pub trait MutDenseData: DenseData {
    fn as_mut_slice(&mut self) -> &mut [Self::Elem];
}

impl<T> DenseData for &[T] {
    type Elem = T;
    fn as_slice(&self) -> &[T] {
        self
    }
}

impl<T> DenseData for Box<[T]> {
    type Elem = T;
    fn as_slice(&self) -> &[T] {
        self
    }
}

impl<T> MutDenseData for Box<[T]> {
    fn as_mut_slice(&mut self) -> &mut [T] {
        self
    }
}

////////////
// Matrix //
////////////

/// A dense chunk of memory interpreted as a 2-dimensional row-major matrix.
///
/// The row stride always equals the number of columns and the column stride is one.
/// Either dimension may be zero, in which case the backing slice is empty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixBase<T>
where
    T: DenseData,
{
    data: T,
    nrows: usize,
    ncols: usize,
}

/// An owned matrix.
pub type Matrix<T> = MatrixBase<Box<[T]>>;

/// An immutable view of a matrix.
pub type MatrixView<'a, T> = MatrixBase<&'a [T]>;

#[derive(Debug, Error)]
#[error(
    "tried to construct a matrix with {nrows} rows and {ncols} columns over a slice of \
     length {len}"
)]
pub struct TryFromError {
    len: usize,
    nrows: usize,
    ncols: usize,
}

impl<T> Matrix<T> {
    /// Fallibly allocate a `nrows x ncols` matrix with every element set to `value`.
    pub fn try_filled(value: T, nrows: usize, ncols: usize) -> Result<Self, AllocationError>
    where
        T: Clone,
    {
        let len = checked_len(nrows, ncols)?;
        let data = try_vec(value, len)?.into_boxed_slice();
        Ok(Self { data, nrows, ncols })
    }

    /// Return a `0 x 0` matrix that owns no memory.
    pub fn empty() -> Self {
        Self {
            data: Box::new([]),
            nrows: 0,
            ncols: 0,
        }
    }
}

impl<T> MatrixBase<T>
where
    T: DenseData,
{
    /// Try to construct a matrix over `data`. The length of `data` must be exactly
    /// `nrows * ncols`.
    pub fn try_from(data: T, nrows: usize, ncols: usize) -> Result<Self, TryFromError> {
        let len = data.as_slice().len();
        if Some(len) != nrows.checked_mul(ncols) {
            Err(TryFromError { len, nrows, ncols })
        } else {
            Ok(Self { data, nrows, ncols })
        }
    }

    /// Return the number of rows in the matrix.
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Return the number of columns in the matrix.
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Return `(nrows, ncols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    /// Return the total number of elements.
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Return `true` if the matrix has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the underlying data as a slice.
    pub fn as_slice(&self) -> &[T::Elem] {
        self.data.as_slice()
    }

    /// Return the underlying data as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T::Elem]
    where
        T: MutDenseData,
    {
        self.data.as_mut_slice()
    }

    /// Return row `row` as a slice.
    ///
    /// # Panics
    ///
    /// Panics if `row >= self.nrows()`.
    pub fn row(&self, row: usize) -> &[T::Elem] {
        assert!(
            row < self.nrows(),
            "tried to access row {row} of a matrix with {} rows",
            self.nrows()
        );
        let start = row * self.ncols;
        &self.as_slice()[start..start + self.ncols]
    }

    /// Return row `row` as a mutable slice.
    ///
    /// # Panics
    ///
    /// Panics if `row >= self.nrows()`.
    pub fn row_mut(&mut self, row: usize) -> &mut [T::Elem]
    where
        T: MutDenseData,
    {
        assert!(
            row < self.nrows(),
            "tried to access row {row} of a matrix with {} rows",
            self.nrows()
        );
        let ncols = self.ncols;
        let start = row * ncols;
        &mut self.as_mut_slice()[start..start + ncols]
    }

    /// Return the contiguous block of memory spanning the rows in `rows`.
    ///
    /// # Panics
    ///
    /// Panics if `rows.end > self.nrows()` or `rows.start > rows.end`.
    pub fn rows(&self, rows: Range<usize>) -> &[T::Elem] {
        assert!(
            rows.start <= rows.end && rows.end <= self.nrows(),
            "row range {rows:?} is out of bounds for a matrix with {} rows",
            self.nrows()
        );
        &self.as_slice()[rows.start * self.ncols..rows.end * self.ncols]
    }

    /// Return an immutable view of `self`.
    pub fn as_view(&self) -> MatrixView<'_, T::Elem> {
        MatrixBase {
            data: self.as_slice(),
            nrows: self.nrows,
            ncols: self.ncols,
        }
    }

}

impl<T> Index<(usize, usize)> for MatrixBase<T>
where
    T: DenseData,
{
    type Output = T::Elem;

    fn index(&self, (row, col): (usize, usize)) -> &Self::Output {
        assert!(
            col < self.ncols(),
            "column {col} is out of bounds for a matrix with {} columns",
            self.ncols()
        );
        &self.row(row)[col]
    }
}

impl<T> IndexMut<(usize, usize)> for MatrixBase<T>
where
    T: MutDenseData,
{
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut Self::Output {
        assert!(
            col < self.ncols(),
            "column {col} is out of bounds for a matrix with {} columns",
            self.ncols()
        );
        &mut self.row_mut(row)[col]
    }
}

///////////
// Tests //
///////////
