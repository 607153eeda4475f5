/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Matrices backed by a memory-mapped `.bin` file.
//!
//! The matrix covers the payload that follows the 8-byte header. Writes through the
//! matrix land in the page cache immediately and reach the file on [`MappedBuffer::flush`]
//! (or when the mapping is dropped). The caller must ensure that no other process modifies
//! the file while it is mapped.

use std::{fs::OpenOptions, marker::PhantomData, path::Path};

use memmap2::{MmapMut, MmapOptions};
use vsearch::{VSError, VSResult, error::ErrorContext};
use vsearch_utils::{
    Scalar,
    io::{Metadata, check_payload},
    views::{DenseData, MatrixBase, MutDenseData},
};

/// The mapped payload of a `.bin` file, viewed as elements of `T`.
#[derive(Debug)]
pub struct MappedBuffer<T> {
    // `None` for empty payloads, which cannot be mapped.
    mmap: Option<MmapMut>,
    _marker: PhantomData<T>,
}

/// A matrix whose elements live in a memory-mapped file.
pub type MappedMatrix<T> = MatrixBase<MappedBuffer<T>>;

impl<T: Scalar> MappedBuffer<T> {
    /// Write dirty pages back to the file.
    pub fn flush(&self) -> VSResult<()> {
        if let Some(mmap) = &self.mmap {
            mmap.flush()?;
        }
        Ok(())
    }
}

// SAFETY: The mapping is fixed at construction and alignment was checked, so `as_slice`
// always returns the same slice.
unsafe impl<T: Scalar> DenseData for MappedBuffer<T> {
    type Elem = T;

    fn as_slice(&self) -> &[T] {
        match &self.mmap {
            Some(mmap) => bytemuck::cast_slice(&mmap[..]),
            None => &[],
        }
    }
}

// SAFETY: Spans the same memory as `as_slice`.
unsafe impl<T: Scalar> MutDenseData for MappedBuffer<T> {
    fn as_mut_slice(&mut self) -> &mut [T] {
        match &mut self.mmap {
            Some(mmap) => bytemuck::cast_slice_mut(&mut mmap[..]),
            None => &mut [],
        }
    }
}

/// Map the `.bin` file at `path` read-write as a row-major matrix.
///
/// The header and file size are validated exactly as by
/// [`load_bin`](super::bin::load_bin): a file that is not exactly as long as its header
/// declares fails with `IOCorruption`.
pub fn map_bin<T: Scalar>(path: impl AsRef<Path>) -> VSResult<MappedMatrix<T>> {
    let path = path.as_ref();
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .with_context(|| format!("while opening \"{}\"", path.display()))?;

    let metadata = Metadata::read(&mut file)
        .with_context(|| format!("while reading the header of \"{}\"", path.display()))?;
    let payload = check_payload(&mut file, &metadata, std::mem::size_of::<T>(), 1)
        .with_context(|| format!("while mapping \"{}\"", path.display()))?;

    let mmap = if payload == 0 {
        None
    } else {
        // SAFETY: The file stays open for the duration of the call and the caller
        // guarantees it is not modified externally while mapped.
        let mmap = unsafe {
            MmapOptions::new()
                .offset(Metadata::SIZE as u64)
                .len(payload)
                .map_mut(&file)?
        };
        if bytemuck::try_cast_slice::<u8, T>(&mmap[..]).is_err() {
            return Err(VSError::io_corruption(format!(
                "mapped payload of \"{}\" is not aligned for {}",
                path.display(),
                T::DTYPE
            )));
        }
        Some(mmap)
    };

    let buffer = MappedBuffer {
        mmap,
        _marker: PhantomData,
    };
    let (npoints, ndims) = metadata.into_dims();
    let matrix = MatrixBase::try_from(buffer, npoints, ndims).map_err(|err| err.as_static())?;

    tracing::info!(
        npoints,
        ndims,
        dtype = %T::DTYPE,
        path = %path.display(),
        "mapped matrix"
    );
    Ok(matrix)
}
