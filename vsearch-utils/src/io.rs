/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Read and write vectors in the fixed-record binary format.
//!
//! The binary format is:
//! - 8-byte header
//!   - `npoints` (u32 LE)
//!   - `ndims` (u32 LE)
//! - Payload: `npoints × ndims` elements of `T`, tightly packed in row-major order
//!
//! Ground-truth files share the header and carry two payloads back to back: the
//! `npoints × ndims` neighbor ids as `u32`, then their distances as `f32`.
//!
//! Readers insist that the payload is exactly as long as the header declares. Trailing
//! bytes are treated as corruption just like missing ones.

use std::io::{Read, Seek, SeekFrom, Write};

use thiserror::Error;

use crate::views::{Matrix, MatrixView};

/// Read a matrix of `T` from the binary format (see [module docs](self)).
///
/// Validates the size of the reader before allocating.
pub fn read_bin<T>(reader: &mut (impl Read + Seek)) -> Result<Matrix<T>, ReadBinError>
where
    T: bytemuck::Pod,
{
    let metadata = Metadata::read(reader)?;
    check_payload(reader, &metadata, std::mem::size_of::<T>(), 1)?;
    read_payload(reader, &metadata)
}

/// Write a matrix of `T` in the binary format (see [module docs](self)).
///
/// Column-major matrices are written in row-major order. Returns the total number of
/// bytes written.
pub fn write_bin<T>(data: MatrixView<'_, T>, writer: &mut impl Write) -> Result<usize, SaveBinError>
where
    T: bytemuck::Pod,
{
    let metadata = Metadata::for_matrix(&data)?;
    let bytes = metadata.write(writer)?;
    Ok(bytes + write_payload(data, writer)?)
}

/// Neighbor ids and distances loaded from a ground-truth file.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundTruth {
    pub ids: Matrix<u32>,
    pub distances: Matrix<f32>,
}

impl GroundTruth {
    /// Number of queries covered by the ground truth.
    pub fn nqueries(&self) -> usize {
        self.ids.nrows()
    }

    /// Number of neighbors recorded per query.
    pub fn k(&self) -> usize {
        self.ids.ncols()
    }
}

/// Read ground truth (see [module docs](self)).
pub fn read_groundtruth(reader: &mut (impl Read + Seek)) -> Result<GroundTruth, ReadBinError> {
    let metadata = Metadata::read(reader)?;
    check_payload(reader, &metadata, std::mem::size_of::<u32>(), 2)?;
    let ids = read_payload(reader, &metadata)?;
    let distances = read_payload(reader, &metadata)?;
    Ok(GroundTruth { ids, distances })
}

/// Write ground truth (see [module docs](self)). The two matrices must have the same shape.
pub fn write_groundtruth(
    ids: MatrixView<'_, u32>,
    distances: MatrixView<'_, f32>,
    writer: &mut impl Write,
) -> Result<usize, SaveBinError> {
    if ids.shape() != distances.shape() {
        return Err(SaveBinError::ShapeMismatch {
            ids: ids.shape(),
            distances: distances.shape(),
        });
    }
    let metadata = Metadata::for_matrix(&ids)?;
    let mut bytes = metadata.write(writer)?;
    bytes += write_payload(ids, writer)?;
    bytes += write_payload(distances, writer)?;
    Ok(bytes)
}

/// Ensure the remaining bytes in `reader` are exactly `npayloads` payloads of
/// `npoints × ndims × type_size` bytes and return their total size. The reader position
/// is restored.
pub fn check_payload(
    reader: &mut (impl Read + Seek),
    metadata: &Metadata,
    type_size: usize,
    npayloads: usize,
) -> Result<usize, ReadBinError> {
    let expected_bytes = metadata
        .npoints()
        .checked_mul(metadata.ndims())
        .and_then(|n| n.checked_mul(type_size))
        .and_then(|n| n.checked_mul(npayloads))
        .ok_or(ReadBinError::Overflow {
            npoints: metadata.npoints_u32(),
            ndims: metadata.ndims_u32(),
            type_size,
        })?;

    let data_start = reader.stream_position()?;
    let end = reader.seek(SeekFrom::End(0))?;
    let available = end.saturating_sub(data_start);
    reader.seek(SeekFrom::Start(data_start))?;

    if available != expected_bytes as u64 {
        return Err(ReadBinError::SizeMismatch {
            expected: expected_bytes as u64,
            available,
            npoints: metadata.npoints_u32(),
            ndims: metadata.ndims_u32(),
            type_size,
        });
    }
    Ok(expected_bytes)
}

fn read_payload<T>(reader: &mut impl Read, metadata: &Metadata) -> Result<Matrix<T>, ReadBinError>
where
    T: bytemuck::Pod,
{
    let (npoints, ndims) = metadata.into_dims();
    let mut data = Matrix::new(<T as bytemuck::Zeroable>::zeroed(), npoints, ndims);
    reader.read_exact(bytemuck::must_cast_slice_mut::<T, u8>(data.as_mut_slice()))?;
    Ok(data)
}

fn write_payload<T>(data: MatrixView<'_, T>, writer: &mut impl Write) -> std::io::Result<usize>
where
    T: bytemuck::Pod,
{
    let data = data.as_row_major();
    writer.write_all(bytemuck::must_cast_slice::<T, u8>(data.as_slice()))?;
    Ok(std::mem::size_of_val(data.as_slice()))
}

/// 8-byte header at the start of a binary file: `npoints` and `ndims` as little-endian u32.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    npoints: u32,
    ndims: u32,
}

impl Metadata {
    /// Size of the serialized header in bytes.
    pub const SIZE: usize = 2 * std::mem::size_of::<u32>();

    /// Construct from any integer types that fit in `u32`.
    pub fn new<T, U>(npoints: T, ndims: U) -> Result<Self, MetadataError<T::Error, U::Error>>
    where
        T: TryInto<u32>,
        U: TryInto<u32>,
    {
        Ok(Self {
            npoints: npoints.try_into().map_err(MetadataError::NumPoints)?,
            ndims: ndims.try_into().map_err(MetadataError::Dim)?,
        })
    }

    fn for_matrix<T>(data: &MatrixView<'_, T>) -> Result<Self, SaveBinError> {
        Self::new(data.nrows(), data.ncols()).map_err(|_| SaveBinError::DimensionOverflow {
            nrows: data.nrows(),
            ncols: data.ncols(),
        })
    }

    /// Number of points as `usize`.
    pub fn npoints(&self) -> usize {
        self.npoints as usize
    }

    /// Number of points as `u32`.
    pub fn npoints_u32(&self) -> u32 {
        self.npoints
    }

    /// Number of dimensions as `usize`.
    pub fn ndims(&self) -> usize {
        self.ndims as usize
    }

    /// Number of dimensions as `u32`.
    pub fn ndims_u32(&self) -> u32 {
        self.ndims
    }

    /// Destructure into (`npoints`, `ndims`) as `usize`.
    pub fn into_dims(&self) -> (usize, usize) {
        (self.npoints(), self.ndims())
    }

    /// Deserialize the 8-byte header from a reader.
    ///
    /// A reader that ends before the header is complete fails with
    /// [`ReadBinError::TruncatedHeader`].
    pub fn read<R>(reader: &mut R) -> Result<Self, ReadBinError>
    where
        R: Read,
    {
        let mut header = Vec::with_capacity(Self::SIZE);
        reader
            .by_ref()
            .take(Self::SIZE as u64)
            .read_to_end(&mut header)?;
        let [a, b, c, d, e, f, g, h]: [u8; Self::SIZE] = header
            .as_slice()
            .try_into()
            .map_err(|_| ReadBinError::TruncatedHeader {
                available: header.len(),
            })?;
        Ok(Metadata {
            npoints: u32::from_le_bytes([a, b, c, d]),
            ndims: u32::from_le_bytes([e, f, g, h]),
        })
    }

    /// Serialize the 8-byte header to a writer. Returns the number of bytes written (always 8).
    pub fn write<W>(&self, writer: &mut W) -> std::io::Result<usize>
    where
        W: Write,
    {
        writer.write_all(&self.npoints.to_le_bytes())?;
        writer.write_all(&self.ndims.to_le_bytes())?;
        Ok(Self::SIZE)
    }
}

#[derive(Debug, Error)]
pub enum MetadataError<T, U> {
    #[error("num points conversion")]
    NumPoints(#[source] T),
    #[error("dim conversion")]
    Dim(#[source] U),
}

/// Error type for [`read_bin`] and [`read_groundtruth`].
#[derive(Debug, Error)]
pub enum ReadBinError {
    /// The payload is not exactly as long as the header declares.
    #[error(
        "binary data size mismatch: header declares {npoints} points × {ndims} dims × \
         {type_size} bytes = {expected} bytes, but {available} bytes are available"
    )]
    SizeMismatch {
        expected: u64,
        available: u64,
        npoints: u32,
        ndims: u32,
        type_size: usize,
    },

    /// The data ends before the 8-byte header is complete.
    #[error("binary header is truncated: {available} of 8 bytes are available")]
    TruncatedHeader { available: usize },

    /// `npoints * ndims` overflows `usize` (corrupt or malicious header).
    #[error(
        "header dimensions overflow: {npoints} points × {ndims} dims × {type_size} bytes overflows"
    )]
    Overflow {
        npoints: u32,
        ndims: u32,
        type_size: usize,
    },

    /// Underlying IO failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Error type for [`write_bin`] and [`write_groundtruth`].
#[derive(Debug, Error)]
pub enum SaveBinError {
    /// Matrix dimensions exceed `u32::MAX` and cannot be represented in the binary header.
    #[error("dimensions overflow u32: {nrows} rows × {ncols} cols")]
    DimensionOverflow { nrows: usize, ncols: usize },

    /// Ground-truth ids and distances disagree on their shape.
    #[error("ground truth ids have shape {ids:?} but distances have shape {distances:?}")]
    ShapeMismatch {
        ids: (usize, usize),
        distances: (usize, usize),
    },

    /// Underlying IO failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

///////////
// Tests //
///////////
