/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! A dense, tiled, two-dimensional array store.
//!
//! An array named `uri` is kept as two items in a storage provider:
//!
//! * `<uri>.schema.json`: the [`ArraySchema`] as JSON.
//! * `<uri>.values`: every cell in global order (see [`ArraySchema`]), each element in its
//!   canonical little-endian encoding.
//!
//! Matrices read back from an array take their layout from the schema's cell order.

mod schema;
pub use schema::{ArraySchema, Attribute, Dimension, Order, SchemaError};

use std::io::{Read, Write};

use vsearch::{VSError, VSErrorKind, VSResult, error::ErrorContext};
use vsearch_utils::{
    DataType, Scalar,
    views::{Layout, Matrix, MatrixView},
};

use crate::storage::{StorageReadProvider, StorageWriteProvider};

fn schema_path(uri: &str) -> String {
    format!("{uri}.schema.json")
}

fn values_path(uri: &str) -> String {
    format!("{uri}.values")
}

/// Whether an array schema exists at `uri`.
pub fn array_exists<P: StorageReadProvider>(provider: &P, uri: &str) -> bool {
    provider.exists(&schema_path(uri))
}

/// Create an empty array at `uri` described by `schema`, replacing any existing schema.
pub fn create_array<P>(provider: &P, uri: &str, schema: &ArraySchema) -> VSResult<()>
where
    P: StorageWriteProvider,
{
    schema
        .validate()
        .map_err(|err| err.into_error(VSErrorKind::InvalidArgument))?;

    let path = schema_path(uri);
    let mut writer = provider
        .create_for_write(&path)
        .with_context(|| format!("while creating \"{path}\""))?;
    serde_json::to_writer_pretty(&mut writer, schema)
        .map_err(|err| VSError::new(VSErrorKind::IOError, err))
        .with_context(|| format!("while writing \"{path}\""))?;
    writer.flush()?;

    tracing::debug!(uri, dtype = %schema.attribute.dtype, "created array");
    Ok(())
}

/// Read and validate the schema of the array at `uri`.
///
/// A schema that cannot be parsed or fails [`ArraySchema::validate`] is reported as
/// `IOCorruption`, except for unknown element types, which are `UnsupportedDtype`.
pub fn read_schema<P>(provider: &P, uri: &str) -> VSResult<ArraySchema>
where
    P: StorageReadProvider,
{
    let path = schema_path(uri);
    let reader = provider
        .open_reader(&path)
        .with_context(|| format!("while opening \"{path}\""))?;
    let schema: ArraySchema = serde_json::from_reader(reader)
        .map_err(|err| VSError::new(VSErrorKind::IOCorruption, err))
        .with_context(|| format!("while parsing \"{path}\""))?;
    schema
        .validate()
        .map_err(|err| err.into_error(VSErrorKind::IOCorruption))
        .with_context(|| format!("invalid schema in \"{path}\""))?;
    Ok(schema)
}

/// Write every cell of `data` into the existing array at `uri`.
///
/// The element type and shape of `data` must match the schema. `data` may have either
/// layout: cells are written in the array's global order regardless.
pub fn write_matrix<T, P>(provider: &P, uri: &str, data: MatrixView<'_, T>) -> VSResult<()>
where
    T: Scalar,
    P: StorageReadProvider + StorageWriteProvider,
{
    let schema = read_schema(provider, uri)?;
    let dtype = schema.dtype()?;
    if dtype != T::DTYPE {
        return Err(VSError::invalid_argument(format!(
            "array \"{uri}\" stores {dtype} but {} data was provided",
            T::DTYPE
        )));
    }
    if schema.shape() != data.shape() {
        let (nrows, ncols) = schema.shape();
        return Err(VSError::dimension_mismatch(format!(
            "array \"{uri}\" has shape {nrows} × {ncols} but the matrix is {} × {}",
            data.nrows(),
            data.ncols()
        )));
    }

    let mut values = Vec::with_capacity(schema.num_cells());
    schema.for_each_cell(|r, c| values.push(data[(r, c)]));

    let path = values_path(uri);
    let mut writer = provider
        .create_for_write(&path)
        .with_context(|| format!("while creating \"{path}\""))?;
    writer
        .write_all(bytemuck::cast_slice(&values))
        .with_context(|| format!("while writing \"{path}\""))?;
    writer.flush()?;

    tracing::info!(
        uri,
        nrows = data.nrows(),
        ncols = data.ncols(),
        dtype = %T::DTYPE,
        "wrote array"
    );
    Ok(())
}

/// Create an array at `uri` shaped like `data`, with cell and tile order taken from the
/// layout of `data`, and write `data` into it.
pub fn save_matrix<T, P>(provider: &P, uri: &str, data: MatrixView<'_, T>) -> VSResult<()>
where
    T: Scalar,
    P: StorageReadProvider + StorageWriteProvider,
{
    let (nrows, ncols) = data.shape();
    if nrows == 0 || ncols == 0 {
        return Err(VSError::invalid_argument(format!(
            "cannot store an empty {nrows} × {ncols} matrix as an array"
        )));
    }
    let schema = ArraySchema::for_matrix(T::DTYPE, nrows, ncols, data.layout());
    create_array(provider, uri, &schema)?;
    write_matrix(provider, uri, data)
}

/// Read the array at `uri` as a matrix of `T`.
///
/// Fails with `InvalidArgument` if the array stores a different element type and with
/// `IOCorruption` if the values do not match the schema's size.
pub fn read_matrix<T, P>(provider: &P, uri: &str) -> VSResult<Matrix<T>>
where
    T: Scalar,
    P: StorageReadProvider,
{
    let schema = read_schema(provider, uri)?;
    let dtype = schema.dtype()?;
    if dtype != T::DTYPE {
        return Err(VSError::invalid_argument(format!(
            "array \"{uri}\" stores {dtype}, not {}",
            T::DTYPE
        )));
    }
    read_cells(provider, uri, &schema)
}

fn read_cells<T, P>(provider: &P, uri: &str, schema: &ArraySchema) -> VSResult<Matrix<T>>
where
    T: Scalar,
    P: StorageReadProvider,
{
    let path = values_path(uri);
    let ncells = schema.num_cells();
    let expected = ncells
        .checked_mul(std::mem::size_of::<T>())
        .ok_or_else(|| {
            VSError::io_corruption(format!("\"{uri}\" has more cells than can be addressed"))
        })? as u64;
    let actual = provider
        .get_length(&path)
        .with_context(|| format!("while opening \"{path}\""))?;
    if actual != expected {
        return Err(VSError::io_corruption(format!(
            "\"{path}\" holds {actual} bytes but its schema requires {expected}"
        )));
    }

    let mut values = vec![T::zeroed(); ncells];
    provider
        .open_reader(&path)
        .and_then(|mut reader| reader.read_exact(bytemuck::cast_slice_mut(&mut values)))
        .with_context(|| format!("while reading \"{path}\""))?;

    let (nrows, ncols) = schema.shape();
    let mut matrix = Matrix::with_layout(T::zeroed(), nrows, ncols, schema.layout());
    let mut next = values.into_iter();
    schema.for_each_cell(|r, c| {
        if let Some(value) = next.next() {
            matrix[(r, c)] = value;
        }
    });

    tracing::info!(uri, nrows, ncols, dtype = %T::DTYPE, "read array");
    Ok(matrix)
}

/// A matrix whose element type is only known at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyMatrix {
    Float32(Matrix<f32>),
    Uint8(Matrix<u8>),
    Int8(Matrix<i8>),
    Uint32(Matrix<u32>),
    Uint64(Matrix<u64>),
}

macro_rules! dispatch {
    ($self:ident, $m:ident => $body:expr) => {
        match $self {
            AnyMatrix::Float32($m) => $body,
            AnyMatrix::Uint8($m) => $body,
            AnyMatrix::Int8($m) => $body,
            AnyMatrix::Uint32($m) => $body,
            AnyMatrix::Uint64($m) => $body,
        }
    };
}

impl AnyMatrix {
    pub fn dtype(&self) -> DataType {
        match self {
            Self::Float32(_) => DataType::Float32,
            Self::Uint8(_) => DataType::Uint8,
            Self::Int8(_) => DataType::Int8,
            Self::Uint32(_) => DataType::Uint32,
            Self::Uint64(_) => DataType::Uint64,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        dispatch!(self, m => m.shape())
    }

    pub fn layout(&self) -> Layout {
        dispatch!(self, m => m.layout())
    }

    /// The contained matrix with every element converted to `f32`.
    pub fn to_f32(&self) -> Matrix<f32> {
        dispatch!(self, m => {
            let mut out = Matrix::with_layout(0.0f32, m.nrows(), m.ncols(), m.layout());
            out.as_mut_slice()
                .iter_mut()
                .zip(m.as_slice())
                .for_each(|(dst, &src)| *dst = src as f32);
            out
        })
    }
}

/// Read the array at `uri` with whatever element type its schema declares.
///
/// Fails with `UnsupportedDtype` if the schema names an element type this crate does not
/// handle.
pub fn read_matrix_any<P>(provider: &P, uri: &str) -> VSResult<AnyMatrix>
where
    P: StorageReadProvider,
{
    let path = schema_path(uri);
    let schema = read_schema(provider, uri)?;
    let dtype = schema
        .dtype()
        .map_err(VSError::from)
        .with_context(|| format!("while reading \"{path}\""))?;
    Ok(match dtype {
        DataType::Float32 => AnyMatrix::Float32(read_cells(provider, uri, &schema)?),
        DataType::Uint8 => AnyMatrix::Uint8(read_cells(provider, uri, &schema)?),
        DataType::Int8 => AnyMatrix::Int8(read_cells(provider, uri, &schema)?),
        DataType::Uint32 => AnyMatrix::Uint32(read_cells(provider, uri, &schema)?),
        DataType::Uint64 => AnyMatrix::Uint64(read_cells(provider, uri, &schema)?),
    })
}

/// Load the array at `uri`, failing with `IOError` if no array exists there.
pub fn load_matrix<P>(provider: &P, uri: &str) -> VSResult<AnyMatrix>
where
    P: StorageReadProvider,
{
    if !array_exists(provider, uri) {
        return Err(VSError::message(
            VSErrorKind::IOError,
            format!("no array exists at \"{uri}\""),
        ));
    }
    read_matrix_any(provider, uri)
}
