/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Loading and saving `.bin` matrices and ground truth through a storage provider.
//!
//! # File Layout
//!
//! * `npoints` as `u32` in little-endian.
//! * `ndims` as `u32` in little-endian.
//! * `npoints × ndims` elements in row-major order, each in its canonical little-endian
//!   encoding.
//!
//! Ground truth files share the header and store `npoints × ndims` `u32` ids followed by
//! as many `f32` distances.

use std::io::Write;

use vsearch::{VSResult, error::ErrorContext};
use vsearch_utils::{
    Scalar,
    io::{GroundTruth, read_bin, read_groundtruth, write_bin, write_groundtruth},
    views::{Matrix, MatrixView},
};

use super::{StorageReadProvider, StorageWriteProvider};

/// Load the matrix stored at `path`.
///
/// The file must be exactly as long as its header declares; anything else is reported as
/// `IOCorruption`.
pub fn load_bin<T, P>(provider: &P, path: &str) -> VSResult<Matrix<T>>
where
    T: Scalar,
    P: StorageReadProvider,
{
    let mut reader = provider
        .open_reader(path)
        .with_context(|| format!("while opening \"{path}\""))?;
    let data = read_bin::<T>(&mut reader)
        .with_context(|| format!("while loading {} data from \"{path}\"", T::DTYPE))?;

    tracing::info!(
        npoints = data.nrows(),
        ndims = data.ncols(),
        dtype = %T::DTYPE,
        path,
        "loaded matrix"
    );
    Ok(data)
}

/// Save `data` to `path`, replacing any existing item. Returns the number of bytes written.
pub fn save_bin<T, P>(provider: &P, path: &str, data: MatrixView<'_, T>) -> VSResult<usize>
where
    T: Scalar,
    P: StorageWriteProvider,
{
    let mut writer = provider
        .create_for_write(path)
        .with_context(|| format!("while creating \"{path}\""))?;
    let bytes = write_bin(data, &mut writer).with_context(|| format!("while saving \"{path}\""))?;
    writer.flush()?;

    tracing::info!(
        npoints = data.nrows(),
        ndims = data.ncols(),
        bytes,
        path,
        "saved matrix"
    );
    Ok(bytes)
}

/// Load the ground truth stored at `path`.
pub fn load_groundtruth<P>(provider: &P, path: &str) -> VSResult<GroundTruth>
where
    P: StorageReadProvider,
{
    let mut reader = provider
        .open_reader(path)
        .with_context(|| format!("while opening \"{path}\""))?;
    let groundtruth = read_groundtruth(&mut reader)
        .with_context(|| format!("while loading ground truth from \"{path}\""))?;

    tracing::info!(
        nqueries = groundtruth.nqueries(),
        k = groundtruth.k(),
        path,
        "loaded ground truth"
    );
    Ok(groundtruth)
}

/// Save ground truth `ids` and `distances` (which must have the same shape) to `path`.
pub fn save_groundtruth<P>(
    provider: &P,
    path: &str,
    ids: MatrixView<'_, u32>,
    distances: MatrixView<'_, f32>,
) -> VSResult<usize>
where
    P: StorageWriteProvider,
{
    let mut writer = provider
        .create_for_write(path)
        .with_context(|| format!("while creating \"{path}\""))?;
    let bytes = write_groundtruth(ids, distances, &mut writer)
        .with_context(|| format!("while saving ground truth to \"{path}\""))?;
    writer.flush()?;

    tracing::info!(nqueries = ids.nrows(), k = ids.ncols(), path, "saved ground truth");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use vfs::FileSystem;
    use vsearch::VSErrorKind;
    use vsearch_utils::views::{Init, Layout};

    use super::*;
    use crate::storage::VirtualStorageProvider;

    fn write_raw(provider: &VirtualStorageProvider<vfs::MemoryFS>, path: &str, bytes: &[u8]) {
        let mut file = provider.filesystem().create_file(path).unwrap();
        file.write_all(bytes).unwrap();
    }

    #[test]
    fn loads_three_by_four() {
        let provider = VirtualStorageProvider::new_memory();
        let mut bytes = vec![3, 0, 0, 0, 4, 0, 0, 0];
        for v in 0..12u32 {
            bytes.extend_from_slice(&(v as f32).to_le_bytes());
        }
        write_raw(&provider, "/base.bin", &bytes);

        let data = load_bin::<f32, _>(&provider, "/base.bin").unwrap();
        assert_eq!(data.shape(), (3, 4));
        assert_eq!(data.layout(), Layout::RowMajor);
        assert_eq!(data.row(2), &[8.0, 9.0, 10.0, 11.0]);
        assert!(!data.is_view());
    }

    #[test]
    fn size_mismatch_is_corruption() {
        let provider = VirtualStorageProvider::new_memory();
        let mut bytes = vec![3, 0, 0, 0, 4, 0, 0, 0];
        bytes.extend_from_slice(&[0u8; 47]);
        write_raw(&provider, "/short.bin", &bytes);
        bytes.extend_from_slice(&[0u8; 2]);
        write_raw(&provider, "/long.bin", &bytes);
        write_raw(&provider, "/header.bin", &bytes[..3]);

        for path in ["/short.bin", "/long.bin", "/header.bin"] {
            let err = load_bin::<f32, _>(&provider, path).unwrap_err();
            assert_eq!(err.kind(), VSErrorKind::IOCorruption);
            assert!(err.to_string().contains(path), "{err}");
        }

        // Missing files are plain IO errors.
        let err = load_bin::<u8, _>(&provider, "/missing.bin").unwrap_err();
        assert_eq!(err.kind(), VSErrorKind::IOError);
    }

    #[test]
    fn save_then_load() {
        let provider = VirtualStorageProvider::new_memory();
        let mut next = 0u8;
        let data = Matrix::with_layout(
            Init(|| {
                next = next.wrapping_add(7);
                next
            }),
            5,
            3,
            Layout::ColumnMajor,
        );

        let bytes = save_bin(&provider, "/data.u8bin", data.as_view()).unwrap();
        assert_eq!(bytes, 8 + 15);
        assert_eq!(provider.get_length("/data.u8bin").unwrap(), 23);

        let loaded = load_bin::<u8, _>(&provider, "/data.u8bin").unwrap();
        assert_eq!(loaded, data.to_layout(Layout::RowMajor));
    }

    #[test]
    fn groundtruth_round_trip() {
        let provider = VirtualStorageProvider::new_memory();
        let ids = Matrix::try_from(vec![0u32, 4, 2, 1, 3, 0].into_boxed_slice(), 2, 3).unwrap();
        let distances = Matrix::try_from(
            vec![0.0f32, 1.5, 2.0, 0.25, 0.5, 4.0].into_boxed_slice(),
            2,
            3,
        )
        .unwrap();

        save_groundtruth(&provider, "/gt.bin", ids.as_view(), distances.as_view()).unwrap();
        let loaded = load_groundtruth(&provider, "/gt.bin").unwrap();
        assert_eq!(loaded.ids, ids);
        assert_eq!(loaded.distances, distances);
        assert_eq!((loaded.nqueries(), loaded.k()), (2, 3));

        let narrow = Matrix::new(0.0f32, 2, 2);
        let err = save_groundtruth(&provider, "/bad.bin", ids.as_view(), narrow.as_view())
            .unwrap_err();
        assert_eq!(err.kind(), VSErrorKind::DimensionMismatch);
    }
}
