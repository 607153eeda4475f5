/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use vsearch::{VSError, VSResult};
use vsearch_providers::{
    array::{array_exists, read_matrix},
    storage::{StorageReadProvider, load_bin},
};
use vsearch_utils::{Scalar, views::Matrix};

/// Load the vectors named by `path`.
///
/// `path` may name an array (the prefix of a `<path>.schema.json` and `<path>.values`
/// pair) or a `.bin` file. Arrays take precedence.
pub fn load_vectors<T, P>(provider: &P, path: &str) -> VSResult<Matrix<T>>
where
    T: Scalar,
    P: StorageReadProvider,
{
    if array_exists(provider, path) {
        read_matrix::<T, P>(provider, path)
    } else if provider.exists(path) {
        load_bin::<T, P>(provider, path)
    } else {
        Err(VSError::message(
            vsearch::VSErrorKind::IOError,
            format!("\"{path}\" is neither an array nor a file"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use vsearch::VSErrorKind;
    use vsearch_providers::{
        array::save_matrix,
        storage::{VirtualStorageProvider, save_bin},
    };
    use vsearch_utils::views::Layout;

    use super::*;

    #[test]
    fn arrays_and_bin_files() {
        let provider = VirtualStorageProvider::new_memory();
        let data = Matrix::try_from_layout(
            vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0].into_boxed_slice(),
            3,
            2,
            Layout::ColumnMajor,
        )
        .unwrap();

        save_matrix(&provider, "/array", data.as_view()).unwrap();
        let loaded = load_vectors::<f32, _>(&provider, "/array").unwrap();
        assert_eq!(loaded, data);

        save_bin(&provider, "/file.bin", data.as_view()).unwrap();
        let loaded = load_vectors::<f32, _>(&provider, "/file.bin").unwrap();
        assert_eq!(loaded.layout(), Layout::RowMajor);
        assert_eq!(loaded.row(2), &[3.0, 6.0]);

        let err = load_vectors::<f32, _>(&provider, "/nothing").unwrap_err();
        assert_eq!(err.kind(), VSErrorKind::IOError);
    }
}
