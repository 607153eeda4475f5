/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

mod storage_provider;
pub use storage_provider::{StorageReadProvider, StorageWriteProvider, WriteSeek};

#[cfg(any(test, feature = "virtual_storage"))]
mod virtual_storage_provider;
#[cfg(any(test, feature = "virtual_storage"))]
pub use virtual_storage_provider::VirtualStorageProvider;

mod file_storage_provider;
pub use file_storage_provider::FileStorageProvider;

pub mod bin;
pub use bin::{load_bin, load_groundtruth, save_bin, save_groundtruth};

pub mod mapped;
pub use mapped::{MappedBuffer, MappedMatrix, map_bin};
