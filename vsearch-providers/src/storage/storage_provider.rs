/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */
use std::io::{Read, Result, Seek, Write};

/// Read side of a place where matrices and schemas are kept, addressed by path.
///
/// Loaders take any implementation, so the tools can read the physical filesystem while
/// tests stay in memory.
pub trait StorageReadProvider: Sync {
    type Reader: Read + Seek;

    /// Open `path` for reading from its start.
    fn open_reader(&self, path: &str) -> Result<Self::Reader>;

    /// Size of `path` in bytes.
    fn get_length(&self, path: &str) -> Result<u64>;

    fn exists(&self, path: &str) -> bool;
}

/// Write side of a storage provider.
pub trait StorageWriteProvider: Sync {
    type Writer: WriteSeek;

    /// Open an existing `path` for appending.
    fn open_writer(&self, path: &str) -> Result<Self::Writer>;

    /// Open `path` for writing, creating it or discarding its previous contents.
    fn create_for_write(&self, path: &str) -> Result<Self::Writer>;

    fn delete(&self, path: &str) -> Result<()>;
}

/// Writers that can also seek.
pub trait WriteSeek: Write + Seek {}
impl<T> WriteSeek for T where T: Write + Seek {}
