/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Storage on a [`vfs`] filesystem, mostly an in-memory one for tests.

use std::io;

use vfs::{
    MemoryFS, OverlayFS, PhysicalFS, SeekAndRead, SeekAndWrite, VfsError, VfsPath,
    filesystem::FileSystem,
};

use super::{StorageReadProvider, StorageWriteProvider};

/// Storage provider over any [`vfs::FileSystem`].
///
/// # Examples
///
/// ```
/// use std::io::Write;
///
/// use vsearch_providers::storage::{StorageWriteProvider, VirtualStorageProvider};
///
/// let provider = VirtualStorageProvider::new_memory();
/// {
///     let mut writer = provider.create_for_write("/base.bin").unwrap();
///     writer.write_all(b"not really vectors").unwrap();
/// }
/// assert!(provider.exists("/base.bin"));
/// ```
pub struct VirtualStorageProvider<FS: FileSystem> {
    filesystem: FS,
}

fn to_io(err: VfsError) -> io::Error {
    io::Error::other(err)
}

impl<FS: FileSystem> VirtualStorageProvider<FS> {
    pub fn new(filesystem: FS) -> Self {
        Self { filesystem }
    }

    pub fn exists(&self, path: &str) -> bool {
        self.filesystem.exists(path).unwrap_or(false)
    }

    pub fn filesystem(&self) -> &FS {
        &self.filesystem
    }

    /// Give back the filesystem, e.g. to inspect what a test wrote.
    pub fn take(self) -> FS {
        self.filesystem
    }
}

impl VirtualStorageProvider<MemoryFS> {
    /// An empty in-memory filesystem.
    pub fn new_memory() -> Self {
        Self::new(MemoryFS::new())
    }
}

impl VirtualStorageProvider<OverlayFS> {
    /// Reads fall through to the directory `root` on disk; writes stay in memory.
    pub fn new_overlay<P: AsRef<std::path::Path>>(root: P) -> Self {
        let layers: [VfsPath; 2] = [MemoryFS::new().into(), PhysicalFS::new(root).into()];
        Self::new(OverlayFS::new(&layers))
    }
}

impl<FS: FileSystem> StorageReadProvider for VirtualStorageProvider<FS> {
    type Reader = Box<dyn SeekAndRead + Send>;

    fn open_reader(&self, path: &str) -> io::Result<Self::Reader> {
        self.filesystem.open_file(path).map_err(to_io)
    }

    fn get_length(&self, path: &str) -> io::Result<u64> {
        self.filesystem.metadata(path).map(|m| m.len).map_err(to_io)
    }

    fn exists(&self, path: &str) -> bool {
        VirtualStorageProvider::exists(self, path)
    }
}

impl<FS: FileSystem> StorageWriteProvider for VirtualStorageProvider<FS> {
    type Writer = Box<dyn SeekAndWrite + Send>;

    fn open_writer(&self, path: &str) -> io::Result<Self::Writer> {
        self.filesystem.append_file(path).map_err(to_io)
    }

    fn create_for_write(&self, path: &str) -> io::Result<Self::Writer> {
        if self.filesystem.exists(path).map_err(to_io)? {
            self.filesystem.remove_file(path).map_err(to_io)?;
        }
        self.filesystem.create_file(path).map_err(to_io)
    }

    fn delete(&self, path: &str) -> io::Result<()> {
        self.filesystem.remove_file(path).map_err(to_io)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Seek, SeekFrom, Write};

    use super::*;

    #[test]
    fn readers_seek() {
        let provider = VirtualStorageProvider::new_memory();
        {
            let mut file = provider.filesystem().create_file("/seek.txt").unwrap();
            write!(file, "0123456789").unwrap();
        }

        let mut reader = provider.open_reader("/seek.txt").unwrap();
        let mut buffer = [0; 3];
        reader.seek(SeekFrom::Start(4)).unwrap();
        reader.read_exact(&mut buffer).unwrap();
        assert_eq!(&buffer, b"456");

        reader.seek(SeekFrom::End(-2)).unwrap();
        reader.read_exact(&mut buffer[..2]).unwrap();
        assert_eq!(&buffer[..2], b"89");

        provider.take().remove_file("/seek.txt").unwrap();
    }

    #[test]
    fn create_for_write_truncates() {
        let path = "/truncate.bin";
        let provider = VirtualStorageProvider::new_memory();
        {
            let mut file = provider.create_for_write(path).unwrap();
            file.write_all(b"a much longer first version").unwrap();
        }
        {
            let mut file = provider.create_for_write(path).unwrap();
            file.write_all(b"short").unwrap();
        }
        assert_eq!(provider.get_length(path).unwrap(), 5);

        {
            let mut file = provider.open_writer(path).unwrap();
            file.write_all(b"+tail").unwrap();
        }
        assert_eq!(provider.get_length(path).unwrap(), 10);

        provider.delete(path).unwrap();
        assert!(!provider.exists(path));
        assert!(provider.get_length(path).is_err());
        assert!(provider.open_reader(path).is_err());
    }
}
