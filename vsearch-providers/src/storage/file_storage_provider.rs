/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */
use std::{
    fs::{self, File, OpenOptions},
    io::{BufReader, BufWriter, Result},
};

use super::{StorageReadProvider, StorageWriteProvider};

/// Paths on the local filesystem, read and written through buffered handles.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileStorageProvider;

fn buffered_writer(options: &mut OpenOptions, path: &str) -> Result<BufWriter<File>> {
    options.write(true).open(path).map(BufWriter::new)
}

impl StorageReadProvider for FileStorageProvider {
    type Reader = BufReader<File>;

    fn open_reader(&self, path: &str) -> Result<Self::Reader> {
        File::open(path).map(BufReader::new)
    }

    fn get_length(&self, path: &str) -> Result<u64> {
        fs::metadata(path).map(|m| m.len())
    }

    fn exists(&self, path: &str) -> bool {
        fs::exists(path).unwrap_or(false)
    }
}

impl StorageWriteProvider for FileStorageProvider {
    type Writer = BufWriter<File>;

    fn open_writer(&self, path: &str) -> Result<Self::Writer> {
        buffered_writer(OpenOptions::new().append(true), path)
    }

    fn create_for_write(&self, path: &str) -> Result<Self::Writer> {
        buffered_writer(OpenOptions::new().create(true).truncate(true), path)
    }

    fn delete(&self, path: &str) -> Result<()> {
        fs::remove_file(path)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};

    use super::*;

    fn path_in(dir: &tempfile::TempDir, name: &str) -> String {
        dir.path().join(name).to_string_lossy().into_owned()
    }

    fn contents(path: &str) -> Vec<u8> {
        let mut bytes = Vec::new();
        FileStorageProvider
            .open_reader(path)
            .unwrap()
            .read_to_end(&mut bytes)
            .unwrap();
        bytes
    }

    #[test]
    fn create_append_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let path = path_in(&dir, "vectors.bin");
        let provider = FileStorageProvider;

        assert!(!provider.exists(&path));
        {
            let mut writer = provider.create_for_write(&path).unwrap();
            writer.write_all(b"header").unwrap();
        }
        assert!(provider.exists(&path));
        {
            let mut writer = provider.open_writer(&path).unwrap();
            writer.write_all(b"+payload").unwrap();
        }
        assert_eq!(contents(&path), b"header+payload");
        assert_eq!(provider.get_length(&path).unwrap(), 14);

        {
            let mut writer = provider.create_for_write(&path).unwrap();
            writer.write_all(b"new").unwrap();
        }
        assert_eq!(contents(&path), b"new");

        provider.delete(&path).unwrap();
        assert!(!provider.exists(&path));
    }

    #[test]
    fn missing_files_report_io_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = path_in(&dir, "missing.bin");
        let err = FileStorageProvider.open_reader(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
        assert!(FileStorageProvider.get_length(&path).is_err());
        assert!(FileStorageProvider.open_writer(&path).is_err());
    }
}
