//! Local shuffle file storage.
//!
//! The server-side persistence path writes shuffle data through
//! [`ShuffleStorage`]; [`ShuffleFileStorage`] is the local filesystem
//! implementation.
mod codec;
mod file_storage;

pub use codec::*;
pub use file_storage::*;

#[cfg(test)]
mod file_storage_test;

use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use crate::Result;

/// Path-based access to shuffle files.
///
/// Every operation reports I/O failures as storage errors carrying the path,
/// except [`delete_file`](ShuffleStorage::delete_file), which is best effort.
pub trait ShuffleStorage: Send + Sync {
    fn is_local_storage(&self) -> bool;

    fn exists(
        &self,
        path: &Path,
    ) -> bool;

    /// Regular files below `dir`, recursively.
    fn list_all_files(
        &self,
        dir: &Path,
    ) -> Result<Vec<PathBuf>>;

    fn create_directories(
        &self,
        dir: &Path,
    ) -> Result<()>;

    /// Removes `dir` and everything under it; a missing directory is not an error.
    fn delete_directory(
        &self,
        dir: &Path,
    ) -> Result<()>;

    /// Fire-and-forget removal; failures are only logged.
    fn delete_file(
        &self,
        path: &Path,
    );

    fn size(
        &self,
        path: &Path,
    ) -> Result<u64>;

    /// Opens `path` for appending, creating parent directories, with
    /// `compression_codec` applied to everything written.
    ///
    /// Only `""`/`none`, `zlib`/`deflate` and `gzip`/`gz` are available
    /// (case-insensitive). Any other name, including `lz4` and `zstd`, fails
    /// with [`StorageError::UnsupportedCodec`](crate::StorageError::UnsupportedCodec).
    fn create_writer_stream(
        &self,
        path: &Path,
        compression_codec: &str,
    ) -> Result<ShuffleOutputStream>;

    /// Opens `path` for reading. Bytes are returned exactly as stored.
    fn create_reader_stream(
        &self,
        path: &Path,
    ) -> Result<Box<dyn Read + Send>>;
}
