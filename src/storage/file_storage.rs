use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;
use tracing::warn;

use super::CodecWriter;
use super::CompressionCodec;
use super::ShuffleStorage;
use crate::file_io::open_file_for_append;
use crate::file_io::walk_regular_files;
use crate::Result;
use crate::StorageConfig;
use crate::StorageError;

/// Default buffer size: none, reads and writes rely on the OS page cache.
pub const DEFAULT_BUFFER_SIZE: usize = 0;

/// Shuffle storage on the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct ShuffleFileStorage {
    buffer_size: usize,
}

impl ShuffleFileStorage {
    pub fn new(buffer_size: usize) -> Self {
        Self { buffer_size }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.buffer_size)
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}

fn path_error(
    action: &'static str,
    path: &Path,
    source: std::io::Error,
) -> StorageError {
    StorageError::PathError {
        action,
        path: path.to_path_buf(),
        source,
    }
}

impl ShuffleStorage for ShuffleFileStorage {
    fn is_local_storage(&self) -> bool {
        true
    }

    fn exists(
        &self,
        path: &Path,
    ) -> bool {
        path.exists()
    }

    fn list_all_files(
        &self,
        dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        walk_regular_files(dir, &mut files).map_err(|e| path_error("list directory", dir, e))?;
        files.sort();
        Ok(files)
    }

    fn create_directories(
        &self,
        dir: &Path,
    ) -> Result<()> {
        std::fs::create_dir_all(dir).map_err(|e| path_error("create directories", dir, e))?;
        Ok(())
    }

    fn delete_directory(
        &self,
        dir: &Path,
    ) -> Result<()> {
        if !dir.exists() {
            return Ok(());
        }
        std::fs::remove_dir_all(dir).map_err(|e| path_error("delete directory", dir, e))?;
        Ok(())
    }

    fn delete_file(
        &self,
        path: &Path,
    ) {
        match std::fs::remove_file(path) {
            Ok(()) => debug!("Deleted file {:?}", path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to delete file {:?}: {}", path, e),
        }
    }

    fn size(
        &self,
        path: &Path,
    ) -> Result<u64> {
        let metadata = std::fs::metadata(path).map_err(|e| path_error("read size", path, e))?;
        Ok(metadata.len())
    }

    fn create_writer_stream(
        &self,
        path: &Path,
        compression_codec: &str,
    ) -> Result<ShuffleOutputStream> {
        let codec: CompressionCodec = compression_codec.parse()?;
        let file = open_file_for_append(path)?;
        let sink: Box<dyn Write + Send> = if self.buffer_size == 0 {
            Box::new(file)
        } else {
            Box::new(BufWriter::with_capacity(self.buffer_size, file))
        };

        Ok(ShuffleOutputStream {
            location: path.to_path_buf(),
            codec,
            writer: Some(codec.wrap_writer(sink)),
            written_bytes: 0,
        })
    }

    fn create_reader_stream(
        &self,
        path: &Path,
    ) -> Result<Box<dyn Read + Send>> {
        let file = File::open(path).map_err(|e| path_error("open", path, e))?;
        if self.buffer_size == 0 {
            Ok(Box::new(file))
        } else {
            debug!("Creating buffered reader for {:?}", path);
            Ok(Box::new(BufReader::with_capacity(self.buffer_size, file)))
        }
    }
}

impl fmt::Display for ShuffleFileStorage {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "ShuffleFileStorage{{bufferSize={}}}", self.buffer_size)
    }
}

/// Append-only, optionally compressed stream into one shuffle file.
///
/// Call [`close`](Self::close) to write the codec trailer; dropping the
/// stream without closing it may leave a truncated compressed tail.
pub struct ShuffleOutputStream {
    location: PathBuf,
    codec: CompressionCodec,
    writer: Option<CodecWriter>,
    written_bytes: u64,
}

impl ShuffleOutputStream {
    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn codec(&self) -> CompressionCodec {
        self.codec
    }

    /// Uncompressed bytes accepted so far.
    pub fn written_bytes(&self) -> u64 {
        self.written_bytes
    }

    /// Finishes the codec and flushes the file. Further calls are no-ops.
    pub fn close(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer
                .finish()
                .map_err(|e| path_error("close", &self.location, e))?;
        }
        Ok(())
    }

    fn writer_mut(&mut self) -> std::io::Result<&mut CodecWriter> {
        self.writer.as_mut().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                format!("stream {:?} already closed", self.location),
            )
        })
    }
}

impl Write for ShuffleOutputStream {
    fn write(
        &mut self,
        buf: &[u8],
    ) -> std::io::Result<usize> {
        let written = self.writer_mut()?.write(buf)?;
        self.written_bytes += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer_mut()?.flush()
    }
}

impl fmt::Debug for ShuffleOutputStream {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ShuffleOutputStream")
            .field("location", &self.location)
            .field("codec", &self.codec)
            .field("closed", &self.writer.is_none())
            .field("written_bytes", &self.written_bytes)
            .finish()
    }
}
