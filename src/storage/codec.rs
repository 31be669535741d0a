use std::fmt;
use std::io::Read;
use std::io::Write;
use std::str::FromStr;

use flate2::read::MultiGzDecoder;
use flate2::read::ZlibDecoder;
use flate2::write::GzEncoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::Error;
use crate::Result;
use crate::StorageError;

/// Compression applied to shuffle files.
///
/// Backed by `flate2`; block codecs such as lz4 or zstd are not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionCodec {
    #[default]
    None,
    Zlib,
    Gzip,
}

impl CompressionCodec {
    pub fn name(&self) -> &'static str {
        match self {
            CompressionCodec::None => "none",
            CompressionCodec::Zlib => "zlib",
            CompressionCodec::Gzip => "gzip",
        }
    }

    pub(crate) fn wrap_writer(
        self,
        sink: Box<dyn Write + Send>,
    ) -> CodecWriter {
        match self {
            CompressionCodec::None => CodecWriter::Plain(sink),
            CompressionCodec::Zlib => CodecWriter::Zlib(ZlibEncoder::new(sink, Compression::default())),
            CompressionCodec::Gzip => CodecWriter::Gzip(GzEncoder::new(sink, Compression::default())),
        }
    }

    /// Decodes a stream written with this codec.
    ///
    /// Appending to a compressed file produces several concatenated streams;
    /// the gzip decoder reads all members.
    pub fn wrap_reader<R: Read + Send + 'static>(
        self,
        source: R,
    ) -> Box<dyn Read + Send> {
        match self {
            CompressionCodec::None => Box::new(source),
            CompressionCodec::Zlib => Box::new(ZlibDecoder::new(source)),
            CompressionCodec::Gzip => Box::new(MultiGzDecoder::new(source)),
        }
    }
}

impl FromStr for CompressionCodec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(CompressionCodec::None),
            "zlib" | "deflate" => Ok(CompressionCodec::Zlib),
            "gzip" | "gz" => Ok(CompressionCodec::Gzip),
            _ => Err(StorageError::UnsupportedCodec(s.to_string()).into()),
        }
    }
}

impl fmt::Display for CompressionCodec {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) enum CodecWriter {
    Plain(Box<dyn Write + Send>),
    Zlib(ZlibEncoder<Box<dyn Write + Send>>),
    Gzip(GzEncoder<Box<dyn Write + Send>>),
}

impl CodecWriter {
    /// Writes any trailer the codec needs and flushes the file.
    pub(crate) fn finish(self) -> std::io::Result<()> {
        let mut sink = match self {
            CodecWriter::Plain(sink) => sink,
            CodecWriter::Zlib(encoder) => encoder.finish()?,
            CodecWriter::Gzip(encoder) => encoder.finish()?,
        };
        sink.flush()
    }
}

impl Write for CodecWriter {
    fn write(
        &mut self,
        buf: &[u8],
    ) -> std::io::Result<usize> {
        match self {
            CodecWriter::Plain(sink) => sink.write(buf),
            CodecWriter::Zlib(encoder) => encoder.write(buf),
            CodecWriter::Gzip(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            CodecWriter::Plain(sink) => sink.flush(),
            CodecWriter::Zlib(encoder) => encoder.flush(),
            CodecWriter::Gzip(encoder) => encoder.flush(),
        }
    }
}
