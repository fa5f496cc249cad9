//! Transparent gzip input

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::error::IoResult;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Check if a buffer starts with the gzip magic bytes
pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.starts_with(&GZIP_MAGIC)
}

/// Check if a path indicates a gzip file (by extension)
pub fn is_gzip_path(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.eq_ignore_ascii_case("gz"))
        .unwrap_or(false)
}

/// Reader that transparently handles gzip compression
pub enum MaybeGzReader<R: Read> {
    /// Plain uncompressed reader
    Plain(R),
    /// Gzip-compressed reader
    Gzip(GzDecoder<R>),
}

impl<R: Read> Read for MaybeGzReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            MaybeGzReader::Plain(r) => r.read(buf),
            MaybeGzReader::Gzip(r) => r.read(buf),
        }
    }
}

impl<R: Read> MaybeGzReader<R> {
    pub fn is_compressed(&self) -> bool {
        matches!(self, MaybeGzReader::Gzip(_))
    }
}

/// Wrap a buffered reader, decompressing when its content starts with the
/// gzip magic bytes. Nothing is consumed by the check.
pub fn maybe_gzip<R: BufRead>(mut reader: R) -> std::io::Result<MaybeGzReader<R>> {
    if is_gzip(reader.fill_buf()?) {
        Ok(MaybeGzReader::Gzip(GzDecoder::new(reader)))
    } else {
        Ok(MaybeGzReader::Plain(reader))
    }
}

/// Open a file for reading, detecting gzip compression from its content
pub fn open_file(path: &Path) -> IoResult<MaybeGzReader<BufReader<File>>> {
    let file = File::open(path)?;
    let reader = maybe_gzip(BufReader::new(file))?;
    if reader.is_compressed() != is_gzip_path(path) {
        log::debug!(
            "{}: extension and content disagree on compression, using content",
            path.display()
        );
    }
    Ok(reader)
}
