//! PDB input for reference structures and basis files
//!
//! Only the columns that carry positions, point identities and weights are
//! read; everything else in the file is ignored.

mod parser;
mod records;

pub use parser::PdbReader;
pub use records::*;

use std::io::Read;
use std::path::Path;

use crate::error::IoResult;

/// Options for reading PDB files
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadOptions {
    /// Factor applied to every coordinate (unit conversion)
    pub length_scale: f64,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions { length_scale: 1.0 }
    }
}

impl ReadOptions {
    /// Create default read options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the coordinate scale factor
    pub fn with_length_scale(mut self, length_scale: f64) -> Self {
        self.length_scale = length_scale;
        self
    }
}

/// Read every frame of a PDB file, gzip-compressed or not
pub fn read_pdb(path: &Path, options: ReadOptions) -> IoResult<Vec<PdbFrame>> {
    log::debug!("Opening {}", path.display());
    let file = crate::compress::open_file(path)?;
    PdbReader::with_options(file, options).read_frames()
}

/// Read every frame from a string
pub fn read_pdb_str(content: &str, options: ReadOptions) -> IoResult<Vec<PdbFrame>> {
    PdbReader::with_options(content.as_bytes(), options).read_frames()
}

/// Read every frame from a reader
pub fn read_pdb_from<R: Read>(reader: R, options: ReadOptions) -> IoResult<Vec<PdbFrame>> {
    PdbReader::with_options(reader, options).read_frames()
}
