//! PDB frame parser
//!
//! Reads ATOM/HETATM records frame by frame; a frame ends at END, ENDMDL
//! or end of input. Other record types are skipped.

use std::io::{BufRead, BufReader, Read};

use lin_alg::f64::Vec3;
use nom::error::{Error as NomError, ErrorKind};
use nom::IResult;

use crate::error::{IoError, IoResult};

use super::records::{PdbAtom, PdbFrame};
use super::ReadOptions;

/// Weight used when the occupancy or B-factor column is blank
const DEFAULT_WEIGHT: f64 = 1.0;

/// PDB file reader
pub struct PdbReader<R> {
    reader: BufReader<R>,
    line_number: usize,
    options: ReadOptions,
}

impl<R: Read> PdbReader<R> {
    /// Create a new PDB reader
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, ReadOptions::default())
    }

    pub fn with_options(reader: R, options: ReadOptions) -> Self {
        PdbReader {
            reader: BufReader::new(reader),
            line_number: 0,
            options,
        }
    }

    /// Read a single line from the file
    fn read_line(&mut self) -> IoResult<Option<String>> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => Ok(None),
            Ok(_) => {
                self.line_number += 1;
                Ok(Some(line))
            }
            Err(e) => Err(IoError::Io(e)),
        }
    }

    /// Read the next non-empty frame, or `None` at end of input
    pub fn read_frame(&mut self) -> IoResult<Option<PdbFrame>> {
        let mut frame = PdbFrame::default();

        while let Some(line) = self.read_line()? {
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }

            let record_type = line.get(0..6).unwrap_or(line);
            match record_type.trim_end() {
                "ATOM" | "HETATM" => {
                    let (_, mut atom) = parse_atom_record(line)
                        .map_err(|e| atom_error(self.line_number, &e))?;
                    atom.position = atom.position * self.options.length_scale;
                    frame.atoms.push(atom);
                }
                "END" | "ENDMDL" => {
                    if !frame.is_empty() {
                        return Ok(Some(frame));
                    }
                }
                _ => {}
            }
        }

        Ok((!frame.is_empty()).then_some(frame))
    }

    /// Read every remaining frame
    pub fn read_frames(&mut self) -> IoResult<Vec<PdbFrame>> {
        let mut frames = Vec::new();
        while let Some(frame) = self.read_frame()? {
            frames.push(frame);
        }
        log::debug!("Read {} PDB frames ({} lines)", frames.len(), self.line_number);
        Ok(frames)
    }
}

fn atom_error(line: usize, e: &nom::Err<NomError<&str>>) -> IoError {
    let inner = match e {
        nom::Err::Error(inner) | nom::Err::Failure(inner) => inner,
        nom::Err::Incomplete(_) => return IoError::parse(line, "incomplete ATOM record"),
    };
    let field = inner.input.trim();
    match inner.code {
        ErrorKind::Eof => IoError::parse(line, "ATOM record is too short to hold coordinates"),
        ErrorKind::Digit if field.is_empty() => {
            IoError::missing_field(format!("atom serial number (line {})", line))
        }
        ErrorKind::Float if field.is_empty() => {
            IoError::missing_field(format!("coordinate (line {})", line))
        }
        ErrorKind::Digit => {
            IoError::parse(line, format!("invalid atom serial number '{}'", field))
        }
        ErrorKind::Float => IoError::parse(line, format!("invalid number '{}'", field)),
        other => IoError::parse(line, format!("invalid ATOM record ({:?})", other)),
    }
}

/// Parse a fixed-width numeric column; a blank column yields `default`
fn parse_column(
    line: &str,
    range: std::ops::Range<usize>,
    default: Option<f64>,
) -> Result<f64, nom::Err<NomError<&str>>> {
    let field = line.get(range).unwrap_or("").trim();
    match (field.is_empty(), default) {
        (true, Some(value)) => Ok(value),
        _ => field
            .parse()
            .map_err(|_| nom::Err::Error(NomError::new(field, ErrorKind::Float))),
    }
}

/// Parse an ATOM/HETATM record
///
/// Fixed column positions (0-indexed):
/// 6-10 serial, 30-37 x, 38-45 y, 46-53 z,
/// 54-59 occupancy, 60-65 tempFactor
fn parse_atom_record(input: &str) -> IResult<&str, PdbAtom> {
    if input.len() < 54 {
        return Err(nom::Err::Error(NomError::new(input, ErrorKind::Eof)));
    }

    let serial_field = input.get(6..11).unwrap_or("").trim();
    let serial: usize = serial_field
        .parse()
        .map_err(|_| nom::Err::Error(NomError::new(serial_field, ErrorKind::Digit)))?;

    let x = parse_column(input, 30..38, None)?;
    let y = parse_column(input, 38..46, None)?;
    let z = parse_column(input, 46..54, None)?;
    let occupancy = parse_column(input, 54..60, Some(DEFAULT_WEIGHT))?;
    let b_factor = parse_column(input, 60..66, Some(DEFAULT_WEIGHT))?;

    let atom = PdbAtom {
        serial,
        position: Vec3::new(x, y, z),
        occupancy,
        b_factor,
    };

    Ok(("", atom))
}
