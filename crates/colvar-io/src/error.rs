//! Error types for reference and basis ingestion

use colvar_algos::AlignError;
use thiserror::Error;

/// Errors that can occur while loading reference data
#[derive(Error, Debug)]
pub enum IoError {
    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error with location information
    #[error("Parse error at line {line}: {message}")]
    Parse {
        /// Line number where the error occurred (1-based)
        line: usize,
        /// Error message
        message: String,
    },

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// File is empty or contains no frames
    #[error("Empty file or no frames found")]
    EmptyFile,

    /// Parsed data was rejected while building reference types
    #[error(transparent)]
    Align(#[from] AlignError),
}

impl IoError {
    /// Create a parse error at a specific line
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        IoError::Parse {
            line,
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        IoError::MissingField(field.into())
    }

    /// True when the file was read but its content is unusable as
    /// reference or basis data
    pub fn is_configuration(&self) -> bool {
        match self {
            IoError::Io(_) => false,
            IoError::Parse { .. } | IoError::MissingField(_) | IoError::EmptyFile => true,
            IoError::Align(e) => e.is_configuration(),
        }
    }
}

/// Result type for ingestion operations
pub type IoResult<T> = Result<T, IoError>;
