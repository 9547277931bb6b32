//! Error types for the MOD3 codec.

use std::path::PathBuf;
use thiserror::Error;

use crate::validate::ValidationReport;

/// Broad class of an [`Error`], for callers that present failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed, truncated or unsupported binary data.
    Format,
    /// One or more Error-severity validation violations.
    Validation,
    /// A reference that cannot be satisfied (bone, material, box).
    Reference,
    /// Filesystem or serialization failure outside the codec.
    Io,
}

/// Main error type for MOD3 operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Invalid magic bytes at start of file
    #[error("Invalid MOD3 file: expected MOD magic bytes")]
    InvalidMagic,

    /// Unsupported file format version
    #[error("Unsupported MOD3 version: {0}")]
    UnsupportedVersion(u16),

    /// Read or write past the end of a buffer
    #[error("Access of {len} bytes at offset {pos} exceeds buffer size {size}")]
    OutOfBounds { pos: u64, len: usize, size: u64 },

    /// A header offset or region does not fit in the buffer
    #[error("{region} region at offset {offset} (+{len} bytes) exceeds file size {size}")]
    RegionOutOfBounds {
        region: &'static str,
        offset: u64,
        len: u64,
        size: u64,
    },

    /// Blocktype with bits this codec does not understand
    #[error("Unknown blocktype 0x{0:08x}")]
    UnknownBlocktype(u32),

    /// Invalid data structure in file or model
    #[error("Invalid structure: {0}")]
    InvalidStructure(String),

    /// Export aborted because of Error-severity violations
    #[error("{}", validation_summary(.0))]
    Validation(ValidationReport),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Options or metadata (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Memory mapping failed
    #[error("Memory mapping failed: {0}")]
    MmapFailed(String),
}

fn validation_summary(report: &ValidationReport) -> String {
    let errors: Vec<_> = report.errors().collect();
    match errors.first() {
        Some(first) if errors.len() > 1 => format!(
            "Export aborted with {} validation errors, first: {}",
            errors.len(),
            first
        ),
        Some(first) => format!("Export aborted: {}", first),
        None => "Export aborted by validation".to_string(),
    }
}

impl Error {
    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidMagic
            | Error::UnsupportedVersion(_)
            | Error::OutOfBounds { .. }
            | Error::RegionOutOfBounds { .. }
            | Error::UnknownBlocktype(_)
            | Error::InvalidStructure(_) => ErrorKind::Format,
            Error::Validation(report) => {
                if report.has_reference_errors() {
                    ErrorKind::Reference
                } else {
                    ErrorKind::Validation
                }
            }
            Error::FileNotFound(_) | Error::Io(_) | Error::Json(_) | Error::MmapFailed(_) => {
                ErrorKind::Io
            }
        }
    }

    /// The validation report behind an aborted export, if any.
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            Error::Validation(report) => Some(report),
            _ => None,
        }
    }
}

/// Result type alias for MOD3 operations.
pub type Result<T> = std::result::Result<T, Error>;
