//! Custom error types for FITS cutout processing

use std::fmt;
use std::io;

/// Cutout-specific error types
#[derive(Debug)]
pub enum CutoutError {
    /// I/O error
    IoError(io::Error),
    /// Malformed cutout string (bad brackets, ranges or shape tokens)
    ParseError(String),
    /// Well-formed input that fails a semantic rule
    ValidationError(String),
    /// Request falls entirely outside the available data
    NoContent(String),
    /// Source file missing, unreadable or structurally broken
    SourceAccessError(String),
    /// Requested extension does not exist in the source
    ExtensionNotFound(String),
    /// Header card that cannot be interpreted
    InvalidCard(String),
    /// BITPIX value outside the FITS-defined set
    UnsupportedBitpix(i64),
    /// Generic error with message
    GenericError(String),
}

impl fmt::Display for CutoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CutoutError::IoError(e) => write!(f, "I/O error: {}", e),
            CutoutError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            CutoutError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            CutoutError::NoContent(msg) => write!(f, "No content: {}", msg),
            CutoutError::SourceAccessError(msg) => write!(f, "Source access error: {}", msg),
            CutoutError::ExtensionNotFound(name) => write!(f, "Extension not found: {}", name),
            CutoutError::InvalidCard(card) => write!(f, "Invalid header card: {}", card),
            CutoutError::UnsupportedBitpix(v) => write!(f, "Unsupported BITPIX value: {}", v),
            CutoutError::GenericError(msg) => write!(f, "Cutout error: {}", msg),
        }
    }
}

impl std::error::Error for CutoutError {}

impl From<io::Error> for CutoutError {
    fn from(error: io::Error) -> Self {
        CutoutError::IoError(error)
    }
}

/// Result type for cutout operations
pub type CutoutResult<T> = Result<T, CutoutError>;

impl From<String> for CutoutError {
    fn from(msg: String) -> Self {
        CutoutError::GenericError(msg)
    }
}

impl CutoutError {
    /// Whether this error only signals an empty intersection rather than
    /// a broken request, so multi-extension scans can skip past it.
    pub fn is_no_content(&self) -> bool {
        matches!(self, CutoutError::NoContent(_))
    }
}
