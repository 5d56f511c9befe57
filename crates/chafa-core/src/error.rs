//! Unified error types for chafa-core.

use thiserror::Error;

/// Main error type for chafa-core operations.
#[derive(Debug, Error)]
pub enum ChafaError {
    // === Argument validation ===
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("unsupported pixel type: {0:?}")]
    UnsupportedPixelType(crate::preprocess::PixelType),

    // === Allocation ===
    #[error("allocation failed while {context}")]
    AllocationFailure { context: String },

    // === Terminal sequence errors ===
    #[error("bad terminal sequence template at byte {position}: {message}")]
    BadTermSeq { position: usize, message: String },

    #[error("terminal sequence argument out of range: {message}")]
    NumericRange { message: String },

    // === Sixel / graphics encoding ===
    #[error("sixel encode error: {message}")]
    SixelEncode { message: String },

    // === I/O passthrough (byte sink failures) ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for chafa-core operations.
pub type Result<T> = std::result::Result<T, ChafaError>;

/// Outcome of [`crate::term::info::TermInfo::parse_seq`] streaming parse attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseResult<T> {
    Success(T),
    Again,
    Failure,
}

impl ChafaError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument { message: msg.into() }
    }

    pub fn allocation(context: impl Into<String>) -> Self {
        Self::AllocationFailure { context: context.into() }
    }

    pub fn bad_term_seq(position: usize, msg: impl Into<String>) -> Self {
        Self::BadTermSeq { position, message: msg.into() }
    }

    pub fn numeric_range(msg: impl Into<String>) -> Self {
        Self::NumericRange { message: msg.into() }
    }
}
