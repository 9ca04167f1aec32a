//! Accounting parser error types.

use thiserror::Error;

/// Result type alias for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Errors raised while reading sacct output.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("input is empty, expected a header line")]
    MissingHeader,

    #[error("header is missing the {0} column")]
    MissingColumn(String),

    #[error("record has {found} fields, header has {expected}")]
    ShortRecord { expected: usize, found: usize },

    #[error("invalid elapsed time: {0:?}")]
    InvalidDuration(String),

    #[error("invalid {field} value: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("failed to read accounting data: {0}")]
    Io(#[from] std::io::Error),
}
