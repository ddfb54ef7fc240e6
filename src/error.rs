use std::fmt;

use thiserror::Error;

/// Errors raised while loading or labelling a customer table.
///
/// An empty filter result is not an error: it is a zero-row selection that the
/// aggregation step reports as zero counts.
#[derive(Debug, Error)]
pub enum RfmError {
    /// A column the pipeline needs is absent from the header.
    #[error("missing required column '{0}'")]
    MissingColumn(String),

    /// The file could not be read as a table, or a required cell is not numeric.
    #[error("malformed file: {0}")]
    MalformedFile(String),

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RfmError {
    pub(crate) fn malformed(err: impl fmt::Display) -> Self {
        RfmError::MalformedFile(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RfmError>;
