//! Error types for BBMOD/BBANIM decoding and encoding

use std::io;

use thiserror::Error;

/// The error type for format operations.
#[derive(Error, Debug)]
pub enum FormatError {
    /// IO error other than a short read.
    #[error("IO error: {0}")]
    Io(io::Error),

    /// The stream ended before a complete value could be read.
    #[error("unexpected end of data (file is truncated)")]
    Truncated,

    /// The file does not start with a known magic string.
    #[error("invalid magic: {0:?}")]
    InvalidMagic(Vec<u8>),

    /// The file was written by an unsupported format revision.
    #[error("unsupported version {major}.{minor}")]
    VersionMismatch { major: u8, minor: u8 },

    /// A NUL-terminated string was not valid UTF-8.
    #[error("invalid UTF-8 in string")]
    InvalidUtf8,

    /// A mesh declared a primitive type the format does not know.
    #[error("invalid primitive type {0}")]
    InvalidPrimitiveType(u8),

    /// A float-encoded index was negative, fractional or not finite.
    #[error("invalid {what} index {value}")]
    InvalidIndex { what: &'static str, value: f32 },

    /// An index pointed outside the table it refers to.
    #[error("{what} index {index} out of range (count {count})")]
    IndexOutOfRange {
        what: &'static str,
        index: u32,
        count: u32,
    },

    /// Two entries of a dense index space share an index.
    #[error("{what} index {index} is used more than once")]
    DuplicateIndex { what: &'static str, index: u32 },

    /// A stored count disagrees with the data that follows it.
    #[error("{what} count {stored} does not match actual count {actual}")]
    CountMismatch {
        what: &'static str,
        stored: u32,
        actual: usize,
    },

    /// A value does not fit the on-disk representation.
    #[error("{what} count {count} does not fit in u32")]
    CountOverflow { what: &'static str, count: usize },
}

impl From<io::Error> for FormatError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            FormatError::Truncated
        } else {
            FormatError::Io(err)
        }
    }
}

/// Result type alias for format operations.
pub type Result<T> = std::result::Result<T, FormatError>;
