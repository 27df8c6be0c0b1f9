use std::borrow::Cow;
use std::fmt;
use std::io;

use crate::parser::SubheaderKind;

/// Result type used across the decoder.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal decoding failure. The decoder never returns partial tables.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O failure while loading a file on behalf of the caller.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The endianness marker does not indicate a little-endian file.
    #[error("unsupported endianness marker 0x{marker:02X}; only little-endian files are supported")]
    UnsupportedEndianness { marker: u8 },

    /// A subheader kind the schema cannot be built without is absent.
    #[error("required {0} subheader not found")]
    MissingSubheader(SubheaderKind),

    /// Attribute vectors disagree with the column count of the column size subheader.
    #[error("column size subheader declares {declared} columns but attributes describe {found}")]
    ColumnCountMismatch { declared: u64, found: usize },

    /// A name or format entry refers to a column that has no attribute entry,
    /// or a declared column never received a name.
    #[error("column property for index {index} not found")]
    ColumnPropertyNotFound { index: usize },

    /// A page uses one of the compressed page layouts.
    #[error("page {page_index} has compressed page type {page_type}; compressed pages are not supported")]
    CompressedPageUnsupported { page_index: usize, page_type: i16 },

    /// The dataset declares row compression (RLE or RDC).
    #[error("compressed dataset ({method}) is not supported")]
    CompressedDataUnsupported { method: Cow<'static, str> },

    /// A read reached past the end of the buffer or of the enclosing region.
    #[error(
        "read of {length} bytes at offset {offset} exceeds {available} available bytes in {section}"
    )]
    OutOfBounds {
        section: Section,
        offset: usize,
        length: usize,
        available: usize,
    },

    /// Metadata decoded correctly but cannot be used as requested.
    #[error("invalid SAS metadata: {details}")]
    InvalidMetadata { details: Cow<'static, str> },

    /// Failure reported by an output sink.
    #[error("sink error: {details}")]
    Sink { details: Cow<'static, str> },
}

/// Logical region of the file used for diagnostic reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Buffer,
    Header,
    Page { index: usize },
    Subheader { page_index: usize, signature: u32 },
    Row { index: u64 },
    Column { index: usize },
}

impl Section {
    /// Helper constructor for subheader sections from the raw signature bytes.
    #[must_use]
    pub const fn subheader(page_index: usize, signature: [u8; 4]) -> Self {
        Self::Subheader {
            page_index,
            signature: u32::from_be_bytes(signature),
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buffer => write!(f, "input buffer"),
            Self::Header => write!(f, "file header"),
            Self::Page { index } => write!(f, "page {index}"),
            Self::Subheader {
                page_index,
                signature,
            } => write!(
                f,
                "subheader signature 0x{signature:08X} on page {page_index}"
            ),
            Self::Row { index } => write!(f, "row {index}"),
            Self::Column { index } => write!(f, "column {index}"),
        }
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Self::Sink {
            details: Cow::Owned(err.to_string()),
        }
    }
}
