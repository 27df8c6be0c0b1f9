use crate::error::{Error, Result};
use crate::parser::header::ArchitectureMode;
use crate::parser::subheader::Subheader;

use super::text_store::TextRef;

const RLE_LITERAL: &str = "SASYZCRL";
const RDC_LITERAL: &str = "SASYZCR2";

/// Row geometry taken from the row size subheader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowLayout {
    /// Byte stride of one row.
    pub row_length: usize,
    /// Total rows declared for the dataset.
    pub row_count: u64,
    /// Rows stored in the data area of a mix page.
    pub row_count_first_page: u64,
}

/// Row compression declared by the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Rle,
    Rdc,
}

impl Compression {
    #[must_use]
    pub fn from_literal(literal: &str) -> Self {
        match literal.trim() {
            RLE_LITERAL => Self::Rle,
            RDC_LITERAL => Self::Rdc,
            _ => Self::None,
        }
    }

    #[must_use]
    pub const fn method(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Rle => Some("RLE"),
            Self::Rdc => Some("RDC"),
        }
    }

    /// # Errors
    ///
    /// Returns [`Error::CompressedDataUnsupported`] for RLE and RDC datasets.
    pub fn ensure_supported(self) -> Result<()> {
        match self.method() {
            None => Ok(()),
            Some(method) => Err(Error::CompressedDataUnsupported {
                method: method.into(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RowSizeInfo {
    pub layout: RowLayout,
    pub label_ref: Option<TextRef>,
    pub compression_ref: Option<TextRef>,
}

/// Decodes the row size subheader. The trailing label and compression
/// references are only present in full-length subheaders.
///
/// # Errors
///
/// Returns an error if the fixed fields lie outside the subheader.
pub fn parse_row_size_subheader(
    subheader: &Subheader<'_>,
    architecture: ArchitectureMode,
) -> Result<RowSizeInfo> {
    let width = architecture.int_width();
    let data = &subheader.data;
    let layout = RowLayout {
        row_length: data.usize(5 * width, width)?,
        row_count: data.uint(6 * width, width)?,
        row_count_first_page: data.uint(15 * width, width)?,
    };

    let min_len = if architecture.is_64bit() { 250 } else { 190 };
    let (label_ref, compression_ref) = if data.len() >= min_len {
        (
            Some(TextRef::read(data, data.len() - 130)?),
            Some(TextRef::read(data, data.len() - 118)?),
        )
    } else {
        (None, None)
    };

    Ok(RowSizeInfo {
        layout,
        label_ref,
        compression_ref,
    })
}

/// Returns the declared column count.
///
/// # Errors
///
/// Returns an error if the count field lies outside the subheader.
pub fn parse_column_size_subheader(
    subheader: &Subheader<'_>,
    architecture: ArchitectureMode,
) -> Result<u64> {
    let width = architecture.int_width();
    subheader.data.uint(width, width)
}
