use std::fmt;

use super::bytes::ByteRegion;
use super::header::ArchitectureMode;
use super::page::Page;
use crate::error::{Result, Section};

pub const SIG_ROW_SIZE: [u8; 4] = [0xF7, 0xF7, 0xF7, 0xF7];
pub const SIG_COLUMN_SIZE: [u8; 4] = [0xF6, 0xF6, 0xF6, 0xF6];
pub const SIG_COLUMN_TEXT: [u8; 4] = [0xFD, 0xFF, 0xFF, 0xFF];
pub const SIG_COLUMN_ATTRS: [u8; 4] = [0xFC, 0xFF, 0xFF, 0xFF];
pub const SIG_COLUMN_NAME: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];
pub const SIG_COLUMN_FORMAT: [u8; 4] = [0xFE, 0xFB, 0xFF, 0xFF];

const SIGNATURE_LEN: usize = 4;
const POINTER_TRUNCATED: u8 = 1;

/// Metadata subheader kinds recognized by signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubheaderKind {
    RowSize,
    ColumnSize,
    ColumnText,
    ColumnAttribute,
    ColumnName,
    ColumnFormat,
}

impl SubheaderKind {
    pub const ALL: [Self; 6] = [
        Self::RowSize,
        Self::ColumnSize,
        Self::ColumnText,
        Self::ColumnAttribute,
        Self::ColumnName,
        Self::ColumnFormat,
    ];

    #[must_use]
    pub const fn signature(self) -> [u8; 4] {
        match self {
            Self::RowSize => SIG_ROW_SIZE,
            Self::ColumnSize => SIG_COLUMN_SIZE,
            Self::ColumnText => SIG_COLUMN_TEXT,
            Self::ColumnAttribute => SIG_COLUMN_ATTRS,
            Self::ColumnName => SIG_COLUMN_NAME,
            Self::ColumnFormat => SIG_COLUMN_FORMAT,
        }
    }

    /// Exact byte-sequence match against the known signatures.
    #[must_use]
    pub fn from_signature(signature: [u8; 4]) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.signature() == signature)
    }
}

impl fmt::Display for SubheaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RowSize => "row size",
            Self::ColumnSize => "column size",
            Self::ColumnText => "column text",
            Self::ColumnAttribute => "column attribute",
            Self::ColumnName => "column name",
            Self::ColumnFormat => "column format",
        };
        f.write_str(name)
    }
}

/// A signed metadata block located through a page's pointer table.
#[derive(Debug, Clone, Copy)]
pub struct Subheader<'a> {
    pub page_index: usize,
    /// Offset of the block from the start of its page.
    pub offset: usize,
    pub length: usize,
    pub signature: [u8; 4],
    pub data: ByteRegion<'a>,
}

impl Subheader<'_> {
    #[must_use]
    pub fn kind(&self) -> Option<SubheaderKind> {
        SubheaderKind::from_signature(self.signature)
    }

    #[must_use]
    pub fn is(&self, kind: SubheaderKind) -> bool {
        self.signature == kind.signature()
    }
}

/// Entry of a page's subheader pointer table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerInfo {
    pub offset: usize,
    pub length: usize,
    pub compression: u8,
}

/// Decodes one pointer entry: offset and length are word-sized, followed by
/// the compression flag byte.
///
/// # Errors
///
/// Returns an error if the entry lies outside the page.
pub fn parse_pointer(
    page: &ByteRegion<'_>,
    at: usize,
    architecture: ArchitectureMode,
) -> Result<PointerInfo> {
    let width = architecture.int_width();
    Ok(PointerInfo {
        offset: page.usize(at, width)?,
        length: page.usize(at + width, width)?,
        compression: page.u8(at + 2 * width)?,
    })
}

/// Lists the subheaders of a metadata-bearing page in pointer-table order.
///
/// Pages without a pointer table yield nothing. Empty or truncated pointer
/// slots and blocks too short to carry a signature are skipped.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] when the pointer table or a block it
/// points to extends past the end of the page.
pub fn scan_subheaders<'a>(
    page: &Page<'a>,
    architecture: ArchitectureMode,
) -> Result<Vec<Subheader<'a>>> {
    if !page.page_type.has_subheaders() {
        return Ok(Vec::new());
    }

    let pointer_size = architecture.subheader_pointer_size();
    let mut cursor = architecture.page_header_size();
    let mut subheaders = Vec::with_capacity(usize::from(page.subheader_count));
    for _ in 0..page.subheader_count {
        let pointer = parse_pointer(&page.region, cursor, architecture)?;
        cursor += pointer_size;

        if pointer.length == 0 || pointer.compression == POINTER_TRUNCATED {
            continue;
        }
        let block = page.region.sub_region(
            pointer.offset,
            pointer.length,
            Section::Page { index: page.index },
        )?;
        let Ok(head) = block.slice(0, SIGNATURE_LEN) else {
            continue;
        };
        let signature = [head[0], head[1], head[2], head[3]];
        let data = page.region.sub_region(
            pointer.offset,
            pointer.length,
            Section::subheader(page.index, signature),
        )?;
        subheaders.push(Subheader {
            page_index: page.index,
            offset: pointer.offset,
            length: pointer.length,
            signature,
            data,
        });
    }
    Ok(subheaders)
}

/// Subheaders of every page, concatenated in page order.
///
/// # Errors
///
/// Propagates the first scanning failure.
pub fn scan_all<'a>(
    pages: &[Page<'a>],
    architecture: ArchitectureMode,
) -> Result<Vec<Subheader<'a>>> {
    let mut all = Vec::new();
    for page in pages {
        all.extend(scan_subheaders(page, architecture)?);
    }
    Ok(all)
}
