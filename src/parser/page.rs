use super::bytes::ByteRegion;
use super::header::{ArchitectureMode, FileHeader};
use crate::error::{Error, Result, Section};

pub const SAS_PAGE_TYPE_META: i16 = 0;
pub const SAS_PAGE_TYPE_MIX: i16 = 512;
pub const SAS_PAGE_TYPE_AMD: i16 = 1024;
pub const SAS_PAGE_TYPE_META_COMPRESSED: i16 = 16384;
pub const SAS_PAGE_TYPE_COMP: i16 = -28672;

/// Classification of a page by the type code in its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    Meta,
    Mix,
    Amd,
    MetaCompressed,
    Comp,
    /// Ordinary data page or any unrecognized code.
    Other(i16),
}

impl PageType {
    #[must_use]
    pub const fn from_code(code: i16) -> Self {
        match code {
            SAS_PAGE_TYPE_META => Self::Meta,
            SAS_PAGE_TYPE_MIX => Self::Mix,
            SAS_PAGE_TYPE_AMD => Self::Amd,
            SAS_PAGE_TYPE_META_COMPRESSED => Self::MetaCompressed,
            SAS_PAGE_TYPE_COMP => Self::Comp,
            other => Self::Other(other),
        }
    }

    #[must_use]
    pub const fn code(self) -> i16 {
        match self {
            Self::Meta => SAS_PAGE_TYPE_META,
            Self::Mix => SAS_PAGE_TYPE_MIX,
            Self::Amd => SAS_PAGE_TYPE_AMD,
            Self::MetaCompressed => SAS_PAGE_TYPE_META_COMPRESSED,
            Self::Comp => SAS_PAGE_TYPE_COMP,
            Self::Other(code) => code,
        }
    }

    /// Pages that start with a subheader pointer table.
    #[must_use]
    pub const fn has_subheaders(self) -> bool {
        matches!(
            self,
            Self::Meta | Self::Mix | Self::Amd | Self::MetaCompressed
        )
    }

    /// Pages whose data area holds rows.
    #[must_use]
    pub const fn has_rows(self) -> bool {
        matches!(self, Self::Mix | Self::Other(_))
    }

    #[must_use]
    pub const fn is_compressed(self) -> bool {
        matches!(self, Self::MetaCompressed | Self::Comp)
    }
}

/// One fixed-size page of the file.
#[derive(Debug, Clone, Copy)]
pub struct Page<'a> {
    /// Zero-based position of the page after the file header.
    pub index: usize,
    pub region: ByteRegion<'a>,
    pub page_type: PageType,
    /// Row count field of the page header; meaningful for data pages.
    pub block_count: u16,
    pub subheader_count: u16,
}

impl<'a> Page<'a> {
    /// Reads the page header fields of `region`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] if the page is smaller than its header.
    pub fn from_region(
        index: usize,
        region: ByteRegion<'a>,
        architecture: ArchitectureMode,
    ) -> Result<Self> {
        // type, block count and subheader count are the last fields of the page header.
        let type_offset = architecture.page_header_size() - 8;
        let page_type = PageType::from_code(region.i16(type_offset)?);
        let block_count = region.u16(type_offset + 2)?;
        let subheader_count = region.u16(type_offset + 4)?;
        Ok(Self {
            index,
            region,
            page_type,
            block_count,
            subheader_count,
        })
    }
}

/// Splits the bytes after the header into `page_count` non-overlapping pages
/// of `page_size` bytes each.
///
/// # Errors
///
/// Returns [`Error::OutOfBounds`] if the buffer ends before the last page.
pub fn segment_pages<'a>(bytes: &'a [u8], header: &FileHeader) -> Result<Vec<Page<'a>>> {
    let file = ByteRegion::new(bytes, Section::Buffer);
    // page_count comes straight from the file; only pages the buffer can hold are reserved.
    let room = bytes.len().saturating_sub(header.header_length) / header.page_size.max(1);
    let mut pages = Vec::with_capacity(header.page_count.min(room));
    for index in 0..header.page_count {
        let start = index
            .checked_mul(header.page_size)
            .and_then(|offset| offset.checked_add(header.header_length))
            .ok_or_else(|| Error::InvalidMetadata {
                details: format!("page {index} offset overflows the address space").into(),
            })?;
        let region = file.sub_region(start, header.page_size, Section::Page { index })?;
        pages.push(Page::from_region(index, region, header.architecture)?);
    }
    Ok(pages)
}
