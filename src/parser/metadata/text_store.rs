use std::borrow::Cow;

use crate::error::{Error, Result, Section};
use crate::parser::bytes::ByteRegion;
use crate::parser::encoding::TextEncoding;
use crate::parser::header::ArchitectureMode;
use crate::parser::subheader::Subheader;

/// Reference into the column text pool used by SAS column metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRef {
    pub index: u16,
    pub offset: u16,
    pub length: u16,
}

impl TextRef {
    pub const EMPTY: Self = Self {
        index: 0,
        offset: 0,
        length: 0,
    };

    /// Reads the three `u16` fields (pool index, offset, length) at `at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the six bytes lie outside `region`.
    pub fn read(region: &ByteRegion<'_>, at: usize) -> Result<Self> {
        Ok(Self {
            index: region.u16(at)?,
            offset: region.u16(at + 2)?,
            length: region.u16(at + 4)?,
        })
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// Column text subheaders in encounter order. Each blob excludes the
/// subheader's leading signature word, so reference offsets index it directly.
#[derive(Debug)]
pub struct TextStore<'a> {
    blobs: Vec<ByteRegion<'a>>,
    encoding: TextEncoding,
}

impl<'a> TextStore<'a> {
    #[must_use]
    pub const fn new(encoding: TextEncoding) -> Self {
        Self {
            blobs: Vec::new(),
            encoding,
        }
    }

    /// Adds the text area of a column text subheader.
    ///
    /// # Errors
    ///
    /// Returns an error if the subheader is shorter than its signature word.
    pub fn push_subheader(
        &mut self,
        subheader: &Subheader<'a>,
        architecture: ArchitectureMode,
    ) -> Result<()> {
        let signature_len = architecture.int_width();
        let data = &subheader.data;
        let blob = data.sub_region(
            signature_len,
            data.len().saturating_sub(signature_len),
            data.section(),
        )?;
        self.blobs.push(blob);
        Ok(())
    }

    /// Resolves `text_ref` for `column`. Empty references yield `None`; the
    /// text is decoded verbatim, padding included.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] if the pool index is not a known text
    /// subheader or the referenced bytes run past the end of it.
    pub fn resolve(&self, text_ref: TextRef, column: usize) -> Result<Option<Cow<'a, str>>> {
        if text_ref.is_empty() {
            return Ok(None);
        }
        let index = usize::from(text_ref.index);
        let blob = self.blobs.get(index).ok_or(Error::OutOfBounds {
            section: Section::Column { index: column },
            offset: index,
            length: 1,
            available: self.blobs.len(),
        })?;
        let bytes = blob.slice(usize::from(text_ref.offset), usize::from(text_ref.length))?;
        Ok(Some(self.encoding.decode(bytes)))
    }
}
