use std::borrow::Cow;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result, Section};

/// A read that does not fit inside the buffer it targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfRange {
    pub offset: usize,
    pub length: usize,
    pub available: usize,
}

impl OutOfRange {
    #[must_use]
    pub const fn in_section(self, section: Section) -> Error {
        Error::OutOfBounds {
            section,
            offset: self.offset,
            length: self.length,
            available: self.available,
        }
    }
}

fn window(buffer: &[u8], index: usize, length: usize) -> std::result::Result<&[u8], OutOfRange> {
    index
        .checked_add(length)
        .and_then(|end| buffer.get(index..end))
        .ok_or(OutOfRange {
            offset: index,
            length,
            available: buffer.len(),
        })
}

/// Decodes a little-endian unsigned integer of `width` bytes at `index`.
///
/// Narrow fields are zero-extended, so a single `0xFF` byte is 255. Widths
/// outside `1..=8` are reported as out of range.
///
/// # Errors
///
/// Returns [`OutOfRange`] if `index + width` exceeds the buffer.
pub fn read_unsigned_int(
    buffer: &[u8],
    index: usize,
    width: usize,
) -> std::result::Result<u64, OutOfRange> {
    if !(1..=8).contains(&width) {
        return Err(OutOfRange {
            offset: index,
            length: width,
            available: buffer.len(),
        });
    }
    let bytes = window(buffer, index, width)?;
    Ok(LittleEndian::read_uint(bytes, width))
}

/// Decodes `length` bytes at `index` as ASCII. Padding is kept verbatim;
/// bytes outside the ASCII range become `?`.
///
/// This is the plain-ASCII reader. Character cells and metadata text are
/// decoded with the header's character set through
/// [`TextEncoding::decode`](crate::parser::TextEncoding::decode) instead.
///
/// # Errors
///
/// Returns [`OutOfRange`] if the string does not fit in the buffer.
pub fn read_ascii_string(
    buffer: &[u8],
    index: usize,
    length: usize,
) -> std::result::Result<Cow<'_, str>, OutOfRange> {
    let bytes = window(buffer, index, length)?;
    if bytes.is_ascii() {
        // ASCII is valid UTF-8.
        return Ok(Cow::Borrowed(
            std::str::from_utf8(bytes).unwrap_or_default(),
        ));
    }
    Ok(Cow::Owned(
        bytes
            .iter()
            .map(|&b| if b.is_ascii() { char::from(b) } else { '?' })
            .collect(),
    ))
}

/// Decodes an IEEE-754 double from the 8 bytes at `index`.
///
/// # Errors
///
/// Returns [`OutOfRange`] if fewer than 8 bytes remain at `index`.
pub fn read_float64(buffer: &[u8], index: usize) -> std::result::Result<f64, OutOfRange> {
    let bytes = window(buffer, index, 8)?;
    Ok(LittleEndian::read_f64(bytes))
}

/// Decodes a double stored in `width` bytes (1..=8). Short SAS numerics keep
/// the most significant bytes, so the missing low-order bytes are zero.
///
/// # Errors
///
/// Returns [`OutOfRange`] if the field does not fit in the buffer or the width
/// is not in `1..=8`.
pub fn read_truncated_float64(
    buffer: &[u8],
    index: usize,
    width: usize,
) -> std::result::Result<f64, OutOfRange> {
    if !(1..=8).contains(&width) {
        return Err(OutOfRange {
            offset: index,
            length: width,
            available: buffer.len(),
        });
    }
    let bytes = window(buffer, index, width)?;
    let mut padded = [0u8; 8];
    padded[8 - width..].copy_from_slice(bytes);
    Ok(LittleEndian::read_f64(&padded))
}

/// Borrowed window into the file buffer.
///
/// Pages, subheaders and text pools are all regions of the one buffer the
/// caller supplied; reads are bounds-checked against the region and failures
/// name the region's [`Section`].
#[derive(Debug, Clone, Copy)]
pub struct ByteRegion<'a> {
    bytes: &'a [u8],
    start: usize,
    section: Section,
}

impl<'a> ByteRegion<'a> {
    #[must_use]
    pub const fn new(bytes: &'a [u8], section: Section) -> Self {
        Self {
            bytes,
            start: 0,
            section,
        }
    }

    /// Narrows to `length` bytes at `offset` within this region. A window
    /// that does not fit is reported against the new region's `section`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] if the window exceeds this region.
    pub fn sub_region(&self, offset: usize, length: usize, section: Section) -> Result<Self> {
        let bytes = window(self.bytes, offset, length).map_err(|err| err.in_section(section))?;
        Ok(Self {
            bytes,
            start: self.start + offset,
            section,
        })
    }

    /// Offset of the region's first byte within the file buffer.
    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub const fn section(&self) -> Section {
        self.section
    }

    #[must_use]
    pub const fn as_slice(&self) -> &'a [u8] {
        self.bytes
    }

    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] if the window exceeds this region.
    pub fn slice(&self, offset: usize, length: usize) -> Result<&'a [u8]> {
        window(self.bytes, offset, length).map_err(|err| err.in_section(self.section))
    }

    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] if the byte lies outside this region.
    pub fn u8(&self, offset: usize) -> Result<u8> {
        Ok(self.slice(offset, 1)?[0])
    }

    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] if the field lies outside this region.
    pub fn uint(&self, offset: usize, width: usize) -> Result<u64> {
        read_unsigned_int(self.bytes, offset, width).map_err(|err| err.in_section(self.section))
    }

    /// Reads an unsigned field and converts it to a host offset or length.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] if the field lies outside this region, or
    /// [`Error::InvalidMetadata`] if the value does not fit in `usize`.
    pub fn usize(&self, offset: usize, width: usize) -> Result<usize> {
        let value = self.uint(offset, width)?;
        usize::try_from(value).map_err(|_| Error::InvalidMetadata {
            details: format!("{} field at offset {offset} exceeds host width", self.section)
                .into(),
        })
    }

    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] if the field lies outside this region.
    pub fn u16(&self, offset: usize) -> Result<u16> {
        let bytes = self.slice(offset, 2)?;
        Ok(LittleEndian::read_u16(bytes))
    }

    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] if the field lies outside this region.
    pub fn i16(&self, offset: usize) -> Result<i16> {
        let bytes = self.slice(offset, 2)?;
        Ok(LittleEndian::read_i16(bytes))
    }

    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] if the field lies outside this region.
    pub fn f64(&self, offset: usize) -> Result<f64> {
        read_float64(self.bytes, offset).map_err(|err| err.in_section(self.section))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_int_zero_extends_narrow_fields() {
        let buffer = [0xFF, 0xFF, 0x01, 0x00, 0x00, 0x80];
        assert_eq!(read_unsigned_int(&buffer, 0, 1).unwrap(), 255);
        assert_eq!(read_unsigned_int(&buffer, 0, 2).unwrap(), 0xFFFF);
        assert_eq!(read_unsigned_int(&buffer, 1, 2).unwrap(), 0x01FF);
        assert_eq!(read_unsigned_int(&buffer, 2, 4).unwrap(), 0x8000_0001);
    }

    #[test]
    fn unsigned_int_reads_eight_byte_fields() {
        let buffer = 0x0102_0304_0506_0708_u64.to_le_bytes();
        assert_eq!(
            read_unsigned_int(&buffer, 0, 8).unwrap(),
            0x0102_0304_0506_0708
        );
    }

    #[test]
    fn unsigned_int_rejects_reads_past_end() {
        let buffer = [0u8; 6];
        let err = read_unsigned_int(&buffer, 4, 4).unwrap_err();
        assert_eq!(
            err,
            OutOfRange {
                offset: 4,
                length: 4,
                available: 6
            }
        );
        assert!(read_unsigned_int(&buffer, usize::MAX, 2).is_err());
        assert!(read_unsigned_int(&buffer, 0, 0).is_err());
    }

    #[test]
    fn ascii_string_keeps_padding() {
        let buffer = b"xxAMT     yy";
        assert_eq!(read_ascii_string(buffer, 2, 8).unwrap(), "AMT     ");
    }

    #[test]
    fn ascii_string_replaces_non_ascii_bytes() {
        let buffer = [b'A', 0xE9, b'B'];
        assert_eq!(read_ascii_string(&buffer, 0, 3).unwrap(), "A?B");
    }

    #[test]
    fn float64_decodes_little_endian_double() {
        let mut buffer = vec![0u8; 3];
        buffer.extend_from_slice(&1234.5_f64.to_le_bytes());
        assert!((read_float64(&buffer, 3).unwrap() - 1234.5).abs() < f64::EPSILON);
        assert!(read_float64(&buffer, 4).is_err());
    }

    #[test]
    fn truncated_float_restores_high_order_bytes() {
        let full = 42.0_f64.to_le_bytes();
        // 42.0 has a zero mantissa tail, so the top 3 bytes carry the value.
        let stored = &full[5..];
        let value = read_truncated_float64(stored, 0, 3).unwrap();
        assert!((value - 42.0).abs() < f64::EPSILON);
    }

    #[test]
    fn region_errors_report_their_section() {
        let buffer = [0u8; 16];
        let region = ByteRegion::new(&buffer, Section::Buffer);
        let page = region
            .sub_region(8, 8, Section::Page { index: 1 })
            .unwrap();
        assert_eq!(page.start(), 8);
        let err = page.u16(7).unwrap_err();
        assert!(matches!(
            err,
            Error::OutOfBounds {
                section: Section::Page { index: 1 },
                offset: 7,
                length: 2,
                available: 8,
            }
        ));
    }

    #[test]
    fn region_signed_reads() {
        let buffer = (-28_672_i16).to_le_bytes();
        let region = ByteRegion::new(&buffer, Section::Buffer);
        assert_eq!(region.i16(0).unwrap(), -28_672);
        assert_eq!(region.u16(0).unwrap(), 0x9000);
    }
}
