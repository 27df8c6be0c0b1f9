use std::borrow::Cow;

use time::OffsetDateTime;

use super::bytes::ByteRegion;
use super::encoding::{TextEncoding, trim_trailing};
use super::epoch::sas_seconds_to_datetime;
use crate::error::{Error, Result, Section};

const SAS_ALIGNMENT_OFFSET_4: u8 = 0x33;
const SAS_ENDIAN_LITTLE: u8 = 0x01;

const ARCHITECTURE_MARKER_OFFSET: usize = 32;
const EXTENDED_HEADER_MARKER_OFFSET: usize = 35;
const ENDIANNESS_MARKER_OFFSET: usize = 37;
const ENCODING_OFFSET: usize = 70;
const TABLE_NAME_OFFSET: usize = 92;
const TABLE_NAME_LEN: usize = 32;

const TIMESTAMPS_OFFSET: usize = 164;
const HEADER_LENGTH_OFFSET: usize = 196;
const PAGE_SIZE_OFFSET: usize = 200;
const PAGE_COUNT_OFFSET: usize = 204;

/// Word size of the machine that wrote the file. Selects the width of
/// pointers and counts, and the offsets of most fixed fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchitectureMode {
    Bit32,
    Bit64,
}

impl ArchitectureMode {
    /// Width of pointer, count and length fields.
    #[must_use]
    pub const fn int_width(self) -> usize {
        match self {
            Self::Bit32 => 4,
            Self::Bit64 => 8,
        }
    }

    /// Size of the fixed header at the start of every page.
    #[must_use]
    pub const fn page_header_size(self) -> usize {
        match self {
            Self::Bit32 => 24,
            Self::Bit64 => 40,
        }
    }

    /// Size of one entry of a page's subheader pointer table.
    #[must_use]
    pub const fn subheader_pointer_size(self) -> usize {
        match self {
            Self::Bit32 => 12,
            Self::Bit64 => 24,
        }
    }

    #[must_use]
    pub const fn is_64bit(self) -> bool {
        matches!(self, Self::Bit64)
    }
}

/// Fixed fields decoded from the start of a SAS7BDAT file.
#[derive(Debug, Clone)]
pub struct FileHeader {
    pub architecture: ArchitectureMode,
    pub is_little_endian: bool,
    /// Extra offset applied to the header fields when the extended-header marker is set.
    pub pad_alignment: usize,
    pub header_length: usize,
    pub page_size: usize,
    pub page_count: usize,
    pub encoding: TextEncoding,
    pub dataset_name: Option<String>,
    pub created: Option<OffsetDateTime>,
    pub modified: Option<OffsetDateTime>,
}

/// Parses the file header from the complete file buffer.
///
/// # Errors
///
/// Returns [`Error::UnsupportedEndianness`] for big-endian files and
/// [`Error::OutOfBounds`] when the buffer is too short to hold the header.
pub fn parse_header(bytes: &[u8]) -> Result<FileHeader> {
    let region = ByteRegion::new(bytes, Section::Header);

    let architecture = if region.u8(ARCHITECTURE_MARKER_OFFSET)? == SAS_ALIGNMENT_OFFSET_4 {
        ArchitectureMode::Bit64
    } else {
        ArchitectureMode::Bit32
    };
    let pad_alignment = if region.u8(EXTENDED_HEADER_MARKER_OFFSET)? == SAS_ALIGNMENT_OFFSET_4 {
        4
    } else {
        0
    };

    let endian_marker = region.u8(ENDIANNESS_MARKER_OFFSET)?;
    if endian_marker != SAS_ENDIAN_LITTLE {
        return Err(Error::UnsupportedEndianness {
            marker: endian_marker,
        });
    }

    let header_length = region.usize(HEADER_LENGTH_OFFSET + pad_alignment, 4)?;
    let page_size = region.usize(PAGE_SIZE_OFFSET + pad_alignment, 4)?;
    let page_count = region.usize(PAGE_COUNT_OFFSET + pad_alignment, 4)?;

    if page_count > 0 && page_size == 0 {
        return Err(Error::InvalidMetadata {
            details: Cow::from("header declares pages of size zero"),
        });
    }

    let encoding = TextEncoding::from_header_code(region.u8(ENCODING_OFFSET)?);
    let dataset_name = decode_padded_string(
        region.slice(TABLE_NAME_OFFSET, TABLE_NAME_LEN)?,
        encoding,
    );
    let (created, modified) = read_timestamps(&region, TIMESTAMPS_OFFSET + pad_alignment)?;

    Ok(FileHeader {
        architecture,
        is_little_endian: true,
        pad_alignment,
        header_length,
        page_size,
        page_count,
        encoding,
        dataset_name,
        created,
        modified,
    })
}

fn read_timestamps(
    region: &ByteRegion<'_>,
    offset: usize,
) -> Result<(Option<OffsetDateTime>, Option<OffsetDateTime>)> {
    let creation_time = region.f64(offset)?;
    let modification_time = region.f64(offset + 8)?;
    let creation_diff = region.f64(offset + 16)?;
    let modification_diff = region.f64(offset + 24)?;
    Ok((
        convert_sas_time(creation_time, creation_diff),
        convert_sas_time(modification_time, modification_diff),
    ))
}

fn convert_sas_time(time: f64, diff: f64) -> Option<OffsetDateTime> {
    sas_seconds_to_datetime(time - diff)
}

fn decode_padded_string(bytes: &[u8], encoding: TextEncoding) -> Option<String> {
    let trimmed = trim_trailing(bytes);
    let decoded = encoding.decode(trimmed);
    let candidate = decoded.trim();
    if candidate.is_empty() {
        None
    } else {
        Some(candidate.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Date, Month};

    fn header_bytes(is_64: bool, extended: bool) -> Vec<u8> {
        let mut bytes = vec![0u8; 1024];
        if is_64 {
            bytes[ARCHITECTURE_MARKER_OFFSET] = SAS_ALIGNMENT_OFFSET_4;
        }
        let shift = if extended {
            bytes[EXTENDED_HEADER_MARKER_OFFSET] = SAS_ALIGNMENT_OFFSET_4;
            4
        } else {
            0
        };
        bytes[ENDIANNESS_MARKER_OFFSET] = SAS_ENDIAN_LITTLE;
        bytes[ENCODING_OFFSET] = 20;
        bytes[TABLE_NAME_OFFSET..TABLE_NAME_OFFSET + 8].copy_from_slice(b"SALES   ");
        bytes[196 + shift..200 + shift].copy_from_slice(&1024u32.to_le_bytes());
        bytes[200 + shift..204 + shift].copy_from_slice(&4096u32.to_le_bytes());
        bytes[204 + shift..208 + shift].copy_from_slice(&3u32.to_le_bytes());
        bytes
    }

    #[test]
    fn parses_32bit_header() {
        let header = parse_header(&header_bytes(false, false)).unwrap();
        assert_eq!(header.architecture, ArchitectureMode::Bit32);
        assert!(header.is_little_endian);
        assert_eq!(header.pad_alignment, 0);
        assert_eq!(header.header_length, 1024);
        assert_eq!(header.page_size, 4096);
        assert_eq!(header.page_count, 3);
        assert_eq!(header.dataset_name.as_deref(), Some("SALES"));
        assert_eq!(header.encoding.name(), "UTF-8");
    }

    #[test]
    fn extended_marker_shifts_header_fields() {
        let header = parse_header(&header_bytes(true, true)).unwrap();
        assert_eq!(header.architecture, ArchitectureMode::Bit64);
        assert_eq!(header.pad_alignment, 4);
        assert_eq!(header.header_length, 1024);
        assert_eq!(header.page_size, 4096);
        assert_eq!(header.page_count, 3);
    }

    #[test]
    fn big_endian_marker_is_rejected_regardless_of_fields() {
        for marker in [0x00, 0x02, 0xFF] {
            let mut bytes = header_bytes(true, false);
            bytes[ENDIANNESS_MARKER_OFFSET] = marker;
            let err = parse_header(&bytes).unwrap_err();
            assert!(matches!(err, Error::UnsupportedEndianness { marker: m } if m == marker));
        }
    }

    #[test]
    fn truncated_header_is_out_of_bounds() {
        let bytes = header_bytes(false, false);
        let err = parse_header(&bytes[..200]).unwrap_err();
        assert!(matches!(
            err,
            Error::OutOfBounds {
                section: Section::Header,
                ..
            }
        ));
    }

    #[test]
    fn timestamps_are_seconds_since_1960() {
        let mut bytes = header_bytes(false, false);
        let one_day = 86_400.0_f64;
        bytes[TIMESTAMPS_OFFSET..TIMESTAMPS_OFFSET + 8].copy_from_slice(&one_day.to_le_bytes());
        let header = parse_header(&bytes).unwrap();
        assert_eq!(
            header.created.unwrap().date(),
            Date::from_calendar_date(1960, Month::January, 2).unwrap()
        );
        assert_eq!(
            header.modified.unwrap().date(),
            Date::from_calendar_date(1960, Month::January, 1).unwrap()
        );
    }

    #[test]
    fn architecture_widths() {
        assert_eq!(ArchitectureMode::Bit32.int_width(), 4);
        assert_eq!(ArchitectureMode::Bit64.int_width(), 8);
        assert_eq!(ArchitectureMode::Bit64.page_header_size(), 40);
        assert_eq!(ArchitectureMode::Bit32.subheader_pointer_size(), 12);
    }
}
