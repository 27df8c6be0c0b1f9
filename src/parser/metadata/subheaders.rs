use crate::error::Result;
use crate::parser::header::ArchitectureMode;
use crate::parser::subheader::Subheader;

use super::builder::ColumnMetadataBuilder;
use super::column_info::{ColumnInfo, ColumnKind};
use super::text_store::TextRef;

const NAME_ENTRY_WIDTH: usize = 8;

/// Bytes before the first entry of an attribute or name subheader.
const fn entries_start(architecture: ArchitectureMode) -> usize {
    architecture.int_width() + 8
}

/// Entries packed into a column attribute or column name subheader. The
/// subheader carries a signature word, an 8-byte prefix and a trailer of one
/// word plus 4 bytes around the entries.
const fn entry_count(length: usize, architecture: ArchitectureMode, entry_width: usize) -> usize {
    length.saturating_sub(2 * architecture.int_width() + 12) / entry_width
}

/// Appends one column per attribute vector. Indices continue across
/// subheaders.
///
/// # Errors
///
/// Returns an error if a vector lies outside the subheader.
pub fn parse_column_attrs_subheader(
    builder: &mut ColumnMetadataBuilder<'_>,
    subheader: &Subheader<'_>,
    architecture: ArchitectureMode,
) -> Result<()> {
    let width = architecture.int_width();
    let vector_width = width + 8;
    let data = &subheader.data;
    let entries = entry_count(data.len(), architecture, vector_width);

    let mut cursor = entries_start(architecture);
    for _ in 0..entries {
        let row_offset = data.usize(cursor, width)?;
        let row_length = data.usize(cursor + width, 4)?;
        let kind = ColumnKind::from_type_code(data.u8(cursor + width + 6)?);
        let index = builder.attrs_seen();
        builder.push_column(ColumnInfo::new(index, kind, row_offset, row_length));
        cursor += vector_width;
    }
    Ok(())
}

/// Names columns in encounter order through the text pool.
///
/// # Errors
///
/// Returns [`crate::Error::ColumnPropertyNotFound`] when an entry has no
/// matching attribute column, or an out-of-bounds error for unresolvable text.
pub fn parse_column_name_subheader(
    builder: &mut ColumnMetadataBuilder<'_>,
    subheader: &Subheader<'_>,
    architecture: ArchitectureMode,
) -> Result<()> {
    let data = &subheader.data;
    let entries = entry_count(data.len(), architecture, NAME_ENTRY_WIDTH);

    let mut cursor = entries_start(architecture);
    let start_index = builder.names_seen();
    for offset in 0..entries {
        let index = start_index + offset;
        let text_ref = TextRef::read(data, cursor)?;
        let name = builder
            .text_store()
            .resolve(text_ref, index)?
            .unwrap_or_default()
            .into_owned();
        builder.column_mut(index)?.name = Some(name);
        cursor += NAME_ENTRY_WIDTH;
    }
    builder.note_names_processed(entries);
    Ok(())
}

/// Applies one format subheader to the next column in index order.
///
/// # Errors
///
/// Returns [`crate::Error::ColumnPropertyNotFound`] when there are more format
/// subheaders than columns, or an error for unreadable references.
pub fn parse_column_format_subheader(
    builder: &mut ColumnMetadataBuilder<'_>,
    subheader: &Subheader<'_>,
    architecture: ArchitectureMode,
) -> Result<()> {
    let data = &subheader.data;
    let index = builder.formats_seen();
    let (format_at, label_at) = if architecture.is_64bit() {
        (46, 52)
    } else {
        (34, 40)
    };
    let format_ref = TextRef::read(data, format_at)?;
    let label_ref = TextRef::read(data, label_at)?;
    let (format_width, format_decimals) = if architecture.is_64bit() {
        (Some(data.u16(24)?), Some(data.u16(26)?))
    } else {
        (None, None)
    };

    let store = builder.text_store();
    let format = store
        .resolve(format_ref, index)?
        .map(std::borrow::Cow::into_owned);
    let label = store
        .resolve(label_ref, index)?
        .map(std::borrow::Cow::into_owned);

    let column = builder.column_mut(index)?;
    column.format = format;
    column.label = label;
    column.format_width = format_width;
    column.format_decimals = format_decimals;
    builder.note_formats_processed();
    Ok(())
}
