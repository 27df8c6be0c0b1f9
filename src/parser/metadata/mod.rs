//! Column metadata reconstruction.
//!
//! The schema is assembled from the metadata subheaders of every page:
//! row size and column size give the geometry, column text subheaders form the
//! string pool, and the attribute, name and format subheaders describe each
//! column through references into that pool.

mod builder;
mod column_info;
mod row_info;
mod subheaders;
mod text_store;


use crate::error::{Error, Result};
use crate::parser::header::FileHeader;
use crate::parser::subheader::{Subheader, SubheaderKind};

pub use builder::ColumnMetadataBuilder;
pub use column_info::{ColumnKind, ColumnProperty, ColumnType, DATE_FORMAT};
pub use row_info::{Compression, RowLayout, parse_column_size_subheader, parse_row_size_subheader};
pub use subheaders::{
    parse_column_attrs_subheader, parse_column_format_subheader, parse_column_name_subheader,
};
pub use text_store::TextRef;

/// Everything known about a dataset before its rows are read.
#[derive(Debug, Clone)]
pub struct DatasetLayout {
    pub header: FileHeader,
    pub row_layout: RowLayout,
    /// Columns in index order; the length equals the declared column count.
    pub columns: Vec<ColumnProperty>,
    pub file_label: Option<String>,
    pub compression: Compression,
}

impl DatasetLayout {
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub const fn row_count(&self) -> u64 {
        self.row_layout.row_count
    }

    /// Finds a column by exact or trailing-space-trimmed name.
    #[must_use]
    pub fn column_by_name(&self, name: &str) -> Option<&ColumnProperty> {
        self.columns
            .iter()
            .find(|column| column.name == name || column.trimmed_name() == name)
    }
}

fn first_of<'s, 'a>(
    subheaders: &'s [Subheader<'a>],
    kind: SubheaderKind,
) -> Result<&'s Subheader<'a>> {
    subheaders
        .iter()
        .find(|subheader| subheader.is(kind))
        .ok_or(Error::MissingSubheader(kind))
}

fn all_of<'s, 'a>(
    subheaders: &'s [Subheader<'a>],
    kind: SubheaderKind,
) -> Result<Vec<&'s Subheader<'a>>> {
    let found: Vec<_> = subheaders
        .iter()
        .filter(|subheader| subheader.is(kind))
        .collect();
    if found.is_empty() {
        return Err(Error::MissingSubheader(kind));
    }
    Ok(found)
}

/// Builds the dataset layout from the subheaders of all pages, in page
/// order.
///
/// # Errors
///
/// Fails with [`Error::MissingSubheader`] when a required kind is absent
/// (checked in the order row size, column size, column text, column
/// attribute, column name), [`Error::CompressedDataUnsupported`] for RLE or
/// RDC datasets, [`Error::ColumnCountMismatch`] when the attribute vectors
/// disagree with the declared count, and [`Error::ColumnPropertyNotFound`]
/// when a name or format entry has no column or a column has no name.
pub fn build_layout(header: FileHeader, subheaders: &[Subheader<'_>]) -> Result<DatasetLayout> {
    let architecture = header.architecture;

    let row_size = first_of(subheaders, SubheaderKind::RowSize)?;
    let column_size = first_of(subheaders, SubheaderKind::ColumnSize)?;
    let texts = all_of(subheaders, SubheaderKind::ColumnText)?;
    let attributes = all_of(subheaders, SubheaderKind::ColumnAttribute)?;
    let names = all_of(subheaders, SubheaderKind::ColumnName)?;

    let row_info = parse_row_size_subheader(row_size, architecture)?;
    let declared = parse_column_size_subheader(column_size, architecture)?;

    let mut builder = ColumnMetadataBuilder::new(header.encoding);
    for text in texts {
        builder.text_store_mut().push_subheader(text, architecture)?;
    }

    let compression = match row_info.compression_ref {
        Some(text_ref) => builder
            .text_store()
            .resolve(text_ref, 0)?
            .map_or(Compression::None, |literal| Compression::from_literal(&literal)),
        None => Compression::None,
    };
    compression.ensure_supported()?;

    let file_label = match row_info.label_ref {
        Some(text_ref) => builder
            .text_store()
            .resolve(text_ref, 0)?
            .map(|label| label.trim_end().to_owned())
            .filter(|label| !label.is_empty()),
        None => None,
    };

    for attribute in attributes {
        parse_column_attrs_subheader(&mut builder, attribute, architecture)?;
    }
    let found = builder.attrs_seen();
    if u64::try_from(found).ok() != Some(declared) {
        return Err(Error::ColumnCountMismatch { declared, found });
    }

    for name in names {
        parse_column_name_subheader(&mut builder, name, architecture)?;
    }
    for format in subheaders
        .iter()
        .filter(|subheader| subheader.is(SubheaderKind::ColumnFormat))
    {
        parse_column_format_subheader(&mut builder, format, architecture)?;
    }

    let (_, columns) = builder.finalize()?;

    Ok(DatasetLayout {
        header,
        row_layout: row_info.layout,
        columns,
        file_label,
        compression,
    })
}
