use std::collections::HashSet;
use std::path::Path;

use crate::error::{Error, Result};
use crate::parser::{
    DatasetLayout, Page, RowSelection, build_layout, materialize_rows, parse_header, scan_all,
    segment_pages,
};
use crate::sinks::{OutputColumn, SinkContext, Table, TableSink};

/// Configures labelling, pagination and projection of decoded rows.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    table_name: Option<String>,
    skip_rows: Option<u64>,
    max_rows: Option<u64>,
    column_indices: Option<Vec<usize>>,
    column_names: Option<Vec<String>>,
}

impl ReadOptions {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            table_name: None,
            skip_rows: None,
            max_rows: None,
            column_indices: None,
            column_names: None,
        }
    }

    /// Label attached to the output table. Defaults to the dataset name
    /// stored in the file header.
    #[must_use]
    pub fn with_table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    #[must_use]
    pub const fn with_skip_rows(mut self, count: u64) -> Self {
        self.skip_rows = Some(count);
        self
    }

    #[must_use]
    pub const fn with_max_rows(mut self, count: u64) -> Self {
        self.max_rows = Some(count);
        self
    }

    #[must_use]
    pub fn with_column_indices<I>(mut self, indices: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        let collected: Vec<usize> = indices.into_iter().collect();
        self.column_indices = if collected.is_empty() {
            None
        } else {
            Some(collected)
        };
        self
    }

    #[must_use]
    pub fn with_column_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut collected: Vec<String> = names.into_iter().map(Into::into).collect();
        collected.retain(|name| !name.is_empty());
        self.column_names = if collected.is_empty() {
            None
        } else {
            Some(collected)
        };
        self
    }

    #[must_use]
    pub fn table_name(&self) -> Option<&str> {
        self.table_name.as_deref()
    }

    /// Resolves the rows and columns these options select from `layout`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMetadata`] for unknown or duplicate columns.
    pub fn selection(&self, layout: &DatasetLayout) -> Result<RowSelection> {
        let columns = match self.resolve_projection(layout)? {
            Some(columns) => columns,
            None => (0..layout.column_count()).collect(),
        };
        Ok(RowSelection {
            skip: self.skip_rows.unwrap_or(0),
            max_rows: self.max_rows,
            columns,
        })
    }

    fn resolve_projection(&self, layout: &DatasetLayout) -> Result<Option<Vec<usize>>> {
        if let Some(indices) = &self.column_indices {
            let mut seen = HashSet::with_capacity(indices.len());
            for &index in indices {
                if index >= layout.column_count() {
                    return Err(Error::InvalidMetadata {
                        details: format!(
                            "column projection index {index} is out of range for {} columns",
                            layout.column_count()
                        )
                        .into(),
                    });
                }
                insert_projection_index(&index.to_string(), index, &mut seen)?;
            }
            return Ok(Some(indices.clone()));
        }

        let Some(names) = &self.column_names else {
            return Ok(None);
        };
        let mut resolved = Vec::with_capacity(names.len());
        let mut seen = HashSet::with_capacity(names.len());
        for name in names {
            let column = layout
                .column_by_name(name)
                .or_else(|| layout.column_by_name(name.trim_end()))
                .ok_or_else(|| Error::InvalidMetadata {
                    details: format!("column name '{name}' not found in metadata").into(),
                })?;
            insert_projection_index(name, column.index, &mut seen)?;
            resolved.push(column.index);
        }
        Ok(Some(resolved))
    }
}

fn insert_projection_index(name: &str, index: usize, seen: &mut HashSet<usize>) -> Result<()> {
    if seen.insert(index) {
        return Ok(());
    }
    Err(Error::InvalidMetadata {
        details: format!(
            "column projection resolves duplicate column index {index} for '{name}'"
        )
        .into(),
    })
}

/// Header, pages and schema of a buffer, ready for row materialisation.
fn decode(bytes: &[u8]) -> Result<(DatasetLayout, Vec<Page<'_>>)> {
    let header = parse_header(bytes)?;
    let pages = segment_pages(bytes, &header)?;
    if let Some(page) = pages.iter().find(|page| page.page_type.is_compressed()) {
        return Err(Error::CompressedPageUnsupported {
            page_index: page.index,
            page_type: page.page_type.code(),
        });
    }
    let subheaders = scan_all(&pages, header.architecture)?;
    let layout = build_layout(header, &subheaders)?;
    Ok((layout, pages))
}

fn write_rows<S: TableSink + ?Sized>(
    layout: &DatasetLayout,
    pages: &[Page<'_>],
    options: &ReadOptions,
    sink: &mut S,
) -> Result<u64> {
    let selection = options.selection(layout)?;
    let columns: Vec<OutputColumn> = selection
        .columns
        .iter()
        .map(|&index| OutputColumn::from_property(&layout.columns[index]))
        .collect();
    let table_name = options
        .table_name()
        .or(layout.header.dataset_name.as_deref());
    sink.begin(SinkContext {
        table_name,
        columns: &columns,
    })?;
    let written = materialize_rows(pages, layout, &selection, sink)?;
    sink.finish()?;
    Ok(written)
}

/// Decodes the header and column schema without reading any rows.
///
/// # Errors
///
/// Returns the first decoding failure; see [`parse_data`].
pub fn decode_layout(bytes: &[u8]) -> Result<DatasetLayout> {
    decode(bytes).map(|(layout, _)| layout)
}

/// Decodes a complete file buffer into an in-memory [`Table`].
///
/// # Errors
///
/// Fails with [`Error::UnsupportedEndianness`] for big-endian files,
/// [`Error::CompressedPageUnsupported`] if any page is compressed, the
/// metadata errors of [`crate::parser::build_layout`], or
/// [`Error::OutOfBounds`] for truncated input.
pub fn parse_data(bytes: &[u8], table_name: Option<&str>) -> Result<Table> {
    let mut options = ReadOptions::new();
    if let Some(name) = table_name {
        options = options.with_table_name(name);
    }
    let mut table = Table::new();
    parse_into(bytes, &options, &mut table)?;
    Ok(table)
}

/// Decodes `bytes` into `sink`, returning the number of rows written.
///
/// # Errors
///
/// Returns decoding failures, projection errors and sink failures.
pub fn parse_into<S: TableSink + ?Sized>(
    bytes: &[u8],
    options: &ReadOptions,
    sink: &mut S,
) -> Result<u64> {
    let (layout, pages) = decode(bytes)?;
    write_rows(&layout, &pages, options, sink)
}

/// A loaded file with its decoded layout.
#[derive(Debug, Clone)]
pub struct SasFile {
    bytes: Vec<u8>,
    layout: DatasetLayout,
}

impl SasFile {
    /// Reads the whole file at `path` and decodes its layout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, or a decoding error.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(bytes)
    }

    /// # Errors
    ///
    /// Returns the first decoding failure.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let layout = decode_layout(&bytes)?;
        Ok(Self { bytes, layout })
    }

    #[must_use]
    pub const fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// # Errors
    ///
    /// Returns projection errors or a row decoding failure.
    pub fn to_table(&self, options: &ReadOptions) -> Result<Table> {
        let mut table = Table::new();
        self.write_into(options, &mut table)?;
        Ok(table)
    }

    /// Streams the selected rows into `sink`.
    ///
    /// # Errors
    ///
    /// Returns projection errors, row decoding failures or sink failures.
    pub fn write_into<S: TableSink + ?Sized>(
        &self,
        options: &ReadOptions,
        sink: &mut S,
    ) -> Result<u64> {
        let pages = segment_pages(&self.bytes, &self.layout.header)?;
        write_rows(&self.layout, &pages, options, sink)
    }
}
