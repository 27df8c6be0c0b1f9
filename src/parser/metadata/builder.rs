use crate::error::{Error, Result};
use crate::parser::encoding::TextEncoding;

use super::column_info::{ColumnInfo, ColumnProperty};
use super::text_store::TextStore;

/// Accumulates columns across attribute, name and format subheaders.
#[derive(Debug)]
pub struct ColumnMetadataBuilder<'a> {
    text_store: TextStore<'a>,
    columns: Vec<ColumnInfo>,
    names_seen: usize,
    formats_seen: usize,
}

impl<'a> ColumnMetadataBuilder<'a> {
    #[must_use]
    pub const fn new(encoding: TextEncoding) -> Self {
        Self {
            text_store: TextStore::new(encoding),
            columns: Vec::new(),
            names_seen: 0,
            formats_seen: 0,
        }
    }

    #[must_use]
    pub const fn text_store(&self) -> &TextStore<'a> {
        &self.text_store
    }

    pub const fn text_store_mut(&mut self) -> &mut TextStore<'a> {
        &mut self.text_store
    }

    /// Index the next attribute vector will be assigned.
    #[must_use]
    pub fn attrs_seen(&self) -> usize {
        self.columns.len()
    }

    pub fn push_column(&mut self, column: ColumnInfo) {
        self.columns.push(column);
    }

    /// # Errors
    ///
    /// Returns [`Error::ColumnPropertyNotFound`] if no attribute entry created
    /// the column.
    pub fn column_mut(&mut self, index: usize) -> Result<&mut ColumnInfo> {
        self.columns
            .get_mut(index)
            .ok_or(Error::ColumnPropertyNotFound { index })
    }

    #[cfg(test)]
    pub fn column(&self, index: usize) -> Option<&ColumnInfo> {
        self.columns.get(index)
    }

    pub const fn note_names_processed(&mut self, count: usize) {
        self.names_seen += count;
    }

    #[must_use]
    pub const fn names_seen(&self) -> usize {
        self.names_seen
    }

    pub const fn note_formats_processed(&mut self) {
        self.formats_seen += 1;
    }

    #[must_use]
    pub const fn formats_seen(&self) -> usize {
        self.formats_seen
    }

    /// Consumes the builder, requiring a name for every column.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ColumnPropertyNotFound`] for the first unnamed column.
    pub fn finalize(self) -> Result<(TextStore<'a>, Vec<ColumnProperty>)> {
        let columns = self
            .columns
            .into_iter()
            .map(ColumnInfo::into_property)
            .collect::<Result<Vec<_>>>()?;
        Ok((self.text_store, columns))
    }
}
