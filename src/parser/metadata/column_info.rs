use std::fmt;

use crate::error::{Error, Result};

/// Format name that marks a numeric column as a day count.
pub const DATE_FORMAT: &str = "YYMMDD";

/// Storage class from the column attribute vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Character,
}

impl ColumnKind {
    #[must_use]
    pub const fn from_type_code(code: u8) -> Self {
        match code {
            0x01 => Self::Numeric,
            _ => Self::Character,
        }
    }
}

/// Semantic type declared to output sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Date,
    Decimal,
}

impl ColumnType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Date => "date",
            Self::Decimal => "decimal",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully resolved column description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnProperty {
    /// Zero-based position, in attribute order.
    pub index: usize,
    /// Name as stored, padding included.
    pub name: String,
    pub kind: ColumnKind,
    pub row_offset: usize,
    pub row_length: usize,
    pub format: Option<String>,
    pub label: Option<String>,
    pub format_width: Option<u16>,
    pub format_decimals: Option<u16>,
}

impl ColumnProperty {
    #[must_use]
    pub fn column_type(&self) -> ColumnType {
        match self.kind {
            ColumnKind::Character => ColumnType::Text,
            ColumnKind::Numeric if self.has_date_format() => ColumnType::Date,
            ColumnKind::Numeric => ColumnType::Decimal,
        }
    }

    #[must_use]
    pub fn has_date_format(&self) -> bool {
        self.format
            .as_deref()
            .is_some_and(|format| format.trim().eq_ignore_ascii_case(DATE_FORMAT))
    }

    #[must_use]
    pub fn trimmed_name(&self) -> &str {
        self.name.trim_end()
    }

    /// Columns without stored bytes produce no cell data.
    #[must_use]
    pub const fn is_stored(&self) -> bool {
        self.row_length > 0
    }
}

/// Column state accumulated while the metadata subheaders are processed.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    pub index: usize,
    pub kind: ColumnKind,
    pub row_offset: usize,
    pub row_length: usize,
    pub name: Option<String>,
    pub format: Option<String>,
    pub label: Option<String>,
    pub format_width: Option<u16>,
    pub format_decimals: Option<u16>,
}

impl ColumnInfo {
    #[must_use]
    pub const fn new(index: usize, kind: ColumnKind, row_offset: usize, row_length: usize) -> Self {
        Self {
            index,
            kind,
            row_offset,
            row_length,
            name: None,
            format: None,
            label: None,
            format_width: None,
            format_decimals: None,
        }
    }

    /// # Errors
    ///
    /// Returns [`Error::ColumnPropertyNotFound`] if no name entry reached this column.
    pub fn into_property(self) -> Result<ColumnProperty> {
        let name = self
            .name
            .ok_or(Error::ColumnPropertyNotFound { index: self.index })?;
        Ok(ColumnProperty {
            index: self.index,
            name,
            kind: self.kind,
            row_offset: self.row_offset,
            row_length: self.row_length,
            format: self.format,
            label: self.label,
            format_width: self.format_width,
            format_decimals: self.format_decimals,
        })
    }
}
