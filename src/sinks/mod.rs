mod csv;
mod table;

use crate::error::Result;
use crate::parser::{ColumnProperty, ColumnType};
use crate::value::Value;

pub use self::csv::CsvSink;
pub use table::Table;

/// Column declared to a sink before any row arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputColumn {
    /// Name as stored in the file, padding included.
    pub name: String,
    pub column_type: ColumnType,
}

impl OutputColumn {
    #[must_use]
    pub fn from_property(column: &ColumnProperty) -> Self {
        Self {
            name: column.name.clone(),
            column_type: column.column_type(),
        }
    }

    #[must_use]
    pub fn trimmed_name(&self) -> &str {
        self.name.trim_end()
    }
}

/// Provides the output schema to sinks during initialisation.
#[derive(Debug, Clone, Copy)]
pub struct SinkContext<'a> {
    pub table_name: Option<&'a str>,
    pub columns: &'a [OutputColumn],
}

/// Trait implemented by consumers of decoded rows.
pub trait TableSink {
    /// Called once, before any rows are written.
    fn begin(&mut self, context: SinkContext<'_>) -> Result<()>;

    /// Invoked for every decoded row, one value per declared column.
    fn write_row(&mut self, row: &[Value<'_>]) -> Result<()>;

    /// Called once all rows have been forwarded to the sink.
    fn finish(&mut self) -> Result<()>;
}
