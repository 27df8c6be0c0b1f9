use std::borrow::Cow;

use crate::error::{Error, Result};
use crate::parser::ColumnType;
use crate::sinks::{OutputColumn, SinkContext, TableSink};
use crate::value::Value;

/// In-memory table owning every decoded cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    name: Option<String>,
    columns: Vec<OutputColumn>,
    rows: Vec<Vec<Value<'static>>>,
    started: bool,
}

impl Table {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn columns(&self) -> &[OutputColumn] {
        &self.columns
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<Value<'static>>] {
        &self.rows
    }

    #[must_use]
    pub fn row(&self, index: usize) -> Option<&[Value<'static>]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    #[must_use]
    pub fn cell(&self, row: usize, column: usize) -> Option<&Value<'static>> {
        self.rows.get(row).and_then(|values| values.get(column))
    }

    /// Position of the column named `name`, matching exact or trailing-space-trimmed names.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.name == name || column.trimmed_name() == name)
    }

    #[must_use]
    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.column_index(name)
            .map(|index| self.columns[index].column_type)
    }

    /// Values of one column, top to bottom.
    pub fn column_values(&self, name: &str) -> Option<impl Iterator<Item = &Value<'static>>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[index]))
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<Vec<Value<'static>>> {
        self.rows
    }
}

impl TableSink for Table {
    fn begin(&mut self, context: SinkContext<'_>) -> Result<()> {
        if self.started {
            return Err(Error::Sink {
                details: Cow::from("table schema already declared"),
            });
        }
        self.started = true;
        self.name = context.table_name.map(str::to_owned);
        self.columns = context.columns.to_vec();
        self.rows.clear();
        Ok(())
    }

    fn write_row(&mut self, row: &[Value<'_>]) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::Sink {
                details: Cow::Owned(format!(
                    "row has {} values but the table declares {} columns",
                    row.len(),
                    self.columns.len()
                )),
            });
        }
        self.rows
            .push(row.iter().cloned().map(Value::into_owned).collect());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}
