pub mod api;
pub mod error;
pub mod logger;
pub mod parser;
pub mod sinks;
pub mod value;

pub use crate::error::{Error, Result, Section};
pub use api::{ReadOptions, SasFile, decode_layout, parse_data, parse_into};
pub use parser::{ColumnKind, ColumnProperty, ColumnType, DatasetLayout, SubheaderKind};
pub use sinks::{CsvSink, OutputColumn, SinkContext, Table, TableSink};
pub use value::{MissingValue, Value};
