mod bytes;
mod encoding;
mod epoch;
mod header;
mod metadata;
mod page;
mod rows;
mod subheader;

pub use bytes::{
    ByteRegion, OutOfRange, read_ascii_string, read_float64, read_truncated_float64,
    read_unsigned_int,
};
pub use encoding::TextEncoding;
pub use epoch::{sas_epoch_to_date, sas_seconds_to_datetime};
pub use header::{ArchitectureMode, FileHeader, parse_header};
pub use metadata::{
    ColumnKind, ColumnProperty, ColumnType, Compression, DATE_FORMAT, DatasetLayout, RowLayout,
    TextRef, build_layout,
};
pub use page::{Page, PageType, segment_pages};
pub use rows::{PageRows, RowSelection, materialize_rows, page_rows};
pub use subheader::{
    PointerInfo, Subheader, SubheaderKind, parse_pointer, scan_all, scan_subheaders,
};
