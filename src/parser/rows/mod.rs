mod decode;


use crate::error::{Error, Result, Section};
use crate::logger::log_warn;
use crate::parser::header::ArchitectureMode;
use crate::parser::metadata::{DatasetLayout, RowLayout};
use crate::parser::page::{Page, PageType};
use crate::sinks::TableSink;
use crate::value::Value;

pub use decode::{ColumnPlan, decode_cell};

/// Location and number of rows stored in a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRows {
    /// Offset of the first row from the start of the page.
    pub base: usize,
    /// Rows declared for the page before clamping to the dataset total.
    pub count: u64,
}

/// Row placement for `page`, or `None` for pages that carry no rows.
///
/// Mix pages store rows after their subheader pointer table, aligned to
/// 8 bytes, and hold the row size subheader's mix-page count. Data pages
/// store rows right after the page header and declare their own count.
#[must_use]
pub fn page_rows(
    page: &Page<'_>,
    layout: &RowLayout,
    architecture: ArchitectureMode,
) -> Option<PageRows> {
    let header = architecture.page_header_size();
    match page.page_type {
        PageType::Mix => {
            let pointers = usize::from(page.subheader_count) * architecture.subheader_pointer_size();
            Some(PageRows {
                base: (header + pointers).next_multiple_of(8),
                count: layout.row_count_first_page,
            })
        }
        PageType::Other(_) => Some(PageRows {
            base: header,
            count: u64::from(page.block_count),
        }),
        _ => None,
    }
}

/// Which rows and columns reach the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSelection {
    pub skip: u64,
    pub max_rows: Option<u64>,
    /// Column indices in output order.
    pub columns: Vec<usize>,
}

impl RowSelection {
    /// Every row and every column of `layout`.
    #[must_use]
    pub fn all(layout: &DatasetLayout) -> Self {
        Self {
            skip: 0,
            max_rows: None,
            columns: (0..layout.column_count()).collect(),
        }
    }
}

/// Decodes rows from `pages` in page order and forwards them to `sink`.
///
/// Page row counts are clamped so the running total never exceeds the
/// declared row count. Returns the number of rows written.
///
/// # Errors
///
/// Returns an error if a row lies outside its page or the sink fails.
pub fn materialize_rows<S: TableSink + ?Sized>(
    pages: &[Page<'_>],
    layout: &DatasetLayout,
    selection: &RowSelection,
    sink: &mut S,
) -> Result<u64> {
    let architecture = layout.header.architecture;
    let encoding = layout.header.encoding;
    let row_layout = &layout.row_layout;
    let stride = row_layout.row_length;
    let plans = selection
        .columns
        .iter()
        .map(|&index| {
            layout
                .columns
                .get(index)
                .map(ColumnPlan::new)
                .ok_or(Error::ColumnPropertyNotFound { index })
        })
        .collect::<Result<Vec<_>>>()?;

    let limit = selection
        .max_rows
        .map_or(u64::MAX, |max| selection.skip.saturating_add(max));
    let mut row_index = 0u64;
    let mut written = 0u64;
    let mut values: Vec<Value<'_>> = Vec::with_capacity(plans.len());

    for page in pages {
        let Some(placement) = page_rows(page, row_layout, architecture) else {
            continue;
        };
        let remaining = row_layout.row_count - row_index.min(row_layout.row_count);
        let mut count = placement.count;
        if count > remaining {
            if !matches!(page.page_type, PageType::Mix) {
                log_warn(&format!(
                    "page {} declares {count} rows but only {remaining} remain of {}; truncating",
                    page.index, row_layout.row_count
                ));
            }
            count = remaining;
        }

        let mut offset = placement.base;
        for _ in 0..count {
            if row_index >= limit {
                return Ok(written);
            }
            if row_index >= selection.skip {
                let row = page
                    .region
                    .sub_region(offset, stride, Section::Row { index: row_index })?;
                values.clear();
                for plan in &plans {
                    values.push(decode_cell(plan, &row, encoding)?);
                }
                sink.write_row(&values)?;
                written += 1;
            }
            offset += stride;
            row_index += 1;
        }
        if row_index >= row_layout.row_count {
            break;
        }
    }
    Ok(written)
}
