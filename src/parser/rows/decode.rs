use crate::error::Result;
use crate::parser::bytes::{ByteRegion, read_float64, read_truncated_float64};
use crate::parser::encoding::TextEncoding;
use crate::parser::epoch::sas_epoch_to_date;
use crate::parser::metadata::{ColumnProperty, ColumnType};
use crate::value::{MissingValue, Value};

/// How the stored bytes of one column become a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Absent,
    Text,
    Decimal,
    Date,
}

/// Per-column decoding plan computed once before any row is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnPlan {
    pub offset: usize,
    pub length: usize,
    pub kind: CellKind,
}

impl ColumnPlan {
    #[must_use]
    pub fn new(column: &ColumnProperty) -> Self {
        let kind = if column.is_stored() {
            match column.column_type() {
                ColumnType::Text => CellKind::Text,
                ColumnType::Date => CellKind::Date,
                ColumnType::Decimal => CellKind::Decimal,
            }
        } else {
            CellKind::Absent
        };
        Self {
            offset: column.row_offset,
            length: column.row_length,
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericCell {
    Missing(MissingValue),
    Number(f64),
}

/// Decodes a stored numeric. Fields shorter than 8 bytes hold the high-order
/// bytes of the double; NaN payloads are SAS missing values.
#[must_use]
pub fn decode_numeric_cell(slice: &[u8]) -> NumericCell {
    let value = match slice.len() {
        0 => return NumericCell::Missing(MissingValue::System),
        1..=7 => read_truncated_float64(slice, 0, slice.len()),
        _ => read_float64(slice, 0),
    };
    match value {
        Ok(number) if number.is_nan() => {
            NumericCell::Missing(MissingValue::from_nan_bits(number.to_bits()))
        }
        Ok(number) => NumericCell::Number(number),
        Err(_) => NumericCell::Missing(MissingValue::System),
    }
}

/// Decodes one cell of `row`, a region spanning exactly one row.
///
/// # Errors
///
/// Returns an out-of-bounds error if the column lies outside the row.
pub fn decode_cell<'a>(
    plan: &ColumnPlan,
    row: &ByteRegion<'a>,
    encoding: TextEncoding,
) -> Result<Value<'a>> {
    if plan.kind == CellKind::Absent {
        return Ok(Value::Missing(MissingValue::Absent));
    }
    let slice = row.slice(plan.offset, plan.length)?;
    let value = match plan.kind {
        CellKind::Absent => Value::Missing(MissingValue::Absent),
        CellKind::Text => Value::Str(encoding.decode(slice)),
        CellKind::Decimal => match decode_numeric_cell(slice) {
            NumericCell::Missing(missing) => Value::Missing(missing),
            NumericCell::Number(number) => Value::Float(number),
        },
        CellKind::Date => match decode_numeric_cell(slice) {
            NumericCell::Missing(missing) => Value::Missing(missing),
            // day counts outside the calendar range have no date to show
            NumericCell::Number(days) => sas_epoch_to_date(days)
                .map_or(Value::Missing(MissingValue::System), Value::Date),
        },
    };
    Ok(value)
}
