use std::borrow::Cow;
use std::io::Write;

use csv::{ByteRecord, Writer, WriterBuilder};
use itoa::Buffer as ItoaBuffer;
use ryu::Buffer as RyuBuffer;
use time::OffsetDateTime;

use crate::error::{Error, Result};
use crate::sinks::{SinkContext, TableSink};
use crate::value::Value;

const DEFAULT_DELIMITER: u8 = b',';
const DEFAULT_SCRATCH_CAPACITY: usize = 32;

/// Largest magnitude at which every integer is exactly representable in an f64.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Writes decoded rows into a delimited text file (CSV/TSV).
pub struct CsvSink<W: Write> {
    output: Option<W>,
    writer: Option<Writer<W>>,
    delimiter: u8,
    write_headers: bool,
    column_count: usize,
    record: ByteRecord,
    scratch: Vec<Vec<u8>>,
}

impl<W: Write> CsvSink<W> {
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            output: Some(writer),
            writer: None,
            delimiter: DEFAULT_DELIMITER,
            write_headers: true,
            column_count: 0,
            record: ByteRecord::new(),
            scratch: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    #[must_use]
    pub const fn with_headers(mut self, headers: bool) -> Self {
        self.write_headers = headers;
        self
    }

    /// Returns the underlying writer once [`TableSink::finish`] has run.
    pub fn into_inner(self) -> Option<W> {
        self.output
    }

    fn writer_mut(&mut self) -> Result<&mut Writer<W>> {
        self.writer.as_mut().ok_or_else(|| Error::Sink {
            details: Cow::from("CSV sink used before begin"),
        })
    }
}

impl<W: Write> TableSink for CsvSink<W> {
    fn begin(&mut self, context: SinkContext<'_>) -> Result<()> {
        let output = self.output.take().ok_or_else(|| Error::Sink {
            details: Cow::from("CSV sink cannot be reused without finishing"),
        })?;
        let writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(output);
        self.writer = Some(writer);
        self.column_count = context.columns.len();
        self.record = ByteRecord::with_capacity(self.column_count * 16, self.column_count);
        self.scratch = (0..self.column_count)
            .map(|_| Vec::with_capacity(DEFAULT_SCRATCH_CAPACITY))
            .collect();

        if self.write_headers {
            let mut header = ByteRecord::new();
            for column in context.columns {
                header.push_field(column.trimmed_name().as_bytes());
            }
            self.writer_mut()?.write_byte_record(&header)?;
        }
        Ok(())
    }

    fn write_row(&mut self, row: &[Value<'_>]) -> Result<()> {
        if row.len() != self.column_count {
            return Err(Error::Sink {
                details: Cow::Owned(format!(
                    "row length {} does not match expected {}",
                    row.len(),
                    self.column_count
                )),
            });
        }
        let mut ryu = RyuBuffer::new();
        let mut itoa = ItoaBuffer::new();
        self.record.clear();
        for (value, buf) in row.iter().zip(self.scratch.iter_mut()) {
            encode_value(value, buf, &mut ryu, &mut itoa);
            self.record.push_field(buf);
        }
        let writer = self.writer.as_mut().ok_or_else(|| Error::Sink {
            details: Cow::from("CSV sink used before begin"),
        })?;
        writer.write_byte_record(&self.record)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            let out = writer.into_inner().map_err(|e| Error::Sink {
                details: Cow::Owned(format!("csv into_inner failed: {}", e.error())),
            })?;
            self.output = Some(out);
        }
        self.column_count = 0;
        self.scratch.clear();
        self.record.clear();
        Ok(())
    }
}

/// Renders one cell. Missing values become empty fields.
pub fn encode_value(
    value: &Value<'_>,
    out: &mut Vec<u8>,
    ryu: &mut RyuBuffer,
    itoa: &mut ItoaBuffer,
) {
    out.clear();
    match value {
        Value::Missing(_) => {}
        Value::Float(v) => write_number(*v, out, ryu, itoa),
        Value::Str(s) => out.extend_from_slice(s.as_bytes()),
        Value::Date(dt) => write_date(dt, out, itoa),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn write_number(v: f64, out: &mut Vec<u8>, ryu: &mut RyuBuffer, itoa: &mut ItoaBuffer) {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < MAX_EXACT_INTEGER {
        out.extend_from_slice(itoa.format(v as i64).as_bytes());
    } else {
        out.extend_from_slice(ryu.format(v).as_bytes());
    }
}

/// `YYYY-MM-DD`, followed by ` HH:MM:SS[.mmm]` when the value has a time of day.
fn write_date(dt: &OffsetDateTime, out: &mut Vec<u8>, itoa: &mut ItoaBuffer) {
    let rounded = round_to_millisecond(dt);
    let date = rounded.date();
    let year = date.year();
    if year < 0 {
        out.push(b'-');
    }
    let digits = itoa.format(year.unsigned_abs());
    for _ in digits.len()..4 {
        out.push(b'0');
    }
    out.extend_from_slice(digits.as_bytes());
    out.push(b'-');
    write_two(u8::from(date.month()), out);
    out.push(b'-');
    write_two(date.day(), out);

    let time = rounded.time();
    if time == time::Time::MIDNIGHT {
        return;
    }
    out.push(b' ');
    write_two(time.hour(), out);
    out.push(b':');
    write_two(time.minute(), out);
    out.push(b':');
    write_two(time.second(), out);
    let millis = time.millisecond();
    if millis != 0 {
        out.push(b'.');
        write_three(millis, out);
    }
}

fn round_to_millisecond(dt: &OffsetDateTime) -> OffsetDateTime {
    let nanos = u64::from(dt.nanosecond());
    let millis = (nanos + 500_000) / 1_000_000;
    let truncated = dt.replace_nanosecond(0).unwrap_or(*dt);
    let millis = i64::try_from(millis).unwrap_or(0);
    truncated
        .checked_add(time::Duration::milliseconds(millis))
        .unwrap_or(*dt)
}

fn write_two(v: u8, out: &mut Vec<u8>) {
    out.push(b'0' + (v / 10));
    out.push(b'0' + (v % 10));
}

#[allow(clippy::cast_possible_truncation)]
fn write_three(v: u16, out: &mut Vec<u8>) {
    out.push(b'0' + (v / 100) as u8);
    out.push(b'0' + ((v / 10) % 10) as u8);
    out.push(b'0' + (v % 10) as u8);
}
