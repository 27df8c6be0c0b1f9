#![allow(dead_code)]

//! Builds small SAS7BDAT buffers in memory for integration tests.

use sas7bdat_table::SubheaderKind;
use sas7bdat_table::parser::ArchitectureMode;

pub const PAGE_TYPE_META: i16 = 0;
pub const PAGE_TYPE_DATA: i16 = 256;
pub const PAGE_TYPE_MIX: i16 = 512;
pub const PAGE_TYPE_META_COMPRESSED: i16 = 16384;
pub const PAGE_TYPE_COMP: i16 = -28672;

const HEADER_LENGTH: usize = 1024;

pub const ARCHS: [ArchitectureMode; 2] = [ArchitectureMode::Bit32, ArchitectureMode::Bit64];

#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: String,
    pub numeric: bool,
    pub length: usize,
    pub format: Option<String>,
    pub label: Option<String>,
}

impl ColumnSpec {
    pub fn number(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            numeric: true,
            length: 8,
            format: None,
            label: None,
        }
    }

    pub fn text(name: &str, length: usize) -> Self {
        Self {
            name: name.to_owned(),
            numeric: false,
            length,
            format: None,
            label: None,
        }
    }

    pub fn date(name: &str) -> Self {
        Self::number(name).with_format("YYMMDD")
    }

    pub fn with_format(mut self, format: &str) -> Self {
        self.format = Some(format.to_owned());
        self
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_owned());
        self
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }
}

#[derive(Debug, Clone)]
pub enum Cell {
    Number(f64),
    /// Missing numeric: `None` for the system missing value, otherwise the tag.
    Missing(Option<char>),
    Text(Vec<u8>),
}

pub fn num(value: f64) -> Cell {
    Cell::Number(value)
}

pub fn text(value: &str) -> Cell {
    Cell::Text(value.as_bytes().to_vec())
}

#[derive(Debug, Clone)]
pub struct SasFixture {
    pub architecture: ArchitectureMode,
    pub dataset_name: String,
    pub encoding_code: u8,
    pub big_endian: bool,
    pub page_size: usize,
    pub columns: Vec<ColumnSpec>,
    pub rows: Vec<Vec<Cell>>,
    /// Rows stored on the metadata page, which then becomes a Mix page.
    pub mix_rows: usize,
    pub rows_per_page: usize,
    pub declared_rows: Option<u64>,
    pub declared_columns: Option<u64>,
    pub file_label: Option<String>,
    pub compression: Option<String>,
    pub omit: Vec<SubheaderKind>,
    /// Empty pages of these types appended after the data pages.
    pub trailing_pages: Vec<i16>,
}

impl SasFixture {
    pub fn new(architecture: ArchitectureMode) -> Self {
        Self {
            architecture,
            dataset_name: "SALES".to_owned(),
            encoding_code: 20,
            big_endian: false,
            page_size: 4096,
            columns: Vec::new(),
            rows: Vec::new(),
            mix_rows: 0,
            rows_per_page: 64,
            declared_rows: None,
            declared_columns: None,
            file_label: None,
            compression: None,
            omit: Vec::new(),
            trailing_pages: Vec::new(),
        }
    }

    /// Numeric `AMT` and 4-byte text `CODE`, the shape most tests use.
    pub fn amounts(architecture: ArchitectureMode) -> Self {
        let mut fixture = Self::new(architecture);
        fixture.columns = vec![ColumnSpec::number("AMT"), ColumnSpec::text("CODE", 4)];
        fixture.rows = vec![
            vec![num(2.5), text("A")],
            vec![num(3.0), text("BB")],
            vec![Cell::Missing(None), text("C")],
        ];
        fixture
    }

    pub fn column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }

    pub fn row(mut self, cells: Vec<Cell>) -> Self {
        self.rows.push(cells);
        self
    }

    fn row_length(&self) -> usize {
        self.columns.iter().map(|column| column.length).sum()
    }

    pub fn build(&self) -> Vec<u8> {
        let arch = self.architecture;
        let row_length = self.row_length();
        let encoded_rows: Vec<Vec<u8>> = self.rows.iter().map(|row| self.encode_row(row)).collect();

        let blocks = self.metadata_blocks();
        let mix_rows = self.mix_rows.min(encoded_rows.len());
        let meta_type = if mix_rows > 0 { PAGE_TYPE_MIX } else { PAGE_TYPE_META };

        let mut pages = vec![self.metadata_page(meta_type, &blocks, &encoded_rows[..mix_rows])];
        for chunk in encoded_rows[mix_rows..].chunks(self.rows_per_page.max(1)) {
            let mut page = vec![0u8; self.page_size];
            write_page_header(&mut page, arch, PAGE_TYPE_DATA, chunk.len(), 0);
            let base = arch.page_header_size();
            for (slot, row) in chunk.iter().enumerate() {
                let at = base + slot * row_length;
                page[at..at + row_length].copy_from_slice(row);
            }
            pages.push(page);
        }
        for &page_type in &self.trailing_pages {
            let mut page = vec![0u8; self.page_size];
            write_page_header(&mut page, arch, page_type, 0, 0);
            pages.push(page);
        }

        let mut bytes = self.file_header(pages.len());
        for page in pages {
            bytes.extend_from_slice(&page);
        }
        bytes
    }

    fn file_header(&self, page_count: usize) -> Vec<u8> {
        let mut header = vec![0u8; HEADER_LENGTH];
        if self.architecture == ArchitectureMode::Bit64 {
            header[32] = 0x33;
        }
        header[37] = if self.big_endian { 0x00 } else { 0x01 };
        header[70] = self.encoding_code;
        let name = self.dataset_name.as_bytes();
        header[92..124].fill(b' ');
        header[92..92 + name.len()].copy_from_slice(name);
        header[196..200].copy_from_slice(&u32::try_from(HEADER_LENGTH).unwrap().to_le_bytes());
        header[200..204].copy_from_slice(&u32::try_from(self.page_size).unwrap().to_le_bytes());
        header[204..208].copy_from_slice(&u32::try_from(page_count).unwrap().to_le_bytes());
        header
    }

    fn encode_row(&self, cells: &[Cell]) -> Vec<u8> {
        assert_eq!(cells.len(), self.columns.len(), "row width");
        let mut row = Vec::with_capacity(self.row_length());
        for (column, cell) in self.columns.iter().zip(cells) {
            match cell {
                Cell::Number(value) => {
                    let bytes = value.to_le_bytes();
                    row.extend_from_slice(&bytes[8 - column.length..]);
                }
                Cell::Missing(tag) => {
                    let code: u8 = match tag {
                        None => 1,
                        Some('_') => 0,
                        Some(letter) => u8::try_from(*letter).unwrap() - b'A' + 2,
                    };
                    let bits = 0xFFFF_0000_0000_0000_u64 | (u64::from(!code) << 40);
                    row.extend_from_slice(&bits.to_le_bytes()[8 - column.length..]);
                }
                Cell::Text(bytes) => {
                    let mut field = vec![b' '; column.length];
                    field[..bytes.len()].copy_from_slice(bytes);
                    row.extend_from_slice(&field);
                }
            }
        }
        row
    }

    /// Signed subheader blocks in pointer-table order.
    fn metadata_blocks(&self) -> Vec<(SubheaderKind, Vec<u8>)> {
        let arch = self.architecture;
        let w = arch.int_width();
        let mut pool = TextPool::default();

        let label_ref = self.file_label.as_deref().map(|label| pool.intern(label));
        let compression_ref = self.compression.as_deref().map(|literal| pool.intern(literal));
        let name_refs: Vec<_> = self.columns.iter().map(|c| pool.intern(&c.name)).collect();
        let format_refs: Vec<_> = self
            .columns
            .iter()
            .map(|c| {
                (
                    c.format.as_deref().map_or(EMPTY, |f| pool.intern(f)),
                    c.label.as_deref().map_or(EMPTY, |l| pool.intern(l)),
                )
            })
            .collect();

        let mut blocks = Vec::new();

        let row_size_len = if label_ref.is_some() || compression_ref.is_some() {
            if arch.is_64bit() { 808 } else { 480 }
        } else {
            16 * w
        };
        let mut row_size = signed(SubheaderKind::RowSize, row_size_len);
        let row_count = self.declared_rows.unwrap_or(self.rows.len() as u64);
        put_word(&mut row_size, 5 * w, self.row_length() as u64, w);
        put_word(&mut row_size, 6 * w, row_count, w);
        put_word(&mut row_size, 15 * w, self.mix_rows.min(self.rows.len()) as u64, w);
        if let Some(label) = label_ref {
            put_ref(&mut row_size, row_size_len - 130, label);
        }
        if let Some(compression) = compression_ref {
            put_ref(&mut row_size, row_size_len - 118, compression);
        }
        blocks.push((SubheaderKind::RowSize, row_size));

        let mut column_size = signed(SubheaderKind::ColumnSize, 3 * w);
        let declared = self
            .declared_columns
            .unwrap_or(self.columns.len() as u64);
        put_word(&mut column_size, w, declared, w);
        blocks.push((SubheaderKind::ColumnSize, column_size));

        let mut column_text = signed(SubheaderKind::ColumnText, w);
        column_text.extend_from_slice(&pool.bytes);
        blocks.push((SubheaderKind::ColumnText, column_text));

        let mut attrs = signed(
            SubheaderKind::ColumnAttribute,
            2 * w + 12 + self.columns.len() * (w + 8),
        );
        let mut offset = 0;
        for (slot, column) in self.columns.iter().enumerate() {
            let at = w + 8 + slot * (w + 8);
            put_word(&mut attrs, at, offset as u64, w);
            attrs[at + w..at + w + 4]
                .copy_from_slice(&u32::try_from(column.length).unwrap().to_le_bytes());
            attrs[at + w + 6] = if column.numeric { 1 } else { 2 };
            offset += column.length;
        }
        blocks.push((SubheaderKind::ColumnAttribute, attrs));

        let mut names = signed(SubheaderKind::ColumnName, 2 * w + 12 + name_refs.len() * 8);
        for (slot, name_ref) in name_refs.iter().enumerate() {
            put_ref(&mut names, w + 8 + slot * 8, *name_ref);
        }
        blocks.push((SubheaderKind::ColumnName, names));

        for (format, label) in format_refs {
            let (len, format_at, label_at) = if arch.is_64bit() {
                (64, 46, 52)
            } else {
                (52, 34, 40)
            };
            let mut block = signed(SubheaderKind::ColumnFormat, len);
            put_ref(&mut block, format_at, format);
            put_ref(&mut block, label_at, label);
            blocks.push((SubheaderKind::ColumnFormat, block));
        }

        blocks.retain(|(kind, _)| !self.omit.contains(kind));
        blocks
    }

    fn metadata_page(
        &self,
        page_type: i16,
        blocks: &[(SubheaderKind, Vec<u8>)],
        rows: &[Vec<u8>],
    ) -> Vec<u8> {
        let arch = self.architecture;
        let w = arch.int_width();
        let mut page = vec![0u8; self.page_size];
        write_page_header(&mut page, arch, page_type, blocks.len() + rows.len(), blocks.len());

        let pointers_end = arch.page_header_size() + blocks.len() * arch.subheader_pointer_size();
        let row_base = pointers_end.next_multiple_of(8);
        let rows_end = row_base + rows.len() * self.row_length();
        for (slot, row) in rows.iter().enumerate() {
            let at = row_base + slot * self.row_length();
            page[at..at + row.len()].copy_from_slice(row);
        }

        let mut cursor = self.page_size;
        for (slot, (_, block)) in blocks.iter().enumerate() {
            cursor -= block.len();
            assert!(cursor >= rows_end, "metadata does not fit the page");
            page[cursor..cursor + block.len()].copy_from_slice(block);

            let at = arch.page_header_size() + slot * arch.subheader_pointer_size();
            put_word(&mut page, at, cursor as u64, w);
            put_word(&mut page, at + w, block.len() as u64, w);
        }
        page
    }
}

#[derive(Debug, Clone, Copy)]
struct PoolRef {
    offset: u16,
    length: u16,
}

const EMPTY: PoolRef = PoolRef {
    offset: 0,
    length: 0,
};

#[derive(Default)]
struct TextPool {
    bytes: Vec<u8>,
}

impl TextPool {
    fn intern(&mut self, text: &str) -> PoolRef {
        let offset = self.bytes.len();
        self.bytes.extend_from_slice(text.as_bytes());
        while self.bytes.len() % 4 != 0 {
            self.bytes.push(b' ');
        }
        PoolRef {
            offset: u16::try_from(offset).unwrap(),
            length: u16::try_from(text.len()).unwrap(),
        }
    }
}

fn signed(kind: SubheaderKind, len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    bytes[..4].copy_from_slice(&kind.signature());
    bytes
}

fn put_word(bytes: &mut [u8], at: usize, value: u64, width: usize) {
    bytes[at..at + width].copy_from_slice(&value.to_le_bytes()[..width]);
}

fn put_ref(bytes: &mut [u8], at: usize, text_ref: PoolRef) {
    bytes[at..at + 2].copy_from_slice(&0u16.to_le_bytes());
    bytes[at + 2..at + 4].copy_from_slice(&text_ref.offset.to_le_bytes());
    bytes[at + 4..at + 6].copy_from_slice(&text_ref.length.to_le_bytes());
}

fn write_page_header(
    page: &mut [u8],
    arch: ArchitectureMode,
    page_type: i16,
    block_count: usize,
    subheader_count: usize,
) {
    let at = arch.page_header_size() - 8;
    page[at..at + 2].copy_from_slice(&page_type.to_le_bytes());
    page[at + 2..at + 4].copy_from_slice(&u16::try_from(block_count).unwrap().to_le_bytes());
    page[at + 4..at + 6].copy_from_slice(&u16::try_from(subheader_count).unwrap().to_le_bytes());
}
