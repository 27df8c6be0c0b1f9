use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

use crate::logger::log_warn;

/// Character set used for every text field of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextEncoding {
    code: u8,
    encoding: &'static Encoding,
}

impl Default for TextEncoding {
    fn default() -> Self {
        Self {
            code: 0,
            encoding: WINDOWS_1252,
        }
    }
}

impl TextEncoding {
    /// Resolves the character-set byte from the file header. Unknown codes
    /// fall back to Windows-1252, which is what SAS uses when none is recorded.
    #[must_use]
    pub fn from_header_code(code: u8) -> Self {
        let encoding = lookup_label(code)
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            .unwrap_or_else(|| {
                log_warn(&format!(
                    "unknown character set code {code}; decoding text as windows-1252"
                ));
                WINDOWS_1252
            });
        Self { code, encoding }
    }

    #[must_use]
    pub const fn code(&self) -> u8 {
        self.code
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Decodes `bytes` without trimming. ASCII input is returned verbatim.
    #[must_use]
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        if bytes.is_ascii() || self.encoding == UTF_8 {
            return String::from_utf8_lossy(bytes);
        }
        let (decoded, _had_errors) = self.encoding.decode_without_bom_handling(bytes);
        decoded
    }
}

/// Trims trailing spaces and NUL padding from a fixed-width field.
pub fn trim_trailing(bytes: &[u8]) -> &[u8] {
    match bytes.iter().rposition(|b| *b != 0 && *b != b' ') {
        Some(last) => &bytes[..=last],
        None => &[],
    }
}

const fn lookup_label(code: u8) -> Option<&'static str> {
    let label = match code {
        0 | 62 | 204 => "windows-1252",
        20 => "utf-8",
        28 => "us-ascii",
        29 => "iso-8859-1",
        30 => "iso-8859-2",
        31 => "iso-8859-3",
        32 => "iso-8859-4",
        33 => "iso-8859-5",
        34 => "iso-8859-6",
        35 => "iso-8859-7",
        36 => "iso-8859-8",
        37 => "iso-8859-9",
        39 => "iso-8859-11",
        40 => "iso-8859-15",
        60 => "windows-1250",
        61 => "windows-1251",
        63 => "windows-1253",
        64 => "windows-1254",
        65 => "windows-1255",
        66 => "windows-1256",
        67 => "windows-1257",
        68 => "windows-1258",
        69 => "macintosh",
        118 | 123 => "big5",
        119 => "euc-tw",
        125 | 205 => "gb18030",
        126 => "gbk",
        134 => "euc-jp",
        136 | 140 | 141 | 142 => "euc-kr",
        138 => "shift_jis",
        167 => "iso-2022-jp",
        227 => "iso-8859-14",
        242 => "iso-8859-13",
        246 => "x-mac-cyrillic",
        _ => return None,
    };
    Some(label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_is_passed_through_with_padding() {
        let encoding = TextEncoding::from_header_code(20);
        let decoded = encoding.decode(b"CODE    ");
        assert!(matches!(decoded, Cow::Borrowed("CODE    ")));
    }

    #[test]
    fn latin1_bytes_decode_through_header_encoding() {
        let encoding = TextEncoding::from_header_code(62);
        assert_eq!(encoding.name(), "windows-1252");
        assert_eq!(encoding.decode(&[b'c', 0xE9]), "c\u{e9}");
    }

    #[test]
    fn utf8_header_code_decodes_multibyte_text() {
        let encoding = TextEncoding::from_header_code(20);
        assert_eq!(encoding.decode("naïve".as_bytes()), "naïve");
    }

    #[test]
    fn unknown_code_falls_back_to_windows_1252() {
        let encoding = TextEncoding::from_header_code(254);
        assert_eq!(encoding.code(), 254);
        assert_eq!(encoding.name(), "windows-1252");
    }

    #[test]
    fn trim_trailing_strips_spaces_and_nuls() {
        assert_eq!(trim_trailing(b"DS1  \0\0"), b"DS1");
        assert_eq!(trim_trailing(b"   "), b"");
    }
}
