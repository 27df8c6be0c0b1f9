use std::borrow::Cow;

use time::OffsetDateTime;

/// A single decoded cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    /// Numeric column without a date format.
    Float(f64),
    /// Character column, padding preserved.
    Str(Cow<'a, str>),
    /// Numeric column with a date format; fractional day counts keep their time of day.
    Date(OffsetDateTime),
    /// Missing value with additional context.
    Missing(MissingValue),
}

impl Value<'_> {
    #[must_use]
    pub fn into_owned(self) -> Value<'static> {
        match self {
            Value::Float(v) => Value::Float(v),
            Value::Str(s) => Value::Str(Cow::Owned(s.into_owned())),
            Value::Date(dt) => Value::Date(dt),
            Value::Missing(missing) => Value::Missing(missing),
        }
    }

    #[must_use]
    pub const fn is_missing(&self) -> bool {
        matches!(self, Value::Missing(_))
    }

    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_date(&self) -> Option<OffsetDateTime> {
        match self {
            Value::Date(dt) => Some(*dt),
            _ => None,
        }
    }
}

/// Variants of missing values encountered in SAS datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingValue {
    /// System missing represented by `.` in SAS.
    System,
    /// Special missing `.A`-`.Z` or `._`.
    Tagged(char),
    /// The column stores no bytes.
    Absent,
}

impl MissingValue {
    /// Classifies the NaN payload of a stored missing numeric. The tag sits in
    /// the byte below the exponent, stored inverted.
    #[must_use]
    pub const fn from_nan_bits(bits: u64) -> Self {
        let tag = !(((bits >> 40) & 0xFF) as u8);
        match tag {
            0 => Self::Tagged('_'),
            2..=27 => Self::Tagged((b'A' + (tag - 2)) as char),
            _ => Self::System,
        }
    }
}
