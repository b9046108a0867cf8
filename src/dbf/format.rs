use chrono::NaiveDate;

use super::{DbfError, DbfType, DbfValue};

/// Fixed-point number formatting independent of the host locale: `.` as the
/// decimal separator, no grouping, exactly `decimals` fraction digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberFormat {
    pub decimals: u8,
}

impl NumberFormat {
    pub fn new(decimals: u8) -> Self {
        Self { decimals }
    }

    pub fn format(&self, value: f64) -> Option<String> {
        if !value.is_finite() {
            return None;
        }
        let text = format!("{:.*}", self.decimals as usize, value);
        // Values that round to zero print without a sign.
        if text.starts_with('-') && text[1..].bytes().all(|b| b == b'0' || b == b'.') {
            return Some(text[1..].to_string());
        }
        Some(text)
    }
}

/// Latin-1 bytes of `text`; characters outside it become `?`.
pub fn latin1_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

/// `text` left-justified in exactly `length` Latin-1 bytes, space padded or truncated.
pub fn fit_width(text: &str, length: usize) -> Vec<u8> {
    let mut bytes = latin1_bytes(text);
    bytes.resize(length, b' ');
    bytes
}

fn invalid(kind: DbfType, value: &DbfValue) -> DbfError {
    DbfError::InvalidValue {
        kind,
        value: format!("{value:?}"),
    }
}

/// Renders a cell as the text stored in a column of type `kind` and width
/// `length`, padded or truncated to exactly `length` characters.
pub fn format_value_for_type(
    value: &DbfValue,
    kind: DbfType,
    format: NumberFormat,
    length: usize,
) -> Result<String, DbfError> {
    let text = match (kind, value) {
        (_, DbfValue::Null) => String::new(),

        (DbfType::Character, DbfValue::Text(s)) => s.clone(),
        (DbfType::Character, DbfValue::Number(n)) => n.to_string(),
        (DbfType::Character, DbfValue::Logical(b)) => (if *b { "T" } else { "F" }).to_string(),
        (DbfType::Character, DbfValue::Date(d)) => d.format("%Y%m%d").to_string(),

        (DbfType::Numeric | DbfType::Float, DbfValue::Number(n)) => {
            format.format(*n).ok_or_else(|| invalid(kind, value))?
        }
        (DbfType::Numeric | DbfType::Float, DbfValue::Text(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                String::new()
            } else {
                let n: f64 = trimmed.parse().map_err(|_| invalid(kind, value))?;
                format.format(n).ok_or_else(|| invalid(kind, value))?
            }
        }

        (DbfType::Logical, DbfValue::Logical(b)) => (if *b { "T" } else { "F" }).to_string(),
        (DbfType::Logical, DbfValue::Text(s)) => match s.trim() {
            "T" | "t" | "Y" | "y" => "T".to_string(),
            "F" | "f" | "N" | "n" => "F".to_string(),
            "" | "?" => "?".to_string(),
            _ => return Err(invalid(kind, value)),
        },

        (DbfType::Date, DbfValue::Date(d)) => d.format("%Y%m%d").to_string(),
        (DbfType::Date, DbfValue::Text(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                String::new()
            } else {
                NaiveDate::parse_from_str(trimmed, "%Y%m%d")
                    .map_err(|_| invalid(kind, value))?
                    .format("%Y%m%d")
                    .to_string()
            }
        }

        _ => return Err(invalid(kind, value)),
    };

    let mut fitted: String = text.chars().take(length).collect();
    let pad = length - fitted.chars().count();
    fitted.extend(std::iter::repeat_n(' ', pad));
    Ok(fitted)
}
