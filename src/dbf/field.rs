use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::DbfError;

/// dBASE III column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DbfType {
    Character,
    Numeric,
    Float,
    Logical,
    Date,
}

impl DbfType {
    pub fn code(self) -> u8 {
        match self {
            DbfType::Character => b'C',
            DbfType::Numeric => b'N',
            DbfType::Float => b'F',
            DbfType::Logical => b'L',
            DbfType::Date => b'D',
        }
    }

    pub fn from_code(code: u8) -> Result<Self, DbfError> {
        match code {
            b'C' => Ok(DbfType::Character),
            b'N' => Ok(DbfType::Numeric),
            b'F' => Ok(DbfType::Float),
            b'L' => Ok(DbfType::Logical),
            b'D' => Ok(DbfType::Date),
            other => Err(DbfError::UnknownType(other)),
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, DbfType::Numeric | DbfType::Float)
    }
}

/// Column metadata as written to a field descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: DbfType,
    /// Width in bytes, 1 to 255.
    pub length: usize,
    pub decimal_count: u8,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: DbfType, length: usize, decimal_count: u8) -> Self {
        Self {
            name: name.into(),
            kind,
            length,
            decimal_count,
        }
    }

    pub fn character(name: impl Into<String>, length: usize) -> Self {
        Self::new(name, DbfType::Character, length, 0)
    }

    pub fn numeric(name: impl Into<String>, length: usize, decimal_count: u8) -> Self {
        Self::new(name, DbfType::Numeric, length, decimal_count)
    }

    pub fn float(name: impl Into<String>, length: usize, decimal_count: u8) -> Self {
        Self::new(name, DbfType::Float, length, decimal_count)
    }

    pub fn logical(name: impl Into<String>) -> Self {
        Self::new(name, DbfType::Logical, 1, 0)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, DbfType::Date, 8, 0)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum DbfValue {
    #[default]
    Null,
    Text(String),
    Number(f64),
    Logical(bool),
    Date(NaiveDate),
}

impl From<&str> for DbfValue {
    fn from(s: &str) -> Self {
        DbfValue::Text(s.to_string())
    }
}

impl From<String> for DbfValue {
    fn from(s: String) -> Self {
        DbfValue::Text(s)
    }
}

impl From<f64> for DbfValue {
    fn from(n: f64) -> Self {
        DbfValue::Number(n)
    }
}

impl From<i64> for DbfValue {
    fn from(n: i64) -> Self {
        DbfValue::Number(n as f64)
    }
}

impl From<bool> for DbfValue {
    fn from(b: bool) -> Self {
        DbfValue::Logical(b)
    }
}

impl From<NaiveDate> for DbfValue {
    fn from(d: NaiveDate) -> Self {
        DbfValue::Date(d)
    }
}

/// Tabular data the writer serializes. Every row holds exactly
/// `column_count()` values.
pub trait TableModel {
    fn column_count(&self) -> usize;
    fn column(&self, index: usize) -> &FieldSpec;
    fn row_count(&self) -> usize;
    fn value_at(&self, row: usize, column: usize) -> &DbfValue;
}

/// In-memory table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DbfTable {
    fields: Vec<FieldSpec>,
    rows: Vec<Vec<DbfValue>>,
}

impl DbfTable {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self {
            fields,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn rows(&self) -> &[Vec<DbfValue>] {
        &self.rows
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn push_row(&mut self, row: Vec<DbfValue>) -> Result<(), DbfError> {
        if row.len() != self.fields.len() {
            return Err(DbfError::RowWidth {
                expected: self.fields.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }
}

impl TableModel for DbfTable {
    fn column_count(&self) -> usize {
        self.fields.len()
    }

    fn column(&self, index: usize) -> &FieldSpec {
        &self.fields[index]
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn value_at(&self, row: usize, column: usize) -> &DbfValue {
        &self.rows[row][column]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_codes() {
        for kind in [
            DbfType::Character,
            DbfType::Numeric,
            DbfType::Float,
            DbfType::Logical,
            DbfType::Date,
        ] {
            assert_eq!(DbfType::from_code(kind.code()).unwrap(), kind);
        }
        assert!(matches!(DbfType::from_code(b'M'), Err(DbfError::UnknownType(b'M'))));
    }

    #[test]
    fn rows_must_match_columns() {
        let mut table = DbfTable::new(vec![FieldSpec::character("NAME", 10), FieldSpec::logical("OK")]);
        table.push_row(vec!["a".into(), true.into()]).unwrap();
        let err = table.push_row(vec!["b".into()]).unwrap_err();
        assert!(matches!(err, DbfError::RowWidth { expected: 2, found: 1 }));
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.column_index("OK"), Some(1));
        assert_eq!(table.value_at(0, 1), &DbfValue::Logical(true));
    }
}
