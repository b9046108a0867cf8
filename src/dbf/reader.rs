use std::io::Read;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use chrono::NaiveDate;
use tracing::debug;

use super::{
    DbfError, DbfTable, DbfType, DbfValue, FieldSpec, DESCRIPTOR_LEN, FIELD_TERMINATOR, HEADER_LEN,
    NAME_LEN, RECORD_DELETED,
};

/// Parses DBF bytes back into a [`DbfTable`]. Deleted records are skipped.
pub struct DbfReader;

impl DbfReader {
    pub fn read<R: Read>(mut input: R) -> Result<DbfTable, DbfError> {
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<DbfTable, DbfError> {
        Self::read(std::fs::File::open(path)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<DbfTable, DbfError> {
        if bytes.len() < HEADER_LEN + 1 {
            return Err(DbfError::Malformed(format!("{} bytes is too short for a header", bytes.len())));
        }
        let rows = LittleEndian::read_u32(&bytes[4..8]) as usize;
        let header_length = LittleEndian::read_u16(&bytes[8..10]) as usize;
        let record_length = LittleEndian::read_u16(&bytes[10..12]) as usize;

        let mut fields = Vec::new();
        let mut offset = HEADER_LEN;
        loop {
            match bytes.get(offset) {
                Some(&FIELD_TERMINATOR) => break,
                Some(_) if offset + DESCRIPTOR_LEN <= bytes.len() => {
                    fields.push(parse_descriptor(&bytes[offset..offset + DESCRIPTOR_LEN])?);
                    offset += DESCRIPTOR_LEN;
                }
                _ => return Err(DbfError::Malformed("field descriptors run past the end".into())),
            }
        }

        if header_length < offset + 1 {
            return Err(DbfError::Malformed(format!(
                "header length {header_length} is shorter than its {} descriptors",
                fields.len()
            )));
        }
        let expected = 1 + fields.iter().map(|f| f.length).sum::<usize>();
        if record_length != expected {
            return Err(DbfError::Malformed(format!(
                "record length {record_length} does not match field widths {expected}"
            )));
        }
        let end = header_length + rows * record_length;
        if bytes.len() < end {
            return Err(DbfError::Malformed(format!(
                "{rows} records need {end} bytes, file has {}",
                bytes.len()
            )));
        }

        let mut table = DbfTable::new(fields);
        for record in bytes[header_length..end].chunks_exact(record_length) {
            if record[0] == RECORD_DELETED {
                continue;
            }
            let mut at = 1;
            let mut row = Vec::with_capacity(table.columns().len());
            for field in table.columns() {
                row.push(parse_value(field, &record[at..at + field.length])?);
                at += field.length;
            }
            table.push_row(row)?;
        }

        debug!(rows = table.rows().len(), columns = table.columns().len(), "read DBF");
        Ok(table)
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|b| *b as char).collect()
}

fn parse_descriptor(d: &[u8]) -> Result<FieldSpec, DbfError> {
    let name_bytes = &d[..NAME_LEN];
    let name_end = name_bytes.iter().position(|b| *b == 0).unwrap_or(NAME_LEN);
    Ok(FieldSpec {
        name: latin1(&name_bytes[..name_end]),
        kind: DbfType::from_code(d[11])?,
        length: d[16] as usize,
        decimal_count: d[17],
    })
}

fn parse_value(field: &FieldSpec, raw: &[u8]) -> Result<DbfValue, DbfError> {
    let text = latin1(raw);
    let trimmed = text.trim_matches(|c| c == ' ' || c == '\0');
    if trimmed.is_empty() {
        return Ok(DbfValue::Null);
    }
    let invalid = || DbfError::InvalidValue {
        kind: field.kind,
        value: trimmed.to_string(),
    };
    match field.kind {
        DbfType::Character => Ok(DbfValue::Text(text.trim_end_matches([' ', '\0']).to_string())),
        DbfType::Numeric | DbfType::Float => trimmed.parse().map(DbfValue::Number).map_err(|_| invalid()),
        DbfType::Logical => match trimmed {
            "T" | "t" | "Y" | "y" => Ok(DbfValue::Logical(true)),
            "F" | "f" | "N" | "n" => Ok(DbfValue::Logical(false)),
            _ => Ok(DbfValue::Null),
        },
        DbfType::Date => NaiveDate::parse_from_str(trimmed, "%Y%m%d")
            .map(DbfValue::Date)
            .map_err(|_| invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbf::{DbfWriter, TableModel, RECORD_ACTIVE};

    fn sample() -> DbfTable {
        let mut table = DbfTable::new(vec![
            FieldSpec::character("CITY", 12),
            FieldSpec::numeric("POP", 9, 0),
            FieldSpec::float("AREA", 10, 3),
            FieldSpec::logical("CAPITAL"),
            FieldSpec::date("FOUNDED"),
        ]);
        table
            .push_row(vec![
                "  Lyon".into(),
                DbfValue::Number(522250.0),
                DbfValue::Number(47.87),
                false.into(),
                NaiveDate::from_ymd_opt(1989, 7, 14).unwrap().into(),
            ])
            .unwrap();
        table
            .push_row(vec![
                "Zürich".into(),
                DbfValue::Null,
                DbfValue::Number(-0.5),
                true.into(),
                DbfValue::Null,
            ])
            .unwrap();
        table
    }

    fn bytes(table: &DbfTable) -> Vec<u8> {
        let mut buf = Vec::new();
        DbfWriter::new(&mut buf).write_model(table).unwrap();
        buf
    }

    #[test]
    fn reads_back_what_was_written() {
        let table = sample();
        let back = DbfReader::from_bytes(&bytes(&table)).unwrap();
        assert_eq!(back.columns(), table.columns());
        assert_eq!(back.row_count(), 2);
        assert_eq!(back.value_at(0, 0), &DbfValue::Text("  Lyon".into()));
        assert_eq!(back.value_at(0, 1), &DbfValue::Number(522250.0));
        assert_eq!(back.value_at(0, 2), &DbfValue::Number(47.87));
        assert_eq!(back.value_at(0, 3), &DbfValue::Logical(false));
        assert_eq!(back.value_at(1, 0), &DbfValue::Text("Zürich".into()));
        assert_eq!(back.value_at(1, 1), &DbfValue::Null);
        assert_eq!(back.value_at(1, 2), &DbfValue::Number(-0.5));
        assert_eq!(back.rows()[0][4], table.rows()[0][4]);
        assert_eq!(back.value_at(1, 4), &DbfValue::Null);
    }

    #[test]
    fn deleted_records_are_skipped() {
        let table = sample();
        let mut raw = bytes(&table);
        let header_length = LittleEndian::read_u16(&raw[8..10]) as usize;
        assert_eq!(raw[header_length], RECORD_ACTIVE);
        raw[header_length] = RECORD_DELETED;
        let back = DbfReader::from_bytes(&raw).unwrap();
        assert_eq!(back.row_count(), 1);
        assert_eq!(back.value_at(0, 0), &DbfValue::Text("Zürich".into()));
    }

    #[test]
    fn inconsistent_record_length_rejected() {
        let mut raw = bytes(&sample());
        raw[10] = raw[10].wrapping_add(1);
        assert!(matches!(DbfReader::from_bytes(&raw), Err(DbfError::Malformed(_))));
    }

    #[test]
    fn truncated_records_rejected() {
        let raw = bytes(&sample());
        assert!(matches!(
            DbfReader::from_bytes(&raw[..raw.len() - 10]),
            Err(DbfError::Malformed(_))
        ));
        assert!(DbfReader::from_bytes(&raw[..20]).is_err());
    }
}
