use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;

use crate::coverage::Viewpoint;
use crate::dbf::{DbfTable, DbfType, DbfValue, FieldSpec};

pub fn load_viewpoints_from_json(path: impl AsRef<Path>) -> Result<Vec<Viewpoint>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let reader = std::io::BufReader::new(file);
    let viewpoints: Vec<Viewpoint> = serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse viewpoints {:?}", path))?;
    Ok(viewpoints)
}

fn parse_cell(field: &FieldSpec, raw: &str) -> Result<DbfValue> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(DbfValue::Null);
    }
    let value = match field.kind {
        DbfType::Character => DbfValue::Text(raw.to_string()),
        DbfType::Numeric | DbfType::Float => DbfValue::Number(raw.parse()?),
        DbfType::Logical => match raw.to_ascii_lowercase().as_str() {
            "t" | "true" | "y" | "yes" | "1" => DbfValue::Logical(true),
            "f" | "false" | "n" | "no" | "0" => DbfValue::Logical(false),
            _ => bail!("{raw:?} is not a boolean"),
        },
        DbfType::Date => DbfValue::Date(
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .or_else(|_| NaiveDate::parse_from_str(raw, "%Y%m%d"))?,
        ),
    };
    Ok(value)
}

/// Builds a table from a CSV file with a header row. Each field is filled
/// from the CSV column of the same name; extra CSV columns are ignored.
pub fn load_table_from_csv(path: impl AsRef<Path>, fields: Vec<FieldSpec>) -> Result<DbfTable> {
    let path = path.as_ref();
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("Failed to open {:?}", path))?;
    let headers = reader.headers()?.clone();

    let columns = fields
        .iter()
        .map(|f| {
            headers
                .iter()
                .position(|h| h.trim() == f.name)
                .ok_or_else(|| anyhow!("CSV {:?} has no column {:?}", path, f.name))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut table = DbfTable::new(fields);
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let row = table
            .columns()
            .iter()
            .zip(&columns)
            .map(|(field, &col)| {
                parse_cell(field, record.get(col).unwrap_or(""))
                    .with_context(|| format!("row {}, column {:?}", line + 1, field.name))
            })
            .collect::<Result<Vec<_>>>()?;
        table.push_row(row)?;
    }
    Ok(table)
}
