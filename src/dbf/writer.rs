use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use chrono::{Datelike, Local, NaiveDate};
use itertools::Itertools;
use tracing::debug;

use super::{
    fit_width, format_value_for_type, DbfError, FieldSpec, NumberFormat, TableModel, DESCRIPTOR_LEN,
    END_OF_FILE, FIELD_TERMINATOR, HEADER_LEN, MAX_FIELD_LEN, MAX_LENGTH, NAME_LEN, RECORD_ACTIVE,
    VERSION,
};

/// Bytes per record: the deletion flag plus every field width.
pub fn calc_record_length<M: TableModel + ?Sized>(model: &M) -> Result<u16, DbfError> {
    let length = 1 + (0..model.column_count())
        .map(|c| model.column(c).length)
        .sum::<usize>();
    checked_length("record", length)
}

/// Bytes before the first record: header, descriptors and terminator.
pub fn calc_header_length<M: TableModel + ?Sized>(model: &M) -> Result<u16, DbfError> {
    let length = HEADER_LEN + DESCRIPTOR_LEN * model.column_count() + 1;
    checked_length("header", length)
}

fn checked_length(what: &'static str, length: usize) -> Result<u16, DbfError> {
    if length > MAX_LENGTH {
        return Err(DbfError::LengthOverflow {
            what,
            length,
            max: MAX_LENGTH,
        });
    }
    Ok(length as u16)
}

/// Serializes a [`TableModel`] to a DBF byte stream.
///
/// The writer owns its sink and drops it once the table is written. All
/// length limits are checked before the first byte goes out; an I/O failure
/// part way through aborts the write, but bytes already handed to the sink
/// are not taken back.
pub struct DbfWriter<W: Write> {
    out: W,
    date: NaiveDate,
}

impl<W: Write> DbfWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            date: Local::now().date_naive(),
        }
    }

    /// Date stamped in the header instead of today.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    pub fn write_model<M: TableModel + ?Sized>(mut self, model: &M) -> Result<(), DbfError> {
        let record_length = calc_record_length(model)?;
        let header_length = calc_header_length(model)?;
        let row_count = model.row_count();
        let rows = u32::try_from(row_count).map_err(|_| DbfError::TooManyRows(row_count))?;
        let fields = (0..model.column_count()).map(|c| model.column(c)).collect_vec();
        for field in &fields {
            if field.length == 0 || field.length > MAX_FIELD_LEN {
                return Err(DbfError::FieldLength {
                    name: field.name.clone(),
                    length: field.length,
                });
            }
        }

        debug!(rows, columns = fields.len(), record_length, "writing DBF");

        self.write_header(rows, header_length, record_length)?;
        for field in &fields {
            self.write_descriptor(field)?;
        }
        self.out.write_u8(FIELD_TERMINATOR)?;
        self.write_records(model, &fields)?;
        self.out.write_u8(END_OF_FILE)?;
        self.out.flush()?;

        debug!(rows, "DBF written");
        Ok(())
    }

    fn write_header(&mut self, rows: u32, header_length: u16, record_length: u16) -> Result<(), DbfError> {
        let year = (self.date.year() - 1900).clamp(0, 255) as u8;
        self.out.write_u8(VERSION)?;
        self.out.write_all(&[year, self.date.month() as u8, self.date.day() as u8])?;
        self.out.write_u32::<LittleEndian>(rows)?;
        self.out.write_u16::<LittleEndian>(header_length)?;
        self.out.write_u16::<LittleEndian>(record_length)?;
        self.out.write_all(&[0; 20])?;
        Ok(())
    }

    fn write_descriptor(&mut self, field: &FieldSpec) -> Result<(), DbfError> {
        let mut name = super::latin1_bytes(&field.name);
        name.resize(NAME_LEN, 0);
        self.out.write_all(&name)?;
        self.out.write_u8(field.kind.code())?;
        self.out.write_all(&[0; 4])?;
        self.out.write_u8(field.length as u8)?;
        self.out.write_u8(field.decimal_count)?;
        self.out.write_all(&[0; 14])?;
        Ok(())
    }

    fn write_records<M: TableModel + ?Sized>(&mut self, model: &M, fields: &[&FieldSpec]) -> Result<(), DbfError> {
        for row in 0..model.row_count() {
            self.out.write_u8(RECORD_ACTIVE)?;
            for (column, field) in fields.iter().enumerate() {
                let text = format_value_for_type(
                    model.value_at(row, column),
                    field.kind,
                    NumberFormat::new(field.decimal_count),
                    field.length,
                )?;
                self.out.write_all(&fit_width(&text, field.length))?;
            }
        }
        Ok(())
    }
}

/// Writes `model` to a new file at `path`.
pub fn write_dbf<M: TableModel + ?Sized>(path: impl AsRef<Path>, model: &M) -> Result<(), DbfError> {
    let file = File::create(path)?;
    DbfWriter::new(BufWriter::new(file)).write_model(model)
}
