//! dBASE III table files.
//!
//! Layout: a 32-byte header, one 32-byte descriptor per field, a `0x0D`
//! terminator, fixed-width records each led by a deletion flag, and a
//! trailing `0x1A`. Multi-byte integers are little-endian.

mod field;
mod format;
mod reader;
mod writer;

use thiserror::Error;

pub use field::{DbfTable, DbfType, DbfValue, FieldSpec, TableModel};
pub use format::{fit_width, format_value_for_type, latin1_bytes, NumberFormat};
pub use reader::DbfReader;
pub use writer::{calc_header_length, calc_record_length, write_dbf, DbfWriter};

pub const VERSION: u8 = 0x03;
pub const HEADER_LEN: usize = 32;
pub const DESCRIPTOR_LEN: usize = 32;
pub const NAME_LEN: usize = 11;
pub const FIELD_TERMINATOR: u8 = 0x0D;
pub const END_OF_FILE: u8 = 0x1A;
pub const RECORD_ACTIVE: u8 = 0x20;
pub const RECORD_DELETED: u8 = 0x2A;
pub const MAX_FIELD_LEN: usize = 255;
/// Header and record lengths are stored in 16 bits and must stay positive.
pub const MAX_LENGTH: usize = i16::MAX as usize;

#[derive(Debug, Error)]
pub enum DbfError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{what} length {length} exceeds the 16-bit limit of {max}")]
    LengthOverflow {
        what: &'static str,
        length: usize,
        max: usize,
    },

    #[error("field {name:?} has length {length}, must be 1 to 255")]
    FieldLength { name: String, length: usize },

    #[error("{0} rows do not fit a 32-bit record count")]
    TooManyRows(usize),

    #[error("row has {found} values, table has {expected} columns")]
    RowWidth { expected: usize, found: usize },

    #[error("value {value} cannot be stored in a {kind:?} field")]
    InvalidValue { kind: DbfType, value: String },

    #[error("unknown field type code {0:#04x}")]
    UnknownType(u8),

    #[error("malformed DBF file: {0}")]
    Malformed(String),
}
