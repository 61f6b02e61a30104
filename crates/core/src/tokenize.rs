//! Raw CSV bytes to rows of cells.

use crate::error::{CompileError, Result};
use crate::table::Row;

pub const DEFAULT_SEPARATOR: &str = ",";

/// Validate a separator capability value.
pub fn separator_byte(separator: &str) -> Result<u8> {
    match separator.as_bytes() {
        [b] => Ok(*b),
        _ => Err(CompileError::IllegalSeparator {
            value: separator.to_string(),
        }),
    }
}

/// Tokenize `data` into rows. The first row is returned as data; header
/// handling happens later.
pub fn tokenize(data: &[u8], delimiter: u8) -> Result<Vec<Row>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(data);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}
