//! Header detection and row splitting.

use serde::Serialize;
use tracing::debug;

/// A tokenized row of cells.
pub type Row = Vec<String>;

/// Rows after the optional header has been split off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub header: Option<Row>,
    pub rows: Vec<Row>,
    /// Width of the first data row. Later rows are not checked against it.
    pub column_count: usize,
}

/// Split `rows_raw` into header and data rows.
///
/// Returns `None` when nothing is left to compile, which covers both empty
/// input and a header without data.
pub fn split_header(mut rows_raw: Vec<Row>, use_header: bool) -> Option<Table> {
    if rows_raw.is_empty() {
        debug!("Compile no data");
        return None;
    }
    debug!("Compile use header is {}", use_header);

    let header = if use_header {
        Some(rows_raw.remove(0))
    } else {
        None
    };
    if rows_raw.is_empty() {
        debug!("Compile just header, no data!");
        return None;
    }

    let column_count = rows_raw[0].len();
    Some(Table {
        header,
        rows: rows_raw,
        column_count,
    })
}
