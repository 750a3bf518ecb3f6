use std::io::Cursor;

use bytes::Bytes;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use lamah_blob::mime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ImportError, ImportResult};

/// Supported spreadsheet containers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetFormat {
    Xlsx,
    Xls,
    Xlsm,
    Ods,
    Csv,
}

impl SheetFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "xlsx" => Some(Self::Xlsx),
            "xls" => Some(Self::Xls),
            "xlsm" => Some(Self::Xlsm),
            "ods" => Some(Self::Ods),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }

    pub fn from_filename(filename: &str) -> Option<Self> {
        mime::extension(filename).and_then(|ext| Self::from_extension(&ext))
    }
}

/// Raw spreadsheet file found in an archive or supplied by the caller
#[derive(Debug, Clone)]
pub struct SpreadsheetBlob {
    pub filename: String,
    pub format: SheetFormat,
    pub data: Bytes,
}

impl SpreadsheetBlob {
    pub fn new<S: Into<String>, B: Into<Bytes>>(filename: S, format: SheetFormat, data: B) -> Self {
        Self {
            filename: filename.into(),
            format,
            data: data.into(),
        }
    }

    /// Build from a filename, inferring the format; `None` for non-spreadsheets
    pub fn from_filename<S: Into<String>, B: Into<Bytes>>(filename: S, data: B) -> Option<Self> {
        let filename = filename.into();
        let format = SheetFormat::from_filename(&filename)?;
        Some(Self::new(filename, format, data))
    }
}

/// One data row with its cells converted to text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based spreadsheet row; the header is row 1
    pub row_number: usize,
    pub cells: Vec<String>,
    /// The row could not be parsed; it has no cells but still counts as a record
    pub malformed: bool,
}

impl RawRow {
    pub fn new(row_number: usize, cells: Vec<String>) -> Self {
        Self {
            row_number,
            cells,
            malformed: false,
        }
    }

    pub fn malformed(row_number: usize) -> Self {
        Self {
            row_number,
            cells: Vec::new(),
            malformed: true,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|cell| cell.trim().is_empty())
    }
}

/// Header plus data rows of the first sheet
#[derive(Debug, Clone, Default)]
pub struct RawSheet {
    pub headers: Vec<String>,
    /// Non-blank and malformed data rows in spreadsheet order
    pub rows: Vec<RawRow>,
}

/// Read the first sheet of a spreadsheet. CPU-bound.
pub fn read_sheet(blob: &SpreadsheetBlob) -> ImportResult<RawSheet> {
    let mut rows = match blob.format {
        SheetFormat::Csv => read_csv_rows(blob)?,
        _ => read_workbook_rows(blob)?,
    }
    .into_iter();

    let header = rows.next().ok_or_else(|| ImportError::MissingHeader {
        filename: blob.filename.clone(),
    })?;
    let mut headers = header.cells;
    if let Some(first) = headers.first_mut() {
        *first = first.trim_start_matches('\u{feff}').to_string();
    }

    let rows: Vec<RawRow> = rows.filter(|row| row.malformed || !row.is_blank()).collect();
    debug!(filename = %blob.filename, columns = headers.len(), rows = rows.len(), "spreadsheet read");
    Ok(RawSheet { headers, rows })
}

fn read_workbook_rows(blob: &SpreadsheetBlob) -> ImportResult<Vec<RawRow>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(blob.data.clone()))
        .map_err(|e| ImportError::spreadsheet(&blob.filename, e))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ImportError::spreadsheet(&blob.filename, "workbook has no sheets"))?
        .map_err(|e| ImportError::spreadsheet(&blob.filename, e))?;

    let first_row = range.start().map_or(0, |(row, _)| row as usize);
    Ok(range
        .rows()
        .enumerate()
        .map(|(offset, cells)| RawRow::new(first_row + offset + 1, cells.iter().map(cell_to_string).collect()))
        .collect())
}

fn read_csv_rows(blob: &SpreadsheetBlob) -> ImportResult<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_reader(blob.data.as_ref());

    let mut rows = Vec::new();
    for (offset, record) in reader.records().enumerate() {
        let row = match record {
            Ok(record) => RawRow::new(offset + 1, record.iter().map(|cell| cell.trim().to_string()).collect()),
            Err(e) if offset > 0 => {
                debug!(row = offset + 1, error = %e, "unreadable CSV row");
                RawRow::malformed(offset + 1)
            }
            Err(e) => return Err(ImportError::spreadsheet(&blob.filename, e)),
        };
        rows.push(row);
    }
    Ok(rows)
}

/// Cell text: trimmed strings, integral floats without `.0`, errors as empty
pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{:.0}", f)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
    }
}
