//! Spreadsheet file parser
//!
//! Reads an uploaded `.csv`, `.xlsx` or `.xls` file eagerly into rows keyed
//! by the header row. Only the first sheet of a workbook is read.

use calamine::{Data, Reader};
use chrono::Timelike;
use std::path::Path;

use crate::error::ImportError;
use crate::models::Row;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Supported spreadsheet formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetFormat {
    Csv,
    Xlsx,
    Xls,
}

impl SpreadsheetFormat {
    /// Match an extension, with or without the leading dot, ignoring case
    pub fn from_extension(extension: &str) -> Result<Self, ImportError> {
        let normalized = extension.trim().trim_start_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "csv" => Ok(SpreadsheetFormat::Csv),
            "xlsx" => Ok(SpreadsheetFormat::Xlsx),
            "xls" => Ok(SpreadsheetFormat::Xls),
            _ => Err(ImportError::UnsupportedFormat(format!(
                "'.{}' (supported: .csv, .xlsx, .xls)",
                normalized
            ))),
        }
    }

    /// Format of an uploaded file name
    pub fn from_file_name(file_name: &str) -> Result<Self, ImportError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        Self::from_extension(extension)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            SpreadsheetFormat::Csv => "csv",
            SpreadsheetFormat::Xlsx => "xlsx",
            SpreadsheetFormat::Xls => "xls",
        }
    }
}

/// Parse a spreadsheet file into rows
///
/// `extension` decides the format; the path itself may carry any name.
/// A file with a header but no data rows yields an empty vector.
pub fn parse_file(path: &Path, extension: &str) -> Result<Vec<Row>, ImportError> {
    let format = SpreadsheetFormat::from_extension(extension)?;
    let data = std::fs::read(path)
        .map_err(|e| ImportError::Parse(format!("{}: {}", path.display(), e)))?;

    let rows = match format {
        SpreadsheetFormat::Csv => parse_csv(&data)?,
        SpreadsheetFormat::Xlsx | SpreadsheetFormat::Xls => parse_workbook(&data)?,
    };

    tracing::debug!(format = format.extension(), rows = rows.len(), "Parsed spreadsheet");
    Ok(rows)
}

/// Parse delimited text
pub fn parse_csv(data: &[u8]) -> Result<Vec<Row>, ImportError> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    let headers = header_names(
        reader
            .headers()
            .map_err(|e| ImportError::Parse(format!("CSV header: {}", e)))?
            .iter()
            .map(str::to_string),
    );

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| ImportError::Parse(format!("CSV: {}", e)))?;
        let row: Row = headers
            .iter()
            .enumerate()
            .map(|(i, header)| (header.as_str(), record.get(i).unwrap_or("")))
            .collect();
        if !row.is_blank() {
            rows.push(row);
        }
    }

    Ok(rows)
}

/// Parse the first sheet of an Excel workbook
pub fn parse_workbook(data: &[u8]) -> Result<Vec<Row>, ImportError> {
    let cursor = std::io::Cursor::new(data);
    let mut workbook = calamine::open_workbook_auto_from_rs(cursor)
        .map_err(|e| ImportError::Parse(format!("workbook: {}", e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ImportError::Parse("workbook has no sheets".to_string()))?
        .map_err(|e| ImportError::Parse(format!("first sheet: {}", e)))?;

    let mut sheet_rows = range.rows();
    let headers = match sheet_rows.next() {
        Some(header_row) => header_names(header_row.iter().map(cell_to_string)),
        None => return Ok(Vec::new()),
    };

    let mut rows = Vec::new();
    for cells in sheet_rows {
        let row: Row = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let value = cells.get(i).map(cell_to_string).unwrap_or_default();
                (header.as_str(), value)
            })
            .collect();
        if !row.is_blank() {
            rows.push(row);
        }
    }

    Ok(rows)
}

/// Trim header cells and name empty ones `column_<n>`
fn header_names(raw: impl Iterator<Item = String>) -> Vec<String> {
    raw.enumerate()
        .map(|(i, header)| {
            let header = header.trim();
            if header.is_empty() {
                format!("column_{}", i + 1)
            } else {
                header.to_string()
            }
        })
        .collect()
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => format_float(*f),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) if datetime.num_seconds_from_midnight() == 0 => {
                datetime.format("%Y-%m-%d").to_string()
            }
            Some(datetime) => datetime.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => dt.to_string(),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        _ => String::new(),
    }
}

// Integral values are printed without a fraction: ID columns typed as
// numbers come back from the workbook as floats.
fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
