//! Export parse results to JSON and CSV.
//!
//! The JSON export is the exact wire envelope; the CSV export flattens
//! `parsed_data` so it is easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::domain::{DataPoint, ParseResponse};
use crate::error::AppError;

/// One CSV row per accepted data point (cell coordinates are 1-based).
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    sheet_name: &'a str,
    asset_name: &'a str,
    param_name: &'a str,
    raw_value: &'a str,
    parsed_value: String,
    confidence: &'static str,
    row: usize,
    column: usize,
}

/// Write the response envelope as pretty JSON.
pub fn write_response_json(path: &Path, response: &ParseResponse) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create JSON output '{}': {e}", path.display())))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, response)
        .map_err(|e| AppError::new(4, format!("Failed to write JSON output: {e}")))?;
    writer
        .write_all(b"\n")
        .and_then(|()| writer.flush())
        .map_err(|e| AppError::new(4, format!("Failed to write JSON output: {e}")))
}

/// Write `parsed_data` to a CSV file.
pub fn write_parsed_csv(path: &Path, points: &[DataPoint]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_parsed_csv_to(file, points)
}

fn write_parsed_csv_to<W: Write>(out: W, points: &[DataPoint]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);
    for p in points {
        writer
            .serialize(CsvRow {
                sheet_name: &p.sheet_name,
                asset_name: p.asset_name.as_deref().unwrap_or(""),
                param_name: &p.param_name,
                raw_value: &p.raw_value,
                parsed_value: p.parsed_value.display(),
                confidence: p.confidence.as_str(),
                row: p.row + 1,
                column: p.column + 1,
            })
            .map_err(|e| AppError::new(4, format!("Failed to write export CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(4, format!("Failed to flush export CSV: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Confidence, ParsedValue};

    #[test]
    fn csv_has_header_and_one_based_coordinates() {
        let points = vec![DataPoint {
            sheet_name: "Ops".into(),
            asset_name: None,
            param_name: "coal_consumption".into(),
            raw_value: "1,234.56".into(),
            parsed_value: ParsedValue::Number(1234.56),
            confidence: Confidence::High,
            row: 3,
            column: 1,
        }];
        let mut buf = Vec::new();
        write_parsed_csv_to(&mut buf, &points).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("sheet_name,asset_name,param_name,raw_value,parsed_value,confidence,row,column")
        );
        assert_eq!(lines.next(), Some("Ops,,coal_consumption,\"1,234.56\",1234.56,high,4,2"));
    }
}
