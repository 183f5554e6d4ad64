//! Workbook ingest and grid normalization.
//!
//! This module turns uploaded workbook bytes into a uniform, dense grid of
//! `CellRecord`s per sheet. It knows about container formats and cell types;
//! it knows nothing about layouts or the taxonomy.
//!
//! - formula cells are read by their cached (last computed) value
//! - a formula evaluation error becomes a `formula-error` cell, never a failure
//! - the grid spans only the populated bounding box; its origin offset keeps
//!   cell coordinates matching what the user sees in the spreadsheet
//! - only a container that cannot be opened at all is an error

use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Ods, Range, Reader, Sheets, Xls, Xlsb, Xlsx, open_workbook_auto_from_rs};
use chrono::Timelike;
use tracing::debug;

use crate::domain::{CellRecord, Primitive, format_number};
use crate::error::ParseError;

/// A cell value before normalization, independent of the container library.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// A formula evaluation error such as `#DIV/0!`.
    Error(String),
}

/// One sheet as a dense grid over its populated bounding box.
///
/// `get` takes grid-relative indices; every `CellRecord` carries its absolute
/// sheet coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetGrid {
    pub name: String,
    /// Absolute (row, column) of grid cell `(0, 0)`.
    origin: (usize, usize),
    rows: usize,
    cols: usize,
    cells: Vec<CellRecord>,
    /// Number of merged regions reported by the container.
    pub merged_regions: usize,
}

impl SheetGrid {
    /// Build a grid from row-major raw values starting at `A1`.
    pub fn from_raw(name: &str, raw_rows: Vec<Vec<RawValue>>) -> Self {
        Self::from_raw_at(name, (0, 0), raw_rows)
    }

    /// Build a grid from row-major raw values whose first value sits at the
    /// absolute `origin`. Ragged rows are padded; blank margins are dropped.
    pub fn from_raw_at(name: &str, origin: (usize, usize), raw_rows: Vec<Vec<RawValue>>) -> Self {
        let mut bounds: Option<(usize, usize, usize, usize)> = None;
        for (r, row) in raw_rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if is_blank_raw(value) {
                    continue;
                }
                bounds = Some(match bounds {
                    None => (r, r, c, c),
                    Some((r0, _, c0, c1)) => (r0, r, c0.min(c), c1.max(c)),
                });
            }
        }

        let Some((r0, r1, c0, c1)) = bounds else {
            return Self {
                name: name.to_string(),
                origin,
                rows: 0,
                cols: 0,
                cells: Vec::new(),
                merged_regions: 0,
            };
        };

        let (rows, cols) = (r1 - r0 + 1, c1 - c0 + 1);
        let mut cells = Vec::with_capacity(rows * cols);
        for r in r0..=r1 {
            for c in c0..=c1 {
                let value = raw_rows.get(r).and_then(|row| row.get(c)).unwrap_or(&RawValue::Empty);
                cells.push(to_cell_record(name, origin.0 + r, origin.1 + c, value));
            }
        }

        Self {
            name: name.to_string(),
            origin: (origin.0 + r0, origin.1 + c0),
            rows,
            cols,
            cells,
            merged_regions: 0,
        }
    }

    /// Absolute (row, column) of the grid's top-left cell.
    pub fn origin(&self) -> (usize, usize) {
        self.origin
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Cell at grid-relative `(row, col)`; `None` outside the grid.
    pub fn get(&self, row: usize, col: usize) -> Option<&CellRecord> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.cells.get(row * self.cols + col)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(CellRecord::is_blank)
    }

    pub fn populated_cells(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_blank()).count()
    }
}

/// An opened workbook: its sheets in workbook order.
#[derive(Debug, Clone, PartialEq)]
pub struct Workbook {
    pub filename: String,
    pub sheets: Vec<SheetGrid>,
}

/// Open workbook bytes and normalize every sheet.
///
/// The filename's extension picks the container reader; an unknown extension
/// falls back to content sniffing.
pub fn read_workbook(bytes: &[u8], filename: &str) -> Result<Workbook, ParseError> {
    let malformed = |detail: String| ParseError::MalformedFile {
        filename: filename.to_string(),
        detail,
    };

    let cursor = Cursor::new(bytes.to_vec());
    let mut sheets = open_sheets(cursor, filename).map_err(malformed)?;

    let names = sheets.sheet_names();
    if names.is_empty() {
        return Err(ParseError::NoWorksheets {
            filename: filename.to_string(),
        });
    }

    let mut grids = Vec::with_capacity(names.len());
    for name in names {
        let range = sheets
            .worksheet_range(&name)
            .map_err(|e| malformed(format!("failed to read sheet '{name}': {e}")))?;

        let mut grid = grid_from_range(&name, &range);
        grid.merged_regions = merged_region_count(&mut sheets, &name);

        debug!(
            sheet = %name,
            rows = grid.rows(),
            cols = grid.cols(),
            populated = grid.populated_cells(),
            merged = grid.merged_regions,
            "sheet ingested"
        );
        grids.push(grid);
    }

    Ok(Workbook {
        filename: filename.to_string(),
        sheets: grids,
    })
}

fn open_sheets(cursor: Cursor<Vec<u8>>, filename: &str) -> Result<Sheets<Cursor<Vec<u8>>>, String> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("xlsx" | "xlsm") => Xlsx::new(cursor).map(Sheets::Xlsx).map_err(|e| e.to_string()),
        Some("xls") => Xls::new(cursor).map(Sheets::Xls).map_err(|e| e.to_string()),
        Some("xlsb") => Xlsb::new(cursor).map(Sheets::Xlsb).map_err(|e| e.to_string()),
        Some("ods") => Ods::new(cursor).map(Sheets::Ods).map_err(|e| e.to_string()),
        _ => open_workbook_auto_from_rs(cursor).map_err(|e| e.to_string()),
    }
}

fn merged_region_count(sheets: &mut Sheets<Cursor<Vec<u8>>>, name: &str) -> usize {
    match sheets {
        Sheets::Xlsx(xlsx) => match xlsx.worksheet_merge_cells(name) {
            Some(Ok(regions)) => regions.len(),
            _ => 0,
        },
        Sheets::Xls(xls) => xls.worksheet_merge_cells(name).map_or(0, |regions| regions.len()),
        _ => 0,
    }
}

fn grid_from_range(name: &str, range: &Range<Data>) -> SheetGrid {
    // Ranges start at the first used cell; keep that as the grid origin.
    let origin = range
        .start()
        .map_or((0, 0), |(r, c)| (r as usize, c as usize));
    let raw_rows = range
        .rows()
        .map(|row| row.iter().map(raw_from_data).collect())
        .collect();
    SheetGrid::from_raw_at(name, origin, raw_rows)
}

fn raw_from_data(data: &Data) -> RawValue {
    match data {
        Data::Empty => RawValue::Empty,
        Data::String(s) => RawValue::Text(s.clone()),
        Data::Float(f) => RawValue::Number(*f),
        Data::Int(i) => RawValue::Number(*i as f64),
        Data::Bool(b) => RawValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) if ndt.num_seconds_from_midnight() == 0 => {
                RawValue::Text(ndt.date().format("%Y-%m-%d").to_string())
            }
            Some(ndt) => RawValue::Text(ndt.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => RawValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => RawValue::Text(s.clone()),
        Data::Error(e) => RawValue::Error(e.to_string()),
    }
}

fn is_blank_raw(value: &RawValue) -> bool {
    match value {
        RawValue::Empty => true,
        RawValue::Text(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn to_cell_record(sheet: &str, row: usize, column: usize, value: &RawValue) -> CellRecord {
    let (raw_text, inferred_primitive, number) = match value {
        RawValue::Empty => (String::new(), Primitive::Blank, None),
        RawValue::Text(s) if s.trim().is_empty() => (String::new(), Primitive::Blank, None),
        RawValue::Text(s) => (s.trim().to_string(), Primitive::String, None),
        RawValue::Number(f) if f.is_finite() => (format_number(*f), Primitive::Number, Some(*f)),
        RawValue::Number(f) => (f.to_string(), Primitive::FormulaError, None),
        RawValue::Bool(b) => (if *b { "TRUE" } else { "FALSE" }.to_string(), Primitive::String, None),
        RawValue::Error(e) => (e.clone(), Primitive::FormulaError, None),
    };
    CellRecord {
        sheet_name: sheet.to_string(),
        row,
        column,
        raw_text,
        inferred_primitive,
        number,
    }
}
