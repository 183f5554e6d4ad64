//! Orientation-agnostic access to a sheet grid.
//!
//! A `View` looks at the grid either row-wise (header lanes are rows, cells
//! within a lane are columns) or column-wise (the transpose). The classifier
//! is written once against `View` and runs for both orientations.

use crate::coerce::value::{is_null_token, looks_like_date, looks_numeric};
use crate::domain::{CellRecord, Primitive};
use crate::io::ingest::SheetGrid;

/// Text at most this many characters long counts as a short enumerated value.
pub const SHORT_TEXT_MAX: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Header lanes are rows.
    Rows,
    /// Header lanes are columns.
    Columns,
}

#[derive(Debug, Clone, Copy)]
pub struct View<'g> {
    pub grid: &'g SheetGrid,
    pub axis: Axis,
}

impl<'g> View<'g> {
    pub fn new(grid: &'g SheetGrid, axis: Axis) -> Self {
        Self { grid, axis }
    }

    /// Number of lanes along the header axis.
    pub fn majors(&self) -> usize {
        match self.axis {
            Axis::Rows => self.grid.rows(),
            Axis::Columns => self.grid.cols(),
        }
    }

    /// Number of cells within one lane.
    pub fn minors(&self) -> usize {
        match self.axis {
            Axis::Rows => self.grid.cols(),
            Axis::Columns => self.grid.rows(),
        }
    }

    pub fn cell(&self, major: usize, minor: usize) -> Option<&'g CellRecord> {
        match self.axis {
            Axis::Rows => self.grid.get(major, minor),
            Axis::Columns => self.grid.get(minor, major),
        }
    }

    /// Absolute sheet row (or column) of a grid-relative major lane.
    pub fn absolute(&self, major: usize) -> usize {
        let (row, col) = self.grid.origin();
        match self.axis {
            Axis::Rows => row + major,
            Axis::Columns => col + major,
        }
    }

    /// Non-blank cell at `(major, minor)`.
    pub fn populated(&self, major: usize, minor: usize) -> Option<&'g CellRecord> {
        self.cell(major, minor).filter(|c| !c.is_blank())
    }

    pub fn profile(&self, major: usize) -> LaneProfile {
        let mut profile = LaneProfile::default();
        for minor in 0..self.minors() {
            if let Some(cell) = self.populated(major, minor) {
                profile.add(cell);
            }
        }
        profile
    }

    /// Profile of the cells at `minor` across `majors`.
    pub fn cross_profile(&self, minor: usize, majors: &[usize]) -> LaneProfile {
        let mut profile = LaneProfile::default();
        for &major in majors {
            if let Some(cell) = self.populated(major, minor) {
                profile.add(cell);
            }
        }
        profile
    }
}

/// Cell-class counts for one lane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaneProfile {
    pub non_blank: usize,
    pub labels: usize,
    pub values: usize,
}

impl LaneProfile {
    fn add(&mut self, cell: &CellRecord) {
        self.non_blank += 1;
        if is_label(cell) {
            self.labels += 1;
        }
        if is_value_like(cell) {
            self.values += 1;
        }
    }

    /// A strict majority of populated cells are labels.
    pub fn mostly_labels(&self) -> bool {
        self.non_blank > 0 && self.labels * 2 > self.non_blank
    }

    /// A strict majority of populated cells are value-like.
    pub fn mostly_values(&self) -> bool {
        self.non_blank > 0 && self.values * 2 > self.non_blank
    }
}

/// Free text that can name a parameter or an asset.
pub fn is_label(cell: &CellRecord) -> bool {
    cell.inferred_primitive == Primitive::String
        && !is_null_token(&cell.raw_text)
        && !looks_numeric(&cell.raw_text)
        && !looks_like_date(&cell.raw_text)
}

/// Numbers, errors, null markers, dates and short enumerated text.
pub fn is_value_like(cell: &CellRecord) -> bool {
    match cell.inferred_primitive {
        Primitive::Number | Primitive::FormulaError => true,
        Primitive::Blank => false,
        Primitive::String => {
            let t = cell.raw_text.as_str();
            is_null_token(t) || looks_numeric(t) || looks_like_date(t) || t.chars().count() <= SHORT_TEXT_MAX
        }
    }
}
