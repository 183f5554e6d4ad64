//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - passed between pipeline stages without re-parsing
//! - serialized as the wire envelope consumed by the upload page
//! - exported to JSON/CSV from the CLI
//!
//! Internal entities carry a little more structure than the wire schema
//! (cell coordinates, header lanes); those fields are `#[serde(skip)]` so the
//! serialized shape stays exactly the documented field set.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Expected value type of a taxonomy parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Numeric,
    Boolean,
    Enumerated,
    Text,
}

impl ValueType {
    pub fn label(self) -> &'static str {
        match self {
            ValueType::Numeric => "numeric",
            ValueType::Boolean => "boolean",
            ValueType::Enumerated => "enumerated",
            ValueType::Text => "text",
        }
    }
}

/// Inclusive plausibility bounds for a numeric parameter (canonical unit).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ValidRange {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl ValidRange {
    pub fn contains(&self, value: f64) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }
}

/// A canonical parameter of the factory taxonomy.
///
/// `aliases` are stored already normalized (see `taxonomy::normalize_label`).
#[derive(Debug, Clone, PartialEq)]
pub struct TaxonomyEntry {
    pub key: String,
    /// `None` for plant-wide parameters.
    pub asset_category: Option<String>,
    pub parameter_name: String,
    pub aliases: BTreeSet<String>,
    pub value_type: ValueType,
    /// Canonical unit id (see `coerce::units`), if the parameter has one.
    pub unit: Option<String>,
    pub valid_range: Option<ValidRange>,
    /// Allowed values for `ValueType::Enumerated`, in canonical spelling.
    pub enum_values: Vec<String>,
}

/// A known plant asset (boiler, turbine, pump...).
#[derive(Debug, Clone, PartialEq)]
pub struct AssetEntry {
    pub name: String,
    pub display_name: String,
    pub asset_type: Option<String>,
    pub aliases: BTreeSet<String>,
}

/// Primitive type inferred for a cell at ingest time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Primitive {
    String,
    Number,
    Blank,
    FormulaError,
}

/// One normalized cell of a sheet grid. Immutable once produced by the ingester.
#[derive(Debug, Clone, PartialEq)]
pub struct CellRecord {
    pub sheet_name: String,
    /// 0-based row index.
    pub row: usize,
    /// 0-based column index.
    pub column: usize,
    pub raw_text: String,
    pub inferred_primitive: Primitive,
    /// The numeric payload for `Primitive::Number` cells.
    pub number: Option<f64>,
}

impl CellRecord {
    pub fn is_blank(&self) -> bool {
        self.inferred_primitive == Primitive::Blank
    }
}

/// A provisional (label, value) pairing proposed by the layout classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub sheet_name: String,
    /// `None` means the generic plant-wide placeholder.
    pub asset_name: Option<String>,
    pub param_label: String,
    pub value_cell: CellRecord,
    /// Index of the header lane (column for row-oriented sheets, row for
    /// column-oriented ones) the label was read from.
    pub lane: usize,
}

/// Match-and-coercion certainty tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

/// A typed value after coercion to the entry's `ValueType`.
///
/// Enumerated values are carried as their canonical spelling in `Text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParsedValue {
    Number(f64),
    Boolean(bool),
    Text(String),
}

impl ParsedValue {
    /// Does this value have the JSON shape expected for `value_type`?
    pub fn conforms_to(&self, value_type: ValueType) -> bool {
        matches!(
            (self, value_type),
            (ParsedValue::Number(_), ValueType::Numeric)
                | (ParsedValue::Boolean(_), ValueType::Boolean)
                | (ParsedValue::Text(_), ValueType::Enumerated | ValueType::Text)
        )
    }

    pub fn display(&self) -> String {
        match self {
            ParsedValue::Number(v) => format_number(*v),
            ParsedValue::Boolean(b) => b.to_string(),
            ParsedValue::Text(s) => s.clone(),
        }
    }
}

/// Why a point was routed to `needs_review`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewReason {
    CoercionFailed,
    UnitMismatch,
    OutOfRange,
    LowConfidence,
}

impl ReviewReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewReason::CoercionFailed => "coercion_failed",
            ReviewReason::UnitMismatch => "unit_mismatch",
            ReviewReason::OutOfRange => "out_of_range",
            ReviewReason::LowConfidence => "low_confidence",
        }
    }
}

/// An accepted, fully typed data point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataPoint {
    pub sheet_name: String,
    pub asset_name: Option<String>,
    pub param_name: String,
    pub raw_value: String,
    pub parsed_value: ParsedValue,
    pub confidence: Confidence,
    #[serde(skip)]
    pub row: usize,
    #[serde(skip)]
    pub column: usize,
}

/// A point held back for human correction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewItem {
    pub sheet_name: String,
    pub asset_name: Option<String>,
    pub param_name: String,
    pub raw_value: String,
    pub parsed_value: Option<ParsedValue>,
    pub confidence: Confidence,
    pub reason: Option<ReviewReason>,
    #[serde(skip)]
    pub row: usize,
    #[serde(skip)]
    pub column: usize,
}

/// A label no taxonomy entry matched above the low floor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmappedColumn {
    pub sheet_name: String,
    pub raw_label: String,
    pub sample_values: Vec<String>,
}

/// Machine-readable warning codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningCode {
    NoLayoutDetected,
    TitleRowsSkipped,
    DuplicateLabel,
    DuplicateMapping,
    MergedCells,
    MixedUnits,
    SheetCancelled,
}

impl WarningCode {
    pub fn as_str(self) -> &'static str {
        match self {
            WarningCode::NoLayoutDetected => "no_layout_detected",
            WarningCode::TitleRowsSkipped => "title_rows_skipped",
            WarningCode::DuplicateLabel => "duplicate_label",
            WarningCode::DuplicateMapping => "duplicate_mapping",
            WarningCode::MergedCells => "merged_cells",
            WarningCode::MixedUnits => "mixed_units",
            WarningCode::SheetCancelled => "sheet_cancelled",
        }
    }
}

/// A non-fatal structural anomaly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    pub sheet_name: String,
    pub code: WarningCode,
    pub message: String,
}

impl Warning {
    pub fn new(sheet_name: &str, code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.to_string(),
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseStatus {
    /// Every sheet was processed.
    Success,
    /// At least one sheet was dropped by cancellation.
    Partial,
}

/// The externally visible result of one parse request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseResult {
    pub status: ParseStatus,
    pub parsed_data: Vec<DataPoint>,
    pub needs_review: Vec<ReviewItem>,
    pub unmapped_columns: Vec<UnmappedColumn>,
    pub warnings: Vec<Warning>,
}

/// The envelope returned when the workbook cannot be opened at all.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureResult {
    pub status: &'static str,
    pub detail: String,
}

impl FailureResult {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            status: "error",
            detail: detail.into(),
        }
    }
}

/// Either wire envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParseResponse {
    Success(ParseResult),
    Failure(FailureResult),
}

/// Tunable engine constants.
///
/// Defaults are documented in `DESIGN.md`; the binary layers `.env`/environment
/// values and CLI flags on top.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseConfig {
    /// Minimum similarity for a `medium` match.
    pub medium_threshold: f64,
    /// Minimum similarity for a `low` match; below this a label is unmapped.
    pub low_floor: f64,
    /// Raw sample values attached to each unmapped column.
    pub sample_limit: usize,
    /// How many leading rows/columns are searched for a header lane.
    pub scan_limit: usize,
    /// Fan out over sheets with rayon.
    pub parallel: bool,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            medium_threshold: 0.82,
            low_floor: 0.60,
            sample_limit: 5,
            scan_limit: 20,
            parallel: true,
        }
    }
}

impl ParseConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.low_floor > 0.0 && self.low_floor < self.medium_threshold && self.medium_threshold <= 1.0) {
            return Err(format!(
                "Invalid thresholds: need 0 < low_floor ({}) < medium_threshold ({}) <= 1.",
                self.low_floor, self.medium_threshold
            ));
        }
        if self.sample_limit == 0 {
            return Err("`sample_limit` must be at least 1.".to_string());
        }
        if self.scan_limit == 0 {
            return Err("`scan_limit` must be at least 1.".to_string());
        }
        Ok(())
    }
}

/// Render a number the way a spreadsheet shows it: integers without a
/// fractional part, everything else with Rust's shortest round-trip form.
pub fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}
