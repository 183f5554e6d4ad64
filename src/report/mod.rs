//! Result aggregation: routing matched/coerced candidates into the result
//! buckets, and merging per-sheet outcomes into one `ParseResult`.
//!
//! Routing, applied per point in order:
//!
//! 1. coercion failed -> `needs_review` (`parsed_value = null`)
//! 2. value outside `valid_range` -> `needs_review`, demoted to `low`
//! 3. `low` label match -> `needs_review`
//! 4. otherwise -> `parsed_data`
//!
//! Unmapped labels and structural warnings feed their lists unconditionally.
//! There is no cross-sheet deduplication.

pub mod format;

use std::collections::{BTreeMap, HashMap};

use crate::coerce::units::unit_by_id;
use crate::coerce::{Coercion, apparent_unit};
use crate::domain::{
    Candidate, Confidence, DataPoint, ParseResult, ParseStatus, ParsedValue, ReviewItem, ReviewReason,
    UnmappedColumn, ValueType, Warning, WarningCode,
};
use crate::matcher::LabelMatch;

pub use format::*;

/// Everything one sheet contributes to the result, in discovery order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetOutcome {
    pub parsed_data: Vec<DataPoint>,
    pub needs_review: Vec<ReviewItem>,
    pub unmapped_columns: Vec<UnmappedColumn>,
    pub warnings: Vec<Warning>,
}

impl SheetOutcome {
    /// The outcome of a sheet that was never started.
    pub fn cancelled(sheet_name: &str) -> Self {
        Self {
            warnings: vec![Warning::new(
                sheet_name,
                WarningCode::SheetCancelled,
                "Sheet skipped: the request was cancelled or ran out of time.",
            )],
            ..Self::default()
        }
    }
}

/// What one header lane resolved to, for lane-level warnings.
#[derive(Debug)]
struct LaneRecord {
    label: String,
    param_name: String,
    header_asset: Option<String>,
    units: Vec<&'static str>,
}

/// Collects one sheet's routed points.
#[derive(Debug)]
pub struct SheetCollector {
    sheet_name: String,
    sample_limit: usize,
    outcome: SheetOutcome,
    /// raw label -> index into `outcome.unmapped_columns`
    unmapped_index: HashMap<String, usize>,
    lanes: BTreeMap<usize, LaneRecord>,
}

impl SheetCollector {
    pub fn new(sheet_name: &str, sample_limit: usize) -> Self {
        Self {
            sheet_name: sheet_name.to_string(),
            sample_limit,
            outcome: SheetOutcome::default(),
            unmapped_index: HashMap::new(),
            lanes: BTreeMap::new(),
        }
    }

    pub fn warn(&mut self, warning: Warning) {
        self.outcome.warnings.push(warning);
    }

    /// A candidate whose label matched nothing above the low floor.
    pub fn record_unmapped(&mut self, candidate: &Candidate) {
        let label = candidate.param_label.trim();
        let idx = match self.unmapped_index.get(label) {
            Some(&idx) => idx,
            None => {
                self.outcome.unmapped_columns.push(UnmappedColumn {
                    sheet_name: self.sheet_name.clone(),
                    raw_label: label.to_string(),
                    sample_values: Vec::new(),
                });
                let idx = self.outcome.unmapped_columns.len() - 1;
                self.unmapped_index.insert(label.to_string(), idx);
                idx
            }
        };
        let samples = &mut self.outcome.unmapped_columns[idx].sample_values;
        if samples.len() < self.sample_limit {
            samples.push(candidate.value_cell.raw_text.clone());
        }
    }

    /// A matched candidate and the coercion of its value.
    pub fn record_match(
        &mut self,
        candidate: &Candidate,
        matched: &LabelMatch<'_>,
        asset_name: Option<String>,
        coercion: Coercion,
    ) {
        let entry = matched.entry;
        let lane = self.lanes.entry(candidate.lane).or_insert_with(|| LaneRecord {
            label: candidate.param_label.clone(),
            param_name: entry.parameter_name.clone(),
            header_asset: matched.asset.map(|a| a.name.clone()),
            units: Vec::new(),
        });
        if entry.value_type == ValueType::Numeric {
            // A bare number that coerced is read in the canonical unit.
            let unit = apparent_unit(&candidate.value_cell, matched.header_unit).or_else(|| match coercion {
                Coercion::Value { .. } => entry.unit.as_deref().and_then(unit_by_id),
                Coercion::Failed(_) => None,
            });
            if let Some(unit) = unit {
                if !lane.units.contains(&unit.id) {
                    lane.units.push(unit.id);
                }
            }
        }

        let cell = &candidate.value_cell;
        let review = |parsed_value: Option<ParsedValue>, confidence: Confidence, reason: ReviewReason| ReviewItem {
            sheet_name: candidate.sheet_name.clone(),
            asset_name: asset_name.clone(),
            param_name: entry.parameter_name.clone(),
            raw_value: cell.raw_text.clone(),
            parsed_value,
            confidence,
            reason: Some(reason),
            row: cell.row,
            column: cell.column,
        };

        match coercion {
            Coercion::Failed(reason) => {
                let item = review(None, matched.confidence, reason);
                self.outcome.needs_review.push(item);
            }
            Coercion::Value { value, .. } if !value.conforms_to(entry.value_type) => {
                let item = review(None, matched.confidence, ReviewReason::CoercionFailed);
                self.outcome.needs_review.push(item);
            }
            Coercion::Value {
                value,
                out_of_range: true,
            } => {
                let item = review(Some(value), Confidence::Low, ReviewReason::OutOfRange);
                self.outcome.needs_review.push(item);
            }
            Coercion::Value { value, .. } if matched.confidence == Confidence::Low => {
                let item = review(Some(value), Confidence::Low, ReviewReason::LowConfidence);
                self.outcome.needs_review.push(item);
            }
            Coercion::Value { value, .. } => {
                self.outcome.parsed_data.push(DataPoint {
                    sheet_name: candidate.sheet_name.clone(),
                    asset_name,
                    param_name: entry.parameter_name.clone(),
                    raw_value: cell.raw_text.clone(),
                    parsed_value: value,
                    confidence: matched.confidence,
                    row: cell.row,
                    column: cell.column,
                });
            }
        }
    }

    /// Add lane-level warnings and hand back the sheet's outcome.
    pub fn finish(mut self) -> SheetOutcome {
        let mut by_target: BTreeMap<(&str, Option<&str>), Vec<&str>> = BTreeMap::new();
        for lane in self.lanes.values() {
            by_target
                .entry((lane.param_name.as_str(), lane.header_asset.as_deref()))
                .or_default()
                .push(lane.label.as_str());
        }

        let mut warnings = Vec::new();
        for ((param, asset), labels) in &by_target {
            if labels.len() < 2 {
                continue;
            }
            let quoted: Vec<String> = labels.iter().map(|l| format!("'{l}'")).collect();
            let target = match asset {
                Some(asset) => format!("{param} ({asset})"),
                None => param.to_string(),
            };
            warnings.push(Warning::new(
                &self.sheet_name,
                WarningCode::DuplicateMapping,
                format!("Labels {} all map to {target}; every value is kept.", quoted.join(", ")),
            ));
        }
        for lane in self.lanes.values() {
            if lane.units.len() > 1 {
                warnings.push(Warning::new(
                    &self.sheet_name,
                    WarningCode::MixedUnits,
                    format!("Label '{}' mixes units: {}.", lane.label, lane.units.join(", ")),
                ));
            }
        }

        self.outcome.warnings.extend(warnings);
        self.outcome
    }
}

/// Merge sheet outcomes in sheet order.
pub fn merge_outcomes(outcomes: Vec<SheetOutcome>, status: ParseStatus) -> ParseResult {
    let mut result = ParseResult {
        status,
        parsed_data: Vec::new(),
        needs_review: Vec::new(),
        unmapped_columns: Vec::new(),
        warnings: Vec::new(),
    };
    for outcome in outcomes {
        result.parsed_data.extend(outcome.parsed_data);
        result.needs_review.extend(outcome.needs_review);
        result.unmapped_columns.extend(outcome.unmapped_columns);
        result.warnings.extend(outcome.warnings);
    }
    result
}
