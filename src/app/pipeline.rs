//! The parse pipeline shared by the CLI and library callers.
//!
//! Workbook bytes -> sheets -> layout -> label matching -> coercion -> routing,
//! with sheets fanned out over rayon and merged back in workbook order.
//!
//! A caller-imposed deadline (or an explicit `cancel()`) is checked before each
//! sheet starts. Sheets that never started are reported with a
//! `sheet_cancelled` warning and the result status becomes `partial`; a sheet
//! that did start always finishes, so nothing half-built is returned.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::coerce::coerce_cell;
use crate::domain::{FailureResult, ParseConfig, ParseResponse, ParseResult, ParseStatus, Warning, WarningCode};
use crate::error::ParseError;
use crate::io::ingest::{SheetGrid, Workbook, read_workbook};
use crate::layout::classify_sheet;
use crate::matcher::{Matcher, canonical_asset};
use crate::report::{SheetCollector, SheetOutcome, merge_outcomes};
use crate::taxonomy::Taxonomy;

/// Cooperative cancellation shared between the caller and sheet workers.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel automatically once `timeout` has elapsed from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Parse uploaded workbook bytes into a classification result.
///
/// The only error is a container that cannot be opened at all.
pub fn parse_workbook(
    bytes: &[u8],
    filename: &str,
    taxonomy: &Taxonomy,
    config: &ParseConfig,
    cancel: &Cancellation,
) -> Result<ParseResult, ParseError> {
    let workbook = read_workbook(bytes, filename)?;
    Ok(process_workbook(&workbook, taxonomy, config, cancel))
}

/// Run every sheet of an opened workbook through the engine.
pub fn process_workbook(
    workbook: &Workbook,
    taxonomy: &Taxonomy,
    config: &ParseConfig,
    cancel: &Cancellation,
) -> ParseResult {
    let run = |grid: &SheetGrid| -> (SheetOutcome, bool) {
        if cancel.is_cancelled() {
            warn!(sheet = %grid.name, "sheet cancelled before start");
            return (SheetOutcome::cancelled(&grid.name), true);
        }
        (process_sheet(grid, taxonomy, config), false)
    };

    // `collect` on an indexed parallel iterator keeps workbook order.
    let results: Vec<(SheetOutcome, bool)> = if config.parallel {
        workbook.sheets.par_iter().map(run).collect()
    } else {
        workbook.sheets.iter().map(run).collect()
    };

    let any_cancelled = results.iter().any(|(_, cancelled)| *cancelled);
    let status = if any_cancelled {
        ParseStatus::Partial
    } else {
        ParseStatus::Success
    };
    let result = merge_outcomes(results.into_iter().map(|(o, _)| o).collect(), status);

    info!(
        file = %workbook.filename,
        sheets = workbook.sheets.len(),
        parsed = result.parsed_data.len(),
        review = result.needs_review.len(),
        unmapped = result.unmapped_columns.len(),
        warnings = result.warnings.len(),
        partial = any_cancelled,
        "workbook parsed"
    );
    result
}

/// Classify, match, coerce and route one sheet.
pub fn process_sheet(grid: &SheetGrid, taxonomy: &Taxonomy, config: &ParseConfig) -> SheetOutcome {
    let layout = classify_sheet(grid, taxonomy, config);
    let mut collector = SheetCollector::new(&grid.name, config.sample_limit);
    for warning in layout.warnings {
        collector.warn(warning);
    }
    if grid.merged_regions > 0 {
        collector.warn(Warning::new(
            &grid.name,
            WarningCode::MergedCells,
            format!(
                "Sheet has {} merged region(s); only the top-left cell of each carries a value.",
                grid.merged_regions
            ),
        ));
    }

    let mut matcher = Matcher::new(taxonomy, config);
    for candidate in &layout.candidates {
        let Some(matched) = matcher.resolve(&candidate.param_label) else {
            collector.record_unmapped(candidate);
            continue;
        };

        // A header-embedded asset wins over the lane's asset label.
        let asset_name = match matched.asset {
            Some(asset) => Some(asset.name.clone()),
            None => candidate
                .asset_name
                .as_deref()
                .map(|label| canonical_asset(matcher.taxonomy(), label)),
        };

        let coercion = coerce_cell(matched.entry, &candidate.value_cell, matched.header_unit);
        collector.record_match(candidate, &matched, asset_name, coercion);
    }

    let outcome = collector.finish();
    debug!(
        sheet = %grid.name,
        candidates = layout.candidates.len(),
        parsed = outcome.parsed_data.len(),
        review = outcome.needs_review.len(),
        unmapped = outcome.unmapped_columns.len(),
        "sheet processed"
    );
    outcome
}

/// Project an engine result onto the wire envelope.
pub fn respond(result: Result<ParseResult, ParseError>) -> ParseResponse {
    match result {
        Ok(result) => ParseResponse::Success(result),
        Err(err) => ParseResponse::Failure(FailureResult::new(err.detail())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Confidence, ParsedValue, ReviewReason, ValueType};
    use crate::io::ingest::RawValue;

    fn t(s: &str) -> RawValue {
        RawValue::Text(s.to_string())
    }

    fn n(v: f64) -> RawValue {
        RawValue::Number(v)
    }

    fn workbook(sheets: Vec<(&str, Vec<Vec<RawValue>>)>) -> Workbook {
        Workbook {
            filename: "test.xlsx".to_string(),
            sheets: sheets
                .into_iter()
                .map(|(name, rows)| SheetGrid::from_raw(name, rows))
                .collect(),
        }
    }

    fn run(wb: &Workbook, taxonomy: &Taxonomy) -> ParseResult {
        process_workbook(wb, taxonomy, &ParseConfig::default(), &Cancellation::new())
    }

    /// A small catalogue where only pump pressure and coal are known.
    fn pump_only() -> Taxonomy {
        Taxonomy::from_json_str(
            r#"{
                "parameters": [
                    { "key": "pump.pressure", "parameter_name": "pump_pressure",
                      "value_type": "numeric", "unit": "psi",
                      "aliases": ["Pump Pressure (psi)"] },
                    { "key": "boiler.coal", "parameter_name": "coal_consumption",
                      "value_type": "numeric", "unit": "t",
                      "valid_range": { "min": 0 },
                      "aliases": ["Coal Consumption"] }
                ]
            }"#,
        )
        .unwrap()
    }

    fn messy() -> Vec<Vec<RawValue>> {
        vec![
            vec![t("Monthly Operations Report - ACME Corp")],
            vec![],
            vec![t("Date"), t("Coal Used (MT)"), t("Steam (T/hr)"), t("Trip"), t("Comments")],
            vec![t("2023-10-01"), t("1,234.56"), t("45"), t("YES"), t("Normal operations")],
            vec![t("2023-10-02"), t("1,190.00"), t("N/A"), t("NO"), t("Sensor offline")],
        ]
    }

    #[test]
    fn scenario_a_exact_alias_and_unregistered_label() {
        let wb = workbook(vec![(
            "Sheet1",
            vec![vec![t("Pump Pressure (psi)"), t("Temp C")], vec![n(120.0), n(85.0)]],
        )]);
        for taxonomy in [pump_only(), Taxonomy::builtin().unwrap()] {
            let result = run(&wb, &taxonomy);

            assert_eq!(result.parsed_data.len(), 1);
            let p = &result.parsed_data[0];
            assert_eq!(p.param_name, "pump_pressure");
            assert_eq!(p.confidence, Confidence::High);
            assert_eq!(p.parsed_value, ParsedValue::Number(120.0));

            assert_eq!(result.unmapped_columns.len(), 1);
            assert_eq!(result.unmapped_columns[0].raw_label, "Temp C");
            assert_eq!(result.unmapped_columns[0].sample_values, vec!["85"]);
            assert!(result.needs_review.is_empty(), "{:?}", result.needs_review);
            assert_eq!(result.status, ParseStatus::Success);
        }
    }

    #[test]
    fn scenario_b_null_token_goes_to_review() {
        let wb = workbook(vec![("Sheet1", vec![vec![t("Pump Pressure (psi)"), t("Coal Consumption")], vec![t("N/A"), n(3.0)]])]);
        let result = run(&wb, &pump_only());

        assert_eq!(result.needs_review.len(), 1);
        let r = &result.needs_review[0];
        assert_eq!(r.reason, Some(ReviewReason::CoercionFailed));
        assert_eq!(r.raw_value, "N/A");
        assert_eq!(r.parsed_value, None);
    }

    #[test]
    fn scenario_c_empty_sheet_warns_only() {
        let wb = workbook(vec![("Empty", vec![])]);
        let result = run(&wb, &pump_only());

        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].code, WarningCode::NoLayoutDetected);
        assert!(result.parsed_data.is_empty());
        assert!(result.needs_review.is_empty());
        assert!(result.unmapped_columns.is_empty());
    }

    #[test]
    fn scenario_d_invalid_container_is_a_failure_envelope() {
        let taxonomy = pump_only();
        let response = respond(parse_workbook(
            b"definitely not a spreadsheet",
            "upload.xlsx",
            &taxonomy,
            &ParseConfig::default(),
            &Cancellation::new(),
        ));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "error");
        assert!(!json["detail"].as_str().unwrap().is_empty());
        assert!(json.get("parsed_data").is_none());
        assert!(json.get("needs_review").is_none());
    }

    #[test]
    fn messy_sheet_against_builtin_taxonomy() {
        let taxonomy = Taxonomy::builtin().unwrap();
        let wb = workbook(vec![("Ops", messy())]);
        let result = run(&wb, &taxonomy);

        let coal: Vec<f64> = result
            .parsed_data
            .iter()
            .filter(|p| p.param_name == "coal_consumption")
            .filter_map(|p| match p.parsed_value {
                ParsedValue::Number(v) => Some(v),
                _ => None,
            })
            .collect();
        assert_eq!(coal, vec![1234.56, 1190.0]);

        assert!(result
            .parsed_data
            .iter()
            .any(|p| p.param_name == "trip_occurred" && p.parsed_value == ParsedValue::Boolean(true)));
        assert!(result
            .needs_review
            .iter()
            .any(|r| r.param_name == "steam_generation" && r.raw_value == "N/A"));

        let unmapped: Vec<&str> = result.unmapped_columns.iter().map(|u| u.raw_label.as_str()).collect();
        assert!(unmapped.contains(&"Date"));
        assert!(unmapped.contains(&"Comments"));
        assert!(result.warnings.iter().any(|w| w.code == WarningCode::TitleRowsSkipped));
    }

    #[test]
    fn header_embedded_assets_and_negative_values() {
        let taxonomy = Taxonomy::builtin().unwrap();
        let wb = workbook(vec![(
            "Assets",
            vec![
                vec![t("Date"), t("Coal Consumption AFBC-1"), t("Steam (Boiler 1)"), t("Coal Consumption AFBC-2"), t("Power TG-1")],
                vec![t("2023-10-01"), n(500.0), n(20.0), n(-500.0), n(350.0)],
            ],
        )]);
        let result = run(&wb, &taxonomy);

        let assets: Vec<(&str, Option<&str>)> = result
            .parsed_data
            .iter()
            .map(|p| (p.param_name.as_str(), p.asset_name.as_deref()))
            .collect();
        assert_eq!(
            assets,
            vec![
                ("coal_consumption", Some("AFBC-1")),
                ("steam_generation", Some("AFBC-1")),
                ("power_generation", Some("TG-1")),
            ]
        );
        let negative = &result.needs_review[0];
        assert_eq!(negative.asset_name.as_deref(), Some("AFBC-2"));
        assert_eq!(negative.reason, Some(ReviewReason::OutOfRange));
        assert_eq!(negative.confidence, Confidence::Low);
    }

    #[test]
    fn leading_status_column_is_parsed_not_taken_as_assets() {
        let taxonomy = Taxonomy::builtin().unwrap();
        let wb = workbook(vec![(
            "Sheet1",
            vec![
                vec![t("Status"), t("Coal Consumption")],
                vec![t("running"), n(500.0)],
                vec![t("stopped"), n(480.0)],
            ],
        )]);
        let result = run(&wb, &taxonomy);

        let parsed: Vec<(&str, Option<&str>, ParsedValue)> = result
            .parsed_data
            .iter()
            .map(|p| (p.param_name.as_str(), p.asset_name.as_deref(), p.parsed_value.clone()))
            .collect();
        assert_eq!(
            parsed,
            vec![
                ("running_status", None, ParsedValue::Text("running".into())),
                ("coal_consumption", None, ParsedValue::Number(500.0)),
                ("running_status", None, ParsedValue::Text("stopped".into())),
                ("coal_consumption", None, ParsedValue::Number(480.0)),
            ]
        );
        assert!(result.needs_review.is_empty());
        assert!(result.unmapped_columns.is_empty());
    }

    #[test]
    fn grid_asset_labels_are_canonicalized() {
        let taxonomy = Taxonomy::builtin().unwrap();
        let wb = workbook(vec![(
            "Units",
            vec![
                vec![t("Asset"), t("Coal Consumption"), t("Steam Generation")],
                vec![t("Boiler 1"), n(500.0), n(20.0)],
                vec![t("Kiln 3"), n(480.0), n(19.5)],
            ],
        )]);
        let result = run(&wb, &taxonomy);
        let assets: Vec<Option<&str>> = result.parsed_data.iter().map(|p| p.asset_name.as_deref()).collect();
        assert_eq!(assets, vec![Some("AFBC-1"), Some("AFBC-1"), Some("Kiln 3"), Some("Kiln 3")]);
    }

    #[test]
    fn every_candidate_lands_in_exactly_one_bucket() {
        let taxonomy = Taxonomy::builtin().unwrap();
        let grid = SheetGrid::from_raw("Ops", messy());
        let layout = classify_sheet(&grid, &taxonomy, &ParseConfig::default());
        let outcome = process_sheet(&grid, &taxonomy, &ParseConfig::default());

        let config = ParseConfig::default();
        let mut matcher = Matcher::new(&taxonomy, &config);
        let unmapped_candidates = layout
            .candidates
            .iter()
            .filter(|c| matcher.resolve(&c.param_label).is_none())
            .count();
        assert_eq!(
            outcome.parsed_data.len() + outcome.needs_review.len() + unmapped_candidates,
            layout.candidates.len()
        );
        for c in layout.candidates.iter().filter(|c| matcher.resolve(&c.param_label).is_none()) {
            assert!(outcome.unmapped_columns.iter().any(|u| u.raw_label == c.param_label.trim()));
        }
    }

    #[test]
    fn parsed_data_is_typed_and_never_low() {
        let taxonomy = Taxonomy::builtin().unwrap();
        let wb = workbook(vec![("Ops", messy())]);
        let result = run(&wb, &taxonomy);
        for p in &result.parsed_data {
            assert_ne!(p.confidence, Confidence::Low);
            let entry = taxonomy
                .entries()
                .iter()
                .find(|e| e.parameter_name == p.param_name)
                .unwrap();
            assert!(p.parsed_value.conforms_to(entry.value_type));
        }
        for r in &result.needs_review {
            if r.reason == Some(ReviewReason::CoercionFailed) {
                assert!(r.parsed_value.is_none());
            }
        }
        assert!(taxonomy.entries().iter().any(|e| e.value_type == ValueType::Boolean));
    }

    #[test]
    fn reparsing_is_deterministic_in_both_modes() {
        let taxonomy = Taxonomy::builtin().unwrap();
        let wb = workbook(vec![("A", messy()), ("B", vec![]), ("C", messy())]);
        let parallel = run(&wb, &taxonomy);
        let sequential = process_workbook(
            &wb,
            &taxonomy,
            &ParseConfig {
                parallel: false,
                ..ParseConfig::default()
            },
            &Cancellation::new(),
        );
        assert_eq!(parallel, sequential);
        assert_eq!(
            serde_json::to_string(&parallel).unwrap(),
            serde_json::to_string(&run(&wb, &taxonomy)).unwrap()
        );
        // No cross-sheet dedup: both copies of the same sheet contribute.
        let from_a = parallel.parsed_data.iter().filter(|p| p.sheet_name == "A").count();
        let from_c = parallel.parsed_data.iter().filter(|p| p.sheet_name == "C").count();
        assert_eq!(from_a, from_c);
        assert!(from_a > 0);
    }

    #[test]
    fn cancelled_requests_are_partial() {
        let taxonomy = Taxonomy::builtin().unwrap();
        let wb = workbook(vec![("A", messy()), ("B", messy())]);
        let cancel = Cancellation::new();
        cancel.cancel();
        let result = process_workbook(&wb, &taxonomy, &ParseConfig::default(), &cancel);

        assert_eq!(result.status, ParseStatus::Partial);
        assert!(result.parsed_data.is_empty());
        assert_eq!(result.warnings.len(), 2);
        assert!(result.warnings.iter().all(|w| w.code == WarningCode::SheetCancelled));
    }

    #[test]
    fn expired_deadline_cancels() {
        let cancel = Cancellation::with_timeout(Duration::ZERO);
        assert!(cancel.is_cancelled());
        assert!(!Cancellation::with_timeout(Duration::from_secs(3600)).is_cancelled());
    }

    #[test]
    fn success_envelope_has_exactly_the_wire_keys() {
        let wb = workbook(vec![(
            "Sheet1",
            vec![vec![t("Pump Pressure (psi)"), t("Temp C")], vec![n(120.0), n(85.0)]],
        )]);
        let response = respond(Ok(run(&wb, &pump_only())));
        let json = serde_json::to_value(&response).unwrap();
        let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec!["needs_review", "parsed_data", "status", "unmapped_columns", "warnings"]
        );
        assert_eq!(json["status"], "success");
        assert_eq!(json["parsed_data"][0]["confidence"], "high");
        assert_eq!(json["parsed_data"][0]["asset_name"], serde_json::Value::Null);
    }
}
