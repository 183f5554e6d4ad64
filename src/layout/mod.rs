//! Layout classification: which lanes are headers, which carry asset labels,
//! and which cells are values.
//!
//! Both orientations are tried on a `View` of the grid:
//!
//! - row-oriented: one header row of parameters, later rows are assets
//! - column-oriented: the mirror image
//! - single-block: a column-oriented sheet with a single value column
//!
//! The orientation producing more (label, value) pairs wins. On a tie the
//! header whose labels read more like parameter names (more words per label,
//! as opposed to asset codes such as `AFBC-1`) wins, then rows.
//! A sheet where neither works yields a `no_layout_detected` warning and no
//! candidates. Iteration is always major lane first, then minor, so the same
//! grid always produces the same candidate order.

pub mod lanes;

use std::collections::HashSet;

use tracing::debug;

use crate::domain::{Candidate, ParseConfig, Warning, WarningCode};
use crate::io::ingest::SheetGrid;
use crate::matcher::split_header_unit;
use crate::taxonomy::{Taxonomy, normalize_label, tokens};

pub use lanes::*;

/// Words that make a header cell an asset/entity label lane.
const ENTITY_WORDS: &[&str] = &["asset", "equipment", "machine", "unit", "plant", "station", "section", "area", "line"];

/// Words that may accompany an entity word ("Asset Name", "Equipment ID").
const ENTITY_QUALIFIERS: &[&str] = &["name", "id", "no", "number", "tag", "code"];

/// Lane labels that name a column of values rather than an asset.
const GENERIC_LABELS: &[&str] = &[
    "value",
    "values",
    "reading",
    "readings",
    "data",
    "parameter",
    "parameters",
    "param",
    "description",
    "item",
    "field",
    "name",
    "total",
    "amount",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Rows,
    Columns,
    SingleBlock,
}

impl Orientation {
    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Rows => "rows",
            Orientation::Columns => "columns",
            Orientation::SingleBlock => "single-block",
        }
    }
}

/// What the classifier found on one sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetLayout {
    pub orientation: Option<Orientation>,
    /// 0-based absolute index of the header row (or column).
    pub header_lane: Option<usize>,
    pub candidates: Vec<Candidate>,
    pub warnings: Vec<Warning>,
}

impl SheetLayout {
    fn undetected(sheet_name: &str, message: &str) -> Self {
        Self {
            orientation: None,
            header_lane: None,
            candidates: Vec::new(),
            warnings: vec![Warning::new(sheet_name, WarningCode::NoLayoutDetected, message)],
        }
    }
}

/// A fully worked-out reading of the sheet along one axis.
struct Plan {
    axis: Axis,
    header: usize,
    candidates: Vec<Candidate>,
    warnings: Vec<Warning>,
    value_lanes: usize,
    /// Mean count of alphabetic tokens per parameter label.
    label_words: f64,
}

/// Classify one sheet. Never fails: ambiguity becomes a warning.
///
/// The taxonomy is consulted only to keep a lane headed by a registered
/// alias from being read as a lane of asset labels.
pub fn classify_sheet(grid: &SheetGrid, taxonomy: &Taxonomy, config: &ParseConfig) -> SheetLayout {
    if grid.is_empty() {
        return SheetLayout::undetected(&grid.name, "Sheet has no populated cells.");
    }

    let by_rows = plan(View::new(grid, Axis::Rows), taxonomy, config.scan_limit);
    let by_cols = plan(View::new(grid, Axis::Columns), taxonomy, config.scan_limit);

    let chosen = match (by_rows, by_cols) {
        (None, None) => {
            debug!(sheet = %grid.name, "no header lane found");
            return SheetLayout::undetected(
                &grid.name,
                "Could not find a header row or column followed by values.",
            );
        }
        (Some(r), None) => r,
        (None, Some(c)) => c,
        (Some(r), Some(c)) => {
            let (nr, nc) = (r.candidates.len(), c.candidates.len());
            if nc > nr || (nc == nr && c.label_words > r.label_words) {
                c
            } else {
                r
            }
        }
    };

    let orientation = match chosen.axis {
        Axis::Rows => Orientation::Rows,
        Axis::Columns if chosen.value_lanes == 1 => Orientation::SingleBlock,
        Axis::Columns => Orientation::Columns,
    };

    debug!(
        sheet = %grid.name,
        orientation = orientation.as_str(),
        header = chosen.header,
        candidates = chosen.candidates.len(),
        "layout classified"
    );

    SheetLayout {
        orientation: Some(orientation),
        header_lane: Some(View::new(grid, chosen.axis).absolute(chosen.header)),
        candidates: chosen.candidates,
        warnings: chosen.warnings,
    }
}

/// First-best header lane within `scan_limit` lanes.
///
/// A lane qualifies when it has at least two populated cells, most of them
/// labels, and the next populated lane is mostly value-like. The lane with
/// the most labels wins; ties keep the earliest.
fn find_header(view: View<'_>, scan_limit: usize) -> Option<usize> {
    let majors = view.majors();
    let mut best: Option<(usize, usize)> = None;

    for major in 0..majors.min(scan_limit) {
        let profile = view.profile(major);
        if profile.non_blank < 2 || !profile.mostly_labels() {
            continue;
        }
        let Some(next) = (major + 1..majors).find(|&m| view.profile(m).non_blank > 0) else {
            continue;
        };
        if !view.profile(next).mostly_values() {
            continue;
        }
        if best.is_none_or(|(_, labels)| profile.labels > labels) {
            best = Some((major, profile.labels));
        }
    }
    best.map(|(major, _)| major)
}

fn plan(view: View<'_>, taxonomy: &Taxonomy, scan_limit: usize) -> Option<Plan> {
    let header = find_header(view, scan_limit)?;
    let sheet = view.grid.name.as_str();

    let label_minors: Vec<usize> = (0..view.minors())
        .filter(|&k| view.populated(header, k).is_some_and(is_label))
        .collect();
    let data_majors: Vec<usize> = (header + 1..view.majors())
        .filter(|&m| view.profile(m).non_blank > 0)
        .collect();

    let entity_minors = entity_lanes(view, taxonomy, header, &label_minors, &data_majors);

    let mut candidates = Vec::new();
    let mut value_lanes = 0;
    for &major in &data_majors {
        let before = candidates.len();
        for &minor in &label_minors {
            if entity_minors.contains(&minor) {
                continue;
            }
            let (Some(label), Some(value)) = (view.cell(header, minor), view.populated(major, minor)) else {
                continue;
            };
            candidates.push(Candidate {
                sheet_name: sheet.to_string(),
                asset_name: lane_asset(view, major, minor, &entity_minors),
                param_label: label.raw_text.clone(),
                value_cell: value.clone(),
                lane: minor,
            });
        }
        if candidates.len() > before {
            value_lanes += 1;
        }
    }

    if candidates.is_empty() {
        return None;
    }

    let param_minors: Vec<usize> = label_minors
        .iter()
        .copied()
        .filter(|k| !entity_minors.contains(k))
        .collect();
    let words: usize = param_minors
        .iter()
        .filter_map(|&k| view.cell(header, k))
        .map(|c| alphabetic_words(&c.raw_text))
        .sum();
    let label_words = words as f64 / param_minors.len().max(1) as f64;

    let mut warnings = Vec::new();
    if let Some(w) = title_warning(view, header) {
        warnings.push(w);
    }
    warnings.extend(duplicate_label_warnings(view, header, &label_minors, &entity_minors));

    Some(Plan {
        axis: view.axis,
        header,
        candidates,
        warnings,
        value_lanes,
        label_words,
    })
}

fn alphabetic_words(label: &str) -> usize {
    tokens(label)
        .iter()
        .filter(|t| t.chars().all(char::is_alphabetic))
        .count()
}

/// Minor positions holding asset labels rather than parameters.
///
/// Either the header names an entity ("Asset", "Unit Name"), or the lane is
/// the first populated one in the data region, holds mostly labels, and its
/// header is not a registered parameter alias.
fn entity_lanes(
    view: View<'_>,
    taxonomy: &Taxonomy,
    header: usize,
    label_minors: &[usize],
    data_majors: &[usize],
) -> Vec<usize> {
    let mut out: Vec<usize> = label_minors
        .iter()
        .copied()
        .filter(|&k| view.cell(header, k).is_some_and(|c| is_entity_header(&c.raw_text)))
        .collect();

    let first_populated = (0..view.minors()).find(|&k| data_majors.iter().any(|&m| view.populated(m, k).is_some()));
    if let Some(k) = first_populated {
        let registered = view
            .populated(header, k)
            .is_some_and(|c| is_registered_label(taxonomy, &c.raw_text));
        if !out.contains(&k) && !registered && view.cross_profile(k, data_majors).mostly_labels() {
            out.push(k);
        }
    }
    out.sort_unstable();
    out
}

/// The label, with or without its unit annotation, is an exact alias.
fn is_registered_label(taxonomy: &Taxonomy, text: &str) -> bool {
    let (_, stem) = split_header_unit(text);
    taxonomy.exact(&normalize_label(text)).is_some() || taxonomy.exact(&normalize_label(&stem)).is_some()
}

fn is_entity_header(text: &str) -> bool {
    let toks = tokens(text);
    toks.iter().any(|t| ENTITY_WORDS.contains(&t.as_str()))
        && toks
            .iter()
            .all(|t| ENTITY_WORDS.contains(&t.as_str()) || ENTITY_QUALIFIERS.contains(&t.as_str()))
}

/// Asset label for a value cell: the nearest preceding entity lane's label.
fn lane_asset(view: View<'_>, major: usize, minor: usize, entity_minors: &[usize]) -> Option<String> {
    let nearest = entity_minors.iter().rev().find(|&&e| e < minor)?;
    let cell = view.populated(major, *nearest).filter(|c| is_label(c))?;
    let normalized = normalize_label(&cell.raw_text);
    if normalized.is_empty() || GENERIC_LABELS.contains(&normalized.as_str()) {
        return None;
    }
    Some(cell.raw_text.clone())
}

fn title_warning(view: View<'_>, header: usize) -> Option<Warning> {
    let skipped = (0..header).filter(|&m| view.profile(m).non_blank > 0).count();
    if skipped == 0 {
        return None;
    }
    let noun = match view.axis {
        Axis::Rows => "row",
        Axis::Columns => "column",
    };
    Some(Warning::new(
        &view.grid.name,
        WarningCode::TitleRowsSkipped,
        format!(
            "Skipped {skipped} title/metadata {noun}(s) before the header {noun} {}.",
            view.absolute(header) + 1
        ),
    ))
}

fn duplicate_label_warnings(
    view: View<'_>,
    header: usize,
    label_minors: &[usize],
    entity_minors: &[usize],
) -> Vec<Warning> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut out = Vec::new();
    for &k in label_minors {
        if entity_minors.contains(&k) {
            continue;
        }
        let Some(cell) = view.cell(header, k) else {
            continue;
        };
        let normalized = normalize_label(&cell.raw_text);
        if !seen.insert(normalized.clone()) && reported.insert(normalized) {
            out.push(Warning::new(
                &view.grid.name,
                WarningCode::DuplicateLabel,
                format!("Label '{}' appears more than once in the header.", cell.raw_text),
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ingest::RawValue;

    fn t(s: &str) -> RawValue {
        RawValue::Text(s.to_string())
    }

    fn n(v: f64) -> RawValue {
        RawValue::Number(v)
    }

    fn classify(rows: Vec<Vec<RawValue>>) -> SheetLayout {
        let taxonomy = Taxonomy::builtin().unwrap();
        classify_sheet(&SheetGrid::from_raw("Sheet1", rows), &taxonomy, &ParseConfig::default())
    }

    fn labels(layout: &SheetLayout) -> Vec<&str> {
        layout.candidates.iter().map(|c| c.param_label.as_str()).collect()
    }

    #[test]
    fn header_row_with_one_data_row() {
        let layout = classify(vec![vec![t("Pump Pressure (psi)"), t("Temp C")], vec![n(120.0), n(85.0)]]);
        assert_eq!(layout.orientation, Some(Orientation::Rows));
        assert_eq!(labels(&layout), vec!["Pump Pressure (psi)", "Temp C"]);
        assert!(layout.candidates.iter().all(|c| c.asset_name.is_none()));
        assert!(layout.warnings.is_empty());
    }

    #[test]
    fn empty_sheet_is_undetected() {
        let layout = classify(vec![]);
        assert_eq!(layout.orientation, None);
        assert!(layout.candidates.is_empty());
        assert_eq!(layout.warnings.len(), 1);
        assert_eq!(layout.warnings[0].code, WarningCode::NoLayoutDetected);
    }

    #[test]
    fn prose_only_sheet_is_undetected() {
        let layout = classify(vec![
            vec![t("These readings were taken by the night shift")],
            vec![t("Please see the attached maintenance log for details")],
        ]);
        assert!(layout.candidates.is_empty());
        assert_eq!(layout.warnings[0].code, WarningCode::NoLayoutDetected);
    }

    #[test]
    fn title_rows_above_header_are_skipped() {
        let layout = classify(vec![
            vec![t("Monthly Operations Report - ACME Corp")],
            vec![],
            vec![t("Date"), t("Coal Used (MT)"), t("Steam (T/hr)"), t("Pwr Gen")],
            vec![t("2023-10-01"), t("1,234.56"), t("45%"), t("YES")],
            vec![t("2023-10-02"), t("1,190.00"), t("N/A"), t("NO")],
        ]);
        assert_eq!(layout.orientation, Some(Orientation::Rows));
        assert_eq!(layout.header_lane, Some(2));
        assert_eq!(layout.candidates.len(), 8);
        assert_eq!(layout.candidates[1].value_cell.raw_text, "1,234.56");
        assert!(layout.warnings.iter().any(|w| w.code == WarningCode::TitleRowsSkipped));
    }

    #[test]
    fn header_position_is_absolute_when_the_sheet_starts_late() {
        let grid = SheetGrid::from_raw_at(
            "Late",
            (4, 2),
            vec![
                vec![t("Weekly summary")],
                vec![t("Coal Consumption"), t("Steam Generation")],
                vec![n(500.0), n(20.0)],
            ],
        );
        let layout = classify_sheet(&grid, &Taxonomy::builtin().unwrap(), &ParseConfig::default());
        assert_eq!(layout.header_lane, Some(5));
        let first = &layout.candidates[0].value_cell;
        assert_eq!((first.row, first.column), (6, 2));
        let title = layout
            .warnings
            .iter()
            .find(|w| w.code == WarningCode::TitleRowsSkipped)
            .unwrap();
        assert!(title.message.contains("header row 6"), "{}", title.message);
    }

    #[test]
    fn asset_column_labels_each_row() {
        let layout = classify(vec![
            vec![t("Asset"), t("Coal Consumption"), t("Steam Generation")],
            vec![t("AFBC-1"), n(500.0), n(20.0)],
            vec![t("AFBC-2"), n(480.0), n(19.5)],
        ]);
        assert_eq!(layout.orientation, Some(Orientation::Rows));
        assert_eq!(layout.candidates.len(), 4);
        assert_eq!(layout.candidates[0].asset_name.as_deref(), Some("AFBC-1"));
        assert_eq!(layout.candidates[3].asset_name.as_deref(), Some("AFBC-2"));
        assert!(labels(&layout).iter().all(|l| *l != "Asset"));
    }

    #[test]
    fn parameter_value_block_is_single_block() {
        let layout = classify(vec![
            vec![t("Parameter"), t("Value")],
            vec![t("Coal Consumption"), n(1200.0)],
            vec![t("Steam Generation"), n(45.0)],
            vec![t("Power Generation"), n(350.0)],
            vec![t("Status"), t("running")],
        ]);
        assert_eq!(layout.orientation, Some(Orientation::SingleBlock));
        assert_eq!(
            labels(&layout),
            vec!["Coal Consumption", "Steam Generation", "Power Generation", "Status"]
        );
        assert!(layout.candidates.iter().all(|c| c.asset_name.is_none()));
    }

    #[test]
    fn header_column_with_asset_row() {
        let layout = classify(vec![
            vec![t("Equipment"), t("AFBC-1"), t("AFBC-2"), t("TG-1")],
            vec![t("Coal Consumption Today"), n(500.0), n(510.0), t("-")],
            vec![t("Steam Generation Today"), n(20.0), n(21.0), t("-")],
            vec![t("Power Generation Today"), t("-"), t("-"), n(350.0)],
        ]);
        assert_eq!(layout.orientation, Some(Orientation::Columns));
        let first = &layout.candidates[0];
        assert_eq!(first.param_label, "Coal Consumption Today");
        assert_eq!(first.asset_name.as_deref(), Some("AFBC-1"));
        assert_eq!(layout.candidates.len(), 9);
    }

    #[test]
    fn duplicate_labels_are_warned_once() {
        let layout = classify(vec![
            vec![t("Steam"), t("steam"), t("STEAM")],
            vec![n(1.0), n(2.0), n(3.0)],
        ]);
        let dups = layout
            .warnings
            .iter()
            .filter(|w| w.code == WarningCode::DuplicateLabel)
            .count();
        assert_eq!(dups, 1);
        assert_eq!(layout.candidates.len(), 3);
    }

    #[test]
    fn candidate_order_is_stable() {
        let rows = vec![
            vec![t("A"), t("B")],
            vec![n(1.0), n(2.0)],
            vec![n(3.0), n(4.0)],
        ];
        let a = classify(rows.clone());
        let b = classify(rows);
        assert_eq!(a, b);
        let coords: Vec<(usize, usize)> = a
            .candidates
            .iter()
            .map(|c| (c.value_cell.row, c.value_cell.column))
            .collect();
        assert_eq!(coords, vec![(1, 0), (1, 1), (2, 0), (2, 1)]);
    }

    #[test]
    fn text_lane_under_a_registered_alias_stays_a_parameter() {
        let layout = classify(vec![
            vec![t("Status"), t("Coal Consumption")],
            vec![t("running"), n(500.0)],
            vec![t("stopped"), n(480.0)],
        ]);
        assert_eq!(layout.orientation, Some(Orientation::Rows));
        assert_eq!(
            labels(&layout),
            vec!["Status", "Coal Consumption", "Status", "Coal Consumption"]
        );
        assert!(layout.candidates.iter().all(|c| c.asset_name.is_none()));
    }

    #[test]
    fn unregistered_text_lane_still_labels_assets() {
        let layout = classify(vec![
            vec![t("Boiler"), t("Coal Consumption")],
            vec![t("AFBC-1"), n(500.0)],
            vec![t("AFBC-2"), n(480.0)],
        ]);
        assert_eq!(labels(&layout), vec!["Coal Consumption", "Coal Consumption"]);
        assert_eq!(layout.candidates[1].asset_name.as_deref(), Some("AFBC-2"));
    }

    #[test]
    fn entity_headers() {
        assert!(is_entity_header("Asset"));
        assert!(is_entity_header("Unit Name"));
        assert!(is_entity_header("Equipment ID"));
        assert!(!is_entity_header("Unit Status"));
        assert!(!is_entity_header("Coal Consumption"));
    }
}
