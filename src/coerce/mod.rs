//! Value coercion: raw cell -> typed value in the entry's canonical unit.
//!
//! Coercion never fails past this module. Anything that cannot be turned into
//! a complete, typed value comes back as `Coercion::Failed` with the reason
//! the aggregator will attach to the review item.

pub mod units;
pub mod value;

use crate::domain::{CellRecord, ParsedValue, Primitive, ReviewReason, TaxonomyEntry, ValueType, format_number};
use crate::taxonomy::normalize_label;

use self::units::{Dimension, UnitDef, convert, find_unit};
use self::value::{is_null_token, parse_bool_text, split_numeric};

/// Result of coercing one cell against one taxonomy entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Coercion {
    Value {
        value: ParsedValue,
        /// Outside the entry's `valid_range` (value is kept, confidence drops).
        out_of_range: bool,
    },
    Failed(ReviewReason),
}

/// Coerce `cell` to `entry.value_type`.
///
/// `header_unit` is the unit written in the column/row label (e.g. `(psi)`);
/// it applies to cells that carry no unit of their own.
pub fn coerce_cell(entry: &TaxonomyEntry, cell: &CellRecord, header_unit: Option<&'static UnitDef>) -> Coercion {
    if matches!(cell.inferred_primitive, Primitive::FormulaError | Primitive::Blank) {
        return Coercion::Failed(ReviewReason::CoercionFailed);
    }

    let value = match entry.value_type {
        ValueType::Numeric => return coerce_numeric(entry, cell, header_unit),
        ValueType::Boolean => coerce_bool(cell),
        ValueType::Enumerated => coerce_enum(entry, cell),
        ValueType::Text => Some(ParsedValue::Text(cell.raw_text.clone())),
    };

    match value {
        Some(value) => Coercion::Value {
            value,
            out_of_range: false,
        },
        None => Coercion::Failed(ReviewReason::CoercionFailed),
    }
}

/// The unit a numeric cell is expressed in: its own suffix, else the header's.
///
/// Returns `None` when neither says anything (the canonical unit is assumed).
pub fn apparent_unit(cell: &CellRecord, header_unit: Option<&'static UnitDef>) -> Option<&'static UnitDef> {
    if cell.inferred_primitive == Primitive::String {
        if let Some((_, Some(suffix))) = split_numeric(&cell.raw_text) {
            return find_unit(suffix);
        }
    }
    header_unit
}

fn coerce_numeric(entry: &TaxonomyEntry, cell: &CellRecord, header_unit: Option<&'static UnitDef>) -> Coercion {
    let (raw, cell_unit) = match (cell.inferred_primitive, cell.number) {
        (Primitive::Number, Some(n)) => (n, None),
        _ => {
            if is_null_token(&cell.raw_text) {
                return Coercion::Failed(ReviewReason::CoercionFailed);
            }
            let Some((n, suffix)) = split_numeric(&cell.raw_text) else {
                return Coercion::Failed(ReviewReason::CoercionFailed);
            };
            let unit = match suffix {
                Some(s) => match find_unit(s) {
                    Some(u) => Some(u),
                    // "123 ABC" is not a reading with a unit we understand.
                    None => return Coercion::Failed(ReviewReason::CoercionFailed),
                },
                None => None,
            };
            (n, unit)
        }
    };

    let apparent = cell_unit.or(header_unit);
    let canonical = entry.unit.as_deref().and_then(units::unit_by_id);

    let converted = match (apparent, canonical) {
        (Some(from), Some(to)) => match convert(raw, from, to) {
            Some(v) => v,
            None => return Coercion::Failed(ReviewReason::UnitMismatch),
        },
        // A percentage under a dimensionless parameter is a fraction.
        (Some(from), None) if from.dimension == Dimension::Ratio => raw / 100.0,
        _ => raw,
    };

    if !converted.is_finite() {
        return Coercion::Failed(ReviewReason::CoercionFailed);
    }

    let out_of_range = entry.valid_range.is_some_and(|range| !range.contains(converted));
    Coercion::Value {
        value: ParsedValue::Number(converted),
        out_of_range,
    }
}

fn coerce_bool(cell: &CellRecord) -> Option<ParsedValue> {
    match (cell.inferred_primitive, cell.number) {
        (Primitive::Number, Some(n)) if n == 1.0 => Some(ParsedValue::Boolean(true)),
        (Primitive::Number, Some(n)) if n == 0.0 => Some(ParsedValue::Boolean(false)),
        (Primitive::Number, _) => None,
        _ => parse_bool_text(&cell.raw_text).map(ParsedValue::Boolean),
    }
}

fn coerce_enum(entry: &TaxonomyEntry, cell: &CellRecord) -> Option<ParsedValue> {
    let text = match cell.number {
        Some(n) => format_number(n),
        None => cell.raw_text.clone(),
    };
    let wanted = normalize_label(&text);
    if wanted.is_empty() {
        return None;
    }
    entry
        .enum_values
        .iter()
        .find(|v| normalize_label(v) == wanted)
        .map(|v| ParsedValue::Text(v.clone()))
}
