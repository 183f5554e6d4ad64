//! Formatted terminal output for parse results and the taxonomy listing.
//!
//! We keep formatting code in one place so:
//! - the engine stays free of presentation concerns
//! - output changes are localized

use crate::coerce::units::unit_by_id;
use crate::domain::{ParseResult, ParseStatus, ReviewItem, ValidRange, format_number};
use crate::taxonomy::Taxonomy;

/// Format the full parse summary (counts, parsed points, review items, unmapped labels, warnings).
pub fn format_parse_summary(filename: &str, result: &ParseResult) -> String {
    let mut out = String::new();

    out.push_str("=== opsheet - Operational Sheet Parse ===\n");
    out.push_str(&format!("File: {filename}\n"));
    out.push_str(&format!(
        "Status: {}\n",
        match result.status {
            ParseStatus::Success => "success",
            ParseStatus::Partial => "partial",
        }
    ));
    out.push_str(&format!(
        "Parsed: {} | Needs review: {} | Unmapped: {} | Warnings: {}\n",
        result.parsed_data.len(),
        result.needs_review.len(),
        result.unmapped_columns.len(),
        result.warnings.len()
    ));

    if !result.parsed_data.is_empty() {
        out.push_str("\nParsed data:\n");
        push_row(&mut out, ["sheet", "asset", "parameter", "raw", "value", "conf"]);
        push_rule(&mut out);
        for p in &result.parsed_data {
            push_row(
                &mut out,
                [
                    &truncate(&p.sheet_name, 16),
                    &truncate(p.asset_name.as_deref().unwrap_or("-"), 14),
                    &truncate(&p.param_name, 28),
                    &truncate(&p.raw_value, 14),
                    &truncate(&p.parsed_value.display(), 14),
                    p.confidence.as_str(),
                ],
            );
        }
    }

    if !result.needs_review.is_empty() {
        out.push_str("\nNeeds review:\n");
        push_row(&mut out, ["sheet", "asset", "parameter", "raw", "value", "reason"]);
        push_rule(&mut out);
        for r in &result.needs_review {
            push_row(
                &mut out,
                [
                    &truncate(&r.sheet_name, 16),
                    &truncate(r.asset_name.as_deref().unwrap_or("-"), 14),
                    &truncate(&r.param_name, 28),
                    &truncate(&r.raw_value, 14),
                    &truncate(&review_value(r), 14),
                    r.reason.map_or("-", |reason| reason.as_str()),
                ],
            );
        }
    }

    if !result.unmapped_columns.is_empty() {
        out.push_str("\nUnmapped labels:\n");
        for u in &result.unmapped_columns {
            out.push_str(&format!(
                "- [{}] {} (samples: {})\n",
                u.sheet_name,
                u.raw_label,
                u.sample_values.join(", ")
            ));
        }
    }

    if !result.warnings.is_empty() {
        out.push_str("\nWarnings:\n");
        for w in &result.warnings {
            out.push_str(&format!("- [{}] {}: {}\n", w.sheet_name, w.code.as_str(), w.message));
        }
    }

    out
}

/// Format the registry: parameters first, then assets.
pub fn format_taxonomy(taxonomy: &Taxonomy) -> String {
    let mut out = String::new();

    out.push_str(&format!("Parameters ({}):\n", taxonomy.entries().len()));
    out.push_str(
        format!(
            "{:<34} {:<28} {:<11} {:<8} {:<16} {}\n",
            "key", "name", "type", "unit", "range", "aliases"
        )
        .trim_end(),
    );
    out.push('\n');
    for e in taxonomy.entries() {
        let unit = e
            .unit
            .as_deref()
            .and_then(unit_by_id)
            .map_or("-", |u| u.id);
        let mut aliases: Vec<&str> = e.aliases.iter().map(String::as_str).collect();
        if !e.enum_values.is_empty() {
            aliases.push("|");
            aliases.extend(e.enum_values.iter().map(String::as_str));
        }
        out.push_str(
            format!(
                "{:<34} {:<28} {:<11} {:<8} {:<16} {}\n",
                truncate(&e.key, 34),
                truncate(taxonomy.display_name(e), 28),
                e.value_type.label(),
                unit,
                fmt_range(e.valid_range),
                aliases.join(", ")
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out.push_str(&format!("\nAssets ({}):\n", taxonomy.assets().len()));
    for a in taxonomy.assets() {
        let aliases: Vec<&str> = a.aliases.iter().map(String::as_str).collect();
        out.push_str(&format!(
            "- {} ({}, {}): {}\n",
            a.name,
            a.display_name,
            a.asset_type.as_deref().unwrap_or("-"),
            aliases.join(", ")
        ));
    }

    out
}

fn push_row(out: &mut String, cols: [&str; 6]) {
    out.push_str(
        format!(
            "{:<16} {:<14} {:<28} {:>14} {:>14} {:<10}\n",
            cols[0], cols[1], cols[2], cols[3], cols[4], cols[5]
        )
        .trim_end(),
    );
    out.push('\n');
}

fn push_rule(out: &mut String) {
    out.push_str(
        format!(
            "{:-<16} {:-<14} {:-<28} {:-<14} {:-<14} {:-<10}\n",
            "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');
}

fn review_value(r: &ReviewItem) -> String {
    r.parsed_value.as_ref().map_or_else(|| "null".to_string(), |v| v.display())
}

fn fmt_range(range: Option<ValidRange>) -> String {
    let Some(range) = range else {
        return "-".to_string();
    };
    let bound = |b: Option<f64>| b.map_or_else(String::new, format_number);
    format!("[{}, {}]", bound(range.min), bound(range.max))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
