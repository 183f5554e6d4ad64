//! Label normalization shared by the registry and the matcher.
//!
//! A label is lower-cased, split on every non-alphanumeric character and on
//! letter/digit boundaries, and each token is passed through a small
//! abbreviation table. The result is a single-space-joined token string, so
//! `"Pwr. Gen (MWh)"`, `"power  generation mwh"` and `"PWR-GEN MWH"` all
//! normalize to `"power generation megawatt hour"`.

/// Token-level expansions. An empty replacement drops the token.
const ABBREVIATIONS: &[(&str, &str)] = &[
    // parameter vocabulary
    ("temp", "temperature"),
    ("tmp", "temperature"),
    ("pwr", "power"),
    ("gen", "generation"),
    ("genr", "generation"),
    ("consump", "consumption"),
    ("cons", "consumption"),
    ("consumed", "consumption"),
    ("stm", "steam"),
    ("press", "pressure"),
    ("pres", "pressure"),
    ("fw", "feed water"),
    ("feedwater", "feed water"),
    ("flw", "flow"),
    ("aux", "auxiliary"),
    ("avg", "average"),
    ("eff", "efficiency"),
    ("qty", "quantity"),
    ("plf", "plant load factor"),
    ("apc", "auxiliary power consumption"),
    ("curr", "current"),
    // units
    ("hr", "hour"),
    ("hrs", "hour"),
    ("h", "hour"),
    ("tph", "tonne per hour"),
    ("t", "tonne"),
    ("mt", "tonne"),
    ("ton", "tonne"),
    ("tons", "tonne"),
    ("tonnes", "tonne"),
    ("kgs", "kg"),
    ("degc", "celsius"),
    ("c", "celsius"),
    ("degf", "fahrenheit"),
    ("f", "fahrenheit"),
    ("deg", ""),
    ("psig", "psi"),
    ("mwh", "megawatt hour"),
    ("kwh", "kilowatt hour"),
    ("gwh", "gigawatt hour"),
    ("mw", "megawatt"),
    ("kw", "kilowatt"),
    ("amp", "ampere"),
    ("amps", "ampere"),
    ("pct", "percent"),
];

/// Split a label into normalized, abbreviation-expanded tokens.
pub fn tokens(label: &str) -> Vec<String> {
    let lower = label.to_lowercase();
    let mut out = Vec::new();
    for raw in split_raw(&lower) {
        match ABBREVIATIONS.iter().find(|(abbr, _)| *abbr == raw) {
            Some((_, expansion)) => {
                out.extend(expansion.split_whitespace().map(str::to_string));
            }
            None => out.push(raw),
        }
    }
    out
}

/// Normalize a label for alias comparison.
pub fn normalize_label(label: &str) -> String {
    tokens(label).join(" ")
}

/// Split on non-alphanumerics and on letter/digit transitions.
fn split_raw(lower: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut prev_digit: Option<bool> = None;

    for ch in lower.chars() {
        if !ch.is_alphanumeric() {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            prev_digit = None;
            continue;
        }
        let is_digit = ch.is_numeric();
        if prev_digit.is_some_and(|p| p != is_digit) && !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
        current.push(ch);
        prev_digit = Some(is_digit);
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}
