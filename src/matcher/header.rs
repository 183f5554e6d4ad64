//! Unit annotations inside header labels: `"Steam (T/hr)"`, `"Coal [MT]"`,
//! `"Power Gen MWh"`.

use crate::coerce::units::{UnitDef, find_unit};

/// Split a header label into its unit annotation and the remaining text.
///
/// Bracketed segments are checked first; failing that, a trailing word is
/// taken as a unit when the label has at least two words. A bracketed segment
/// that is not a unit (`"Steam (Boiler 1)"`) stays in the stem.
pub fn split_header_unit(label: &str) -> (Option<&'static UnitDef>, String) {
    for (open, close) in [('(', ')'), ('[', ']')] {
        let mut search_from = 0;
        while let Some(start) = label[search_from..].find(open).map(|i| i + search_from) {
            let Some(len) = label[start + 1..].find(close) else {
                break;
            };
            let end = start + 1 + len;
            if let Some(unit) = find_unit(&label[start + 1..end]) {
                let mut stem = String::with_capacity(label.len());
                stem.push_str(&label[..start]);
                stem.push(' ');
                stem.push_str(&label[end + 1..]);
                return (Some(unit), stem.trim().to_string());
            }
            search_from = end + 1;
        }
    }

    let words: Vec<&str> = label.split_whitespace().collect();
    if let [head @ .., last] = words.as_slice() {
        if !head.is_empty() {
            if let Some(unit) = find_unit(last) {
                return (Some(unit), head.join(" "));
            }
        }
    }
    (None, label.trim().to_string())
}
