//! Raw cell text helpers shared by the coercer and the layout classifier.

use chrono::{NaiveDate, NaiveDateTime};

/// Spellings that mean "no reading" rather than a value.
const NULL_TOKENS: &[&str] = &["", "n/a", "na", "n.a.", "null", "none", "nil", "-", "--", "---", "?"];

const TRUE_TOKENS: &[&str] = &["yes", "y", "true", "on", "1", "tripped"];
const FALSE_TOKENS: &[&str] = &["no", "n", "false", "off", "0"];

pub fn is_null_token(text: &str) -> bool {
    let t = text.trim().to_lowercase();
    NULL_TOKENS.contains(&t.as_str())
}

/// Parse a boolean spelling.
pub fn parse_bool_text(text: &str) -> Option<bool> {
    let t = text.trim().to_lowercase();
    if TRUE_TOKENS.contains(&t.as_str()) {
        Some(true)
    } else if FALSE_TOKENS.contains(&t.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Split numeric text into its value and an optional trailing unit suffix.
///
/// Accepts thousands separators and surrounding whitespace:
/// `"1,234.56"` -> `(1234.56, None)`, `"45%"` -> `(45.0, Some("%"))`,
/// `"12.5 bar"` -> `(12.5, Some("bar"))`. Text that does not start with a
/// number (`"N/A"`, `"approx 5"`) yields `None`.
pub fn split_numeric(text: &str) -> Option<(f64, Option<&str>)> {
    let t = text.trim();
    let end = t
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == ',' || c == '.' || ((c == '-' || c == '+') && i == 0)))
        .map_or(t.len(), |(i, _)| i);

    let number_part = &t[..end];
    if !number_part.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    if !thousands_separators_ok(number_part) {
        return None;
    }
    let value: f64 = number_part.replace(',', "").parse().ok()?;
    if !value.is_finite() {
        return None;
    }

    let suffix = t[end..].trim();
    Some((value, if suffix.is_empty() { None } else { Some(suffix) }))
}

/// Does the text look like a plain number (optionally with a unit)?
pub fn looks_numeric(text: &str) -> bool {
    split_numeric(text).is_some()
}

/// Dates the way plant logs tend to write them.
pub fn looks_like_date(text: &str) -> bool {
    const DATE_FMTS: [&str; 6] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d", "%m/%d/%Y", "%d-%b-%Y"];
    const DATETIME_FMTS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

    let t = text.trim();
    DATE_FMTS.iter().any(|fmt| NaiveDate::parse_from_str(t, fmt).is_ok())
        || DATETIME_FMTS.iter().any(|fmt| NaiveDateTime::parse_from_str(t, fmt).is_ok())
}

fn thousands_separators_ok(number_part: &str) -> bool {
    if !number_part.contains(',') {
        return true;
    }
    let unsigned = number_part.trim_start_matches(['-', '+']);
    let int_part = unsigned.split('.').next().unwrap_or("");
    let groups: Vec<&str> = int_part.split(',').collect();
    groups.first().is_some_and(|g| !g.is_empty() && g.len() <= 3)
        && groups.iter().skip(1).all(|g| g.len() == 3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_with_separators_and_units() {
        assert_eq!(split_numeric("1,234.56"), Some((1234.56, None)));
        assert_eq!(split_numeric("1,000,000"), Some((1_000_000.0, None)));
        assert_eq!(split_numeric(" 89.0 "), Some((89.0, None)));
        assert_eq!(split_numeric("45%"), Some((45.0, Some("%"))));
        assert_eq!(split_numeric("12.5 bar"), Some((12.5, Some("bar"))));
        assert_eq!(split_numeric("-500"), Some((-500.0, None)));
    }

    #[test]
    fn non_numbers_are_rejected() {
        assert_eq!(split_numeric("N/A"), None);
        assert_eq!(split_numeric("Some random text"), None);
        assert_eq!(split_numeric("-"), None);
        assert_eq!(split_numeric("12,34"), None);
        assert_eq!(split_numeric("1.2.3"), None);
    }

    #[test]
    fn null_and_bool_tokens() {
        for t in ["", " ", "N/A", "-", "NULL", "NONE"] {
            assert!(is_null_token(t), "{t:?}");
        }
        assert_eq!(parse_bool_text("YES"), Some(true));
        assert_eq!(parse_bool_text("False"), Some(false));
        assert_eq!(parse_bool_text("maybe"), None);
    }

    #[test]
    fn dates_are_recognised() {
        assert!(looks_like_date("2023-10-01"));
        assert!(looks_like_date("01/10/2023"));
        assert!(!looks_like_date("AFBC-1"));
        assert!(!looks_like_date("1200"));
    }
}
