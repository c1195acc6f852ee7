// Utility helpers for numeric coercion, the percentage rule and display
// formatting.
//
// Every "is this cell a number?" decision in the crate goes through
// `coerce_number`, so the rest of the code can treat row fields as plain
// `f64` values that default to zero.
use num_format::{Locale, ToFormattedString};
use serde_json::Value;

/// Pass/fail threshold used when the catalog does not configure one.
pub const DEFAULT_THRESHOLD: f64 = 80.0;

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in spreadsheet exports.
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Coerce a loosely-typed JSON cell into a number.
///
/// Numbers pass through, numeric strings are parsed with `parse_f64_safe`,
/// and anything else (null, bool, arrays, garbage text) becomes `None`.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_f64_safe(Some(s)),
        _ => None,
    }
}

/// Render a scalar JSON cell as trimmed text. Empty strings and
/// non-scalar values yield `None`.
pub fn coerce_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Loose truthiness for spreadsheet flags: `true`, `"true"`, `"yes"`,
/// `"1"` and any non-zero number count as set.
pub fn coerce_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "y" | "1"
        ),
        _ => false,
    }
}

/// `result / target * 100`, or 0 when there is no positive target.
pub fn percentage(target: f64, result: f64) -> f64 {
    if target > 0.0 {
        (result / target) * 100.0
    } else {
        0.0
    }
}

/// Percentage as it is displayed: rounded to two decimals.
pub fn display_percentage(pct: f64) -> f64 {
    format!("{pct:.2}").parse().unwrap_or(pct)
}

/// Pass/fail judgment on the displayed value, so a total shown as `80.00`
/// never fails an 80 threshold.
pub fn meets_threshold(pct: f64, threshold: f64) -> bool {
    display_percentage(pct) >= threshold
}

/// Fixed decimals with `en` thousands separators, e.g. `1,234,567.89`.
pub fn format_number(n: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, n.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (fixed.as_str(), None),
    };
    let grouped = int_part
        .parse::<u64>()
        .map(|v| v.to_formatted_string(&Locale::en))
        .unwrap_or_else(|_| int_part.to_string());
    // no sign when the value rounds to zero
    let sign = if n < 0.0 && fixed.bytes().any(|b| matches!(b, b'1'..=b'9')) {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Integer counts for console messages.
pub fn format_int<T: ToFormattedString>(n: T) -> String {
    n.to_formatted_string(&Locale::en)
}

/// Counts are carried as `f64`; print them without a fractional part when
/// they are whole.
pub fn format_count(n: f64) -> String {
    if n.fract() == 0.0 {
        format_number(n, 0)
    } else {
        format_number(n, 2)
    }
}
