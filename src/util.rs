// Utility helpers for parsing and formatting.
//
// This module centralizes all the "dirty" CSV/number/text handling so the
// rest of the code can assume clean, typed values.
use num_format::{Locale, ToFormattedString};

/// Drop a leading UTF-8 byte-order mark.
///
/// Some open-data exports prefix the very first header cell with a BOM,
/// which would otherwise defeat header-name lookups.
pub fn strip_bom(s: &str) -> &str {
    s.strip_prefix('\u{feff}').unwrap_or(s)
}

/// Parse a CSV field into `f64` while being forgiving about formatting
/// issues that are common in these exports.
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters (`"n.d."`, `"NR"`).
/// - Accepts a French decimal comma (`"12,5"`).
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', ".");
    s.parse::<f64>().ok()
}

/// Parse a CSV field into `i64`, ignoring grouping spaces (`"1 234"`,
/// including the narrow no-break space some exports use).
pub fn parse_i64_safe(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let s: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    s.parse::<i64>().ok()
}

/// Left-pad a code with zeros to the given width (`"44"` → `"044"`).
///
/// Works on strings, not numbers: Corsican department codes like `"2A"`
/// must pad to `"02A"`.
pub fn pad_code(code: &str, width: usize) -> String {
    format!("{:0>width$}", code)
}

/// Capitalize the first letter of every alphabetic run and lowercase the
/// rest, so `"COLLEGE JULES-VERNE"` becomes `"College Jules-Verne"`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// Round to a fixed number of decimal places.
pub fn round_to(v: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (v * factor).round() / factor
}

pub fn average(v: &[f64]) -> f64 {
    // Standard arithmetic mean; returns 0 for an empty slice to avoid NaNs.
    // Callers that must distinguish "empty" from "zero" check emptiness
    // before calling.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places (French decimal comma), and
    // - locale-aware thousands separators (e.g., `1 234 567,89`).
    let neg = n.is_sign_negative();
    let abs_n = n.abs();
    // First, format to a plain fixed-decimal string like `1234567.89`.
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    // Use `num-format` to insert separators into the integer portion.
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::fr);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push(',');
            res.push_str(frac);
        }
    } else if decimals > 0 {
        res.push(',');
        res.push_str(&"0".repeat(decimals));
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for integer-like values, used for
    // row counts in console messages (e.g., `9 855 lignes lues`).
    n.to_formatted_string(&Locale::fr)
}
