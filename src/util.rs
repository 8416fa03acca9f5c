// Utility helpers for parsing and numeric formatting.
//
// This module centralizes all the "dirty" CSV/number/date handling so the
// rest of the code can assume clean, typed values, and it is the single
// chokepoint through which every displayed number passes: missing or
// invalid data always degrades to a placeholder string, never a panic.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in CSV exports (commas, spaces, text).
///
/// - Accepts `Option<&str>` so callers can pass through optional fields.
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
    let s = s.replace(",", "");
    s.parse::<f64>().ok()
}

pub fn parse_i32_safe(s: Option<&str>) -> Option<i32> {
    // `?` propagates `None` early if the option is missing.
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<i32>().ok()
}

pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    // Metadata dates are expected in `YYYY-MM-DD` format.
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Round `x` to `figures` significant figures (not decimal places).
///
/// `sig_round(0.0034567, 2)` is `0.0035`; `sig_round(1234.5, 2)` is `1200.0`.
/// Zero and non-finite values pass through unchanged.
pub fn sig_round(x: f64, figures: u32) -> f64 {
    if x == 0.0 || !x.is_finite() {
        return x;
    }
    let magnitude = x.abs().log10().floor();
    let factor = 10f64.powf(figures as f64 - 1.0 - magnitude);
    (x * factor).round() / factor
}

/// Display form of a score: three significant figures, `N/A` when missing.
pub fn sig_format(x: Option<f64>) -> String {
    match x {
        Some(v) if v.is_finite() => format_significant(sig_round(v, 3), 3),
        _ => MISSING_LABEL.to_string(),
    }
}

pub const MISSING_LABEL: &str = "N/A";

/// How a numeric value is rendered by [`format_value`].
#[derive(Debug, Clone, Copy)]
pub enum NumberStyle {
    /// Fixed decimal places with grouped thousands, e.g. `82,300.000`.
    Fixed(usize),
    /// Significant figures, e.g. `77.3` at three figures.
    Significant(u32),
}

/// A reusable display recipe: divide by `scale` first, then render with
/// `style`, wrapped in `prefix`/`suffix`.
#[derive(Debug, Clone, Copy)]
pub struct ValueFormat {
    pub scale: f64,
    pub style: NumberStyle,
    pub prefix: &'static str,
    pub suffix: &'static str,
}

impl ValueFormat {
    pub fn fixed(decimals: usize) -> Self {
        ValueFormat { scale: 1.0, style: NumberStyle::Fixed(decimals), prefix: "", suffix: "" }
    }

    pub fn significant(figures: u32) -> Self {
        ValueFormat { scale: 1.0, style: NumberStyle::Significant(figures), prefix: "", suffix: "" }
    }

    pub fn scaled(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_prefix(mut self, prefix: &'static str) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn with_suffix(mut self, suffix: &'static str) -> Self {
        self.suffix = suffix;
        self
    }
}

/// Render an optional value for display.
///
/// Missing, NaN or infinite inputs (including a zero `scale`) return
/// [`MISSING_LABEL`] rather than failing, so a hole in the data can never
/// break rendering of the rest of a view.
pub fn format_value(value: Option<f64>, fmt: &ValueFormat) -> String {
    let v = match value {
        Some(v) if v.is_finite() && fmt.scale != 0.0 => v / fmt.scale,
        _ => return MISSING_LABEL.to_string(),
    };
    if !v.is_finite() {
        return MISSING_LABEL.to_string();
    }
    let body = match fmt.style {
        NumberStyle::Fixed(decimals) => format_number(v, decimals),
        NumberStyle::Significant(figures) => format_significant(sig_round(v, figures), figures),
    };
    format!("{}{}{}", fmt.prefix, body, fmt.suffix)
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    // First, format to a plain fixed-decimal string like `1234567.89`.
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    // Use `num-format` to insert commas into the integer portion.
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    } else if decimals > 0 {
        res.push('.');
        res.push_str(&"0".repeat(decimals));
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

/// Format an already-rounded value without trailing noise: magnitudes above
/// the figure count print plain (`1200`), small magnitudes keep enough
/// decimals to show all significant figures (`0.0035`).
fn format_significant(x: f64, figures: u32) -> String {
    if x == 0.0 {
        return "0".to_string();
    }
    let magnitude = x.abs().log10().floor() as i32;
    let decimals = (figures as i32 - 1 - magnitude).max(0) as usize;
    format!("{:.*}", decimals, x)
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for integer-like values. This is used
    // for counts in console messages (e.g., `1,413 rows loaded`).
    n.to_formatted_string(&Locale::en)
}
