// Utility helpers for parsing and formatting.
//
// All the "dirty" CSV number handling lives here so the aggregation code can
// assume clean, finite values.
use num_format::{Locale, ToFormattedString};

/// Substituted for any composite score that is missing, non-numeric or not
/// strictly positive.
pub const COMPOSITE_FALLBACK: f64 = 5.0;

/// Parse a CSV field into a finite `f64`.
///
/// Trims whitespace and returns `None` for empty, unparseable, `NaN` or
/// infinite values.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Dimension score for a raw field: anything unusable becomes 0.
pub fn score_or_zero(s: Option<&str>) -> f64 {
    parse_f64_safe(s).unwrap_or(0.0)
}

/// Composite score for a raw field, replacing invalid values with
/// [`COMPOSITE_FALLBACK`].
pub fn composite_or_fallback(s: Option<&str>) -> f64 {
    validate_composite(parse_f64_safe(s).unwrap_or(COMPOSITE_FALLBACK))
}

/// Composite scores must be positive and finite.
pub fn validate_composite(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        COMPOSITE_FALLBACK
    }
}

/// Trimmed text field, empty when absent.
pub fn text_or_empty(s: Option<String>) -> String {
    s.map(|v| v.trim().to_string()).unwrap_or_default()
}

pub fn average(v: &[f64]) -> f64 {
    // Arithmetic mean; 0 for an empty slice so callers never see NaN.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

pub fn format_score(n: f64) -> String {
    format!("{:.2}", n)
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Row counts in console messages (e.g., `1,204 rows loaded`).
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_blank_and_non_numeric() {
        assert_eq!(parse_f64_safe(Some(" 7.25 ")), Some(7.25));
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(Some("abc")), None);
        assert_eq!(parse_f64_safe(Some("NaN")), None);
        assert_eq!(parse_f64_safe(Some("inf")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn dimensions_default_to_zero() {
        assert_eq!(score_or_zero(Some("x")), 0.0);
        assert_eq!(score_or_zero(None), 0.0);
        assert_eq!(score_or_zero(Some("8")), 8.0);
    }

    #[test]
    fn invalid_composites_use_fallback() {
        assert_eq!(composite_or_fallback(Some("0")), COMPOSITE_FALLBACK);
        assert_eq!(composite_or_fallback(Some("-3.2")), COMPOSITE_FALLBACK);
        assert_eq!(composite_or_fallback(Some("n/a")), COMPOSITE_FALLBACK);
        assert_eq!(composite_or_fallback(None), COMPOSITE_FALLBACK);
        assert_eq!(composite_or_fallback(Some("6.4")), 6.4);
        assert_eq!(validate_composite(f64::NAN), COMPOSITE_FALLBACK);
    }

    #[test]
    fn average_of_empty_is_zero() {
        assert_eq!(average(&[]), 0.0);
        assert_eq!(average(&[2.0, 4.0]), 3.0);
    }

    #[test]
    fn formats_counts_with_separators() {
        assert_eq!(format_int(1204usize), "1,204");
        assert_eq!(format_score(6.12162), "6.12");
    }
}
