//! Time-tracking value parsing.
//!
//! Effort values arrive either as numbers (already converted to hours by the
//! source) or as free text such as `"8h"`, `"1.5d"`, `"1w"` or `"8:30"`.
//! Parsing never fails: anything that cannot be read counts as zero hours.

/// Working hours in one day.
pub const HOURS_PER_DAY: f64 = 8.0;

/// Working hours in one week.
pub const HOURS_PER_WEEK: f64 = 40.0;

/// Text values treated as "no value".
const EMPTY_TOKENS: &[&str] = &["", "null", "none", "n/a", "-"];

const HOUR_UNITS: &[&str] = &["hours", "hour", "h"];
const DAY_UNITS: &[&str] = &["days", "day", "d"];
const WEEK_UNITS: &[&str] = &["weeks", "week", "w"];

/// A raw field value read from an issue source.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// The field is absent or null.
    Missing,
    /// A numeric value, interpreted as hours.
    Number(f64),
    /// A textual value.
    Text(String),
}

impl RawValue {
    /// Text content of the value, trimmed, if it is non-empty.
    ///
    /// Numbers are rendered without a trailing `.0` so that numeric keys
    /// read back the way they were written.
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawValue::Missing => None,
            RawValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(format!("{}", *n as i64))
            }
            RawValue::Number(n) => Some(n.to_string()),
            RawValue::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(RawValue::Missing)
    }
}

/// Convert a raw time-tracking value to hours.
pub fn parse_duration(value: &RawValue) -> f64 {
    match value {
        RawValue::Missing => 0.0,
        RawValue::Number(n) => sanitize(*n),
        RawValue::Text(s) => parse_duration_str(s),
    }
}

/// Convert a textual time-tracking value to hours.
pub fn parse_duration_str(value: &str) -> f64 {
    sanitize(parse_text(value).unwrap_or(0.0))
}

fn parse_text(value: &str) -> Option<f64> {
    let text = value.trim().to_lowercase();

    if EMPTY_TOKENS.contains(&text.as_str()) {
        return Some(0.0);
    }

    // `1h30m` lands in the hour branch and fails to parse, yielding zero.
    if text.contains('h') {
        parse_with_unit(&text, HOUR_UNITS)
    } else if text.contains('d') {
        parse_with_unit(&text, DAY_UNITS).map(|days| days * HOURS_PER_DAY)
    } else if text.contains('w') {
        parse_with_unit(&text, WEEK_UNITS).map(|weeks| weeks * HOURS_PER_WEEK)
    } else if text.contains(':') {
        parse_clock(&text)
    } else {
        text.parse::<f64>().ok()
    }
}

/// Strip the first matching unit suffix and parse the remaining number.
fn parse_with_unit(text: &str, units: &[&str]) -> Option<f64> {
    let number = units
        .iter()
        .find_map(|unit| text.strip_suffix(unit))
        .unwrap_or(text);

    number.trim().parse::<f64>().ok()
}

/// Parse `H:MM`; anything after the minutes is ignored.
fn parse_clock(text: &str) -> Option<f64> {
    let mut parts = text.split(':');
    let hours = parts.next()?.trim().parse::<f64>().ok()?;
    let minutes = match parts.next() {
        Some(m) => m.trim().parse::<f64>().ok()? / 60.0,
        None => 0.0,
    };

    Some(hours + minutes)
}

/// Hours are never negative, NaN or infinite.
fn sanitize(hours: f64) -> f64 {
    if hours.is_finite() && hours > 0.0 {
        hours
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hour_values() {
        assert_eq!(parse_duration_str("8h"), 8.0);
        assert_eq!(parse_duration_str("8.5h"), 8.5);
        assert_eq!(parse_duration_str("2 hours"), 2.0);
        assert_eq!(parse_duration_str("1 hour"), 1.0);
        assert_eq!(parse_duration_str(" 3H "), 3.0);
    }

    #[test]
    fn test_day_and_week_values() {
        assert_eq!(parse_duration_str("1d"), 8.0);
        assert_eq!(parse_duration_str("1.5d"), 12.0);
        assert_eq!(parse_duration_str("2 days"), 16.0);
        assert_eq!(parse_duration_str("1w"), 40.0);
        assert_eq!(parse_duration_str("0.5 weeks"), 20.0);
    }

    #[test]
    fn test_clock_values() {
        assert_eq!(parse_duration_str("8:30"), 8.5);
        assert_eq!(parse_duration_str("0:15"), 0.25);
        assert_eq!(parse_duration_str("1:30:45"), 1.5);
        assert_eq!(parse_duration_str("8:"), 0.0);
    }

    #[test]
    fn test_bare_numbers() {
        assert_eq!(parse_duration_str("12"), 12.0);
        assert_eq!(parse_duration_str("12.75"), 12.75);
        assert_eq!(parse_duration(&RawValue::Number(4.5)), 4.5);
    }

    #[test]
    fn test_empty_tokens_are_zero() {
        for token in ["", "   ", "null", "None", "N/A", "-"] {
            assert_eq!(parse_duration_str(token), 0.0, "token {:?}", token);
        }
        assert_eq!(parse_duration(&RawValue::Missing), 0.0);
    }

    #[test]
    fn test_unparseable_is_zero() {
        assert_eq!(parse_duration_str("soon"), 0.0);
        assert_eq!(parse_duration_str("abc"), 0.0);
        assert_eq!(parse_duration_str("xh"), 0.0);
        assert_eq!(parse_duration_str("1h30m"), 0.0);
    }

    #[test]
    fn test_negative_and_non_finite_are_zero() {
        assert_eq!(parse_duration_str("-5"), 0.0);
        assert_eq!(parse_duration_str("inf"), 0.0);
        assert_eq!(parse_duration_str("NaN"), 0.0);
        assert_eq!(parse_duration(&RawValue::Number(f64::NAN)), 0.0);
        assert_eq!(parse_duration(&RawValue::Number(-2.0)), 0.0);
    }

    #[test]
    fn test_raw_value_text() {
        assert_eq!(RawValue::from("  PROJ-1 ").as_text(), Some("PROJ-1".to_string()));
        assert_eq!(RawValue::from("   ").as_text(), None);
        assert_eq!(RawValue::Number(42.0).as_text(), Some("42".to_string()));
        assert_eq!(RawValue::Number(1.5).as_text(), Some("1.5".to_string()));
        assert_eq!(RawValue::from(None::<&str>), RawValue::Missing);
    }
}
