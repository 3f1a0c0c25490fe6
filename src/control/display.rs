//! Display-value parser
//!
//! Peers describe parameters in human units ("1.2 kHz", "-12.0 dB",
//! "4.0 : 1") while the wire speaks normalized floats. This module parses a
//! display string into a numeric base value, normalizing unit prefixes
//! (kHz → Hz, s → ms) so targets and readbacks compare in the same unit.

use std::fmt;

/// Recognized display units after normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Hertz,
    Decibels,
    Percent,
    Ratio,
    Milliseconds,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Hertz => write!(f, "Hz"),
            Unit::Decibels => write!(f, "dB"),
            Unit::Percent => write!(f, "%"),
            Unit::Ratio => write!(f, ":1"),
            Unit::Milliseconds => write!(f, "ms"),
        }
    }
}

/// Result of parsing a display string
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayValue {
    /// The original text
    pub raw: String,

    /// Numeric value in base units (Hz, dB, %, ratio, ms), if parseable
    /// and finite
    pub base_value: Option<f64>,

    /// Recognized unit, if any
    pub unit: Option<Unit>,
}

impl DisplayValue {
    fn unparsable(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            base_value: None,
            unit: None,
        }
    }
}

/// Parse peer display text (e.g. "19.9 kHz", "-12 dB", "4.0 : 1") into a
/// base-unit value.
///
/// Non-finite displays ("-inf dB") and non-numeric text parse to
/// `base_value: None`.
pub fn parse_display_value(raw: &str) -> DisplayValue {
    let text = raw.trim();
    if text.is_empty() {
        return DisplayValue::unparsable(raw);
    }

    // Ratio displays: "4.0 : 1", "4:1"
    if let Some(value) = parse_ratio(text) {
        return DisplayValue {
            raw: raw.to_string(),
            base_value: Some(value),
            unit: Some(Unit::Ratio),
        };
    }

    let (number_str, suffix) = split_numeric_prefix(text);
    let Ok(value) = number_str.parse::<f64>() else {
        return DisplayValue::unparsable(raw);
    };
    if !value.is_finite() {
        return DisplayValue::unparsable(raw);
    }

    let (base_value, unit) = normalize_unit(value, suffix.trim());
    DisplayValue {
        raw: raw.to_string(),
        base_value: Some(base_value),
        unit,
    }
}

/// Match "N : 1" / "N:1" ratio displays
fn parse_ratio(text: &str) -> Option<f64> {
    let (lhs, rhs) = text.split_once(':')?;
    if rhs.trim() != "1" {
        return None;
    }
    let value = lhs.trim().parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

/// Split the leading numeric token (sign, digits, decimal point, exponent)
/// from its unit suffix
fn split_numeric_prefix(text: &str) -> (&str, &str) {
    let bytes = text.as_bytes();
    let mut end = 0;
    while end < bytes.len() {
        let b = bytes[end];
        let numeric = b.is_ascii_digit()
            || b == b'.'
            || ((b == b'+' || b == b'-') && (end == 0 || matches!(bytes[end - 1], b'e' | b'E')))
            || ((b == b'e' || b == b'E') && end > 0 && bytes[..end].iter().any(u8::is_ascii_digit));
        if !numeric {
            break;
        }
        end += 1;
    }
    text.split_at(end)
}

/// Convert `(value, unit suffix)` into base units
fn normalize_unit(value: f64, suffix: &str) -> (f64, Option<Unit>) {
    match suffix.to_ascii_lowercase().as_str() {
        "khz" => (value * 1000.0, Some(Unit::Hertz)),
        "hz" => (value, Some(Unit::Hertz)),
        "db" => (value, Some(Unit::Decibels)),
        "%" => (value, Some(Unit::Percent)),
        "s" | "sec" | "secs" => (value * 1000.0, Some(Unit::Milliseconds)),
        "ms" => (value, Some(Unit::Milliseconds)),
        _ => (value, None),
    }
}
