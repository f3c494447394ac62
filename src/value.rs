//! Typed attribute values and their ASCII wire representation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value held by an attribute slot.
///
/// Enumerated attributes store their semantic token (e.g. `"regulate"`) as
/// [`Value::Text`]; the wire token is produced by the attribute's mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Floating point quantity (volts, amps, seconds, ...).
    Float(f64),
    /// On/off state.
    Bool(bool),
    /// Integer setting (range codes, levels).
    Int(i64),
    /// Free text or an enumerated token.
    Text(String),
}

impl Value {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Boolean view of the value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer view of the value.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Text view of the value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// How a numeric value is rendered into a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberFormat {
    /// Fixed point with the given number of decimals (`%.Nf`).
    Fixed(usize),
    /// Scientific notation with six decimals (`%e`).
    Scientific,
    /// Rounded to an integer (`%d`).
    Integer,
    /// Shortest round-trip representation.
    #[default]
    Plain,
}

impl NumberFormat {
    /// Render `value` for the wire.
    pub fn format(&self, value: f64) -> String {
        match self {
            NumberFormat::Fixed(precision) => format!("{:.*}", precision, value),
            NumberFormat::Scientific => format!("{value:.6e}"),
            NumberFormat::Integer => format!("{}", value.round() as i64),
            NumberFormat::Plain => format!("{value}"),
        }
    }
}

/// Wire token written for a boolean.
pub(crate) fn format_bool(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

/// Parse a boolean reply. Accepts `0`/`1`, `ON`/`OFF` and any finite
/// numeric reply (non-zero is true).
pub(crate) fn parse_bool(reply: &str) -> Option<bool> {
    let reply = reply.trim();
    if reply.eq_ignore_ascii_case("on") {
        return Some(true);
    }
    if reply.eq_ignore_ascii_case("off") {
        return Some(false);
    }
    parse_f64(reply).map(|v| v != 0.0)
}

/// Parse a floating point reply, tolerating surrounding whitespace.
///
/// `nan` and `inf` parse as `f64` but are never a valid instrument reading.
pub(crate) fn parse_f64(reply: &str) -> Option<f64> {
    reply
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Parse an integer reply; instruments sometimes answer `3.000` for `3`.
pub(crate) fn parse_i64(reply: &str) -> Option<i64> {
    let reply = reply.trim();
    reply.parse::<i64>().ok().or_else(|| {
        reply
            .parse::<f64>()
            .ok()
            .filter(|v| v.fract() == 0.0 && v.is_finite())
            .map(|v| v as i64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_formats() {
        assert_eq!(NumberFormat::Fixed(3).format(1.5), "1.500");
        assert_eq!(NumberFormat::Integer.format(2.6), "3");
        assert_eq!(NumberFormat::Plain.format(12.25), "12.25");
        assert_eq!(NumberFormat::Scientific.format(1500.0), "1.500000e3");
    }

    #[test]
    fn test_parse_bool_variants() {
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool(" 0\n"), Some(false));
        assert_eq!(parse_bool("ON"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_f64(" 1.234E-03\r\n"), Some(0.001234));
        assert_eq!(parse_f64("ERR"), None);
        assert_eq!(parse_i64("3.000"), Some(3));
        assert_eq!(parse_i64("3.5"), None);
    }

    #[test]
    fn test_non_finite_replies_are_rejected() {
        assert_eq!(parse_f64("nan"), None);
        assert_eq!(parse_f64("inf"), None);
        assert_eq!(parse_f64("-Infinity"), None);
        assert_eq!(parse_bool("NaN"), None);
        assert_eq!(parse_i64("inf"), None);
    }

    #[test]
    fn test_value_views() {
        assert_eq!(Value::from(3).as_f64(), Some(3.0));
        assert_eq!(Value::from("trip").as_str(), Some("trip"));
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert_eq!(Value::from(1.0).as_bool(), None);
    }
}
