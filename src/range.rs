//! Range selection.
//!
//! Picks the tightest range that still covers a set-point: ranges are ordered
//! by the requested quantity's ceiling (largest first) and the scan keeps the
//! last one whose ceiling is at least the requested value.

use crate::channel::RangeSpec;
use crate::error::{IviError, IviResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Physical quantity a range or a measurement refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    /// Volts.
    Voltage,
    /// Amps.
    Current,
}

impl Quantity {
    fn ceiling_of(self, range: &RangeSpec) -> f64 {
        match self {
            Quantity::Voltage => range.voltage.abs(),
            Quantity::Current => range.current.abs(),
        }
    }

    /// Lower-case name used in commands and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Quantity::Voltage => "voltage",
            Quantity::Current => "current",
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quantity {
    type Err = IviError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "voltage" | "v" => Ok(Quantity::Voltage),
            "current" | "i" | "a" => Ok(Quantity::Current),
            other => Err(IviError::unsupported("quantity", other)),
        }
    }
}

/// Choose the narrowest range in `ranges` whose `quantity` ceiling covers
/// `value`.
///
/// # Errors
///
/// [`IviError::OutOfRange`] when no range covers the value (including NaN).
pub fn select_range(ranges: &[RangeSpec], quantity: Quantity, value: f64) -> IviResult<&RangeSpec> {
    let mut ordered: Vec<&RangeSpec> = ranges.iter().collect();
    ordered.sort_by(|a, b| quantity.ceiling_of(b).total_cmp(&quantity.ceiling_of(a)));

    let mut selected = None;
    for range in ordered {
        if quantity.ceiling_of(range) >= value {
            selected = Some(range);
        }
    }

    selected.ok_or_else(|| {
        let max = ranges
            .iter()
            .map(|r| quantity.ceiling_of(r))
            .fold(0.0_f64, f64::max);
        IviError::out_of_range(format!("{quantity} range"), value, 0.0, max)
    })
}

/// Name of the range [`select_range`] picks.
///
/// # Errors
///
/// Same as [`select_range`].
pub fn validate_range<'a>(ranges: &'a [RangeSpec], quantity: Quantity, value: f64) -> IviResult<&'a str> {
    select_range(ranges, quantity, value).map(|range| range.name.as_str())
}
