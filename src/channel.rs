//! Channel specifications and channel identity.
//!
//! A [`ChannelSpec`] carries the electrical envelope of one output or input:
//! the selectable ranges and the ceilings every numeric write is validated
//! against. Each driver instance owns a private copy of its model's specs;
//! range selection is the only thing that mutates them afterwards.
//!
//! [`ChannelList`] fixes the ordered channel names (`output1`, `output2`, ...)
//! and resolves the [`ChannelSelector`]s callers pass to the accessors.

use crate::error::{IviError, IviResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One hardware-selectable operating envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeSpec {
    /// Range identifier as written into the range command (e.g. `P8V`).
    pub name: String,
    /// Voltage ceiling in volts.
    pub voltage: f64,
    /// Current ceiling in amps.
    pub current: f64,
}

impl RangeSpec {
    /// Create a named range.
    pub fn new(name: impl Into<String>, voltage: f64, current: f64) -> Self {
        Self {
            name: name.into(),
            voltage,
            current,
        }
    }
}

/// Which ceiling of a channel bounds a numeric attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ceiling {
    /// Working voltage maximum.
    Voltage,
    /// Working current maximum.
    Current,
    /// Over-voltage protection maximum.
    Ovp,
    /// Over-current protection maximum.
    Ocp,
    /// Power maximum, when the model declares one.
    Power,
}

impl fmt::Display for Ceiling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Ceiling::Voltage => "voltage",
            Ceiling::Current => "current",
            Ceiling::Ovp => "ovp",
            Ceiling::Ocp => "ocp",
            Ceiling::Power => "power",
        };
        f.write_str(name)
    }
}

/// Static description of one channel of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSpec {
    /// Selectable ranges, in declaration order.
    #[serde(default)]
    pub ranges: Vec<RangeSpec>,
    /// Over-voltage protection ceiling.
    pub ovp_max: f64,
    /// Over-current protection ceiling.
    pub ocp_max: f64,
    /// Working voltage ceiling; narrowed by range selection.
    pub voltage_max: f64,
    /// Working current ceiling; narrowed by range selection.
    pub current_max: f64,
    /// Optional power ceiling.
    #[serde(default)]
    pub power_max: Option<f64>,
}

impl ChannelSpec {
    /// Channel with the given working maxima. Protection ceilings default to
    /// the same values.
    pub fn new(voltage_max: f64, current_max: f64) -> Self {
        Self {
            ranges: Vec::new(),
            ovp_max: voltage_max,
            ocp_max: current_max,
            voltage_max,
            current_max,
            power_max: None,
        }
    }

    /// Add a selectable range.
    pub fn with_range(mut self, name: impl Into<String>, voltage: f64, current: f64) -> Self {
        self.ranges.push(RangeSpec::new(name, voltage, current));
        self
    }

    /// Set the over-voltage protection ceiling.
    pub fn with_ovp_max(mut self, ovp_max: f64) -> Self {
        self.ovp_max = ovp_max;
        self
    }

    /// Set the over-current protection ceiling.
    pub fn with_ocp_max(mut self, ocp_max: f64) -> Self {
        self.ocp_max = ocp_max;
        self
    }

    /// Set the power ceiling.
    pub fn with_power_max(mut self, power_max: f64) -> Self {
        self.power_max = Some(power_max);
        self
    }

    /// Value of the requested ceiling. `None` when the channel has no such
    /// ceiling (only possible for power).
    pub fn ceiling(&self, ceiling: Ceiling) -> Option<f64> {
        match ceiling {
            Ceiling::Voltage => Some(self.voltage_max),
            Ceiling::Current => Some(self.current_max),
            Ceiling::Ovp => Some(self.ovp_max),
            Ceiling::Ocp => Some(self.ocp_max),
            Ceiling::Power => self.power_max,
        }
    }

    /// Narrow the working maxima to `range`.
    pub fn apply_range(&mut self, range: &RangeSpec) {
        self.voltage_max = range.voltage;
        self.current_max = range.current;
    }

    /// Look up a range by name.
    pub fn range(&self, name: &str) -> Option<&RangeSpec> {
        self.ranges.iter().find(|range| range.name == name)
    }

    pub(crate) fn check(&self, label: &str) -> IviResult<()> {
        let ceilings = [
            self.ovp_max,
            self.ocp_max,
            self.voltage_max,
            self.current_max,
            self.power_max.unwrap_or(0.0),
        ];
        if ceilings.iter().any(|c| !c.is_finite() || *c < 0.0) {
            return Err(IviError::InvalidModel(format!(
                "{label}: ceilings must be finite and non-negative"
            )));
        }
        for (index, range) in self.ranges.iter().enumerate() {
            if self.ranges[..index].iter().any(|r| r.name == range.name) {
                return Err(IviError::InvalidModel(format!(
                    "{label}: range '{}' declared twice",
                    range.name
                )));
            }
            if !range.voltage.is_finite() || !range.current.is_finite() {
                return Err(IviError::InvalidModel(format!(
                    "{label}: range '{}' has a non-finite ceiling",
                    range.name
                )));
            }
        }
        Ok(())
    }
}

/// Identifies a channel by position or by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSelector {
    /// Zero-based channel index.
    Index(usize),
    /// Channel name such as `output2`.
    Name(String),
}

impl From<usize> for ChannelSelector {
    fn from(index: usize) -> Self {
        ChannelSelector::Index(index)
    }
}

impl From<&str> for ChannelSelector {
    fn from(name: &str) -> Self {
        ChannelSelector::Name(name.to_string())
    }
}

impl From<String> for ChannelSelector {
    fn from(name: String) -> Self {
        ChannelSelector::Name(name)
    }
}

impl From<&String> for ChannelSelector {
    fn from(name: &String) -> Self {
        ChannelSelector::Name(name.clone())
    }
}

impl fmt::Display for ChannelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelSelector::Index(index) => write!(f, "#{index}"),
            ChannelSelector::Name(name) => f.write_str(name),
        }
    }
}

/// Ordered, unique channel names of one driver instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelList {
    names: Vec<String>,
}

impl ChannelList {
    /// `<prefix>1` through `<prefix><count>`.
    pub fn with_prefix(prefix: &str, count: usize) -> Self {
        Self {
            names: (1..=count).map(|n| format!("{prefix}{n}")).collect(),
        }
    }

    /// Explicitly named channels, e.g. the traces of a spectrum analyzer.
    pub fn from_names(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Resolve a selector to a zero-based index.
    ///
    /// # Errors
    ///
    /// [`IviError::UnknownChannel`] when the index is past the end or no
    /// channel carries the name. Names compare case-insensitively.
    pub fn resolve(&self, selector: &ChannelSelector) -> IviResult<usize> {
        match selector {
            ChannelSelector::Index(index) if *index < self.names.len() => Ok(*index),
            ChannelSelector::Name(name) => self
                .names
                .iter()
                .position(|n| n.eq_ignore_ascii_case(name))
                .ok_or_else(|| IviError::UnknownChannel(name.clone())),
            other => Err(IviError::UnknownChannel(other.to_string())),
        }
    }

    /// Name of the channel at `index`.
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Channel names in order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of channels.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the instrument has no channels.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
