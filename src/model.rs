//! Model descriptions: the declarative table behind every driver.
//!
//! A [`ModelDescription`] lists a model's channels, attributes and the
//! command templates of its utility operations. The driver engine is generic;
//! everything that differs between a GW Instek supply and a Prodigit load
//! lives in one of these tables.
//!
//! Tables are built in code with [`ModelBuilder`] or deserialized from TOML
//! (see [`ModelDescription::from_toml_str`]). Both paths end in
//! [`ModelDescription::validate`], so a driver never sees an inconsistent
//! table.
//!
//! # Template placeholders
//!
//! Command templates are rendered with `strfmt`:
//!
//! | placeholder | meaning |
//! |-------------|---------|
//! | `{ch}`      | 1-based channel number |
//! | `{name}`    | channel name (`output2`, `channel1`) |
//! | `{value}`   | formatted value being written |
//! | `{range}`   | selected range name |
//! | `{index}`   | memory slot |
//! | `{format}`, `{invert}` | screenshot options |
//! | `{key}`     | text selected by an attribute's template key |
//! | `{value0}`, `{value1}`, ... | `;` separated fields of a compound wire token |
//!
//! # Example
//!
//! ```
//! use rust_ivi::attribute::{AttributeDef, Limit};
//! use rust_ivi::channel::{Ceiling, ChannelSpec};
//! use rust_ivi::model::{InstrumentClass, ModelDescription};
//!
//! let model = ModelDescription::builder("BENCH-1", InstrumentClass::PowerSupply)
//!     .manufacturer("Acme")
//!     .channel(ChannelSpec::new(30.0, 3.0))
//!     .attribute(
//!         AttributeDef::float("voltage_level")
//!             .query("source:voltage?")
//!             .write("source:voltage {value}")
//!             .limit(Limit::Ceiling(Ceiling::Voltage)),
//!     )
//!     .build()
//!     .unwrap();
//! assert_eq!(model.channel_count(), 1);
//! ```

use crate::attribute::{AttributeDef, AttributeKind, Invalidation, Scope};
use crate::channel::{ChannelList, ChannelSpec};
use crate::error::{IviError, IviResult};
use crate::mapping::ValueMapping;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Instrument class a model belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentClass {
    /// Programmable DC power supply.
    PowerSupply,
    /// DC electronic load.
    ElectronicLoad,
    /// Oscilloscope.
    Oscilloscope,
    /// Multimeter with a supply section.
    Multimeter,
    /// Swept spectrum analyzer.
    SpectrumAnalyzer,
}

impl fmt::Display for InstrumentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstrumentClass::PowerSupply => "power supply",
            InstrumentClass::ElectronicLoad => "electronic load",
            InstrumentClass::Oscilloscope => "oscilloscope",
            InstrumentClass::Multimeter => "multimeter",
            InstrumentClass::SpectrumAnalyzer => "spectrum analyzer",
        };
        f.write_str(name)
    }
}

/// Bit masks of a questionable-status condition register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRegister {
    /// Query template returning the register as an integer.
    pub query: String,
    /// Constant-voltage bit.
    pub constant_voltage: u32,
    /// Constant-current bit.
    pub constant_current: u32,
    /// Over-voltage bit.
    pub over_voltage: u32,
    /// Over-current bit.
    pub over_current: u32,
}

impl StatusRegister {
    /// SCPI `stat:ques:inst:isum` layout: CC bit 0, CV bit 1, OV bit 9, OC
    /// bit 10.
    pub fn scpi_isum() -> Self {
        Self {
            query: "stat:ques:inst:isum{ch}:cond?".to_string(),
            constant_voltage: 1 << 1,
            constant_current: 1 << 0,
            over_voltage: 1 << 9,
            over_current: 1 << 10,
        }
    }
}

/// Screenshot commands of a scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenshotCommands {
    /// Written first with `{invert}` set to `1`/`0`.
    pub prepare: Option<String>,
    /// Written with `{format}`; the instrument answers with a binary block.
    pub fetch: String,
    /// Image format token ↔ wire name.
    pub formats: ValueMapping,
}

/// Identity read with one query per field instead of a single `*IDN?`.
///
/// The manufacturer comes from the model table; the serial number is not
/// available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityQueries {
    /// Query answering the instrument model.
    pub model: String,
    /// Query answering the firmware revision.
    pub firmware: String,
}

/// Waveform transfer commands of a scope.
///
/// The `setup` commands pin the transfer to unsigned big-endian words before
/// the `{name}` channel is made the source. The preamble reply carries ten
/// comma separated fields: format, type, points, count, x increment, x
/// origin, x reference, y increment, y origin and y reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveformCommands {
    /// Written in order before the preamble query.
    pub setup: Vec<String>,
    /// Preamble query.
    pub preamble: String,
    /// Data query answered with a binary block.
    pub data: String,
}

/// Automatic waveform measurements of a scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementCommands {
    /// Prefix of every measurement query, e.g. `:measure:`.
    pub prefix: String,
    /// Measurement function token to instrument function. A function with
    /// a qualifier is written `name qualifier` and queried as
    /// `name? qualifier,`.
    pub functions: ValueMapping,
    /// Functions that compare two channels and need a reference channel.
    #[serde(default)]
    pub reference_functions: Vec<String>,
}

/// Trace transfer commands of a spectrum analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceCommands {
    /// Written before each fetch, typically selecting the data format.
    pub prepare: Option<String>,
    /// Query answered with comma separated amplitudes; `{name}` is the trace.
    pub fetch: String,
}

/// Command templates of the utility operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Commands {
    /// Identification query, answered with four comma separated fields.
    pub identify: Option<String>,
    /// Per-field identity queries, used instead of `identify` when set.
    pub identity_queries: Option<IdentityQueries>,
    /// Instrument reset.
    pub reset: Option<String>,
    /// Error queue query, answered with `code,"message"`.
    pub error_query: Option<String>,
    /// Self-test query.
    pub self_test: Option<String>,
    /// Wait between sending the self-test query and reading the reply.
    pub self_test_wait_ms: u64,
    /// Channel-select command, issued before channel commands on
    /// multi-channel models.
    pub select_channel: Option<String>,
    /// Range command with a `{range}` placeholder.
    pub configure_range: Option<String>,
    /// Voltage measurement query.
    pub measure_voltage: Option<String>,
    /// Current measurement query.
    pub measure_current: Option<String>,
    /// Commands clearing tripped protection, in order.
    pub protection_clear: Vec<String>,
    /// Whether protection-clear commands address a channel.
    pub protection_clear_per_channel: bool,
    /// Save settings to memory slot `{index}`.
    pub memory_save: Option<String>,
    /// Recall settings from memory slot `{index}`.
    pub memory_recall: Option<String>,
    /// Arm the trigger system.
    pub trigger_initiate: Option<String>,
    /// Abort a pending trigger.
    pub trigger_abort: Option<String>,
    /// Software trigger.
    pub software_trigger: Option<String>,
    /// Attributes made stale by `trigger_initiate`.
    pub initiate_invalidates: Vec<String>,
    /// Automatic setup; every cached attribute becomes stale.
    pub auto_setup: Option<String>,
    /// Output state register.
    pub status: Option<StatusRegister>,
    /// Setup query answered with a binary block.
    pub fetch_setup: Option<String>,
    /// Prefix written in front of a setup block.
    pub load_setup: Option<String>,
    /// Screenshot commands.
    pub screenshot: Option<ScreenshotCommands>,
    /// Waveform transfer.
    pub waveform: Option<WaveformCommands>,
    /// Waveform measurements.
    pub waveform_measurement: Option<MeasurementCommands>,
    /// Trace transfer.
    pub trace: Option<TraceCommands>,
}

impl Default for Commands {
    fn default() -> Self {
        Self {
            identify: Some("*IDN?".to_string()),
            identity_queries: None,
            reset: Some("*RST".to_string()),
            error_query: Some("system:error?".to_string()),
            self_test: Some("*TST?".to_string()),
            self_test_wait_ms: 0,
            select_channel: None,
            configure_range: None,
            measure_voltage: None,
            measure_current: None,
            protection_clear: Vec::new(),
            protection_clear_per_channel: false,
            memory_save: None,
            memory_recall: None,
            trigger_initiate: None,
            trigger_abort: None,
            software_trigger: None,
            initiate_invalidates: Vec::new(),
            auto_setup: None,
            status: None,
            fetch_setup: None,
            load_setup: None,
            screenshot: None,
            waveform: None,
            waveform_measurement: None,
            trace: None,
        }
    }
}

fn default_channel_prefix() -> String {
    "output".to_string()
}

/// Declarative description of one instrument model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescription {
    /// Model name used for lookup, e.g. `PST-3202`.
    pub name: String,
    /// Instrument class.
    pub class: InstrumentClass,
    /// Manufacturer reported when simulating.
    #[serde(default)]
    pub manufacturer: String,
    /// Human readable description.
    #[serde(default)]
    pub description: String,
    /// Instrument models this table drives.
    #[serde(default)]
    pub supported_models: Vec<String>,
    /// Prefix the reported instrument model must start with when an ID
    /// query is requested. Defaults to the model name.
    #[serde(default)]
    pub id_prefix: Option<String>,
    /// Channel name prefix.
    #[serde(default = "default_channel_prefix")]
    pub channel_prefix: String,
    /// Explicit channel names, overriding the numbered prefix.
    #[serde(default)]
    pub channel_names: Vec<String>,
    /// One spec per channel.
    pub channels: Vec<ChannelSpec>,
    /// Number of memory slots; zero when the model has no memory.
    #[serde(default)]
    pub memory_size: usize,
    /// Attributes invalidated on a channel after its range changes.
    #[serde(default)]
    pub range_dependent: Vec<String>,
    /// Attribute table.
    #[serde(default)]
    pub attributes: Vec<AttributeDef>,
    /// Utility command templates.
    #[serde(default)]
    pub commands: Commands,
}

impl ModelDescription {
    /// Start building a model.
    pub fn builder(name: impl Into<String>, class: InstrumentClass) -> ModelBuilder {
        ModelBuilder::new(name, class)
    }

    /// Parse and validate a TOML table.
    ///
    /// # Errors
    ///
    /// [`IviError::InvalidModel`] for syntax errors and inconsistent tables.
    pub fn from_toml_str(source: &str) -> IviResult<Self> {
        let model: Self =
            toml::from_str(source).map_err(|e| IviError::InvalidModel(e.to_string()))?;
        model.validate()?;
        Ok(model)
    }

    /// Number of channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Channel names in order: the explicit names when declared, otherwise
    /// `<prefix>1` through `<prefix><count>`.
    pub fn channel_list(&self) -> ChannelList {
        if self.channel_names.is_empty() {
            ChannelList::with_prefix(&self.channel_prefix, self.channel_count())
        } else {
            ChannelList::from_names(self.channel_names.clone())
        }
    }

    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeDef> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Prefix checked by the ID query.
    pub fn id_prefix(&self) -> &str {
        self.id_prefix.as_deref().unwrap_or(&self.name)
    }

    /// Check the table for internal consistency.
    ///
    /// Checks:
    /// - at least one channel, every channel spec sane
    /// - attribute names unique and every attribute has a template
    /// - invalidation and range-dependent lists name existing attributes
    /// - declared defaults parse; ceiling defaults only on float channel
    ///   attributes
    /// - local attributes carry no templates
    /// - template keys name an enumerated attribute of the same scope
    /// - explicit channel names match the channel count and are unique
    /// - a range command exists when a channel has more than one range
    ///
    /// # Errors
    ///
    /// [`IviError::InvalidModel`] describing the first problem found.
    pub fn validate(&self) -> IviResult<()> {
        let invalid = |msg: String| Err(IviError::InvalidModel(format!("{}: {msg}", self.name)));

        if self.name.trim().is_empty() {
            return Err(IviError::InvalidModel("model name is empty".to_string()));
        }
        if self.channels.is_empty() {
            return invalid("at least one channel is required".to_string());
        }
        for (index, spec) in self.channels.iter().enumerate() {
            spec.check(&format!("{} channel {}", self.name, index + 1))?;
        }

        let mut scopes: HashMap<&str, Scope> = HashMap::new();
        for attr in &self.attributes {
            if scopes.insert(attr.name.as_str(), attr.scope).is_some() {
                return invalid(format!("attribute '{}' declared twice", attr.name));
            }
            if attr.local && (attr.query.is_some() || attr.write.is_some()) {
                return invalid(format!("local attribute '{}' cannot have commands", attr.name));
            }
            if !attr.is_readable() && !attr.is_writable() {
                return invalid(format!("attribute '{}' has neither query nor write", attr.name));
            }
            if attr.default_from.is_some()
                && (attr.scope != Scope::Channel || !matches!(attr.kind, AttributeKind::Float { .. }))
            {
                return invalid(format!(
                    "attribute '{}' takes a ceiling default but is not a float channel attribute",
                    attr.name
                ));
            }
            attr.initial_value()?;
        }

        for attr in &self.attributes {
            let Some(key) = &attr.key else { continue };
            let Some(source) = self.attribute(&key.attribute) else {
                return invalid(format!(
                    "attribute '{}' is keyed by unknown attribute '{}'",
                    attr.name, key.attribute
                ));
            };
            let AttributeKind::Enum { mapping } = &source.kind else {
                return invalid(format!("key attribute '{}' is not enumerated", key.attribute));
            };
            if source.scope != attr.scope || source.name == attr.name || source.key.is_some() {
                return invalid(format!(
                    "attribute '{}' must be keyed by an unkeyed attribute of the same scope",
                    attr.name
                ));
            }
            if let Some(token) = key.values.tokens().find(|t| !mapping.contains_token(t)) {
                return invalid(format!(
                    "key of attribute '{}' names unknown {} token '{token}'",
                    attr.name, key.attribute
                ));
            }
        }

        if !self.channel_names.is_empty() {
            if self.channel_names.len() != self.channels.len() {
                return invalid(format!(
                    "{} channel names for {} channels",
                    self.channel_names.len(),
                    self.channels.len()
                ));
            }
            for (index, name) in self.channel_names.iter().enumerate() {
                if self.channel_names[..index].iter().any(|n| n.eq_ignore_ascii_case(name)) {
                    return invalid(format!("channel name '{name}' declared twice"));
                }
            }
        }

        for name in &self.commands.initiate_invalidates {
            if !scopes.contains_key(name.as_str()) {
                return invalid(format!("trigger_initiate invalidates unknown attribute '{name}'"));
            }
        }
        if let Some(measurement) = &self.commands.waveform_measurement {
            if let Some(name) = measurement
                .reference_functions
                .iter()
                .find(|f| !measurement.functions.contains_token(f))
            {
                return invalid(format!("reference function '{name}' is not a measurement function"));
            }
        }

        for attr in &self.attributes {
            for effect in &attr.invalidates {
                if let Invalidation::Attributes(names) = effect {
                    for name in names {
                        if !scopes.contains_key(name.as_str()) {
                            return invalid(format!(
                                "attribute '{}' invalidates unknown attribute '{name}'",
                                attr.name
                            ));
                        }
                    }
                }
                if *effect == Invalidation::SameAttributeAllChannels && attr.scope == Scope::Instrument {
                    return invalid(format!(
                        "instrument attribute '{}' cannot invalidate other channels",
                        attr.name
                    ));
                }
            }
        }

        for name in &self.range_dependent {
            match scopes.get(name.as_str()) {
                Some(Scope::Channel) => {}
                _ => return invalid(format!("range-dependent attribute '{name}' is not a channel attribute")),
            }
        }

        if self.channels.iter().any(|c| c.ranges.len() > 1) && self.commands.configure_range.is_none() {
            return invalid("channels with several ranges need a configure_range command".to_string());
        }
        if self.memory_size > 0
            && (self.commands.memory_save.is_none() || self.commands.memory_recall.is_none())
        {
            return invalid("memory_size set without memory_save/memory_recall commands".to_string());
        }

        Ok(())
    }
}

/// Fluent builder for [`ModelDescription`].
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    model: ModelDescription,
}

impl ModelBuilder {
    /// New builder with standard SCPI utility commands.
    pub fn new(name: impl Into<String>, class: InstrumentClass) -> Self {
        Self {
            model: ModelDescription {
                name: name.into(),
                class,
                manufacturer: String::new(),
                description: String::new(),
                supported_models: Vec::new(),
                id_prefix: None,
                channel_prefix: default_channel_prefix(),
                channel_names: Vec::new(),
                channels: Vec::new(),
                memory_size: 0,
                range_dependent: Vec::new(),
                attributes: Vec::new(),
                commands: Commands::default(),
            },
        }
    }

    /// Set the manufacturer.
    pub fn manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.model.manufacturer = manufacturer.into();
        self
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.model.description = description.into();
        self
    }

    /// Set the supported instrument models.
    pub fn supported_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.model.supported_models = models.into_iter().map(Into::into).collect();
        self
    }

    /// Set the ID query prefix.
    pub fn id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.model.id_prefix = Some(prefix.into());
        self
    }

    /// Set the channel name prefix.
    pub fn channel_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.model.channel_prefix = prefix.into();
        self
    }

    /// Name the channels explicitly.
    pub fn channel_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.model.channel_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Append a channel.
    pub fn channel(mut self, spec: ChannelSpec) -> Self {
        self.model.channels.push(spec);
        self
    }

    /// Append `count` copies of a channel.
    pub fn channels(mut self, spec: ChannelSpec, count: usize) -> Self {
        self.model
            .channels
            .extend(std::iter::repeat(spec).take(count));
        self
    }

    /// Set the number of memory slots.
    pub fn memory_size(mut self, size: usize) -> Self {
        self.model.memory_size = size;
        self
    }

    /// Attributes invalidated when a channel's range changes.
    pub fn range_dependent<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.model.range_dependent = names.into_iter().map(Into::into).collect();
        self
    }

    /// Append an attribute.
    pub fn attribute(mut self, attribute: AttributeDef) -> Self {
        self.model.attributes.push(attribute);
        self
    }

    /// Append several attributes.
    pub fn attributes(mut self, attributes: impl IntoIterator<Item = AttributeDef>) -> Self {
        self.model.attributes.extend(attributes);
        self
    }

    /// Edit the utility commands in place.
    pub fn commands(mut self, edit: impl FnOnce(&mut Commands)) -> Self {
        edit(&mut self.model.commands);
        self
    }

    /// Validate and return the model.
    ///
    /// # Errors
    ///
    /// See [`ModelDescription::validate`].
    pub fn build(self) -> IviResult<ModelDescription> {
        self.model.validate()?;
        Ok(self.model)
    }
}
