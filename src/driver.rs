//! The generic driver engine.
//!
//! A [`Driver`] binds one [`ModelDescription`] to one transport and owns the
//! per-instance state: a private copy of the channel specs and the attribute
//! cache. Every model-specific detail comes from the table; this module only
//! implements the IVI access rules.
//!
//! ## Reads
//!
//! A read returns the cached value when the driver is simulating, when the
//! slot is valid, or when the attribute cannot be queried. Otherwise the
//! channel is selected (multi-channel models with a select command), the
//! query is sent, the reply is parsed into the attribute's kind and stored as
//! valid.
//!
//! ## Writes
//!
//! A write is validated against the attribute's kind and limit before any
//! I/O. On success the slot is stored as valid and the attribute's declared
//! side effects are applied; the written slot itself stays valid. A rejected
//! value or a transport failure leaves the cache untouched.
//!
//! Local attributes have no instrument command; writes only update the
//! cache. Attributes keyed by another attribute read that attribute first
//! and render its keyed text as `{key}`, so one `range` attribute can follow
//! the selected measurement function. Compound wire tokens (`dc;0;1`) are
//! also rendered field by field as `{value0}`, `{value1}`, ...
//!
//! ## Simulation
//!
//! A simulating driver never touches its transport. Writes still validate and
//! update the cache, reads return cached or default values, and queries of
//! instrument state return neutral answers (`0.0`, `false`, empty blocks).
//!
//! # Example
//!
//! ```
//! use rust_ivi::driver::Driver;
//! use rust_ivi::models::gwinstek;
//!
//! let mut psu = Driver::simulated(gwinstek::pst3202().unwrap()).unwrap();
//! psu.set("voltage_level", "output1", 12.5).unwrap();
//! assert_eq!(psu.get_f64("voltage_level", "output1").unwrap(), 12.5);
//! assert!(psu.set("voltage_level", "output3", 12.5).is_err()); // 6 V channel
//! ```

use crate::adapters::Transport;
use crate::attribute::{AttributeDef, Invalidation, Scope};
use crate::block;
use crate::cache::{AttributeCache, Slot};
use crate::channel::{ChannelList, ChannelSelector, ChannelSpec};
use crate::error::{IviError, IviResult};
use crate::model::ModelDescription;
use crate::range::{self, Quantity};
use crate::value::{self, Value};
use crate::waveform::{self, Preamble};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const SIMULATED_IDENTITY: &str = "Not available while simulating";

const IDENTITY_MANUFACTURER: &str = "identity_instrument_manufacturer";
const IDENTITY_MODEL: &str = "identity_instrument_model";
const IDENTITY_SERIAL: &str = "identity_instrument_serial_number";
const IDENTITY_FIRMWARE: &str = "identity_instrument_firmware_revision";
const IDENTITY_SLOTS: [&str; 4] = [
    IDENTITY_MANUFACTURER,
    IDENTITY_MODEL,
    IDENTITY_SERIAL,
    IDENTITY_FIRMWARE,
];

/// Options applied when a driver is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverOptions {
    /// Never touch the transport.
    #[serde(default)]
    pub simulate: bool,
    /// Check the reported model against the table's ID prefix.
    #[serde(default)]
    pub id_query: bool,
    /// Reset the instrument after opening.
    #[serde(default)]
    pub reset: bool,
}

/// Instrument identity as reported by the identification query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Manufacturer field.
    pub manufacturer: String,
    /// Model field.
    pub model: String,
    /// Serial number field.
    pub serial_number: String,
    /// Firmware revision field.
    pub firmware_revision: String,
}

/// Output/input regulation and protection states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputState {
    /// Regulating voltage.
    ConstantVoltage,
    /// Regulating current.
    ConstantCurrent,
    /// Over-voltage protection tripped.
    OverVoltage,
    /// Over-current protection tripped.
    OverCurrent,
    /// Neither voltage nor current regulated.
    Unregulated,
}

impl FromStr for OutputState {
    type Err = IviError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "constant_voltage" | "cv" => Ok(OutputState::ConstantVoltage),
            "constant_current" | "cc" => Ok(OutputState::ConstantCurrent),
            "over_voltage" | "ov" => Ok(OutputState::OverVoltage),
            "over_current" | "oc" => Ok(OutputState::OverCurrent),
            "unregulated" => Ok(OutputState::Unregulated),
            other => Err(IviError::unsupported("output state", other)),
        }
    }
}

/// One instrument handle.
pub struct Driver {
    model: Arc<ModelDescription>,
    channels: ChannelList,
    specs: Vec<ChannelSpec>,
    cache: AttributeCache,
    transport: Option<Box<dyn Transport>>,
    simulate: bool,
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("model", &self.model.name)
            .field("channels", &self.channels.names())
            .field("simulate", &self.simulate)
            .field("transport", &self.transport.as_ref().map(|t| t.name().to_string()))
            .finish()
    }
}

impl Driver {
    fn build(model: ModelDescription, transport: Option<Box<dyn Transport>>, simulate: bool) -> IviResult<Self> {
        model.validate()?;

        let channels = model.channel_list();
        let specs = model.channels.clone();
        let mut cache = AttributeCache::new();
        for attr in &model.attributes {
            match attr.scope {
                Scope::Channel => {
                    for (index, spec) in specs.iter().enumerate() {
                        cache.insert_default(&attr.name, Some(index), attr.initial_value_for(Some(spec))?);
                    }
                }
                Scope::Instrument => cache.insert_default(&attr.name, None, attr.initial_value()?),
            }
        }
        for slot in IDENTITY_SLOTS {
            cache.insert_default(slot, None, Value::Text(String::new()));
        }

        debug!(
            "created {} driver with {} channel(s), simulate={}",
            model.name,
            channels.len(),
            simulate
        );
        Ok(Self {
            model: Arc::new(model),
            channels,
            specs,
            cache,
            transport,
            simulate,
        })
    }

    /// Driver talking to an instrument through `transport`. No I/O happens
    /// until [`Driver::initialize`] or the first access.
    ///
    /// # Errors
    ///
    /// [`IviError::InvalidModel`] when the table is inconsistent.
    pub fn new(model: ModelDescription, transport: impl Transport + 'static) -> IviResult<Self> {
        Self::build(model, Some(Box::new(transport)), false)
    }

    /// Driver without a transport, permanently simulating.
    ///
    /// # Errors
    ///
    /// [`IviError::InvalidModel`] when the table is inconsistent.
    pub fn simulated(model: ModelDescription) -> IviResult<Self> {
        Self::build(model, None, true)
    }

    /// Create a driver and run [`Driver::initialize`] with `options`.
    ///
    /// # Errors
    ///
    /// [`IviError::NotConnected`] when not simulating and no transport is
    /// given, plus anything `initialize` reports.
    pub fn open(
        model: ModelDescription,
        transport: Option<Box<dyn Transport>>,
        options: DriverOptions,
    ) -> IviResult<Self> {
        if !options.simulate && transport.is_none() {
            return Err(IviError::NotConnected(model.name));
        }
        let mut driver = Self::build(model, transport, options.simulate)?;
        driver.initialize(options.id_query, options.reset)?;
        Ok(driver)
    }

    /// Clear the interface, optionally verify the instrument model and reset.
    ///
    /// # Errors
    ///
    /// [`IviError::IdMismatch`] when the reported model does not start with
    /// the table's ID prefix; transport errors as they occur.
    pub fn initialize(&mut self, id_query: bool, reset: bool) -> IviResult<()> {
        if !self.simulate {
            self.transport()?.clear()?;

            if id_query {
                let reported = self.identity_model()?;
                let expected = self.model.id_prefix().to_string();
                if !reported.starts_with(&expected) {
                    return Err(IviError::IdMismatch {
                        expected,
                        actual: reported,
                    });
                }
            }
        }

        if reset {
            self.utility_reset()?;
        }

        info!("{} initialized (simulate={})", self.model.name, self.simulate);
        Ok(())
    }

    /// Switch simulation on or off.
    ///
    /// # Errors
    ///
    /// [`IviError::NotConnected`] when leaving simulation without a
    /// transport.
    pub fn set_simulate(&mut self, simulate: bool) -> IviResult<()> {
        if !simulate && self.transport.is_none() {
            return Err(IviError::NotConnected(self.model.name.clone()));
        }
        self.simulate = simulate;
        Ok(())
    }

    /// Whether the driver is simulating.
    pub fn is_simulating(&self) -> bool {
        self.simulate
    }

    /// The model table behind this driver.
    pub fn model(&self) -> &ModelDescription {
        &self.model
    }

    /// Channel names in order.
    pub fn channel_names(&self) -> &[String] {
        self.channels.names()
    }

    /// Number of channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Working spec of a channel, including range narrowing.
    ///
    /// # Errors
    ///
    /// [`IviError::UnknownChannel`] for an unresolved selector.
    pub fn channel_spec(&self, channel: impl Into<ChannelSelector>) -> IviResult<&ChannelSpec> {
        let index = self.channels.resolve(&channel.into())?;
        Ok(&self.specs[index])
    }

    /// Read-only view of the attribute cache.
    pub fn cache(&self) -> &AttributeCache {
        &self.cache
    }

    /// Invalidate every cached attribute.
    pub fn invalidate_all(&mut self) {
        self.cache.invalidate_all();
    }

    // ------------------------------------------------------------------
    // Attribute access
    // ------------------------------------------------------------------

    /// Read a channel attribute.
    ///
    /// # Errors
    ///
    /// [`IviError::UnknownChannel`], [`IviError::UnknownAttribute`], parse
    /// errors for bad replies and transport errors.
    pub fn get(&mut self, attribute: &str, channel: impl Into<ChannelSelector>) -> IviResult<Value> {
        let index = self.channels.resolve(&channel.into())?;
        let model = Arc::clone(&self.model);
        let attr = lookup(&model, attribute, Scope::Channel)?;
        self.read_slot(attr, Some(index))
    }

    /// Write a channel attribute.
    ///
    /// # Errors
    ///
    /// [`IviError::ReadOnly`], [`IviError::OutOfRange`],
    /// [`IviError::UnsupportedValue`], selector errors and transport errors.
    pub fn set(
        &mut self,
        attribute: &str,
        channel: impl Into<ChannelSelector>,
        value: impl Into<Value>,
    ) -> IviResult<()> {
        let index = self.channels.resolve(&channel.into())?;
        let model = Arc::clone(&self.model);
        let attr = lookup(&model, attribute, Scope::Channel)?;
        self.write_slot(attr, Some(index), value.into())
    }

    /// Read an instrument-wide attribute.
    ///
    /// # Errors
    ///
    /// Same as [`Driver::get`].
    pub fn get_instrument(&mut self, attribute: &str) -> IviResult<Value> {
        let model = Arc::clone(&self.model);
        let attr = lookup(&model, attribute, Scope::Instrument)?;
        self.read_slot(attr, None)
    }

    /// Write an instrument-wide attribute.
    ///
    /// # Errors
    ///
    /// Same as [`Driver::set`].
    pub fn set_instrument(&mut self, attribute: &str, value: impl Into<Value>) -> IviResult<()> {
        let model = Arc::clone(&self.model);
        let attr = lookup(&model, attribute, Scope::Instrument)?;
        self.write_slot(attr, None, value.into())
    }

    /// Read a float channel attribute.
    ///
    /// # Errors
    ///
    /// As [`Driver::get`]; [`IviError::UnsupportedValue`] when the attribute
    /// is not numeric.
    pub fn get_f64(&mut self, attribute: &str, channel: impl Into<ChannelSelector>) -> IviResult<f64> {
        let value = self.get(attribute, channel)?;
        value
            .as_f64()
            .ok_or_else(|| IviError::unsupported(attribute, value))
    }

    /// Read a boolean channel attribute.
    ///
    /// # Errors
    ///
    /// As [`Driver::get`]; [`IviError::UnsupportedValue`] when the attribute
    /// is not a flag.
    pub fn get_bool(&mut self, attribute: &str, channel: impl Into<ChannelSelector>) -> IviResult<bool> {
        let value = self.get(attribute, channel)?;
        value
            .as_bool()
            .ok_or_else(|| IviError::unsupported(attribute, value))
    }

    /// Read an enumerated or text channel attribute.
    ///
    /// # Errors
    ///
    /// As [`Driver::get`]; [`IviError::UnsupportedValue`] when the attribute
    /// is not textual.
    pub fn get_token(&mut self, attribute: &str, channel: impl Into<ChannelSelector>) -> IviResult<String> {
        match self.get(attribute, channel)? {
            Value::Text(token) => Ok(token),
            other => Err(IviError::unsupported(attribute, other)),
        }
    }

    fn read_slot(&mut self, attr: &AttributeDef, index: Option<usize>) -> IviResult<Value> {
        let cached = self
            .cache
            .get(&attr.name, index)
            .cloned()
            .unwrap_or_else(|| attr.kind.zero_value());

        let Some(template) = attr.query.as_deref() else {
            return Ok(cached);
        };
        if self.simulate || self.cache.is_valid(&attr.name, index) {
            debug!("cache hit: {}[{:?}]", attr.name, index);
            return Ok(cached);
        }

        debug!("cache miss: {}[{:?}]", attr.name, index);
        let vars = self.template_key(attr, index)?;
        let command = self.render(template, index, &vars)?;
        self.select_channel(index)?;
        let reply = self.transport()?.ask(&command)?;
        let value = attr.kind.parse_reply(&attr.name, &command, &reply)?;
        self.cache.set(&attr.name, index, value.clone());
        Ok(value)
    }

    fn write_slot(&mut self, attr: &AttributeDef, index: Option<usize>, value: Value) -> IviResult<()> {
        if !attr.is_writable() {
            return Err(IviError::ReadOnly(attr.name.clone()));
        }
        let spec = index.map(|i| &self.specs[i]);
        let value = attr.validate(value, spec)?;

        if let Some(template) = attr.write.as_deref() {
            let mut vars = self.template_key(attr, index)?;
            if !self.simulate {
                let token = attr.kind.wire_token(&attr.name, &value)?;
                if token.contains(';') {
                    for (i, field) in token.split(';').enumerate() {
                        vars.push(var(&format!("value{i}"), field));
                    }
                }
                vars.push(var("value", token));
                let command = self.render(template, index, &vars)?;
                self.select_channel(index)?;
                self.transport()?.write(&command)?;
            }
        } else {
            debug!("local write: {}[{:?}]", attr.name, index);
        }

        self.apply_side_effects(attr, index);
        self.cache.set(&attr.name, index, value);
        Ok(())
    }

    /// `{key}` for an attribute keyed by another one; empty otherwise.
    fn template_key(&mut self, attr: &AttributeDef, index: Option<usize>) -> IviResult<Vec<(String, String)>> {
        let Some(key) = &attr.key else {
            return Ok(Vec::new());
        };
        let model = Arc::clone(&self.model);
        let source = lookup(&model, &key.attribute, attr.scope)?;
        let selected = self.read_slot(source, index)?;
        let token = selected.as_str().unwrap_or_default();
        let wire = key.values.to_wire(token).ok_or_else(|| {
            IviError::NotSupported(format!("{} while {} is '{token}'", attr.name, key.attribute))
        })?;
        Ok(vec![var("key", wire)])
    }

    fn apply_side_effects(&mut self, attr: &AttributeDef, index: Option<usize>) {
        for effect in &attr.invalidates {
            match effect {
                Invalidation::SameAttributeAllChannels => self.cache.invalidate(&attr.name, Slot::All),
                Invalidation::Attributes(names) => {
                    for name in names {
                        let slot = match (self.model.attribute(name).map(|a| a.scope), index) {
                            (Some(Scope::Instrument), _) => Slot::One(None),
                            (_, Some(i)) => Slot::One(Some(i)),
                            (_, None) => Slot::All,
                        };
                        self.cache.invalidate(name, slot);
                    }
                }
                Invalidation::Everything => self.cache.invalidate_all(),
            }
        }
    }

    // ------------------------------------------------------------------
    // Range and limits
    // ------------------------------------------------------------------

    /// Select the tightest range covering `value` and narrow the channel's
    /// working maxima to it.
    ///
    /// Returns `None` without doing anything on channels with fewer than two
    /// ranges.
    ///
    /// # Errors
    ///
    /// [`IviError::OutOfRange`] when no range covers the value; transport
    /// errors leave the working maxima unchanged.
    pub fn configure_range(
        &mut self,
        channel: impl Into<ChannelSelector>,
        quantity: Quantity,
        value: f64,
    ) -> IviResult<Option<String>> {
        let index = self.channels.resolve(&channel.into())?;
        if self.specs[index].ranges.len() < 2 {
            debug!("{}: single range, nothing to select", self.channel_label(index));
            return Ok(None);
        }

        let selected = range::select_range(&self.specs[index].ranges, quantity, value)?.clone();

        if !self.simulate {
            let template = self
                .model
                .commands
                .configure_range
                .clone()
                .ok_or_else(|| IviError::NotSupported("configure_range".to_string()))?;
            let command = self.render(&template, Some(index), &[var("range", &selected.name)])?;
            self.select_channel(Some(index))?;
            self.transport()?.write(&command)?;
        }

        self.specs[index].apply_range(&selected);
        let model = Arc::clone(&self.model);
        for name in &model.range_dependent {
            self.cache.invalidate(name, Slot::One(Some(index)));
        }

        info!(
            "{}: selected range {} for {} {}",
            self.channel_label(index),
            selected.name,
            quantity,
            value
        );
        Ok(Some(selected.name))
    }

    /// Set the current limit behavior, then the limit.
    ///
    /// Both attributes are looked up before anything is written.
    ///
    /// # Errors
    ///
    /// As [`Driver::set`].
    pub fn configure_current_limit(
        &mut self,
        channel: impl Into<ChannelSelector>,
        behavior: &str,
        limit: f64,
    ) -> IviResult<()> {
        let index = self.channels.resolve(&channel.into())?;
        let model = Arc::clone(&self.model);
        let behavior_attr = writable(&model, "current_limit_behavior")?;
        let limit_attr = writable(&model, "current_limit")?;
        self.write_slot(behavior_attr, Some(index), Value::from(behavior))?;
        self.write_slot(limit_attr, Some(index), Value::Float(limit))
    }

    /// Configure over-voltage protection. The limit is only written when
    /// protection is being enabled.
    ///
    /// Both attributes are looked up before anything is written, so a model
    /// lacking either one fails without touching the instrument.
    ///
    /// # Errors
    ///
    /// As [`Driver::set`].
    pub fn configure_ovp(&mut self, channel: impl Into<ChannelSelector>, enabled: bool, limit: f64) -> IviResult<()> {
        let index = self.channels.resolve(&channel.into())?;
        let model = Arc::clone(&self.model);
        let limit_attr = writable(&model, "ovp_limit")?;
        let enabled_attr = writable(&model, "ovp_enabled")?;
        if enabled {
            self.write_slot(limit_attr, Some(index), Value::Float(limit))?;
        }
        self.write_slot(enabled_attr, Some(index), Value::Bool(enabled))
    }

    /// Maximum current limit available at `voltage_level`.
    ///
    /// # Errors
    ///
    /// [`IviError::OutOfRange`] when the voltage exceeds the channel's
    /// working maximum.
    pub fn query_current_limit_max(&self, channel: impl Into<ChannelSelector>, voltage_level: f64) -> IviResult<f64> {
        let spec = self.channel_spec(channel)?;
        if !(0.0..=spec.voltage_max).contains(&voltage_level) {
            return Err(IviError::out_of_range("voltage_level", voltage_level, 0.0, spec.voltage_max));
        }
        Ok(spec.current_max)
    }

    /// Maximum voltage level available at `current_limit`.
    ///
    /// # Errors
    ///
    /// [`IviError::OutOfRange`] when the current exceeds the channel's
    /// working maximum.
    pub fn query_voltage_level_max(&self, channel: impl Into<ChannelSelector>, current_limit: f64) -> IviResult<f64> {
        let spec = self.channel_spec(channel)?;
        if !(0.0..=spec.current_max).contains(&current_limit) {
            return Err(IviError::out_of_range("current_limit", current_limit, 0.0, spec.current_max));
        }
        Ok(spec.voltage_max)
    }

    // ------------------------------------------------------------------
    // Identity and utility
    // ------------------------------------------------------------------

    /// Identity fields, queried once and cached.
    ///
    /// # Errors
    ///
    /// [`IviError::NotSupported`] without an identification command,
    /// [`IviError::MalformedResponse`] when fewer than four fields come back.
    pub fn identity(&mut self) -> IviResult<Identity> {
        if self.simulate {
            return Ok(Identity {
                manufacturer: SIMULATED_IDENTITY.to_string(),
                model: SIMULATED_IDENTITY.to_string(),
                serial_number: SIMULATED_IDENTITY.to_string(),
                firmware_revision: SIMULATED_IDENTITY.to_string(),
            });
        }

        if !IDENTITY_SLOTS.iter().all(|slot| self.cache.is_valid(slot, None)) {
            self.load_identity()?;
        }
        let field = |slot: &str| {
            self.cache
                .get(slot, None)
                .map(Value::to_string)
                .unwrap_or_default()
        };
        Ok(Identity {
            manufacturer: field(IDENTITY_MANUFACTURER),
            model: field(IDENTITY_MODEL),
            serial_number: field(IDENTITY_SERIAL),
            firmware_revision: field(IDENTITY_FIRMWARE),
        })
    }

    fn load_identity(&mut self) -> IviResult<()> {
        if let Some(queries) = self.model.commands.identity_queries.clone() {
            let model = self.transport()?.ask(&queries.model)?;
            let firmware = self.transport()?.ask(&queries.firmware)?;
            let manufacturer = self.model.manufacturer.clone();
            for (slot, field) in [
                (IDENTITY_MANUFACTURER, manufacturer),
                (IDENTITY_MODEL, model.trim().to_string()),
                (IDENTITY_SERIAL, String::new()),
                (IDENTITY_FIRMWARE, firmware.trim().to_string()),
            ] {
                self.cache.set(slot, None, Value::Text(field));
            }
            return Ok(());
        }

        let command = self
            .model
            .commands
            .identify
            .clone()
            .ok_or_else(|| IviError::NotSupported("identity".to_string()))?;
        let reply = self.transport()?.ask(&command)?;
        let fields: Vec<&str> = reply.split(',').map(str::trim).collect();
        if fields.len() < 4 {
            return Err(IviError::malformed(command, reply));
        }
        for (slot, field) in IDENTITY_SLOTS.iter().zip(&fields) {
            self.cache.set(slot, None, Value::Text((*field).to_string()));
        }
        Ok(())
    }

    /// Manufacturer reported by the instrument.
    ///
    /// # Errors
    ///
    /// See [`Driver::identity`].
    pub fn identity_manufacturer(&mut self) -> IviResult<String> {
        self.identity().map(|id| id.manufacturer)
    }

    /// Model reported by the instrument.
    ///
    /// # Errors
    ///
    /// See [`Driver::identity`].
    pub fn identity_model(&mut self) -> IviResult<String> {
        self.identity().map(|id| id.model)
    }

    /// Firmware revision reported by the instrument.
    ///
    /// # Errors
    ///
    /// See [`Driver::identity`].
    pub fn identity_firmware_revision(&mut self) -> IviResult<String> {
        self.identity().map(|id| id.firmware_revision)
    }

    /// Reset the instrument and invalidate every cached attribute.
    ///
    /// # Errors
    ///
    /// Transport errors.
    pub fn utility_reset(&mut self) -> IviResult<()> {
        if self.simulate {
            return Ok(());
        }
        let command = self
            .model
            .commands
            .reset
            .clone()
            .ok_or_else(|| IviError::NotSupported("reset".to_string()))?;
        self.transport()?.write(&command)?;
        self.cache.invalidate_all();
        info!("{} reset", self.model.name);
        Ok(())
    }

    /// Pop one entry of the instrument's error queue.
    ///
    /// # Errors
    ///
    /// [`IviError::MalformedResponse`] when the reply is not
    /// `code,"message"`.
    pub fn utility_error_query(&mut self) -> IviResult<(i32, String)> {
        if self.simulate {
            return Ok((0, "No error".to_string()));
        }
        let command = self
            .model
            .commands
            .error_query
            .clone()
            .ok_or_else(|| IviError::NotSupported("error_query".to_string()))?;
        let reply = self.transport()?.ask(&command)?;
        let (code, message) = reply
            .split_once(',')
            .ok_or_else(|| IviError::malformed(command.as_str(), reply.as_str()))?;
        let code = code
            .trim()
            .parse::<i32>()
            .map_err(|_| IviError::malformed(command.as_str(), reply.as_str()))?;
        let message = message.trim_matches(|c: char| c == ' ' || c == '"' || c.is_whitespace());
        Ok((code, message.to_string()))
    }

    /// Run the instrument self test.
    ///
    /// Models declaring a self-test wait get the query written, the wait,
    /// and then a raw read of the reply.
    ///
    /// # Errors
    ///
    /// [`IviError::MalformedResponse`] for a non-numeric result.
    pub fn utility_self_test(&mut self) -> IviResult<(i32, String)> {
        if self.simulate {
            return Ok((0, "Self test passed".to_string()));
        }
        let command = self
            .model
            .commands
            .self_test
            .clone()
            .ok_or_else(|| IviError::NotSupported("self_test".to_string()))?;
        let wait = self.model.commands.self_test_wait_ms;

        let reply = if wait > 0 {
            self.transport()?.write(&command)?;
            debug!("waiting {} ms for self test", wait);
            std::thread::sleep(Duration::from_millis(wait));
            let raw = self.transport()?.read_raw()?;
            String::from_utf8_lossy(&raw).into_owned()
        } else {
            self.transport()?.ask(&command)?
        };

        let code = value::parse_i64(&reply)
            .and_then(|c| i32::try_from(c).ok())
            .ok_or_else(|| IviError::malformed(command.as_str(), reply.trim()))?;
        let message = if code == 0 {
            "Self test passed"
        } else {
            "Self test failed"
        };
        Ok((code, message.to_string()))
    }

    // ------------------------------------------------------------------
    // Measurement and status
    // ------------------------------------------------------------------

    /// Measure voltage or current on a channel. Never cached.
    ///
    /// # Errors
    ///
    /// [`IviError::NotSupported`] when the model cannot measure the
    /// quantity; [`IviError::MalformedResponse`] for a non-numeric reply.
    pub fn measure(&mut self, channel: impl Into<ChannelSelector>, quantity: Quantity) -> IviResult<f64> {
        let index = self.channels.resolve(&channel.into())?;
        let template = match quantity {
            Quantity::Voltage => self.model.commands.measure_voltage.clone(),
            Quantity::Current => self.model.commands.measure_current.clone(),
        }
        .ok_or_else(|| IviError::NotSupported(format!("measure {quantity}")))?;

        if self.simulate {
            return Ok(0.0);
        }
        let command = self.render(&template, Some(index), &[])?;
        self.select_channel(Some(index))?;
        let reply = self.transport()?.ask(&command)?;
        value::parse_f64(&reply).ok_or_else(|| IviError::malformed(command, reply))
    }

    /// Check a regulation or protection state bit.
    ///
    /// # Errors
    ///
    /// [`IviError::NotSupported`] without a status register;
    /// [`IviError::MalformedResponse`] for a non-integer reply.
    pub fn query_output_state(&mut self, channel: impl Into<ChannelSelector>, state: OutputState) -> IviResult<bool> {
        let index = self.channels.resolve(&channel.into())?;
        let register = self
            .model
            .commands
            .status
            .clone()
            .ok_or_else(|| IviError::NotSupported("query_output_state".to_string()))?;
        if self.simulate {
            return Ok(false);
        }

        let command = self.render(&register.query, Some(index), &[])?;
        let reply = self.transport()?.ask(&command)?;
        let status = value::parse_i64(&reply)
            .and_then(|s| u32::try_from(s).ok())
            .ok_or_else(|| IviError::malformed(command, reply))?;

        Ok(match state {
            OutputState::ConstantVoltage => status & register.constant_voltage != 0,
            OutputState::ConstantCurrent => status & register.constant_current != 0,
            OutputState::OverVoltage => status & register.over_voltage != 0,
            OutputState::OverCurrent => status & register.over_current != 0,
            OutputState::Unregulated => {
                status & (register.constant_voltage | register.constant_current) == 0
            }
        })
    }

    /// Clear tripped protection on a channel.
    ///
    /// # Errors
    ///
    /// [`IviError::NotSupported`] when the model has no clear command.
    pub fn reset_output_protection(&mut self, channel: impl Into<ChannelSelector>) -> IviResult<()> {
        let index = self.channels.resolve(&channel.into())?;
        let commands = self.model.commands.protection_clear.clone();
        if commands.is_empty() {
            return Err(IviError::NotSupported("reset_output_protection".to_string()));
        }
        if self.simulate {
            return Ok(());
        }
        if self.model.commands.protection_clear_per_channel {
            self.select_channel(Some(index))?;
        }
        for template in &commands {
            let command = self.render(template, Some(index), &[])?;
            self.transport()?.write(&command)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Memory and trigger
    // ------------------------------------------------------------------

    /// Number of memory slots.
    pub fn memory_size(&self) -> usize {
        self.model.memory_size
    }

    fn memory_command(&self, template: Option<&String>, operation: &str, index: usize) -> IviResult<String> {
        let template = template
            .filter(|_| self.model.memory_size > 0)
            .ok_or_else(|| IviError::NotSupported(operation.to_string()))?;
        if !(1..=self.model.memory_size).contains(&index) {
            return Err(IviError::out_of_range(
                "memory index",
                index as f64,
                1.0,
                self.model.memory_size as f64,
            ));
        }
        self.render(template, None, &[var("index", index.to_string())])
    }

    /// Save the instrument settings to slot `index` (1-based).
    ///
    /// # Errors
    ///
    /// [`IviError::OutOfRange`] outside `1..=memory_size`.
    pub fn memory_save(&mut self, index: usize) -> IviResult<()> {
        let command = self.memory_command(self.model.commands.memory_save.as_ref(), "memory_save", index)?;
        if !self.simulate {
            self.transport()?.write(&command)?;
        }
        Ok(())
    }

    /// Recall settings from slot `index` (1-based). Every cached attribute
    /// becomes invalid.
    ///
    /// # Errors
    ///
    /// [`IviError::OutOfRange`] outside `1..=memory_size`.
    pub fn memory_recall(&mut self, index: usize) -> IviResult<()> {
        let command = self.memory_command(self.model.commands.memory_recall.as_ref(), "memory_recall", index)?;
        if !self.simulate {
            self.transport()?.write(&command)?;
        }
        self.cache.invalidate_all();
        Ok(())
    }

    fn simple_command(&mut self, template: Option<String>, operation: &str) -> IviResult<()> {
        let command = template.ok_or_else(|| IviError::NotSupported(operation.to_string()))?;
        if !self.simulate {
            self.transport()?.write(&command)?;
        }
        Ok(())
    }

    /// Arm the trigger system. Attributes the model lists as changed by an
    /// acquisition become invalid.
    ///
    /// # Errors
    ///
    /// [`IviError::NotSupported`] when the model has no such command.
    pub fn trigger_initiate(&mut self) -> IviResult<()> {
        let template = self.model.commands.trigger_initiate.clone();
        self.simple_command(template, "trigger_initiate")?;
        let model = Arc::clone(&self.model);
        for name in &model.commands.initiate_invalidates {
            let slot = match model.attribute(name).map(|a| a.scope) {
                Some(Scope::Instrument) => Slot::One(None),
                _ => Slot::All,
            };
            self.cache.invalidate(name, slot);
        }
        Ok(())
    }

    /// Let the instrument set itself up for the applied signal. Every cached
    /// attribute becomes invalid.
    ///
    /// # Errors
    ///
    /// [`IviError::NotSupported`] when the model has no such command.
    pub fn auto_setup(&mut self) -> IviResult<()> {
        let template = self.model.commands.auto_setup.clone();
        self.simple_command(template, "auto_setup")?;
        self.cache.invalidate_all();
        Ok(())
    }

    /// Abort a pending trigger.
    ///
    /// # Errors
    ///
    /// [`IviError::NotSupported`] when the model has no such command.
    pub fn trigger_abort(&mut self) -> IviResult<()> {
        let template = self.model.commands.trigger_abort.clone();
        self.simple_command(template, "trigger_abort")
    }

    /// Send a software trigger.
    ///
    /// # Errors
    ///
    /// [`IviError::NotSupported`] when the model has no such command.
    pub fn send_software_trigger(&mut self) -> IviResult<()> {
        let template = self.model.commands.software_trigger.clone();
        self.simple_command(template, "send_software_trigger")
    }

    // ------------------------------------------------------------------
    // Binary transfers
    // ------------------------------------------------------------------

    /// Fetch the instrument setup as an opaque blob.
    ///
    /// # Errors
    ///
    /// [`IviError::NotSupported`] without a setup query;
    /// [`IviError::MalformedResponse`] for a bad block.
    pub fn fetch_setup(&mut self) -> IviResult<Vec<u8>> {
        let command = self
            .model
            .commands
            .fetch_setup
            .clone()
            .ok_or_else(|| IviError::NotSupported("fetch_setup".to_string()))?;
        if self.simulate {
            return Ok(Vec::new());
        }
        self.transport()?.write(&command)?;
        let data = self.transport()?.read_raw()?;
        block::decode_block(&data)
    }

    /// Send a setup blob previously returned by [`Driver::fetch_setup`].
    /// Every cached attribute becomes invalid.
    ///
    /// # Errors
    ///
    /// [`IviError::NotSupported`] without a setup command.
    pub fn load_setup(&mut self, setup: &[u8]) -> IviResult<()> {
        let prefix = self
            .model
            .commands
            .load_setup
            .clone()
            .ok_or_else(|| IviError::NotSupported("load_setup".to_string()))?;
        if !self.simulate {
            let mut message = prefix.into_bytes();
            message.extend_from_slice(&block::encode_block(setup));
            message.push(b'\n');
            self.transport()?.write_raw(&message)?;
        }
        self.cache.invalidate_all();
        Ok(())
    }

    /// Capture the screen in `format` (a token of the model's screenshot
    /// format mapping), optionally with inverted colours.
    ///
    /// # Errors
    ///
    /// [`IviError::UnsupportedValue`] for an unknown format,
    /// [`IviError::NotSupported`] when the model cannot take screenshots.
    pub fn fetch_screenshot(&mut self, format: &str, invert: bool) -> IviResult<Vec<u8>> {
        let screenshot = self
            .model
            .commands
            .screenshot
            .clone()
            .ok_or_else(|| IviError::NotSupported("fetch_screenshot".to_string()))?;
        let wire_format = screenshot
            .formats
            .to_wire(format)
            .ok_or_else(|| IviError::unsupported("screenshot format", format))?
            .to_string();
        if self.simulate {
            return Ok(Vec::new());
        }

        if let Some(prepare) = &screenshot.prepare {
            let command = self.render(prepare, None, &[var("invert", value::format_bool(invert))])?;
            self.transport()?.write(&command)?;
        }
        let command = self.render(&screenshot.fetch, None, &[var("format", wire_format)])?;
        self.transport()?.write(&command)?;
        let data = self.transport()?.read_raw()?;
        block::decode_block(&data)
    }

    // ------------------------------------------------------------------
    // Waveforms and traces
    // ------------------------------------------------------------------

    /// Transfer the record of a scope channel as `(time, voltage)` points.
    /// A simulating driver returns no points.
    ///
    /// # Errors
    ///
    /// [`IviError::InvalidAcquisitionType`] for a peak detect record,
    /// [`IviError::MalformedResponse`] for a bad preamble or block.
    pub fn fetch_waveform(&mut self, channel: impl Into<ChannelSelector>) -> IviResult<Vec<(f64, f64)>> {
        let index = self.channels.resolve(&channel.into())?;
        let commands = self
            .model
            .commands
            .waveform
            .clone()
            .ok_or_else(|| IviError::NotSupported("fetch_waveform".to_string()))?;
        if self.simulate {
            return Ok(Vec::new());
        }

        for template in &commands.setup {
            let command = self.render(template, Some(index), &[])?;
            self.transport()?.write(&command)?;
        }
        let reply = self.transport()?.ask(&commands.preamble)?;
        let preamble = Preamble::parse(&commands.preamble, &reply)?;
        self.transport()?.write(&commands.data)?;
        let data = self.transport()?.read_raw()?;
        let points = preamble.decode(&block::decode_block(&data)?)?;
        debug!("{}: fetched {} waveform points", self.channel_label(index), points.len());
        Ok(points)
    }

    /// Run one automatic measurement on a channel. Ratio, phase and delay
    /// style functions compare against `reference`. A simulating driver
    /// answers `0.0` after validating the request.
    ///
    /// # Errors
    ///
    /// [`IviError::UnsupportedValue`] for an unknown function,
    /// [`IviError::UnknownChannel`] for a missing or unknown reference.
    pub fn fetch_waveform_measurement(
        &mut self,
        channel: impl Into<ChannelSelector>,
        function: &str,
        reference: Option<ChannelSelector>,
    ) -> IviResult<f64> {
        let index = self.channels.resolve(&channel.into())?;
        let measurement = self
            .model
            .commands
            .waveform_measurement
            .clone()
            .ok_or_else(|| IviError::NotSupported("fetch_waveform_measurement".to_string()))?;
        let wire = measurement
            .functions
            .to_wire(function)
            .ok_or_else(|| IviError::unsupported("measurement_function", function))?;

        let reference = if measurement.reference_functions.iter().any(|f| f == function) {
            let selector = reference
                .ok_or_else(|| IviError::UnknownChannel(format!("no reference channel for {function}")))?;
            let ref_index = self.channels.resolve(&selector)?;
            self.channels.name(ref_index).map(str::to_string)
        } else {
            None
        };
        if self.simulate {
            return Ok(0.0);
        }

        let name = self.channels.name(index).unwrap_or_default();
        let query = waveform::measurement_query(&measurement.prefix, wire, name, reference.as_deref());
        let reply = self.transport()?.ask(&query)?;
        value::parse_f64(&reply).ok_or_else(|| IviError::malformed(query, reply))
    }

    /// Transfer the amplitudes of a spectrum analyzer trace. A simulating
    /// driver returns no points.
    ///
    /// # Errors
    ///
    /// [`IviError::MalformedResponse`] when a point is not numeric.
    pub fn fetch_trace(&mut self, channel: impl Into<ChannelSelector>) -> IviResult<Vec<f64>> {
        let index = self.channels.resolve(&channel.into())?;
        let trace = self
            .model
            .commands
            .trace
            .clone()
            .ok_or_else(|| IviError::NotSupported("fetch_trace".to_string()))?;
        if self.simulate {
            return Ok(Vec::new());
        }

        if let Some(prepare) = &trace.prepare {
            self.transport()?.write(prepare)?;
        }
        let command = self.render(&trace.fetch, Some(index), &[])?;
        let reply = self.transport()?.ask(&command)?;
        if reply.trim().is_empty() {
            return Ok(Vec::new());
        }
        reply
            .split(',')
            .map(|point| value::parse_f64(point).ok_or_else(|| IviError::malformed(command.as_str(), point.trim())))
            .collect()
    }

    // ------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------

    fn transport(&mut self) -> IviResult<&mut Box<dyn Transport>> {
        let name = &self.model.name;
        self.transport
            .as_mut()
            .ok_or_else(|| IviError::NotConnected(name.clone()))
    }

    fn select_channel(&mut self, index: Option<usize>) -> IviResult<()> {
        let Some(index) = index else {
            return Ok(());
        };
        if self.channels.len() < 2 {
            return Ok(());
        }
        if let Some(template) = self.model.commands.select_channel.clone() {
            let command = self.render(&template, Some(index), &[])?;
            self.transport()?.write(&command)?;
        }
        Ok(())
    }

    fn render(&self, template: &str, index: Option<usize>, extra: &[(String, String)]) -> IviResult<String> {
        let mut vars: HashMap<String, String> = HashMap::new();
        if let Some(index) = index {
            vars.insert("ch".to_string(), (index + 1).to_string());
            if let Some(name) = self.channels.name(index) {
                vars.insert("name".to_string(), name.to_string());
            }
        }
        for (key, value) in extra {
            vars.insert(key.clone(), value.clone());
        }
        strfmt::strfmt(template, &vars).map_err(|e| IviError::Template {
            template: template.to_string(),
            reason: e.to_string(),
        })
    }

    fn channel_label(&self, index: usize) -> String {
        format!("{}/{}", self.model.name, self.channels.name(index).unwrap_or("?"))
    }
}

fn var(key: &str, value: impl Into<String>) -> (String, String) {
    (key.to_string(), value.into())
}

fn writable<'a>(model: &'a ModelDescription, name: &str) -> IviResult<&'a AttributeDef> {
    let attr = lookup(model, name, Scope::Channel)?;
    if !attr.is_writable() {
        return Err(IviError::ReadOnly(name.to_string()));
    }
    Ok(attr)
}

fn lookup<'a>(model: &'a ModelDescription, name: &str, scope: Scope) -> IviResult<&'a AttributeDef> {
    match model.attribute(name) {
        Some(attr) if attr.scope == scope => Ok(attr),
        Some(attr) => Err(IviError::UnknownAttribute(format!(
            "{name} is a {} attribute, not a {scope} attribute",
            attr.scope
        ))),
        None => Err(IviError::UnknownAttribute(name.to_string())),
    }
}
