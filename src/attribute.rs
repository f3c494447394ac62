//! Declarative attribute descriptions.
//!
//! An [`AttributeDef`] says everything the driver engine needs to know about
//! one IVI attribute: its value kind, whether it lives per channel or on the
//! instrument, the command templates used to read and write it, the limit a
//! numeric write is checked against and which cache slots a successful write
//! makes stale.
//!
//! Attributes without a query template are write-only (reads return the
//! cached value); attributes without a write template are read-only.
//! Local attributes have neither: they are driver-side settings that validate
//! and cache writes without any I/O.
//!
//! A template key lets the command depend on another attribute. The U3606A
//! range command, for example, is `volt:dc:range` or `res:range` depending
//! on the active measurement function; the key's mapping turns the current
//! function token into the `{key}` placeholder.
//!
//! # Example
//!
//! ```
//! use rust_ivi::attribute::{AttributeDef, Limit};
//! use rust_ivi::channel::Ceiling;
//! use rust_ivi::value::NumberFormat;
//!
//! let voltage = AttributeDef::float("voltage_level")
//!     .query(":channel{ch}:voltage ?")
//!     .write(":channel{ch}:voltage {value}")
//!     .format(NumberFormat::Fixed(6))
//!     .limit(Limit::Ceiling(Ceiling::Voltage));
//! assert!(voltage.is_readable() && voltage.is_writable());
//! ```

use crate::channel::{Ceiling, ChannelSpec};
use crate::error::{IviError, IviResult};
use crate::mapping::ValueMapping;
use crate::value::{self, NumberFormat, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an attribute's state lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// One slot per channel.
    #[default]
    Channel,
    /// A single instrument-wide slot.
    Instrument,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Channel => f.write_str("channel"),
            Scope::Instrument => f.write_str("instrument"),
        }
    }
}

/// Value kind of an attribute and how it maps to the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttributeKind {
    /// Floating point quantity.
    Float {
        /// Rendering of written values.
        #[serde(default)]
        format: NumberFormat,
    },
    /// On/off flag, written as `1`/`0` unless wire tokens are declared.
    Bool {
        /// Wire tokens for true and false.
        #[serde(default)]
        tokens: Option<BoolTokens>,
        /// Read the flag as this bit of an integer status reply.
        #[serde(default)]
        bit: Option<u32>,
    },
    /// Integer setting.
    Int,
    /// Free text. Replies are stripped of surrounding quotes.
    Text,
    /// One of a fixed set of tokens.
    Enum {
        /// Token ↔ wire table.
        mapping: ValueMapping,
    },
}

/// Wire tokens of a boolean attribute (`auto`/`man`, `run`/`stop`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoolTokens {
    /// Written for `true`.
    pub on: String,
    /// Written for `false`.
    pub off: String,
}

impl AttributeKind {
    /// Short lower-case name of the kind.
    pub fn name(&self) -> &'static str {
        match self {
            AttributeKind::Float { .. } => "float",
            AttributeKind::Bool { .. } => "bool",
            AttributeKind::Int => "int",
            AttributeKind::Text => "text",
            AttributeKind::Enum { .. } => "enum",
        }
    }

    /// Zero value of the kind; the first token for enumerations.
    pub fn zero_value(&self) -> Value {
        match self {
            AttributeKind::Float { .. } => Value::Float(0.0),
            AttributeKind::Bool { .. } => Value::Bool(false),
            AttributeKind::Int => Value::Int(0),
            AttributeKind::Text => Value::Text(String::new()),
            AttributeKind::Enum { mapping } => Value::Text(mapping.first_token().to_string()),
        }
    }

    /// Parse a human-entered value (CLI arguments, table defaults).
    ///
    /// # Errors
    ///
    /// [`IviError::UnsupportedValue`] when `input` is not a value of this kind.
    pub fn parse_input(&self, attribute: &str, input: &str) -> IviResult<Value> {
        let parsed = match self {
            AttributeKind::Float { .. } => value::parse_f64(input).map(Value::Float),
            AttributeKind::Bool { .. } => match input.trim().to_ascii_lowercase().as_str() {
                "true" | "on" | "1" => Some(Value::Bool(true)),
                "false" | "off" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            AttributeKind::Int => value::parse_i64(input).map(Value::Int),
            AttributeKind::Text => Some(Value::Text(input.to_string())),
            AttributeKind::Enum { mapping } => mapping
                .contains_token(input.trim())
                .then(|| Value::Text(input.trim().to_string())),
        };
        parsed.ok_or_else(|| IviError::unsupported(attribute, input))
    }

    /// Parse an instrument reply to `command`.
    ///
    /// # Errors
    ///
    /// [`IviError::MalformedResponse`] for unparsable numbers and flags,
    /// [`IviError::UnrecognizedValue`] for enumerated replies outside the
    /// mapping.
    pub fn parse_reply(&self, attribute: &str, command: &str, reply: &str) -> IviResult<Value> {
        match self {
            AttributeKind::Float { .. } => value::parse_f64(reply)
                .map(Value::Float)
                .ok_or_else(|| IviError::malformed(command, reply)),
            AttributeKind::Bool { tokens, bit } => {
                let reply = reply.trim();
                let flag = match (bit, tokens) {
                    (Some(bit), _) => value::parse_i64(reply)
                        .filter(|v| *v >= 0)
                        .map(|v| v & (1_i64 << bit) != 0),
                    (None, Some(tokens)) if reply.eq_ignore_ascii_case(&tokens.on) => Some(true),
                    (None, Some(tokens)) if reply.eq_ignore_ascii_case(&tokens.off) => Some(false),
                    _ => value::parse_bool(reply),
                };
                flag.map(Value::Bool)
                    .ok_or_else(|| IviError::malformed(command, reply))
            }
            AttributeKind::Int => value::parse_i64(reply)
                .map(Value::Int)
                .ok_or_else(|| IviError::malformed(command, reply)),
            AttributeKind::Text => Ok(Value::Text(unquote(reply).to_string())),
            AttributeKind::Enum { mapping } => mapping
                .from_wire(unquote(reply))
                .map(|token| Value::Text(token.to_string()))
                .ok_or_else(|| IviError::UnrecognizedValue {
                    attribute: attribute.to_string(),
                    response: reply.trim().to_string(),
                }),
        }
    }

    /// Bring `value` into this kind's canonical representation: integers
    /// given to float attributes become floats. Anything else of the wrong
    /// kind, and tokens outside an enumeration, are rejected.
    ///
    /// # Errors
    ///
    /// [`IviError::UnsupportedValue`] on a kind mismatch or unknown token.
    pub fn coerce(&self, attribute: &str, value: Value) -> IviResult<Value> {
        match (self, value) {
            (AttributeKind::Float { .. }, Value::Float(v)) => Ok(Value::Float(v)),
            (AttributeKind::Float { .. }, Value::Int(v)) => Ok(Value::Float(v as f64)),
            (AttributeKind::Bool { .. }, Value::Bool(v)) => Ok(Value::Bool(v)),
            (AttributeKind::Int, Value::Int(v)) => Ok(Value::Int(v)),
            (AttributeKind::Text, Value::Text(v)) => Ok(Value::Text(v)),
            (AttributeKind::Enum { mapping }, Value::Text(token)) if mapping.contains_token(&token) => {
                Ok(Value::Text(token))
            }
            (_, other) => Err(IviError::unsupported(attribute, other)),
        }
    }

    /// Wire text for an already coerced value.
    pub(crate) fn wire_token(&self, attribute: &str, value: &Value) -> IviResult<String> {
        match (self, value) {
            (AttributeKind::Float { format }, Value::Float(v)) => Ok(format.format(*v)),
            (AttributeKind::Bool { tokens: Some(tokens), .. }, Value::Bool(v)) => {
                Ok(if *v { tokens.on.clone() } else { tokens.off.clone() })
            }
            (AttributeKind::Bool { tokens: None, .. }, Value::Bool(v)) => {
                Ok(value::format_bool(*v).to_string())
            }
            (AttributeKind::Int, Value::Int(v)) => Ok(v.to_string()),
            (AttributeKind::Text, Value::Text(v)) => Ok(v.clone()),
            (AttributeKind::Enum { mapping }, Value::Text(token)) => mapping
                .to_wire(token)
                .map(str::to_string)
                .ok_or_else(|| IviError::unsupported(attribute, token)),
            (_, other) => Err(IviError::unsupported(attribute, other)),
        }
    }
}

fn unquote(reply: &str) -> &str {
    reply.trim().trim_matches('"').trim()
}

/// Bound applied to numeric writes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Limit {
    /// Any finite value.
    #[default]
    None,
    /// Any finite value not below zero.
    NonNegative,
    /// `[0, ceiling]` with the ceiling taken from the channel spec.
    Ceiling(Ceiling),
    /// Explicit inclusive bounds.
    Between {
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
}

impl Limit {
    /// Check `value` for `attribute` on a channel described by `spec`.
    ///
    /// Instrument-scope attributes pass `None`; a ceiling limit then only
    /// enforces non-negativity, as does a power ceiling on a channel without
    /// a power maximum. NaN and infinities are rejected by every limit.
    ///
    /// # Errors
    ///
    /// [`IviError::OutOfRange`] when the value falls outside the bound.
    pub fn check(&self, attribute: &str, value: f64, spec: Option<&ChannelSpec>) -> IviResult<()> {
        let (min, max) = match self {
            Limit::None => (f64::NEG_INFINITY, f64::INFINITY),
            Limit::NonNegative => (0.0, f64::INFINITY),
            Limit::Ceiling(ceiling) => (
                0.0,
                spec.and_then(|s| s.ceiling(*ceiling)).unwrap_or(f64::INFINITY),
            ),
            Limit::Between { min, max } => (*min, *max),
        };
        if value.is_finite() && value >= min && value <= max {
            Ok(())
        } else {
            Err(IviError::out_of_range(attribute, value, min, max))
        }
    }
}

/// Cache slots made stale by a successful write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Invalidation {
    /// The same attribute on every channel (shared-bus controls).
    SameAttributeAllChannels,
    /// Other attributes on the written channel (or instrument scope).
    Attributes(Vec<String>),
    /// Every slot of the driver.
    Everything,
}

/// Makes an attribute's commands depend on the value of another attribute.
///
/// `values` maps tokens of the key attribute to the text substituted for
/// `{key}`. Key tokens missing from the mapping make the attribute
/// unavailable while that token is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateKey {
    /// Enumerated attribute in the same scope whose value selects the command.
    pub attribute: String,
    /// Key token to `{key}` text.
    pub values: ValueMapping,
}

/// Description of one attribute of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDef {
    /// Attribute name, e.g. `voltage_level`.
    pub name: String,
    /// Channel or instrument scope.
    #[serde(default)]
    pub scope: Scope,
    /// Value kind.
    pub kind: AttributeKind,
    /// Query template; absent for write-only attributes.
    #[serde(default)]
    pub query: Option<String>,
    /// Write template with a `{value}` placeholder; absent for read-only
    /// attributes.
    #[serde(default)]
    pub write: Option<String>,
    /// Bound for numeric writes.
    #[serde(default)]
    pub limit: Limit,
    /// Default slot value as text, parsed with the attribute's kind.
    #[serde(default)]
    pub default: Option<String>,
    /// Take the default from the channel's ceiling instead.
    #[serde(default)]
    pub default_from: Option<Ceiling>,
    /// Driver-side setting without instrument commands.
    #[serde(default)]
    pub local: bool,
    /// Command selection by another attribute's value.
    #[serde(default)]
    pub key: Option<TemplateKey>,
    /// Side effects of a successful write.
    #[serde(default)]
    pub invalidates: Vec<Invalidation>,
    /// One-line description shown by `describe`.
    #[serde(default)]
    pub description: Option<String>,
}

impl AttributeDef {
    /// Attribute of the given kind with no templates.
    pub fn new(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            scope: Scope::Channel,
            kind,
            query: None,
            write: None,
            limit: Limit::None,
            default: None,
            default_from: None,
            local: false,
            key: None,
            invalidates: Vec::new(),
            description: None,
        }
    }

    /// Float attribute rendered with `%e`, the SCPI default.
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(
            name,
            AttributeKind::Float {
                format: NumberFormat::Scientific,
            },
        )
    }

    /// Boolean attribute.
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(
            name,
            AttributeKind::Bool {
                tokens: None,
                bit: None,
            },
        )
    }

    /// Integer attribute.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::Int)
    }

    /// Text attribute.
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::Text)
    }

    /// Enumerated attribute.
    pub fn enumerated(name: impl Into<String>, mapping: ValueMapping) -> Self {
        Self::new(name, AttributeKind::Enum { mapping })
    }

    /// Move the attribute to instrument scope.
    pub fn instrument_scope(mut self) -> Self {
        self.scope = Scope::Instrument;
        self
    }

    /// Set the query template.
    pub fn query(mut self, template: impl Into<String>) -> Self {
        self.query = Some(template.into());
        self
    }

    /// Set the write template.
    pub fn write(mut self, template: impl Into<String>) -> Self {
        self.write = Some(template.into());
        self
    }

    /// Set the number format; ignored for non-float kinds.
    pub fn format(mut self, format: NumberFormat) -> Self {
        if let AttributeKind::Float { format: f } = &mut self.kind {
            *f = format;
        }
        self
    }

    /// Write `on`/`off` instead of `1`/`0`; ignored for non-boolean kinds.
    pub fn bool_tokens(mut self, on: impl Into<String>, off: impl Into<String>) -> Self {
        if let AttributeKind::Bool { tokens, .. } = &mut self.kind {
            *tokens = Some(BoolTokens {
                on: on.into(),
                off: off.into(),
            });
        }
        self
    }

    /// Read the flag as bit `bit` of an integer reply; ignored for
    /// non-boolean kinds.
    pub fn status_bit(mut self, bit: u32) -> Self {
        if let AttributeKind::Bool { bit: b, .. } = &mut self.kind {
            *b = Some(bit);
        }
        self
    }

    /// Set the write limit.
    pub fn limit(mut self, limit: Limit) -> Self {
        self.limit = limit;
        self
    }

    /// Set the default slot value.
    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Default to the channel's `ceiling`.
    pub fn default_from(mut self, ceiling: Ceiling) -> Self {
        self.default_from = Some(ceiling);
        self
    }

    /// Make the attribute a driver-side setting without I/O.
    pub fn local(mut self) -> Self {
        self.local = true;
        self
    }

    /// Select commands by the value of `attribute`.
    pub fn keyed_by(mut self, attribute: impl Into<String>, values: ValueMapping) -> Self {
        self.key = Some(TemplateKey {
            attribute: attribute.into(),
            values,
        });
        self
    }

    /// Add a write side effect.
    pub fn invalidates(mut self, invalidation: Invalidation) -> Self {
        self.invalidates.push(invalidation);
        self
    }

    /// Set the description.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Whether the attribute can be queried.
    pub fn is_readable(&self) -> bool {
        self.query.is_some()
    }

    /// Whether the attribute can be written.
    pub fn is_writable(&self) -> bool {
        self.write.is_some() || self.local
    }

    /// Value of a freshly created slot when no channel spec applies.
    ///
    /// # Errors
    ///
    /// [`IviError::InvalidModel`] when the declared default does not parse.
    pub fn initial_value(&self) -> IviResult<Value> {
        self.initial_value_for(None)
    }

    /// Value of a freshly created slot on a channel described by `spec`.
    ///
    /// A ceiling default wins over a textual one when a spec is given.
    ///
    /// # Errors
    ///
    /// [`IviError::InvalidModel`] when the declared default does not parse.
    pub fn initial_value_for(&self, spec: Option<&ChannelSpec>) -> IviResult<Value> {
        if let Some(ceiling) = self
            .default_from
            .and_then(|ceiling| spec.and_then(|s| s.ceiling(ceiling)))
        {
            return Ok(Value::Float(ceiling));
        }
        match &self.default {
            Some(text) => self.kind.parse_input(&self.name, text).map_err(|_| {
                IviError::InvalidModel(format!(
                    "default '{text}' of attribute '{}' is not a valid {}",
                    self.name,
                    self.kind.name()
                ))
            }),
            None => Ok(self.kind.zero_value()),
        }
    }

    /// Validate and canonicalise a value about to be written.
    ///
    /// # Errors
    ///
    /// [`IviError::UnsupportedValue`] for a kind mismatch or unknown token,
    /// [`IviError::OutOfRange`] for a numeric value outside the limit.
    pub fn validate(&self, value: Value, spec: Option<&ChannelSpec>) -> IviResult<Value> {
        let value = self.kind.coerce(&self.name, value)?;
        if let Some(number) = value.as_f64() {
            self.limit.check(&self.name, number, spec)?;
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn behavior() -> AttributeDef {
        AttributeDef::enumerated(
            "current_limit_behavior",
            ValueMapping::new([("regulate", "0"), ("trip", "1")]).unwrap(),
        )
    }

    #[test]
    fn test_ceiling_limit_uses_channel_spec() {
        let spec = ChannelSpec::new(32.0, 2.0).with_ovp_max(33.0);
        let ovp = AttributeDef::float("ovp_limit").limit(Limit::Ceiling(Ceiling::Ovp));
        assert!(ovp.validate(Value::Float(33.0), Some(&spec)).is_ok());
        assert!(matches!(
            ovp.validate(Value::Float(33.5), Some(&spec)),
            Err(IviError::OutOfRange { max, .. }) if max == 33.0
        ));
        assert!(ovp.validate(Value::Float(-0.1), Some(&spec)).is_err());
        assert!(ovp.validate(Value::Float(f64::NAN), Some(&spec)).is_err());
    }

    #[test]
    fn test_integer_coerced_for_float_attribute() {
        let spec = ChannelSpec::new(32.0, 2.0);
        let level = AttributeDef::float("voltage_level").limit(Limit::Ceiling(Ceiling::Voltage));
        assert_eq!(level.validate(Value::Int(5), Some(&spec)).unwrap(), Value::Float(5.0));
    }

    #[test]
    fn test_kind_mismatch_is_unsupported() {
        let level = AttributeDef::float("voltage_level");
        assert!(matches!(
            level.validate(Value::Bool(true), None),
            Err(IviError::UnsupportedValue { .. })
        ));
    }

    #[test]
    fn test_enum_token_validation() {
        let attr = behavior();
        assert!(attr.validate(Value::from("trip"), None).is_ok());
        assert!(matches!(
            attr.validate(Value::from("explode"), None),
            Err(IviError::UnsupportedValue { value, .. }) if value == "explode"
        ));
    }

    #[test]
    fn test_parse_reply_errors() {
        let level = AttributeDef::float("voltage_level");
        assert!(matches!(
            level.kind.parse_reply("voltage_level", "source:voltage?", "garbage"),
            Err(IviError::MalformedResponse { .. })
        ));
        let attr = behavior();
        assert!(matches!(
            attr.kind.parse_reply(&attr.name, "x?", "5"),
            Err(IviError::UnrecognizedValue { .. })
        ));
        assert_eq!(
            attr.kind.parse_reply(&attr.name, "x?", "1\n").unwrap(),
            Value::from("trip")
        );
    }

    #[test]
    fn test_text_reply_is_unquoted() {
        let label = AttributeDef::text("label");
        assert_eq!(
            label.kind.parse_reply("label", ":c1:label?", "\"Probe A\"\n").unwrap(),
            Value::from("Probe A")
        );
    }

    #[test]
    fn test_initial_value() {
        assert_eq!(behavior().initial_value().unwrap(), Value::from("regulate"));
        assert_eq!(
            AttributeDef::boolean("ovp_enabled").default_value("true").initial_value().unwrap(),
            Value::Bool(true)
        );
        assert!(AttributeDef::float("x").default_value("abc").initial_value().is_err());
    }

    #[test]
    fn test_wire_tokens() {
        let attr = AttributeDef::float("v").format(NumberFormat::Fixed(3));
        assert_eq!(attr.kind.wire_token("v", &Value::Float(1.5)).unwrap(), "1.500");
        assert_eq!(behavior().kind.wire_token("b", &Value::from("trip")).unwrap(), "1");
        assert_eq!(
            AttributeDef::boolean("e").kind.wire_token("e", &Value::Bool(true)).unwrap(),
            "1"
        );
    }

    #[test]
    fn test_bool_tokens() {
        let auto = AttributeDef::boolean("attenuation_auto").bool_tokens("auto", "man");
        assert_eq!(auto.kind.wire_token("a", &Value::Bool(false)).unwrap(), "man");
        assert_eq!(
            auto.kind.parse_reply("a", "at?", "AUTO\n").unwrap(),
            Value::Bool(true)
        );
        // numeric replies still work
        assert_eq!(auto.kind.parse_reply("a", "at?", "0").unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_status_bit_reply() {
        let running = AttributeDef::boolean("trigger_continuous").status_bit(3);
        assert_eq!(
            running.kind.parse_reply("t", ":oper:cond?", "8").unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            running.kind.parse_reply("t", ":oper:cond?", "7").unwrap(),
            Value::Bool(false)
        );
        assert!(running.kind.parse_reply("t", ":oper:cond?", "-1").is_err());
    }

    #[test]
    fn test_non_finite_values_fail_every_limit() {
        for limit in [
            Limit::None,
            Limit::NonNegative,
            Limit::Ceiling(Ceiling::Power),
            Limit::Between { min: 0.0, max: 1.0 },
        ] {
            assert!(limit.check("x", f64::INFINITY, None).is_err(), "{limit:?}");
            assert!(limit.check("x", f64::NAN, None).is_err(), "{limit:?}");
        }
        assert!(Limit::None.check("x", f64::NEG_INFINITY, None).is_err());
        assert!(Limit::NonNegative.check("x", 1e300, None).is_ok());
    }

    #[test]
    fn test_default_from_ceiling() {
        let spec = ChannelSpec::new(32.0, 2.0).with_ovp_max(33.0);
        let ovp = AttributeDef::float("ovp_limit").default_from(Ceiling::Ovp);
        assert_eq!(ovp.initial_value_for(Some(&spec)).unwrap(), Value::Float(33.0));
        assert_eq!(ovp.initial_value().unwrap(), Value::Float(0.0));
    }

    #[test]
    fn test_local_attribute_is_writable() {
        let attr = AttributeDef::boolean("ovp_enabled").local();
        assert!(attr.is_writable());
        assert!(!attr.is_readable());
    }

    #[test]
    fn test_deserialize_attribute() {
        let toml_src = r#"
            name = "mode"
            kind = { type = "enum", mapping = [["cc", "0"], ["cr", "1"]] }
            query = "STATE:MODE ?"
            write = "STATE:MODE {value}"
            invalidates = [{ attributes = ["level"] }, "same_attribute_all_channels"]
        "#;
        let attr: AttributeDef = toml::from_str(toml_src).unwrap();
        assert_eq!(attr.scope, Scope::Channel);
        assert_eq!(attr.invalidates.len(), 2);
        assert_eq!(attr.initial_value().unwrap(), Value::from("cc"));
    }
}
