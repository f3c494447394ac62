//! Standard SCPI command sets shared by several vendors.
//!
//! [`dcpwr_attributes`] and [`dcpwr_commands`] cover the `source:`/`output`
//! subsystem most SCPI supplies implement. [`generic_dcload`] is a complete
//! table for SCPI electronic loads that select channels with
//! `instrument:nselect`.

use crate::attribute::{AttributeDef, Invalidation, Limit};
use crate::channel::{Ceiling, ChannelSpec};
use crate::error::IviResult;
use crate::mapping::ValueMapping;
use crate::model::{Commands, InstrumentClass, ModelDescription, StatusRegister};

fn trigger_sources() -> IviResult<ValueMapping> {
    ValueMapping::new([("immediate", "imm"), ("bus", "bus")])
}

fn current_limit_behaviors() -> IviResult<ValueMapping> {
    ValueMapping::new([("regulate", "0"), ("trip", "1")])
}

/// Channel attributes of a standard SCPI DC supply.
pub fn dcpwr_attributes() -> IviResult<Vec<AttributeDef>> {
    Ok(vec![
        AttributeDef::float("voltage_level")
            .query("source:voltage:level?")
            .write("source:voltage:level {value}")
            .limit(Limit::Ceiling(Ceiling::Voltage))
            .describe("Programmed output voltage"),
        AttributeDef::float("current_limit")
            .query("source:current:level?")
            .write("source:current:level {value}")
            .limit(Limit::Ceiling(Ceiling::Current))
            .describe("Programmed current limit"),
        AttributeDef::enumerated("current_limit_behavior", current_limit_behaviors()?)
            .query("source:current:protection:state?")
            .write("source:current:protection:state {value}")
            .describe("Regulate at the limit or trip the output"),
        AttributeDef::boolean("enabled")
            .query("output?")
            .write("output {value}")
            .describe("Output state"),
        AttributeDef::boolean("ovp_enabled")
            .query("source:voltage:protection:state?")
            .write("source:voltage:protection:state {value}"),
        AttributeDef::float("ovp_limit")
            .query("source:voltage:protection:level?")
            .write("source:voltage:protection:level {value}")
            .limit(Limit::Ceiling(Ceiling::Ovp)),
        AttributeDef::enumerated("trigger_source", trigger_sources()?)
            .query("trigger:source?")
            .write("trigger:source {value}"),
        AttributeDef::float("triggered_voltage_level")
            .query("source:voltage:level:triggered?")
            .write("source:voltage:level:triggered {value}")
            .limit(Limit::Ceiling(Ceiling::Voltage)),
        AttributeDef::float("triggered_current_limit")
            .query("source:current:level:triggered?")
            .write("source:current:level:triggered {value}")
            .limit(Limit::Ceiling(Ceiling::Current)),
    ])
}

/// Utility commands of a standard SCPI DC supply.
pub fn dcpwr_commands(c: &mut Commands) {
    c.select_channel = Some("instrument:nselect {ch}".to_string());
    c.configure_range = Some("source:voltage:range {range}".to_string());
    c.measure_voltage = Some("measure:voltage?".to_string());
    c.measure_current = Some("measure:current?".to_string());
    c.protection_clear = vec!["output:protection:clear".to_string()];
    c.protection_clear_per_channel = true;
    c.trigger_initiate = Some("initiate".to_string());
    c.trigger_abort = Some("abort".to_string());
    c.software_trigger = Some("*trg".to_string());
}

/// Generic SCPI DC electronic load with `channel_count` identical inputs.
///
/// Each input has an 8 V / 20 A and a 20 V / 10 A range. Output state and
/// the current protection state are global on these loads.
pub fn generic_dcload(channel_count: usize) -> IviResult<ModelDescription> {
    let input = ChannelSpec::new(9.0, 20.0)
        .with_range("P8V", 9.0, 20.0)
        .with_range("P20V", 21.0, 10.0)
        .with_ovp_max(22.0)
        .with_ocp_max(22.0);

    ModelDescription::builder("DCLOAD", InstrumentClass::ElectronicLoad)
        .description("Generic SCPI DC electronic load")
        .id_prefix("")
        .channels(input, channel_count)
        .range_dependent(["level", "voltage_level", "current_limit"])
        .attribute(
            AttributeDef::float("level")
                .query("source:current:level?")
                .write("source:current:level {value}")
                .limit(Limit::Ceiling(Ceiling::Current))
                .describe("Load level in the active mode"),
        )
        .attribute(
            AttributeDef::float("current_limit")
                .query("limit:current:low?")
                .write("limit:current:low {value}")
                .limit(Limit::Ceiling(Ceiling::Current)),
        )
        .attribute(
            AttributeDef::enumerated("current_limit_behavior", current_limit_behaviors()?)
                .query("source:current:protection:state?")
                .write("source:current:protection:state {value}")
                .default_value("trip")
                .invalidates(Invalidation::SameAttributeAllChannels)
                .invalidates(Invalidation::Attributes(vec!["ocp_enabled".to_string()])),
        )
        .attribute(
            AttributeDef::boolean("enabled")
                .query("output?")
                .write("output {value}")
                .invalidates(Invalidation::SameAttributeAllChannels)
                .describe("Input state, shared by all channels"),
        )
        .attribute(
            AttributeDef::boolean("ovp_enabled")
                .query("source:voltage:protection:state?")
                .write("source:voltage:protection:state {value}")
                .default_value("true"),
        )
        .attribute(
            AttributeDef::float("ovp_limit")
                .query("source:voltage:protection:level?")
                .write("source:voltage:protection:level {value}")
                .limit(Limit::Ceiling(Ceiling::Ovp)),
        )
        .attribute(
            AttributeDef::float("voltage_level")
                .query("source:voltage:level?")
                .write("source:voltage:level {value}")
                .limit(Limit::Ceiling(Ceiling::Voltage)),
        )
        .attribute(
            AttributeDef::boolean("ocp_enabled")
                .query("source:current:protection:state?")
                .write("source:current:protection:state {value}")
                .invalidates(Invalidation::SameAttributeAllChannels)
                .invalidates(Invalidation::Attributes(vec!["current_limit_behavior".to_string()])),
        )
        .attribute(
            AttributeDef::float("ocp_limit")
                .query("source:current:protection:level?")
                .write("source:current:protection:level {value}")
                .limit(Limit::Ceiling(Ceiling::Ocp)),
        )
        .attribute(
            AttributeDef::enumerated("trigger_source", trigger_sources()?)
                .query("trigger:source?")
                .write("trigger:source {value}"),
        )
        .attribute(
            AttributeDef::float("triggered_current_limit")
                .query("source:current:level:triggered?")
                .write("source:current:level:triggered {value}")
                .limit(Limit::Ceiling(Ceiling::Current)),
        )
        .attribute(
            AttributeDef::float("triggered_voltage_level")
                .query("source:voltage:level:triggered?")
                .write("source:voltage:level:triggered {value}")
                .limit(Limit::Ceiling(Ceiling::Voltage)),
        )
        .attribute(
            AttributeDef::float("trigger_delay")
                .query("trigger:delay?")
                .write("trigger:delay {value}")
                .limit(Limit::NonNegative),
        )
        .commands(|c| {
            c.select_channel = Some("instrument:nselect {ch}".to_string());
            c.configure_range = Some("source:voltage:range {range}".to_string());
            c.measure_voltage = Some("measure:voltage?".to_string());
            c.measure_current = Some("measure:current?".to_string());
            c.status = Some(StatusRegister::scpi_isum());
            c.protection_clear = vec![
                "source:voltage:protection:clear".to_string(),
                "source:current:protection:clear".to_string(),
            ];
            c.protection_clear_per_channel = true;
            c.trigger_initiate = Some("initiate".to_string());
            c.software_trigger = Some("*trg".to_string());
        })
        .build()
}
