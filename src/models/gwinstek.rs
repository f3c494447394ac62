//! GW Instek PST series triple-output supplies.
//!
//! The PST firmware reports and switches the output state of all channels at
//! once, so writing `enabled` on one channel invalidates it on every channel.
//! The same holds for the current protection mode.
//!
//! Over-voltage protection is always armed on these supplies; `ovp_enabled`
//! is kept by the driver so the standard OVP configuration works.

use crate::attribute::{AttributeDef, Invalidation, Limit};
use crate::channel::{Ceiling, ChannelSpec};
use crate::error::IviResult;
use crate::mapping::ValueMapping;
use crate::model::{InstrumentClass, ModelDescription};
use crate::value::NumberFormat;

const MANUFACTURER: &str = "GW Instek";

fn pst(name: &str, channels: Vec<ChannelSpec>) -> IviResult<ModelDescription> {
    let behavior = ValueMapping::new([("regulate", "0"), ("trip", "1")])?;
    let tracking = ValueMapping::new([("independent", "0"), ("series", "1"), ("parallel", "2")])?;

    let mut builder = ModelDescription::builder(name, InstrumentClass::PowerSupply)
        .manufacturer(MANUFACTURER)
        .description(format!("{MANUFACTURER} {name} triple output DC power supply"))
        .supported_models([name])
        .id_prefix(name)
        .memory_size(5);
    for spec in channels {
        builder = builder.channel(spec);
    }

    builder
        .attribute(
            AttributeDef::float("voltage_level")
                .query(":channel{ch}:voltage ?")
                .write(":channel{ch}:voltage {value}")
                .format(NumberFormat::Fixed(6))
                .limit(Limit::Ceiling(Ceiling::Voltage))
                .describe("Programmed output voltage"),
        )
        .attribute(
            AttributeDef::float("current_limit")
                .query(":channel{ch}:current ?")
                .write(":channel{ch}:current {value}")
                .format(NumberFormat::Fixed(6))
                .limit(Limit::Ceiling(Ceiling::Current))
                .default_from(Ceiling::Current)
                .describe("Programmed current limit"),
        )
        .attribute(
            AttributeDef::enumerated("current_limit_behavior", behavior)
                .query(":channel{ch}:protection:current ?")
                .write(":channel{ch}:protection:current {value}")
                .invalidates(Invalidation::SameAttributeAllChannels)
                .describe("Regulate at the limit or trip the output"),
        )
        .attribute(
            AttributeDef::float("ovp_limit")
                .query(":channel{ch}:protection:voltage ?")
                .write(":channel{ch}:protection:voltage {value}")
                .format(NumberFormat::Fixed(6))
                .limit(Limit::Ceiling(Ceiling::Ovp))
                .default_from(Ceiling::Ovp)
                .describe("Over-voltage protection level"),
        )
        .attribute(AttributeDef::boolean("ovp_enabled").local().default_value("true"))
        .attribute(
            AttributeDef::boolean("enabled")
                .query(":output:state ?")
                .write(":output:state {value}")
                .invalidates(Invalidation::SameAttributeAllChannels)
                .describe("Output state, shared by all channels"),
        )
        .attribute(
            AttributeDef::enumerated("tracking_type", tracking)
                .instrument_scope()
                .query(":output:couple:tracking ?")
                .write(":output:couple:tracking {value}")
                .invalidates(Invalidation::Everything)
                .describe("Channel 1/2 tracking mode"),
        )
        .commands(|c| {
            c.measure_voltage = Some(":channel{ch}:measure:voltage ?".to_string());
            c.measure_current = Some(":channel{ch}:measure:current ?".to_string());
            c.protection_clear = vec![":output:protection:clear".to_string()];
            c.memory_save = Some("*sav {index}".to_string());
            c.memory_recall = Some("*rcl {index}".to_string());
        })
        .build()
}

/// PST-3201: three 32 V / 1 A outputs.
pub fn pst3201() -> IviResult<ModelDescription> {
    let output = ChannelSpec::new(32.0, 1.0)
        .with_range("P32V", 33.0, 1.0)
        .with_ovp_max(33.0);
    pst("PST-3201", vec![output.clone(), output.clone(), output])
}

/// PST-3202: two 32 V / 2 A outputs and one 6 V / 5 A output.
pub fn pst3202() -> IviResult<ModelDescription> {
    let output = ChannelSpec::new(32.0, 2.0)
        .with_range("P32V", 33.0, 2.0)
        .with_ovp_max(33.0);
    let low_voltage = ChannelSpec::new(6.0, 5.0)
        .with_range("P6V", 7.0, 5.0)
        .with_ovp_max(7.0);
    pst("PST-3202", vec![output.clone(), output, low_voltage])
}
