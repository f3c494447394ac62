//! Prodigit DC electronic loads.
//!
//! The 3311C modules speak standard SCPI supply commands. The 3000 series
//! mainframes use Prodigit's own short-form vocabulary, where the load state
//! is global and the mode decides which level attributes apply.

use super::scpi;
use crate::attribute::{AttributeDef, Invalidation, Limit};
use crate::channel::{Ceiling, ChannelSpec};
use crate::error::IviResult;
use crate::mapping::ValueMapping;
use crate::model::{InstrumentClass, ModelDescription};
use crate::value::NumberFormat;

const MANUFACTURER: &str = "Prodigit";

fn memory(c: &mut crate::model::Commands) {
    c.measure_voltage = Some("measure:voltage?".to_string());
    c.measure_current = Some("measure:current?".to_string());
    c.memory_save = Some("system:store {index}".to_string());
    c.memory_recall = Some("system:recall {index}".to_string());
}

/// 3311C: 60 V / 60 A load module.
pub fn prodigit_3311c() -> IviResult<ModelDescription> {
    let input = ChannelSpec::new(60.0, 60.0)
        .with_range("P60V", 61.0, 60.0)
        .with_ovp_max(61.0);

    ModelDescription::builder("3311C", InstrumentClass::ElectronicLoad)
        .manufacturer(MANUFACTURER)
        .description("Prodigit 3311C DC electronic load")
        .supported_models(["3310C", "3311C", "3312C", "3314C", "3315C"])
        .channel(input)
        .memory_size(5)
        .range_dependent(["voltage_level", "current_limit"])
        .attributes(scpi::dcpwr_attributes()?)
        .attribute(
            AttributeDef::boolean("dynamic")
                .query("STATE:DYNAMIC ?")
                .write("STATE:DYNAMIC {value}")
                .describe("Switch between the low and high levels"),
        )
        .commands(|c| {
            scpi::dcpwr_commands(c);
            memory(c);
        })
        .build()
}

/// 3000 series mainframe with a single 60 V / 30 A module.
pub fn prodigit_3000() -> IviResult<ModelDescription> {
    let input = ChannelSpec::new(60.0, 30.0)
        .with_range("P60V", 60.0, 30.0)
        .with_ovp_max(66.0)
        .with_ocp_max(33.0);
    let modes = ValueMapping::new([("cc", "0"), ("cr", "1"), ("cv", "2"), ("cp", "3")])?;
    let levels = vec![
        "cc_low".to_string(),
        "cc_high".to_string(),
        "level".to_string(),
    ];

    ModelDescription::builder("3000", InstrumentClass::ElectronicLoad)
        .manufacturer(MANUFACTURER)
        .description("Prodigit 3000 series DC electronic load")
        .supported_models(["3000"])
        .id_prefix("")
        .channel(input)
        .memory_size(10)
        .attribute(
            AttributeDef::boolean("enabled")
                .query("STATE:LOAD?")
                .write("STATE:LOAD {value}")
                .invalidates(Invalidation::SameAttributeAllChannels)
                .describe("Load state, shared by all modules"),
        )
        .attribute(
            AttributeDef::enumerated("mode", modes)
                .query("STATE:MODE ?")
                .write("STATE:MODE {value}")
                .invalidates(Invalidation::Attributes(levels))
                .describe("Constant current, resistance, voltage or power"),
        )
        .attribute(
            AttributeDef::boolean("dynamic")
                .query("STATE:DYNAMIC ?")
                .write("STATE:DYNAMIC {value}"),
        )
        .attribute(
            AttributeDef::float("dynamic_slew")
                .query("SLEW ?")
                .write("SLEW {value}")
                .format(NumberFormat::Fixed(6))
                .limit(Limit::NonNegative),
        )
        .attribute(
            AttributeDef::float("cc_low")
                .query("CC:LOW ?")
                .write("CC:LOW {value}")
                .format(NumberFormat::Fixed(3))
                .limit(Limit::Ceiling(Ceiling::Current)),
        )
        .attribute(
            AttributeDef::float("cc_high")
                .query("CC:HIGH ?")
                .write("CC:HIGH {value}")
                .format(NumberFormat::Fixed(3))
                .limit(Limit::Ceiling(Ceiling::Current)),
        )
        .attribute(
            AttributeDef::integer("level")
                .query("LEVEL ?")
                .write("LEVEL {value}")
                .limit(Limit::Between { min: 0.0, max: 1.0 })
                .describe("Selects the low (0) or high (1) setting"),
        )
        .attribute(
            AttributeDef::integer("range")
                .query("RANGE ?")
                .write("RANGE {value}")
                .limit(Limit::Between { min: 0.0, max: 1.0 })
                .invalidates(Invalidation::Attributes(vec![
                    "cc_low".to_string(),
                    "cc_high".to_string(),
                ])),
        )
        .commands(memory)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_3000_memory_commands() {
        let model = prodigit_3000().unwrap();
        assert_eq!(model.commands.memory_save.as_deref(), Some("system:store {index}"));
        assert_eq!(model.memory_size, 10);
    }

    #[test]
    fn test_3311c_envelope() {
        let model = prodigit_3311c().unwrap();
        assert_eq!(model.channels[0].ranges[0].voltage, 61.0);
        assert_eq!(model.id_prefix(), "3311C");
    }

    #[test]
    fn test_3311c_dynamic_mode() {
        let model = prodigit_3311c().unwrap();
        let dynamic = model.attribute("dynamic").unwrap();
        assert!(dynamic.is_readable() && dynamic.is_writable());
        assert_eq!(dynamic.write.as_deref(), Some("STATE:DYNAMIC {value}"));
    }
}
