//! Agilent instruments: the U3606A multimeter / DC supply, the InfiniiVision
//! 2000A X-series scopes and the 8590E series spectrum analyzers.
//!
//! The U3606A exposes its multimeter function as an instrument-wide
//! enumerated attribute; range, auto range and resolution follow the
//! selected function through template keys. Functions without a range
//! (frequency, period, continuity, diode) report those attributes as not
//! supported.
//!
//! The 8590E predates SCPI: identity comes from `ID?` and `REV?`, and most
//! coupling settings have no remote command, so they are kept in the driver
//! only.

use super::{scope, scpi};
use crate::attribute::{AttributeDef, Invalidation, Limit};
use crate::channel::ChannelSpec;
use crate::error::IviResult;
use crate::mapping::ValueMapping;
use crate::model::{IdentityQueries, InstrumentClass, ModelDescription, TraceCommands};

const MANUFACTURER: &str = "Agilent Technologies";

/// Lowest and highest tunable frequency of the 8590E series.
const SPECAN_FREQUENCY_LOW: f64 = 9e3;
const SPECAN_FREQUENCY_HIGH: f64 = 1.8e9;

/// Key text of every ranged multimeter function, with `suffix` appended.
fn ranged_functions(suffix: &str) -> IviResult<ValueMapping> {
    ValueMapping::new(
        [
            ("dc_volts", "volt:dc"),
            ("ac_volts", "volt:ac"),
            ("dc_current", "curr:dc"),
            ("ac_current", "curr:ac"),
            ("two_wire_resistance", "res"),
            ("four_wire_resistance", "fres"),
        ]
        .map(|(function, root)| (function, format!("{root}:{suffix}"))),
    )
}

/// U3606A: 8 V / 3 A and 30 V / 1 A ranges on one output.
pub fn u3606a() -> IviResult<ModelDescription> {
    let output = ChannelSpec::new(9.0, 3.0)
        .with_range("P8V", 9.0, 3.0)
        .with_range("P30V", 31.0, 1.0)
        .with_ovp_max(32.0);
    let functions = ValueMapping::new([
        ("dc_volts", "volt"),
        ("ac_volts", "volt:ac"),
        ("dc_current", "curr"),
        ("ac_current", "curr:ac"),
        ("two_wire_resistance", "res"),
        ("four_wire_resistance", "fres"),
        ("frequency", "freq"),
        ("period", "per"),
        ("continuity", "cont"),
        ("diode", "diod"),
    ])?;

    ModelDescription::builder("U3606A", InstrumentClass::Multimeter)
        .manufacturer(MANUFACTURER)
        .description("Agilent U3606A multimeter and DC power supply")
        .supported_models(["U3606A"])
        .channel(output)
        .range_dependent(["voltage_level", "current_limit"])
        .attributes(scpi::dcpwr_attributes()?)
        .attribute(
            AttributeDef::enumerated("measurement_function", functions)
                .instrument_scope()
                .query("sense:function?")
                .write("sense:function \"{value}\"")
                .invalidates(Invalidation::Attributes(vec![
                    "range".into(),
                    "auto_range".into(),
                    "resolution".into(),
                ]))
                .describe("Multimeter measurement function"),
        )
        .attribute(
            AttributeDef::float("range")
                .instrument_scope()
                .query("{key}?")
                .write("{key} {value}")
                .limit(Limit::NonNegative)
                .keyed_by("measurement_function", ranged_functions("range")?)
                .describe("Measurement range of the selected function"),
        )
        .attribute(
            AttributeDef::boolean("auto_range")
                .instrument_scope()
                .query("{key}?")
                .write("{key} {value}")
                .keyed_by("measurement_function", ranged_functions("range:auto")?),
        )
        .attribute(
            AttributeDef::float("resolution")
                .instrument_scope()
                .query("{key}?")
                .write("{key} {value}")
                .limit(Limit::NonNegative)
                .keyed_by("measurement_function", ranged_functions("resolution")?),
        )
        .commands(scpi::dcpwr_commands)
        .build()
}

/// InfiniiVision 2000A X-series, analog channels only.
pub fn dsox2000a() -> IviResult<ModelDescription> {
    scope::scope_builder("2000A", scope::bitmap_formats()?)?
        .manufacturer(MANUFACTURER)
        .description("Agilent InfiniiVision 2000A X-series oscilloscope")
        .supported_models([
            "DSOX2002A",
            "DSOX2004A",
            "DSOX2012A",
            "DSOX2014A",
            "DSOX2022A",
            "DSOX2024A",
            "MSOX2002A",
            "MSOX2004A",
            "MSOX2012A",
            "MSOX2014A",
            "MSOX2022A",
            "MSOX2024A",
        ])
        .id_prefix("")
        .build()
}

fn specan_attributes() -> IviResult<Vec<AttributeDef>> {
    let amplitude_units = ValueMapping::new([
        ("dBm", "dbm"),
        ("dBmV", "dbmv"),
        ("dBuV", "dbuv"),
        ("volt", "v"),
        ("watt", "w"),
    ])?;
    let detectors = ValueMapping::new([
        ("maximum_peak", "pos"),
        ("minimum_peak", "neg"),
        ("sample", "smp"),
    ])?;
    let scales = ValueMapping::new([("logarithmic", "log"), ("linear", "lin")])?;
    let tuning = Limit::Between {
        min: SPECAN_FREQUENCY_LOW,
        max: SPECAN_FREQUENCY_HIGH,
    };
    let sweep_coupled = || {
        Invalidation::Attributes(vec![
            "resolution_bandwidth".into(),
            "sweep_time".into(),
            "video_bandwidth".into(),
        ])
    };

    let attributes = vec![
        AttributeDef::enumerated("amplitude_units", amplitude_units)
            .query("aunits?")
            .write("aunits {value}"),
        AttributeDef::float("attenuation")
            .query("at?")
            .write("at {value}")
            .limit(Limit::NonNegative)
            .describe("Input attenuation in dB"),
        AttributeDef::boolean("attenuation_auto")
            .write("at {value}")
            .bool_tokens("auto", "man"),
        AttributeDef::enumerated("detector_type", detectors)
            .query("det?")
            .write(":det {value}"),
        AttributeDef::boolean("detector_type_auto").local(),
        AttributeDef::float("frequency_start")
            .query("fa?")
            .write("fa {value}")
            .limit(tuning)
            .invalidates(sweep_coupled())
            .default_value("9e3"),
        AttributeDef::float("frequency_stop")
            .query("fb?")
            .write("fb {value}")
            .limit(tuning)
            .invalidates(sweep_coupled())
            .default_value("1.8e9"),
        AttributeDef::float("frequency_offset")
            .query("foffset?")
            .write("foffset {value}"),
        AttributeDef::float("input_impedance").local().default_value("50"),
        AttributeDef::integer("number_of_sweeps").local().default_value("1"),
        AttributeDef::float("reference_level")
            .query("rl?")
            .write("rl {value}"),
        AttributeDef::float("reference_level_offset")
            .query("roffset?")
            .write("roffset {value}"),
        AttributeDef::float("resolution_bandwidth")
            .query("rb?")
            .write("rb {value}")
            .limit(Limit::NonNegative),
        AttributeDef::boolean("resolution_bandwidth_auto").local(),
        AttributeDef::boolean("sweep_mode_continuous").local().default_value("true"),
        AttributeDef::float("sweep_time")
            .query("st?")
            .write("st {value}")
            .limit(Limit::NonNegative),
        AttributeDef::boolean("sweep_time_auto").local(),
        AttributeDef::float("video_bandwidth")
            .query("vb?")
            .write("vb {value}")
            .limit(Limit::NonNegative),
        AttributeDef::boolean("video_bandwidth_auto").local(),
        AttributeDef::enumerated("vertical_scale", scales).local(),
    ];
    Ok(attributes.into_iter().map(AttributeDef::instrument_scope).collect())
}

/// 8590E series swept spectrum analyzers with traces A, B and C.
pub fn agilent_8590e() -> IviResult<ModelDescription> {
    ModelDescription::builder("8590E", InstrumentClass::SpectrumAnalyzer)
        .manufacturer(MANUFACTURER)
        .description("Agilent 8590E series spectrum analyzer")
        .supported_models([
            "8590L", "8591C", "8591E", "8591EM", "8592L", "8593E", "8593EM", "8594E", "8594EM",
            "8594L", "8594Q", "8595E", "8595EM", "8596E", "8596EM",
        ])
        .id_prefix("859")
        .channels(ChannelSpec::new(0.0, 0.0), 3)
        .channel_names(["tra", "trb", "trc"])
        .attributes(specan_attributes()?)
        .commands(|c| {
            c.identify = None;
            c.identity_queries = Some(IdentityQueries {
                model: "ID?".to_string(),
                firmware: "REV?".to_string(),
            });
            c.error_query = Some(":system:error?".to_string());
            c.self_test = Some("CNF?".to_string());
            c.self_test_wait_ms = 40_000;
            c.trace = Some(TraceCommands {
                prepare: Some("tdf p".to_string()),
                fetch: "{name}?".to_string(),
            });
        })
        .build()
}
