//! Oscilloscope command set shared by the InfiniiVision-style scopes.
//!
//! The Agilent InfiniiVision X-series and the LeCroy WaveRunner tables use
//! the same `:channel<n>:`, `:timebase:`, `:trigger:` and `:waveform:`
//! subsystems. [`scope_builder`] returns a builder with all of it filled in;
//! vendor modules add identity details.
//!
//! Only the four analog channels are modelled. Channel commands address the
//! channel by name (`:channel2:offset`), so no select command is needed.

use crate::attribute::{AttributeDef, Invalidation, Limit};
use crate::channel::ChannelSpec;
use crate::error::IviResult;
use crate::mapping::ValueMapping;
use crate::model::{
    InstrumentClass, MeasurementCommands, ModelBuilder, ModelDescription, ScreenshotCommands,
    WaveformCommands,
};

const ANALOG_CHANNELS: usize = 4;

fn channel_attributes() -> IviResult<Vec<AttributeDef>> {
    Ok(vec![
        AttributeDef::boolean("enabled")
            .query(":{name}:display?")
            .write(":{name}:display {value}")
            .describe("Channel shown on screen"),
        AttributeDef::float("offset")
            .query(":{name}:offset?")
            .write(":{name}:offset {value}"),
        AttributeDef::float("range")
            .query(":{name}:range?")
            .write(":{name}:range {value}")
            .limit(Limit::NonNegative)
            .describe("Full-scale vertical range in volts"),
        AttributeDef::enumerated("coupling", ValueMapping::new([("ac", "ac"), ("dc", "dc")])?)
            .query(":{name}:coupling?")
            .write(":{name}:coupling {value}")
            .default_value("dc"),
        // short forms, the instrument answers FIFT / ONEM
        AttributeDef::enumerated(
            "input_impedance",
            ValueMapping::new([("50", "fift"), ("1000000", "onem")])?,
        )
        .query(":{name}:impedance?")
        .write(":{name}:impedance {value}")
        .default_value("1000000")
        .describe("Input impedance in ohms"),
        AttributeDef::float("probe_attenuation")
            .query(":{name}:probe?")
            .write(":{name}:probe {value}")
            .limit(Limit::NonNegative)
            .default_value("1"),
        AttributeDef::float("probe_skew")
            .query(":{name}:probe:skew?")
            .write(":{name}:probe:skew {value}"),
        AttributeDef::boolean("invert")
            .query(":{name}:invert?")
            .write(":{name}:invert {value}"),
        AttributeDef::boolean("bw_limit")
            .query(":{name}:bwlimit?")
            .write(":{name}:bwlimit {value}"),
        AttributeDef::text("label")
            .query(":{name}:label?")
            .write(":{name}:label \"{value}\""),
        AttributeDef::text("probe_id")
            .query(":{name}:probe:id?")
            .default_value("NONE"),
    ])
}

fn trigger_couplings() -> IviResult<ValueMapping> {
    // coupling;noise reject;hf reject
    ValueMapping::new([
        ("ac", "ac;0;0"),
        ("dc", "dc;0;0"),
        ("hf_reject", "dc;0;1"),
        ("lf_reject", "lfr;0;0"),
        ("noise_reject", "dc;1;0"),
        ("hf_reject_ac", "ac;0;1"),
        ("noise_reject_ac", "ac;1;0"),
        ("hf_noise_reject", "dc;1;1"),
        ("hf_noise_reject_ac", "ac;1;1"),
        ("lf_noise_reject", "lfr;1;0"),
    ])
}

fn trigger_sources() -> IviResult<ValueMapping> {
    ValueMapping::new((1..=ANALOG_CHANNELS).map(|n| (format!("channel{n}"), format!("chan{n}"))))
}

fn instrument_attributes() -> IviResult<Vec<AttributeDef>> {
    let acquisition_types = ValueMapping::new([
        ("normal", "norm"),
        ("peak_detect", "peak"),
        ("high_resolution", "hres"),
        ("average", "aver"),
    ])?;
    let slopes = ValueMapping::new([
        ("positive", "pos"),
        ("negative", "neg"),
        ("either", "eith"),
        ("alternating", "alt"),
    ])?;
    let trigger_types = ValueMapping::new([
        ("edge", "edge"),
        ("glitch", "glit"),
        ("tv", "tv"),
        ("pattern", "patt"),
        ("can", "can"),
        ("duration", "dur"),
        ("i2s", "i2s"),
        ("iic", "iic"),
        ("eburst", "ebur"),
        ("lin", "lin"),
        ("m1553", "m1553"),
        ("sequence", "seq"),
        ("spi", "spi"),
        ("uart", "uart"),
        ("usb", "usb"),
        ("flexray", "flex"),
    ])?;
    let sample_modes = ValueMapping::new([("real_time", "rtim"), ("equivalent_time", "etim")])?;

    let attributes = vec![
        AttributeDef::enumerated("acquisition_type", acquisition_types)
            .query(":acquire:type?")
            .write(":acquire:type {value}"),
        AttributeDef::float("acquisition_time_per_record")
            .query(":timebase:range?")
            .write(":timebase:range {value}")
            .limit(Limit::NonNegative),
        AttributeDef::float("acquisition_start_time")
            .query(":timebase:position?")
            .write(":timebase:position {value}"),
        AttributeDef::integer("acquisition_record_length").query(":waveform:points?"),
        AttributeDef::integer("acquisition_number_of_averages")
            .query(":acquire:count?")
            .write(":acquire:count {value}")
            .limit(Limit::Between { min: 1.0, max: 65536.0 })
            .default_value("1"),
        AttributeDef::enumerated("acquisition_sample_mode", sample_modes)
            .query(":acquire:mode?")
            .write(":acquire:mode {value}"),
        AttributeDef::enumerated("trigger_coupling", trigger_couplings()?)
            .query(":trigger:coupling?;:trigger:nreject?;:trigger:hfreject?")
            .write(":trigger:coupling {value0};:trigger:nreject {value1};:trigger:hfreject {value2}")
            .default_value("dc"),
        AttributeDef::boolean("trigger_continuous")
            .query(":oper:cond?")
            .status_bit(3)
            .write(":{value}")
            .bool_tokens("run", "stop")
            .describe("Acquiring continuously (run) or stopped"),
        AttributeDef::float("trigger_level")
            .query(":trigger:level?")
            .write(":trigger:level {value}"),
        AttributeDef::float("trigger_holdoff")
            .query(":trigger:holdoff?")
            .write(":trigger:holdoff {value}")
            .limit(Limit::NonNegative),
        AttributeDef::enumerated("trigger_edge_slope", slopes)
            .query(":trigger:edge:slope?")
            .write(":trigger:edge:slope {value}"),
        AttributeDef::enumerated("trigger_source", trigger_sources()?)
            .query(":trigger:source?")
            .write(":trigger:source {value}"),
        AttributeDef::enumerated("trigger_type", trigger_types)
            .query(":trigger:mode?")
            .write(":trigger:mode {value}"),
    ];
    Ok(attributes.into_iter().map(AttributeDef::instrument_scope).collect())
}

fn measurement_functions() -> IviResult<ValueMapping> {
    ValueMapping::new([
        ("rise_time", "risetime"),
        ("fall_time", "falltime"),
        ("frequency", "frequency"),
        ("period", "period"),
        ("voltage_rms", "vrms display"),
        ("voltage_peak_to_peak", "vpp"),
        ("voltage_max", "vmax"),
        ("voltage_min", "vmin"),
        ("voltage_high", "vtop"),
        ("voltage_low", "vbase"),
        ("voltage_average", "vaverage display"),
        ("width_negative", "nwidth"),
        ("width_positive", "pwidth"),
        ("duty_cycle_positive", "dutycycle"),
        ("amplitude", "vamplitude"),
        ("voltage_cycle_rms", "vrms cycle"),
        ("voltage_cycle_average", "vaverage cycle"),
        ("overshoot", "overshoot"),
        ("preshoot", "preshoot"),
        ("ratio", "vratio"),
        ("phase", "phase"),
        ("delay", "delay"),
    ])
}

/// Screenshot formats of the BMP/PNG-only scopes.
pub fn bitmap_formats() -> IviResult<ValueMapping> {
    ValueMapping::new([("bmp", "bmp"), ("bmp8", "bmp8bit"), ("png", "png")])
}

/// Four-channel scope table named `name`, with screenshots in `formats`.
///
/// # Errors
///
/// [`crate::error::IviError::InvalidModel`] only if the shared mappings are
/// inconsistent.
pub fn scope_builder(name: &str, formats: ValueMapping) -> IviResult<ModelBuilder> {
    let measurement = MeasurementCommands {
        prefix: ":measure:".to_string(),
        functions: measurement_functions()?,
        reference_functions: vec!["ratio".to_string(), "phase".to_string(), "delay".to_string()],
    };

    Ok(ModelDescription::builder(name, InstrumentClass::Oscilloscope)
        .channel_prefix("channel")
        // inputs are bounded per attribute, not by the channel envelope
        .channels(ChannelSpec::new(0.0, 0.0), ANALOG_CHANNELS)
        .memory_size(10)
        .attributes(channel_attributes()?)
        .attributes(instrument_attributes()?)
        .commands(|c| {
            c.error_query = Some(":system:error?".to_string());
            c.self_test_wait_ms = 40_000;
            c.memory_save = Some("*sav {index}".to_string());
            c.memory_recall = Some("*rcl {index}".to_string());
            c.fetch_setup = Some(":system:setup?".to_string());
            c.load_setup = Some(":system:setup ".to_string());
            c.trigger_initiate = Some(":acquire:complete 100;:digitize".to_string());
            c.initiate_invalidates = vec!["trigger_continuous".to_string()];
            c.auto_setup = Some(":autoscale".to_string());
            c.screenshot = Some(ScreenshotCommands {
                prepare: Some(":hardcopy:inksaver {invert}".to_string()),
                fetch: ":display:data? {format}".to_string(),
                formats,
            });
            c.waveform = Some(WaveformCommands {
                setup: vec![
                    ":waveform:byteorder msbfirst".to_string(),
                    ":waveform:unsigned 1".to_string(),
                    ":waveform:format word".to_string(),
                    ":waveform:points normal".to_string(),
                    ":waveform:source {name}".to_string(),
                ],
                preamble: ":waveform:preamble?".to_string(),
                data: ":waveform:data?".to_string(),
            });
            c.waveform_measurement = Some(measurement);
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{AttributeKind, Scope};
    use crate::value::NumberFormat;

    fn model() -> ModelDescription {
        scope_builder("SCOPE", bitmap_formats().unwrap())
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_channel_names_use_channel_prefix() {
        let model = model();
        assert_eq!(model.channel_list().names(), ["channel1", "channel2", "channel3", "channel4"]);
    }

    #[test]
    fn test_timebase_is_instrument_wide() {
        let model = model();
        let attr = model.attribute("acquisition_time_per_record").unwrap();
        assert_eq!(attr.scope, Scope::Instrument);
        assert!(matches!(
            attr.kind,
            AttributeKind::Float {
                format: NumberFormat::Scientific
            }
        ));
    }

    #[test]
    fn test_trigger_sources_are_the_analog_channels() {
        let model = model();
        let AttributeKind::Enum { mapping } = &model.attribute("trigger_source").unwrap().kind else {
            panic!("trigger_source is not enumerated");
        };
        let names = model.channel_list();
        assert!(mapping.tokens().eq(names.names().iter().map(String::as_str)));
    }

    #[test]
    fn test_probe_id_is_read_only() {
        let model = model();
        assert!(!model.attribute("probe_id").unwrap().is_writable());
    }
}
