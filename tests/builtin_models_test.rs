//! Consistency checks over every built-in model table.

use rust_ivi::attribute::{AttributeKind, Scope};
use rust_ivi::driver::Driver;
use rust_ivi::models::{builtin_models, find_model, ModelRegistry};
use rust_ivi::range::Quantity;
use rust_ivi::value::Value;

#[test]
fn test_every_builtin_validates_and_builds_a_driver() {
    for model in builtin_models().unwrap() {
        model.validate().unwrap();
        let driver = Driver::simulated(model.clone()).unwrap();
        assert_eq!(driver.channel_count(), model.channel_count(), "{}", model.name);
        assert!(driver.channel_count() > 0, "{}", model.name);
    }
}

#[test]
fn test_every_mapping_round_trips() {
    for model in builtin_models().unwrap() {
        let mut mappings: Vec<_> = model
            .attributes
            .iter()
            .filter_map(|attr| match &attr.kind {
                AttributeKind::Enum { mapping } => Some((attr.name.clone(), mapping.clone())),
                _ => None,
            })
            .collect();
        mappings.extend(model.attributes.iter().filter_map(|attr| {
            attr.key
                .as_ref()
                .map(|key| (format!("{} key", attr.name), key.values.clone()))
        }));
        if let Some(screenshot) = &model.commands.screenshot {
            mappings.push(("screenshot".to_string(), screenshot.formats.clone()));
        }
        if let Some(measurement) = &model.commands.waveform_measurement {
            mappings.push(("measurement".to_string(), measurement.functions.clone()));
        }

        for (name, mapping) in mappings {
            for token in mapping.tokens() {
                let wire = mapping.to_wire(token).unwrap();
                assert_eq!(
                    mapping.from_wire(wire),
                    Some(token),
                    "{}.{} token {}",
                    model.name,
                    name,
                    token
                );
                // replies come back upper-cased on most instruments
                assert_eq!(mapping.from_wire(&wire.to_ascii_uppercase()), Some(token));
            }
        }
    }
}

#[test]
fn test_defaults_pass_write_validation() {
    for model in builtin_models().unwrap() {
        let mut driver = Driver::simulated(model.clone()).unwrap();
        for attr in model.attributes.iter().filter(|a| a.is_writable()) {
            let result = match attr.scope {
                Scope::Channel => model.channels.iter().enumerate().try_for_each(|(index, spec)| {
                    driver.set(&attr.name, index, attr.initial_value_for(Some(spec)).unwrap())
                }),
                Scope::Instrument => driver.set_instrument(&attr.name, attr.initial_value().unwrap()),
            };
            result.unwrap_or_else(|e| panic!("{}.{}: {e}", model.name, attr.name));
        }
    }
}

#[test]
fn test_defaults_are_applied() {
    let mut scope = Driver::simulated(find_model("WaveRunner").unwrap()).unwrap();
    assert_eq!(scope.get_f64("probe_attenuation", "channel2").unwrap(), 1.0);
    assert_eq!(scope.get_token("coupling", "channel4").unwrap(), "dc");
    assert_eq!(scope.get_token("probe_id", 0).unwrap(), "NONE");
    assert_eq!(
        scope.get_instrument("acquisition_number_of_averages").unwrap(),
        Value::Int(1)
    );
    assert_eq!(
        scope.get_instrument("trigger_type").unwrap(),
        Value::Text("edge".to_string())
    );
}

#[test]
fn test_keyed_templates_name_known_functions() {
    for model in builtin_models().unwrap() {
        for attr in &model.attributes {
            let Some(key) = &attr.key else { continue };
            let source = model.attribute(&key.attribute).unwrap();
            let AttributeKind::Enum { mapping } = &source.kind else {
                panic!("{}.{} keyed by a non-enumerated attribute", model.name, attr.name);
            };
            assert!(key.values.tokens().all(|t| mapping.contains_token(t)));
        }
    }
}

#[test]
fn test_scope_channel_names() {
    let scope = Driver::simulated(find_model("WaveRunner").unwrap()).unwrap();
    assert_eq!(
        scope.channel_names(),
        ["channel1", "channel2", "channel3", "channel4"]
    );
}

#[test]
fn test_read_only_attribute() {
    let mut scope = Driver::simulated(find_model("WaveRunner").unwrap()).unwrap();
    assert!(matches!(
        scope.set("probe_id", 0, "PP008"),
        Err(rust_ivi::IviError::ReadOnly(_))
    ));
    assert!(matches!(
        scope.set_instrument("acquisition_record_length", 1000_i64),
        Err(rust_ivi::IviError::ReadOnly(_))
    ));
}

#[test]
fn test_pst3202_envelopes() {
    let psu = Driver::simulated(find_model("PST-3202").unwrap()).unwrap();
    assert_eq!(psu.channel_spec("output1").unwrap().voltage_max, 32.0);
    assert_eq!(psu.channel_spec("output3").unwrap().current_max, 5.0);
    assert_eq!(psu.channel_spec("output3").unwrap().ovp_max, 7.0);
}

#[test]
fn test_u3606a_ranges() {
    let mut meter = Driver::simulated(find_model("U3606A").unwrap()).unwrap();
    assert_eq!(meter.channel_count(), 1);
    assert_eq!(
        meter.configure_range(0, Quantity::Voltage, 20.0).unwrap().as_deref(),
        Some("P30V")
    );
    assert_eq!(meter.channel_spec(0).unwrap().current_max, 1.0);
    assert_eq!(
        meter.configure_range(0, Quantity::Current, 2.0).unwrap().as_deref(),
        Some("P8V")
    );
    meter.set_instrument("measurement_function", "dc_current").unwrap();
    assert_eq!(
        meter.get_instrument("measurement_function").unwrap(),
        Value::Text("dc_current".to_string())
    );
}

#[test]
fn test_prodigit_3000_mode_invalidates_levels() {
    let mut load = Driver::simulated(find_model("3000").unwrap()).unwrap();
    load.set("cc_low", 0, 1.0).unwrap();
    load.set("mode", 0, "cv").unwrap();
    // simulation leaves invalidated slots readable
    assert_eq!(load.get_f64("cc_low", 0).unwrap(), 1.0);
    assert!(!load.cache().is_valid("cc_low", Some(0)));
}

#[test]
fn test_chroma_lookup_by_supported_model() {
    let registry = ModelRegistry::builtin().unwrap();
    let model = registry.find("62024P-80-60").unwrap();
    assert_eq!(model.name, "62000P");
    assert_eq!(registry.find("62012p-80-60").unwrap().name, "62012P-80-60");
}
