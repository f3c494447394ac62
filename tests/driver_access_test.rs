//! Attribute access rules exercised through the built-in tables and a mock
//! transport.

use rust_ivi::adapters::mock_adapter::Call;
use rust_ivi::adapters::MockTransport;
use rust_ivi::driver::{Driver, DriverOptions};
use rust_ivi::error::IviError;
use rust_ivi::models::{gwinstek, prodigit, scpi};
use rust_ivi::range::Quantity;
use rust_ivi::value::Value;

fn pst3202() -> (Driver, MockTransport) {
    let mock = MockTransport::new();
    let driver = Driver::new(gwinstek::pst3202().unwrap(), mock.clone()).unwrap();
    (driver, mock)
}

fn dcload(channels: usize) -> (Driver, MockTransport) {
    let mock = MockTransport::new();
    let driver = Driver::new(scpi::generic_dcload(channels).unwrap(), mock.clone()).unwrap();
    (driver, mock)
}

#[test]
fn test_simulated_driver_never_touches_transport() {
    let mock = MockTransport::new();
    let mut psu = Driver::open(
        gwinstek::pst3202().unwrap(),
        Some(Box::new(mock.clone())),
        DriverOptions {
            simulate: true,
            id_query: true,
            reset: true,
        },
    )
    .unwrap();

    psu.set("voltage_level", "output1", 12.0).unwrap();
    psu.set("enabled", "output2", true).unwrap();
    psu.set_instrument("tracking_type", "series").unwrap();
    assert_eq!(psu.get_f64("voltage_level", "output1").unwrap(), 12.0);
    // limits start at the channel ceilings
    assert_eq!(psu.get_f64("current_limit", "output3").unwrap(), 5.0);
    assert_eq!(psu.get_f64("ovp_limit", "output1").unwrap(), 33.0);
    assert_eq!(psu.measure("output1", Quantity::Voltage).unwrap(), 0.0);
    assert_eq!(psu.utility_error_query().unwrap(), (0, "No error".to_string()));
    assert_eq!(psu.utility_self_test().unwrap().0, 0);
    psu.memory_save(5).unwrap();
    psu.reset_output_protection("output1").unwrap();
    assert_eq!(
        psu.identity_model().unwrap(),
        "Not available while simulating"
    );

    assert_eq!(mock.call_count(), 0);
}

#[test]
fn test_simulated_writes_still_validate() {
    let mut psu = Driver::simulated(gwinstek::pst3202().unwrap()).unwrap();
    let err = psu.set("voltage_level", "output3", 6.5).unwrap_err();
    assert!(matches!(err, IviError::OutOfRange { max, .. } if max == 6.0));
    assert!(matches!(
        psu.set("current_limit_behavior", 0, "fold"),
        Err(IviError::UnsupportedValue { .. })
    ));
}

#[test]
fn test_leaving_simulation_requires_transport() {
    let mut psu = Driver::simulated(gwinstek::pst3201().unwrap()).unwrap();
    assert!(matches!(psu.set_simulate(false), Err(IviError::NotConnected(_))));
    assert!(psu.is_simulating());
}

#[test]
fn test_pst_output_state_is_shared() {
    let (mut psu, mock) = pst3202();
    mock.set_reply(":output:state ?", "1");
    for channel in ["output1", "output2", "output3"] {
        assert!(psu.get_bool("enabled", channel).unwrap());
    }
    assert_eq!(mock.asks().len(), 3);

    psu.set("enabled", "output2", false).unwrap();
    assert!(!psu.cache().is_valid("enabled", Some(0)));
    assert!(psu.cache().is_valid("enabled", Some(1)));
    assert!(!psu.cache().is_valid("enabled", Some(2)));

    // the other channels re-query the instrument
    mock.set_reply(":output:state ?", "0");
    assert!(!psu.get_bool("enabled", "output1").unwrap());
    assert!(!psu.get_bool("enabled", "output2").unwrap());
    assert_eq!(mock.asks().len(), 4);
}

#[test]
fn test_pst_commands_address_channel_without_select() {
    let (mut psu, mock) = pst3202();
    psu.set("voltage_level", "output3", 5.0).unwrap();
    psu.set("current_limit", "output1", 1.25).unwrap();
    assert_eq!(
        mock.writes(),
        vec![":channel3:voltage 5.000000", ":channel1:current 1.250000"]
    );
}

#[test]
fn test_tracking_change_invalidates_everything() {
    let (mut psu, _mock) = pst3202();
    psu.set("voltage_level", 0, 10.0).unwrap();
    psu.set("voltage_level", 1, 10.0).unwrap();
    psu.set_instrument("tracking_type", "parallel").unwrap();
    assert!(!psu.cache().is_valid("voltage_level", Some(0)));
    assert!(!psu.cache().is_valid("voltage_level", Some(1)));
}

#[test]
fn test_select_only_on_multi_channel_models() {
    let (mut single, single_mock) = dcload(1);
    single.set("voltage_level", 0, 3.0).unwrap();
    assert_eq!(single_mock.writes(), vec!["source:voltage:level 3.000000e0"]);

    let (mut dual, dual_mock) = dcload(2);
    dual.set("voltage_level", 1, 3.0).unwrap();
    assert_eq!(
        dual_mock.writes(),
        vec!["instrument:nselect 2", "source:voltage:level 3.000000e0"]
    );
}

#[test]
fn test_range_selection_narrows_and_restores() {
    let (mut load, mock) = dcload(2);
    assert!(matches!(
        load.set("voltage_level", 0, 15.0),
        Err(IviError::OutOfRange { .. })
    ));

    assert_eq!(
        load.configure_range(0, Quantity::Voltage, 15.0).unwrap().as_deref(),
        Some("P20V")
    );
    load.set("voltage_level", 0, 15.0).unwrap();
    assert_eq!(load.channel_spec(0).unwrap().current_max, 10.0);

    // selecting the same range again keeps the same envelope
    assert_eq!(
        load.configure_range(0, Quantity::Voltage, 20.0).unwrap().as_deref(),
        Some("P20V")
    );
    assert_eq!(load.channel_spec(0).unwrap().voltage_max, 21.0);

    assert_eq!(
        load.configure_range(0, Quantity::Current, 15.0).unwrap().as_deref(),
        Some("P8V")
    );
    let spec = load.channel_spec(0).unwrap();
    assert_eq!((spec.voltage_max, spec.current_max), (9.0, 20.0));
    assert!(!load.cache().is_valid("voltage_level", Some(0)));

    let ranges: Vec<_> = mock
        .writes()
        .into_iter()
        .filter(|w| w.starts_with("source:voltage:range"))
        .collect();
    assert_eq!(
        ranges,
        vec![
            "source:voltage:range P20V",
            "source:voltage:range P20V",
            "source:voltage:range P8V"
        ]
    );
}

#[test]
fn test_range_beyond_every_range_is_rejected() {
    let (mut load, mock) = dcload(1);
    assert!(matches!(
        load.configure_range(0, Quantity::Voltage, 50.0),
        Err(IviError::OutOfRange { .. })
    ));
    assert_eq!(mock.call_count(), 0);
}

#[test]
fn test_single_range_channel_is_left_alone() {
    let (mut psu, mock) = pst3202();
    assert_eq!(psu.configure_range(0, Quantity::Voltage, 10.0).unwrap(), None);
    assert_eq!(mock.call_count(), 0);
}

#[test]
fn test_rejected_write_leaves_cache_unchanged() {
    let (mut load, mock) = dcload(1);
    load.set("ovp_limit", 0, 20.0).unwrap();
    mock.clear_log();

    assert!(load.set("ovp_limit", 0, 30.0).is_err());
    assert!(load.set("trigger_delay", 0, -1.0).is_err());
    assert!(load.set("ovp_limit", 0, f64::NAN).is_err());
    assert_eq!(mock.call_count(), 0);
    assert_eq!(load.cache().get("ovp_limit", Some(0)), Some(&Value::Float(20.0)));
}

#[test]
fn test_malformed_reply_keeps_slot_invalid() {
    let (mut load, mock) = dcload(1);
    mock.set_reply("source:voltage:level?", "OVERLOAD");
    assert!(matches!(
        load.get("voltage_level", 0),
        Err(IviError::MalformedResponse { .. })
    ));
    assert!(!load.cache().is_valid("voltage_level", Some(0)));

    mock.set_reply("source:voltage:level?", "+4.50000E+00");
    assert_eq!(load.get_f64("voltage_level", 0).unwrap(), 4.5);
}

#[test]
fn test_unrecognized_enum_reply() {
    let (mut load, mock) = dcload(1);
    mock.set_reply("trigger:source?", "EXT");
    assert!(matches!(
        load.get("trigger_source", 0),
        Err(IviError::UnrecognizedValue { response, .. }) if response == "EXT"
    ));

    mock.set_reply("trigger:source?", "BUS");
    assert_eq!(load.get_token("trigger_source", 0).unwrap(), "bus");
}

#[test]
fn test_transport_failure_on_read() {
    let (mut load, mock) = dcload(1);
    mock.set_reply("output?", "1");
    mock.inject_next_failure();
    assert!(matches!(load.get("enabled", 0), Err(IviError::Transport(_))));
    assert!(load.get_bool("enabled", 0).unwrap());
}

#[test]
fn test_protection_state_cross_invalidation() {
    let (mut load, _mock) = dcload(2);
    load.set("ocp_enabled", 1, true).unwrap();
    load.set("current_limit_behavior", 1, "trip").unwrap();
    assert!(!load.cache().is_valid("ocp_enabled", Some(1)));
    assert!(load.cache().is_valid("current_limit_behavior", Some(1)));

    load.set("ocp_enabled", 0, false).unwrap();
    assert!(load.cache().is_valid("ocp_enabled", Some(0)));
    // only the written channel loses its behavior slot
    assert!(load.cache().is_valid("current_limit_behavior", Some(1)));
}

#[test]
fn test_configure_ovp_writes_limit_before_state() {
    let (mut load, mock) = dcload(1);
    load.configure_ovp(0, true, 12.0).unwrap();
    load.configure_ovp(0, false, 18.0).unwrap();
    assert_eq!(
        mock.writes(),
        vec![
            "source:voltage:protection:level 1.200000e1",
            "source:voltage:protection:state 1",
            "source:voltage:protection:state 0"
        ]
    );
}

#[test]
fn test_pst_configure_ovp_keeps_state_in_driver() {
    let (mut psu, mock) = pst3202();
    assert!(psu.get_bool("ovp_enabled", "output3").unwrap());
    psu.configure_ovp("output3", true, 6.5).unwrap();
    psu.configure_ovp("output1", false, 0.0).unwrap();
    assert_eq!(mock.writes(), vec![":channel3:protection:voltage 6.500000"]);
    assert!(!psu.get_bool("ovp_enabled", "output1").unwrap());
    assert_eq!(mock.asks().len(), 0);

    // the limit is validated before anything is written
    assert!(psu.configure_ovp("output3", true, 8.0).is_err());
    assert_eq!(mock.writes().len(), 1);
}

#[test]
fn test_dcload_protection_defaults() {
    let mut load = Driver::simulated(scpi::generic_dcload(2).unwrap()).unwrap();
    assert!(load.get_bool("ovp_enabled", 1).unwrap());
    assert_eq!(load.get_token("current_limit_behavior", 0).unwrap(), "trip");
}

#[test]
fn test_prodigit_3311c_dynamic() {
    let mock = MockTransport::new().with_reply("STATE:DYNAMIC ?", "1");
    let mut load = Driver::new(prodigit::prodigit_3311c().unwrap(), mock.clone()).unwrap();
    assert!(load.get_bool("dynamic", 0).unwrap());
    load.set("dynamic", 0, false).unwrap();
    assert_eq!(mock.writes(), vec!["STATE:DYNAMIC 0"]);
}

#[test]
fn test_configure_current_limit() {
    let (mut psu, mock) = pst3202();
    psu.configure_current_limit("output1", "trip", 1.5).unwrap();
    assert_eq!(
        mock.writes(),
        vec![
            ":channel1:protection:current 1",
            ":channel1:current 1.500000"
        ]
    );
    assert!(psu.configure_current_limit("output1", "regulate", 3.0).is_err());
}

#[test]
fn test_limit_queries_follow_working_maxima() {
    let (mut load, _mock) = dcload(1);
    assert_eq!(load.query_current_limit_max(0, 5.0).unwrap(), 20.0);
    assert!(load.query_current_limit_max(0, 15.0).is_err());
    load.configure_range(0, Quantity::Voltage, 15.0).unwrap();
    assert_eq!(load.query_current_limit_max(0, 15.0).unwrap(), 10.0);
    assert_eq!(load.query_voltage_level_max(0, 5.0).unwrap(), 21.0);
}

#[test]
fn test_unknown_channel() {
    let (mut psu, mock) = pst3202();
    assert!(matches!(
        psu.get("voltage_level", "output4"),
        Err(IviError::UnknownChannel(_))
    ));
    assert!(matches!(
        psu.set("voltage_level", 3, 1.0),
        Err(IviError::UnknownChannel(_))
    ));
    assert_eq!(mock.call_count(), 0);
}

#[test]
fn test_memory_slots() {
    let (mut psu, mock) = pst3202();
    assert_eq!(psu.memory_size(), 5);
    assert!(matches!(psu.memory_recall(0), Err(IviError::OutOfRange { .. })));
    assert!(matches!(psu.memory_save(6), Err(IviError::OutOfRange { .. })));
    psu.memory_save(1).unwrap();
    psu.memory_recall(5).unwrap();
    assert_eq!(mock.writes(), vec!["*sav 1", "*rcl 5"]);

    let (mut load, _mock) = dcload(1);
    assert!(matches!(load.memory_save(1), Err(IviError::NotSupported(_))));
}

#[test]
fn test_prodigit_memory_commands() {
    let mock = MockTransport::new();
    let mut load = Driver::new(prodigit::prodigit_3311c().unwrap(), mock.clone()).unwrap();
    load.memory_save(2).unwrap();
    load.memory_recall(2).unwrap();
    assert_eq!(mock.writes().len(), 2);
    assert!(load.memory_save(6).is_err());
}

#[test]
fn test_protection_clear_selects_channel() {
    let (mut load, mock) = dcload(2);
    load.reset_output_protection(1).unwrap();
    assert_eq!(
        mock.writes(),
        vec![
            "instrument:nselect 2",
            "source:voltage:protection:clear",
            "source:current:protection:clear"
        ]
    );
}

#[test]
fn test_triggering() {
    let (mut load, mock) = dcload(1);
    load.trigger_initiate().unwrap();
    load.send_software_trigger().unwrap();
    assert!(matches!(load.trigger_abort(), Err(IviError::NotSupported(_))));
    assert_eq!(mock.writes(), vec!["initiate", "*trg"]);
}

#[test]
fn test_open_runs_clear_and_id_query() {
    let mock = MockTransport::new().with_reply("*IDN?", "GW INSTEK,PST-3202,EF123,V1.15");
    let psu = Driver::open(
        gwinstek::pst3202().unwrap(),
        Some(Box::new(mock.clone())),
        DriverOptions {
            id_query: true,
            ..DriverOptions::default()
        },
    )
    .unwrap();
    assert!(!psu.is_simulating());
    assert_eq!(
        mock.call_log(),
        vec![Call::Clear, Call::Ask("*IDN?".into())]
    );

    let wrong = MockTransport::new().with_reply("*IDN?", "GW INSTEK,PST-3201,EF123,V1.15");
    let result = Driver::open(
        gwinstek::pst3202().unwrap(),
        Some(Box::new(wrong)),
        DriverOptions {
            id_query: true,
            ..DriverOptions::default()
        },
    );
    assert!(matches!(result, Err(IviError::IdMismatch { .. })));
}

#[test]
fn test_malformed_identity() {
    let (mut psu, mock) = pst3202();
    mock.set_reply("*IDN?", "GW INSTEK,PST-3202");
    assert!(matches!(
        psu.identity(),
        Err(IviError::MalformedResponse { .. })
    ));
}
