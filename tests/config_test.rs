//! Configuration loading, environment overrides and custom model tables.

use rust_ivi::config::{ConfigError, IviConfig, TransportKind};
use rust_ivi::range::Quantity;
use serial_test::serial;
use std::io::Write;
use tempfile::NamedTempFile;

const BENCH_MODEL: &str = r#"
name = "LAB-20"
class = "power_supply"
id_prefix = "LAB"

[[channels]]
ovp_max = 22.0
ocp_max = 5.5
voltage_max = 20.0
current_max = 5.0

[[attributes]]
name = "voltage_level"
kind = { type = "float", format = { fixed = 3 } }
query = "volt?"
write = "volt {value}"
limit = { ceiling = "voltage" }

[[attributes]]
name = "enabled"
kind = { type = "bool" }
query = "outp?"
write = "outp {value}"
"#;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_load_shipped_config() {
    let config = IviConfig::load_from("config/rust_ivi.toml").unwrap();
    assert_eq!(config.application.name, "rust_ivi");
    assert_eq!(config.instruments.len(), 4);

    let psu = config.instrument("psu").unwrap();
    assert_eq!(psu.transport, TransportKind::Serial);
    assert!(psu.id_query);
    assert!(psu.dsr_dtr);
    assert!(!config.instrument("load").unwrap().dsr_dtr);
    assert_eq!(config.instrument("load").unwrap().timeout_ms, 2000);
    assert_eq!(config.instrument("scope").unwrap().timeout_ms, 5000);
}

#[test]
#[serial]
fn test_shipped_model_file_is_registered() {
    let config = IviConfig::load_from("config/rust_ivi.toml").unwrap();
    let registry = config.registry().unwrap();
    assert_eq!(registry.find("BS-3003").unwrap().name, "BENCH-30");

    let mut bench = config.instrument("bench").unwrap().connect(&registry).unwrap();
    assert_eq!(
        bench.configure_range(0, Quantity::Voltage, 20.0).unwrap().as_deref(),
        Some("HIGH")
    );
    assert!(bench.set("current_limit", 0, 2.0).is_err());
    bench.set("remote_sense", 0, "external").unwrap();
    assert_eq!(bench.get_token("remote_sense", 0).unwrap(), "external");
}

#[test]
#[serial]
fn test_env_overrides_file() {
    let file = write_temp(
        r#"
[application]
name = "bench"
log_level = "info"
"#,
    );

    std::env::set_var("RUSTIVI_APPLICATION__LOG_LEVEL", "debug");
    let result = IviConfig::load_from(file.path());
    std::env::remove_var("RUSTIVI_APPLICATION__LOG_LEVEL");

    let config = result.unwrap();
    assert_eq!(config.application.log_level, "debug");
    assert_eq!(config.application.name, "bench");
}

#[test]
#[serial]
fn test_invalid_env_override_fails_validation() {
    let file = write_temp("[application]\nlog_level = \"info\"\n");

    std::env::set_var("RUSTIVI_APPLICATION__LOG_LEVEL", "chatty");
    let result = IviConfig::load_from(file.path());
    std::env::remove_var("RUSTIVI_APPLICATION__LOG_LEVEL");

    assert!(matches!(result, Err(ConfigError::ValidationError(_))));
}

#[test]
#[serial]
fn test_custom_model_from_model_files() {
    let model = write_temp(BENCH_MODEL);
    let config = write_temp(&format!(
        r#"
model_files = ["{}"]

[[instruments]]
id = "lab"
model = "LAB-20"
transport = "mock"
"#,
        model.path().display()
    ));

    let config = IviConfig::load_from(config.path()).unwrap();
    let registry = config.registry().unwrap();
    let lab = config.instrument("lab").unwrap();
    assert!(!lab.simulate);

    // the mock transport answers nothing, but writes go through
    let mut driver = lab.connect(&registry).unwrap();
    driver.set("voltage_level", 0, 12.5).unwrap();
    assert_eq!(driver.get_f64("voltage_level", 0).unwrap(), 12.5);
    assert!(driver.set("voltage_level", 0, 21.0).is_err());
}

#[test]
#[serial]
fn test_unknown_model_is_rejected() {
    let config = write_temp(
        r#"
[[instruments]]
id = "psu"
model = "E3631A"
resource = "GPIB0::6::INSTR"
"#,
    );
    assert!(matches!(
        IviConfig::load_from(config.path()),
        Err(ConfigError::ValidationError(msg)) if msg.contains("E3631A")
    ));
}

#[test]
#[serial]
fn test_bad_model_file_names_the_file() {
    let model = write_temp("name = \"BROKEN\"\nclass = \"power_supply\"\nchannels = []\n");
    let config = write_temp(&format!("model_files = [\"{}\"]\n", model.path().display()));
    match IviConfig::load_from(config.path()) {
        Err(ConfigError::ValidationError(msg)) => {
            assert!(msg.contains(&model.path().display().to_string()), "{msg}");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
#[serial]
fn test_malformed_toml_is_a_load_error() {
    let config = write_temp("[[instruments]\nid = ");
    assert!(matches!(
        IviConfig::load_from(config.path()),
        Err(ConfigError::LoadError(_))
    ));
}
