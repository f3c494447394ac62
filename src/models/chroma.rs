//! Chroma ATE 62000P programmable DC supplies.

use super::scpi;
use crate::channel::ChannelSpec;
use crate::error::IviResult;
use crate::model::{InstrumentClass, ModelDescription};

const MANUFACTURER: &str = "Chroma ATE";

const SUPPORTED_MODELS: [&str; 12] = [
    "62006P-100-25",
    "62012P-80-60",
    "62012P-100-50",
    "62012P-600-8",
    "62006P-30-80",
    "62006P-300-8",
    "62012P-40-120",
    "62024P-40-120",
    "62024P-80-60",
    "62024P-100-50",
    "62024P-600-8",
    "62050P-100-100",
];

fn chroma(name: &str, description: &str, supported: &[&str], output: ChannelSpec) -> IviResult<ModelDescription> {
    ModelDescription::builder(name, InstrumentClass::PowerSupply)
        .manufacturer(MANUFACTURER)
        .description(description)
        .supported_models(supported.iter().copied())
        // the 62000P reports the full model code, checked against nothing
        .id_prefix("")
        .channel(output)
        .memory_size(10)
        .range_dependent(["voltage_level", "current_limit"])
        .attributes(scpi::dcpwr_attributes()?)
        .commands(|c| {
            scpi::dcpwr_commands(c);
            c.memory_save = Some("*sav {index}".to_string());
            c.memory_recall = Some("*rcl {index}".to_string());
        })
        .build()
}

/// 62000P series, sized for the largest family member (600 V / 120 A).
pub fn chroma_62000p() -> IviResult<ModelDescription> {
    let output = ChannelSpec::new(600.0, 120.0)
        .with_range("P600V", 600.0, 120.0)
        .with_ovp_max(660.0)
        .with_ocp_max(132.0);
    chroma(
        "62000P",
        "Chroma 62000P series DC power supply",
        &SUPPORTED_MODELS,
        output,
    )
}

/// 62012P-80-60: 80 V / 60 A.
pub fn chroma_62012p_80_60() -> IviResult<ModelDescription> {
    let output = ChannelSpec::new(80.0, 60.0)
        .with_range("P80V", 80.0, 60.0)
        .with_ovp_max(88.0)
        .with_ocp_max(66.0);
    chroma(
        "62012P-80-60",
        "Chroma 62012P-80-60 DC power supply",
        &["62012P-80-60"],
        output,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_62012p_ceilings() {
        let model = chroma_62012p_80_60().unwrap();
        let spec = &model.channels[0];
        assert_eq!((spec.voltage_max, spec.ovp_max, spec.ocp_max), (80.0, 88.0, 66.0));
        assert_eq!(model.memory_size, 10);
    }
}
