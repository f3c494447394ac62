//! LeCroy WaveRunner oscilloscopes.
//!
//! Both families speak the shared [`super::scope`] command set and differ in
//! their screenshot formats.

use super::scope;
use crate::error::IviResult;
use crate::mapping::ValueMapping;
use crate::model::ModelDescription;

const MANUFACTURER: &str = "LeCroy Technologies";

/// WaveRunner Xi-A / MXi-A with four analog channels.
pub fn waverunner() -> IviResult<ModelDescription> {
    let formats = ValueMapping::new([
        ("tiff", "tiff"),
        ("bmp", "bmp"),
        ("bmp8", "bmp8bit"),
        ("png", "png"),
    ])?;

    scope::scope_builder("WaveRunner", formats)?
        .manufacturer(MANUFACTURER)
        .description("LeCroy WaveRunner Xi-A / MXi-A oscilloscope")
        .supported_models([
            "WR204MXI-A",
            "WR204XI-A",
            "WR104MXI-A",
            "WR104XI-A",
            "WR64MXI-A",
            "WR64XI-A",
            "WR62XI-A",
            "WR44MXI-A",
            "WR44XI-A",
        ])
        .id_prefix("")
        .build()
}

/// WaveRunner-2 (LT264), analog channels only.
pub fn waverunner2() -> IviResult<ModelDescription> {
    scope::scope_builder("WaveRunner-2", scope::bitmap_formats()?)?
        .manufacturer(MANUFACTURER)
        .description("LeCroy WaveRunner-2 oscilloscope")
        .supported_models(["LT264"])
        .id_prefix("LT264")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screenshot_formats_differ() {
        let xi = waverunner().unwrap();
        let lt = waverunner2().unwrap();
        let tiff = |m: &ModelDescription| {
            m.commands
                .screenshot
                .as_ref()
                .is_some_and(|s| s.formats.contains_token("tiff"))
        };
        assert!(tiff(&xi));
        assert!(!tiff(&lt));
    }

    #[test]
    fn test_waverunner2_has_four_analog_channels() {
        let model = waverunner2().unwrap();
        assert_eq!(model.channel_count(), 4);
        assert_eq!(model.supported_models, ["LT264"]);
    }
}
