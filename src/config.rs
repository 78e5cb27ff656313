//! Run configuration for the lake-area pipeline.

use std::fs;
use std::path::Path;

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::core::channel::ChannelParams;
use crate::core::hillshade::HillshadeParams;
use crate::core::water_index::WaterMethod;
use crate::types::{LakeError, LakeResult, TimeRange};

/// Everything a lake-area run needs besides its data sources.
///
/// Missing JSON fields take their default values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LakeAreaConfig {
    /// Spectral water classification method
    pub water_method: WaterMethod,
    /// Acquisition window, start inclusive and end exclusive
    pub time_range: TimeRange,
    /// Scenes must have land cloud cover strictly below this percentage
    pub max_cloud_cover: f64,
    /// AOI buffer (metres) for reconstruction and area reduction
    pub reconstruction_buffer_m: f64,
    /// AOI buffer (metres, negative shrinks) whose water seeds channel extraction
    pub seed_buffer_m: f64,
    /// Records need visible lake area above this fraction of the polygon area
    pub exposed_area_fraction: f64,
    pub channel: ChannelParams,
    pub hillshade: HillshadeParams,
}

impl Default for LakeAreaConfig {
    fn default() -> Self {
        Self {
            water_method: WaterMethod::default(),
            time_range: TimeRange {
                start: Utc.with_ymd_and_hms(2017, 1, 1, 0, 0, 0).single().unwrap_or_default(),
                end: Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).single().unwrap_or_default(),
            },
            max_cloud_cover: 50.0,
            reconstruction_buffer_m: 200.0,
            seed_buffer_m: -50.0,
            exposed_area_fraction: 0.5,
            channel: ChannelParams::default(),
            hillshade: HillshadeParams::default(),
        }
    }
}

impl LakeAreaConfig {
    pub fn from_json_str(json: &str) -> LakeResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> LakeResult<Self> {
        log::info!("Loading configuration from: {}", path.as_ref().display());
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn to_json(&self) -> LakeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> LakeResult<()> {
        if self.time_range.start >= self.time_range.end {
            return Err(LakeError::InvalidFormat(format!(
                "time range start {} is not before end {}",
                self.time_range.start, self.time_range.end
            )));
        }
        if !(0.0..=1.0).contains(&self.exposed_area_fraction) {
            return Err(LakeError::InvalidFormat(format!(
                "exposed_area_fraction {} outside 0-1",
                self.exposed_area_fraction
            )));
        }
        if self.channel.max_distance_m <= 0.0 {
            return Err(LakeError::InvalidFormat(format!(
                "channel max_distance_m must be positive, got {}",
                self.channel.max_distance_m
            )));
        }
        let displacement = self.hillshade.displacement_m;
        if !(displacement.is_finite() && displacement > 0.0) {
            return Err(LakeError::InvalidFormat(format!(
                "hillshade displacement_m must be finite and positive, got {}",
                displacement
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LakeAreaConfig::default();
        assert_eq!(config.water_method, WaterMethod::Jones2019_2);
        assert_eq!(config.channel.max_distance_m, 1000.0);
        assert_eq!(config.max_cloud_cover, 50.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = LakeAreaConfig::from_json_str(
            r#"{"water_method": "Zou2018", "channel": {"max_distance_m": 500.0}}"#,
        )
        .unwrap();
        assert_eq!(config.water_method, WaterMethod::Zou2018);
        assert_eq!(config.channel.max_distance_m, 500.0);
        assert_eq!(config.reconstruction_buffer_m, 200.0);

        let round = LakeAreaConfig::from_json_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(round.water_method, WaterMethod::Zou2018);
    }

    #[test]
    fn test_rejects_bad_method_and_range() {
        assert!(LakeAreaConfig::from_json_str(r#"{"water_method": "Otsu"}"#).is_err());
        assert!(LakeAreaConfig::from_json_str(r#"{"exposed_area_fraction": 2.0}"#).is_err());
    }

    #[test]
    fn test_rejects_bad_hillshade_displacement() {
        for bad in ["0.0", "-30.0", "1e400"] {
            let json = format!(r#"{{"hillshade": {{"displacement_m": {}}}}}"#, bad);
            assert!(LakeAreaConfig::from_json_str(&json).is_err(), "accepted {}", bad);
        }
        assert!(LakeAreaConfig::from_json_str(r#"{"hillshade": {"displacement_m": 60.0}}"#).is_ok());
    }
}
