//! Spectral water classification methods.
//!
//! Each method is a per-pixel rule on surface reflectance; the set of methods
//! is closed and selected by name through [`WaterMethod`].

use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::types::{LakeError, Reflectance, SpectralBands};

/// Reflectance scale factor of the surface-reflectance products
pub const REFLECTANCE_SCALE: f32 = 1.0e-4;

/// Common interface of the water classification methods
pub trait WaterClassifier {
    fn name(&self) -> &'static str;

    /// Classify one pixel whose bands are all finite
    fn is_water(&self, px: &Reflectance) -> bool;

    /// Raw water/non-water classification of a whole scene; pixels with a
    /// missing band are no data
    fn classify(&self, bands: &SpectralBands) -> Array2<Option<bool>>
    where
        Self: Sync,
    {
        let (rows, cols) = bands.dim();
        let data: Vec<Option<bool>> = (0..rows)
            .into_par_iter()
            .flat_map_iter(|i| {
                (0..cols).map(move |j| {
                    let px = bands.reflectance(i, j);
                    if px.is_valid() {
                        Some(self.is_water(&px))
                    } else {
                        None
                    }
                })
            })
            .collect();
        Array2::from_shape_vec((rows, cols), data)
            .unwrap_or_else(|_| Array2::from_elem((rows, cols), None))
    }
}

fn normalized_difference(a: f32, b: f32) -> f32 {
    let sum = a + b;
    if sum.abs() < f32::EPSILON {
        0.0
    } else {
        (a - b) / sum
    }
}

/// Modified normalized difference water index (green vs SWIR1)
pub fn mndwi(px: &Reflectance) -> f32 {
    normalized_difference(px.green, px.swir1)
}

pub fn ndvi(px: &Reflectance) -> f32 {
    normalized_difference(px.nir, px.red)
}

/// Enhanced vegetation index on reflectance scaled to 0-1
pub fn evi(px: &Reflectance) -> f32 {
    let nir = px.nir * REFLECTANCE_SCALE;
    let red = px.red * REFLECTANCE_SCALE;
    let blue = px.blue * REFLECTANCE_SCALE;
    let denom = 1.0 + nir + 6.0 * red - 7.5 * blue;
    if denom.abs() < f32::EPSILON {
        0.0
    } else {
        2.5 * (nir - red) / denom
    }
}

/// Automated water extraction index, shadow variant
pub fn awesh(px: &Reflectance) -> f32 {
    px.blue + 2.5 * px.green - 1.5 * (px.nir + px.swir1) - 0.25 * px.swir2
}

/// DSWE confidence level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum DsweLevel {
    NotWater = 0,
    HighConfidence = 1,
    ModerateConfidence = 2,
    PotentialWetland = 3,
    LowConfidence = 4,
}

impl DsweLevel {
    /// Map the decimal test code (t1 + 10 t2 + 100 t3 + 1000 t4 + 10000 t5)
    fn from_code(code: u32) -> Self {
        match code {
            1111 | 10111 | 11011 | 11101 | 11110 | 11111 => DsweLevel::HighConfidence,
            111 | 1011 | 1101 | 1110 | 10011 | 10101 | 10110 | 11001 | 11010 | 11100 => {
                DsweLevel::ModerateConfidence
            }
            11000 => DsweLevel::PotentialWetland,
            11 | 101 | 110 | 1001 | 1010 | 1100 | 10000 | 10001 | 10010 | 10100 => {
                DsweLevel::LowConfidence
            }
            _ => DsweLevel::NotWater,
        }
    }
}

/// Dynamic Surface Water Extent (Jones 2019)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dswe {
    /// Highest DSWE level still counted as water (2 or 3)
    pub max_level: u8,
}

impl Dswe {
    pub fn level(px: &Reflectance) -> DsweLevel {
        let mndwi = mndwi(px);
        let ndvi = ndvi(px);
        let mbsrv = px.green + px.red;
        let mbsrn = px.nir + px.swir1;

        let t1 = mndwi > 0.124;
        let t2 = mbsrv > mbsrn;
        let t3 = awesh(px) > 0.0;
        let t4 = mndwi > -0.44 && px.swir1 < 900.0 && px.nir < 1500.0 && ndvi < 0.7;
        let t5 = mndwi > -0.5
            && px.blue < 1000.0
            && px.swir1 < 3000.0
            && px.swir2 < 1000.0
            && px.nir < 2500.0;

        let code = t1 as u32 + 10 * t2 as u32 + 100 * t3 as u32 + 1000 * t4 as u32 + 10000 * t5 as u32;
        DsweLevel::from_code(code)
    }
}

impl WaterClassifier for Dswe {
    fn name(&self) -> &'static str {
        if self.max_level >= 3 {
            "Jones2019_3"
        } else {
            "Jones2019_2"
        }
    }

    fn is_water(&self, px: &Reflectance) -> bool {
        let level = Self::level(px) as u8;
        level >= 1 && level <= self.max_level
    }
}

/// Index-comparison water rule (Zou 2018)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Zou2018;

impl WaterClassifier for Zou2018 {
    fn name(&self) -> &'static str {
        "Zou2018"
    }

    fn is_water(&self, px: &Reflectance) -> bool {
        let mndwi = mndwi(px);
        let evi = evi(px);
        (mndwi > ndvi(px) || mndwi > evi) && evi < 0.1
    }
}

/// Water classification method, selected by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum WaterMethod {
    Jones2019_2,
    Jones2019_3,
    Zou2018,
}

impl Default for WaterMethod {
    fn default() -> Self {
        WaterMethod::Jones2019_2
    }
}

impl WaterMethod {
    pub const ALL: [WaterMethod; 3] = [
        WaterMethod::Jones2019_2,
        WaterMethod::Jones2019_3,
        WaterMethod::Zou2018,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WaterMethod::Jones2019_2 => "Jones2019_2",
            WaterMethod::Jones2019_3 => "Jones2019_3",
            WaterMethod::Zou2018 => "Zou2018",
        }
    }
}

impl WaterClassifier for WaterMethod {
    fn name(&self) -> &'static str {
        self.as_str()
    }

    fn is_water(&self, px: &Reflectance) -> bool {
        match self {
            WaterMethod::Jones2019_2 => Dswe { max_level: 2 }.is_water(px),
            WaterMethod::Jones2019_3 => Dswe { max_level: 3 }.is_water(px),
            WaterMethod::Zou2018 => Zou2018.is_water(px),
        }
    }
}

impl FromStr for WaterMethod {
    type Err = LakeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WaterMethod::ALL
            .iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| {
                LakeError::InvalidFormat(format!(
                    "unknown water classification method '{}', expected one of {:?}",
                    s,
                    WaterMethod::ALL.iter().map(|m| m.as_str()).collect::<Vec<_>>()
                ))
            })
    }
}

impl TryFrom<String> for WaterMethod {
    type Error = LakeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WaterMethod> for String {
    fn from(method: WaterMethod) -> Self {
        method.as_str().to_string()
    }
}

impl std::fmt::Display for WaterMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clear_water() -> Reflectance {
        Reflectance { blue: 600.0, green: 700.0, red: 400.0, nir: 200.0, swir1: 100.0, swir2: 50.0 }
    }

    fn vegetation() -> Reflectance {
        Reflectance { blue: 300.0, green: 600.0, red: 400.0, nir: 3500.0, swir1: 1800.0, swir2: 900.0 }
    }

    #[test]
    fn test_dswe_levels() {
        assert_eq!(Dswe::level(&clear_water()), DsweLevel::HighConfidence);
        assert_eq!(Dswe::level(&vegetation()), DsweLevel::NotWater);
        assert_eq!(DsweLevel::from_code(11000), DsweLevel::PotentialWetland);
        assert_eq!(DsweLevel::from_code(10000), DsweLevel::LowConfidence);
        assert_eq!(DsweLevel::from_code(1), DsweLevel::NotWater);
    }

    #[test]
    fn test_methods_agree_on_clear_cases() {
        for method in WaterMethod::ALL {
            assert!(method.is_water(&clear_water()), "{} missed water", method);
            assert!(!method.is_water(&vegetation()), "{} flagged vegetation", method);
        }
    }

    #[test]
    fn test_method_names_round_trip() {
        for method in WaterMethod::ALL {
            assert_eq!(method.as_str().parse::<WaterMethod>().unwrap(), method);
        }
        assert!("Otsu".parse::<WaterMethod>().is_err());
        let json = serde_json::to_string(&WaterMethod::Zou2018).unwrap();
        assert_eq!(json, "\"Zou2018\"");
    }

    #[test]
    fn test_missing_band_is_no_data() {
        let mut blue = Array2::from_elem((2, 2), 600.0f32);
        blue[[0, 1]] = f32::NAN;
        let bands = SpectralBands {
            blue,
            green: Array2::from_elem((2, 2), 700.0),
            red: Array2::from_elem((2, 2), 400.0),
            nir: Array2::from_elem((2, 2), 200.0),
            swir1: Array2::from_elem((2, 2), 100.0),
            swir2: Array2::from_elem((2, 2), 50.0),
            qa: Array2::from_elem((2, 2), Some(0)),
        };
        let water = WaterMethod::Jones2019_2.classify(&bands);
        assert_eq!(water[[0, 0]], Some(true));
        assert_eq!(water[[0, 1]], None);
    }
}
