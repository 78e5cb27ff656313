//! Decoding of the packed Landsat surface-reflectance pixel quality band
//! into an Fmask-style categorical flag.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::types::{GridSpec, LakeResult, Mask};

/// Pixel quality categories carried by the QA band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QaCategory {
    Water,
    CloudShadow,
    SnowIce,
    Cloud,
}

/// Location of one category inside the packed QA word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField {
    pub offset: u32,
    pub width: u32,
}

impl BitField {
    pub const fn new(offset: u32, width: u32) -> Self {
        Self { offset, width }
    }

    pub fn extract(&self, word: u16) -> u16 {
        let mask = ((1u32 << self.width) - 1) as u16;
        (word >> self.offset) & mask
    }
}

/// QA bit layout, in the order categories are painted onto the flag.
/// Later entries overwrite earlier ones.
pub const QA_BIT_LAYOUT: [(QaCategory, BitField); 4] = [
    (QaCategory::Water, BitField::new(2, 1)),
    (QaCategory::SnowIce, BitField::new(4, 1)),
    (QaCategory::CloudShadow, BitField::new(3, 1)),
    (QaCategory::Cloud, BitField::new(5, 1)),
];

/// Fmask-style categorical value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Fmask {
    Clear = 0,
    Water = 1,
    CloudShadow = 2,
    SnowIce = 3,
    Cloud = 4,
}

impl Fmask {
    fn for_category(category: QaCategory) -> Self {
        match category {
            QaCategory::Water => Fmask::Water,
            QaCategory::CloudShadow => Fmask::CloudShadow,
            QaCategory::SnowIce => Fmask::SnowIce,
            QaCategory::Cloud => Fmask::Cloud,
        }
    }

    /// Moderate-to-severe obstruction (flag >= 2)
    pub fn is_obstruction(self) -> bool {
        self as u8 >= 2
    }
}

/// Decode one QA word
pub fn decode_fmask(word: u16) -> Fmask {
    QA_BIT_LAYOUT
        .iter()
        .fold(Fmask::Clear, |flag, (category, field)| {
            if field.extract(word) != 0 {
                Fmask::for_category(*category)
            } else {
                flag
            }
        })
}

/// Decoded quality flag of a whole scene
#[derive(Debug, Clone)]
pub struct QualityFlags {
    pub fmask: Array2<Option<Fmask>>,
    pub cloud: Mask,
    pub cloud_shadow: Mask,
    pub snow_ice: Mask,
    pub clear_water: Mask,
    pub obstruction: Mask,
}

impl QualityFlags {
    pub fn decode(qa: &Array2<Option<u16>>, grid: &GridSpec) -> LakeResult<Self> {
        grid.check_shape(qa, "qa band")?;

        let fmask = qa.mapv(|word| word.map(decode_fmask));
        let category = |target: Fmask| {
            Mask::from_fn(grid.clone(), |(i, j)| fmask[[i, j]].map(|f| f == target))
        };

        let cloud = category(Fmask::Cloud);
        let cloud_shadow = category(Fmask::CloudShadow);
        let snow_ice = category(Fmask::SnowIce);
        let clear_water = category(Fmask::Water);
        let obstruction = Mask::from_fn(grid.clone(), |(i, j)| {
            fmask[[i, j]].map(Fmask::is_obstruction)
        });

        log::debug!(
            "QA decoded: {} cloud, {} shadow, {} snow/ice, {} undefined pixels",
            cloud.count_true(),
            cloud_shadow.count_true(),
            snow_ice.count_true(),
            fmask.iter().filter(|f| f.is_none()).count()
        );

        Ok(Self {
            fmask,
            cloud,
            cloud_shadow,
            snow_ice,
            clear_water,
            obstruction,
        })
    }
}
