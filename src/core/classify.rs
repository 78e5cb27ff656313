//! Per-scene pixel classification: quality flags, spectral water, and
//! terrain hillshade.

use chrono::{DateTime, Utc};
use ndarray::Array2;

use crate::core::hillshade::{displaced_hillshade, terrain_shadow, HillshadeParams};
use crate::core::quality_flags::{Fmask, QualityFlags};
use crate::core::water_index::{WaterClassifier, WaterMethod};
use crate::io::raster::ElevationSource;
use crate::types::{GridSpec, LakeResult, Mask, Scene};

/// Where a classified scene came from
#[derive(Debug, Clone)]
pub struct Provenance {
    pub image_id: String,
    pub timestamp: DateTime<Utc>,
    /// Nominal scale in metres
    pub scale: f64,
    pub crs: String,
}

/// Classification layers of one scene, all on the scene grid
#[derive(Debug, Clone)]
pub struct ClassifiedScene {
    /// Spectral water with obstructed pixels forced to false
    pub water: Mask,
    pub fmask: Array2<Option<Fmask>>,
    pub cloud: Mask,
    pub cloud_shadow: Mask,
    pub snow_ice: Mask,
    pub clear_water: Mask,
    pub obstruction: Mask,
    pub hillshade: Array2<f32>,
    pub terrain_shadow: Mask,
    pub provenance: Provenance,
}

impl ClassifiedScene {
    pub fn grid(&self) -> &GridSpec {
        self.water.grid()
    }
}

/// Classify every pixel of `scene` as water, obstructed, or clear land
pub fn classify_scene<E>(
    scene: &Scene,
    method: WaterMethod,
    elevation: &E,
    hillshade_params: &HillshadeParams,
) -> LakeResult<ClassifiedScene>
where
    E: ElevationSource + ?Sized,
{
    let grid = scene.grid();
    let meta = &scene.metadata;
    log::debug!("Classifying scene {} with {}", meta.id, method);

    let flags = QualityFlags::decode(&scene.bands.qa, grid)?;

    let raw = Mask::new(grid.clone(), method.classify(&scene.bands))?;
    // undefined QA leaves the pixel without data
    let qa_defined = flags.obstruction.map(|c| c.map(|_| true));
    let water = raw
        .and_not(&flags.obstruction)?
        .update_mask(&qa_defined)?;

    let dem = elevation.elevation(grid)?;
    let hillshade = displaced_hillshade(&dem, grid, &meta.solar, hillshade_params)?;
    let shadow = terrain_shadow(&hillshade, grid, hillshade_params.shadow_threshold)?;

    log::debug!(
        "Scene {}: {} water px, {} obstructed px, {} terrain-shadow px",
        meta.id,
        water.count_true(),
        flags.obstruction.count_true(),
        shadow.count_true()
    );

    Ok(ClassifiedScene {
        water,
        fmask: flags.fmask,
        cloud: flags.cloud,
        cloud_shadow: flags.cloud_shadow,
        snow_ice: flags.snow_ice,
        clear_water: flags.clear_water,
        obstruction: flags.obstruction,
        hillshade,
        terrain_shadow: shadow,
        provenance: Provenance {
            image_id: meta.id.clone(),
            timestamp: meta.acquired,
            scale: meta.nominal_scale(),
            crs: grid.crs.clone(),
        },
    })
}
