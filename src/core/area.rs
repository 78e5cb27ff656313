//! Reduction of lake masks to surface area with scene provenance.

use crate::core::classify::Provenance;
use crate::core::reconstruct::Reconstruction;
use crate::types::{AreaRecord, LakeResult, Mask};

/// Area (km²) of the cells true in both `mask` and `region`
pub fn mask_area_km2(mask: &Mask, region: &Mask) -> LakeResult<f64> {
    let cells = mask.and(region)?.count_true();
    Ok(cells as f64 * mask.grid().pixel_area_km2())
}

/// Final masks of one scene, restricted to the lake's connected water
#[derive(Debug, Clone)]
pub struct LakeMasks {
    /// Visible water inside the isolated scoped reconstruction
    pub lake: Mask,
    pub obstruction: Mask,
    pub reconstructed: Mask,
    pub reconstructed_all: Mask,
}

impl LakeMasks {
    /// Combine isolated reconstructions with the scene's visible water
    pub fn new(
        recon: &Reconstruction,
        isolated: Mask,
        isolated_all: Mask,
    ) -> LakeResult<Self> {
        let lake = recon.water.and(&isolated)?;
        Ok(Self {
            lake,
            obstruction: recon.obstruction.clone(),
            reconstructed: isolated,
            reconstructed_all: isolated_all,
        })
    }
}

/// Build the time-series row for one scene
pub fn area_record(
    masks: &LakeMasks,
    region: &Mask,
    recon: &Reconstruction,
    provenance: &Provenance,
    polygon_area: f64,
    cloud_cover: f64,
) -> LakeResult<AreaRecord> {
    let record = AreaRecord {
        date: provenance.timestamp,
        scene_id: provenance.image_id.clone(),
        lake_area: mask_area_km2(&masks.lake, region)?,
        obstruction_area: mask_area_km2(&masks.obstruction, region)?,
        reconstructed_area: mask_area_km2(&masks.reconstructed, region)?,
        reconstructed_all_area: mask_area_km2(&masks.reconstructed_all, region)?,
        polygon_area,
        fill_status: recon.fill_status(),
        shoreline_occurrence: recon.threshold(),
        shoreline_occurrence_std: recon.threshold_std(),
        cloud_cover,
    };

    log::debug!(
        "Scene {}: lake {:.4} km², obstructed {:.4} km², reconstructed {:.4} km² (all {:.4} km²)",
        record.scene_id,
        record.lake_area,
        record.obstruction_area,
        record.reconstructed_area,
        record.reconstructed_all_area
    );
    Ok(record)
}
