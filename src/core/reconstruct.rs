//! Reconstruction of water hidden under clouds and shadows from the
//! historical occurrence prior.

use ndarray::Array2;

use crate::core::shoreline::{clip_occurrence, estimate_threshold, ShorelineEstimate};
use crate::types::{FillStatus, LakeResult, Mask};

/// Reconstructed masks of one scene plus the threshold provenance
#[derive(Debug, Clone)]
pub struct Reconstruction {
    pub water: Mask,
    /// Visible water, extended into obstructed cells that pass the threshold
    pub reconstructed: Mask,
    pub obstruction: Mask,
    /// Every cell whose occurrence passes the threshold
    pub reconstructed_all: Mask,
    pub estimate: ShorelineEstimate,
}

impl Reconstruction {
    pub fn threshold(&self) -> f64 {
        self.estimate.threshold
    }

    pub fn threshold_std(&self) -> Option<f64> {
        self.estimate.std_dev()
    }

    pub fn fill_status(&self) -> FillStatus {
        self.estimate.status
    }
}

/// Occurrence at or above `threshold`; no-data occurrence never qualifies
pub fn occurrence_at_least(occurrence: &Array2<f32>, template: &Mask, threshold: f64) -> LakeResult<Mask> {
    template.grid().check_shape(occurrence, "occurrence")?;
    Ok(Mask::from_fn(template.grid().clone(), |idx| {
        let v = occurrence[idx];
        Some(v.is_finite() && v as f64 >= threshold)
    }))
}

/// Fill obstructed cells with water where the occurrence prior says so.
///
/// `occurrence` is the raw reference raster on the scene grid; it is clipped
/// to `region` before sampling and thresholding, so the global reconstruction
/// never leaves the region.
pub fn reconstruct_water(
    water: &Mask,
    obstruction: &Mask,
    occurrence: &Array2<f32>,
    region: &Mask,
) -> LakeResult<Reconstruction> {
    let woi = clip_occurrence(occurrence, region)?;
    let estimate = estimate_threshold(water, obstruction, &woi, region)?;
    reconstruct_with_threshold(water, obstruction, &woi, estimate)
}

/// Reconstruction step alone, for a threshold estimated elsewhere
pub fn reconstruct_with_threshold(
    water: &Mask,
    obstruction: &Mask,
    clipped_occurrence: &Array2<f32>,
    estimate: ShorelineEstimate,
) -> LakeResult<Reconstruction> {
    let reconstructed_all = occurrence_at_least(clipped_occurrence, water, estimate.threshold)?;
    let hidden_water = reconstructed_all.and(obstruction)?;
    let reconstructed = water.or(&hidden_water)?;

    log::debug!(
        "Reconstruction at occurrence >= {:.1} ({}): visible {} px, filled {} px, global {} px",
        estimate.threshold,
        estimate.status,
        water.count_true(),
        reconstructed.count_true().saturating_sub(water.count_true()),
        reconstructed_all.count_true()
    );

    Ok(Reconstruction {
        water: water.clone(),
        reconstructed,
        obstruction: obstruction.clone(),
        reconstructed_all,
        estimate,
    })
}
