//! Occurrence statistics along the visible, unobstructed shoreline.
//!
//! The 5th percentile of historical water occurrence sampled on the
//! shoreline is the threshold used to fill obstructed pixels.

use ndarray::Array2;
use serde::Serialize;

use crate::core::morphology::{dilate, erode, Kernel};
use crate::types::{FillStatus, LakeResult, Mask};

/// Percentiles reported for the shoreline sample
pub const SHORELINE_PERCENTILES: [u8; 6] = [0, 5, 10, 50, 90, 100];

/// Threshold used when no shoreline statistic is available
pub const FALLBACK_THRESHOLD: f64 = 1.0;

/// Summary of occurrence values sampled on shoreline pixels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShorelineStatistics {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Values for [`SHORELINE_PERCENTILES`], in order
    pub percentiles: [f64; 6],
    /// Population standard deviation
    pub std_dev: f64,
}

impl ShorelineStatistics {
    pub fn from_samples(mut samples: Vec<f64>) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        samples.sort_by(|a, b| a.total_cmp(b));

        let n = samples.len();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let variance = samples.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n as f64;

        let mut percentiles = [0.0; 6];
        for (slot, &p) in percentiles.iter_mut().zip(SHORELINE_PERCENTILES.iter()) {
            *slot = nearest_rank(&samples, p as f64);
        }

        Some(Self {
            count: n,
            mean,
            median: nearest_rank(&samples, 50.0),
            percentiles,
            std_dev: variance.sqrt(),
        })
    }

    pub fn percentile(&self, p: u8) -> Option<f64> {
        SHORELINE_PERCENTILES
            .iter()
            .position(|&q| q == p)
            .map(|i| self.percentiles[i])
    }
}

/// Nearest-rank percentile of sorted, non-empty samples
fn nearest_rank(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    let rank = ((p / 100.0) * n as f64).ceil() as usize;
    sorted[rank.saturating_sub(1).min(n - 1)]
}

/// Threshold and diagnostics produced for one scene
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShorelineEstimate {
    pub threshold: f64,
    pub status: FillStatus,
    pub statistics: Option<ShorelineStatistics>,
}

impl ShorelineEstimate {
    pub fn std_dev(&self) -> Option<f64> {
        self.statistics.as_ref().map(|s| s.std_dev)
    }
}

/// Occurrence restricted to the region; cells outside it or without data read 0
pub fn clip_occurrence(occurrence: &Array2<f32>, region: &Mask) -> LakeResult<Array2<f32>> {
    region.grid().check_shape(occurrence, "occurrence")?;
    Ok(Array2::from_shape_fn(occurrence.dim(), |idx| {
        let v = occurrence[idx];
        if region.cells()[idx] == Some(true) && v.is_finite() {
            v
        } else {
            0.0
        }
    }))
}

/// Water pixels on the water/land boundary that do not touch obstruction
pub fn shoreline_mask(water: &Mask, obstruction: &Mask) -> LakeResult<Mask> {
    let kernel = Kernel::Circle { radius: 1 };
    let edge = water.and_not(&erode(water, kernel, 1))?;
    edge.and_not(&dilate(obstruction, kernel, 1))
}

/// Estimate the occurrence threshold separating water from land on the
/// visible shoreline.
///
/// `occurrence` must already be clipped to the region (see [`clip_occurrence`]).
/// An empty sample, or a 5th percentile of zero that would flood the whole
/// region, falls back to [`FALLBACK_THRESHOLD`] with status `Fail`.
pub fn estimate_threshold(
    water: &Mask,
    obstruction: &Mask,
    occurrence: &Array2<f32>,
    region: &Mask,
) -> LakeResult<ShorelineEstimate> {
    water.grid().check_shape(occurrence, "occurrence")?;
    let shore = shoreline_mask(water, obstruction)?.and(region)?;

    let samples: Vec<f64> = shore
        .cells()
        .indexed_iter()
        .filter(|(_, cell)| **cell == Some(true))
        .map(|(idx, _)| occurrence[idx] as f64)
        .collect();

    let statistics = ShorelineStatistics::from_samples(samples);
    let p5 = statistics.as_ref().and_then(|s| s.percentile(5));

    let estimate = match p5 {
        Some(threshold) if threshold > 0.0 => ShorelineEstimate {
            threshold,
            status: FillStatus::Success,
            statistics,
        },
        _ => {
            log::warn!(
                "No usable shoreline occurrence ({} samples); falling back to threshold {}",
                statistics.as_ref().map_or(0, |s| s.count),
                FALLBACK_THRESHOLD
            );
            ShorelineEstimate {
                threshold: FALLBACK_THRESHOLD,
                status: FillStatus::Fail,
                statistics,
            }
        }
    };

    if let Some(stats) = &estimate.statistics {
        log::debug!(
            "Shoreline occurrence: n={}, mean={:.1}, median={:.1}, p5={:.1}, std={:.2}",
            stats.count,
            stats.mean,
            stats.median,
            stats.percentiles[1],
            stats.std_dev
        );
    }

    Ok(estimate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GeoTransform, GridSpec};
    use approx::assert_relative_eq;

    fn grid(n: usize) -> GridSpec {
        GridSpec {
            rows: n,
            cols: n,
            geo_transform: GeoTransform::north_up(0.0, 0.0, 30.0),
            crs: "EPSG:32610".to_string(),
        }
    }

    #[test]
    fn test_statistics_nearest_rank() {
        let samples: Vec<f64> = (1..=20).map(|v| v as f64 * 5.0).collect();
        let stats = ShorelineStatistics::from_samples(samples).unwrap();
        assert_eq!(stats.count, 20);
        assert_eq!(stats.percentile(0), Some(5.0));
        assert_eq!(stats.percentile(5), Some(5.0));
        assert_eq!(stats.percentile(10), Some(10.0));
        assert_eq!(stats.median, 50.0);
        assert_eq!(stats.percentile(100), Some(100.0));
        assert_relative_eq!(stats.mean, 52.5);
        assert!(stats.percentile(25).is_none());
        assert!(ShorelineStatistics::from_samples(Vec::new()).is_none());
    }

    #[test]
    fn test_shoreline_skips_obstructed_edge() {
        let g = grid(9);
        // water block rows/cols 2..7; cloud touching its right edge
        let water = Mask::from_fn(g.clone(), |(i, j)| Some((2..7).contains(&i) && (2..7).contains(&j)));
        let cloud = Mask::from_fn(g, |(i, j)| Some((2..7).contains(&i) && j == 7));
        let shore = shoreline_mask(&water, &cloud).unwrap();

        assert!(shore.is_true(2, 2));
        assert!(!shore.is_true(4, 4));
        // right edge column is adjacent to cloud
        assert!(!shore.is_true(4, 6));
        // 16 boundary cells of the 5x5 block minus the 5 in column 6
        assert_eq!(shore.count_true(), 11);
    }

    #[test]
    fn test_fallback_without_shoreline() {
        let g = grid(5);
        let water = Mask::filled(g.clone(), Some(false));
        let cloud = Mask::filled(g.clone(), Some(false));
        let region = Mask::filled(g, Some(true));
        let occ = Array2::from_elem((5, 5), 80.0f32);

        let estimate = estimate_threshold(&water, &cloud, &occ, &region).unwrap();
        assert_eq!(estimate.status, FillStatus::Fail);
        assert_eq!(estimate.threshold, FALLBACK_THRESHOLD);
        assert!(estimate.std_dev().is_none());
    }

    #[test]
    fn test_clip_occurrence_zeroes_outside() {
        let g = grid(3);
        let region = Mask::from_fn(g, |(i, _)| Some(i == 1));
        let mut occ = Array2::from_elem((3, 3), 50.0f32);
        occ[[1, 1]] = f32::NAN;
        let woi = clip_occurrence(&occ, &region).unwrap();
        assert_eq!(woi[[0, 0]], 0.0);
        assert_eq!(woi[[1, 0]], 50.0);
        assert_eq!(woi[[1, 1]], 0.0);
    }
}
