//! Auxiliary rasters (water occurrence, elevation) sampled onto a scene grid.

use ndarray::Array2;
use rayon::prelude::*;

use crate::types::{GeoTransform, GridSpec, LakeError, LakeResult};

/// Historical water occurrence (0-100 %) on a requested grid; NaN = no data
pub trait OccurrenceSource: Send + Sync {
    fn occurrence(&self, grid: &GridSpec) -> LakeResult<Array2<f32>>;
}

/// Elevation (metres) on a requested grid; NaN = no data
pub trait ElevationSource: Send + Sync {
    fn elevation(&self, grid: &GridSpec) -> LakeResult<Array2<f32>>;
}

impl<F> OccurrenceSource for F
where
    F: Fn(&GridSpec) -> LakeResult<Array2<f32>> + Send + Sync,
{
    fn occurrence(&self, grid: &GridSpec) -> LakeResult<Array2<f32>> {
        self(grid)
    }
}

impl<F> ElevationSource for F
where
    F: Fn(&GridSpec) -> LakeResult<Array2<f32>> + Send + Sync,
{
    fn elevation(&self, grid: &GridSpec) -> LakeResult<Array2<f32>> {
        self(grid)
    }
}

/// Georeferenced single-band raster held in memory
#[derive(Debug, Clone)]
pub struct GeoRaster {
    pub data: Array2<f32>,
    pub geo_transform: GeoTransform,
}

impl GeoRaster {
    pub fn new(data: Array2<f32>, geo_transform: GeoTransform) -> LakeResult<Self> {
        if geo_transform.pixel_width == 0.0 || geo_transform.pixel_height == 0.0 {
            return Err(LakeError::InvalidFormat(
                "raster geotransform has zero pixel size".to_string(),
            ));
        }
        Ok(Self { data, geo_transform })
    }

    /// Raster already aligned with `grid`
    pub fn on_grid(data: Array2<f32>, grid: &GridSpec) -> LakeResult<Self> {
        grid.check_shape(&data, "raster")?;
        Self::new(data, grid.geo_transform)
    }

    /// Bilinear sample of every cell centre of `grid`.
    ///
    /// Centres further than half a pixel outside the raster are NaN; no-data
    /// propagates into every interpolated value it touches.
    pub fn sample_onto(&self, grid: &GridSpec) -> Array2<f32> {
        let (target_rows, target_cols) = grid.shape();
        let (src_rows, src_cols) = self.data.dim();
        let src = &self.geo_transform;

        if src_rows == 0 || src_cols == 0 {
            return Array2::from_elem((target_rows, target_cols), f32::NAN);
        }

        let values: Vec<f32> = (0..target_rows)
            .into_par_iter()
            .flat_map_iter(|i| {
                (0..target_cols).map(move |j| {
                    let (x, y) = grid.cell_center(i, j);
                    // fractional index of the source pixel whose centre is at (x, y)
                    let (row, col) = src.world_to_pixel(x, y);
                    let (row, col) = (row - 0.5, col - 0.5);

                    if col < -0.5
                        || row < -0.5
                        || col > src_cols as f64 - 0.5
                        || row > src_rows as f64 - 0.5
                    {
                        return f32::NAN;
                    }

                    let col = col.clamp(0.0, (src_cols - 1) as f64);
                    let row = row.clamp(0.0, (src_rows - 1) as f64);
                    let x1 = col.floor() as usize;
                    let y1 = row.floor() as usize;
                    let x2 = (x1 + 1).min(src_cols - 1);
                    let y2 = (y1 + 1).min(src_rows - 1);
                    let dx = col - x1 as f64;
                    let dy = row - y1 as f64;

                    let v11 = self.data[[y1, x1]] as f64;
                    let v12 = self.data[[y2, x1]] as f64;
                    let v21 = self.data[[y1, x2]] as f64;
                    let v22 = self.data[[y2, x2]] as f64;

                    let weights = [
                        ((1.0 - dx) * (1.0 - dy), v11),
                        (dx * (1.0 - dy), v21),
                        ((1.0 - dx) * dy, v12),
                        (dx * dy, v22),
                    ];
                    // zero-weight neighbours do not spread no-data
                    weights
                        .iter()
                        .filter(|(w, _)| *w > 0.0)
                        .map(|(w, v)| w * v)
                        .sum::<f64>() as f32
                })
            })
            .collect();

        Array2::from_shape_vec((target_rows, target_cols), values)
            .unwrap_or_else(|_| Array2::from_elem((target_rows, target_cols), f32::NAN))
    }
}

impl OccurrenceSource for GeoRaster {
    fn occurrence(&self, grid: &GridSpec) -> LakeResult<Array2<f32>> {
        Ok(self.sample_onto(grid))
    }
}

impl ElevationSource for GeoRaster {
    fn elevation(&self, grid: &GridSpec) -> LakeResult<Array2<f32>> {
        Ok(self.sample_onto(grid))
    }
}

/// Fill NaN cells from the mean of at least three valid 8-neighbours,
/// repeating up to `max_iterations` times. Returns the number of cells filled.
pub fn fill_voids(data: &mut Array2<f32>, max_iterations: usize) -> usize {
    let (rows, cols) = data.dim();
    let mut filled = 0;

    for iteration in 0..max_iterations {
        let snapshot = data.clone();
        let mut changed = 0;

        for i in 0..rows {
            for j in 0..cols {
                if snapshot[[i, j]].is_finite() {
                    continue;
                }
                let mut sum = 0.0f32;
                let mut count = 0;
                for di in -1isize..=1 {
                    for dj in -1isize..=1 {
                        if di == 0 && dj == 0 {
                            continue;
                        }
                        let ni = i as isize + di;
                        let nj = j as isize + dj;
                        if ni < 0 || nj < 0 || ni as usize >= rows || nj as usize >= cols {
                            continue;
                        }
                        let v = snapshot[[ni as usize, nj as usize]];
                        if v.is_finite() {
                            sum += v;
                            count += 1;
                        }
                    }
                }
                if count >= 3 {
                    data[[i, j]] = sum / count as f32;
                    changed += 1;
                }
            }
        }

        filled += changed;
        log::debug!("Void fill iteration {}: filled {} pixels", iteration + 1, changed);
        if changed == 0 {
            break;
        }
    }

    filled
}
