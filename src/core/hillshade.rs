//! Terrain hillshade for shadow flagging.
//!
//! The DEM is displaced by a fixed distance in the four diagonal directions
//! and the hillshades of the displaced surfaces are averaged, which keeps the
//! shadow estimate stable when the DEM and the scene are slightly misregistered.

use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::types::{GridSpec, LakeError, LakeResult, Mask, SolarGeometry};

/// Parameters for terrain shadow estimation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HillshadeParams {
    /// Diagonal displacement applied to the DEM (metres)
    pub displacement_m: f64,
    /// Averaged hillshade (0-255) below which a cell counts as terrain shadow
    pub shadow_threshold: f32,
}

impl Default for HillshadeParams {
    fn default() -> Self {
        Self {
            displacement_m: 30.0,
            shadow_threshold: 1.0,
        }
    }
}

/// Shift a raster so that `out[r, c] = dem[r + dr, c + dc]`; cells shifted in
/// from outside the grid are NaN.
pub fn displace(dem: &Array2<f32>, dr: isize, dc: isize) -> Array2<f32> {
    let (rows, cols) = dem.dim();
    let source = |i: usize, d: isize, n: usize| {
        isize::try_from(i)
            .ok()
            .and_then(|i| i.checked_add(d))
            .and_then(|v| usize::try_from(v).ok())
            .filter(|&v| v < n)
    };
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        match (source(r, dr, rows), source(c, dc, cols)) {
            (Some(sr), Some(sc)) => dem[[sr, sc]],
            _ => f32::NAN,
        }
    })
}

/// Horn-gradient hillshade scaled to 0-255. Border cells and cells with a
/// no-data neighbour are NaN.
pub fn hillshade(dem: &Array2<f32>, pixel_size: f64, solar: &SolarGeometry) -> Array2<f32> {
    let (rows, cols) = dem.dim();

    let zenith = solar.zenith_deg.to_radians();
    let azimuth = ((360.0 - solar.azimuth_deg + 90.0).rem_euclid(360.0)).to_radians();
    let (sin_zenith, cos_zenith) = zenith.sin_cos();
    let eight_cell = 8.0 * pixel_size;

    let data: Vec<f32> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f32::NAN; cols];
            if row == 0 || row + 1 >= rows {
                return row_data;
            }
            for col in 1..cols.saturating_sub(1) {
                let a = dem[[row - 1, col - 1]] as f64;
                let b = dem[[row - 1, col]] as f64;
                let c = dem[[row - 1, col + 1]] as f64;
                let d = dem[[row, col - 1]] as f64;
                let e = dem[[row, col]] as f64;
                let f = dem[[row, col + 1]] as f64;
                let g = dem[[row + 1, col - 1]] as f64;
                let h = dem[[row + 1, col]] as f64;
                let i = dem[[row + 1, col + 1]] as f64;

                if [a, b, c, d, e, f, g, h, i].iter().any(|v| !v.is_finite()) {
                    continue;
                }

                let dz_dx = ((c + 2.0 * f + i) - (a + 2.0 * d + g)) / eight_cell;
                let dz_dy = ((g + 2.0 * h + i) - (a + 2.0 * b + c)) / eight_cell;
                let slope = (dz_dx * dz_dx + dz_dy * dz_dy).sqrt().atan();

                let mut aspect = dz_dy.atan2(-dz_dx);
                if aspect < 0.0 {
                    aspect += 2.0 * std::f64::consts::PI;
                }

                let shade = cos_zenith * slope.cos()
                    + sin_zenith * slope.sin() * (azimuth - aspect).cos();
                row_data[col] = (255.0 * shade.max(0.0)) as f32;
            }
            row_data
        })
        .collect();

    // shape is rows x cols by construction
    Array2::from_shape_vec((rows, cols), data).unwrap_or_else(|_| Array2::from_elem((rows, cols), f32::NAN))
}

/// Average of the hillshades of the DEM displaced along the four diagonals
pub fn displaced_hillshade(
    dem: &Array2<f32>,
    grid: &GridSpec,
    solar: &SolarGeometry,
    params: &HillshadeParams,
) -> LakeResult<Array2<f32>> {
    grid.check_shape(dem, "elevation")?;
    if !(0.0..=90.0).contains(&solar.zenith_deg) {
        return Err(LakeError::Metadata(format!(
            "solar zenith {} outside 0-90 degrees",
            solar.zenith_deg
        )));
    }

    let pixel_size = grid.pixel_size();
    if !(pixel_size.is_finite() && pixel_size > 0.0) {
        return Err(LakeError::Processing(format!(
            "hillshade needs a positive pixel size, got {}",
            pixel_size
        )));
    }
    let pixels = (params.displacement_m / pixel_size).round();
    if !pixels.is_finite() || pixels.abs() >= isize::MAX as f64 {
        return Err(LakeError::Processing(format!(
            "hillshade displacement of {}m is not representable on a {}m grid",
            params.displacement_m, pixel_size
        )));
    }
    // a shift past the grid edge leaves nothing to shade, so cap it there
    let (rows, cols) = dem.dim();
    let limit = isize::try_from(rows.max(cols)).unwrap_or(isize::MAX);
    let k = (pixels as isize).clamp(1, limit.max(1));
    log::debug!(
        "Hillshade: {}m displacement ({} px), azimuth {:.1}, zenith {:.1}",
        params.displacement_m,
        k,
        solar.azimuth_deg,
        solar.zenith_deg
    );

    let shades: Vec<Array2<f32>> = [(k, k), (-k, k), (k, -k), (-k, -k)]
        .iter()
        .map(|&(dr, dc)| hillshade(&displace(dem, dr, dc), pixel_size, solar))
        .collect();

    let mean = Array2::from_shape_fn(dem.dim(), |idx| {
        let (sum, n) = shades
            .iter()
            .map(|s| s[idx])
            .filter(|v| v.is_finite())
            .fold((0.0f32, 0u32), |(sum, n), v| (sum + v, n + 1));
        if n == 0 {
            f32::NAN
        } else {
            sum / n as f32
        }
    });

    Ok(mean)
}

/// Cells whose hillshade falls below the threshold; NaN hillshade is no data
pub fn terrain_shadow(hillshade: &Array2<f32>, grid: &GridSpec, threshold: f32) -> LakeResult<Mask> {
    grid.check_shape(hillshade, "hillshade")?;
    Ok(Mask::from_fn(grid.clone(), |idx| {
        let v = hillshade[idx];
        if v.is_finite() {
            Some(v < threshold)
        } else {
            None
        }
    }))
}
