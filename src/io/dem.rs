use std::path::Path;

use ndarray::Array2;

use crate::io::gdal_raster::read_geo_raster;
use crate::io::raster::{fill_voids, ElevationSource, GeoRaster};
use crate::types::{GridSpec, LakeResult};

/// Digital elevation model read from a GDAL raster in the scene CRS
pub struct DemReader {
    raster: GeoRaster,
    fill_voids: bool,
}

impl DemReader {
    pub fn open<P: AsRef<Path>>(dem_path: P) -> LakeResult<Self> {
        Ok(Self {
            raster: read_geo_raster(dem_path, 1)?,
            fill_voids: true,
        })
    }

    /// Leave DEM voids as no data instead of interpolating them
    pub fn without_void_fill(mut self) -> Self {
        self.fill_voids = false;
        self
    }
}

impl ElevationSource for DemReader {
    fn elevation(&self, grid: &GridSpec) -> LakeResult<Array2<f32>> {
        let mut dem = self.raster.sample_onto(grid);
        if self.fill_voids {
            let filled = fill_voids(&mut dem, 10);
            if filled > 0 {
                log::debug!("Filled {} DEM void pixels", filled);
            }
        }
        Ok(dem)
    }
}
