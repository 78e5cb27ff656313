use std::path::Path;

use ndarray::Array2;

use crate::io::gdal_raster::read_geo_raster;
use crate::io::raster::{GeoRaster, OccurrenceSource};
use crate::types::{GridSpec, LakeResult};

/// Surface-water occurrence layer (percent of valid observations that were
/// water), read from a GDAL raster in the scene CRS
pub struct OccurrenceReader {
    raster: GeoRaster,
}

impl OccurrenceReader {
    pub fn open<P: AsRef<Path>>(path: P) -> LakeResult<Self> {
        let mut raster = read_geo_raster(path, 1)?;
        // values above 100 are fill codes in the published product
        raster.data.mapv_inplace(|v| if v > 100.0 { f32::NAN } else { v });
        Ok(Self { raster })
    }
}

impl OccurrenceSource for OccurrenceReader {
    fn occurrence(&self, grid: &GridSpec) -> LakeResult<Array2<f32>> {
        Ok(self.raster.sample_onto(grid))
    }
}
