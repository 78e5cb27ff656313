//! GDAL raster access shared by the file-backed readers.

use std::path::Path;

use gdal::Dataset;
use ndarray::Array2;

use crate::io::raster::GeoRaster;
use crate::types::{GeoTransform, GridSpec, LakeError, LakeResult};

/// Read one band as `f32`, turning the band's no-data value into NaN
pub fn read_geo_raster<P: AsRef<Path>>(path: P, band_index: isize) -> LakeResult<GeoRaster> {
    log::info!("Reading raster from: {}", path.as_ref().display());

    let dataset = Dataset::open(path.as_ref())?;
    let geo_transform = dataset.geo_transform()?;
    let (width, height) = dataset.raster_size();
    log::debug!("Raster size: {}x{}, geotransform: {:?}", width, height, geo_transform);

    let band = dataset.rasterband(band_index)?;
    let no_data = band.no_data_value();
    let buffer = band.read_as::<f32>((0, 0), (width, height), (width, height), None)?;

    let mut data = Array2::from_shape_vec((height, width), buffer.data)
        .map_err(|e| LakeError::Processing(format!("Failed to reshape raster data: {}", e)))?;
    if let Some(nd) = no_data {
        let nd = nd as f32;
        data.mapv_inplace(|v| if v == nd { f32::NAN } else { v });
    }

    GeoRaster::new(data, GeoTransform::from_gdal(geo_transform))
}

/// Read a packed quality band; the no-data value becomes `None`
pub fn read_qa_band<P: AsRef<Path>>(path: P) -> LakeResult<Array2<Option<u16>>> {
    let dataset = Dataset::open(path.as_ref())?;
    let (width, height) = dataset.raster_size();
    let band = dataset.rasterband(1)?;
    let no_data = band.no_data_value().map(|v| v as u16);
    let buffer = band.read_as::<u16>((0, 0), (width, height), (width, height), None)?;

    let words: Vec<Option<u16>> = buffer
        .data
        .into_iter()
        .map(|w| if Some(w) == no_data { None } else { Some(w) })
        .collect();
    Array2::from_shape_vec((height, width), words)
        .map_err(|e| LakeError::Processing(format!("Failed to reshape QA band: {}", e)))
}

/// Grid of a raster file; the CRS is reported as `AUTH:CODE` when known
pub fn dataset_grid<P: AsRef<Path>>(path: P) -> LakeResult<GridSpec> {
    let dataset = Dataset::open(path.as_ref())?;
    let (width, height) = dataset.raster_size();
    let geo_transform = GeoTransform::from_gdal(dataset.geo_transform()?);

    let crs = match dataset.spatial_ref() {
        Ok(srs) => match (srs.auth_name(), srs.auth_code()) {
            (Ok(name), Ok(code)) => format!("{}:{}", name, code),
            _ => dataset.projection(),
        },
        Err(_) => dataset.projection(),
    };

    Ok(GridSpec {
        rows: height,
        cols: width,
        geo_transform,
        crs,
    })
}
