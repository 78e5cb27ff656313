//! Python bindings.
//!
//! Masks cross the boundary as `int8` arrays: 1 = true, 0 = false, -1 = no data.

use ndarray::Array2;
use numpy::{PyReadonlyArray2, ToPyArray};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use crate::config::LakeAreaConfig;
use crate::core::channel::{extract_channel as isolate_channel, ChannelParams};
use crate::core::quality_flags::QualityFlags;
use crate::core::reconstruct::reconstruct_water as reconstruct;
use crate::io::{
    AreaColumn, CsvTableSink, DemReader, LakeRegistry, ManifestSceneCatalog, OccurrenceReader,
};
use crate::core::pipeline::LakeAreaPipeline;
use crate::types::{GeoTransform, GridSpec, Mask, MaskCell};

/// Anonymous north-up grid for arrays passed without georeferencing
fn pixel_grid(shape: (usize, usize), pixel_size: f64) -> GridSpec {
    GridSpec {
        rows: shape.0,
        cols: shape.1,
        geo_transform: GeoTransform::north_up(0.0, 0.0, pixel_size),
        crs: String::new(),
    }
}

fn numpy_to_mask(arr: PyReadonlyArray2<i8>, grid: &GridSpec) -> PyResult<Mask> {
    let cells: Array2<MaskCell> = arr.as_array().mapv(|v| match v {
        v if v < 0 => None,
        0 => Some(false),
        _ => Some(true),
    });
    Mask::new(grid.clone(), cells).map_err(|e| PyValueError::new_err(format!("{}", e)))
}

fn mask_to_numpy(py: Python, mask: &Mask) -> PyObject {
    let codes = mask.cells().mapv(|c| match c {
        Some(true) => 1i8,
        Some(false) => 0,
        None => -1,
    });
    codes.to_pyarray(py).into()
}

/// Decode a packed QA band into the categorical flag and category masks
#[pyfunction]
#[pyo3(signature = (qa, nodata = None))]
fn classify_quality_flags(py: Python, qa: PyReadonlyArray2<u16>, nodata: Option<u16>) -> PyResult<PyObject> {
    let qa = qa.as_array().mapv(|w| if Some(w) == nodata { None } else { Some(w) });
    let grid = pixel_grid(qa.dim(), 30.0);
    let flags = QualityFlags::decode(&qa, &grid)
        .map_err(|e| PyValueError::new_err(format!("QA decoding failed: {}", e)))?;

    let fmask = flags.fmask.mapv(|f| f.map_or(-1i8, |f| f as i8));
    let result = PyDict::new(py);
    result.set_item("fmask", fmask.to_pyarray(py))?;
    result.set_item("cloud", mask_to_numpy(py, &flags.cloud))?;
    result.set_item("cloud_shadow", mask_to_numpy(py, &flags.cloud_shadow))?;
    result.set_item("snow_ice", mask_to_numpy(py, &flags.snow_ice))?;
    result.set_item("water", mask_to_numpy(py, &flags.clear_water))?;
    result.set_item("obstruction", mask_to_numpy(py, &flags.obstruction))?;
    Ok(result.into())
}

/// Fill obstructed water from the occurrence prior
#[pyfunction]
fn reconstruct_water(
    py: Python,
    water: PyReadonlyArray2<i8>,
    obstruction: PyReadonlyArray2<i8>,
    occurrence: PyReadonlyArray2<f32>,
    region: PyReadonlyArray2<i8>,
) -> PyResult<PyObject> {
    let grid = pixel_grid(water.as_array().dim(), 30.0);
    let water = numpy_to_mask(water, &grid)?;
    let obstruction = numpy_to_mask(obstruction, &grid)?;
    let region = numpy_to_mask(region, &grid)?;
    let occurrence = occurrence.as_array().to_owned();

    let recon = reconstruct(&water, &obstruction, &occurrence, &region)
        .map_err(|e| PyValueError::new_err(format!("Reconstruction failed: {}", e)))?;

    let result = PyDict::new(py);
    result.set_item("reconstructed", mask_to_numpy(py, &recon.reconstructed))?;
    result.set_item("reconstructed_all", mask_to_numpy(py, &recon.reconstructed_all))?;
    result.set_item("threshold", recon.threshold())?;
    result.set_item("threshold_std", recon.threshold_std())?;
    result.set_item("fill_status", recon.fill_status().to_string())?;
    Ok(result.into())
}

/// Keep only the water connected to the seed cells
#[pyfunction]
#[pyo3(signature = (mask, seed, pixel_size = 30.0, max_distance = 1000.0))]
fn extract_channel(
    py: Python,
    mask: PyReadonlyArray2<i8>,
    seed: PyReadonlyArray2<i8>,
    pixel_size: f64,
    max_distance: f64,
) -> PyResult<PyObject> {
    let grid = pixel_grid(mask.as_array().dim(), pixel_size);
    let mask = numpy_to_mask(mask, &grid)?;
    let seed = numpy_to_mask(seed, &grid)?;
    let params = ChannelParams {
        max_distance_m: max_distance,
    };

    let isolated = isolate_channel(&mask, &seed, &params)
        .map_err(|e| PyValueError::new_err(format!("Channel extraction failed: {}", e)))?;
    Ok(mask_to_numpy(py, &isolated))
}

/// Reconstructed-area time series of a named lake from files on disk
#[pyfunction]
#[pyo3(signature = (lake_name, manifest_path, lake_collections, occurrence_path, dem_path, config_path = None, output_dir = None, columns = None))]
#[allow(clippy::too_many_arguments)]
fn lake_area_time_series(
    py: Python,
    lake_name: &str,
    manifest_path: &str,
    lake_collections: Vec<String>,
    occurrence_path: &str,
    dem_path: &str,
    config_path: Option<&str>,
    output_dir: Option<&str>,
    columns: Option<Vec<String>>,
) -> PyResult<PyObject> {
    let runtime_err = |e: crate::types::LakeError| PyRuntimeError::new_err(format!("{}", e));

    let config = match config_path {
        Some(path) => LakeAreaConfig::from_json_file(path).map_err(runtime_err)?,
        None => LakeAreaConfig::default(),
    };
    let columns = columns
        .unwrap_or_default()
        .iter()
        .map(|c| c.parse::<AreaColumn>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| PyValueError::new_err(format!("{}", e)))?;

    let scenes = ManifestSceneCatalog::open(manifest_path).map_err(runtime_err)?;
    let lakes = LakeRegistry::from_json_files(&lake_collections).map_err(runtime_err)?;
    let occurrence = OccurrenceReader::open(occurrence_path).map_err(runtime_err)?;
    let elevation = DemReader::open(dem_path).map_err(runtime_err)?;

    let pipeline = LakeAreaPipeline::new(config, &scenes, &lakes, &occurrence, &elevation);
    let series = py
        .allow_threads(|| pipeline.run(lake_name))
        .map_err(runtime_err)?;

    if let Some(dir) = output_dir {
        series
            .export(&CsvTableSink::new(dir), &columns)
            .map_err(runtime_err)?;
    }

    let rows = PyList::empty(py);
    for record in &series.records {
        let row = PyDict::new(py);
        row.set_item("date", record.date.to_rfc3339())?;
        row.set_item("scene_id", &record.scene_id)?;
        row.set_item("lake_area", record.lake_area)?;
        row.set_item("obstruction_area", record.obstruction_area)?;
        row.set_item("reconstructed_area", record.reconstructed_area)?;
        row.set_item("reconstructed_all_area", record.reconstructed_all_area)?;
        row.set_item("fill_status", record.fill_status.to_string())?;
        row.set_item("shoreline_occurrence", record.shoreline_occurrence)?;
        rows.append(row)?;
    }
    Ok(rows.into())
}

/// Python module definition
#[pymodule]
fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(classify_quality_flags, m)?)?;
    m.add_function(wrap_pyfunction!(reconstruct_water, m)?)?;
    m.add_function(wrap_pyfunction!(extract_channel, m)?)?;
    m.add_function(wrap_pyfunction!(lake_area_time_series, m)?)?;
    Ok(())
}
