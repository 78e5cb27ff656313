//! lakearea: lake surface-area time series from optical satellite imagery
//!
//! Water is classified per scene, water hidden under clouds and shadows is
//! reconstructed from a historical occurrence layer, and the water body
//! connected to the lake is isolated before its area is measured.

pub mod config;
pub mod core;
pub mod io;
pub mod types;

#[cfg(feature = "python")]
mod python;

// Re-export main types
pub use crate::config::LakeAreaConfig;
pub use crate::core::{LakeAreaPipeline, LakeAreaSeries, WaterMethod};
pub use crate::io::{
    AreaColumn, AreaTableSink, CsvTableSink, ElevationSource, GeoRaster, InMemorySceneCatalog,
    LakeCatalog, LakeRegistry, OccurrenceSource, SceneCatalog,
};
pub use crate::types::{
    AreaRecord, FillStatus, GeoTransform, GridSpec, LakeError, LakeResult, Mask, Scene,
    SceneMetadata, SolarGeometry, SpectralBands, TimeRange,
};

/// Run the whole pipeline for one lake and export the default columns
pub fn lake_area_time_series(
    lake_name: &str,
    config: LakeAreaConfig,
    scenes: &dyn SceneCatalog,
    lakes: &dyn LakeCatalog,
    occurrence: &dyn OccurrenceSource,
    elevation: &dyn ElevationSource,
    sink: Option<&dyn AreaTableSink>,
) -> LakeResult<LakeAreaSeries> {
    let pipeline = LakeAreaPipeline::new(config, scenes, lakes, occurrence, elevation);
    let series = pipeline.run(lake_name)?;
    if let Some(sink) = sink {
        series.export(sink, &io::DEFAULT_COLUMNS)?;
    }
    Ok(series)
}
