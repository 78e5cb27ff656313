//! I/O modules for scene catalogs, auxiliary rasters, and area tables

pub mod catalog;
pub mod export;
pub mod raster;

#[cfg(feature = "gdal")]
pub mod dem;
#[cfg(feature = "gdal")]
pub mod gdal_raster;
#[cfg(feature = "gdal")]
pub mod manifest;
#[cfg(feature = "gdal")]
pub mod occurrence;

pub use catalog::{InMemorySceneCatalog, LakeCatalog, LakeRegistry, SceneCatalog};
pub use export::{AreaColumn, AreaTableSink, CsvTableSink, DEFAULT_COLUMNS};
pub use raster::{ElevationSource, GeoRaster, OccurrenceSource};

#[cfg(feature = "gdal")]
pub use dem::DemReader;
#[cfg(feature = "gdal")]
pub use manifest::ManifestSceneCatalog;
#[cfg(feature = "gdal")]
pub use occurrence::OccurrenceReader;
