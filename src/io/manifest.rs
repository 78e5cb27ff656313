//! Scene catalog described by a JSON manifest of GeoTIFF bands.
//!
//! ```json
//! {"scenes": [{
//!     "id": "LC08_045028_20190704",
//!     "acquired": "2019-07-04T18:30:00Z",
//!     "solar": {"azimuth_deg": 135.2, "zenith_deg": 28.4},
//!     "cloud_cover": 12.0,
//!     "bands": {"blue": "b2.tif", "green": "b3.tif", "red": "b4.tif",
//!               "nir": "b5.tif", "swir1": "b6.tif", "swir2": "b7.tif", "qa": "qa.tif"}
//! }]}
//! ```
//!
//! Relative band paths are resolved against the manifest directory. The scene
//! grid is taken from the QA band; the footprint defaults to the grid extent.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use geo::{LineString, Polygon};
use serde::Deserialize;

use crate::io::catalog::SceneCatalog;
use crate::io::gdal_raster::{dataset_grid, read_geo_raster, read_qa_band};
use crate::types::{
    LakeError, LakeResult, Scene, SceneMetadata, SolarGeometry, SpectralBands, TimeRange,
};

#[derive(Debug, Clone, Deserialize)]
struct BandPaths {
    blue: PathBuf,
    green: PathBuf,
    red: PathBuf,
    nir: PathBuf,
    swir1: PathBuf,
    swir2: PathBuf,
    qa: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
struct ManifestEntry {
    id: String,
    acquired: DateTime<Utc>,
    solar: SolarGeometry,
    cloud_cover: f64,
    #[serde(default)]
    footprint: Option<Vec<[f64; 2]>>,
    bands: BandPaths,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    scenes: Vec<ManifestEntry>,
}

/// Scenes listed in a manifest, with band files read on `load`
pub struct ManifestSceneCatalog {
    root: PathBuf,
    entries: Vec<ManifestEntry>,
}

impl ManifestSceneCatalog {
    pub fn open<P: AsRef<Path>>(manifest_path: P) -> LakeResult<Self> {
        let manifest_path = manifest_path.as_ref();
        log::info!("Loading scene manifest: {}", manifest_path.display());
        let manifest: Manifest = serde_json::from_str(&fs::read_to_string(manifest_path)?)?;
        let root = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        log::debug!("Manifest lists {} scenes", manifest.scenes.len());
        Ok(Self {
            root,
            entries: manifest.scenes,
        })
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn metadata(&self, entry: &ManifestEntry) -> LakeResult<SceneMetadata> {
        let grid = dataset_grid(self.resolve(&entry.bands.qa))?;
        let footprint = match &entry.footprint {
            Some(points) => Polygon::new(
                LineString::from(points.iter().map(|p| (p[0], p[1])).collect::<Vec<_>>()),
                vec![],
            ),
            None => grid.bounding_box().to_polygon(),
        };
        Ok(SceneMetadata {
            id: entry.id.clone(),
            acquired: entry.acquired,
            solar: entry.solar,
            cloud_cover: entry.cloud_cover,
            footprint,
            grid,
        })
    }
}

impl SceneCatalog for ManifestSceneCatalog {
    fn query(&self, range: &TimeRange, max_cloud_cover: f64) -> LakeResult<Vec<SceneMetadata>> {
        self.entries
            .iter()
            .filter(|e| range.contains(&e.acquired) && e.cloud_cover < max_cloud_cover)
            .map(|e| self.metadata(e))
            .collect()
    }

    fn load(&self, metadata: &SceneMetadata) -> LakeResult<Scene> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.id == metadata.id)
            .ok_or_else(|| LakeError::Metadata(format!("scene '{}' is not in the manifest", metadata.id)))?;
        let paths = &entry.bands;
        log::debug!("Loading bands for scene {}", entry.id);

        let band = |p: &PathBuf| read_geo_raster(self.resolve(p), 1).map(|r| r.data);
        let bands = SpectralBands {
            blue: band(&paths.blue)?,
            green: band(&paths.green)?,
            red: band(&paths.red)?,
            nir: band(&paths.nir)?,
            swir1: band(&paths.swir1)?,
            swir2: band(&paths.swir2)?,
            qa: read_qa_band(self.resolve(&paths.qa))?,
        };

        Scene::new(metadata.clone(), bands)
    }
}
