//! Scene and lake catalogs.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use geo::{LineString, Polygon};
use serde::Deserialize;

use crate::core::aoi::{polygon_area_km2, AreaOfInterest};
use crate::types::{LakeError, LakeFeature, LakeResult, Scene, SceneMetadata, TimeRange};

/// Source of satellite scenes
pub trait SceneCatalog: Send + Sync {
    /// Scenes acquired within `range` whose cloud cover is strictly below
    /// `max_cloud_cover` percent
    fn query(&self, range: &TimeRange, max_cloud_cover: f64) -> LakeResult<Vec<SceneMetadata>>;

    /// Keep scenes whose footprint fully contains the lake
    fn filter_contains(&self, scenes: Vec<SceneMetadata>, aoi: &AreaOfInterest) -> Vec<SceneMetadata> {
        scenes
            .into_iter()
            .filter(|s| aoi.is_contained_by(&s.footprint))
            .collect()
    }

    /// Load pixel data for a scene returned by [`SceneCatalog::query`]
    fn load(&self, metadata: &SceneMetadata) -> LakeResult<Scene>;
}

/// Named lake polygons
pub trait LakeCatalog: Send + Sync {
    fn lookup(&self, name: &str) -> LakeResult<LakeFeature>;
    fn list_names(&self) -> Vec<String>;
}

/// Catalog over scenes already held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemorySceneCatalog {
    scenes: Vec<Scene>,
}

impl InMemorySceneCatalog {
    pub fn new(scenes: Vec<Scene>) -> Self {
        Self { scenes }
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

impl SceneCatalog for InMemorySceneCatalog {
    fn query(&self, range: &TimeRange, max_cloud_cover: f64) -> LakeResult<Vec<SceneMetadata>> {
        Ok(self
            .scenes
            .iter()
            .map(|s| &s.metadata)
            .filter(|m| range.contains(&m.acquired) && m.cloud_cover < max_cloud_cover)
            .cloned()
            .collect())
    }

    fn load(&self, metadata: &SceneMetadata) -> LakeResult<Scene> {
        self.scenes
            .iter()
            .find(|s| s.metadata.id == metadata.id)
            .cloned()
            .ok_or_else(|| LakeError::Metadata(format!("scene '{}' is not in the catalog", metadata.id)))
    }
}

/// Lake polygon as stored in a JSON lake collection
#[derive(Debug, Deserialize)]
struct LakeRecord {
    name: String,
    /// Exterior ring as `[x, y]` pairs in projected metres
    exterior: Vec<[f64; 2]>,
    #[serde(default)]
    interiors: Vec<Vec<[f64; 2]>>,
}

#[derive(Debug, Deserialize)]
struct LakeCollection {
    lakes: Vec<LakeRecord>,
}

fn ring(points: &[[f64; 2]]) -> LineString<f64> {
    LineString::from(points.iter().map(|p| (p[0], p[1])).collect::<Vec<_>>())
}

impl From<LakeRecord> for LakeFeature {
    fn from(record: LakeRecord) -> Self {
        let geometry = Polygon::new(
            ring(&record.exterior),
            record.interiors.iter().map(|r| ring(r)).collect(),
        );
        // area attributes carried by the source collection are ignored
        let polygon_area_km2 = polygon_area_km2(&geometry);
        LakeFeature {
            name: record.name,
            geometry,
            polygon_area_km2,
        }
    }
}

/// Lake features merged from one or more collections, ordered by polygon area.
///
/// When several features share a name the smallest one wins.
#[derive(Debug, Clone, Default)]
pub struct LakeRegistry {
    lakes: Vec<LakeFeature>,
}

impl LakeRegistry {
    pub fn new(features: Vec<LakeFeature>) -> Self {
        let mut registry = Self { lakes: Vec::new() };
        registry.merge(features);
        registry
    }

    /// Add another collection, keeping the area ordering
    pub fn merge(&mut self, features: Vec<LakeFeature>) {
        self.lakes.extend(features);
        self.lakes
            .sort_by(|a, b| a.polygon_area_km2.total_cmp(&b.polygon_area_km2));
    }

    /// Parse a collection of the form `{"lakes": [{"name", "exterior", ...}]}`
    pub fn from_json_str(json: &str) -> LakeResult<Self> {
        let collection: LakeCollection = serde_json::from_str(json)?;
        Ok(Self::new(collection.lakes.into_iter().map(LakeFeature::from).collect()))
    }

    /// Load and merge several JSON lake collections
    pub fn from_json_files<P: AsRef<Path>>(paths: &[P]) -> LakeResult<Self> {
        let mut registry = Self::default();
        for path in paths {
            let path = path.as_ref();
            log::info!("Loading lake collection: {}", path.display());
            let collection: LakeCollection = serde_json::from_str(&fs::read_to_string(path)?)?;
            registry.merge(collection.lakes.into_iter().map(LakeFeature::from).collect());
        }
        log::debug!("Lake registry holds {} features", registry.len());
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.lakes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lakes.is_empty()
    }
}

impl LakeCatalog for LakeRegistry {
    fn lookup(&self, name: &str) -> LakeResult<LakeFeature> {
        self.lakes
            .iter()
            .find(|l| l.name == name)
            .cloned()
            .ok_or_else(|| LakeError::LakeNotFound {
                name: name.to_string(),
                available: self.list_names(),
            })
    }

    fn list_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.lakes
            .iter()
            .filter(|l| seen.insert(l.name.as_str()))
            .map(|l| l.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLLECTION: &str = r#"{
        "lakes": [
            {"name": "Big Lake", "exterior": [[0,0],[3000,0],[3000,3000],[0,3000],[0,0]]},
            {"name": "Pond", "exterior": [[0,0],[100,0],[100,100],[0,100],[0,0]]},
            {"name": "Big Lake", "exterior": [[0,0],[1000,0],[1000,1000],[0,1000],[0,0]],
             "polygon_area_km2": 99.0}
        ]
    }"#;

    #[test]
    fn test_registry_orders_by_area() {
        let registry = LakeRegistry::from_json_str(COLLECTION).unwrap();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.list_names(), vec!["Pond".to_string(), "Big Lake".to_string()]);

        // the collection's own area attribute does not override the geometry
        let lake = registry.lookup("Big Lake").unwrap();
        assert!((lake.polygon_area_km2 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_lake_lists_names() {
        let registry = LakeRegistry::from_json_str(COLLECTION).unwrap();
        match registry.lookup("Crater Lake") {
            Err(LakeError::LakeNotFound { name, available }) => {
                assert_eq!(name, "Crater Lake");
                assert_eq!(available.len(), 2);
            }
            other => panic!("expected LakeNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_merge_collections() {
        let mut registry = LakeRegistry::from_json_str(COLLECTION).unwrap();
        let extra = LakeRegistry::from_json_str(
            r#"{"lakes": [{"name": "Tarn", "exterior": [[0,0],[10,0],[10,10],[0,10],[0,0]]}]}"#,
        )
        .unwrap();
        registry.merge(extra.lakes);
        assert_eq!(registry.list_names()[0], "Tarn");
    }
}
