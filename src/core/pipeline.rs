//! Lake-area time series: per-scene processing and the run orchestration.
//!
//! A run moves through owned stage values:
//! [`CatalogFiltered`] -> [`ProcessedScenes`] -> [`AreaFiltered`] -> [`LakeAreaSeries`].

use chrono::{DateTime, Utc};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::LakeAreaConfig;
use crate::core::aoi::AreaOfInterest;
use crate::core::area::{area_record, LakeMasks};
use crate::core::channel::extract_channel;
use crate::core::classify::{classify_scene, ClassifiedScene};
use crate::core::reconstruct::{reconstruct_water, Reconstruction};
use crate::io::catalog::{LakeCatalog, SceneCatalog};
use crate::io::export::{AreaColumn, AreaTableSink};
use crate::io::raster::{ElevationSource, OccurrenceSource};
use crate::types::{AreaRecord, LakeError, LakeResult, Mask, Scene, SceneMetadata};

/// Per-lake inputs shared by every scene of a run
#[derive(Clone, Copy)]
pub struct SceneContext<'a> {
    pub aoi: &'a AreaOfInterest,
    pub occurrence: &'a dyn OccurrenceSource,
    pub elevation: &'a dyn ElevationSource,
}

/// Every intermediate product of one processed scene
#[derive(Debug, Clone)]
pub struct SceneProducts {
    pub classified: ClassifiedScene,
    /// AOI buffered by the reconstruction buffer
    pub region: Mask,
    /// AOI buffered by the seed buffer
    pub seed: Mask,
    pub reconstruction: Reconstruction,
    pub masks: LakeMasks,
    pub record: AreaRecord,
}

/// Run classification, reconstruction, channel isolation and area reduction
/// for one scene, keeping the intermediate masks
pub fn process_scene_products(
    scene: &Scene,
    ctx: &SceneContext<'_>,
    config: &LakeAreaConfig,
) -> LakeResult<SceneProducts> {
    let grid = scene.grid();
    let classified = classify_scene(scene, config.water_method, ctx.elevation, &config.hillshade)?;

    let region = ctx.aoi.rasterize(grid, config.reconstruction_buffer_m)?;
    let seed = ctx.aoi.rasterize(grid, config.seed_buffer_m)?;
    let occurrence = ctx.occurrence.occurrence(grid)?;

    let reconstruction = reconstruct_water(
        &classified.water,
        &classified.obstruction,
        &occurrence,
        &region,
    )?;

    let isolated = extract_channel(&reconstruction.reconstructed, &seed, &config.channel)?;
    let isolated_all = extract_channel(&reconstruction.reconstructed_all, &seed, &config.channel)?;
    let masks = LakeMasks::new(&reconstruction, isolated, isolated_all)?;

    let record = area_record(
        &masks,
        &region,
        &reconstruction,
        &classified.provenance,
        ctx.aoi.polygon_area_km2,
        scene.metadata.cloud_cover,
    )?;

    Ok(SceneProducts {
        classified,
        region,
        seed,
        reconstruction,
        masks,
        record,
    })
}

/// Area record of one scene
pub fn process_scene(scene: &Scene, ctx: &SceneContext<'_>, config: &LakeAreaConfig) -> LakeResult<AreaRecord> {
    process_scene_products(scene, ctx, config).map(|p| p.record)
}

/// Scenes selected for a lake
#[derive(Debug, Clone)]
pub struct CatalogFiltered {
    pub aoi: AreaOfInterest,
    pub scenes: Vec<SceneMetadata>,
}

/// Records of the scenes that processed successfully
#[derive(Debug, Clone)]
pub struct ProcessedScenes {
    pub aoi: AreaOfInterest,
    pub records: Vec<AreaRecord>,
    /// Ids of scenes that failed and were left out
    pub dropped: Vec<String>,
}

/// Records with enough exposed lake to be trusted
#[derive(Debug, Clone)]
pub struct AreaFiltered {
    pub aoi: AreaOfInterest,
    pub records: Vec<AreaRecord>,
}

/// Final date-ordered time series of a lake
#[derive(Debug, Clone)]
pub struct LakeAreaSeries {
    pub lake: String,
    pub polygon_area_km2: f64,
    pub records: Vec<AreaRecord>,
}

impl ProcessedScenes {
    /// Keep records whose visible lake area is strictly above
    /// `fraction` of the polygon area
    pub fn filter_exposed_area(self, fraction: f64) -> AreaFiltered {
        let limit = fraction * self.aoi.polygon_area_km2;
        let before = self.records.len();
        let records: Vec<AreaRecord> = self
            .records
            .into_iter()
            .filter(|r| r.lake_area > limit)
            .collect();
        log::info!(
            "Exposed-area filter (> {:.4} km²): kept {} of {} records",
            limit,
            records.len(),
            before
        );
        AreaFiltered {
            aoi: self.aoi,
            records,
        }
    }
}

impl AreaFiltered {
    pub fn finalize(mut self) -> LakeAreaSeries {
        self.records
            .sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.scene_id.cmp(&b.scene_id)));
        LakeAreaSeries {
            lake: self.aoi.name,
            polygon_area_km2: self.aoi.polygon_area_km2,
            records: self.records,
        }
    }
}

impl LakeAreaSeries {
    /// `(date, reconstructed area)` rows of the headline series
    pub fn reconstructed_area(&self) -> Vec<(DateTime<Utc>, f64)> {
        self.records
            .iter()
            .map(|r| (r.date, r.reconstructed_all_area))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write the series as a table named after the lake
    pub fn export(&self, sink: &dyn AreaTableSink, columns: &[AreaColumn]) -> LakeResult<()> {
        sink.write_table(&self.lake, &self.records, columns)
    }
}

/// Data sources and configuration of a lake-area run
pub struct LakeAreaPipeline<'a> {
    pub config: LakeAreaConfig,
    scenes: &'a dyn SceneCatalog,
    lakes: &'a dyn LakeCatalog,
    occurrence: &'a dyn OccurrenceSource,
    elevation: &'a dyn ElevationSource,
}

impl<'a> LakeAreaPipeline<'a> {
    pub fn new(
        config: LakeAreaConfig,
        scenes: &'a dyn SceneCatalog,
        lakes: &'a dyn LakeCatalog,
        occurrence: &'a dyn OccurrenceSource,
        elevation: &'a dyn ElevationSource,
    ) -> Self {
        Self {
            config,
            scenes,
            lakes,
            occurrence,
            elevation,
        }
    }

    /// Look up the lake and select the scenes that fully contain it
    pub fn select_scenes(&self, lake_name: &str) -> LakeResult<CatalogFiltered> {
        let aoi = AreaOfInterest::from(self.lakes.lookup(lake_name)?);
        log::info!(
            "Lake '{}': polygon area {:.4} km²",
            aoi.name,
            aoi.polygon_area_km2
        );

        let candidates = self
            .scenes
            .query(&self.config.time_range, self.config.max_cloud_cover)?;
        let n_candidates = candidates.len();
        let scenes = self.scenes.filter_contains(candidates, &aoi);
        log::info!(
            "Scene selection: {} in date/cloud range, {} fully contain the lake",
            n_candidates,
            scenes.len()
        );

        if scenes.is_empty() {
            return Err(LakeError::NoScenes(aoi.name));
        }
        Ok(CatalogFiltered { aoi, scenes })
    }

    fn load_and_process(&self, metadata: &SceneMetadata, ctx: &SceneContext<'_>) -> LakeResult<AreaRecord> {
        let scene = self.scenes.load(metadata)?;
        process_scene(&scene, ctx, &self.config)
    }

    /// Process every selected scene; failing scenes are logged and dropped
    pub fn process(&self, selected: CatalogFiltered) -> ProcessedScenes {
        let CatalogFiltered { aoi, scenes } = selected;
        let ctx = SceneContext {
            aoi: &aoi,
            occurrence: self.occurrence,
            elevation: self.elevation,
        };

        #[cfg(feature = "parallel")]
        let outcomes: Vec<(String, LakeResult<AreaRecord>)> = scenes
            .par_iter()
            .map(|m| (m.id.clone(), self.load_and_process(m, &ctx)))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let outcomes: Vec<(String, LakeResult<AreaRecord>)> = scenes
            .iter()
            .map(|m| (m.id.clone(), self.load_and_process(m, &ctx)))
            .collect();

        let mut records = Vec::with_capacity(outcomes.len());
        let mut dropped = Vec::new();
        for (id, outcome) in outcomes {
            match outcome {
                Ok(record) => records.push(record),
                Err(e) => {
                    log::warn!("Dropping scene {}: {}", id, e);
                    dropped.push(id);
                }
            }
        }
        log::info!(
            "Processed {} scenes ({} dropped)",
            records.len(),
            dropped.len()
        );

        ProcessedScenes {
            aoi,
            records,
            dropped,
        }
    }

    /// Full run for one lake
    pub fn run(&self, lake_name: &str) -> LakeResult<LakeAreaSeries> {
        let selected = self.select_scenes(lake_name)?;
        let series = self
            .process(selected)
            .filter_exposed_area(self.config.exposed_area_fraction)
            .finalize();
        log::info!("Lake '{}': {} records in time series", series.lake, series.len());
        Ok(series)
    }
}
