//! Core lake-area processing modules

pub mod aoi;
pub mod area;
pub mod channel;
pub mod classify;
pub mod hillshade;
pub mod morphology;
pub mod pipeline;
pub mod quality_flags;
pub mod reconstruct;
pub mod shoreline;
pub mod water_index;

// Re-export main types
pub use aoi::AreaOfInterest;
pub use area::{area_record, mask_area_km2, LakeMasks};
pub use channel::{cumulative_cost, extract_channel, ChannelParams};
pub use classify::{classify_scene, ClassifiedScene, Provenance};
pub use hillshade::{displaced_hillshade, terrain_shadow, HillshadeParams};
pub use morphology::{dilate, erode, Kernel};
pub use pipeline::{
    process_scene, process_scene_products, AreaFiltered, CatalogFiltered, LakeAreaPipeline,
    LakeAreaSeries, ProcessedScenes, SceneContext, SceneProducts,
};
pub use quality_flags::{Fmask, QualityFlags, QA_BIT_LAYOUT};
pub use reconstruct::{reconstruct_water, Reconstruction};
pub use shoreline::{estimate_threshold, ShorelineEstimate, ShorelineStatistics};
pub use water_index::{Dswe, WaterClassifier, WaterMethod, Zou2018};
