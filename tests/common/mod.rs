//! Synthetic scenes shared by the integration tests.
//!
//! A 40x40 grid of 30 m pixels holds a 20x20-pixel lake (rows/cols 10..30)
//! and a separate 4x4 pond (rows 2..6, cols 33..37) inside the lake's
//! reconstruction buffer. Both have a historical occurrence of 90 %.
#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use geo::Polygon;
use ndarray::Array2;

use lakearea::core::aoi::polygon_area_km2;
use lakearea::types::{BoundingBox, LakeFeature};
use lakearea::{
    GeoRaster, GeoTransform, GridSpec, LakeRegistry, Scene, SceneMetadata, SolarGeometry,
    SpectralBands,
};

pub const LAKE_NAME: &str = "Synthetic Lake";
pub const SIZE: usize = 40;
pub const PIXEL_AREA: f64 = 0.0009;
pub const LAKE_CELLS: usize = 400;

/// blue, green, red, nir, swir1, swir2
const WATER_PX: [f32; 6] = [500.0, 800.0, 400.0, 200.0, 100.0, 50.0];
const LAND_PX: [f32; 6] = [400.0, 700.0, 600.0, 3000.0, 2000.0, 1200.0];

pub const CLOUD_BIT: u16 = 1 << 5;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn grid() -> GridSpec {
    GridSpec {
        rows: SIZE,
        cols: SIZE,
        geo_transform: GeoTransform::north_up(500_000.0, 4_201_200.0, 30.0),
        crs: "EPSG:32610".to_string(),
    }
}

pub fn is_lake(i: usize, j: usize) -> bool {
    (10..30).contains(&i) && (10..30).contains(&j)
}

pub fn is_pond(i: usize, j: usize) -> bool {
    (2..6).contains(&i) && (33..37).contains(&j)
}

pub fn lake_polygon() -> Polygon<f64> {
    BoundingBox {
        min_x: 500_300.0,
        max_x: 500_900.0,
        min_y: 4_200_300.0,
        max_y: 4_200_900.0,
    }
    .to_polygon()
}

pub fn lake_registry() -> LakeRegistry {
    let geometry = lake_polygon();
    LakeRegistry::new(vec![LakeFeature {
        name: LAKE_NAME.to_string(),
        polygon_area_km2: polygon_area_km2(&geometry),
        geometry,
    }])
}

pub fn occurrence() -> GeoRaster {
    let data = Array2::from_shape_fn((SIZE, SIZE), |(i, j)| {
        if is_lake(i, j) || is_pond(i, j) {
            90.0
        } else {
            0.0
        }
    });
    GeoRaster::on_grid(data, &grid()).unwrap()
}

pub fn flat_dem() -> GeoRaster {
    GeoRaster::on_grid(Array2::from_elem((SIZE, SIZE), 120.0), &grid()).unwrap()
}

/// Scene builder with a cloud layout, acquisition day and metadata overrides
pub struct SceneSpec {
    pub id: String,
    pub date: (i32, u32, u32),
    pub cloud_cover: f64,
    pub zenith_deg: f64,
    pub footprint: Option<Polygon<f64>>,
    pub cloud_rows: std::ops::Range<usize>,
}

impl SceneSpec {
    pub fn new(id: &str, date: (i32, u32, u32)) -> Self {
        Self {
            id: id.to_string(),
            date,
            cloud_cover: 10.0,
            zenith_deg: 35.0,
            footprint: None,
            cloud_rows: 0..0,
        }
    }

    /// Cloud over the lake columns for the given rows
    pub fn clouded(mut self, rows: std::ops::Range<usize>) -> Self {
        self.cloud_rows = rows;
        self
    }

    pub fn cloud_cover(mut self, cc: f64) -> Self {
        self.cloud_cover = cc;
        self
    }

    pub fn zenith(mut self, zenith_deg: f64) -> Self {
        self.zenith_deg = zenith_deg;
        self
    }

    pub fn footprint(mut self, footprint: Polygon<f64>) -> Self {
        self.footprint = Some(footprint);
        self
    }

    pub fn is_cloud(&self, i: usize, j: usize) -> bool {
        self.cloud_rows.contains(&i) && (10..30).contains(&j)
    }

    pub fn build(&self) -> Scene {
        let g = grid();
        let band = |k: usize| {
            Array2::from_shape_fn((SIZE, SIZE), |(i, j)| {
                if is_lake(i, j) || is_pond(i, j) {
                    WATER_PX[k]
                } else {
                    LAND_PX[k]
                }
            })
        };
        let qa = Array2::from_shape_fn((SIZE, SIZE), |(i, j)| {
            Some(if self.is_cloud(i, j) { CLOUD_BIT } else { 0 })
        });

        let (y, m, d) = self.date;
        let metadata = SceneMetadata {
            id: self.id.clone(),
            acquired: Utc.with_ymd_and_hms(y, m, d, 18, 30, 0).unwrap(),
            solar: SolarGeometry {
                azimuth_deg: 140.0,
                zenith_deg: self.zenith_deg,
            },
            cloud_cover: self.cloud_cover,
            footprint: self
                .footprint
                .clone()
                .unwrap_or_else(|| g.bounding_box().to_polygon()),
            grid: g,
        };
        let bands = SpectralBands {
            blue: band(0),
            green: band(1),
            red: band(2),
            nir: band(3),
            swir1: band(4),
            swir2: band(5),
            qa,
        };
        Scene::new(metadata, bands).unwrap()
    }
}
