//! Lake area-of-interest geometry and its buffered rasterization onto a
//! scene grid.

use geo::{Area, BoundingRect, Contains, EuclideanDistance, Point, Polygon};
use ndarray::Array2;
use rayon::prelude::*;

use crate::types::{GridSpec, LakeError, LakeFeature, LakeResult, Mask};

/// Polygon area in km² for a polygon in projected metres
pub fn polygon_area_km2(polygon: &Polygon<f64>) -> f64 {
    polygon.unsigned_area() / 1.0e6
}

/// Lake polygon plus its reference area
#[derive(Debug, Clone)]
pub struct AreaOfInterest {
    pub name: String,
    pub geometry: Polygon<f64>,
    pub polygon_area_km2: f64,
}

impl From<LakeFeature> for AreaOfInterest {
    fn from(feature: LakeFeature) -> Self {
        Self {
            name: feature.name,
            geometry: feature.geometry,
            polygon_area_km2: feature.polygon_area_km2,
        }
    }
}

impl AreaOfInterest {
    pub fn new(name: impl Into<String>, geometry: Polygon<f64>) -> Self {
        let polygon_area_km2 = polygon_area_km2(&geometry);
        Self {
            name: name.into(),
            geometry,
            polygon_area_km2,
        }
    }

    /// Whether a scene footprint fully contains the lake
    pub fn is_contained_by(&self, footprint: &Polygon<f64>) -> bool {
        footprint.contains(&self.geometry)
    }

    /// Rasterize the polygon buffered by `buffer_m` metres (negative shrinks)
    /// onto `grid`. A cell is inside when its centre is.
    pub fn rasterize(&self, grid: &GridSpec, buffer_m: f64) -> LakeResult<Mask> {
        let (rows, cols) = grid.shape();
        let polygon = &self.geometry;

        let rect = match polygon.bounding_rect() {
            Some(rect) => rect,
            None => return Ok(Mask::filled(grid.clone(), Some(false))),
        };
        let grow = buffer_m.max(0.0);
        let (min_x, max_x) = (rect.min().x - grow, rect.max().x + grow);
        let (min_y, max_y) = (rect.min().y - grow, rect.max().y + grow);

        let data: Vec<bool> = (0..rows)
            .into_par_iter()
            .flat_map_iter(|i| {
                (0..cols).map(move |j| {
                    let (x, y) = grid.cell_center(i, j);
                    if x < min_x || x > max_x || y < min_y || y > max_y {
                        return false;
                    }
                    let centre = Point::new(x, y);
                    let inside = polygon.contains(&centre);
                    if buffer_m == 0.0 {
                        return inside;
                    }
                    let d = boundary_distance(polygon, &centre);
                    if buffer_m > 0.0 {
                        inside || d <= buffer_m
                    } else {
                        inside && d >= -buffer_m
                    }
                })
            })
            .collect();

        let cells = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| LakeError::Processing(format!("rasterize: {}", e)))?;
        log::debug!(
            "Rasterized '{}' with {}m buffer: {} cells",
            self.name,
            buffer_m,
            cells.iter().filter(|v| **v).count()
        );
        Mask::from_bools(grid.clone(), &cells)
    }
}

/// Distance from a point to the nearest ring of a polygon
fn boundary_distance(polygon: &Polygon<f64>, p: &Point<f64>) -> f64 {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors().iter())
        .map(|ring| p.euclidean_distance(ring))
        .fold(f64::INFINITY, f64::min)
}
