use chrono::{DateTime, Utc};
use geo::{LineString, Polygon};
use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

/// Tri-state pixel value: `Some(true)`, `Some(false)`, or `None` for no data
pub type MaskCell = Option<bool>;

/// Geospatial bounding box in the grid's projected coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn to_polygon(&self) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![
                (self.min_x, self.min_y),
                (self.max_x, self.min_y),
                (self.max_x, self.max_y),
                (self.min_x, self.max_y),
                (self.min_x, self.min_y),
            ]),
            vec![],
        )
    }
}

/// Geospatial transformation parameters (GDAL affine ordering)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// North-up transform with square pixels of `pixel_size` metres
    pub fn north_up(top_left_x: f64, top_left_y: f64, pixel_size: f64) -> Self {
        Self {
            top_left_x,
            pixel_width: pixel_size,
            rotation_x: 0.0,
            top_left_y,
            rotation_y: 0.0,
            pixel_height: -pixel_size,
        }
    }

    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self {
            top_left_x: gt[0],
            pixel_width: gt[1],
            rotation_x: gt[2],
            top_left_y: gt[3],
            rotation_y: gt[4],
            pixel_height: gt[5],
        }
    }

    /// Fractional (row, col) of a projected coordinate, measured from the
    /// top-left pixel corner; assumes a north-up transform
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (y - self.top_left_y) / self.pixel_height,
            (x - self.top_left_x) / self.pixel_width,
        )
    }
}

/// Raster grid shared by every band and mask derived from one scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub rows: usize,
    pub cols: usize,
    pub geo_transform: GeoTransform,
    /// Coordinate reference, e.g. "EPSG:32610"
    pub crs: String,
}

impl GridSpec {
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Nominal scale in metres
    pub fn pixel_size(&self) -> f64 {
        self.geo_transform.pixel_width.abs()
    }

    /// Area of a single pixel in km²
    pub fn pixel_area_km2(&self) -> f64 {
        (self.geo_transform.pixel_width * self.geo_transform.pixel_height).abs() / 1.0e6
    }

    /// Projected coordinates of a cell centre
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        let gt = &self.geo_transform;
        let c = col as f64 + 0.5;
        let r = row as f64 + 0.5;
        (
            gt.top_left_x + c * gt.pixel_width + r * gt.rotation_x,
            gt.top_left_y + c * gt.rotation_y + r * gt.pixel_height,
        )
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let gt = &self.geo_transform;
        let x0 = gt.top_left_x;
        let x1 = gt.top_left_x + self.cols as f64 * gt.pixel_width;
        let y0 = gt.top_left_y;
        let y1 = gt.top_left_y + self.rows as f64 * gt.pixel_height;
        BoundingBox {
            min_x: x0.min(x1),
            max_x: x0.max(x1),
            min_y: y0.min(y1),
            max_y: y0.max(y1),
        }
    }

    pub(crate) fn check_shape<T>(&self, data: &Array2<T>, what: &str) -> LakeResult<()> {
        if data.dim() != self.shape() {
            return Err(LakeError::GridMismatch(format!(
                "{} has shape {:?}, grid is {:?}",
                what,
                data.dim(),
                self.shape()
            )));
        }
        Ok(())
    }
}

/// Boolean raster with explicit no-data, bound to the grid it was derived on.
///
/// Logical operators follow three-valued (Kleene) logic so that a known
/// `true` survives an OR with no-data and a known `false` survives an AND.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    grid: GridSpec,
    cells: Array2<MaskCell>,
}

impl Mask {
    pub fn new(grid: GridSpec, cells: Array2<MaskCell>) -> LakeResult<Self> {
        grid.check_shape(&cells, "mask")?;
        Ok(Self { grid, cells })
    }

    pub fn filled(grid: GridSpec, value: MaskCell) -> Self {
        let cells = Array2::from_elem(grid.shape(), value);
        Self { grid, cells }
    }

    pub fn from_fn<F>(grid: GridSpec, f: F) -> Self
    where
        F: FnMut((usize, usize)) -> MaskCell,
    {
        let cells = Array2::from_shape_fn(grid.shape(), f);
        Self { grid, cells }
    }

    /// Build a fully valid mask from a plain boolean array
    pub fn from_bools(grid: GridSpec, values: &Array2<bool>) -> LakeResult<Self> {
        Self::new(grid, values.mapv(Some))
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    pub fn cells(&self) -> &Array2<MaskCell> {
        &self.cells
    }

    pub fn dim(&self) -> (usize, usize) {
        self.cells.dim()
    }

    pub fn get(&self, row: usize, col: usize) -> MaskCell {
        self.cells[[row, col]]
    }

    pub fn is_true(&self, row: usize, col: usize) -> bool {
        self.cells[[row, col]] == Some(true)
    }

    pub fn count_true(&self) -> usize {
        self.cells.iter().filter(|c| **c == Some(true)).count()
    }

    pub fn count_valid(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn map<F>(&self, f: F) -> Mask
    where
        F: Fn(MaskCell) -> MaskCell,
    {
        Mask {
            grid: self.grid.clone(),
            cells: self.cells.mapv(f),
        }
    }

    /// Same grid, new cells of identical shape
    pub(crate) fn with_cells(&self, cells: Array2<MaskCell>) -> Mask {
        debug_assert_eq!(cells.dim(), self.grid.shape());
        Mask {
            grid: self.grid.clone(),
            cells,
        }
    }

    fn zip_with<F>(&self, other: &Mask, f: F) -> LakeResult<Mask>
    where
        F: Fn(MaskCell, MaskCell) -> MaskCell,
    {
        if self.grid != other.grid {
            return Err(LakeError::GridMismatch(
                "masks derived from different grids cannot be combined".to_string(),
            ));
        }
        let mut cells = Array2::from_elem(self.grid.shape(), None);
        Zip::from(&mut cells)
            .and(&self.cells)
            .and(&other.cells)
            .for_each(|out, &a, &b| *out = f(a, b));
        Ok(Mask {
            grid: self.grid.clone(),
            cells,
        })
    }

    pub fn and(&self, other: &Mask) -> LakeResult<Mask> {
        self.zip_with(other, kleene_and)
    }

    pub fn or(&self, other: &Mask) -> LakeResult<Mask> {
        self.zip_with(other, kleene_or)
    }

    pub fn not(&self) -> Mask {
        self.map(|c| c.map(|v| !v))
    }

    pub fn and_not(&self, other: &Mask) -> LakeResult<Mask> {
        self.and(&other.not())
    }

    /// Cells where `keep` is not `Some(true)` become no-data
    pub fn update_mask(&self, keep: &Mask) -> LakeResult<Mask> {
        self.zip_with(keep, |v, k| if k == Some(true) { v } else { None })
    }

    /// No-data cells take `value`
    pub fn unmask(&self, value: bool) -> Mask {
        self.map(|c| Some(c.unwrap_or(value)))
    }

    /// Every cell that is true here is also true in `other`
    pub fn is_subset_of(&self, other: &Mask) -> bool {
        self.grid == other.grid
            && self
                .cells
                .iter()
                .zip(other.cells.iter())
                .all(|(a, b)| *a != Some(true) || *b == Some(true))
    }
}

pub fn kleene_and(a: MaskCell, b: MaskCell) -> MaskCell {
    match (a, b) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

pub fn kleene_or(a: MaskCell, b: MaskCell) -> MaskCell {
    match (a, b) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    }
}

/// Per-pixel surface reflectance of one scene (scaled by 10^4, NaN = no data)
#[derive(Debug, Clone)]
pub struct SpectralBands {
    pub blue: Array2<f32>,
    pub green: Array2<f32>,
    pub red: Array2<f32>,
    pub nir: Array2<f32>,
    pub swir1: Array2<f32>,
    pub swir2: Array2<f32>,
    /// Packed pixel quality bits; `None` where undefined
    pub qa: Array2<Option<u16>>,
}

impl SpectralBands {
    pub fn dim(&self) -> (usize, usize) {
        self.qa.dim()
    }

    pub fn reflectance(&self, row: usize, col: usize) -> Reflectance {
        Reflectance {
            blue: self.blue[[row, col]],
            green: self.green[[row, col]],
            red: self.red[[row, col]],
            nir: self.nir[[row, col]],
            swir1: self.swir1[[row, col]],
            swir2: self.swir2[[row, col]],
        }
    }

    pub(crate) fn check_grid(&self, grid: &GridSpec) -> LakeResult<()> {
        grid.check_shape(&self.blue, "blue band")?;
        grid.check_shape(&self.green, "green band")?;
        grid.check_shape(&self.red, "red band")?;
        grid.check_shape(&self.nir, "nir band")?;
        grid.check_shape(&self.swir1, "swir1 band")?;
        grid.check_shape(&self.swir2, "swir2 band")?;
        grid.check_shape(&self.qa, "qa band")
    }
}

/// Reflectance values of one pixel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reflectance {
    pub blue: f32,
    pub green: f32,
    pub red: f32,
    pub nir: f32,
    pub swir1: f32,
    pub swir2: f32,
}

impl Reflectance {
    pub fn is_valid(&self) -> bool {
        [self.blue, self.green, self.red, self.nir, self.swir1, self.swir2]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Sun position at acquisition time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolarGeometry {
    /// Degrees clockwise from north
    pub azimuth_deg: f64,
    /// Degrees from vertical
    pub zenith_deg: f64,
}

/// Catalog description of a scene, without pixel data
#[derive(Debug, Clone)]
pub struct SceneMetadata {
    pub id: String,
    pub acquired: DateTime<Utc>,
    pub solar: SolarGeometry,
    /// Percentage of land covered by cloud
    pub cloud_cover: f64,
    pub footprint: Polygon<f64>,
    pub grid: GridSpec,
}

impl SceneMetadata {
    pub fn nominal_scale(&self) -> f64 {
        self.grid.pixel_size()
    }
}

/// One satellite observation with its pixel data
#[derive(Debug, Clone)]
pub struct Scene {
    pub metadata: SceneMetadata,
    pub bands: SpectralBands,
}

impl Scene {
    pub fn new(metadata: SceneMetadata, bands: SpectralBands) -> LakeResult<Self> {
        bands.check_grid(&metadata.grid)?;
        Ok(Self { metadata, bands })
    }

    pub fn grid(&self) -> &GridSpec {
        &self.metadata.grid
    }
}

/// Half-open acquisition window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn contains(&self, t: &DateTime<Utc>) -> bool {
        *t >= self.start && *t < self.end
    }
}

/// Named lake polygon from the feature catalog
#[derive(Debug, Clone)]
pub struct LakeFeature {
    pub name: String,
    pub geometry: Polygon<f64>,
    pub polygon_area_km2: f64,
}

/// Outcome of the shoreline occurrence estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillStatus {
    Success,
    Fail,
}

impl std::fmt::Display for FillStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FillStatus::Success => write!(f, "success"),
            FillStatus::Fail => write!(f, "fail"),
        }
    }
}

/// One row of the lake-area time series
#[derive(Debug, Clone, Serialize)]
pub struct AreaRecord {
    pub date: DateTime<Utc>,
    pub scene_id: String,
    /// Visible water connected to the lake (km²)
    pub lake_area: f64,
    pub obstruction_area: f64,
    /// Lake-scoped reconstruction (km²)
    pub reconstructed_area: f64,
    /// Occurrence-only reconstruction (km²)
    pub reconstructed_all_area: f64,
    pub polygon_area: f64,
    pub fill_status: FillStatus,
    pub shoreline_occurrence: f64,
    pub shoreline_occurrence_std: Option<f64>,
    pub cloud_cover: f64,
}

/// Error types for lake-area processing
#[derive(Debug, thiserror::Error)]
pub enum LakeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Grid mismatch: {0}")]
    GridMismatch(String),

    #[error("Lake '{name}' not found. Supported lake names: {}", .available.join(", "))]
    LakeNotFound { name: String, available: Vec<String> },

    #[error("No data available for lake '{0}': no scene fully contains it")]
    NoScenes(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[cfg(feature = "gdal")]
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),
}

/// Result type for lake-area operations
pub type LakeResult<T> = Result<T, LakeError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: usize, cols: usize) -> GridSpec {
        GridSpec {
            rows,
            cols,
            geo_transform: GeoTransform::north_up(500_000.0, 4_200_000.0, 30.0),
            crs: "EPSG:32610".to_string(),
        }
    }

    #[test]
    fn test_kleene_logic() {
        assert_eq!(kleene_or(Some(true), None), Some(true));
        assert_eq!(kleene_or(Some(false), None), None);
        assert_eq!(kleene_and(Some(false), None), Some(false));
        assert_eq!(kleene_and(Some(true), None), None);
    }

    #[test]
    fn test_grid_geometry() {
        let g = grid(10, 20);
        assert!((g.pixel_area_km2() - 0.0009).abs() < 1e-12);
        let (x, y) = g.cell_center(0, 0);
        assert_eq!((x, y), (500_015.0, 4_199_985.0));
        let bbox = g.bounding_box();
        assert_eq!(bbox.max_x - bbox.min_x, 600.0);
        assert_eq!(bbox.max_y - bbox.min_y, 300.0);
        let (r, c) = g.geo_transform.world_to_pixel(x, y);
        assert!((r - 0.5).abs() < 1e-9 && (c - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_mask_grid_mismatch() {
        let a = Mask::filled(grid(4, 4), Some(true));
        let b = Mask::filled(grid(4, 5), Some(true));
        assert!(matches!(a.and(&b), Err(LakeError::GridMismatch(_))));
    }

    #[test]
    fn test_update_and_unmask() {
        let g = grid(1, 3);
        let m = Mask::new(g.clone(), Array2::from_shape_vec((1, 3), vec![Some(true), Some(true), Some(false)]).unwrap()).unwrap();
        let keep = Mask::new(g, Array2::from_shape_vec((1, 3), vec![Some(true), Some(false), None]).unwrap()).unwrap();
        let updated = m.update_mask(&keep).unwrap();
        assert_eq!(updated.cells().as_slice().unwrap(), &[Some(true), None, None]);
        let filled = updated.unmask(false);
        assert_eq!(filled.count_valid(), 3);
        assert_eq!(filled.count_true(), 1);
    }

    #[test]
    fn test_lake_not_found_lists_names() {
        let err = LakeError::LakeNotFound {
            name: "Nowhere".to_string(),
            available: vec!["Horsepen Lake".to_string(), "Lake Sammamish".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("Nowhere"));
        assert!(msg.contains("Horsepen Lake, Lake Sammamish"));
    }
}
