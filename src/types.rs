use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Reduced TSM measurement value (mg/l, NN retrieval)
pub type TsmValue = f32;

/// 2D single-band raster data array (row x col)
pub type RasterBand = Array2<f32>;

/// EPSG code of the geographic WGS84 system used throughout the pipeline
pub const WGS84_EPSG: u32 = 4326;

/// No-data sentinel for every raster produced by the pipeline
pub const NO_DATA: f32 = f32::NAN;

/// Geospatial bounding box in degrees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Intersection of two boxes, or `None` when they do not overlap
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        let min_lon = self.min_lon.max(other.min_lon);
        let max_lon = self.max_lon.min(other.max_lon);
        let min_lat = self.min_lat.max(other.min_lat);
        let max_lat = self.max_lat.min(other.max_lat);

        if min_lon < max_lon && min_lat < max_lat {
            Some(BoundingBox { min_lon, max_lon, min_lat, max_lat })
        } else {
            None
        }
    }

    /// Smallest box covering both inputs
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_lon: self.min_lon.min(other.min_lon),
            max_lon: self.max_lon.max(other.max_lon),
            min_lat: self.min_lat.min(other.min_lat),
            max_lat: self.max_lat.max(other.max_lat),
        }
    }
}

/// Geospatial transformation parameters (GDAL six-parameter affine, north-up)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Build a north-up transform spanning `bounds` exactly with the given
    /// pixel counts. `pixel_height` comes out negative (row 0 at max latitude).
    pub fn from_bounds(bounds: &BoundingBox, n_cols: usize, n_rows: usize) -> Self {
        Self {
            top_left_x: bounds.min_lon,
            pixel_width: (bounds.max_lon - bounds.min_lon) / n_cols as f64,
            rotation_x: 0.0,
            top_left_y: bounds.max_lat,
            rotation_y: 0.0,
            pixel_height: -(bounds.max_lat - bounds.min_lat) / n_rows as f64,
        }
    }

    /// Geographic coordinates of a pixel center as (lon, lat)
    pub fn pixel_center(&self, row: usize, col: usize) -> (f64, f64) {
        let lon = self.top_left_x + (col as f64 + 0.5) * self.pixel_width;
        let lat = self.top_left_y + (row as f64 + 0.5) * self.pixel_height;
        (lon, lat)
    }

    /// GDAL array form: [x0, dx, rx, y0, ry, dy]
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.top_left_x,
            self.pixel_width,
            self.rotation_x,
            self.top_left_y,
            self.rotation_y,
            self.pixel_height,
        ]
    }

    pub fn from_gdal(gt: &[f64; 6]) -> Self {
        Self {
            top_left_x: gt[0],
            pixel_width: gt[1],
            rotation_x: gt[2],
            top_left_y: gt[3],
            rotation_y: gt[4],
            pixel_height: gt[5],
        }
    }
}

/// A single satellite overpass: scattered measurement samples with paired
/// per-pixel geolocation. All three arrays share one shape; a sample is valid
/// only if measurement, latitude and longitude are all finite at that index.
#[derive(Debug, Clone)]
pub struct Swath {
    pub values: Array2<f32>,
    pub lats: Array2<f64>,
    pub lons: Array2<f64>,
}

impl Swath {
    pub fn new(values: Array2<f32>, lats: Array2<f64>, lons: Array2<f64>) -> TsmResult<Self> {
        if values.dim() != lats.dim() || values.dim() != lons.dim() {
            return Err(TsmError::InvalidFormat(format!(
                "swath array shapes differ: values {:?}, lat {:?}, lon {:?}",
                values.dim(),
                lats.dim(),
                lons.dim()
            )));
        }
        Ok(Self { values, lats, lons })
    }

    /// True when measurement and both geolocation arrays are finite at (row, col)
    pub fn is_valid(&self, row: usize, col: usize) -> bool {
        self.values[[row, col]].is_finite()
            && self.lats[[row, col]].is_finite()
            && self.lons[[row, col]].is_finite()
    }

    pub fn valid_count(&self) -> usize {
        let (rows, cols) = self.values.dim();
        (0..rows)
            .map(|r| (0..cols).filter(|&c| self.is_valid(r, c)).count())
            .sum()
    }
}

/// Single-band geo-referenced raster: the interchange type between every
/// pipeline stage. Stages produce a new `Raster` rather than mutating in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub data: RasterBand,
    pub transform: GeoTransform,
    pub epsg: u32,
    pub no_data: f32,
}

impl Raster {
    pub fn new(data: RasterBand, transform: GeoTransform, epsg: u32) -> Self {
        Self { data, transform, epsg, no_data: NO_DATA }
    }

    /// Same georeferencing, new band values
    pub fn with_data(&self, data: RasterBand) -> Self {
        Self {
            data,
            transform: self.transform.clone(),
            epsg: self.epsg,
            no_data: self.no_data,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.data.dim().0
    }

    pub fn n_cols(&self) -> usize {
        self.data.dim().1
    }

    /// Geographic extent implied by the transform and array shape
    pub fn bounding_box(&self) -> BoundingBox {
        let (rows, cols) = self.data.dim();
        BoundingBox {
            min_lon: self.transform.top_left_x,
            max_lon: self.transform.top_left_x + cols as f64 * self.transform.pixel_width,
            max_lat: self.transform.top_left_y,
            min_lat: self.transform.top_left_y + rows as f64 * self.transform.pixel_height,
        }
    }
}

/// Error types for TSM processing
#[derive(Debug, thiserror::Error)]
pub enum TsmError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    #[error("No valid pixels in swath: {0}")]
    EmptySwath(String),

    #[error("ROI and raster extents do not intersect: {0}")]
    DisjointGeometry(String),

    #[error("Expected input file missing: {0}")]
    MissingInputFile(PathBuf),

    #[error("No YYYYMMDDTHHMMSS token in filename: {0}")]
    TimestampExtraction(String),

    #[error("Corrupt or unreadable archive: {0}")]
    CorruptArchive(PathBuf),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TsmError {
    /// Per-item failures are logged and skipped; everything else indicates a
    /// systemic problem and aborts the run.
    pub fn is_per_item(&self) -> bool {
        matches!(
            self,
            TsmError::EmptySwath(_)
                | TsmError::DisjointGeometry(_)
                | TsmError::MissingInputFile(_)
                | TsmError::TimestampExtraction(_)
                | TsmError::CorruptArchive(_)
        )
    }

    /// Short tag used for skip-reason bookkeeping in the run summary
    pub fn reason(&self) -> &'static str {
        match self {
            TsmError::EmptySwath(_) => "empty_swath",
            TsmError::DisjointGeometry(_) => "disjoint_geometry",
            TsmError::MissingInputFile(_) => "missing_input_file",
            TsmError::TimestampExtraction(_) => "timestamp_extraction",
            TsmError::CorruptArchive(_) => "corrupt_archive",
            TsmError::Io(_) => "io",
            TsmError::Gdal(_) => "gdal",
            TsmError::NetCdf(_) => "netcdf",
            TsmError::InvalidFormat(_) => "invalid_format",
            TsmError::Processing(_) => "processing",
            TsmError::Config(_) => "config",
        }
    }
}

/// Result type for TSM operations
pub type TsmResult<T> = Result<T, TsmError>;
