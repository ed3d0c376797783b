//! Output grid derivation: a regular latitude/longitude lattice spanning the
//! finite-pixel bounding box of one swath. Extents vary per overpass, so a
//! fresh grid is derived for every product.

use crate::types::{BoundingBox, GeoTransform, Swath, TsmError, TsmResult};

/// An axis-aligned regular lattice covering a swath's valid-pixel extent
#[derive(Debug, Clone, PartialEq)]
pub struct GridDefinition {
    pub lon_min: f64,
    pub lat_min: f64,
    pub lon_max: f64,
    pub lat_max: f64,
    /// Requested cell size; the effective pixel size is `extent / count`
    pub cell_size_deg: f64,
    pub n_cols: usize,
    pub n_rows: usize,
}

impl GridDefinition {
    /// Default output resolution, roughly 300 m at the equator
    pub const DEFAULT_CELL_SIZE_DEG: f64 = 0.0027;

    /// Derive the grid from the bounding box of pixels that are finite in the
    /// measurement and both geolocation arrays. Fails with `EmptySwath` when
    /// no such pixel exists so the caller skips the product instead of
    /// producing a degenerate grid.
    pub fn from_swath(swath: &Swath, cell_size_deg: f64) -> TsmResult<Self> {
        if !(cell_size_deg > 0.0) {
            return Err(TsmError::Config(format!(
                "cell size must be positive, got {}",
                cell_size_deg
            )));
        }

        let (rows, cols) = swath.values.dim();
        let mut lon_min = f64::INFINITY;
        let mut lon_max = f64::NEG_INFINITY;
        let mut lat_min = f64::INFINITY;
        let mut lat_max = f64::NEG_INFINITY;
        let mut valid = 0usize;

        for r in 0..rows {
            for c in 0..cols {
                if swath.is_valid(r, c) {
                    let lon = swath.lons[[r, c]];
                    let lat = swath.lats[[r, c]];
                    lon_min = lon_min.min(lon);
                    lon_max = lon_max.max(lon);
                    lat_min = lat_min.min(lat);
                    lat_max = lat_max.max(lat);
                    valid += 1;
                }
            }
        }

        if valid == 0 {
            return Err(TsmError::EmptySwath(
                "no pixel is finite in measurement, latitude and longitude".to_string(),
            ));
        }

        let n_cols = (((lon_max - lon_min) / cell_size_deg).ceil() as usize).max(1);
        let n_rows = (((lat_max - lat_min) / cell_size_deg).ceil() as usize).max(1);

        log::debug!(
            "Grid from {} valid pixels: {}x{} cells over [{:.4}, {:.4}] x [{:.4}, {:.4}]",
            valid,
            n_rows,
            n_cols,
            lon_min,
            lon_max,
            lat_min,
            lat_max
        );

        Ok(Self {
            lon_min,
            lat_min,
            lon_max,
            lat_max,
            cell_size_deg,
            n_cols,
            n_rows,
        })
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox {
            min_lon: self.lon_min,
            max_lon: self.lon_max,
            min_lat: self.lat_min,
            max_lat: self.lat_max,
        }
    }

    /// North-up transform spanning the grid extent exactly
    pub fn geo_transform(&self) -> GeoTransform {
        GeoTransform::from_bounds(&self.bounding_box(), self.n_cols, self.n_rows)
    }

    /// (n_rows, n_cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols)
    }
}
