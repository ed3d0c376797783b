//! Reader for the netCDF file pair of a `.SEN3` product: a measurement file
//! (`tsm_nn.nc`) and a geolocation file (`geo_coordinates.nc`) holding
//! co-indexed 2D arrays.

use crate::types::{Swath, TsmError, TsmResult};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which files and variable names to read from a product directory.
/// The defaults match Sentinel-3 OLCI Level-2 WFR products.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwathInputs {
    pub measurement_file: String,
    pub geolocation_file: String,
    pub measurement_var: String,
    pub lat_var: String,
    pub lon_var: String,
}

impl Default for SwathInputs {
    fn default() -> Self {
        Self {
            measurement_file: "tsm_nn.nc".to_string(),
            geolocation_file: "geo_coordinates.nc".to_string(),
            measurement_var: "TSM_NN".to_string(),
            lat_var: "latitude".to_string(),
            lon_var: "longitude".to_string(),
        }
    }
}

/// Read the measurement/geolocation pair of one product directory into a
/// [`Swath`]. Fails with `MissingInputFile` when either file is absent.
pub fn read_swath(product_dir: &Path, inputs: &SwathInputs) -> TsmResult<Swath> {
    let measurement_path = product_dir.join(&inputs.measurement_file);
    let geolocation_path = product_dir.join(&inputs.geolocation_file);

    for path in [&measurement_path, &geolocation_path] {
        if !path.is_file() {
            return Err(TsmError::MissingInputFile(path.clone()));
        }
    }

    log::debug!("Reading swath pair from {}", product_dir.display());

    let values = read_var_2d(&measurement_path, &inputs.measurement_var)?.mapv(|v| v as f32);
    let geo = netcdf::open(&geolocation_path)?;
    let lats = read_var_2d_from(&geo, &geolocation_path, &inputs.lat_var)?;
    let lons = read_var_2d_from(&geo, &geolocation_path, &inputs.lon_var)?;

    Swath::new(values, lats, lons)
}

/// Read a named variable from a netCDF file as a 2D `f64` array, squeezing
/// singleton dimensions and applying `scale_factor`, `add_offset` and
/// `_FillValue` (fill pixels become NaN).
pub fn read_var_2d(path: &Path, var_name: &str) -> TsmResult<Array2<f64>> {
    let file = netcdf::open(path)?;
    read_var_2d_from(&file, path, var_name)
}

fn read_var_2d_from(file: &netcdf::File, path: &Path, var_name: &str) -> TsmResult<Array2<f64>> {
    let var = file.variable(var_name).ok_or_else(|| {
        TsmError::InvalidFormat(format!(
            "variable '{}' not found in {}",
            var_name,
            path.display()
        ))
    })?;

    let dims: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
    let shape = squeeze_to_2d(&dims).ok_or_else(|| {
        TsmError::InvalidFormat(format!(
            "variable '{}' in {} has shape {:?}, expected 2D after squeezing",
            var_name,
            path.display(),
            dims
        ))
    })?;

    let scale = numeric_attr(&var, "scale_factor").unwrap_or(1.0);
    let offset = numeric_attr(&var, "add_offset").unwrap_or(0.0);
    let fill = numeric_attr(&var, "_FillValue");

    let raw: Vec<f64> = var.get_values(..)?;
    let data: Vec<f64> = raw
        .into_iter()
        .map(|v| {
            let is_fill = fill.map(|f| v == f).unwrap_or(false);
            if is_fill || !v.is_finite() {
                f64::NAN
            } else {
                v * scale + offset
            }
        })
        .collect();

    Array2::from_shape_vec(shape, data)
        .map_err(|e| TsmError::InvalidFormat(format!("failed to reshape '{}': {}", var_name, e)))
}

/// Drop singleton dimensions; the remainder must be exactly two
fn squeeze_to_2d(dims: &[usize]) -> Option<(usize, usize)> {
    let kept: Vec<usize> = dims.iter().copied().filter(|&d| d != 1).collect();
    match kept.as_slice() {
        [rows, cols] => Some((*rows, *cols)),
        // Degenerate single-row arrays squeeze too far; keep the last two dims
        _ if dims.len() >= 2 => {
            let n = dims.len();
            if dims[..n - 2].iter().all(|&d| d == 1) {
                Some((dims[n - 2], dims[n - 1]))
            } else {
                None
            }
        }
        _ => None,
    }
}

fn numeric_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    var.attribute_value(name)
        .and_then(|r| r.ok())
        .and_then(|v| match v {
            netcdf::AttributeValue::Double(d) => Some(d),
            netcdf::AttributeValue::Float(f) => Some(f as f64),
            netcdf::AttributeValue::Int(i) => Some(i as f64),
            netcdf::AttributeValue::Short(s) => Some(s as f64),
            netcdf::AttributeValue::Longlong(l) => Some(l as f64),
            _ => None,
        })
}
