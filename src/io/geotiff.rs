//! GeoTIFF persistence for the [`Raster`] interchange type. A write/read
//! round trip preserves band values exactly, the geotransform bitwise, the
//! EPSG code, and the NaN no-data sentinel.

use crate::types::{GeoTransform, Raster, TsmError, TsmResult, WGS84_EPSG};
use gdal::raster::Buffer;
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, DriverManager};
use ndarray::Array2;
use std::path::Path;

/// Save a raster as a single-band Float32 GeoTIFF
pub fn write_geotiff<P: AsRef<Path>>(raster: &Raster, output_path: P) -> TsmResult<()> {
    log::debug!("Writing GeoTIFF: {}", output_path.as_ref().display());

    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let (height, width) = raster.data.dim();

    let mut dataset = driver.create_with_band_type::<f32, _>(
        output_path.as_ref(),
        width as isize,
        height as isize,
        1,
    )?;

    dataset.set_geo_transform(&raster.transform.to_gdal())?;
    dataset.set_spatial_ref(&SpatialRef::from_epsg(raster.epsg)?)?;

    let mut rasterband = dataset.rasterband(1)?;
    let flat_data: Vec<f32> = raster.data.iter().cloned().collect();
    let buffer = Buffer::new((width, height), flat_data);
    rasterband.write((0, 0), (width, height), &buffer)?;
    rasterband.set_no_data_value(Some(raster.no_data as f64))?;

    Ok(())
}

/// Load a single-band GeoTIFF back into a [`Raster`]. Pixels equal to a
/// finite file-level no-data value are normalized to NaN so every stage sees
/// one sentinel.
pub fn read_geotiff<P: AsRef<Path>>(path: P) -> TsmResult<Raster> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(TsmError::MissingInputFile(path.to_path_buf()));
    }

    let dataset = Dataset::open(path)?;
    let geo_transform = dataset.geo_transform()?;
    let (width, height) = dataset.raster_size();

    let rasterband = dataset.rasterband(1)?;
    let file_nodata = rasterband.no_data_value();
    let band_data = rasterband.read_as::<f32>((0, 0), (width, height), (width, height), None)?;

    let mut data = Array2::from_shape_vec((height, width), band_data.data)
        .map_err(|e| TsmError::InvalidFormat(format!("failed to reshape raster data: {}", e)))?;

    if let Some(nodata) = file_nodata {
        if nodata.is_finite() {
            let nodata = nodata as f32;
            data.mapv_inplace(|v| if v == nodata { f32::NAN } else { v });
        }
    }

    let epsg = dataset
        .spatial_ref()
        .ok()
        .and_then(|sr| sr.auth_code().ok())
        .map(|code| code as u32)
        .unwrap_or(WGS84_EPSG);

    Ok(Raster::new(
        data,
        GeoTransform::from_gdal(&geo_transform),
        epsg,
    ))
}
