//! Value-domain correction. TSM concentration is physically non-negative;
//! small negative retrievals are a sensor/algorithm artifact, not missing
//! data, so they are clamped to zero while the no-data sentinel is preserved.

use crate::types::Raster;

/// Clamp finite negative values to zero. NaN and non-negative values pass
/// through unchanged. Pure and idempotent.
pub fn reclassify(raster: &Raster) -> Raster {
    let data = raster
        .data
        .mapv(|v| if v.is_finite() && v < 0.0 { 0.0 } else { v });
    raster.with_data(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, GeoTransform, WGS84_EPSG};
    use ndarray::array;

    fn raster(data: ndarray::Array2<f32>) -> Raster {
        let bounds = BoundingBox { min_lon: 0.0, max_lon: 1.0, min_lat: 0.0, max_lat: 1.0 };
        let (rows, cols) = data.dim();
        Raster::new(data, GeoTransform::from_bounds(&bounds, cols, rows), WGS84_EPSG)
    }

    #[test]
    fn test_negative_to_zero_nan_untouched() {
        let input = raster(array![[5.0f32, -2.0, f32::NAN]]);
        let out = reclassify(&input);

        assert_eq!(out.data[[0, 0]], 5.0);
        assert_eq!(out.data[[0, 1]], 0.0);
        assert!(out.data[[0, 2]].is_nan());
    }

    #[test]
    fn test_idempotent_and_no_data_preserving() {
        let input = raster(array![[-1.5f32, 0.0, 3.25, f32::NAN, -0.0]]);
        let once = reclassify(&input);
        let twice = reclassify(&once);

        for (a, b) in once.data.iter().zip(twice.data.iter()) {
            assert!(a == b || (a.is_nan() && b.is_nan()));
        }

        let nan_before = input.data.iter().filter(|v| v.is_nan()).count();
        let nan_after = once.data.iter().filter(|v| v.is_nan()).count();
        assert_eq!(nan_before, nan_after);
    }

    #[test]
    fn test_georeferencing_unchanged() {
        let input = raster(array![[-1.0f32]]);
        let out = reclassify(&input);
        assert_eq!(out.transform, input.transform);
        assert_eq!(out.epsg, input.epsg);
    }
}
