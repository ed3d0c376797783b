//! ROI clipping: crop a raster to the intersection of its extent with the ROI
//! bounding box, then mask out every pixel whose center lies outside the ROI
//! geometry.

use crate::io::roi::Roi;
use crate::types::{GeoTransform, Raster, TsmError, TsmResult};
use ndarray::Array2;

/// Clip `raster` to `roi`. The crop window snaps inward to whole pixels, so
/// the output extent never exceeds the intersection of the raster extent and
/// the ROI bounding box; boundary cells only partially inside are dropped.
/// Fails with `DisjointGeometry` when the two extents do not intersect at
/// all; the caller treats that as "no output for this input", not a crash.
pub fn clip(raster: &Raster, roi: &Roi) -> TsmResult<Raster> {
    if roi.epsg != raster.epsg {
        return Err(TsmError::Processing(format!(
            "ROI is in EPSG:{} but raster is in EPSG:{}; reproject the ROI at load time",
            roi.epsg, raster.epsg
        )));
    }

    let raster_bbox = raster.bounding_box();
    let roi_bbox = roi.bounding_box();
    let inter = raster_bbox.intersection(&roi_bbox).ok_or_else(|| {
        TsmError::DisjointGeometry(format!(
            "raster [{:.4}, {:.4}] x [{:.4}, {:.4}] vs ROI [{:.4}, {:.4}] x [{:.4}, {:.4}]",
            raster_bbox.min_lon,
            raster_bbox.max_lon,
            raster_bbox.min_lat,
            raster_bbox.max_lat,
            roi_bbox.min_lon,
            roi_bbox.max_lon,
            roi_bbox.min_lat,
            roi_bbox.max_lat
        ))
    })?;

    let t = &raster.transform;
    let px = t.pixel_width;
    let py = -t.pixel_height;
    let (n_rows, n_cols) = raster.data.dim();

    // Largest whole-pixel window inside the intersection, clamped to the
    // raster; the epsilon keeps exactly aligned edges from dropping a cell
    let col_start = ((((inter.min_lon - t.top_left_x) / px) - 1e-9).ceil().max(0.0)) as usize;
    let col_end = (((((inter.max_lon - t.top_left_x) / px) + 1e-9).floor().max(0.0)) as usize)
        .min(n_cols);
    let row_start = ((((t.top_left_y - inter.max_lat) / py) - 1e-9).ceil().max(0.0)) as usize;
    let row_end = (((((t.top_left_y - inter.min_lat) / py) + 1e-9).floor().max(0.0)) as usize)
        .min(n_rows);

    if col_end <= col_start || row_end <= row_start {
        return Err(TsmError::DisjointGeometry(
            "intersection narrower than one pixel".to_string(),
        ));
    }

    let out_transform = GeoTransform {
        top_left_x: t.top_left_x + col_start as f64 * px,
        pixel_width: t.pixel_width,
        rotation_x: t.rotation_x,
        top_left_y: t.top_left_y - row_start as f64 * py,
        rotation_y: t.rotation_y,
        pixel_height: t.pixel_height,
    };

    let out_rows = row_end - row_start;
    let out_cols = col_end - col_start;
    let mut data = Array2::from_elem((out_rows, out_cols), f32::NAN);

    let mut inside = 0usize;
    for r in 0..out_rows {
        for c in 0..out_cols {
            let (lon, lat) = out_transform.pixel_center(r, c);
            if roi.contains(lon, lat) {
                data[[r, c]] = raster.data[[row_start + r, col_start + c]];
                inside += 1;
            }
        }
    }

    log::debug!(
        "Clipped to {}x{} window, {} pixel centers inside ROI",
        out_rows,
        out_cols,
        inside
    );

    Ok(Raster::new(data, out_transform, raster.epsg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, WGS84_EPSG};
    use geo_types::{LineString, MultiPolygon, Polygon};
    use ndarray::Array2;

    fn square_roi(min: f64, max: f64) -> Roi {
        Roi::from_polygons(
            MultiPolygon(vec![Polygon::new(
                LineString::from(vec![
                    (min, min),
                    (max, min),
                    (max, max),
                    (min, max),
                    (min, min),
                ]),
                vec![],
            )]),
            WGS84_EPSG,
        )
    }

    fn raster_10x10() -> Raster {
        // 10x10 unit-degree pixels spanning [0,10] x [0,10], values = row * 10 + col
        let bounds = BoundingBox { min_lon: 0.0, max_lon: 10.0, min_lat: 0.0, max_lat: 10.0 };
        let data = Array2::from_shape_fn((10, 10), |(r, c)| (r * 10 + c) as f32);
        Raster::new(data, GeoTransform::from_bounds(&bounds, 10, 10), WGS84_EPSG)
    }

    #[test]
    fn test_clip_crops_and_masks() {
        let raster = raster_10x10();
        let roi = square_roi(2.0, 5.0);
        let clipped = clip(&raster, &roi).unwrap();

        // Window covers the ROI bbox only
        let bbox = clipped.bounding_box();
        assert!(bbox.min_lon >= 2.0 - 1e-9 && bbox.max_lon <= 5.0 + 1e-9);
        assert!(bbox.min_lat >= 2.0 - 1e-9 && bbox.max_lat <= 5.0 + 1e-9);

        // Every retained pixel center is inside the ROI, values copied through
        let (rows, cols) = clipped.data.dim();
        for r in 0..rows {
            for c in 0..cols {
                let v = clipped.data[[r, c]];
                let (lon, lat) = clipped.transform.pixel_center(r, c);
                if roi.contains(lon, lat) {
                    assert!(v.is_finite());
                } else {
                    assert!(v.is_nan());
                }
            }
        }
    }

    #[test]
    fn test_roi_overhanging_raster_edge() {
        let raster = raster_10x10();
        let roi = square_roi(8.0, 15.0);
        let clipped = clip(&raster, &roi).unwrap();

        let bbox = clipped.bounding_box();
        assert!(bbox.max_lon <= 10.0 + 1e-9);
        assert!(clipped.data.iter().any(|v| v.is_finite()));
    }

    #[test]
    fn test_output_extent_stays_inside_intersection() {
        // ROI edges falling mid-pixel: the window must shrink, never grow
        let raster = raster_10x10();
        let roi = square_roi(2.3, 5.7);
        let clipped = clip(&raster, &roi).unwrap();

        let bbox = clipped.bounding_box();
        assert!(bbox.min_lon >= 2.3 && bbox.max_lon <= 5.7);
        assert!(bbox.min_lat >= 2.3 && bbox.max_lat <= 5.7);
        assert_eq!(clipped.data.dim(), (2, 2)); // whole pixels over [3, 5]
        assert!(clipped.data.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_disjoint_roi_is_an_error() {
        let raster = raster_10x10();
        let roi = square_roi(20.0, 30.0);

        let err = clip(&raster, &roi).unwrap_err();
        assert!(matches!(err, TsmError::DisjointGeometry(_)));
    }

    #[test]
    fn test_no_data_propagates_through_clip() {
        let mut raster = raster_10x10();
        raster.data[[6, 6]] = f32::NAN; // inside the ROI below
        let roi = square_roi(2.0, 8.0);
        let clipped = clip(&raster, &roi).unwrap();

        // Locate the window position of source pixel (6, 6)
        let r = 6 - ((raster.transform.top_left_y - clipped.transform.top_left_y)
            / -raster.transform.pixel_height)
            .round() as usize;
        let c = 6 - ((clipped.transform.top_left_x - raster.transform.top_left_x)
            / raster.transform.pixel_width)
            .round() as usize;
        assert!(clipped.data[[r, c]].is_nan());
    }
}
