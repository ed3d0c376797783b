//! End-to-end compositor run over GeoTIFFs on disk: COLLECT real files,
//! GROUP by the filename timestamp, REDUCE with mean-over-valid, EMIT one
//! composite per bucket.

use ndarray::array;
use seston::core::composite::run_compositor;
use seston::core::Period;
use seston::{read_geotiff, write_geotiff, BoundingBox, GeoTransform, Raster, WGS84_EPSG};
use std::path::PathBuf;
use tempfile::TempDir;

fn raster(data: ndarray::Array2<f32>, min_lon: f64, max_lat: f64) -> Raster {
    let (rows, cols) = data.dim();
    let bounds = BoundingBox {
        min_lon,
        max_lon: min_lon + cols as f64 * 0.01,
        min_lat: max_lat - rows as f64 * 0.01,
        max_lat,
    };
    Raster::new(data, GeoTransform::from_bounds(&bounds, cols, rows), WGS84_EPSG)
}

#[test]
fn test_daily_composite_over_files() {
    let _ = env_logger::builder().is_test(true).try_init();

    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let clipped_dir = temp_dir.path().join("clipped");
    let composite_dir = temp_dir.path().join("composites");
    std::fs::create_dir_all(&clipped_dir).unwrap();
    std::fs::create_dir_all(&composite_dir).unwrap();

    // Two passes on 2018-01-05 with complementary coverage, one on 2018-01-06
    let inputs = [
        ("TSM_S3A_20180105T093000_a.SEN3.tif", array![[10.0f32, f32::NAN]]),
        ("TSM_S3B_20180105T151500_b.SEN3.tif", array![[f32::NAN, 20.0f32]]),
        ("TSM_S3A_20180106T094500_c.SEN3.tif", array![[7.0f32, 7.0]]),
    ];
    let mut files: Vec<PathBuf> = Vec::new();
    for (name, data) in inputs {
        let path = clipped_dir.join(name);
        write_geotiff(&raster(data, 10.0, 45.0), &path).expect("Failed to write input");
        files.push(path);
    }
    // A stray file with no timestamp token must be reported, not grouped
    let stray = clipped_dir.join("TSM_no_token.tif");
    write_geotiff(&raster(array![[1.0f32]], 10.0, 45.0), &stray).unwrap();
    files.push(stray);

    let report = run_compositor(&files, Period::Daily, &composite_dir);

    assert_eq!(report.written.len(), 2);
    assert_eq!(report.rejected.len(), 1);
    assert!(report.failed_groups.is_empty());

    let day1 = read_geotiff(composite_dir.join("TSM_daily_20180105.tif"))
        .expect("Missing first daily composite");
    assert_eq!(day1.data[[0, 0]], 10.0);
    assert_eq!(day1.data[[0, 1]], 20.0);

    let day2 = read_geotiff(composite_dir.join("TSM_daily_20180106.tif"))
        .expect("Missing second daily composite");
    assert_eq!(day2.data[[0, 0]], 7.0);
}

#[test]
fn test_single_member_bucket_passes_through() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let composite_dir = temp_dir.path().join("out");
    std::fs::create_dir_all(&composite_dir).unwrap();

    let input = raster(array![[3.5f32, f32::NAN]], -120.4, 34.0);
    let path = temp_dir.path().join("TSM_S3A_20180105T093000_x.SEN3.tif");
    write_geotiff(&input, &path).unwrap();

    let report = run_compositor(&[path], Period::Daily, &composite_dir);
    assert_eq!(report.written.len(), 1);
    assert!(report.rejected.is_empty());

    let composite = read_geotiff(&report.written[0]).unwrap();
    assert_eq!(composite.data[[0, 0]], 3.5);
    assert!(composite.data[[0, 1]].is_nan());
    assert_eq!(composite.transform, input.transform);
}

#[test]
fn test_failed_bucket_does_not_abort_the_rest() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let composite_dir = temp_dir.path().join("out");
    std::fs::create_dir_all(&composite_dir).unwrap();

    // One readable bucket and one whose only member vanished from disk
    let good = temp_dir.path().join("TSM_S3A_20180105T093000_x.SEN3.tif");
    write_geotiff(&raster(array![[3.5f32]], 10.0, 45.0), &good).unwrap();
    let missing = temp_dir.path().join("TSM_S3A_20180106T093000_y.SEN3.tif");

    let report = run_compositor(&[missing, good], Period::Daily, &composite_dir);

    assert_eq!(report.written.len(), 1);
    assert!(report.written[0].ends_with("TSM_daily_20180105.tif"));
    assert_eq!(report.failed_groups.len(), 1);
    assert_eq!(report.failed_groups[0].0, "20180106");

    let composite = read_geotiff(&report.written[0]).unwrap();
    assert_eq!(composite.data[[0, 0]], 3.5);
}
